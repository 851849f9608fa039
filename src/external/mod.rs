pub mod cielo;
pub mod mailer;

pub use cielo::*;
pub use mailer::*;
