pub mod checkout;
pub mod common;
pub mod pending_payment;
pub mod renewal;
pub mod webhook;

pub use checkout::*;
pub use common::*;
pub use pending_payment::*;
pub use renewal::*;
pub use webhook::*;
