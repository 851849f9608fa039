pub mod code_generator;
pub mod dates;
pub mod documents;
pub mod format;
pub mod ip;
pub mod jwt;
pub mod pagination;
pub mod rate_limiter;

pub use code_generator::{generate_contract_number, generate_order_id};
pub use jwt::*;
pub use pagination::*;
pub use rate_limiter::SlidingWindowLimiter;
