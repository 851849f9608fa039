pub mod admin;
pub mod checkout;
pub mod webhook;

pub use admin::admin_config;
pub use checkout::checkout_config;
pub use webhook::webhook_config;
