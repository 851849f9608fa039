pub mod checkout_service;
pub mod coupon_service;
pub mod notification_service;
pub mod notification_templates;
pub mod payment_confirmation_service;
pub mod payment_processor_service;
pub mod pending_payment_service;
pub mod pricing;
pub mod renewal_service;

pub use checkout_service::*;
pub use coupon_service::*;
pub use notification_service::*;
pub use notification_templates::MailContext;
pub use payment_confirmation_service::*;
pub use payment_processor_service::*;
pub use pending_payment_service::*;
pub use renewal_service::*;
