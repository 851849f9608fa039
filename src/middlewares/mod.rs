pub mod auth;
pub mod correlation;
pub mod cors;
pub mod webhook_guard;

pub use auth::{AuthMiddleware, current_admin};
pub use correlation::{CORRELATION_HEADER, CorrelationId, CorrelationMiddleware};
pub use cors::create_cors;
pub use webhook_guard::WebhookGate;
