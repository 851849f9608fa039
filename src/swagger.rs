use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{BillingPeriod, PaymentMethod, PaymentStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::checkout::process_checkout,
        handlers::checkout::payment_status,
        handlers::webhook::cielo_webhook,
        handlers::admin::list_pending_payments,
        handlers::admin::reprocess_pending_payment,
        handlers::admin::run_renewals,
    ),
    components(
        schemas(
            CheckoutRequest,
            PaymentData,
            CustomerData,
            CardPaymentData,
            PetPayload,
            PlanData,
            AddressData,
            CheckoutResponse,
            PaymentSummary,
            ClientSummary,
            ContractSummary,
            PaymentStatusResponse,
            CieloNotification,
            WebhookAck,
            PendingPaymentQuery,
            PendingPaymentResponse,
            ReprocessResponse,
            RenewalAttempt,
            RenewalBatchResult,
            PaymentMethod,
            PaymentStatus,
            BillingPeriod,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "checkout", description = "Checkout and payment status API"),
        (name = "webhook", description = "Gateway notifications"),
        (name = "admin", description = "Reconciliation and renewal operations"),
    ),
    info(
        title = "UNIPET PLAN Payments API",
        version = "1.0.0",
        description = "Checkout, payment confirmation and renewal REST API",
    ),
    servers(
        (url = "/", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
