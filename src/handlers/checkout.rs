use crate::error::AppError;
use crate::middlewares::CorrelationId;
use crate::models::{CheckoutRequest, CheckoutResponse, PaymentStatusResponse};
use crate::services::{CheckoutService, PaymentConfirmationService};
use actix_web::{HttpResponse, Result, error::JsonPayloadError, web};
use serde_json::json;

/// Malformed checkout bodies are reported like any other validation failure.
fn json_error_handler(err: JsonPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    AppError::validation_with_details(
        "Corpo da requisição inválido",
        json!({ "reason": err.to_string() }),
    )
    .into()
}

#[utoipa::path(
    post,
    path = "/api/checkout/process",
    tag = "checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Pagamento aprovado ou PIX gerado", body = CheckoutResponse),
        (status = 400, description = "Dados inválidos, plano inexistente ou pagamento recusado"),
        (status = 500, description = "Erro interno")
    )
)]
pub async fn process_checkout(
    checkout_service: web::Data<CheckoutService>,
    correlation_id: CorrelationId,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let response = checkout_service
        .process(body.into_inner(), correlation_id.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/checkout/payment-status/{payment_id}",
    tag = "checkout",
    params(
        ("payment_id" = String, Path, description = "Identificador do pagamento no gateway")
    ),
    responses(
        (status = 200, description = "Situação do pagamento", body = PaymentStatusResponse),
        (status = 404, description = "Pagamento não encontrado")
    )
)]
pub async fn payment_status(
    confirmation_service: web::Data<PaymentConfirmationService>,
    correlation_id: CorrelationId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response = confirmation_service
        .payment_status(&path.into_inner(), correlation_id.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn checkout_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/checkout")
            .app_data(
                web::JsonConfig::default()
                    .limit(256 * 1024)
                    .error_handler(json_error_handler),
            )
            .route("/process", web::post().to(process_checkout))
            .route("/payment-status/{payment_id}", web::get().to(payment_status)),
    );
}
