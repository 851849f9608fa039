use crate::error::{AppError, AppResult};
use crate::middlewares::{CorrelationId, WebhookGate};
use crate::models::{CieloNotification, WebhookAck};
use crate::services::PaymentConfirmationService;
use actix_web::{HttpRequest, HttpResponse, web};
use log::{error, info};

/// Cielo payment notification.
///
/// The body is only parsed after the security gate accepted the request.
/// Processing failures are acknowledged with 200 so the gateway stops
/// retrying; the pending payment stays unprocessed for manual reprocessing.
#[utoipa::path(
    post,
    path = "/api/webhooks/cielo",
    tag = "webhook",
    request_body = CieloNotification,
    responses(
        (status = 200, description = "Notificação recebida", body = WebhookAck),
        (status = 400, description = "Corpo inválido"),
        (status = 401, description = "Assinatura ausente ou inválida"),
        (status = 403, description = "IP não autorizado"),
        (status = 429, description = "Limite de requisições excedido")
    )
)]
pub async fn cielo_webhook(
    req: HttpRequest,
    body: web::Bytes,
    gate: web::Data<WebhookGate>,
    confirmation_service: web::Data<PaymentConfirmationService>,
    correlation_id: CorrelationId,
) -> AppResult<HttpResponse> {
    let cid = correlation_id.as_str();
    gate.verify(&req, &body, cid)?;

    let notification: CieloNotification = serde_json::from_slice(&body).map_err(|e| {
        error!("[{cid}] Invalid Cielo notification payload: {e}");
        AppError::validation("Payload de notificação inválido")
    })?;

    match confirmation_service
        .handle_notification(&notification, cid)
        .await
    {
        Ok(ack) => {
            info!(
                "[{cid}] Notification for {} handled",
                notification.payment_id
            );
            Ok(HttpResponse::Ok().json(ack))
        }
        Err(e) => {
            error!(
                "[{cid}] Failed to process notification for {}: {e}",
                notification.payment_id
            );
            Ok(HttpResponse::Ok().json(WebhookAck::with_message(
                "Notificação recebida; processamento pendente",
            )))
        }
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/cielo", web::post().to(cielo_webhook)));
}
