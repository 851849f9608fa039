use crate::error::AppError;
use crate::middlewares::{CorrelationId, current_admin};
use crate::models::{
    ApiResponse, PendingPaymentQuery, PendingPaymentResponse, RenewalBatchResult,
    ReprocessResponse,
};
use crate::services::{PaymentConfirmationService, PendingPaymentService, RenewalService};
use actix_web::{HttpRequest, HttpResponse, Result, web};

fn admin_subject(req: &HttpRequest) -> String {
    current_admin(req)
        .map(|c| c.sub)
        .unwrap_or_else(|| "unknown".to_string())
}

#[utoipa::path(
    get,
    path = "/api/admin/pending-payments",
    tag = "admin",
    params(
        ("page" = Option<u64>, Query, description = "Página"),
        ("per_page" = Option<u64>, Query, description = "Itens por página"),
        ("processed" = Option<bool>, Query, description = "Filtrar por processados")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pagamentos pendentes", body = Vec<PendingPaymentResponse>),
        (status = 401, description = "Não autorizado")
    )
)]
pub async fn list_pending_payments(
    pending_payment_service: web::Data<PendingPaymentService>,
    query: web::Query<PendingPaymentQuery>,
) -> Result<HttpResponse, AppError> {
    let page = pending_payment_service.list(&query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/admin/pending-payments/{id}/reprocess",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Id do pagamento pendente")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Contrato criado ou já existente", body = ReprocessResponse),
        (status = 400, description = "Pagamento não aprovado"),
        (status = 404, description = "Pagamento não encontrado"),
        (status = 500, description = "Falha ao criar contrato")
    )
)]
pub async fn reprocess_pending_payment(
    req: HttpRequest,
    confirmation_service: web::Data<PaymentConfirmationService>,
    correlation_id: CorrelationId,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!(
        "[{correlation_id}] Admin {} requested reprocessing of pending payment {id}",
        admin_subject(&req)
    );
    let response = confirmation_service
        .reprocess(id, correlation_id.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/admin/renewals/run",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Resultado do lote de renovação", body = RenewalBatchResult),
        (status = 401, description = "Não autorizado")
    )
)]
pub async fn run_renewals(
    req: HttpRequest,
    renewal_service: web::Data<RenewalService>,
    correlation_id: CorrelationId,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "[{correlation_id}] Admin {} triggered a renewal batch",
        admin_subject(&req)
    );
    let result = renewal_service.process_overdue_renewals().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/pending-payments", web::get().to(list_pending_payments))
            .route(
                "/pending-payments/{id}/reprocess",
                web::post().to(reprocess_pending_payment),
            )
            .route("/renewals/run", web::post().to(run_renewals)),
    );
}
