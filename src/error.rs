use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{Value, json};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: Option<Value>,
    },

    #[error("Plan not found: {0}")]
    PlanNotFound(i32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// The gateway answered but did not approve the charge.
    #[error("Payment declined by gateway (status {status}): {return_message}")]
    GatewayDeclined {
        status: i32,
        return_code: String,
        return_message: String,
    },

    /// The gateway rejected the request itself (bad card data, auth, ...).
    #[error("Gateway error {return_code}: {return_message}")]
    GatewayError {
        return_code: String,
        return_message: String,
    },

    #[error("Materialization failed for pending payment {pending_payment_id}: {reason}")]
    MaterializationError {
        pending_payment_id: i32,
        reason: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
        AppError::ValidationError {
            message: message.into(),
            details: Some(details),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. }
            | AppError::PlanNotFound(_)
            | AppError::InvalidPaymentMethod(_)
            | AppError::GatewayDeclined { .. }
            | AppError::GatewayError { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) | AppError::AuthError(_) | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::ValidationError { message, details } => {
                log::warn!("Validation error: {message}");
                let mut body = json!({
                    "success": false,
                    "error": message,
                    "code": "VALIDATION_ERROR",
                });
                if let Some(details) = details {
                    body["details"] = details.clone();
                }
                body
            }
            AppError::PlanNotFound(plan_id) => {
                log::warn!("Plan not found: {plan_id}");
                json!({
                    "success": false,
                    "error": "Plano não encontrado",
                    "code": "PLAN_NOT_FOUND",
                    "details": { "planId": plan_id },
                })
            }
            AppError::NotFound(msg) => json!({
                "success": false,
                "error": msg,
                "code": "NOT_FOUND",
            }),
            AppError::InvalidPaymentMethod(method) => {
                log::warn!("Invalid payment method: {method}");
                json!({
                    "success": false,
                    "error": "Método de pagamento inválido",
                    "code": "INVALID_PAYMENT_METHOD",
                    "details": { "paymentMethod": method },
                })
            }
            AppError::GatewayDeclined {
                status,
                return_code,
                return_message,
            } => {
                log::warn!(
                    "Payment declined: status={status} return_code={return_code} message={return_message}"
                );
                json!({
                    "success": false,
                    "error": "Pagamento não aprovado",
                    "code": "PAYMENT_DECLINED",
                    "status": status,
                    "returnCode": return_code,
                    "returnMessage": return_message,
                })
            }
            AppError::GatewayError {
                return_code,
                return_message,
            } => {
                log::error!("Gateway error: {return_code} {return_message}");
                json!({
                    "success": false,
                    "error": "Erro ao processar pagamento",
                    "code": "GATEWAY_ERROR",
                    "returnCode": return_code,
                    "returnMessage": return_message,
                })
            }
            AppError::Forbidden(msg) => {
                log::warn!("Forbidden: {msg}");
                json!({ "success": false, "error": "Forbidden", "code": "FORBIDDEN" })
            }
            AppError::Unauthorized(msg) | AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                json!({ "success": false, "error": msg, "code": "UNAUTHORIZED" })
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                json!({ "success": false, "error": "Invalid token", "code": "UNAUTHORIZED" })
            }
            AppError::TooManyRequests => json!({
                "success": false,
                "error": "Too many requests",
                "code": "RATE_LIMITED",
            }),
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                json!({
                    "success": false,
                    "error": "External service error",
                    "code": "EXTERNAL_API_ERROR",
                    "details": msg,
                })
            }
            AppError::ReqwestError(err) => {
                log::error!("HTTP request error: {err}");
                json!({
                    "success": false,
                    "error": "External service error",
                    "code": "EXTERNAL_API_ERROR",
                })
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                json!({ "success": false, "error": "Database error", "code": "DATABASE_ERROR" })
            }
            AppError::MaterializationError {
                pending_payment_id,
                reason,
            } => {
                log::error!(
                    "Materialization error for pending payment {pending_payment_id}: {reason}"
                );
                json!({
                    "success": false,
                    "error": "Falha ao ativar o contrato",
                    "code": "MATERIALIZATION_ERROR",
                    "details": { "pendingPaymentId": pending_payment_id },
                })
            }
            _ => {
                log::error!("Internal error: {self}");
                json!({
                    "success": false,
                    "error": "Internal server error",
                    "code": "INTERNAL_ERROR",
                })
            }
        };

        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_declined_payment_preserves_gateway_fields() {
        let (status, body) = body_json(AppError::GatewayDeclined {
            status: 3,
            return_code: "05".to_string(),
            return_message: "Não Autorizada".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 3);
        assert_eq!(body["returnCode"], "05");
        assert_eq!(body["returnMessage"], "Não Autorizada");
    }

    #[actix_web::test]
    async fn test_plan_not_found_is_bad_request() {
        let (status, body) = body_json(AppError::PlanNotFound(42)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["planId"], 42);
    }

    #[actix_web::test]
    async fn test_security_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::Forbidden("ip".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Unauthorized("sig".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[actix_web::test]
    async fn test_validation_details_are_included() {
        let (_, body) = body_json(AppError::validation_with_details(
            "Dados obrigatórios ausentes",
            json!({ "missing": ["paymentData"] }),
        ))
        .await;
        assert_eq!(body["details"]["missing"][0], "paymentData");
    }
}
