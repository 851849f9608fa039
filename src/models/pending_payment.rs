use crate::entities::{BillingPeriod, PaymentMethod, PaymentStatus, pending_payment_entity};
use crate::utils::format::cents_to_reais;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PendingPaymentQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub processed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentResponse {
    pub id: i32,
    pub payment_id: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub plan_id: i32,
    pub billing_period: BillingPeriod,
    pub amount: f64,
    pub coupon_code: Option<String>,
    pub return_code: Option<String>,
    pub return_message: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub client_id: Option<i32>,
    pub contract_id: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
}

impl From<pending_payment_entity::Model> for PendingPaymentResponse {
    fn from(m: pending_payment_entity::Model) -> Self {
        let expired = m.is_expired(Utc::now());
        Self {
            id: m.id,
            payment_id: m.cielo_payment_id,
            method: m.payment_method,
            status: m.payment_status,
            customer_name: m.customer_name,
            customer_email: m.customer_email,
            plan_id: m.plan_id,
            billing_period: m.billing_period,
            amount: cents_to_reais(m.amount_cents),
            coupon_code: m.coupon_code,
            return_code: m.return_code,
            return_message: m.return_message,
            processed: m.processed,
            processed_at: m.processed_at,
            client_id: m.client_id,
            contract_id: m.contract_id,
            expires_at: m.expires_at,
            expired,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub success: bool,
    pub message: String,
    pub already_processed: bool,
    pub client_id: Option<i32>,
    pub contract_id: Option<i32>,
}
