use super::{BillingPeriod, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One row per checkout attempt. Rows are never deleted; they are the audit
/// trail for gateway interactions and the source for materialization.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub cielo_payment_id: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_cpf: String,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub address_number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cep: Option<String>,
    pub plan_id: i32,
    pub billing_period: BillingPeriod,
    pub amount_cents: i64,
    pub installments: i32,
    /// JSON list of `PetPayload`.
    #[sea_orm(column_type = "Text")]
    pub pets_data: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub pix_qr_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub pix_code: Option<String>,
    pub seller_id: Option<String>,
    pub coupon_code: Option<String>,
    pub coupon_discount_cents: i64,
    pub card_token: Option<String>,
    pub card_brand: Option<String>,
    pub authorization_code: Option<String>,
    pub tid: Option<String>,
    pub return_code: Option<String>,
    pub return_message: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub client_id: Option<i32>,
    pub contract_id: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// PIX charges go stale after their expiry; nothing deletes them.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.processed && self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
