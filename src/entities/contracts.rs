use super::{BillingPeriod, ContractStatus, PaymentMethod};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub contract_number: String,
    pub client_id: i32,
    pub plan_id: i32,
    #[sea_orm(unique)]
    pub pending_payment_id: Option<i32>,
    pub billing_period: BillingPeriod,
    pub monthly_amount_cents: i64,
    pub annual_amount_cents: Option<i64>,
    pub status: ContractStatus,
    pub payment_method: PaymentMethod,
    pub cielo_card_token: Option<String>,
    pub card_brand: Option<String>,
    pub seller_id: Option<String>,
    pub coupon_code: Option<String>,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Amount charged for one billing period.
    pub fn period_amount_cents(&self) -> i64 {
        match self.billing_period {
            BillingPeriod::Annual => self
                .annual_amount_cents
                .unwrap_or(self.monthly_amount_cents * 12),
            BillingPeriod::Monthly => self.monthly_amount_cents,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
