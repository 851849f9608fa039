use crate::entities::{BillingPeriod, PaymentMethod, PaymentStatus, pending_payment_entity as pp};
use crate::error::{AppError, AppResult};
use crate::external::GatewayPayment;
use crate::models::{PendingPaymentQuery, PendingPaymentResponse};
use crate::utils::{PaginatedResponse, PaginationParams};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Everything the checkout knows when it records a gateway attempt.
#[derive(Debug, Clone)]
pub struct NewPendingPayment {
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
    pub pets_data: String,
    pub pix_qr_code: Option<String>,
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
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PendingPaymentService {
    pool: DatabaseConnection,
}

impl PendingPaymentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create(&self, record: NewPendingPayment) -> AppResult<pp::Model> {
        let now = Utc::now();
        let model = pp::ActiveModel {
            cielo_payment_id: Set(record.cielo_payment_id),
            payment_method: Set(record.payment_method),
            payment_status: Set(record.payment_status),
            customer_name: Set(record.customer_name),
            customer_email: Set(record.customer_email),
            customer_cpf: Set(record.customer_cpf),
            customer_phone: Set(record.customer_phone),
            address: Set(record.address),
            address_number: Set(record.address_number),
            complement: Set(record.complement),
            district: Set(record.district),
            city: Set(record.city),
            state: Set(record.state),
            cep: Set(record.cep),
            plan_id: Set(record.plan_id),
            billing_period: Set(record.billing_period),
            amount_cents: Set(record.amount_cents),
            installments: Set(record.installments),
            pets_data: Set(record.pets_data),
            pix_qr_code: Set(record.pix_qr_code),
            pix_code: Set(record.pix_code),
            seller_id: Set(record.seller_id),
            coupon_code: Set(record.coupon_code),
            coupon_discount_cents: Set(record.coupon_discount_cents),
            card_token: Set(record.card_token),
            card_brand: Set(record.card_brand),
            authorization_code: Set(record.authorization_code),
            tid: Set(record.tid),
            return_code: Set(record.return_code),
            return_message: Set(record.return_message),
            processed: Set(false),
            processed_at: Set(None),
            client_id: Set(None),
            contract_id: Set(None),
            expires_at: Set(record.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Pending payment {} recorded for gateway payment {} ({}, {})",
            model.id,
            model.cielo_payment_id,
            model.payment_method,
            model.payment_status
        );
        Ok(model)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<pp::Model>> {
        Ok(pp::Entity::find_by_id(id).one(&self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> AppResult<pp::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pending payment {id} not found")))
    }

    pub async fn find_by_gateway_id(&self, payment_id: &str) -> AppResult<Option<pp::Model>> {
        Ok(pp::Entity::find()
            .filter(pp::Column::CieloPaymentId.eq(payment_id))
            .one(&self.pool)
            .await?)
    }

    /// Reconciliation listing, newest first.
    pub async fn list(
        &self,
        query: &PendingPaymentQuery,
    ) -> AppResult<PaginatedResponse<PendingPaymentResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = pp::Entity::find();
        if let Some(processed) = query.processed {
            select = select.filter(pp::Column::Processed.eq(processed));
        }

        let total = select.clone().count(&self.pool).await?;
        let rows = select
            .order_by_desc(pp::Column::CreatedAt)
            .order_by_desc(pp::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        let items = rows.into_iter().map(PendingPaymentResponse::from).collect();
        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// Records an authoritative approval. Materialization is a separate step.
    pub async fn mark_approved(&self, id: i32, payment: &GatewayPayment) -> AppResult<pp::Model> {
        let current = self.get(id).await?;
        let mut active = current.into_active_model();
        active.payment_status = Set(PaymentStatus::Approved);
        if payment.return_code.is_some() {
            active.return_code = Set(payment.return_code.clone());
        }
        if payment.return_message.is_some() {
            active.return_message = Set(payment.return_message.clone());
        }
        if payment.authorization_code.is_some() {
            active.authorization_code = Set(payment.authorization_code.clone());
        }
        if payment.tid.is_some() {
            active.tid = Set(payment.tid.clone());
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.pool).await?)
    }

    pub async fn mark_rejected(
        &self,
        id: i32,
        return_code: Option<String>,
        return_message: Option<String>,
    ) -> AppResult<pp::Model> {
        let current = self.get(id).await?;
        if current.processed {
            // a materialized payment is never downgraded
            log::warn!("Ignoring rejection for already processed pending payment {id}");
            return Ok(current);
        }
        let mut active = current.into_active_model();
        active.payment_status = Set(PaymentStatus::Rejected);
        active.return_code = Set(return_code);
        active.return_message = Set(return_message);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.pool).await?;
        log::info!("Pending payment {id} marked as rejected");
        Ok(updated)
    }
}
