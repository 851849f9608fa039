use crate::entities::{
    BillingPeriod, ContractStatus, InstallmentStatus, PaymentStatus, client_entity, contract_entity,
    installment_entity, pending_payment_entity as pp, pet_entity,
};
use crate::error::{AppError, AppResult};
use crate::models::PetPayload;
use crate::services::CouponService;
use crate::utils::generate_contract_number;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, QueryFilter, Set, TransactionTrait,
};

#[derive(Debug, Clone)]
pub enum MaterializeOutcome {
    Created {
        client: client_entity::Model,
        contract: contract_entity::Model,
        installment: installment_entity::Model,
        /// Open installment for the following period, present once paid.
        next_installment: Option<installment_entity::Model>,
        pets: Vec<pet_entity::Model>,
    },
    /// Another caller already turned this payment into a contract.
    AlreadyProcessed {
        client_id: Option<i32>,
        contract_id: Option<i32>,
    },
}

impl MaterializeOutcome {
    pub fn client_id(&self) -> Option<i32> {
        match self {
            MaterializeOutcome::Created { client, .. } => Some(client.id),
            MaterializeOutcome::AlreadyProcessed { client_id, .. } => *client_id,
        }
    }

    pub fn contract_id(&self) -> Option<i32> {
        match self {
            MaterializeOutcome::Created { contract, .. } => Some(contract.id),
            MaterializeOutcome::AlreadyProcessed { contract_id, .. } => *contract_id,
        }
    }
}

/// Turns a confirmed pending payment into client, pets, contract and its
/// installments. A paid first installment is followed by an open second one,
/// which is what the renewal engine later charges.
#[derive(Clone)]
pub struct PaymentProcessorService {
    pool: DatabaseConnection,
    coupon_service: CouponService,
}

impl PaymentProcessorService {
    pub fn new(pool: DatabaseConnection, coupon_service: CouponService) -> Self {
        Self {
            pool,
            coupon_service,
        }
    }

    /// Runs in one transaction guarded by a conditional claim on `processed`,
    /// so concurrent or repeated confirmations create exactly one contract.
    /// On failure nothing is written and the payment stays unprocessed.
    pub async fn materialize(
        &self,
        pending_payment_id: i32,
        payment_confirmed: bool,
        correlation_id: &str,
    ) -> AppResult<MaterializeOutcome> {
        let txn = self
            .pool
            .begin()
            .await
            .map_err(|e| materialization_error(pending_payment_id, e))?;

        let result = self
            .materialize_in(&txn, pending_payment_id, payment_confirmed, Utc::now())
            .await;

        let outcome = match result {
            Ok(outcome) => {
                txn.commit()
                    .await
                    .map_err(|e| materialization_error(pending_payment_id, e))?;
                outcome
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    log::error!(
                        "[{correlation_id}] Rollback failed for pending payment {pending_payment_id}: {rollback_err}"
                    );
                }
                log::error!(
                    "[{correlation_id}] Materialization failed for pending payment {pending_payment_id}: {e}"
                );
                return Err(materialization_error(pending_payment_id, e));
            }
        };

        match &outcome {
            MaterializeOutcome::Created {
                client, contract, ..
            } => {
                log::info!(
                    "[{correlation_id}] Pending payment {pending_payment_id} materialized: client {} contract {} ({})",
                    client.id,
                    contract.id,
                    contract.contract_number
                );
                if let Some(code) = &contract.coupon_code {
                    if let Err(e) = self.coupon_service.increment_usage(code).await {
                        log::error!(
                            "[{correlation_id}] Failed to increment coupon {code} usage: {e}"
                        );
                    }
                }
            }
            MaterializeOutcome::AlreadyProcessed { contract_id, .. } => {
                log::info!(
                    "[{correlation_id}] Pending payment {pending_payment_id} already processed (contract {contract_id:?})"
                );
            }
        }

        Ok(outcome)
    }

    async fn materialize_in(
        &self,
        txn: &DatabaseTransaction,
        pending_payment_id: i32,
        payment_confirmed: bool,
        now: DateTime<Utc>,
    ) -> AppResult<MaterializeOutcome> {
        let claimed = pp::Entity::update_many()
            .col_expr(pp::Column::Processed, Expr::value(true))
            .col_expr(pp::Column::ProcessedAt, Expr::value(now))
            .col_expr(pp::Column::UpdatedAt, Expr::value(now))
            .filter(pp::Column::Id.eq(pending_payment_id))
            .filter(pp::Column::Processed.eq(false))
            .exec(txn)
            .await?;

        let pending = pp::Entity::find_by_id(pending_payment_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Pending payment {pending_payment_id} not found"))
            })?;

        if claimed.rows_affected == 0 {
            return Ok(MaterializeOutcome::AlreadyProcessed {
                client_id: pending.client_id,
                contract_id: pending.contract_id,
            });
        }

        let pets_payload: Vec<PetPayload> = serde_json::from_str(&pending.pets_data)?;

        let client = upsert_client(txn, &pending, now).await?;

        let mut pets = Vec::with_capacity(pets_payload.len());
        for pet in &pets_payload {
            let model = pet_entity::ActiveModel {
                client_id: Set(client.id),
                contract_id: Set(None),
                plan_id: Set(Some(pending.plan_id)),
                name: Set(pet.name.trim().to_string()),
                species: Set(pet.species.trim().to_string()),
                breed: Set(pet.breed.clone()),
                age: Set(pet.age),
                sex: Set(pet.sex.clone()),
                castrated: Set(pet.castrated.unwrap_or(false)),
                weight: Set(pet.weight),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            pets.push(model);
        }

        let (monthly_amount_cents, annual_amount_cents) = match pending.billing_period {
            BillingPeriod::Annual => {
                ((pending.amount_cents + 6) / 12, Some(pending.amount_cents))
            }
            BillingPeriod::Monthly => (pending.amount_cents, None),
        };

        let contract = contract_entity::ActiveModel {
            contract_number: Set(generate_contract_number(now, pending.id)),
            client_id: Set(client.id),
            plan_id: Set(pending.plan_id),
            pending_payment_id: Set(Some(pending.id)),
            billing_period: Set(pending.billing_period),
            monthly_amount_cents: Set(monthly_amount_cents),
            annual_amount_cents: Set(annual_amount_cents),
            status: Set(ContractStatus::Active),
            payment_method: Set(pending.payment_method),
            cielo_card_token: Set(pending.card_token.clone()),
            card_brand: Set(pending.card_brand.clone()),
            seller_id: Set(pending.seller_id.clone()),
            coupon_code: Set(pending.coupon_code.clone()),
            start_date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let period = Duration::days(pending.billing_period.period_days());
        let period_end = now + period;
        let installment = installment_entity::ActiveModel {
            contract_id: Set(contract.id),
            installment_number: Set(1),
            due_date: Set(now),
            period_start: Set(now),
            period_end: Set(period_end),
            amount_cents: Set(pending.amount_cents),
            status: Set(if payment_confirmed {
                InstallmentStatus::Paid
            } else {
                InstallmentStatus::Pending
            }),
            paid_at: Set(payment_confirmed.then_some(now)),
            payment_method: Set(Some(pending.payment_method)),
            cielo_payment_id: Set(payment_confirmed.then(|| pending.cielo_payment_id.clone())),
            attempt_count: Set(0),
            last_attempt_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let next_installment = if payment_confirmed {
            let model = installment_entity::ActiveModel {
                contract_id: Set(contract.id),
                installment_number: Set(2),
                due_date: Set(period_end),
                period_start: Set(period_end),
                period_end: Set(period_end + period),
                amount_cents: Set(pending.amount_cents),
                status: Set(InstallmentStatus::Pending),
                paid_at: Set(None),
                payment_method: Set(Some(pending.payment_method)),
                cielo_payment_id: Set(None),
                attempt_count: Set(0),
                last_attempt_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            Some(model)
        } else {
            None
        };

        pet_entity::Entity::update_many()
            .col_expr(pet_entity::Column::ContractId, Expr::value(contract.id))
            .col_expr(pet_entity::Column::UpdatedAt, Expr::value(now))
            .filter(pet_entity::Column::Id.is_in(pets.iter().map(|p| p.id)))
            .exec(txn)
            .await?;
        for pet in pets.iter_mut() {
            pet.contract_id = Some(contract.id);
        }

        let mut pending_active = pending.into_active_model();
        pending_active.client_id = Set(Some(client.id));
        pending_active.contract_id = Set(Some(contract.id));
        pending_active.payment_status = Set(PaymentStatus::Approved);
        pending_active.updated_at = Set(now);
        pending_active.update(txn).await?;

        Ok(MaterializeOutcome::Created {
            client,
            contract,
            installment,
            next_installment,
            pets,
        })
    }
}

/// Reuses the client matching the email or CPF, refreshing its contact data.
async fn upsert_client(
    txn: &DatabaseTransaction,
    pending: &pp::Model,
    now: DateTime<Utc>,
) -> AppResult<client_entity::Model> {
    let email = pending.customer_email.trim().to_lowercase();
    let existing = client_entity::Entity::find()
        .filter(
            Condition::any()
                .add(client_entity::Column::Email.eq(&email))
                .add(client_entity::Column::Cpf.eq(&pending.customer_cpf)),
        )
        .one(txn)
        .await?;

    if let Some(client) = existing {
        let mut active = client.into_active_model();
        if pending.customer_phone.is_some() {
            active.phone = Set(pending.customer_phone.clone());
        }
        if pending.address.is_some() {
            active.address = Set(pending.address.clone());
            active.address_number = Set(pending.address_number.clone());
            active.complement = Set(pending.complement.clone());
            active.district = Set(pending.district.clone());
            active.city = Set(pending.city.clone());
            active.state = Set(pending.state.clone());
            active.cep = Set(pending.cep.clone());
        }
        active.updated_at = Set(now);
        return Ok(active.update(txn).await?);
    }

    Ok(client_entity::ActiveModel {
        full_name: Set(pending.customer_name.trim().to_string()),
        email: Set(email),
        cpf: Set(pending.customer_cpf.clone()),
        phone: Set(pending.customer_phone.clone()),
        address: Set(pending.address.clone()),
        address_number: Set(pending.address_number.clone()),
        complement: Set(pending.complement.clone()),
        district: Set(pending.district.clone()),
        city: Set(pending.city.clone()),
        state: Set(pending.state.clone()),
        cep: Set(pending.cep.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?)
}

fn materialization_error(pending_payment_id: i32, err: impl std::fmt::Display) -> AppError {
    AppError::MaterializationError {
        pending_payment_id,
        reason: err.to_string(),
    }
}
