use crate::entities::{
    ContractStatus, InstallmentStatus, PaymentMethod, client_entity, contract_entity,
    installment_entity, pet_entity, plan_entity,
};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentGateway, TokenChargeRequest};
use crate::models::{NotificationBatchResult, RenewalAttempt, RenewalBatchResult};
use crate::services::{MailContext, NotificationService};
use crate::utils::dates::{days_overdue, is_due_in_exactly, is_overdue};
use crate::utils::generate_order_id;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;

/// Days past due on which an overdue notice goes out.
pub const OVERDUE_NOTICE_DAYS: [i64; 5] = [1, 3, 7, 15, 30];

/// An installment whose last charge attempt failed is left alone for this long.
pub const RETRY_COOLDOWN_HOURS: i64 = 24;

pub fn should_notify_overdue(days: i64) -> bool {
    OVERDUE_NOTICE_DAYS.contains(&days)
}

pub fn attempted_recently(installment: &installment_entity::Model, now: DateTime<Utc>) -> bool {
    installment
        .last_attempt_at
        .is_some_and(|at| now - at < Duration::hours(RETRY_COOLDOWN_HOURS))
}

/// Contract and client behind an installment, once it passed eligibility.
struct RenewalTarget {
    contract: contract_entity::Model,
    client: client_entity::Model,
    mail: MailContext,
}

#[derive(Clone)]
pub struct RenewalService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationService,
}

impl RenewalService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            pool,
            gateway,
            notifications,
        }
    }

    pub async fn process_overdue_renewals(&self) -> AppResult<RenewalBatchResult> {
        self.process_overdue_renewals_at(Utc::now()).await
    }

    pub async fn process_overdue_renewals_at(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<RenewalBatchResult> {
        let installments = self.find_overdue_installments(now).await?;
        log::info!("Renewal batch: {} overdue installment(s)", installments.len());

        let mut batch = RenewalBatchResult::default();
        for installment in installments {
            if attempted_recently(&installment, now) {
                log::debug!(
                    "Installment {} skipped: attempted at {:?}",
                    installment.id,
                    installment.last_attempt_at
                );
                continue;
            }
            let target = match self.load_target(&installment).await {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(e) => {
                    log::error!(
                        "Failed to load contract for installment {}: {e}",
                        installment.id
                    );
                    batch.push(RenewalAttempt {
                        installment_id: installment.id,
                        contract_id: installment.contract_id,
                        success: false,
                        payment_id: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let attempt = self.renew(&installment, &target, now).await;
            batch.push(attempt);
        }

        log::info!(
            "Renewal batch finished: processed={} successful={} failed={}",
            batch.processed,
            batch.successful,
            batch.failed
        );
        Ok(batch)
    }

    /// Unpaid installments with at least 24 hours elapsed since their due date.
    pub async fn find_overdue_installments(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<installment_entity::Model>> {
        let rows = installment_entity::Entity::find()
            .filter(installment_entity::Column::Status.ne(InstallmentStatus::Paid))
            .filter(installment_entity::Column::DueDate.lt(now))
            .order_by_asc(installment_entity::Column::DueDate)
            .all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|i| is_overdue(i.due_date, now))
            .collect())
    }

    /// `None` when the installment is not eligible for automatic renewal.
    async fn load_target(
        &self,
        installment: &installment_entity::Model,
    ) -> AppResult<Option<RenewalTarget>> {
        let Some(contract) = contract_entity::Entity::find_by_id(installment.contract_id)
            .one(&self.pool)
            .await?
        else {
            log::warn!(
                "Installment {} skipped: contract {} not found",
                installment.id,
                installment.contract_id
            );
            return Ok(None);
        };

        if contract.payment_method != PaymentMethod::CreditCard {
            log::debug!(
                "Installment {} skipped: contract {} is paid by {}",
                installment.id,
                contract.id,
                contract.payment_method
            );
            return Ok(None);
        }
        if contract.status == ContractStatus::Cancelled {
            log::debug!(
                "Installment {} skipped: contract {} is cancelled",
                installment.id,
                contract.id
            );
            return Ok(None);
        }

        let client = client_entity::Entity::find_by_id(contract.client_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client {} not found", contract.client_id)))?;
        let mail = self.mail_context(&contract, &client).await?;

        Ok(Some(RenewalTarget {
            contract,
            client,
            mail,
        }))
    }

    async fn mail_context(
        &self,
        contract: &contract_entity::Model,
        client: &client_entity::Model,
    ) -> AppResult<MailContext> {
        let plan_name = plan_entity::Entity::find_by_id(contract.plan_id)
            .one(&self.pool)
            .await?
            .map(|plan| plan.name)
            .unwrap_or_default();
        let pet_names = pet_entity::Entity::find()
            .filter(pet_entity::Column::ContractId.eq(contract.id))
            .order_by_asc(pet_entity::Column::Id)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|pet| pet.name)
            .collect();

        Ok(MailContext {
            client_name: client.full_name.clone(),
            contract_number: contract.contract_number.clone(),
            plan_name,
            pet_names,
        })
    }

    /// Stamps a charge attempt so the next batches leave the installment alone
    /// until the cooldown passes.
    async fn record_attempt(&self, installment: &installment_entity::Model, now: DateTime<Utc>) {
        let result = installment_entity::Entity::update_many()
            .col_expr(
                installment_entity::Column::AttemptCount,
                Expr::col(installment_entity::Column::AttemptCount).add(1),
            )
            .col_expr(installment_entity::Column::LastAttemptAt, Expr::value(now))
            .col_expr(installment_entity::Column::UpdatedAt, Expr::value(now))
            .filter(installment_entity::Column::Id.eq(installment.id))
            .exec(&self.pool)
            .await;
        if let Err(e) = result {
            log::error!(
                "Failed to record renewal attempt for installment {}: {e}",
                installment.id
            );
        }
    }

    async fn renew(
        &self,
        installment: &installment_entity::Model,
        target: &RenewalTarget,
        now: DateTime<Utc>,
    ) -> RenewalAttempt {
        let contract = &target.contract;
        let client = &target.client;

        let Some(card_token) = contract.cielo_card_token.clone() else {
            log::warn!(
                "Contract {} has no saved card, renewal of installment {} needs manual payment",
                contract.id,
                installment.id
            );
            self.record_attempt(installment, now).await;
            self.notifications
                .send_renewal_failure(
                    &client.email,
                    &target.mail,
                    installment.amount_cents,
                    "Não há cartão cadastrado para cobrança automática. Realize o pagamento manualmente ou cadastre um cartão.",
                )
                .await;
            return RenewalAttempt {
                installment_id: installment.id,
                contract_id: contract.id,
                success: false,
                payment_id: None,
                message: "No saved card token".to_string(),
            };
        };

        let request = TokenChargeRequest {
            order_id: generate_order_id("REN"),
            customer_name: client.full_name.clone(),
            amount_cents: installment.amount_cents,
            card_token,
            brand: contract
                .card_brand
                .clone()
                .unwrap_or_else(|| "Visa".to_string()),
        };

        let charge = match self.gateway.charge_card_token(&request).await {
            Ok(payment) if payment.status.is_approved() => payment,
            Ok(payment) => {
                let reason = payment
                    .return_message
                    .clone()
                    .unwrap_or_else(|| format!("Status {}", payment.status.code()));
                return self
                    .fail(installment, target, Some(payment.payment_id), reason, now)
                    .await;
            }
            Err(e) => {
                let reason = match &e {
                    AppError::GatewayError { return_message, .. } => return_message.clone(),
                    other => other.to_string(),
                };
                return self.fail(installment, target, None, reason, now).await;
            }
        };

        let next_due = match self
            .record_payment(installment, contract, &charge.payment_id, now)
            .await
        {
            Ok(next) => next,
            Err(e) => {
                // charged but not recorded: needs reconciliation by payment id
                self.record_attempt(installment, now).await;
                log::error!(
                    "Installment {} charged as {} but could not be recorded: {e}",
                    installment.id,
                    charge.payment_id
                );
                return RenewalAttempt {
                    installment_id: installment.id,
                    contract_id: contract.id,
                    success: false,
                    payment_id: Some(charge.payment_id),
                    message: format!("Charged but not recorded: {e}"),
                };
            }
        };

        log::info!(
            "Installment {} of contract {} renewed with payment {}",
            installment.id,
            contract.id,
            charge.payment_id
        );
        self.notifications
            .send_renewal_success(
                &client.email,
                &target.mail,
                installment.amount_cents,
                next_due,
            )
            .await;

        RenewalAttempt {
            installment_id: installment.id,
            contract_id: contract.id,
            success: true,
            payment_id: Some(charge.payment_id),
            message: "Renewed".to_string(),
        }
    }

    async fn fail(
        &self,
        installment: &installment_entity::Model,
        target: &RenewalTarget,
        payment_id: Option<String>,
        reason: String,
        now: DateTime<Utc>,
    ) -> RenewalAttempt {
        log::warn!(
            "Renewal of installment {} (contract {}) failed: {reason}",
            installment.id,
            target.contract.id
        );
        self.record_attempt(installment, now).await;
        self.notifications
            .send_renewal_failure(
                &target.client.email,
                &target.mail,
                installment.amount_cents,
                &reason,
            )
            .await;
        RenewalAttempt {
            installment_id: installment.id,
            contract_id: target.contract.id,
            success: false,
            payment_id,
            message: reason,
        }
    }

    /// Marks the installment paid, reactivates the contract and opens the next
    /// period. Returns the next due date.
    async fn record_payment(
        &self,
        installment: &installment_entity::Model,
        contract: &contract_entity::Model,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        let txn = self.pool.begin().await?;

        let mut paid = installment.clone().into_active_model();
        paid.status = Set(InstallmentStatus::Paid);
        paid.paid_at = Set(Some(now));
        paid.payment_method = Set(Some(PaymentMethod::CreditCard));
        paid.cielo_payment_id = Set(Some(payment_id.to_string()));
        paid.attempt_count = Set(installment.attempt_count + 1);
        paid.last_attempt_at = Set(Some(now));
        paid.updated_at = Set(now);
        paid.update(&txn).await?;

        if contract.status != ContractStatus::Active {
            let mut active = contract.clone().into_active_model();
            active.status = Set(ContractStatus::Active);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let next_number = installment.installment_number + 1;
        let next_start = installment.period_end;
        let next_end = next_start + Duration::days(contract.billing_period.period_days());

        let exists = installment_entity::Entity::find()
            .filter(installment_entity::Column::ContractId.eq(contract.id))
            .filter(installment_entity::Column::InstallmentNumber.eq(next_number))
            .one(&txn)
            .await?;
        if exists.is_none() {
            installment_entity::ActiveModel {
                contract_id: Set(contract.id),
                installment_number: Set(next_number),
                due_date: Set(next_start),
                period_start: Set(next_start),
                period_end: Set(next_end),
                amount_cents: Set(installment.amount_cents),
                status: Set(InstallmentStatus::Pending),
                paid_at: Set(None),
                payment_method: Set(Some(contract.payment_method)),
                cielo_payment_id: Set(None),
                attempt_count: Set(0),
                last_attempt_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(next_start)
    }

    pub async fn send_payment_reminders(
        &self,
        days_before: i64,
    ) -> AppResult<NotificationBatchResult> {
        self.send_payment_reminders_at(days_before, Utc::now()).await
    }

    /// Reminds clients whose installment falls due exactly `days_before`
    /// calendar days from `now`.
    pub async fn send_payment_reminders_at(
        &self,
        days_before: i64,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationBatchResult> {
        let window_end = now + Duration::days(days_before + 1);
        let rows = installment_entity::Entity::find()
            .filter(installment_entity::Column::Status.eq(InstallmentStatus::Pending))
            .filter(installment_entity::Column::DueDate.gte(now - Duration::days(1)))
            .filter(installment_entity::Column::DueDate.lt(window_end))
            .all(&self.pool)
            .await?;

        let mut result = NotificationBatchResult::default();
        for installment in rows
            .into_iter()
            .filter(|i| is_due_in_exactly(i.due_date, now, days_before))
        {
            result.checked += 1;
            let Some((client, mail)) = self.recipient(&installment).await? else {
                continue;
            };
            let sent = self
                .notifications
                .send_payment_reminder(
                    &client.email,
                    &mail,
                    installment.amount_cents,
                    installment.due_date,
                    days_before,
                )
                .await;
            if sent {
                result.sent += 1;
            } else {
                result.failed += 1;
            }
        }

        log::info!(
            "Payment reminders ({days_before} day(s) before): checked={} sent={} failed={}",
            result.checked,
            result.sent,
            result.failed
        );
        Ok(result)
    }

    pub async fn send_overdue_notifications(&self) -> AppResult<NotificationBatchResult> {
        self.send_overdue_notifications_at(Utc::now()).await
    }

    pub async fn send_overdue_notifications_at(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationBatchResult> {
        let mut result = NotificationBatchResult::default();
        for installment in self.find_overdue_installments(now).await? {
            let days = days_overdue(installment.due_date, now);
            if !should_notify_overdue(days) {
                continue;
            }
            result.checked += 1;
            let Some((client, mail)) = self.recipient(&installment).await? else {
                continue;
            };
            let sent = self
                .notifications
                .send_payment_overdue(
                    &client.email,
                    &mail,
                    installment.amount_cents,
                    installment.due_date,
                    days,
                )
                .await;
            if sent {
                result.sent += 1;
            } else {
                result.failed += 1;
            }
        }

        log::info!(
            "Overdue notifications: checked={} sent={} failed={}",
            result.checked,
            result.sent,
            result.failed
        );
        Ok(result)
    }

    async fn recipient(
        &self,
        installment: &installment_entity::Model,
    ) -> AppResult<Option<(client_entity::Model, MailContext)>> {
        let Some(contract) = contract_entity::Entity::find_by_id(installment.contract_id)
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        if contract.status == ContractStatus::Cancelled {
            return Ok(None);
        }
        let Some(client) = client_entity::Entity::find_by_id(contract.client_id)
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mail = self.mail_context(&contract, &client).await?;
        Ok(Some((client, mail)))
    }
}
