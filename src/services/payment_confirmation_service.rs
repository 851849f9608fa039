use crate::entities::{PaymentMethod, PaymentStatus, pending_payment_entity as pp};
use crate::error::{AppError, AppResult};
use crate::external::{GatewayPayment, PaymentGateway};
use crate::models::{CieloNotification, PaymentStatusResponse, ReprocessResponse, WebhookAck};
use crate::services::{MaterializeOutcome, PaymentProcessorService, PendingPaymentService};
use crate::utils::format::cents_to_reais;
use chrono::Utc;
use std::sync::Arc;

/// Result of applying an authoritative gateway status to a pending payment.
#[derive(Debug)]
pub enum Reconciliation {
    Materialized(MaterializeOutcome),
    Rejected,
    StillPending,
}

/// Confirms pending payments against the gateway: webhook notifications,
/// status polling and manual reprocessing all end up here.
#[derive(Clone)]
pub struct PaymentConfirmationService {
    gateway: Arc<dyn PaymentGateway>,
    pending_payments: PendingPaymentService,
    processor: PaymentProcessorService,
}

impl PaymentConfirmationService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        pending_payments: PendingPaymentService,
        processor: PaymentProcessorService,
    ) -> Self {
        Self {
            gateway,
            pending_payments,
            processor,
        }
    }

    pub async fn handle_notification(
        &self,
        notification: &CieloNotification,
        correlation_id: &str,
    ) -> AppResult<WebhookAck> {
        log::info!(
            "[{correlation_id}] Cielo notification for payment {} (change type {})",
            notification.payment_id,
            notification.change_type
        );

        let Some(pending) = self
            .pending_payments
            .find_by_gateway_id(&notification.payment_id)
            .await?
        else {
            log::warn!(
                "[{correlation_id}] No pending payment for gateway payment {}",
                notification.payment_id
            );
            return Ok(WebhookAck::with_message("Pagamento não encontrado"));
        };

        if pending.processed {
            log::info!(
                "[{correlation_id}] Pending payment {} already processed, ignoring notification",
                pending.id
            );
            return Ok(WebhookAck::with_message("Pagamento já processado"));
        }

        let payment = self.gateway.query_payment(&pending.cielo_payment_id).await?;
        match self.reconcile(&pending, &payment, correlation_id).await? {
            Reconciliation::Materialized(_) => Ok(WebhookAck::with_message("Pagamento confirmado")),
            Reconciliation::Rejected => Ok(WebhookAck::with_message("Pagamento recusado")),
            Reconciliation::StillPending => Ok(WebhookAck::received()),
        }
    }

    /// Applies the gateway's view of a payment to its pending record.
    pub async fn reconcile(
        &self,
        pending: &pp::Model,
        payment: &GatewayPayment,
        correlation_id: &str,
    ) -> AppResult<Reconciliation> {
        if payment.status.is_approved() {
            self.pending_payments.mark_approved(pending.id, payment).await?;
            let outcome = self
                .processor
                .materialize(pending.id, true, correlation_id)
                .await?;
            return Ok(Reconciliation::Materialized(outcome));
        }

        if payment.status.is_terminal_failure() {
            log::info!(
                "[{correlation_id}] Gateway payment {} ended with status {:?}",
                payment.payment_id,
                payment.status
            );
            self.pending_payments
                .mark_rejected(
                    pending.id,
                    payment.return_code.clone(),
                    payment.return_message.clone(),
                )
                .await?;
            return Ok(Reconciliation::Rejected);
        }

        log::debug!(
            "[{correlation_id}] Gateway payment {} still in status {:?}",
            payment.payment_id,
            payment.status
        );
        Ok(Reconciliation::StillPending)
    }

    /// Storefront polling. Unprocessed PIX payments are checked with the
    /// gateway so a missed webhook does not leave the customer waiting.
    pub async fn payment_status(
        &self,
        payment_id: &str,
        correlation_id: &str,
    ) -> AppResult<PaymentStatusResponse> {
        let mut pending = self
            .pending_payments
            .find_by_gateway_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pagamento {payment_id} não encontrado")))?;

        let now = Utc::now();
        let should_poll = !pending.processed
            && pending.payment_method == PaymentMethod::Pix
            && pending.payment_status == PaymentStatus::Pending
            && !pending.is_expired(now);

        if should_poll {
            match self.gateway.query_payment(payment_id).await {
                Ok(payment) => {
                    if let Err(e) = self.reconcile(&pending, &payment, correlation_id).await {
                        log::error!(
                            "[{correlation_id}] Failed to reconcile payment {payment_id}: {e}"
                        );
                    }
                    pending = self.pending_payments.get(pending.id).await?;
                }
                Err(e) => {
                    log::warn!("[{correlation_id}] Gateway query for {payment_id} failed: {e}");
                }
            }
        }

        Ok(PaymentStatusResponse {
            success: true,
            payment_id: pending.cielo_payment_id.clone(),
            method: pending.payment_method,
            status: pending.payment_status.to_string(),
            processed: pending.processed,
            expired: pending.is_expired(now),
            amount: cents_to_reais(pending.amount_cents),
            client_id: pending.client_id,
            contract_id: pending.contract_id,
        })
    }

    /// Admin retry for payments that were charged but never materialized.
    pub async fn reprocess(
        &self,
        pending_payment_id: i32,
        correlation_id: &str,
    ) -> AppResult<ReprocessResponse> {
        let pending = self.pending_payments.get(pending_payment_id).await?;

        if pending.processed {
            return Ok(ReprocessResponse {
                success: true,
                message: "Pagamento já processado".to_string(),
                already_processed: true,
                client_id: pending.client_id,
                contract_id: pending.contract_id,
            });
        }

        let outcome = if pending.payment_status == PaymentStatus::Approved {
            self.processor
                .materialize(pending.id, true, correlation_id)
                .await?
        } else {
            let payment = self.gateway.query_payment(&pending.cielo_payment_id).await?;
            match self.reconcile(&pending, &payment, correlation_id).await? {
                Reconciliation::Materialized(outcome) => outcome,
                Reconciliation::Rejected | Reconciliation::StillPending => {
                    return Err(AppError::validation(format!(
                        "Pagamento {} não está aprovado no gateway (status {})",
                        pending.cielo_payment_id,
                        payment.status.code()
                    )));
                }
            }
        };

        let already_processed = matches!(outcome, MaterializeOutcome::AlreadyProcessed { .. });
        log::info!(
            "[{correlation_id}] Pending payment {pending_payment_id} reprocessed (contract {:?})",
            outcome.contract_id()
        );
        Ok(ReprocessResponse {
            success: true,
            message: if already_processed {
                "Pagamento já processado".to_string()
            } else {
                "Contrato criado com sucesso".to_string()
            },
            already_processed,
            client_id: outcome.client_id(),
            contract_id: outcome.contract_id(),
        })
    }
}
