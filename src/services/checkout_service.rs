use crate::entities::{PaymentStatus, pending_payment_entity as pp, plan_entity};
use crate::error::{AppError, AppResult};
use crate::external::{
    CardData, CardSaleRequest, CieloStatus, GatewayAddress, GatewayCustomer, GatewayPayment,
    PaymentGateway, PixSaleRequest,
};
use crate::models::{
    CardDetails, CheckoutMethod, CheckoutRequest, CheckoutResponse, ClientSummary,
    ContractSummary, PaymentSummary, ValidatedCheckout,
};
use crate::services::pricing::{self, PriceQuote};
use crate::services::{
    CouponService, MaterializeOutcome, NewPendingPayment, PaymentProcessorService,
    PendingPaymentService,
};
use crate::utils::documents::mask_card_number;
use crate::utils::format::cents_to_reais;
use crate::utils::generate_order_id;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

/// PIX charges can be paid for this long.
const PIX_EXPIRATION_HOURS: i64 = 24;

#[derive(Clone)]
pub struct CheckoutService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    pending_payments: PendingPaymentService,
    processor: PaymentProcessorService,
    coupons: CouponService,
}

impl CheckoutService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        pending_payments: PendingPaymentService,
        processor: PaymentProcessorService,
        coupons: CouponService,
    ) -> Self {
        Self {
            pool,
            gateway,
            pending_payments,
            processor,
            coupons,
        }
    }

    pub async fn process(
        &self,
        request: CheckoutRequest,
        correlation_id: &str,
    ) -> AppResult<CheckoutResponse> {
        let checkout = request.validate()?;

        let plan = plan_entity::Entity::find_by_id(checkout.plan_id)
            .one(&self.pool)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::PlanNotFound(checkout.plan_id))?;

        let quote = self.price(&plan, &checkout, correlation_id).await;
        log::info!(
            "[{correlation_id}] Checkout for plan {} ({}): {} pet(s), total {} cents, final {} cents, {}",
            plan.id,
            plan.name,
            checkout.pets.len(),
            quote.total_cents,
            quote.final_cents,
            checkout.method.payment_method()
        );

        match &checkout.method {
            CheckoutMethod::CreditCard(card) => {
                self.process_card(&checkout, card, &quote, correlation_id)
                    .await
            }
            CheckoutMethod::Pix => self.process_pix(&checkout, &quote, correlation_id).await,
        }
    }

    /// Coupon problems never block a sale; the customer pays full price.
    async fn price(
        &self,
        plan: &plan_entity::Model,
        checkout: &ValidatedCheckout,
        correlation_id: &str,
    ) -> PriceQuote {
        let quote = pricing::quote(&plan.name, plan.base_price, checkout.pets.len());
        let Some(code) = &checkout.coupon else {
            return quote;
        };
        match self.coupons.validate(code).await {
            Ok(coupon) => {
                let quote = quote.with_coupon(coupon.discount_type, coupon.value);
                log::info!(
                    "[{correlation_id}] Coupon {code} applied: -{} cents",
                    quote.coupon_discount_cents
                );
                quote
            }
            Err(e) => {
                log::warn!("[{correlation_id}] Coupon {code} ignored: {e}");
                quote
            }
        }
    }

    async fn process_card(
        &self,
        checkout: &ValidatedCheckout,
        card: &CardDetails,
        quote: &PriceQuote,
        correlation_id: &str,
    ) -> AppResult<CheckoutResponse> {
        let order_id = generate_order_id("UNP");
        log::info!(
            "[{correlation_id}] Card sale {order_id} with {} {} in {}x",
            card.brand,
            mask_card_number(&card.number),
            card.installments
        );

        let request = CardSaleRequest {
            order_id: order_id.clone(),
            customer: gateway_customer(checkout),
            amount_cents: quote.final_cents,
            installments: card.installments,
            card: CardData {
                number: card.number.clone(),
                holder: card.holder.clone(),
                expiration_date: card.expiration_date.clone(),
                security_code: card.security_code.clone(),
                brand: card.brand.clone(),
            },
            save_card: true,
        };

        let payment = match self.gateway.create_card_sale(&request).await {
            Ok(payment) => payment,
            Err(e) => {
                self.record_gateway_failure(checkout, quote, &order_id, card, &e, correlation_id)
                    .await;
                return Err(e);
            }
        };

        let approved = payment.status.is_approved();
        let mut record = new_pending_payment(checkout, quote, &payment);
        record.payment_status = if approved {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Rejected
        };
        record.installments = card.installments;
        record.card_brand = payment.card_brand.clone().or_else(|| Some(card.brand.clone()));
        let pending = self.pending_payments.create(record).await?;

        if !approved {
            log::warn!(
                "[{correlation_id}] Card payment {} not approved: status {:?} return {:?} {:?}",
                payment.payment_id,
                payment.status,
                payment.return_code,
                payment.return_message
            );
            return Err(AppError::GatewayDeclined {
                status: payment.status.code(),
                return_code: payment.return_code.unwrap_or_default(),
                return_message: payment
                    .return_message
                    .unwrap_or_else(|| "Pagamento não autorizado".to_string()),
            });
        }

        if pending.card_token.is_none() {
            log::warn!(
                "[{correlation_id}] Gateway returned no card token for {}; renewals will need manual payment",
                payment.payment_id
            );
        }

        let summary = payment_summary(&pending, "approved");
        match self
            .processor
            .materialize(pending.id, true, correlation_id)
            .await
        {
            Ok(outcome) => Ok(CheckoutResponse {
                success: true,
                message: "Pagamento aprovado e contrato criado com sucesso".to_string(),
                payment: summary,
                client: client_summary(&outcome),
                contract: contract_summary(&outcome),
            }),
            // the customer has been charged; reconciliation happens from the
            // pending payment, never by failing the sale
            Err(e) => {
                log::error!(
                    "[{correlation_id}] Card payment {} approved but contract creation failed: {e}",
                    pending.cielo_payment_id
                );
                Ok(CheckoutResponse {
                    success: true,
                    message: "Pagamento aprovado. Seu contrato está sendo processado".to_string(),
                    payment: summary,
                    client: None,
                    contract: None,
                })
            }
        }
    }

    async fn process_pix(
        &self,
        checkout: &ValidatedCheckout,
        quote: &PriceQuote,
        correlation_id: &str,
    ) -> AppResult<CheckoutResponse> {
        let order_id = generate_order_id("UNP");
        let request = PixSaleRequest {
            order_id: order_id.clone(),
            customer: gateway_customer(checkout),
            amount_cents: quote.final_cents,
        };

        let payment = self.gateway.create_pix_sale(&request).await?;

        if payment.status != CieloStatus::Pending {
            log::warn!(
                "[{correlation_id}] PIX sale {order_id} returned unexpected status {:?}",
                payment.status
            );
            let mut record = new_pending_payment(checkout, quote, &payment);
            record.payment_status = PaymentStatus::Rejected;
            self.pending_payments.create(record).await?;
            return Err(AppError::GatewayDeclined {
                status: payment.status.code(),
                return_code: payment.return_code.unwrap_or_default(),
                return_message: payment
                    .return_message
                    .unwrap_or_else(|| "Não foi possível gerar o PIX".to_string()),
            });
        }

        let mut record = new_pending_payment(checkout, quote, &payment);
        record.payment_status = PaymentStatus::Pending;
        record.pix_qr_code = payment.qr_code_base64_image.clone();
        record.pix_code = payment.qr_code_string.clone();
        record.expires_at = Some(Utc::now() + Duration::hours(PIX_EXPIRATION_HOURS));
        let pending = self.pending_payments.create(record).await?;

        log::info!(
            "[{correlation_id}] PIX {} generated for pending payment {}, expires at {:?}",
            pending.cielo_payment_id,
            pending.id,
            pending.expires_at
        );

        let mut summary = payment_summary(&pending, "pending");
        summary.pix_qr_code = pending.pix_qr_code.clone();
        summary.pix_code = pending.pix_code.clone();
        summary.expires_at = pending.expires_at;

        Ok(CheckoutResponse {
            success: true,
            message: "PIX gerado com sucesso. Aguardando pagamento".to_string(),
            payment: summary,
            client: None,
            contract: None,
        })
    }

    /// The gateway refused the request outright, so there is no gateway
    /// payment id. The attempt is still recorded under the merchant order id.
    async fn record_gateway_failure(
        &self,
        checkout: &ValidatedCheckout,
        quote: &PriceQuote,
        order_id: &str,
        card: &CardDetails,
        error: &AppError,
        correlation_id: &str,
    ) {
        let (return_code, return_message) = match error {
            AppError::GatewayError {
                return_code,
                return_message,
            } => (Some(return_code.clone()), Some(return_message.clone())),
            other => (None, Some(other.to_string())),
        };

        let mut record = new_pending_payment(
            checkout,
            quote,
            &GatewayPayment {
                payment_id: order_id.to_string(),
                status: CieloStatus::Denied,
                amount_cents: None,
                return_code,
                return_message,
                authorization_code: None,
                tid: None,
                proof_of_sale: None,
                card_token: None,
                card_brand: None,
                qr_code_base64_image: None,
                qr_code_string: None,
            },
        );
        record.payment_status = PaymentStatus::Rejected;
        record.installments = card.installments;
        record.card_brand = Some(card.brand.clone());

        if let Err(e) = self.pending_payments.create(record).await {
            log::error!("[{correlation_id}] Failed to record rejected sale {order_id}: {e}");
        }
    }
}

fn gateway_customer(checkout: &ValidatedCheckout) -> GatewayCustomer {
    let a = &checkout.address;
    let has_address = a.address.is_some() || a.cep.is_some() || a.city.is_some();
    GatewayCustomer {
        name: checkout.customer.name.clone(),
        email: checkout.customer.email.clone(),
        cpf: checkout.customer.cpf.clone(),
        address: has_address.then(|| GatewayAddress {
            street: a.address.clone(),
            number: a.number.clone(),
            complement: a.complement.clone(),
            district: a.district.clone(),
            zip_code: a.cep.as_deref().map(crate::utils::documents::only_digits),
            city: a.city.clone(),
            state: a.state.clone(),
        }),
    }
}

fn new_pending_payment(
    checkout: &ValidatedCheckout,
    quote: &PriceQuote,
    payment: &GatewayPayment,
) -> NewPendingPayment {
    let a = &checkout.address;
    NewPendingPayment {
        cielo_payment_id: payment.payment_id.clone(),
        payment_method: checkout.method.payment_method(),
        payment_status: PaymentStatus::Pending,
        customer_name: checkout.customer.name.clone(),
        customer_email: checkout.customer.email.clone(),
        customer_cpf: checkout.customer.cpf.clone(),
        customer_phone: checkout.customer.phone.clone(),
        address: a.address.clone(),
        address_number: a.number.clone(),
        complement: a.complement.clone(),
        district: a.district.clone(),
        city: a.city.clone(),
        state: a.state.clone(),
        cep: a.cep.clone(),
        plan_id: checkout.plan_id,
        billing_period: quote.billing_period,
        amount_cents: quote.final_cents,
        installments: 1,
        pets_data: serde_json::to_string(&checkout.pets).unwrap_or_else(|_| "[]".to_string()),
        pix_qr_code: None,
        pix_code: None,
        seller_id: checkout.seller_id.clone(),
        coupon_code: (quote.coupon_discount_cents > 0)
            .then(|| checkout.coupon.clone())
            .flatten(),
        coupon_discount_cents: quote.coupon_discount_cents,
        card_token: payment.card_token.clone(),
        card_brand: payment.card_brand.clone(),
        authorization_code: payment.authorization_code.clone(),
        tid: payment.tid.clone(),
        return_code: payment.return_code.clone(),
        return_message: payment.return_message.clone(),
        expires_at: None,
    }
}

fn payment_summary(pending: &pp::Model, status: &str) -> PaymentSummary {
    PaymentSummary {
        payment_id: pending.cielo_payment_id.clone(),
        status: status.to_string(),
        method: pending.payment_method,
        amount: cents_to_reais(pending.amount_cents),
        pix_qr_code: None,
        pix_code: None,
        expires_at: None,
    }
}

fn client_summary(outcome: &MaterializeOutcome) -> Option<ClientSummary> {
    match outcome {
        MaterializeOutcome::Created { client, .. } => Some(ClientSummary {
            id: client.id,
            name: client.full_name.clone(),
            email: client.email.clone(),
        }),
        MaterializeOutcome::AlreadyProcessed { .. } => None,
    }
}

fn contract_summary(outcome: &MaterializeOutcome) -> Option<ContractSummary> {
    match outcome {
        MaterializeOutcome::Created { contract, .. } => Some(ContractSummary {
            id: contract.id,
            contract_number: contract.contract_number.clone(),
            status: contract.status.to_string(),
            billing_period: contract.billing_period.to_string(),
        }),
        MaterializeOutcome::AlreadyProcessed { .. } => None,
    }
}
