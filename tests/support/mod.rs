#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use unipet_payments::entities::{
    BillingPeriod, ContractStatus, CouponType, InstallmentStatus, PaymentMethod, client_entity,
    contract_entity, coupon_entity, installment_entity, plan_entity,
};
use unipet_payments::error::{AppError, AppResult};
use unipet_payments::external::{
    CardSaleRequest, CieloStatus, GatewayPayment, MailTransport, OutgoingEmail, PaymentGateway,
    PixSaleRequest, TokenChargeRequest,
};
use unipet_payments::services::{
    CheckoutService, CouponService, NotificationService, PaymentConfirmationService,
    PaymentProcessorService, PendingPaymentService, RenewalService,
};

/// A single shared connection keeps the in-memory database alive for the
/// whole test.
pub async fn init_test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let pool = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&pool, None).await.expect("run migrations");
    pool
}

/// What the fake gateway answers for a new card sale.
#[derive(Debug, Clone)]
pub enum CardScript {
    Status(CieloStatus),
    HardError,
}

/// Scripted stand-in for the Cielo API.
pub struct FakeGateway {
    next_id: AtomicUsize,
    card: Mutex<CardScript>,
    pix_status: Mutex<CieloStatus>,
    token_status: Mutex<CieloStatus>,
    queried: Mutex<HashMap<String, CieloStatus>>,
    pub card_sales: Mutex<Vec<CardSaleRequest>>,
    pub token_charges: Mutex<Vec<TokenChargeRequest>>,
    pub queries: Mutex<Vec<String>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            card: Mutex::new(CardScript::Status(CieloStatus::PaymentConfirmed)),
            pix_status: Mutex::new(CieloStatus::Pending),
            token_status: Mutex::new(CieloStatus::PaymentConfirmed),
            queried: Mutex::new(HashMap::new()),
            card_sales: Mutex::new(Vec::new()),
            token_charges: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn script_card(&self, script: CardScript) {
        *self.card.lock().unwrap() = script;
    }

    pub fn script_pix(&self, status: CieloStatus) {
        *self.pix_status.lock().unwrap() = status;
    }

    pub fn script_token(&self, status: CieloStatus) {
        *self.token_status.lock().unwrap() = status;
    }

    /// Status reported by `query_payment` for `payment_id`.
    pub fn settle(&self, payment_id: &str, status: CieloStatus) {
        self.queried
            .lock()
            .unwrap()
            .insert(payment_id.to_string(), status);
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn next_payment_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn gateway_payment(payment_id: &str, status: CieloStatus, amount_cents: i64) -> GatewayPayment {
    let approved = status.is_approved();
    GatewayPayment {
        payment_id: payment_id.to_string(),
        status,
        amount_cents: Some(amount_cents),
        return_code: Some(if approved { "00" } else { "05" }.to_string()),
        return_message: Some(if approved { "Operation Successful" } else { "Not Authorized" }.to_string()),
        authorization_code: approved.then(|| "123456".to_string()),
        tid: Some("0000000000000001".to_string()),
        proof_of_sale: None,
        card_token: None,
        card_brand: None,
        qr_code_base64_image: None,
        qr_code_string: None,
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_card_sale(&self, request: &CardSaleRequest) -> AppResult<GatewayPayment> {
        self.card_sales.lock().unwrap().push(request.clone());
        let script = self.card.lock().unwrap().clone();
        match script {
            CardScript::HardError => Err(AppError::GatewayError {
                return_code: "126".to_string(),
                return_message: "Credit Card Expiration Date is invalid".to_string(),
            }),
            CardScript::Status(status) => {
                let id = self.next_payment_id("card");
                let mut payment = gateway_payment(&id, status, request.amount_cents);
                if status.is_approved() {
                    payment.card_token = Some(format!("tok-{id}"));
                    payment.card_brand = Some(request.card.brand.clone());
                }
                Ok(payment)
            }
        }
    }

    async fn create_pix_sale(&self, request: &PixSaleRequest) -> AppResult<GatewayPayment> {
        let status = *self.pix_status.lock().unwrap();
        let id = self.next_payment_id("pix");
        let mut payment = gateway_payment(&id, status, request.amount_cents);
        payment.qr_code_base64_image = Some("iVBORw0KGgo=".to_string());
        payment.qr_code_string = Some(format!("00020101021226{id}"));
        Ok(payment)
    }

    async fn charge_card_token(&self, request: &TokenChargeRequest) -> AppResult<GatewayPayment> {
        self.token_charges.lock().unwrap().push(request.clone());
        let status = *self.token_status.lock().unwrap();
        let id = self.next_payment_id("renewal");
        Ok(gateway_payment(&id, status, request.amount_cents))
    }

    async fn query_payment(&self, payment_id: &str) -> AppResult<GatewayPayment> {
        self.queries.lock().unwrap().push(payment_id.to_string());
        let status = self
            .queried
            .lock()
            .unwrap()
            .get(payment_id)
            .copied()
            .unwrap_or(CieloStatus::Pending);
        Ok(gateway_payment(payment_id, status, 0))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.subject.clone())
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Every service wired against the fake gateway and mailer.
pub struct TestContext {
    pub pool: DatabaseConnection,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub pending_payments: PendingPaymentService,
    pub checkout: CheckoutService,
    pub confirmation: PaymentConfirmationService,
    pub renewal: RenewalService,
}

pub async fn init_context() -> TestContext {
    let pool = init_test_db().await;
    let gateway = Arc::new(FakeGateway::default());
    let mailer = Arc::new(RecordingMailer::default());

    let gateway_dyn: Arc<dyn PaymentGateway> = gateway.clone();
    let mailer_dyn: Arc<dyn MailTransport> = mailer.clone();

    let coupons = CouponService::new(pool.clone());
    let pending_payments = PendingPaymentService::new(pool.clone());
    let processor = PaymentProcessorService::new(pool.clone(), coupons.clone());
    let checkout = CheckoutService::new(
        pool.clone(),
        gateway_dyn.clone(),
        pending_payments.clone(),
        processor.clone(),
        coupons,
    );
    let confirmation =
        PaymentConfirmationService::new(gateway_dyn.clone(), pending_payments.clone(), processor);
    let notifications = NotificationService::new(Some(mailer_dyn), "https://unipet.test");
    let renewal = RenewalService::new(pool.clone(), gateway_dyn, notifications);

    TestContext {
        pool,
        gateway,
        mailer,
        pending_payments,
        checkout,
        confirmation,
        renewal,
    }
}

pub async fn seed_plan(
    pool: &DatabaseConnection,
    name: &str,
    base_price: f64,
    is_active: bool,
) -> plan_entity::Model {
    let now = Utc::now();
    plan_entity::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        base_price: Set(base_price),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert plan")
}

pub async fn seed_coupon(
    pool: &DatabaseConnection,
    code: &str,
    discount_type: CouponType,
    value: f64,
) -> coupon_entity::Model {
    let now = Utc::now();
    coupon_entity::ActiveModel {
        code: Set(code.to_string()),
        discount_type: Set(discount_type),
        value: Set(value),
        is_active: Set(true),
        max_uses: Set(None),
        usage_count: Set(0),
        valid_from: Set(None),
        valid_until: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert coupon")
}

pub async fn seed_client(pool: &DatabaseConnection, email: &str, cpf: &str) -> client_entity::Model {
    let now = Utc::now();
    client_entity::ActiveModel {
        full_name: Set("Maria Silva".to_string()),
        email: Set(email.to_string()),
        cpf: Set(cpf.to_string()),
        phone: Set(None),
        address: Set(None),
        address_number: Set(None),
        complement: Set(None),
        district: Set(None),
        city: Set(None),
        state: Set(None),
        cep: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert client")
}

pub async fn seed_contract(
    pool: &DatabaseConnection,
    client_id: i32,
    plan_id: i32,
    number: &str,
    method: PaymentMethod,
    status: ContractStatus,
    card_token: Option<&str>,
) -> contract_entity::Model {
    let now = Utc::now();
    contract_entity::ActiveModel {
        contract_number: Set(number.to_string()),
        client_id: Set(client_id),
        plan_id: Set(plan_id),
        pending_payment_id: Set(None),
        billing_period: Set(BillingPeriod::Monthly),
        monthly_amount_cents: Set(9990),
        annual_amount_cents: Set(None),
        status: Set(status),
        payment_method: Set(method),
        cielo_card_token: Set(card_token.map(str::to_string)),
        card_brand: Set(card_token.map(|_| "Visa".to_string())),
        seller_id: Set(None),
        coupon_code: Set(None),
        start_date: Set(now - Duration::days(40)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert contract")
}

pub async fn seed_installment(
    pool: &DatabaseConnection,
    contract_id: i32,
    number: i32,
    due_date: DateTime<Utc>,
    status: InstallmentStatus,
) -> installment_entity::Model {
    let now = Utc::now();
    installment_entity::ActiveModel {
        contract_id: Set(contract_id),
        installment_number: Set(number),
        due_date: Set(due_date),
        period_start: Set(due_date),
        period_end: Set(due_date + Duration::days(30)),
        amount_cents: Set(9990),
        status: Set(status),
        paid_at: Set(None),
        payment_method: Set(Some(PaymentMethod::CreditCard)),
        cielo_payment_id: Set(None),
        attempt_count: Set(0),
        last_attempt_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert installment")
}

pub const VALID_CPF: &str = "529.982.247-25";

/// Storefront checkout body for `plan_id` with one pet.
pub fn checkout_body(plan_id: i32, method: &str) -> Value {
    let mut body = json!({
        "paymentData": {
            "customer": {
                "name": "Maria Silva",
                "email": "Maria.Silva@Example.com",
                "cpf": VALID_CPF,
                "phone": "11987654321"
            },
            "pets": [
                { "name": "Thor", "species": "Cão", "breed": "SRD", "age": 3, "castrated": true }
            ]
        },
        "planData": { "planId": plan_id },
        "paymentMethod": method,
        "addressData": {
            "address": "Rua das Flores",
            "number": "100",
            "district": "Centro",
            "city": "São Paulo",
            "state": "SP",
            "cep": "01001-000"
        }
    });
    if method == "credit_card" {
        body["paymentData"]["payment"] = json!({
            "cardNumber": "4111 1111 1111 1111",
            "holder": "MARIA SILVA",
            "expirationDate": "12/2030",
            "securityCode": "123",
            "installments": 1
        });
    }
    body
}
