use crate::config::CieloConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cielo payment status codes (`Payment.Status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CieloStatus {
    NotFinished,
    Authorized,
    PaymentConfirmed,
    Denied,
    Voided,
    Refunded,
    Pending,
    Aborted,
    Scheduled,
    Unknown(i32),
}

impl CieloStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => CieloStatus::NotFinished,
            1 => CieloStatus::Authorized,
            2 => CieloStatus::PaymentConfirmed,
            3 => CieloStatus::Denied,
            10 => CieloStatus::Voided,
            11 => CieloStatus::Refunded,
            12 => CieloStatus::Pending,
            13 => CieloStatus::Aborted,
            20 => CieloStatus::Scheduled,
            other => CieloStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            CieloStatus::NotFinished => 0,
            CieloStatus::Authorized => 1,
            CieloStatus::PaymentConfirmed => 2,
            CieloStatus::Denied => 3,
            CieloStatus::Voided => 10,
            CieloStatus::Refunded => 11,
            CieloStatus::Pending => 12,
            CieloStatus::Aborted => 13,
            CieloStatus::Scheduled => 20,
            CieloStatus::Unknown(code) => *code,
        }
    }

    /// Money captured. Sales are always sent with `Capture = true`.
    pub fn is_approved(&self) -> bool {
        matches!(self, CieloStatus::PaymentConfirmed)
    }

    /// The charge will never be paid.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            CieloStatus::Denied | CieloStatus::Voided | CieloStatus::Refunded | CieloStatus::Aborted
        )
    }
}

#[derive(Debug, Clone)]
pub struct GatewayAddress {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayCustomer {
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub address: Option<GatewayAddress>,
}

#[derive(Debug, Clone)]
pub struct CardData {
    pub number: String,
    pub holder: String,
    /// `MM/YYYY`
    pub expiration_date: String,
    pub security_code: String,
    pub brand: String,
}

#[derive(Debug, Clone)]
pub struct CardSaleRequest {
    pub order_id: String,
    pub customer: GatewayCustomer,
    pub amount_cents: i64,
    pub installments: i32,
    pub card: CardData,
    /// Ask the gateway for a reusable card token (needed for renewals).
    pub save_card: bool,
}

#[derive(Debug, Clone)]
pub struct PixSaleRequest {
    pub order_id: String,
    pub customer: GatewayCustomer,
    pub amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct TokenChargeRequest {
    pub order_id: String,
    pub customer_name: String,
    pub amount_cents: i64,
    pub card_token: String,
    pub brand: String,
}

/// Gateway response normalized for the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub payment_id: String,
    pub status: CieloStatus,
    pub amount_cents: Option<i64>,
    pub return_code: Option<String>,
    pub return_message: Option<String>,
    pub authorization_code: Option<String>,
    pub tid: Option<String>,
    pub proof_of_sale: Option<String>,
    pub card_token: Option<String>,
    pub card_brand: Option<String>,
    pub qr_code_base64_image: Option<String>,
    pub qr_code_string: Option<String>,
}

/// Card and PIX processor used by checkout, webhook confirmation and renewals.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_card_sale(&self, request: &CardSaleRequest) -> AppResult<GatewayPayment>;

    async fn create_pix_sale(&self, request: &PixSaleRequest) -> AppResult<GatewayPayment>;

    /// Recurring charge against a card saved on a previous sale.
    async fn charge_card_token(&self, request: &TokenChargeRequest) -> AppResult<GatewayPayment>;

    async fn query_payment(&self, payment_id: &str) -> AppResult<GatewayPayment>;
}

// Wire format (Cielo API 3.0)

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SaleBody<'a> {
    merchant_order_id: &'a str,
    customer: CustomerBody<'a>,
    payment: PaymentBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CustomerBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<AddressBody<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AddressBody<'a> {
    street: Option<&'a str>,
    number: Option<&'a str>,
    complement: Option<&'a str>,
    zip_code: Option<&'a str>,
    city: Option<&'a str>,
    state: Option<&'a str>,
    country: &'a str,
    district: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentBody<'a> {
    #[serde(rename = "Type")]
    payment_type: &'a str,
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soft_descriptor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credit_card: Option<CreditCardBody<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreditCardBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    card_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    holder: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_card: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_token: Option<&'a str>,
    brand: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SaleResponse {
    payment: PaymentResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentResponse {
    payment_id: String,
    #[serde(default)]
    status: i32,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number")]
    return_code: Option<String>,
    #[serde(default)]
    return_message: Option<String>,
    #[serde(default)]
    authorization_code: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    proof_of_sale: Option<String>,
    #[serde(default)]
    credit_card: Option<CreditCardResponse>,
    #[serde(default)]
    qr_code_base64_image: Option<String>,
    #[serde(default)]
    qr_code_string: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreditCardResponse {
    #[serde(default)]
    card_token: Option<String>,
    #[serde(default)]
    brand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CieloApiError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl From<PaymentResponse> for GatewayPayment {
    fn from(p: PaymentResponse) -> Self {
        let (card_token, card_brand) = p
            .credit_card
            .map(|c| (c.card_token, c.brand))
            .unwrap_or((None, None));
        Self {
            payment_id: p.payment_id,
            status: CieloStatus::from_code(p.status),
            amount_cents: p.amount,
            return_code: p.return_code,
            return_message: p.return_message,
            authorization_code: p.authorization_code,
            tid: p.tid,
            proof_of_sale: p.proof_of_sale,
            card_token,
            card_brand,
            qr_code_base64_image: p.qr_code_base64_image,
            qr_code_string: p.qr_code_string,
        }
    }
}

/// Cielo error bodies are `[{"Code": 126, "Message": "..."}]`.
fn parse_api_error(body: &str) -> (String, String) {
    let first = serde_json::from_str::<Vec<CieloApiError>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next());
    match first {
        Some(err) => (
            err.code
                .map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            err.message.unwrap_or_else(|| body.to_string()),
        ),
        None => ("UNKNOWN".to_string(), body.to_string()),
    }
}

fn customer_body(customer: &GatewayCustomer) -> CustomerBody<'_> {
    CustomerBody {
        name: &customer.name,
        identity: Some(&customer.cpf),
        identity_type: Some("CPF"),
        email: Some(&customer.email),
        address: customer.address.as_ref().map(|a| AddressBody {
            street: a.street.as_deref(),
            number: a.number.as_deref(),
            complement: a.complement.as_deref(),
            zip_code: a.zip_code.as_deref(),
            city: a.city.as_deref(),
            state: a.state.as_deref(),
            country: "BRA",
            district: a.district.as_deref(),
        }),
    }
}

#[derive(Clone)]
pub struct CieloService {
    client: Client,
    config: CieloConfig,
}

impl CieloService {
    pub fn new(config: CieloConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    async fn post_sale(&self, body: &SaleBody<'_>) -> AppResult<GatewayPayment> {
        let url = format!("{}/1/sales/", self.config.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("MerchantId", &self.config.merchant_id)
            .header("MerchantKey", &self.config.merchant_key)
            .header("RequestId", uuid::Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let sale: SaleResponse = serde_json::from_str(&text)?;
            let payment = GatewayPayment::from(sale.payment);
            log::info!(
                "Cielo sale {} ({}) -> payment {} status {:?} return_code {:?}",
                body.merchant_order_id,
                body.payment.payment_type,
                payment.payment_id,
                payment.status,
                payment.return_code
            );
            Ok(payment)
        } else {
            let (return_code, return_message) = parse_api_error(&text);
            log::error!(
                "Cielo rejected sale {} with HTTP {status}: {return_code} {return_message}",
                body.merchant_order_id
            );
            Err(AppError::GatewayError {
                return_code,
                return_message,
            })
        }
    }
}

#[async_trait]
impl PaymentGateway for CieloService {
    async fn create_card_sale(&self, request: &CardSaleRequest) -> AppResult<GatewayPayment> {
        let body = SaleBody {
            merchant_order_id: &request.order_id,
            customer: customer_body(&request.customer),
            payment: PaymentBody {
                payment_type: "CreditCard",
                amount: request.amount_cents,
                installments: Some(request.installments),
                soft_descriptor: Some(&self.config.soft_descriptor),
                capture: Some(true),
                credit_card: Some(CreditCardBody {
                    card_number: Some(&request.card.number),
                    holder: Some(&request.card.holder),
                    expiration_date: Some(&request.card.expiration_date),
                    security_code: Some(&request.card.security_code),
                    save_card: Some(request.save_card),
                    card_token: None,
                    brand: &request.card.brand,
                }),
            },
        };
        self.post_sale(&body).await
    }

    async fn create_pix_sale(&self, request: &PixSaleRequest) -> AppResult<GatewayPayment> {
        let body = SaleBody {
            merchant_order_id: &request.order_id,
            customer: customer_body(&request.customer),
            payment: PaymentBody {
                payment_type: "Pix",
                amount: request.amount_cents,
                installments: None,
                soft_descriptor: None,
                capture: None,
                credit_card: None,
            },
        };
        self.post_sale(&body).await
    }

    async fn charge_card_token(&self, request: &TokenChargeRequest) -> AppResult<GatewayPayment> {
        let body = SaleBody {
            merchant_order_id: &request.order_id,
            customer: CustomerBody {
                name: &request.customer_name,
                identity: None,
                identity_type: None,
                email: None,
                address: None,
            },
            payment: PaymentBody {
                payment_type: "CreditCard",
                amount: request.amount_cents,
                installments: Some(1),
                soft_descriptor: Some(&self.config.soft_descriptor),
                capture: Some(true),
                credit_card: Some(CreditCardBody {
                    card_number: None,
                    holder: None,
                    expiration_date: None,
                    security_code: None,
                    save_card: None,
                    card_token: Some(&request.card_token),
                    brand: &request.brand,
                }),
            },
        };
        self.post_sale(&body).await
    }

    async fn query_payment(&self, payment_id: &str) -> AppResult<GatewayPayment> {
        let url = format!(
            "{}/1/sales/{}",
            self.config.query_url.trim_end_matches('/'),
            payment_id
        );

        let response = self
            .client
            .get(&url)
            .header("MerchantId", &self.config.merchant_id)
            .header("MerchantKey", &self.config.merchant_key)
            .header("RequestId", uuid::Uuid::new_v4().to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let sale: SaleResponse = serde_json::from_str(&text)?;
            Ok(GatewayPayment::from(sale.payment))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(AppError::NotFound(format!("Cielo payment {payment_id}")))
        } else {
            let (return_code, return_message) = parse_api_error(&text);
            Err(AppError::GatewayError {
                return_code,
                return_message,
            })
        }
    }
}
