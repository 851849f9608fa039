use crate::entities::PaymentMethod;
use crate::error::{AppError, AppResult};
use crate::utils::documents::{detect_card_brand, normalize_cpf, only_digits, validate_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Checkout body as posted by the storefront. Every field is optional here so
/// that missing data is reported as a validation error with details rather
/// than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub payment_data: Option<PaymentData>,
    pub plan_data: Option<PlanData>,
    pub payment_method: Option<String>,
    pub address_data: Option<AddressData>,
    pub coupon: Option<String>,
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub customer: Option<CustomerData>,
    pub payment: Option<CardPaymentData>,
    #[serde(default)]
    pub pets: Vec<PetPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentData {
    pub card_number: Option<String>,
    pub holder: Option<String>,
    /// `MM/YYYY`
    pub expiration_date: Option<String>,
    pub security_code: Option<String>,
    pub installments: Option<i32>,
    pub brand: Option<String>,
}

/// Pet attributes as captured at checkout and stored on the pending payment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PetPayload {
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub castrated: Option<bool>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanData {
    pub plan_id: Option<i32>,
    pub billing_period: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressData {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cep: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub name: String,
    pub email: String,
    /// Digits only.
    pub cpf: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    pub expiration_date: String,
    pub security_code: String,
    pub installments: i32,
    pub brand: String,
}

#[derive(Debug, Clone)]
pub enum CheckoutMethod {
    CreditCard(CardDetails),
    Pix,
}

impl CheckoutMethod {
    pub fn payment_method(&self) -> PaymentMethod {
        match self {
            CheckoutMethod::CreditCard(_) => PaymentMethod::CreditCard,
            CheckoutMethod::Pix => PaymentMethod::Pix,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub customer: Customer,
    pub pets: Vec<PetPayload>,
    pub plan_id: i32,
    pub address: AddressData,
    pub method: CheckoutMethod,
    pub coupon: Option<String>,
    pub seller_id: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CheckoutRequest {
    pub fn validate(self) -> AppResult<ValidatedCheckout> {
        let mut missing = Vec::new();
        if self.payment_data.is_none() {
            missing.push("paymentData");
        }
        if self.plan_data.is_none() {
            missing.push("planData");
        }
        if non_empty(&self.payment_method).is_none() {
            missing.push("paymentMethod");
        }
        if !missing.is_empty() {
            return Err(AppError::validation_with_details(
                "Dados obrigatórios ausentes",
                json!({ "missing": missing }),
            ));
        }

        let payment_data = self.payment_data.unwrap_or_default();
        let plan_data = self.plan_data.unwrap_or_default();
        let method_name = non_empty(&self.payment_method).unwrap_or_default();

        let plan_id = plan_data.plan_id.ok_or_else(|| {
            AppError::validation_with_details(
                "Plano não informado",
                json!({ "missing": ["planData.planId"] }),
            )
        })?;

        let customer_data = payment_data.customer.unwrap_or_default();
        let mut missing = Vec::new();
        let name = non_empty(&customer_data.name);
        let email = non_empty(&customer_data.email);
        let cpf = non_empty(&customer_data.cpf);
        if name.is_none() {
            missing.push("paymentData.customer.name");
        }
        if email.is_none() {
            missing.push("paymentData.customer.email");
        }
        if cpf.is_none() {
            missing.push("paymentData.customer.cpf");
        }
        if !missing.is_empty() {
            return Err(AppError::validation_with_details(
                "Dados do cliente incompletos",
                json!({ "missing": missing }),
            ));
        }
        let email = email.unwrap_or_default().to_lowercase();
        validate_email(&email)?;
        let cpf = normalize_cpf(&cpf.unwrap_or_default())?;

        if payment_data.pets.is_empty() {
            return Err(AppError::validation_with_details(
                "Informe ao menos um pet",
                json!({ "missing": ["paymentData.pets"] }),
            ));
        }
        if let Some(idx) = payment_data
            .pets
            .iter()
            .position(|p| p.name.trim().is_empty() || p.species.trim().is_empty())
        {
            return Err(AppError::validation_with_details(
                "Nome e espécie do pet são obrigatórios",
                json!({ "pet": idx }),
            ));
        }

        let method = match method_name.as_str() {
            "credit_card" => {
                CheckoutMethod::CreditCard(card_details(payment_data.payment.unwrap_or_default())?)
            }
            "pix" => CheckoutMethod::Pix,
            other => return Err(AppError::InvalidPaymentMethod(other.to_string())),
        };

        let address = self.address_data.unwrap_or_default();
        let phone = non_empty(&customer_data.phone).or_else(|| non_empty(&address.phone));

        Ok(ValidatedCheckout {
            customer: Customer {
                name: name.unwrap_or_default(),
                email,
                cpf,
                phone,
            },
            pets: payment_data.pets,
            plan_id,
            address,
            method,
            coupon: non_empty(&self.coupon).map(|c| c.to_uppercase()),
            seller_id: non_empty(&self.seller_id),
        })
    }
}

fn card_details(card: CardPaymentData) -> AppResult<CardDetails> {
    let number = non_empty(&card.card_number).map(|n| only_digits(&n));
    let holder = non_empty(&card.holder);
    let expiration_date = non_empty(&card.expiration_date);
    let security_code = non_empty(&card.security_code);

    let mut missing = Vec::new();
    if number.as_deref().is_none_or(str::is_empty) {
        missing.push("paymentData.payment.cardNumber");
    }
    if holder.is_none() {
        missing.push("paymentData.payment.holder");
    }
    if expiration_date.is_none() {
        missing.push("paymentData.payment.expirationDate");
    }
    if security_code.is_none() {
        missing.push("paymentData.payment.securityCode");
    }
    if !missing.is_empty() {
        return Err(AppError::validation_with_details(
            "Dados do cartão incompletos",
            json!({ "missing": missing }),
        ));
    }

    let installments = card.installments.unwrap_or(1);
    if !(1..=12).contains(&installments) {
        return Err(AppError::validation_with_details(
            "Número de parcelas inválido",
            json!({ "installments": installments }),
        ));
    }

    let number = number.unwrap_or_default();
    let brand = non_empty(&card.brand).unwrap_or_else(|| detect_card_brand(&number).to_string());

    Ok(CardDetails {
        number,
        holder: holder.unwrap_or_default(),
        expiration_date: expiration_date.unwrap_or_default(),
        security_code: security_code.unwrap_or_default(),
        installments,
        brand,
    })
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment_id: String,
    pub status: String,
    pub method: PaymentMethod,
    /// Charged amount in reais.
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub id: i32,
    pub contract_number: String,
    pub status: String,
    pub billing_period: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    pub payment: PaymentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub payment_id: String,
    pub method: PaymentMethod,
    pub status: String,
    pub processed: bool,
    pub expired: bool,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request(method: &str) -> CheckoutRequest {
        serde_json::from_value(json!({
            "paymentData": {
                "customer": { "name": "Ana Souza", "email": "Ana@Example.com", "cpf": "529.982.247-25" },
                "payment": {
                    "cardNumber": "4111 1111 1111 1111",
                    "holder": "ANA SOUZA",
                    "expirationDate": "12/2030",
                    "securityCode": "123",
                    "installments": 1
                },
                "pets": [{ "name": "Thor", "species": "dog" }]
            },
            "planData": { "planId": 1 },
            "paymentMethod": method,
            "addressData": { "cep": "01310-100", "city": "São Paulo" },
            "coupon": " promo10 "
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_card_checkout() {
        let checkout = base_request("credit_card").validate().unwrap();
        assert_eq!(checkout.customer.email, "ana@example.com");
        assert_eq!(checkout.customer.cpf, "52998224725");
        assert_eq!(checkout.coupon.as_deref(), Some("PROMO10"));
        match checkout.method {
            CheckoutMethod::CreditCard(card) => {
                assert_eq!(card.number, "4111111111111111");
                assert_eq!(card.brand, "Visa");
            }
            CheckoutMethod::Pix => panic!("expected card"),
        }
    }

    #[test]
    fn test_pix_ignores_card_fields() {
        let mut request = base_request("pix");
        if let Some(data) = request.payment_data.as_mut() {
            data.payment = None;
        }
        let checkout = request.validate().unwrap();
        assert!(matches!(checkout.method, CheckoutMethod::Pix));
    }

    #[test]
    fn test_missing_top_level_fields_are_listed() {
        let err = CheckoutRequest::default().validate().unwrap_err();
        match err {
            AppError::ValidationError { details, .. } => {
                let details = details.unwrap();
                assert_eq!(
                    details["missing"],
                    json!(["paymentData", "planData", "paymentMethod"])
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = base_request("boleto").validate().unwrap_err();
        assert!(matches!(err, AppError::InvalidPaymentMethod(m) if m == "boleto"));
    }

    #[test]
    fn test_card_without_number_is_rejected() {
        let mut request = base_request("credit_card");
        if let Some(payment) = request
            .payment_data
            .as_mut()
            .and_then(|d| d.payment.as_mut())
        {
            payment.card_number = None;
        }
        assert!(matches!(
            request.validate(),
            Err(AppError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_installments_out_of_range() {
        let mut request = base_request("credit_card");
        if let Some(payment) = request
            .payment_data
            .as_mut()
            .and_then(|d| d.payment.as_mut())
        {
            payment.installments = Some(13);
        }
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_empty_pets_rejected() {
        let mut request = base_request("pix");
        if let Some(data) = request.payment_data.as_mut() {
            data.pets.clear();
        }
        assert!(request.validate().is_err());
    }
}
