use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Notification posted by Cielo when a payment changes state.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CieloNotification {
    pub payment_id: String,
    /// 1 status change, 2 recurrence created, 3 antifraud, 4 recurrence status,
    /// 5 refund denied, 6 boleto underpaid, 7 chargeback.
    pub change_type: i32,
    #[serde(default)]
    pub recurrent_payment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            received: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            received: true,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let n: CieloNotification = serde_json::from_str(
            r#"{"PaymentId":"b2a0e5bb-1c8b-4d6d-9d67-3c3f6c1b2b7e","ChangeType":1}"#,
        )
        .unwrap();
        assert_eq!(n.change_type, 1);
        assert!(n.recurrent_payment_id.is_none());
    }
}
