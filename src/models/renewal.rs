use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of one renewal charge attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewalAttempt {
    pub installment_id: i32,
    pub contract_id: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewalBatchResult {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<RenewalAttempt>,
}

impl RenewalBatchResult {
    pub fn push(&mut self, attempt: RenewalAttempt) {
        self.processed += 1;
        if attempt.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(attempt);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBatchResult {
    pub checked: usize,
    pub sent: usize,
    pub failed: usize,
}
