use chrono::{DateTime, Utc};
use rand::Rng;

/// Contract number derived from the pending payment it was created from,
/// e.g. `UNP-20251015-000042`. Unique because each pending payment yields at
/// most one contract.
pub fn generate_contract_number(now: DateTime<Utc>, pending_payment_id: i32) -> String {
    format!("UNP-{}-{:06}", now.format("%Y%m%d"), pending_payment_id)
}

/// Merchant order id sent to the gateway for a checkout or renewal charge.
pub fn generate_order_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{prefix}-{}-{:04}",
        Utc::now().timestamp_millis(),
        rng.gen_range(0..=9999)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_contract_number() {
        let now = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();
        assert_eq!(generate_contract_number(now, 42), "UNP-20251015-000042");
        assert_eq!(generate_contract_number(now, 1234567), "UNP-20251015-1234567");
    }

    #[test]
    fn test_contract_numbers_differ_per_pending_payment() {
        let now = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();
        assert_ne!(
            generate_contract_number(now, 7),
            generate_contract_number(now, 8)
        );
    }

    #[test]
    fn test_generate_order_id_uses_prefix() {
        let id = generate_order_id("REN");
        assert!(id.starts_with("REN-"));
    }
}
