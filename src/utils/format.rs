//! pt-BR presentation helpers used by email templates and responses.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Brasília time (no daylight saving since 2019).
fn brt() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix())
}

/// `123456` -> `R$ 1.234,56`
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let reais = (abs / 100).to_string();
    let centavos = abs % 100;

    let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
    for (i, ch) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{sign}R$ {grouped},{centavos:02}")
}

/// `dd/mm/aaaa` in Brasília time.
pub fn format_date_br(date: DateTime<Utc>) -> String {
    date.with_timezone(&brt()).format("%d/%m/%Y").to_string()
}

pub fn cents_to_reais(cents: i64) -> f64 {
    cents as f64 / 100.0
}

pub fn reais_to_cents(reais: f64) -> i64 {
    (reais * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0), "R$ 0,00");
        assert_eq!(format_brl(5), "R$ 0,05");
        assert_eq!(format_brl(8990), "R$ 89,90");
        assert_eq!(format_brl(123456), "R$ 1.234,56");
        assert_eq!(format_brl(123456789), "R$ 1.234.567,89");
        assert_eq!(format_brl(-1500), "-R$ 15,00");
    }

    #[test]
    fn test_format_date_br_uses_brasilia_time() {
        let late_utc = Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(format_date_br(late_utc), "28/02/2025");
        let noon = Utc.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap();
        assert_eq!(format_date_br(noon), "25/12/2025");
    }

    #[test]
    fn test_reais_to_cents_rounds() {
        assert_eq!(reais_to_cents(59.9), 5990);
        assert_eq!(reais_to_cents(0.1 + 0.2), 30);
    }
}
