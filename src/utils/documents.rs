use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err(AppError::validation(format!("E-mail inválido: {email}")));
    }
    Ok(())
}

/// Strips punctuation and checks the two CPF verification digits.
pub fn normalize_cpf(cpf: &str) -> AppResult<String> {
    let digits = only_digits(cpf);
    if digits.len() != 11 {
        return Err(AppError::validation("CPF deve conter 11 dígitos"));
    }
    let nums: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if nums.iter().all(|&d| d == nums[0]) {
        return Err(AppError::validation("CPF inválido"));
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = nums[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 { 0 } else { rest }
    };

    if check(9) != nums[9] || check(10) != nums[10] {
        return Err(AppError::validation("CPF inválido"));
    }
    Ok(digits)
}

/// Brazilian phone with country code, e.g. `+5511987654321`.
pub fn format_br_phone(phone: &str) -> String {
    let digits = only_digits(phone);
    match digits.len() {
        10 | 11 => format!("+55{digits}"),
        12 | 13 if digits.starts_with("55") => format!("+{digits}"),
        _ => phone.trim().to_string(),
    }
}

/// Card brand as the gateway names it, from the card number prefix.
pub fn detect_card_brand(card_number: &str) -> &'static str {
    let n = only_digits(card_number);
    let prefix = |len: usize| -> u32 { n.get(..len).and_then(|p| p.parse().ok()).unwrap_or(0) };

    const ELO_PREFIXES: &[&str] = &[
        "401178", "401179", "431274", "438935", "451416", "457393", "457631", "457632",
        "504175", "506699", "5067", "509", "627780", "636297", "636368", "6500", "6504",
        "6505", "6507", "6509", "6516", "6550",
    ];
    if ELO_PREFIXES.iter().any(|p| n.starts_with(p)) {
        return "Elo";
    }
    if n.starts_with("606282") || n.starts_with("3841") {
        return "Hipercard";
    }
    if n.starts_with('4') {
        return "Visa";
    }
    if (51..=55).contains(&prefix(2)) || (2221..=2720).contains(&prefix(4)) {
        return "Master";
    }
    if matches!(prefix(2), 34 | 37) {
        return "Amex";
    }
    if matches!(prefix(2), 36 | 38) || (300..=305).contains(&prefix(3)) {
        return "Diners";
    }
    if n.starts_with("6011") || n.starts_with("65") {
        return "Discover";
    }
    if (3528..=3589).contains(&prefix(4)) {
        return "JCB";
    }
    "Visa"
}

/// Keeps the last four digits, for logs.
pub fn mask_card_number(card_number: &str) -> String {
    let digits = only_digits(card_number);
    let tail = digits.len().saturating_sub(4);
    format!("****{}", &digits[tail..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_cpf() {
        assert_eq!(normalize_cpf("529.982.247-25").unwrap(), "52998224725");
        assert!(normalize_cpf("529.982.247-24").is_err());
        assert!(normalize_cpf("111.111.111-11").is_err());
        assert!(normalize_cpf("1234").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("tutor@example.com").is_ok());
        assert!(validate_email("tutor@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_format_br_phone() {
        assert_eq!(format_br_phone("(11) 98765-4321"), "+5511987654321");
        assert_eq!(format_br_phone("5511987654321"), "+5511987654321");
        assert_eq!(format_br_phone("123"), "123");
    }

    #[test]
    fn test_detect_card_brand() {
        assert_eq!(detect_card_brand("4111 1111 1111 1111"), "Visa");
        assert_eq!(detect_card_brand("5555666677778884"), "Master");
        assert_eq!(detect_card_brand("2223000048400011"), "Master");
        assert_eq!(detect_card_brand("378282246310005"), "Amex");
        assert_eq!(detect_card_brand("6362970000457013"), "Elo");
        assert_eq!(detect_card_brand("6062825624254001"), "Hipercard");
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("4111 1111 1111 1234"), "****1234");
        assert_eq!(mask_card_number("12"), "****12");
    }
}
