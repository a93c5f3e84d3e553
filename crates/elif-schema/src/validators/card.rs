//! Credit card number check

use serde_json::Value;

/// Luhn checksum over the digits of a card number.
///
/// Only digits, `-` and whitespace are allowed; separators are ignored.
pub fn is_credit_card(value: &Value) -> bool {
    let Some(text) = super::text_of(value) else {
        return false;
    };

    if text.chars().any(|c| !(c.is_ascii_digit() || c == '-' || c.is_whitespace())) {
        return false;
    }

    let mut sum = 0u32;
    let mut double = false;
    for digit in text.chars().rev().filter_map(|c| c.to_digit(10)) {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_luhn_valid() {
        assert!(is_credit_card(&json!("49927398716")));
        assert!(is_credit_card(&json!("4111 1111 1111 1111")));
        assert!(is_credit_card(&json!("4111-1111-1111-1111")));
    }

    #[test]
    fn test_luhn_invalid() {
        assert!(!is_credit_card(&json!("49927398717")));
        assert!(!is_credit_card(&json!("1234567812345678")));
    }

    #[test]
    fn test_rejects_foreign_characters() {
        assert!(!is_credit_card(&json!("4992739871a")));
        assert!(!is_credit_card(&json!(["4992739871"])));
    }

    #[test]
    fn test_numeric_input_uses_digits() {
        assert!(is_credit_card(&json!(49927398716u64)));
    }
}
