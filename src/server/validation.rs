use crate::server::response::ApiError;
use crate::types::Money;

const MAX_USERNAME_LEN: usize = 50;
const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_SKU_LEN: usize = 32;
const MAX_TEXT_LEN: usize = 200;

/// Upper bound for any single money field: 100 million.
pub const MAX_AMOUNT: Money = Money::from_cents(10_000_000_000);

/// Upper bound for stock and line quantities.
pub const MAX_QUANTITY: i64 = 1_000_000;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    min_len: usize,
    max_len: usize,
    allow_period: bool,
) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request(format!("{entity} cannot be empty")));
    }
    if name.len() < min_len {
        return Err(ApiError::bad_request(format!(
            "{entity} must be at least {min_len} characters"
        )));
    }
    if name.len() > max_len {
        return Err(ApiError::bad_request(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(ApiError::bad_request(format!("{entity} can only contain {allowed}")));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    validate_name(username, "Username", MIN_USERNAME_LEN, MAX_USERNAME_LEN, true)
}

pub fn validate_sku(sku: &str) -> Result<(), ApiError> {
    validate_name(sku, "SKU", 1, MAX_SKU_LEN, false)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

/// Rejects blank free-text fields such as names and doctor names.
pub fn validate_required(value: &str, field: &str) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::bad_request(format!(
            "{field} cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_non_negative_money(amount: Money, field: &str) -> Result<(), ApiError> {
    if amount.is_negative() {
        return Err(ApiError::bad_request(format!("{field} cannot be negative")));
    }
    if amount > MAX_AMOUNT {
        return Err(ApiError::bad_request(format!("{field} cannot exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

fn validate_quantity_cap(value: i64, field: &str) -> Result<(), ApiError> {
    if value > MAX_QUANTITY {
        return Err(ApiError::bad_request(format!("{field} cannot exceed {MAX_QUANTITY}")));
    }
    Ok(())
}

/// Counts that may be zero, such as stock on hand.
pub fn validate_non_negative(value: i64, field: &str) -> Result<(), ApiError> {
    if value < 0 {
        return Err(ApiError::bad_request(format!("{field} cannot be negative")));
    }
    validate_quantity_cap(value, field)
}

pub fn validate_positive(value: i64, field: &str) -> Result<(), ApiError> {
    if value <= 0 {
        return Err(ApiError::bad_request(format!("{field} must be positive")));
    }
    validate_quantity_cap(value, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("pharmacist1").is_ok());
        assert!(validate_username("dr.nguyen").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("customer@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_password_and_sku() {
        assert!(validate_password("cust123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_sku("MED001").is_ok());
        assert!(validate_sku("MED 001").is_err());
    }

    #[test]
    fn test_required_and_numbers() {
        assert!(validate_required("Dr. Tran", "doctor_name").is_ok());
        let err = validate_required("   ", "doctor_name").unwrap_err();
        assert_eq!(err.message, "doctor_name is required");

        assert!(validate_non_negative_money(Money::from_cents(-1), "price").is_err());
        assert!(validate_non_negative_money(Money::ZERO, "price").is_ok());
        assert!(validate_positive(0, "quantity").is_err());
        assert!(validate_non_negative(0, "quantity").is_ok());
    }

    #[test]
    fn test_upper_bounds() {
        assert!(validate_non_negative_money(MAX_AMOUNT, "price").is_ok());
        let huge = Money::parse("92233720368547758").unwrap();
        let err = validate_non_negative_money(huge, "price").unwrap_err();
        assert_eq!(err.message, "price cannot exceed 100000000.00");

        assert!(validate_positive(MAX_QUANTITY, "quantity").is_ok());
        assert!(validate_positive(MAX_QUANTITY + 1, "quantity").is_err());
        assert!(validate_non_negative(MAX_QUANTITY + 1, "min_stock_level").is_err());
    }
}
