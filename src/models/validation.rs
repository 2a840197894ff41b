use rust_decimal::Decimal;

use super::{BookingPayload, MenuItemPayload, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const PRICE_MAX_DIGITS: u32 = 10;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

impl Validate for MenuItemPayload {
    fn validate(&self) -> ValidationResult<()> {
        validate_text_field("title", &self.title, MAX_TITLE_LENGTH)?;
        validate_price(&self.price)?;
        Ok(())
    }
}

impl Validate for BookingPayload {
    fn validate(&self) -> ValidationResult<()> {
        validate_text_field("name", &self.name, MAX_NAME_LENGTH)?;
        Ok(())
    }
}

/// Validate a required character field: present, non-blank and within its length limit
pub fn validate_text_field(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank {
            field: field.to_string(),
        });
    }

    let length = value.chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: length,
        });
    }

    Ok(())
}

/// Validate a menu item title
pub fn validate_title(title: &str) -> ValidationResult<()> {
    validate_text_field("title", title, MAX_TITLE_LENGTH)
}

/// Validate a login name
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_text_field("username", username, MAX_USERNAME_LENGTH)?;

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            expected: "no whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validate a price against the stored column precision.
///
/// Trailing zeros are ignored, so `12.50` and `12.5` are the same value. Sign is
/// not checked: negative prices are stored as given.
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    let (digits, decimals) = price_precision(price);

    if decimals > PRICE_DECIMAL_PLACES {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: format!(
                "Ensure that there are no more than {} decimal places",
                PRICE_DECIMAL_PLACES
            ),
        });
    }

    if digits > PRICE_MAX_DIGITS {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: format!(
                "Ensure that there are no more than {} digits in total",
                PRICE_MAX_DIGITS
            ),
        });
    }

    let max_whole_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;
    if digits - decimals > max_whole_digits {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: format!(
                "Ensure that there are no more than {} digits before the decimal point",
                max_whole_digits
            ),
        });
    }

    Ok(())
}

/// Total significant digits and fractional digits of a decimal
fn price_precision(price: &Decimal) -> (u32, u32) {
    let normalized = price.normalize();
    let decimals = normalized.scale();
    let mantissa_digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;

    if decimals > mantissa_digits {
        (decimals, decimals)
    } else {
        (mantissa_digits, decimals)
    }
}
