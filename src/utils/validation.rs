use crate::utils::error::{LedgerError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(LedgerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Trims a form field and fails with `MissingField` when nothing is left.
pub fn require_field(field_name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::MissingField {
            field: field_name.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_quantity(field_name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let reason = if !value.is_finite() {
        Some("must be a finite number")
    } else if value < 0.0 {
        Some("cannot be negative")
    } else if !allow_zero && value == 0.0 {
        Some("must be greater than zero")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(LedgerError::InvalidInput {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("site_url", "https://example.com").is_ok());
        assert!(validate_url("site_url", "http://example.com").is_ok());
        assert!(validate_url("site_url", "").is_err());
        assert!(validate_url("site_url", "invalid-url").is_err());
        assert!(validate_url("site_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("timeout_seconds", 5, 1).is_ok());
        assert!(validate_positive_number("timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_require_field_trims() {
        assert_eq!(require_field("description", "  bolt  ").unwrap(), "bolt");
        assert!(matches!(
            require_field("description", "   "),
            Err(LedgerError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 0.0, true).is_ok());
        assert!(validate_quantity("quantity", 0.0, false).is_err());
        assert!(validate_quantity("quantity", -1.0, true).is_err());
        assert!(validate_quantity("quantity", f64::NAN, true).is_err());
        assert!(validate_quantity("quantity", 2.5, false).is_ok());
    }
}
