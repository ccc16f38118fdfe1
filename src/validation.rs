//! Input normalization and validation shared by handlers and services.

use crate::error::AppError;

/// Normalize an Indonesian phone number to the `62…` international form.
///
/// # Rules
///
/// - Every non-digit is dropped (`+`, spaces, dashes)
/// - A leading `0` becomes `62` (`0812…` → `62812…`)
/// - A leading `62` is kept
/// - A bare leading `8` gets `62` prepended (`812…` → `62812…`)
///
/// Anything else is returned as digits only; length checks happen in
/// [`validate_phone`].
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        format!("62{rest}")
    } else if digits.starts_with("62") {
        digits
    } else if digits.starts_with('8') {
        format!("62{digits}")
    } else {
        digits
    }
}

/// Normalize and validate a phone number.
///
/// Valid numbers have 9 to 15 digits after normalization.
pub fn validate_phone(raw: &str) -> Result<String, AppError> {
    let phone = normalize_phone(raw);
    if !(9..=15).contains(&phone.len()) {
        return Err(AppError::invalid("Phone number must have 9 to 15 digits"));
    }
    Ok(phone)
}

/// Trim a required text field and reject it when empty or too long.
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::invalid(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional email address: trimmed, empty treated as absent.
pub fn optional_email(value: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(email) = value.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let valid = email.len() <= 255
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::invalid("Invalid email address"));
    }
    Ok(Some(email.to_string()))
}

/// Validate an outbound or displayed URL.
///
/// # Rules
///
/// - Must parse as a URL
/// - Must be HTTP or HTTPS
/// - Maximum 2048 characters
pub fn validate_http_url(field: &str, url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::invalid(format!(
            "{field} exceeds 2048 characters"
        )));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::invalid(format!("{field} is not a valid URL")))?;

    match parsed.scheme() {
        "https" | "http" => Ok(()),
        _ => Err(AppError::invalid(format!("{field} must use HTTP or HTTPS"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones_collapse_to_international_form() {
        assert_eq!(normalize_phone("081234567890"), "6281234567890");
        assert_eq!(normalize_phone("+62 812-3456-7890"), "6281234567890");
        assert_eq!(normalize_phone("6281234567890"), "6281234567890");
        assert_eq!(normalize_phone("81234567890"), "6281234567890");
    }

    #[test]
    fn foreign_numbers_keep_their_digits() {
        assert_eq!(normalize_phone("+1 (415) 555-0100"), "14155550100");
    }

    #[test]
    fn phone_length_is_checked_after_normalization() {
        assert!(validate_phone("0812").is_err());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("0812345678901234567").is_err());
        assert_eq!(validate_phone("0812-345-678").unwrap(), "62812345678");
    }

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("name", "  Budi ", 10).unwrap(), "Budi");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn emails_are_optional_but_checked() {
        assert_eq!(optional_email(None).unwrap(), None);
        assert_eq!(optional_email(Some("  ")).unwrap(), None);
        assert_eq!(
            optional_email(Some(" budi@example.com ")).unwrap().as_deref(),
            Some("budi@example.com")
        );
        assert!(optional_email(Some("budi")).is_err());
        assert!(optional_email(Some("@example.com")).is_err());
    }

    #[test]
    fn urls_must_be_http() {
        assert!(validate_http_url("image_url", "https://cdn.example.com/a.png").is_ok());
        assert!(validate_http_url("image_url", "http://localhost:8080/a.png").is_ok());
        assert!(validate_http_url("image_url", "ftp://example.com/a.png").is_err());
        assert!(validate_http_url("image_url", "not a url").is_err());
        let long = format!("https://example.com/{}", "a".repeat(2048));
        assert!(validate_http_url("image_url", &long).is_err());
    }
}
