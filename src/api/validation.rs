//! Input validation for API requests.
//!
//! Plain field checks returning `Result<(), String>`; handlers collect them
//! through `ValidationErrorBuilder` from the `error` module.

use crate::db::roles;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return Err("Invalid email address".to_string()),
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<(), String> {
    match role {
        roles::BUYER | roles::SELLER | roles::ADMIN => Ok(()),
        _ => Err("Invalid role. Must be buyer, seller, or admin".to_string()),
    }
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if title.len() > 200 {
        return Err("Title is too long (max 200 characters)".to_string());
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a finite number".to_string());
    }
    if price < 0.0 {
        return Err("Price must not be negative".to_string());
    }
    Ok(())
}

/// Shipping is optional; when present it follows the price rules.
pub fn validate_shipping_cost(shipping_cost: &Option<f64>) -> Result<(), String> {
    match shipping_cost {
        Some(cost) => validate_price(*cost).map_err(|_| {
            "Shipping cost must be a non-negative finite number".to_string()
        }),
        None => Ok(()),
    }
}

pub fn validate_category_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Category name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Category name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

pub fn validate_message_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message content is required".to_string());
    }
    if content.len() > 10_000 {
        return Err("Message is too long (max 10000 characters)".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_role() {
        assert!(validate_role("buyer").is_ok());
        assert!(validate_role("seller").is_ok());
        assert!(validate_role("admin").is_ok());
        assert!(validate_role("superuser").is_err());
        assert!(validate_role("").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(19.99).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_shipping_cost() {
        assert!(validate_shipping_cost(&None).is_ok());
        assert!(validate_shipping_cost(&Some(4.5)).is_ok());
        assert!(validate_shipping_cost(&Some(-4.5)).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Mountain bike").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_message_content() {
        assert!(validate_message_content("hi there").is_ok());
        assert!(validate_message_content("").is_err());
        assert!(validate_message_content(&"x".repeat(10_001)).is_err());
    }
}
