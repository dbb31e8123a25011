/// Request input validation
///
/// Shared field checks used by the signup and management flows.
use crate::error::{ApiError, ApiResult};

/// Validate email format
pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email cannot be empty".to_string()));
    }

    if email.len() > 254 {
        return Err(ApiError::Validation("Email too long".to_string()));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(ApiError::Validation("Password too long".to_string()));
    }

    Ok(())
}

/// Validate username format
pub fn validate_username(username: &str) -> ApiResult<()> {
    if username.is_empty() {
        return Err(ApiError::Validation("Username cannot be empty".to_string()));
    }

    if username.len() > 32 {
        return Err(ApiError::Validation("Username too long".to_string()));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ApiError::Validation(
            "Username contains invalid characters".to_string(),
        ));
    }

    Ok(())
}
