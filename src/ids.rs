/// Identifier and code generation
///
/// Every entity carries an opaque business identifier separate from its
/// numeric row id. Formats are fixed: account IDs are 12 digits, user IDs
/// are 25 lowercase alphanumerics, resource IDs are a short prefix padded
/// with lowercase alphanumerics to 25 characters.
use rand::Rng;

const DIGITS: &[u8] = b"0123456789";
const LOWER_ALNUM: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MIXED_ALNUM: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&";

fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..charset.len());
            charset[idx] as char
        })
        .collect()
}

/// 12-digit tenant identifier
pub fn account_id() -> String {
    random_string(12, DIGITS)
}

/// 25-character user identifier
pub fn user_id() -> String {
    random_string(25, LOWER_ALNUM)
}

/// Prefixed identifier padded with random characters to a fixed total length
pub fn resource_id(prefix: &str, length: usize) -> String {
    let random_part = random_string(length.saturating_sub(prefix.len()), LOWER_ALNUM);
    format!("{}{}", prefix, random_part)
}

pub fn project_id() -> String {
    resource_id("proj", 25)
}

pub fn sandbox_id() -> String {
    resource_id("sbox", 25)
}

pub fn notification_id() -> String {
    resource_id("notif", 25)
}

pub fn api_key_id() -> String {
    resource_id("key", 25)
}

pub fn signup_id() -> String {
    resource_id("signup", 25)
}

pub fn email_change_id() -> String {
    resource_id("emailchg", 25)
}

/// 50-character API key secret
pub fn api_key() -> String {
    random_string(50, MIXED_ALNUM)
}

/// Numeric verification code, six digits by convention
pub fn verification_code(length: usize) -> String {
    random_string(length, DIGITS)
}

/// 32-character single-use password reset token
pub fn reset_token() -> String {
    random_string(32, MIXED_ALNUM)
}

/// Per-user alternate signin identifier: `<account_id>-<12 random chars>`
pub fn dedicated_signin_url(account_id: &str) -> String {
    format!("{}-{}", account_id, random_string(12, LOWER_ALNUM))
}

/// Generated password for provisioned users
pub fn initial_password() -> String {
    random_string(12, PASSWORD_CHARSET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_account_id_format() {
        let id = account_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_user_id_format() {
        let id = user_id();
        assert_eq!(id.len(), 25);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_resource_id_prefixes() {
        assert!(project_id().starts_with("proj"));
        assert!(sandbox_id().starts_with("sbox"));
        assert!(notification_id().starts_with("notif"));
        assert!(api_key_id().starts_with("key"));
        assert!(signup_id().starts_with("signup"));
        assert!(email_change_id().starts_with("emailchg"));
        assert_eq!(project_id().len(), 25);
        assert_eq!(signup_id().len(), 25);
    }

    #[test]
    fn test_verification_code_is_numeric() {
        let code = verification_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_reset_token_length() {
        let token = reset_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_api_key_length() {
        let key = api_key();
        assert_eq!(key.len(), 50);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_dedicated_signin_url_shape() {
        let url = dedicated_signin_url("123456789012");
        let (account, suffix) = url.split_once('-').unwrap();
        assert_eq!(account, "123456789012");
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_user_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.insert(user_id());
        }
        // 25 characters from a 36-character alphabet,
        // collisions are astronomically unlikely in 100 attempts
        assert_eq!(seen.len(), 100);
    }
}
