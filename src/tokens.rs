/// Session token issuance and verification
///
/// Stateless HS256 tokens carrying identity claims. Verification here is
/// purely cryptographic (signature + expiry); revocation is a separate
/// check composed by the request-authorization path.
use crate::db::models::User;
use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in every session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric row identity
    pub id: i64,
    pub email: String,
    pub user_id: String,
    pub account_id: String,
    pub is_root_user: bool,
    /// Issued-at, seconds since epoch; compared against revocation epochs
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// Signs and verifies session tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_hours: i64,
}

impl TokenIssuer {
    pub fn new(secret: String, expiry_hours: i64) -> Self {
        Self {
            secret,
            expiry_hours,
        }
    }

    /// Issue a signed token for the user
    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            user_id: user.user_id.clone(),
            account_id: user.account_id.clone(),
            is_root_user: user.is_root_user,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

        crate::metrics::record_token_issued();
        Ok(token)
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token has expired".to_string())
                }
                _ => ApiError::Unauthorized("Invalid token".to_string()),
            })
    }
}

/// Strip the "Bearer " scheme from an Authorization header value
pub fn extract_bearer(header: &str) -> ApiResult<&str> {
    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))
}
