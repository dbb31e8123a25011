/// Authentication flows
///
/// Signup with email verification, both signin entry points, token
/// revocation, and the two password-reset flows. The manager composes
/// the credential store, token issuer, revocation registry, and signin
/// URL resolver; HTTP handlers stay thin.
mod manager;

pub use manager::AuthManager;

use serde::{Deserialize, Serialize};

/// New signup; creates or refreshes the pending record for the email
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Optional display name carried into the root user on verification
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Redeems the 6-digit verification code from the signup email
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Alternate signin with a per-user opaque URL instead of an email
#[derive(Debug, Clone, Deserialize)]
pub struct DedicatedSigninRequest {
    pub signin_url: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordConfirmRequest {
    pub token: String,
    pub new_password: String,
}

/// Authenticated password change; requires proof of the current password
#[derive(Debug, Clone, Deserialize)]
pub struct RotatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Identity summary embedded in the suspended signin response
#[derive(Debug, Clone, Serialize)]
pub struct SigninUserSummary {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Successful signin. A non-admin whose account or user record is
/// suspended still receives a usable token, flagged so the front-end
/// can route to the suspension page; protected endpoints then deny
/// with 403 at the authorization gate.
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_suspended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SigninUserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SigninResponse {
    pub fn token(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            account_suspended: None,
            account_name: None,
            user: None,
            message: None,
        }
    }

    pub fn suspended(
        access_token: String,
        account_name: String,
        user: SigninUserSummary,
    ) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            account_suspended: Some(true),
            account_name: Some(account_name),
            user: Some(user),
            message: Some(
                "Account is suspended. You will be redirected to the suspension page."
                    .to_string(),
            ),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.account_suspended == Some(true)
    }
}

/// Plain message replies used by the stateless flows
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Pre-flight reply for the reset-password form
#[derive(Debug, Serialize)]
pub struct ResetTokenValidation {
    pub valid: bool,
    pub email: String,
}
