/// Database models
///
/// Entity structs mirror the schema one to one. Lifecycle changes go
/// through the named transition methods, which hold the invariant checks;
/// managers persist whatever the transition produced.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// System role. The wire and database representation of `Member` is
/// "user", which predates the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    #[serde(rename = "admin")]
    #[sqlx(rename = "admin")]
    Admin,
    #[serde(rename = "user")]
    #[sqlx(rename = "user")]
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::Member),
            _ => Err(ApiError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

/// Tenant record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub account_id: String,
    pub name: String,
    pub email: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub plan: String,
    pub subscription_status: String,
    /// Revocation epoch: tokens issued before this instant are dead
    pub tokens_valid_after: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Suspend the account. Refused when the account still holds an admin
    /// user; the caller supplies that fact from the user table.
    pub fn suspend(&mut self, holds_admin_user: bool) -> ApiResult<()> {
        if holds_admin_user {
            return Err(ApiError::Forbidden(
                "Cannot disable an account containing admin users".to_string(),
            ));
        }
        self.is_active = false;
        self.tokens_valid_after = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Reactivate a suspended account. The revocation epoch stays in
    /// place so tokens minted before the suspension remain dead.
    pub fn reactivate(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    pub fn mark_verified(&mut self) {
        self.is_verified = true;
        self.updated_at = Utc::now();
    }
}

/// User record, owned by exactly one account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub account_id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_root_user: bool,
    pub is_verified: bool,
    pub dedicated_signin_url: Option<String>,
    /// Paired with `reset_token_expires_at`: set together on a reset
    /// request, cleared together on redemption
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub last_password_reset_request: Option<DateTime<Utc>>,
    /// Per-user revocation epoch
    pub tokens_valid_after: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Deactivate the user. Root users cannot be deactivated.
    pub fn deactivate(&mut self) -> ApiResult<()> {
        if self.is_root_user {
            return Err(ApiError::Forbidden(
                "Root users cannot be disabled".to_string(),
            ));
        }
        self.is_active = false;
        self.tokens_valid_after = Some(Utc::now());
        Ok(())
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn mark_verified(&mut self) {
        self.is_verified = true;
    }

    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }
}

/// Pre-account signup state; one row per email, overwritten on retry
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PendingSignup {
    pub id: i64,
    pub signup_id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub verification_code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PendingSignup {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Revoked-token record, keyed by SHA-256 hex of the raw bearer token
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlacklistedToken {
    pub id: i64,
    pub token_hash: String,
    pub user_id: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Two-party account email change; applied only when both sides confirm
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountEmailChange {
    pub id: i64,
    pub change_id: String,
    pub account_id: String,
    pub current_email: String,
    pub new_email: String,
    #[serde(skip_serializing)]
    pub current_email_token: String,
    #[serde(skip_serializing)]
    pub new_email_token: String,
    pub current_confirmed: bool,
    pub new_confirmed: bool,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountEmailChange {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_fully_confirmed(&self) -> bool {
        self.current_confirmed && self.new_confirmed
    }
}

/// User notification
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub notification_id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Project grouping for sandboxes
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub project_id: String,
    pub account_id: String,
    pub owner_user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sandbox lifecycle metadata; provisioning happens elsewhere
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: i64,
    pub sandbox_id: String,
    pub account_id: String,
    pub owner_user_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub template: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// API key metadata
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub key_id: String,
    pub account_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}
