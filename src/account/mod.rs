/// Account and user management
///
/// Covers the authenticated user-management surface (profile, user
/// provisioning, dedicated signin URLs) and the admin account controls
/// (suspend, reactivate, cascade delete).

mod email_change;
mod manager;

pub use email_change::EmailChangeManager;
pub use manager::AccountManager;

use crate::db::models::{Account, Role, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provision a user inside the caller's account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    /// Generated as `<username>@<account_id>.devharbor.local` when absent
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

/// Partial user update; absent fields stay untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

/// Partial profile update for the calling user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub username: Option<String>,
}

/// Account fields exposed to its own users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub name: String,
    pub email: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub plan: String,
    pub subscription_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            description: account.description.clone(),
            is_active: account.is_active,
            is_verified: account.is_verified,
            plan: account.plan.clone(),
            subscription_status: account.subscription_status.clone(),
            created_at: account.created_at,
        }
    }
}

/// User fields exposed through management endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_root_user: bool,
    pub is_verified: bool,
    /// Root users sign in through the primary flow, so their URL is
    /// never surfaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_signin_url: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            is_active: user.is_active,
            is_root_user: user.is_root_user,
            is_verified: user.is_verified,
            dedicated_signin_url: if user.is_root_user {
                None
            } else {
                user.dedicated_signin_url.clone()
            },
            last_login: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Profile view: the calling user plus their account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub account_id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_root_user: bool,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub account: AccountSummary,
}

/// Result of provisioning a user; the initial password is surfaced
/// exactly once here so the root user can hand it over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedUser {
    pub user: UserView,
    pub initial_password: String,
    pub dedicated_signin_url: String,
}

/// Outcome of a user deletion, with the count of empty projects that
/// were swept along
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedUser {
    pub deleted_empty_projects: u64,
}

/// Start a two-party account email change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChangeRequest {
    pub current_email: String,
    pub new_email: String,
}

/// Confirm one side of an email change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChangeConfirmation {
    pub token: String,
}

/// What a confirmation call achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailChangeOutcome {
    /// Both sides confirmed; the change was applied (or already had been)
    Completed {
        current_email: String,
        new_email: String,
        already_completed: bool,
    },
    /// One side confirmed; waiting on the other address
    Pending {
        pending_email: String,
        expires_at: DateTime<Utc>,
    },
}

/// Status of the account's pending email change, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChangeStatus {
    pub has_pending_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
