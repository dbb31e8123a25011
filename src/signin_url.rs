/// Dedicated signin URL resolver
///
/// Per-user opaque identifiers of the form `<account_id>-<12 chars>`,
/// matched exactly against the user table. The validate path backs a
/// pre-authentication branding screen, so it reveals only display fields
/// and reports three disjoint failure reasons the front-end renders
/// differently.
use crate::db::models::{Account, User};
use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use sqlx::SqlitePool;

/// Non-sensitive user fields shown before password entry
#[derive(Debug, Serialize)]
pub struct UserDisplay {
    pub username: String,
    pub display_name: Option<String>,
}

/// Non-sensitive account fields shown before password entry
#[derive(Debug, Serialize)]
pub struct AccountDisplay {
    pub name: String,
    pub email: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SigninUrlValidation {
    pub valid: bool,
    pub user: UserDisplay,
    pub account: AccountDisplay,
}

#[derive(Clone)]
pub struct SigninUrlResolver {
    db: SqlitePool,
}

impl SigninUrlResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Exact-match lookup of the identifier's owner
    pub async fn resolve(&self, identifier: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE dedicated_signin_url = ?1")
            .bind(identifier)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Validate an identifier for the pre-signin screen. Failure reasons
    /// are disjoint: unknown identifier, disabled account, disabled user.
    pub async fn validate(&self, identifier: &str) -> ApiResult<SigninUrlValidation> {
        let user = self
            .resolve(identifier)
            .await?
            .ok_or(ApiError::InvalidSigninUrl)?;

        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = ?1")
                .bind(&user.account_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or(ApiError::InvalidSigninUrl)?;

        if !account.is_active {
            return Err(ApiError::AccountDisabled);
        }
        if !user.is_active {
            return Err(ApiError::UserDisabled);
        }

        Ok(SigninUrlValidation {
            valid: true,
            user: UserDisplay {
                username: user.username,
                display_name: user.display_name,
            },
            account: AccountDisplay {
                name: account.name,
                email: account.email,
                description: account.description,
            },
        })
    }
}
