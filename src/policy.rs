/// Suspension policy
///
/// The one rule deciding whether a user/account pair may proceed. Signin,
/// dedicated signin, and request authorization all call this function;
/// none of them re-implements it. The admin role bypasses suspension
/// entirely so operators can never lock themselves out.
use crate::db::models::{Account, Role, User};
use crate::error::ApiError;

/// Whether the pair may proceed
pub fn suspension_allows(user: &User, account: &Account) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Member => account.is_active && user.is_active,
    }
}

/// The structured denial for a pair the policy rejects
pub fn suspension_denial(user: &User, account: &Account) -> ApiError {
    ApiError::Suspended {
        account_disabled: !account.is_active,
        user_disabled: !user.is_active,
    }
}
