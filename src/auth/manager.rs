/// Auth flow orchestration
///
/// Every flow resolves credential, verification, and suspension state in
/// a fixed order so failures stay non-enumerable: password proof always
/// comes before any account-state disclosure. Suspension is evaluated
/// through the shared policy function, never inline.
use crate::auth::{
    DedicatedSigninRequest, MessageResponse, ResendVerificationRequest, ResetPasswordConfirmRequest,
    ResetPasswordRequest, ResetTokenValidation, RotatePasswordRequest, SigninRequest,
    SigninResponse, SigninUserSummary, SignupRequest, VerifyEmailRequest,
};
use crate::credentials::{self, CredentialStore};
use crate::db::models::{Account, PendingSignup, User};
use crate::error::{ApiError, ApiResult};
use crate::ids;
use crate::mailer::Mailer;
use crate::notify::Notifier;
use crate::policy;
use crate::revocation::RevocationRegistry;
use crate::signin_url::SigninUrlResolver;
use crate::tokens::{Claims, TokenIssuer};
use crate::validation;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Verification codes live for a day
pub const VERIFICATION_CODE_TTL_HOURS: i64 = 24;

/// Minimum gap between verification-code reissues for one email
pub const RESEND_THROTTLE_SECONDS: i64 = 30;

/// Minimum gap between reset-token requests for one user
pub const RESET_REQUEST_THROTTLE_SECONDS: i64 = 30;

#[derive(Clone)]
pub struct AuthManager {
    db: SqlitePool,
    tokens: TokenIssuer,
    revocation: RevocationRegistry,
    credentials: CredentialStore,
    resolver: SigninUrlResolver,
    notifier: Notifier,
    mailer: Mailer,
    base_url: String,
}

impl AuthManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: SqlitePool,
        tokens: TokenIssuer,
        revocation: RevocationRegistry,
        credentials: CredentialStore,
        resolver: SigninUrlResolver,
        notifier: Notifier,
        mailer: Mailer,
        base_url: String,
    ) -> Self {
        Self {
            db,
            tokens,
            revocation,
            credentials,
            resolver,
            notifier,
            mailer,
            base_url,
        }
    }

    /// Create or refresh the pending signup for an email. No Account or
    /// User exists until the code is redeemed.
    pub async fn signup(&self, req: SignupRequest) -> ApiResult<MessageResponse> {
        let email = req.email.trim().to_lowercase();
        validation::validate_email(&email)?;
        validation::validate_password(&req.password)?;

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }

        let username = match email.split_once('@') {
            Some((local, _)) => local.to_string(),
            None => email.clone(),
        };
        let display_name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);
        let password_hash = credentials::hash_password(&req.password)?;
        let code = ids::verification_code(6);
        let now = Utc::now();

        // Re-signup replaces everything but the original signup_id.
        // created_at tracks the latest code issuance for the resend
        // throttle.
        sqlx::query(
            r#"
            INSERT INTO pending_signups
                (signup_id, email, username, display_name, password_hash, verification_code, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(email) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                password_hash = excluded.password_hash,
                verification_code = excluded.verification_code,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(ids::signup_id())
        .bind(&email)
        .bind(&username)
        .bind(&display_name)
        .bind(&password_hash)
        .bind(&code)
        .bind(now + Duration::hours(VERIFICATION_CODE_TTL_HOURS))
        .bind(now)
        .execute(&self.db)
        .await?;

        if let Err(e) = self
            .mailer
            .send_verification_code(&email, &username, &code)
            .await
        {
            tracing::warn!(email = %email, "Failed to send verification email: {}", e);
        }

        tracing::info!(email = %email, "Signup pending verification");
        Ok(MessageResponse::new(
            "Signup successful. Please check your email for the verification code.",
        ))
    }

    /// Redeem a verification code: create the Account, its root User, and
    /// the welcome notification in one transaction. A code already
    /// redeemed reports success instead of failing, so a double-submitted
    /// form cannot error; the spent pending row is inert (signup refuses
    /// the registered email) and is removed by the expiry sweep.
    pub async fn verify_email(&self, req: VerifyEmailRequest) -> ApiResult<MessageResponse> {
        let code = req.token.trim();
        let pending = sqlx::query_as::<_, PendingSignup>(
            "SELECT * FROM pending_signups WHERE verification_code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            ApiError::Validation("Invalid or expired verification code".to_string())
        })?;

        // Expired codes are indistinguishable from unknown ones
        if pending.is_expired(Utc::now()) {
            return Err(ApiError::Validation(
                "Invalid or expired verification code".to_string(),
            ));
        }

        if self.find_user_by_email(&pending.email).await?.is_some() {
            return Ok(MessageResponse::new("Email already verified"));
        }

        let account_id = ids::account_id();
        let user_id = ids::user_id();
        let signin_url = ids::dedicated_signin_url(&account_id);
        let welcome_name = pending
            .display_name
            .clone()
            .unwrap_or_else(|| pending.username.clone());
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, name, email, is_active, is_verified, plan, subscription_status, created_at, updated_at)
            VALUES (?1, 'My Account', ?2, TRUE, TRUE, 'free', 'active', ?3, ?3)
            "#,
        )
        .bind(&account_id)
        .bind(&pending.email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, account_id, email, username, password_hash, display_name, role,
                 is_active, is_root_user, is_verified, dedicated_signin_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'user', TRUE, TRUE, TRUE, ?7, ?8)
            "#,
        )
        .bind(&user_id)
        .bind(&account_id)
        .bind(&pending.email)
        .bind(&pending.username)
        .bind(&pending.password_hash)
        .bind(&pending.display_name)
        .bind(&signin_url)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, user_id, title, message, read, created_at)
            VALUES (?1, ?2, ?3, ?4, FALSE, ?5)
            "#,
        )
        .bind(ids::notification_id())
        .bind(&user_id)
        .bind("Welcome to DevHarbor! 🎉")
        .bind(format!(
            "Hello {}! Welcome to DevHarbor. Your account has been successfully created and verified.",
            welcome_name
        ))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            account_id = %account_id,
            user_id = %user_id,
            email = %pending.email,
            "Account created from verified signup"
        );
        Ok(MessageResponse::new(
            "Email verified successfully. You can now sign in.",
        ))
    }

    /// Reissue the verification code for a pending signup
    pub async fn resend_verification(
        &self,
        req: ResendVerificationRequest,
    ) -> ApiResult<MessageResponse> {
        let email = req.email.trim().to_lowercase();
        let pending = sqlx::query_as::<_, PendingSignup>(
            "SELECT * FROM pending_signups WHERE email = ?1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No pending signup found for this email".to_string())
        })?;

        let elapsed = Utc::now().signed_duration_since(pending.created_at);
        let throttle = Duration::seconds(RESEND_THROTTLE_SECONDS);
        if elapsed < throttle {
            return Err(ApiError::RateLimitExceeded {
                retry_after: (throttle - elapsed).to_std().unwrap_or_default(),
            });
        }

        let code = ids::verification_code(6);
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE pending_signups
            SET verification_code = ?1, expires_at = ?2, created_at = ?3
            WHERE email = ?4
            "#,
        )
        .bind(&code)
        .bind(now + Duration::hours(VERIFICATION_CODE_TTL_HOURS))
        .bind(now)
        .bind(&email)
        .execute(&self.db)
        .await?;

        if let Err(e) = self
            .mailer
            .send_verification_code(&email, &pending.username, &code)
            .await
        {
            tracing::warn!(email = %email, "Failed to send verification email: {}", e);
        }

        Ok(MessageResponse::new("Verification code resent successfully"))
    }

    /// Email/password signin. Failure order is fixed: credentials first
    /// with one generic message, then the verified flag, then account
    /// state via the shared suspension policy.
    pub async fn signin(&self, req: SigninRequest) -> ApiResult<SigninResponse> {
        let email = req.email.trim().to_lowercase();
        let user = self
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

        if !credentials::verify_password(&req.password, &user.password_hash)? {
            return Err(ApiError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_verified {
            return Err(ApiError::Forbidden("Email not verified".to_string()));
        }

        let account = self.load_account(&user.account_id).await?;
        self.finish_signin(&user, &account).await
    }

    /// Signin with a dedicated URL. The password is checked before any
    /// account or user state so the URL alone reveals nothing about
    /// either; a wrong password reads the same against a disabled user
    /// as an enabled one.
    pub async fn dedicated_signin(
        &self,
        req: DedicatedSigninRequest,
    ) -> ApiResult<SigninResponse> {
        let user = self
            .resolver
            .resolve(req.signin_url.trim())
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid signin URL".to_string()))?;

        if !credentials::verify_password(&req.password, &user.password_hash)? {
            return Err(ApiError::Unauthorized("Invalid password".to_string()));
        }

        let account = self.load_account(&user.account_id).await?;
        self.finish_signin(&user, &account).await
    }

    /// Blacklist the presented token for its remaining lifetime
    pub async fn signout(&self, raw_token: &str, claims: &Claims) -> ApiResult<MessageResponse> {
        self.revocation
            .revoke(
                raw_token,
                &claims.user_id,
                &claims.account_id,
                remaining_ttl(claims),
            )
            .await?;
        Ok(MessageResponse::new("Signed out successfully"))
    }

    /// Request a reset token. The reply never reveals whether the email
    /// exists; repeated requests inside the throttle window get the same
    /// reply without a new token.
    pub async fn request_password_reset(
        &self,
        req: ResetPasswordRequest,
    ) -> ApiResult<MessageResponse> {
        const REPLY: &str = "If the email exists, a password reset link has been sent";

        let email = req.email.trim().to_lowercase();
        let user = match self.find_user_by_email(&email).await? {
            Some(user) => user,
            None => return Ok(MessageResponse::new(REPLY)),
        };

        if let Some(last) = user.last_password_reset_request {
            if Utc::now().signed_duration_since(last)
                < Duration::seconds(RESET_REQUEST_THROTTLE_SECONDS)
            {
                return Ok(MessageResponse::new(REPLY));
            }
        }

        let (token, _) = self.credentials.issue_reset_token(&user.user_id).await?;
        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.username, &token, &self.base_url)
            .await
        {
            tracing::warn!(user_id = %user.user_id, "Failed to send password reset email: {}", e);
        }

        Ok(MessageResponse::new(REPLY))
    }

    /// Pre-flight check for the reset form
    pub async fn validate_reset_token(&self, token: &str) -> ApiResult<ResetTokenValidation> {
        let user = self.credentials.validate_reset_token(token.trim()).await?;
        Ok(ResetTokenValidation {
            valid: true,
            email: user.email,
        })
    }

    /// Redeem a reset token for a new password
    pub async fn confirm_password_reset(
        &self,
        req: ResetPasswordConfirmRequest,
    ) -> ApiResult<MessageResponse> {
        validation::validate_password(&req.new_password)?;
        self.credentials
            .redeem_reset_token(req.token.trim(), &req.new_password)
            .await?;
        Ok(MessageResponse::new("Password reset successfully"))
    }

    /// Authenticated password change. Requires current-password proof,
    /// bumps the user revocation epoch, and blacklists the presented
    /// token; every session dies with the old password.
    pub async fn rotate_password(
        &self,
        user: &User,
        raw_token: &str,
        claims: &Claims,
        req: RotatePasswordRequest,
    ) -> ApiResult<MessageResponse> {
        if !credentials::verify_password(&req.current_password, &user.password_hash)? {
            return Err(ApiError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        validation::validate_password(&req.new_password)?;

        let password_hash = credentials::hash_password(&req.new_password)?;
        sqlx::query("UPDATE users SET password_hash = ?1, tokens_valid_after = ?2 WHERE user_id = ?3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(&user.user_id)
            .execute(&self.db)
            .await?;

        self.revocation
            .revoke(
                raw_token,
                &user.user_id,
                &user.account_id,
                remaining_ttl(claims),
            )
            .await?;

        self.notifier
            .notify(
                &user.user_id,
                "Password Changed",
                "Your password was changed. If this was not you, contact support immediately.",
            )
            .await;

        tracing::info!(user_id = %user.user_id, "Password rotated");
        Ok(MessageResponse::new("Password rotated successfully"))
    }

    /// Delete expired pending signups, returning the number removed
    pub async fn cleanup_expired_signups(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM pending_signups WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Shared tail of both signin flows: evaluate the suspension policy,
    /// issue the token, record the login. A denied non-admin still gets
    /// a token, flagged so the front-end routes to the suspension page;
    /// the authorization gate refuses it for everything else.
    async fn finish_signin(&self, user: &User, account: &Account) -> ApiResult<SigninResponse> {
        let suspended = !policy::suspension_allows(user, account);
        let token = self.tokens.issue(user)?;

        sqlx::query("UPDATE users SET last_login_at = ?1 WHERE user_id = ?2")
            .bind(Utc::now())
            .bind(&user.user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            account_id = %account.account_id,
            suspended,
            "User signed in"
        );

        if suspended {
            return Ok(SigninResponse::suspended(
                token,
                account.name.clone(),
                SigninUserSummary {
                    id: user.user_id.clone(),
                    email: user.email.clone(),
                    name: user.display_name.clone(),
                },
            ));
        }
        Ok(SigninResponse::token(token))
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn load_account(&self, account_id: &str) -> ApiResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = ?1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("Account {} missing for existing user", account_id))
            })
    }
}

/// Blacklist TTL covering the token's remaining lifetime, with a floor
/// so revocation always outlives clock skew around natural expiry.
fn remaining_ttl(claims: &Claims) -> Duration {
    Duration::seconds((claims.exp - Utc::now().timestamp()).max(60))
}
