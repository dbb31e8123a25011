/// Application context and dependency injection
use crate::{
    account::{AccountManager, EmailChangeManager},
    api_keys::ApiKeyManager,
    auth::AuthManager,
    config::ServerConfig,
    credentials::CredentialStore,
    db,
    error::ApiResult,
    mailer::Mailer,
    notify::Notifier,
    rate_limit::RateLimiter,
    revocation::RevocationRegistry,
    signin_url::SigninUrlResolver,
    tokens::TokenIssuer,
    workspace::WorkspaceStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
///
/// Everything here is cheap to clone: managers carry a pool handle and
/// small config, nothing else.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub tokens: TokenIssuer,
    pub revocation: RevocationRegistry,
    pub auth: AuthManager,
    pub accounts: AccountManager,
    pub email_changes: EmailChangeManager,
    pub signin_urls: SigninUrlResolver,
    pub workspace: WorkspaceStore,
    pub api_keys: ApiKeyManager,
    pub notifier: Notifier,
    pub rate_limiter: RateLimiter,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.database).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let tokens = TokenIssuer::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_expiry_hours,
        );
        let revocation = RevocationRegistry::new(db.clone());
        let credentials = CredentialStore::new(db.clone());
        let signin_urls = SigninUrlResolver::new(db.clone());
        let notifier = Notifier::new(db.clone());
        let mailer = Mailer::new(config.email.clone())?;

        let auth = AuthManager::new(
            db.clone(),
            tokens.clone(),
            revocation.clone(),
            credentials,
            signin_urls.clone(),
            notifier.clone(),
            mailer.clone(),
            config.service.base_url.clone(),
        );
        let accounts = AccountManager::new(db.clone(), notifier.clone(), mailer.clone());
        let email_changes =
            EmailChangeManager::new(db.clone(), mailer, config.service.base_url.clone());
        let workspace = WorkspaceStore::new(db.clone());
        let api_keys = ApiKeyManager::new(db.clone());
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            revocation,
            auth,
            accounts,
            email_changes,
            signin_urls,
            workspace,
            api_keys,
            notifier,
            rate_limiter,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
