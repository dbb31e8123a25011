/// Configuration management for the DevHarbor backend
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub environment: String,
    /// Base URL used when building links in outbound mail
    pub base_url: String,
    pub version: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests per second for authenticated users
    pub authenticated_rps: u32,
    /// Requests per second for unauthenticated users
    pub unauthenticated_rps: u32,
    /// Requests per second for admin endpoints
    pub admin_rps: u32,
    /// Burst size
    pub burst_size: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));
        let version = env!("CARGO_PKG_VERSION").to_string();

        let database_path: PathBuf = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/devharbor.sqlite".to_string())
            .into();
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT_SECRET required".to_string()))?;
        let token_expiry_hours = env::var("JWT_EXPIRE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "noreply@devharbor.local".to_string()),
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let admin_rps = env::var("RATE_LIMIT_ADMIN_RPS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let burst_size = env::var("RATE_LIMIT_BURST_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
                base_url,
                version,
            },
            database: DatabaseConfig {
                path: database_path,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                token_expiry_hours,
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                admin_rps,
                burst_size,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.token_expiry_hours <= 0 {
            return Err(ApiError::Validation(
                "JWT_EXPIRE_HOURS must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for unit tests: in-memory database, fixed secret
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8000,
                environment: "test".to_string(),
                base_url: "http://localhost:8000".to_string(),
                version: "0.0.0".to_string(),
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-key-with-at-least-32-characters".to_string(),
                token_expiry_hours: 24,
            },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: false,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                admin_rps: 1000,
                burst_size: 50,
            },
        }
    }
}
