/// DevHarbor - developer sandbox backend
///
/// Multi-tenant REST API for the DevHarbor platform: account and user
/// lifecycle, token-based sessions, projects, sandboxes, and the
/// supporting notification and API key plumbing.

mod account;
mod api;
mod api_keys;
mod auth;
mod config;
mod context;
mod credentials;
mod db;
mod error;
mod ids;
mod jobs;
mod mailer;
mod metrics;
mod notify;
mod policy;
mod rate_limit;
mod revocation;
mod server;
mod signin_url;
mod tokens;
mod validation;
mod workspace;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devharbor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____            __  __           __
   / __ \___ _   __/ / / /___ ______/ /_  ____  _____
  / / / / _ \ | / / /_/ / __ `/ ___/ __ \/ __ \/ ___/
 / /_/ /  __/ |/ / __  / /_/ / /  / /_/ / /_/ / /
/_____/\___/|___/_/ /_/\__,_/_/  /_.___/\____/_/

        DevHarbor Backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
