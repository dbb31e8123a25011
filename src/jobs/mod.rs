use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        // Spawn cleanup tasks
        tokio::spawn(Self::token_blacklist_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::pending_signup_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::email_change_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::admin_account_reactivation_job(Arc::clone(&self)));

        // Spawn monitoring tasks
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Sweep expired blacklist rows (runs every hour)
    async fn token_blacklist_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running token blacklist sweep");

            let start = Instant::now();
            match tasks::sweep_token_blacklist(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "blacklist_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Removed {} expired blacklist entries", count);
                    } else {
                        info!("Blacklist sweep: nothing expired");
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "blacklist_sweep",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to sweep token blacklist: {}", e);
                }
            }
        }
    }

    /// Sweep expired pending signups (runs every hour)
    async fn pending_signup_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running pending signup sweep");

            let start = Instant::now();
            match tasks::sweep_pending_signups(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "pending_signup_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Removed {} expired pending signups", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "pending_signup_sweep",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to sweep pending signups: {}", e);
                }
            }
        }
    }

    /// Sweep expired email-change requests (runs every 15 minutes)
    async fn email_change_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900)); // Every 15 minutes

        loop {
            interval.tick().await;
            info!("Running email change sweep");

            let start = Instant::now();
            match tasks::sweep_email_changes(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "email_change_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Removed {} expired email change requests", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "email_change_sweep",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to sweep email change requests: {}", e);
                }
            }
        }
    }

    /// Re-activate suspended accounts holding admin users (runs every 15 minutes)
    async fn admin_account_reactivation_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900)); // Every 15 minutes

        loop {
            interval.tick().await;

            let start = Instant::now();
            match tasks::reactivate_admin_accounts(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "admin_account_reactivation",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Re-activated {} admin accounts", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "admin_account_reactivation",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to re-activate admin accounts: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - database answers
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
