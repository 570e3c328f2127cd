//! Periodic overdue sweep across all tenants.

use crate::services::lifecycle::LifecycleManager;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    pub enabled: bool,
    pub interval: Duration,
}

/// Runs [`LifecycleManager::sweep_overdue_at`] for every business with
/// past-due open invoices, once per interval, until cancelled.
pub struct OverdueSweeper {
    config: SweepConfig,
    lifecycle: LifecycleManager,
    shutdown_token: CancellationToken,
}

impl OverdueSweeper {
    pub fn new(config: SweepConfig, lifecycle: LifecycleManager) -> Self {
        Self {
            config,
            lifecycle,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// One pass over every tenant. Returns the total number of invoices moved.
    ///
    /// A failing tenant is logged and skipped.
    pub async fn run_once(&self) -> u64 {
        let now = Utc::now();
        let business_ids = match self.lifecycle.businesses_with_overdue(now).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Overdue sweep could not list businesses");
                return 0;
            }
        };

        let mut updated = 0;
        for business_id in &business_ids {
            match self.lifecycle.sweep_overdue_at(business_id, now).await {
                Ok(count) => updated += count,
                Err(e) => {
                    tracing::error!(business_id = %business_id, error = %e, "Overdue sweep failed");
                }
            }
        }

        tracing::info!(
            businesses = business_ids.len(),
            updated,
            "Overdue sweep finished"
        );
        updated
    }

    pub async fn start(self) {
        if !self.config.enabled {
            tracing::info!("Overdue sweep disabled by configuration");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting overdue sweeper"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Overdue sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }
}
