//! Expiry Sweeper Background Task
//!
//! Expiry is always observed lazily by lifecycle calls. This task adds an
//! active sweep so that overdue messages show up as Expired in status
//! reports and retrieval even when nobody touches them.
//!
//! The sweep goes through [`Broker::expire_overdue`], which takes the same
//! store lock as every other mutation.
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(run_expiry_sweeper(broker.clone(), shutdown_rx));
//!
//! // Later, trigger shutdown
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use crate::Broker;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters for sweeper activity.
#[derive(Debug, Default)]
pub struct SweeperMetrics {
    /// Total messages expired by the sweeper since startup
    pub messages_expired: AtomicU64,

    /// Total sweep cycles completed
    pub sweep_cycles: AtomicU64,

    /// Total errors encountered while sweeping
    pub sweep_errors: AtomicU64,
}

impl SweeperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            messages_expired: self.messages_expired.load(Ordering::Relaxed),
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweeper metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperSnapshot {
    pub messages_expired: u64,
    pub sweep_cycles: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Periodically expire overdue messages until shutdown is signalled.
///
/// Reads `sweep_enabled` and `sweep_interval` from the broker's own config.
/// When sweeping is disabled the task logs and returns immediately with
/// empty metrics.
pub async fn run_expiry_sweeper(
    broker: Broker,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweeperMetrics> {
    let metrics = Arc::new(SweeperMetrics::new());
    let period = broker.config().sweep_interval;

    if !broker.config().sweep_enabled || period.is_zero() {
        tracing::info!("Expiry sweeper disabled");
        return metrics;
    }

    let mut sweep_interval = interval(period);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_ms = period.as_millis() as u64,
        "Expiry sweeper started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Expiry sweeper shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep_once(&broker, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        messages_expired = snapshot.messages_expired,
        sweep_cycles = snapshot.sweep_cycles,
        sweep_errors = snapshot.sweep_errors,
        "Expiry sweeper completed"
    );

    metrics
}

/// Perform one sweep cycle.
fn sweep_once(broker: &Broker, metrics: &SweeperMetrics) {
    metrics.sweep_cycles.fetch_add(1, Ordering::Relaxed);

    match broker.expire_overdue(Utc::now()) {
        Ok(0) => tracing::trace!("Sweep cycle completed with no overdue messages"),
        Ok(expired) => {
            metrics
                .messages_expired
                .fetch_add(expired as u64, Ordering::Relaxed);
            tracing::info!(expired, "Sweep cycle expired messages");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to sweep overdue messages");
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}
