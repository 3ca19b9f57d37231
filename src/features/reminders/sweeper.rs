//! # Cleanup Sweeper
//!
//! Deletes appointments whose scheduled time has passed, regardless of which
//! reminders were delivered. Racing the scheduler on the same row is harmless:
//! the row is gone either way.

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::scheduler::ticker;
use crate::store::{AppointmentStore, StoreError};

pub struct CleanupSweeper {
    store: Arc<dyn AppointmentStore>,
    interval: Duration,
    initial_delay: Duration,
}

impl CleanupSweeper {
    pub fn new(store: Arc<dyn AppointmentStore>, interval: Duration, initial_delay: Duration) -> Self {
        Self {
            store,
            interval,
            initial_delay,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Cleanup sweeper started (interval: {}s, first run in {}s)",
            self.interval.as_secs(),
            self.initial_delay.as_secs()
        );
        let mut interval = ticker(self.initial_delay, self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep(Local::now().naive_local()).await {
                        warn!("Cleanup sweep failed: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Cleanup sweeper stopped");
    }

    /// Delete every appointment scheduled strictly before `now`
    pub async fn sweep(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let deleted = self.store.delete_expired(now).await?;
        if deleted > 0 {
            info!("Removed {deleted} expired appointment(s)");
        } else {
            debug!("Cleanup sweep found nothing to remove");
        }
        Ok(deleted)
    }
}
