//! # Reminder Scheduler
//!
//! Periodic pass over active appointments that delivers due reminder tiers.
//!
//! Within one appointment tiers are evaluated 5-day, 1-day, 1-hour, each
//! independently: an appointment first seen less than an hour out receives
//! all three in the same tick. A tier is marked only after its message was
//! sent, so a failed mark produces a duplicate on the next tick rather than a
//! lost reminder.
//!
//! Every tick re-scans all active appointments, which is linear in the number
//! of future appointments.

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::message::render_reminder;
use super::notifier::{Notifier, NotifyError};
use super::ReminderTier;
use crate::store::{Appointment, AppointmentId, AppointmentStore, StoreError};

/// Why one item of a tick could not be completed
#[derive(Debug)]
pub enum TickFailure {
    /// Active appointments could not be loaded; nothing was processed
    Fetch(StoreError),
    Send {
        appointment_id: AppointmentId,
        tier: ReminderTier,
        error: NotifyError,
    },
    Mark {
        appointment_id: AppointmentId,
        tier: ReminderTier,
        error: StoreError,
    },
}

/// Outcome of a single scheduler tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub scanned: usize,
    pub sent: usize,
    pub marked: usize,
    pub failures: Vec<TickFailure>,
    /// The tick did not run because another tick was still in progress
    pub superseded: bool,
}

impl TickReport {
    fn log(&self) {
        if self.superseded {
            warn!("Reminder tick skipped: previous tick still running");
            return;
        }
        if self.failures.is_empty() {
            debug!(
                "Reminder tick: {} scanned, {} sent, {} marked",
                self.scanned, self.sent, self.marked
            );
        } else {
            warn!(
                "Reminder tick: {} scanned, {} sent, {} marked, {} failed",
                self.scanned,
                self.sent,
                self.marked,
                self.failures.len()
            );
        }
    }
}

/// Interval that first fires after `initial_delay`, then every `period`
pub(crate) fn ticker(initial_delay: Duration, period: Duration) -> Interval {
    let period = period.max(Duration::from_secs(1));
    let mut interval = tokio::time::interval_at(Instant::now() + initial_delay, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

pub struct ReminderScheduler {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    initial_delay: Duration,
    tick_guard: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        initial_delay: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            interval,
            initial_delay,
            tick_guard: Mutex::new(()),
        }
    }

    /// Tick until `shutdown` flips to true or its sender is dropped
    ///
    /// A tick in progress always runs to completion before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Reminder scheduler started (interval: {}s, first run in {}s)",
            self.interval.as_secs(),
            self.initial_delay.as_secs()
        );
        let mut interval = ticker(self.initial_delay, self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Local::now().naive_local()).await.log();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Reminder scheduler stopped");
    }

    /// Deliver every due, unfired tier as of `now`
    pub async fn tick(&self, now: NaiveDateTime) -> TickReport {
        let Ok(_running) = self.tick_guard.try_lock() else {
            return TickReport {
                superseded: true,
                ..TickReport::default()
            };
        };

        let mut report = TickReport::default();
        let appointments = match self.store.list_pending_active(now).await {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!("Failed to load active appointments: {e}");
                report.failures.push(TickFailure::Fetch(e));
                return report;
            }
        };

        report.scanned = appointments.len();
        for appointment in &appointments {
            self.process(appointment, now, &mut report).await;
        }
        report
    }

    async fn process(&self, appointment: &Appointment, now: NaiveDateTime, report: &mut TickReport) {
        let remaining = appointment.scheduled_at - now;

        for tier in ReminderTier::ALL {
            if appointment.is_fired(tier) || !tier.is_due(remaining) {
                continue;
            }

            let text = render_reminder(tier, appointment);
            if let Err(error) = self.notifier.send(appointment.owner_id, &text).await {
                // Later tiers wait so they are retried in order
                warn!(
                    "Failed to send {tier} reminder for appointment {} to owner {}: {error}",
                    appointment.id, appointment.owner_id
                );
                report.failures.push(TickFailure::Send {
                    appointment_id: appointment.id,
                    tier,
                    error,
                });
                return;
            }
            report.sent += 1;

            if let Err(error) = self.store.mark_tier(appointment.id, tier).await {
                warn!(
                    "Sent {tier} reminder for appointment {} but could not mark it: {error}",
                    appointment.id
                );
                report.failures.push(TickFailure::Mark {
                    appointment_id: appointment.id,
                    tier,
                    error,
                });
                return;
            }
            report.marked += 1;

            info!(
                "Delivered {tier} reminder for appointment {} to owner {}",
                appointment.id, appointment.owner_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::notifier::recording::RecordingNotifier;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::sync::atomic::Ordering;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn appointment(id: AppointmentId, owner_id: i64, offset: ChronoDuration) -> Appointment {
        Appointment {
            id,
            owner_id,
            description: format!("appointment {id}"),
            scheduled_at: now() + offset,
            tier_5d_fired: false,
            tier_1d_fired: false,
            tier_1h_fired: false,
            created_at: now(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<RecordingNotifier>, ReminderScheduler) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = ReminderScheduler::new(
            store.clone(),
            notifier.clone(),
            Duration::from_secs(60),
            Duration::from_secs(0),
        );
        (store, notifier, scheduler)
    }

    #[tokio::test]
    async fn test_last_minute_appointment_fires_all_tiers_in_order() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::minutes(30)));

        let report = scheduler.tick(now()).await;
        assert_eq!(report.sent, 3);
        assert_eq!(report.marked, 3);
        assert!(report.failures.is_empty());

        let messages = notifier.messages_for(10);
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("5 dias"));
        assert!(messages[1].contains("1 dia"));
        assert!(messages[2].contains("1 hora"));
        assert!(store.snapshot(1).unwrap().all_fired());
    }

    #[tokio::test]
    async fn test_fired_tiers_are_never_resent() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::minutes(30)));

        scheduler.tick(now()).await;
        for minute in 1..5 {
            let report = scheduler.tick(now() + ChronoDuration::minutes(minute)).await;
            assert_eq!(report.sent, 0);
            assert!(store.snapshot(1).unwrap().all_fired());
        }
        assert_eq!(notifier.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_tiers_escalate_as_time_passes() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::days(3)));

        scheduler.tick(now()).await;
        let stored = store.snapshot(1).unwrap();
        assert!(stored.tier_5d_fired);
        assert!(!stored.tier_1d_fired);
        assert!(!stored.tier_1h_fired);

        scheduler.tick(now() + ChronoDuration::days(2) + ChronoDuration::hours(1)).await;
        let stored = store.snapshot(1).unwrap();
        assert!(stored.tier_1d_fired);
        assert!(!stored.tier_1h_fired);

        scheduler.tick(now() + ChronoDuration::days(3) - ChronoDuration::minutes(59)).await;
        assert!(store.snapshot(1).unwrap().all_fired());
        assert_eq!(notifier.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_far_future_appointment_is_untouched() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::days(6)));

        let report = scheduler.tick(now()).await;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(notifier.sent_count(), 0);
        assert!(!store.snapshot(1).unwrap().tier_5d_fired);
    }

    #[tokio::test]
    async fn test_send_failure_is_isolated_and_retried() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::minutes(30)));
        store.insert(appointment(2, 20, ChronoDuration::minutes(30)));
        notifier.failing_owners.lock().unwrap().insert(10);

        let report = scheduler.tick(now()).await;
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            TickFailure::Send { appointment_id: 1, tier: ReminderTier::FiveDays, .. }
        ));
        let failed = store.snapshot(1).unwrap();
        assert!(!failed.tier_5d_fired && !failed.tier_1d_fired && !failed.tier_1h_fired);
        assert!(store.snapshot(2).unwrap().all_fired());
        assert_eq!(notifier.messages_for(20).len(), 3);

        notifier.failing_owners.lock().unwrap().clear();
        let report = scheduler.tick(now()).await;
        assert_eq!(report.sent, 3);
        assert!(store.snapshot(1).unwrap().all_fired());
    }

    #[tokio::test]
    async fn test_mark_failure_resends_next_tick() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::days(4)));
        store.fail_mark_for.lock().unwrap().insert(1);

        let report = scheduler.tick(now()).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.marked, 0);
        assert!(!store.snapshot(1).unwrap().tier_5d_fired);

        store.fail_mark_for.lock().unwrap().clear();
        let report = scheduler.tick(now()).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.marked, 1);
        assert!(store.snapshot(1).unwrap().tier_5d_fired);

        // At-least-once: the 5-day reminder went out twice
        assert_eq!(notifier.messages_for(10).len(), 2);
    }

    #[tokio::test]
    async fn test_store_outage_is_reported_not_raised() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::minutes(30)));
        store.fail_all.store(true, Ordering::SeqCst);

        let report = scheduler.tick(now()).await;
        assert!(matches!(report.failures.as_slice(), [TickFailure::Fetch(_)]));
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_superseded() {
        let (store, notifier, scheduler) = setup();
        store.insert(appointment(1, 10, ChronoDuration::minutes(30)));

        let held = scheduler.tick_guard.lock().await;
        let report = scheduler.tick(now()).await;
        assert!(report.superseded);
        assert_eq!(notifier.sent_count(), 0);
        drop(held);

        assert_eq!(scheduler.tick(now()).await.sent, 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let mut upcoming = appointment(1, 10, ChronoDuration::minutes(30));
        upcoming.scheduled_at = Local::now().naive_local() + ChronoDuration::minutes(30);
        store.insert(upcoming);

        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            notifier.clone(),
            Duration::from_secs(1),
            Duration::from_millis(0),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert_eq!(notifier.sent_count(), 3);
        assert!(store.snapshot(1).unwrap().all_fired());
    }
}
