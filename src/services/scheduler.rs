//! Deadline reminder scheduler
//!
//! Every tick, each open task with a future deadline is checked against its
//! target user's preset. An interval fires when the remaining time has just
//! crossed below it, i.e. within the last tick.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::database::Store;
use crate::i18n::{params, I18n};
use crate::models::Task;
use crate::services::messenger::Messenger;
use crate::utils::helpers::{escape_html, format_deadline, format_remaining};
use crate::utils::logging::log_notification;

/// `0 < remaining <= interval` and the crossing happened within the last tick
pub fn should_fire(remaining: Duration, interval: Duration, tick: Duration) -> bool {
    remaining > Duration::zero() && remaining <= interval && remaining > interval - tick
}

/// The interval crossed in this tick, if any; the shortest wins when several did
pub fn crossed_interval(remaining: Duration, intervals: &[Duration], tick: Duration) -> Option<Duration> {
    intervals
        .iter()
        .copied()
        .filter(|interval| should_fire(remaining, *interval, tick))
        .min()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct NotificationScheduler {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    i18n: I18n,
    tick: Duration,
    offset: FixedOffset,
}

impl NotificationScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        messenger: Arc<dyn Messenger>,
        i18n: I18n,
        tick_seconds: u64,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            messenger,
            i18n,
            tick: Duration::seconds(tick_seconds as i64),
            offset,
        }
    }

    /// Drive `sweep` forever on the configured tick
    pub async fn run(self) {
        let period = StdDuration::from_secs(self.tick.num_seconds().max(1) as u64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(tick_seconds = self.tick.num_seconds(), "Notification scheduler started");
        loop {
            ticker.tick().await;
            let report = self.sweep(Utc::now()).await;
            if report.sent > 0 || report.failed > 0 {
                info!(checked = report.checked, sent = report.sent, failed = report.failed, "Reminder sweep finished");
            }
        }
    }

    /// One pass over pending tasks at time `now`
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let tasks = match self.store.list_pending_with_deadline_after(now).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "Failed to load pending tasks for reminders");
                return report;
            }
        };

        for task in &tasks {
            report.checked += 1;
            match self.process_task(task, now).await {
                Some(true) => report.sent += 1,
                Some(false) => report.failed += 1,
                None => {}
            }
        }

        report
    }

    /// Returns `None` when nothing was due, otherwise whether delivery succeeded
    async fn process_task(&self, task: &Task, now: DateTime<Utc>) -> Option<bool> {
        let deadline = task.deadline?;
        let target_id = task.notification_target()?;

        let user = match self.store.find_user(target_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(task_id = task.id, user_id = target_id, "Reminder target no longer exists");
                return None;
            }
            Err(e) => {
                error!(task_id = task.id, user_id = target_id, error = %e, "Failed to load reminder target");
                return None;
            }
        };

        let preset = user.preset_for(task.task_type);
        if preset.is_off() {
            return None;
        }

        let remaining = deadline - now;
        let crossed = crossed_interval(remaining, &preset.intervals(), self.tick)?;

        let lang = self.i18n.detect_user_language(Some(&user.language_code));
        let text = self.i18n.t(
            "reminders.due",
            &lang,
            Some(&params([
                ("title", escape_html(&task.title)),
                ("id", escape_html(&task.label())),
                ("deadline", format_deadline(deadline, self.offset)),
                ("remaining", format_remaining(remaining)),
            ])),
        );

        let delivered = match self.messenger.send_text(&user.telegram_id, &text).await {
            Ok(()) => true,
            Err(e) => {
                error!(task_id = task.id, error = %e, "Reminder delivery failed");
                false
            }
        };
        log_notification(task.id, &user.telegram_id, crossed.num_seconds(), delivered);
        Some(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_only_inside_tick_window() {
        let tick = Duration::seconds(60);
        let hour = Duration::hours(1);

        assert!(should_fire(Duration::minutes(60), hour, tick));
        assert!(should_fire(Duration::seconds(3570), hour, tick));
        assert!(!should_fire(Duration::seconds(3540), hour, tick));
        assert!(!should_fire(Duration::seconds(3601), hour, tick));
        assert!(!should_fire(Duration::zero(), Duration::zero(), tick));
    }

    #[test]
    fn test_shortest_crossed_interval_wins() {
        let tick = Duration::hours(2);
        let intervals = [Duration::hours(3), Duration::hours(2)];
        assert_eq!(crossed_interval(Duration::minutes(90), &intervals, tick), Some(Duration::hours(2)));
        assert_eq!(crossed_interval(Duration::hours(4), &intervals, tick), None);
    }
}
