//! Recurring timers scoped to the view that created them.
//!
//! A [`ViewScope`] owns the liveness flag for one view. Every schedule and
//! every fetch started on behalf of the view holds a [`Liveness`] and checks it
//! before touching view state; retiring (or dropping) the scope stops them all.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Period of the countdown display refresh.
pub const DISPLAY_REFRESH_PERIOD: Duration = Duration::from_secs(1);
/// Period of the host telemetry poll.
pub const TELEMETRY_REFRESH_PERIOD: Duration = Duration::from_secs(5);

/// Periods used by the two recurring schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Countdown re-render period (no network).
    pub display_period: Duration,
    /// Telemetry re-poll period.
    pub telemetry_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            display_period: DISPLAY_REFRESH_PERIOD,
            telemetry_period: TELEMETRY_REFRESH_PERIOD,
        }
    }
}

/// Human-readable time left until `target`, seconds discarded.
///
/// ```
/// use chrono::{Duration, Utc};
/// use mybot_admin::schedule::format_time_left;
///
/// let now = Utc::now();
/// assert_eq!(format_time_left(now + Duration::hours(25), now), "1 day 1 hour");
/// assert_eq!(format_time_left(now, now), "expired");
/// ```
#[must_use]
pub fn format_time_left(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if target <= now {
        return "expired".to_string();
    }
    let remaining = (target - now).num_seconds();
    let days = remaining / 86_400;
    let hours = remaining % 86_400 / 3_600;
    let minutes = remaining % 3_600 / 60;

    if days > 0 {
        format!("{} {}", unit(days, "day"), unit(hours, "hour"))
    } else if hours > 0 {
        format!("{} {}", unit(hours, "hour"), unit(minutes, "minute"))
    } else {
        unit(minutes, "minute")
    }
}

fn unit(count: i64, name: &str) -> String {
    if count == 1 {
        format!("{count} {name}")
    } else {
        format!("{count} {name}s")
    }
}

/// Liveness flag owned by a view. Retired on [`ViewScope::retire`] or drop.
#[derive(Debug)]
pub struct ViewScope {
    live: watch::Sender<bool>,
}

impl ViewScope {
    /// Open a live scope.
    #[must_use]
    pub fn new() -> Self {
        let (live, _) = watch::channel(true);
        Self { live }
    }

    /// Token handed to schedules and fetches started for this view.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        Liveness {
            live: self.live.subscribe(),
        }
    }

    /// Mark the view retired. Idempotent.
    pub fn retire(&self) {
        if self.live.send_replace(false) {
            debug!("view retired");
        }
    }

    /// Whether the view is still live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.live.send_replace(false);
    }
}

/// Read side of a [`ViewScope`].
#[derive(Debug, Clone)]
pub struct Liveness {
    live: watch::Receiver<bool>,
}

impl Liveness {
    /// Check-before-apply guard.
    #[must_use]
    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// Resolves once the owning view retires.
    pub async fn retired(&self) {
        let mut live = self.live.clone();
        // A closed channel means the scope is gone, which is retirement too.
        let _ = live.wait_for(|live| !*live).await;
    }
}

/// Handle to a running schedule; the task is aborted when the handle drops.
#[derive(Debug)]
pub struct ScheduleHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Schedule label used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the schedule now.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `tick` every `period` until `liveness` reports the view retired.
///
/// The first tick fires immediately. A tick still in flight when the view
/// retires is dropped.
pub fn spawn_recurring<F, Fut>(
    name: &'static str,
    period: Duration,
    liveness: Liveness,
    mut tick: F,
) -> ScheduleHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = liveness.retired() => break,
                _ = interval.tick() => {
                    if !liveness.is_live() {
                        break;
                    }
                    tokio::select! {
                        () = liveness.retired() => break,
                        () = tick() => {}
                    }
                }
            }
        }
        debug!(schedule = name, "schedule stopped");
    });
    ScheduleHandle { name, task }
}
