//! Views: the only place derived state lives.
//!
//! A view owns a [`ViewScope`] and publishes its latest snapshot through a
//! `watch` channel written only by the view itself. Fetches race the scope's
//! retirement and are discarded when the view retires first; schedules
//! started by a view stop with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mybot_api_models::{FoodList, ImageFolder};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::aggregate::{
    self, CountdownLine, DashboardStats, HostUsage, UsageBreakdown, countdown_lines,
};
use crate::error::AdminResult;
use crate::gateway::ResourceGateway;
use crate::model::{
    CountdownEntry, FoodEntry, ImageEntry, IntegrityWarning, Normalized, ReminderEntry,
    ResourceKind, TodoEntry,
};
use crate::normalize;
use crate::notice::Notices;
use crate::schedule::{Liveness, ScheduleHandle, ViewScope, spawn_recurring};

/// A fetchable, normalizable backend collection.
#[async_trait]
pub trait Collection: Send + Sync + 'static {
    /// Entry type produced by the normalizer.
    type Entry: Clone + Send + Sync + 'static;

    /// Resource kind, for notices and logs.
    fn kind(&self) -> ResourceKind;

    /// Fetch and normalize the whole collection.
    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<Self::Entry>>;
}

/// Reminders, optionally restricted to one owner.
#[derive(Debug, Clone, Default)]
pub struct Reminders {
    /// Owner filter.
    pub owner: Option<String>,
}

#[async_trait]
impl Collection for Reminders {
    type Entry = ReminderEntry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Reminders
    }

    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<ReminderEntry>> {
        match &self.owner {
            Some(owner) => {
                let items = gateway.list_reminders_for(owner).await?;
                Ok(normalize::owner_reminders(owner.trim(), &items))
            }
            None => Ok(normalize::reminders(&gateway.list_reminders().await?)),
        }
    }
}

/// Todos, optionally restricted to one owner.
#[derive(Debug, Clone, Default)]
pub struct Todos {
    /// Owner filter.
    pub owner: Option<String>,
}

#[async_trait]
impl Collection for Todos {
    type Entry = TodoEntry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Todos
    }

    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<TodoEntry>> {
        match &self.owner {
            Some(owner) => {
                let buckets = gateway.list_todos_for(owner).await?;
                Ok(normalize::owner_todos(owner.trim(), &buckets))
            }
            None => Ok(normalize::todos(&gateway.list_todos().await?)),
        }
    }
}

/// Countdowns, optionally restricted to one owner.
#[derive(Debug, Clone, Default)]
pub struct Countdowns {
    /// Owner filter.
    pub owner: Option<String>,
}

#[async_trait]
impl Collection for Countdowns {
    type Entry = CountdownEntry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Countdowns
    }

    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<CountdownEntry>> {
        match &self.owner {
            Some(owner) => {
                let events = gateway.list_countdowns_for(owner).await?;
                Ok(normalize::owner_countdowns(owner.trim(), &events))
            }
            None => Ok(normalize::countdowns(&gateway.list_countdowns().await?)),
        }
    }
}

/// Food lists, optionally only one of them.
#[derive(Debug, Clone, Default)]
pub struct FoodLists {
    /// List filter.
    pub list: Option<FoodList>,
}

#[async_trait]
impl Collection for FoodLists {
    type Entry = FoodEntry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Food
    }

    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<FoodEntry>> {
        match self.list {
            Some(list) => Ok(normalize::food_list(&gateway.list_food_for(list).await?)),
            None => Ok(normalize::food(&gateway.list_food().await?)),
        }
    }
}

/// Image assets, optionally only one folder.
#[derive(Debug, Clone, Default)]
pub struct Images {
    /// Folder filter.
    pub folder: Option<ImageFolder>,
}

#[async_trait]
impl Collection for Images {
    type Entry = ImageEntry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Images
    }

    async fn fetch(&self, gateway: &ResourceGateway) -> AdminResult<Normalized<ImageEntry>> {
        match self.folder {
            Some(folder) => {
                let listing = gateway.list_images_in(folder).await?;
                Ok(normalize::images(folder, &listing.images))
            }
            None => Ok(normalize::image_catalog(&gateway.list_images().await?)),
        }
    }
}

/// Normalized entries as of one fetch.
#[derive(Debug, Clone)]
pub struct Snapshot<E> {
    /// Entries in source order.
    pub entries: Vec<E>,
    /// Entries dropped during normalization.
    pub warnings: Vec<IntegrityWarning>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Published snapshot; `None` until the first successful fetch.
pub type SharedSnapshot<E> = Option<Arc<Snapshot<E>>>;

/// What happened to a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reloaded {
    /// The result replaced the published state.
    Applied {
        /// Entries kept.
        entries: usize,
        /// Entries dropped as malformed.
        dropped: usize,
    },
    /// The view retired before the result arrived.
    Discarded,
}

/// Anything the refresh controller can re-fetch after a write.
#[async_trait]
pub trait Reload: Send + Sync {
    /// Resource kind being reloaded.
    fn kind(&self) -> ResourceKind;

    /// Re-fetch and replace the published state. Never patches it.
    async fn reload(&self) -> AdminResult<Reloaded>;
}

/// A live view over one collection.
pub struct ResourceView<C: Collection> {
    collection: C,
    gateway: ResourceGateway,
    notices: Notices,
    scope: ViewScope,
    snapshot: watch::Sender<SharedSnapshot<C::Entry>>,
}

impl<C: Collection> ResourceView<C> {
    /// Open a live view; nothing is fetched until [`Reload::reload`] or
    /// [`ResourceView::refresh`].
    #[must_use]
    pub fn open(collection: C, gateway: ResourceGateway, notices: Notices) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            collection,
            gateway,
            notices,
            scope: ViewScope::new(),
            snapshot,
        }
    }

    /// Collection this view shows.
    pub const fn collection(&self) -> &C {
        &self.collection
    }

    /// Gateway used for fetches and writes.
    pub const fn gateway(&self) -> &ResourceGateway {
        &self.gateway
    }

    /// Notice channel of this view.
    pub const fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Liveness token for work started on behalf of this view.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.scope.liveness()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SharedSnapshot<C::Entry> {
        self.snapshot.borrow().clone()
    }

    /// Latest entries, empty before the first fetch.
    #[must_use]
    pub fn entries(&self) -> Vec<C::Entry> {
        self.snapshot
            .borrow()
            .as_ref()
            .map(|snapshot| snapshot.entries.clone())
            .unwrap_or_default()
    }

    /// Follow snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot<C::Entry>> {
        self.snapshot.subscribe()
    }

    /// Retire the view: in-flight fetches are discarded and schedules stop.
    pub fn retire(&self) {
        self.scope.retire();
    }

    /// Reload, reporting a failure as an error notice. Prior state is kept.
    pub async fn refresh(&self) -> Option<Reloaded> {
        match self.reload().await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.notices.error(format!(
                    "failed to load {}: {}",
                    self.collection.kind(),
                    err.notice_text()
                ));
                None
            }
        }
    }
}

#[async_trait]
impl<C: Collection> Reload for ResourceView<C> {
    fn kind(&self) -> ResourceKind {
        self.collection.kind()
    }

    async fn reload(&self) -> AdminResult<Reloaded> {
        let liveness = self.scope.liveness();
        let normalized = tokio::select! {
            () = liveness.retired() => None,
            fetched = self.collection.fetch(&self.gateway) => Some(fetched?),
        };
        let Some(normalized) = normalized else {
            debug!(kind = %self.collection.kind(), "view retired during fetch");
            return Ok(Reloaded::Discarded);
        };
        if !liveness.is_live() {
            return Ok(Reloaded::Discarded);
        }

        log_warnings(&normalized.warnings);
        let outcome = Reloaded::Applied {
            entries: normalized.entries.len(),
            dropped: normalized.warnings.len(),
        };
        self.snapshot.send_replace(Some(Arc::new(Snapshot {
            entries: normalized.entries,
            warnings: normalized.warnings,
            fetched_at: Utc::now(),
        })));
        Ok(outcome)
    }
}

fn log_warnings(warnings: &[IntegrityWarning]) {
    for warning in warnings {
        warn!(
            kind = %warning.kind,
            owner = %warning.owner,
            detail = %warning.detail,
            "dropped malformed entry"
        );
    }
}

/// Countdown view with a live time-left display.
pub struct CountdownBoard {
    view: ResourceView<Countdowns>,
    lines: Arc<watch::Sender<Vec<CountdownLine>>>,
    display: Option<ScheduleHandle>,
}

impl CountdownBoard {
    /// Open the board; call [`CountdownBoard::start_display`] to keep lines fresh.
    #[must_use]
    pub fn open(countdowns: Countdowns, gateway: ResourceGateway, notices: Notices) -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            view: ResourceView::open(countdowns, gateway, notices),
            lines: Arc::new(lines),
            display: None,
        }
    }

    /// Underlying countdown view.
    pub const fn view(&self) -> &ResourceView<Countdowns> {
        &self.view
    }

    /// Latest rendered lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CountdownLine> {
        self.lines.borrow().clone()
    }

    /// Follow rendered line changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CountdownLine>> {
        self.lines.subscribe()
    }

    /// Re-render lines from the current snapshot at `now`.
    pub fn render_at(&self, now: DateTime<Utc>) {
        render_lines(&self.view.subscribe(), &self.lines, now);
    }

    /// Re-render the time-left strings every `period` without touching the
    /// network. Replaces a running display schedule.
    pub fn start_display(&mut self, period: Duration) {
        let snapshot = self.view.subscribe();
        let lines = Arc::clone(&self.lines);
        let liveness = self.view.liveness();
        let guard = liveness.clone();
        self.display = Some(spawn_recurring(
            "countdown-display",
            period,
            liveness,
            move || {
                if guard.is_live() {
                    render_lines(&snapshot, &lines, Utc::now());
                }
                std::future::ready(())
            },
        ));
    }

    /// Whether the display schedule is still ticking.
    #[must_use]
    pub fn display_running(&self) -> bool {
        self.display
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Retire the board and its display schedule.
    pub fn retire(&self) {
        self.view.retire();
    }
}

fn render_lines(
    snapshot: &watch::Receiver<SharedSnapshot<CountdownEntry>>,
    lines: &watch::Sender<Vec<CountdownLine>>,
    now: DateTime<Utc>,
) {
    let rendered = snapshot
        .borrow()
        .as_ref()
        .map(|snapshot| countdown_lines(&snapshot.entries, now))
        .unwrap_or_default();
    lines.send_if_modified(|current| {
        if *current == rendered {
            false
        } else {
            *current = rendered;
            true
        }
    });
}

#[async_trait]
impl Reload for CountdownBoard {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Countdowns
    }

    async fn reload(&self) -> AdminResult<Reloaded> {
        let outcome = self.view.reload().await?;
        if matches!(outcome, Reloaded::Applied { .. }) {
            self.render_at(Utc::now());
        }
        Ok(outcome)
    }
}

/// Dashboard: headline counts from a four-way fan-out plus live host gauges.
pub struct DashboardView {
    gateway: ResourceGateway,
    notices: Notices,
    scope: ViewScope,
    stats: watch::Sender<Option<DashboardStats>>,
    host: Arc<watch::Sender<Option<HostUsage>>>,
    telemetry: Option<ScheduleHandle>,
}

impl DashboardView {
    /// Open the dashboard; nothing is fetched yet.
    #[must_use]
    pub fn open(gateway: ResourceGateway, notices: Notices) -> Self {
        let (stats, _) = watch::channel(None);
        let (host, _) = watch::channel(None);
        Self {
            gateway,
            notices,
            scope: ViewScope::new(),
            stats,
            host: Arc::new(host),
            telemetry: None,
        }
    }

    /// Latest stat set.
    #[must_use]
    pub fn stats(&self) -> Option<DashboardStats> {
        *self.stats.borrow()
    }

    /// Latest host gauges.
    #[must_use]
    pub fn host(&self) -> Option<HostUsage> {
        self.host.borrow().clone()
    }

    /// Follow stat changes.
    #[must_use]
    pub fn subscribe_stats(&self) -> watch::Receiver<Option<DashboardStats>> {
        self.stats.subscribe()
    }

    /// Follow host gauge changes.
    #[must_use]
    pub fn subscribe_host(&self) -> watch::Receiver<Option<HostUsage>> {
        self.host.subscribe()
    }

    /// Fetch reminders, todos, countdowns and the usage overview concurrently
    /// and publish the stat set only when all four succeed.
    ///
    /// # Errors
    ///
    /// The first failing fetch; the published stat set is left as it was.
    pub async fn load_stats(&self) -> AdminResult<Reloaded> {
        let liveness = self.scope.liveness();
        let gateway = &self.gateway;
        let fan_out = async {
            tokio::try_join!(
                gateway.list_reminders(),
                gateway.list_todos(),
                gateway.list_countdowns(),
                gateway.usage_overview()
            )
        };
        let fetched = tokio::select! {
            () = liveness.retired() => None,
            fetched = fan_out => Some(fetched?),
        };
        let Some((reminders, todos, countdowns, overview)) = fetched else {
            return Ok(Reloaded::Discarded);
        };
        if !liveness.is_live() {
            return Ok(Reloaded::Discarded);
        }

        let reminders = normalize::reminders(&reminders);
        let todos = normalize::todos(&todos);
        let countdowns = normalize::countdowns(&countdowns);
        let dropped = reminders.warnings.len() + todos.warnings.len() + countdowns.warnings.len();
        log_warnings(&reminders.warnings);
        log_warnings(&todos.warnings);
        log_warnings(&countdowns.warnings);

        let stats = aggregate::dashboard_stats(
            &reminders.entries,
            &todos.entries,
            &countdowns.entries,
            &overview,
        );
        self.stats.send_replace(Some(stats));
        Ok(Reloaded::Applied {
            entries: reminders.entries.len() + todos.entries.len() + countdowns.entries.len(),
            dropped,
        })
    }

    /// [`DashboardView::load_stats`], reporting a failure as an error notice.
    pub async fn refresh_stats(&self) -> Option<Reloaded> {
        match self.load_stats().await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.notices
                    .error(format!("failed to load dashboard: {}", err.notice_text()));
                None
            }
        }
    }

    /// Poll host status once and publish the gauges.
    ///
    /// # Errors
    ///
    /// Fetch failures; the previous gauges are kept.
    pub async fn load_host(&self) -> AdminResult<Reloaded> {
        poll_host(&self.gateway, &self.scope.liveness(), &self.host).await
    }

    /// Re-poll host status every `period` until the view retires. Failures
    /// are logged and the previous gauges kept. Replaces a running schedule.
    pub fn start_telemetry(&mut self, period: Duration) {
        let gateway = self.gateway.clone();
        let host = Arc::clone(&self.host);
        let liveness = self.scope.liveness();
        let guard = liveness.clone();
        self.telemetry = Some(spawn_recurring(
            "host-telemetry",
            period,
            liveness,
            move || {
                let gateway = gateway.clone();
                let host = Arc::clone(&host);
                let guard = guard.clone();
                async move {
                    if let Err(err) = poll_host(&gateway, &guard, &host).await {
                        warn!(error = %err, "host telemetry poll failed");
                    }
                }
            },
        ));
    }

    /// Whether the telemetry schedule is still polling.
    #[must_use]
    pub fn telemetry_running(&self) -> bool {
        self.telemetry
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Retire the dashboard and its telemetry schedule.
    pub fn retire(&self) {
        self.scope.retire();
    }
}

async fn poll_host(
    gateway: &ResourceGateway,
    liveness: &Liveness,
    host: &watch::Sender<Option<HostUsage>>,
) -> AdminResult<Reloaded> {
    let status = gateway.system_status().await?;
    if !liveness.is_live() {
        return Ok(Reloaded::Discarded);
    }
    host.send_replace(Some(aggregate::host_usage(&status)));
    Ok(Reloaded::Applied {
        entries: 1,
        dropped: 0,
    })
}

#[async_trait]
impl Reload for DashboardView {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Telemetry
    }

    async fn reload(&self) -> AdminResult<Reloaded> {
        self.load_stats().await
    }
}

/// Message-volume breakdowns from a three-way fan-out.
pub struct UsageView {
    gateway: ResourceGateway,
    scope: ViewScope,
    breakdown: watch::Sender<Option<UsageBreakdown>>,
}

impl UsageView {
    /// Open the view; nothing is fetched yet.
    #[must_use]
    pub fn open(gateway: ResourceGateway) -> Self {
        let (breakdown, _) = watch::channel(None);
        Self {
            gateway,
            scope: ViewScope::new(),
            breakdown,
        }
    }

    /// Latest breakdown.
    #[must_use]
    pub fn breakdown(&self) -> Option<UsageBreakdown> {
        self.breakdown.borrow().clone()
    }

    /// Retire the view.
    pub fn retire(&self) {
        self.scope.retire();
    }
}

#[async_trait]
impl Reload for UsageView {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Telemetry
    }

    async fn reload(&self) -> AdminResult<Reloaded> {
        let liveness = self.scope.liveness();
        let gateway = &self.gateway;
        let fetched = tokio::select! {
            () = liveness.retired() => None,
            fetched = async {
                tokio::try_join!(
                    gateway.usage_hourly(),
                    gateway.usage_weekday(),
                    gateway.usage_daily()
                )
            } => Some(fetched?),
        };
        let Some((hourly, weekday, daily)) = fetched else {
            debug!("usage view retired during fetch");
            return Ok(Reloaded::Discarded);
        };
        if !liveness.is_live() {
            return Ok(Reloaded::Discarded);
        }
        let breakdown = aggregate::usage_breakdown(&hourly, &weekday, &daily);
        let entries = breakdown.daily.len();
        self.breakdown.send_replace(Some(breakdown));
        Ok(Reloaded::Applied {
            entries,
            dropped: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::notice::{NoticeLevel, drain};
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn gateway(server: &MockServer) -> Result<ResourceGateway> {
        Ok(ResourceGateway::new(GatewayConfig::new(
            server.base_url().parse()?,
        ))?)
    }

    fn stats_mocks(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/api/reminders");
            then.status(200).json_body(json!({
                "1": [{"job_id": "a", "event": "wake", "hour": 7, "minute": 0, "session_id": "s"}]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/todos");
            then.status(200).json_body(json!({
                "1": {"work": [{"task": "ship", "done": false}], "play": [{"task": "game", "done": true}]}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/countdowns");
            then.status(200).json_body(json!({
                "1": {"launch": {"time": "2030-01-01T00:00:00+08:00"}}
            }));
        });
    }

    #[tokio::test]
    async fn dashboard_keeps_prior_stats_when_one_fetch_fails() -> Result<()> {
        let server = MockServer::start_async().await;
        stats_mocks(&server);
        let mut overview = server.mock(|when, then| {
            when.method(GET).path("/api/usage/overview");
            then.status(200).json_body(json!({
                "total_calls": 50, "recent_7days": 12, "total_records": 50
            }));
        });

        let (notices, mut stream) = Notices::channel();
        let dashboard = DashboardView::open(gateway(&server)?, notices);
        dashboard.refresh_stats().await;
        let prior = dashboard.stats().expect("first refresh publishes stats");
        assert_eq!(
            prior,
            DashboardStats {
                reminders: 1,
                open_todos: 1,
                countdowns: 1,
                weekly_messages: 12,
            }
        );

        overview.delete();
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/overview");
            then.status(500).json_body(json!({"detail": "usage store unavailable"}));
        });

        assert_eq!(dashboard.refresh_stats().await, None);
        assert_eq!(dashboard.stats(), Some(prior));
        let emitted = drain(&mut stream);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].level, NoticeLevel::Error);
        assert!(emitted[0].message.contains("usage store unavailable"));
        Ok(())
    }

    #[tokio::test]
    async fn retired_view_discards_late_results() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/eat");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"android": ["rice"], "apple": []}));
        });

        let (notices, _stream) = Notices::channel();
        let view = ResourceView::open(FoodLists::default(), gateway(&server)?, notices);
        let retire_soon = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            view.retire();
        };
        let (outcome, ()) = tokio::join!(view.reload(), retire_soon);

        assert_eq!(outcome?, Reloaded::Discarded);
        assert!(view.snapshot().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_entries_do_not_blank_the_view() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/reminders/9");
            then.status(200).json_body(json!([
                {"job_id": "ok", "event": "tea", "hour": 16, "minute": 30, "session_id": "g1"},
                {"event": "no id", "hour": 1, "minute": 1, "session_id": "g1"}
            ]));
        });

        let (notices, _stream) = Notices::channel();
        let view = ResourceView::open(
            Reminders {
                owner: Some("9".into()),
            },
            gateway(&server)?,
            notices,
        );
        let outcome = view.reload().await?;
        assert_eq!(
            outcome,
            Reloaded::Applied {
                entries: 1,
                dropped: 1
            }
        );
        let snapshot = view.snapshot().expect("snapshot published");
        assert_eq!(snapshot.entries[0].key.job_id, "ok");
        assert_eq!(snapshot.warnings.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn single_folder_and_single_list_survive_bad_elements() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/images/pics");
            then.status(200).json_body(json!({
                "folder": "pics",
                "images": [
                    {"name": "cat.png", "size": 10, "modified": "2025-01-01T00:00:00", "url": "/api/images/pics/cat.png"},
                    {"name": "bad.png"}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/eat/apple");
            then.status(200)
                .json_body(json!({"list_name": "apple", "foods": ["rice", null]}));
        });

        let (notices, _stream) = Notices::channel();
        let images = ResourceView::open(
            Images {
                folder: Some(ImageFolder::Pics),
            },
            gateway(&server)?,
            notices.clone(),
        );
        assert_eq!(
            images.reload().await?,
            Reloaded::Applied {
                entries: 1,
                dropped: 1
            }
        );
        let snapshot = images.snapshot().expect("image snapshot published");
        assert_eq!(snapshot.entries[0].key.filename, "cat.png");

        let food = ResourceView::open(
            FoodLists {
                list: Some(FoodList::Apple),
            },
            gateway(&server)?,
            notices,
        );
        assert_eq!(
            food.reload().await?,
            Reloaded::Applied {
                entries: 1,
                dropped: 1
            }
        );
        assert_eq!(food.entries()[0].payload, "rice");
        Ok(())
    }

    #[tokio::test]
    async fn countdown_display_renders_without_refetching() -> Result<()> {
        let server = MockServer::start_async().await;
        let listing = server.mock(|when, then| {
            when.method(GET).path("/api/countdowns");
            then.status(200).json_body(json!({
                "5": {
                    "exam": {"time": "2999-06-01T09:00:00+08:00"},
                    "party": {"time": "2000-01-01T00:00:00"}
                }
            }));
        });

        let (notices, _stream) = Notices::channel();
        let mut board = CountdownBoard::open(Countdowns::default(), gateway(&server)?, notices);
        board.reload().await?;
        let mut lines = board.subscribe();
        board.start_display(Duration::from_millis(10));

        tokio::time::timeout(Duration::from_secs(2), lines.wait_for(|lines| lines.len() == 2))
            .await??;
        let rendered = board.lines();
        assert!(rendered[0].time_left.contains("day"));
        assert_eq!(rendered[1].time_left, "expired");

        assert!(board.display_running());
        board.retire();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!board.display_running());
        listing.assert();
        Ok(())
    }

    #[tokio::test]
    async fn telemetry_schedule_publishes_host_gauges() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200).json_body(json!({
                "cpu_percent": 37.26,
                "memory_percent": 61.0,
                "disk_percent": 80.5
            }));
        });

        let (notices, _stream) = Notices::channel();
        let mut dashboard = DashboardView::open(gateway(&server)?, notices);
        let mut host = dashboard.subscribe_host();
        dashboard.start_telemetry(Duration::from_millis(20));

        tokio::time::timeout(Duration::from_secs(2), host.wait_for(Option::is_some)).await??;
        let gauges = dashboard.host().expect("gauges published");
        assert_eq!(gauges.cpu.label, "37.3%");
        assert_eq!(gauges.disk.label, "80.5%");

        assert!(dashboard.telemetry_running());
        dashboard.retire();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!dashboard.telemetry_running());
        host.mark_unchanged();
        let republished = tokio::time::timeout(Duration::from_millis(100), host.changed()).await;
        assert!(republished.is_err(), "no gauges after retirement");
        Ok(())
    }

    #[tokio::test]
    async fn usage_view_builds_dense_tables() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/hourly");
            then.status(200).json_body(json!({"hourly_stats": {"9": 4}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/weekday");
            then.status(200).json_body(json!({"weekday_stats": {"Friday": 3}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/daily");
            then.status(200)
                .json_body(json!({"daily_stats": {"2025-03-01": 2, "2025-03-03": 1}}));
        });

        let view = UsageView::open(gateway(&server)?);
        view.reload().await?;
        let breakdown = view.breakdown().expect("breakdown published");
        assert_eq!(breakdown.hourly[9], 4);
        assert_eq!(breakdown.weekday[4].1, 3);
        assert_eq!(breakdown.daily.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn retired_usage_view_stops_waiting_for_slow_breakdowns() -> Result<()> {
        let server = MockServer::start_async().await;
        for (path, body) in [
            ("/api/usage/hourly", json!({"hourly_stats": {"9": 4}})),
            ("/api/usage/weekday", json!({"weekday_stats": {"Friday": 3}})),
            ("/api/usage/daily", json!({"daily_stats": {"2025-03-01": 2}})),
        ] {
            server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .json_body(body);
            });
        }

        let view = UsageView::open(gateway(&server)?);
        let retire_soon = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            view.retire();
        };
        let (outcome, ()) = tokio::time::timeout(
            Duration::from_secs(2),
            async { tokio::join!(view.reload(), retire_soon) },
        )
        .await?;

        assert_eq!(outcome?, Reloaded::Discarded);
        assert!(view.breakdown().is_none());
        Ok(())
    }
}
