//! Derived counts and dense usage tables computed from normalized snapshots.
//!
//! Every function recomputes from scratch; nothing here patches a previous
//! result.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use mybot_api_models::{
    DailyStatsResponse, FoodList, HourlyStatsResponse, ImageFolder, SystemStatus, TodoCategory,
    UsageOverview, WeekdayStatsResponse,
};
use serde::Serialize;

use crate::model::{CountdownEntry, CountdownKey, FoodEntry, ImageEntry, ReminderEntry, TodoEntry};
use crate::schedule::format_time_left;

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// All reminders, regardless of schedule.
    pub reminders: usize,
    /// Todos not yet done, across both categories.
    pub open_todos: usize,
    /// All countdowns, expired ones included.
    pub countdowns: usize,
    /// Messages sent during the last seven days.
    pub weekly_messages: u64,
}

/// Build the dashboard stat set from one consistent set of snapshots.
#[must_use]
pub fn dashboard_stats(
    reminders: &[ReminderEntry],
    todos: &[TodoEntry],
    countdowns: &[CountdownEntry],
    overview: &UsageOverview,
) -> DashboardStats {
    DashboardStats {
        reminders: reminders.len(),
        open_todos: open_todo_counts(todos).total(),
        countdowns: countdowns.len(),
        weekly_messages: overview.recent_7days,
    }
}

/// Undone todo counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoCounts {
    /// Open work items.
    pub work: usize,
    /// Open play items.
    pub play: usize,
}

impl TodoCounts {
    /// Open items in one category.
    #[must_use]
    pub const fn get(&self, category: TodoCategory) -> usize {
        match category {
            TodoCategory::Work => self.work,
            TodoCategory::Play => self.play,
        }
    }

    /// Open items across categories.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.work + self.play
    }
}

/// Count entries with `done == false`, per category.
#[must_use]
pub fn open_todo_counts(todos: &[TodoEntry]) -> TodoCounts {
    todos
        .iter()
        .filter(|entry| !entry.payload.done)
        .fold(TodoCounts::default(), |mut counts, entry| {
            match entry.key.category {
                TodoCategory::Work => counts.work += 1,
                TodoCategory::Play => counts.play += 1,
            }
            counts
        })
}

/// Number of foods on each list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoodCounts {
    /// Size of the android list.
    pub android: usize,
    /// Size of the apple list.
    pub apple: usize,
}

/// Count foods per list.
#[must_use]
pub fn food_counts(entries: &[FoodEntry]) -> FoodCounts {
    entries
        .iter()
        .fold(FoodCounts::default(), |mut counts, entry| {
            match entry.key.list {
                FoodList::Android => counts.android += 1,
                FoodList::Apple => counts.apple += 1,
            }
            counts
        })
}

/// File count and total size of one image folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FolderTotals {
    /// Folder summarised.
    pub folder: ImageFolder,
    /// Number of files.
    pub files: usize,
    /// Sum of file sizes in bytes.
    pub bytes: u64,
}

/// Per-folder totals for every known folder, empty folders included.
#[must_use]
pub fn folder_totals(entries: &[ImageEntry]) -> Vec<FolderTotals> {
    ImageFolder::ALL
        .iter()
        .map(|folder| {
            let (files, bytes) = entries
                .iter()
                .filter(|entry| entry.key.folder == *folder)
                .fold((0_usize, 0_u64), |(files, bytes), entry| {
                    (files + 1, bytes.saturating_add(entry.payload.size))
                });
            FolderTotals {
                folder: *folder,
                files,
                bytes,
            }
        })
        .collect()
}

/// Time-left line for one countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownLine {
    /// Key of the countdown.
    pub key: CountdownKey,
    /// Target instant in its original offset, RFC 3339.
    pub target: String,
    /// Output of [`format_time_left`] at render time.
    pub time_left: String,
    /// Whether the target has passed.
    pub expired: bool,
}

/// Render time-left lines for fetched countdowns at `now`.
#[must_use]
pub fn countdown_lines(entries: &[CountdownEntry], now: DateTime<Utc>) -> Vec<CountdownLine> {
    entries
        .iter()
        .map(|entry| {
            let target = entry.payload.target.with_timezone(&Utc);
            CountdownLine {
                key: entry.key.clone(),
                target: entry.payload.target.to_rfc3339(),
                time_left: format_time_left(target, now),
                expired: target <= now,
            }
        })
        .collect()
}

/// Weekday names in canonical order, as the usage endpoint spells them.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Message counts broken down three ways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageBreakdown {
    /// Count per hour of day, index = hour.
    pub hourly: [u64; 24],
    /// Count per weekday, Monday first.
    pub weekday: [(Weekday, u64); 7],
    /// Count per calendar day, ascending, gaps filled with zero.
    pub daily: Vec<(NaiveDate, u64)>,
}

/// Build all three dense tables from the histogram responses.
#[must_use]
pub fn usage_breakdown(
    hourly: &HourlyStatsResponse,
    weekday: &WeekdayStatsResponse,
    daily: &DailyStatsResponse,
) -> UsageBreakdown {
    UsageBreakdown {
        hourly: hourly_series(hourly),
        weekday: weekday_series(weekday),
        daily: daily_series(daily),
    }
}

/// 24 buckets; hours the server left out count as zero.
#[must_use]
pub fn hourly_series(response: &HourlyStatsResponse) -> [u64; 24] {
    let mut series = [0_u64; 24];
    for (hour, count) in &response.hourly_stats {
        if let Ok(hour) = hour.trim().parse::<usize>()
            && let Some(slot) = series.get_mut(hour)
        {
            *slot += count;
        }
    }
    series
}

/// Seven buckets in canonical order; unknown names are ignored.
#[must_use]
pub fn weekday_series(response: &WeekdayStatsResponse) -> [(Weekday, u64); 7] {
    let mut day = Weekday::Mon;
    let mut series = [(Weekday::Mon, 0_u64); 7];
    for (slot, name) in series.iter_mut().zip(WEEKDAY_NAMES) {
        *slot = (day, response.weekday_stats.get(name).copied().unwrap_or(0));
        day = day.succ();
    }
    series
}

/// Every date between the earliest and latest reported day, ascending.
#[must_use]
pub fn daily_series(response: &DailyStatsResponse) -> Vec<(NaiveDate, u64)> {
    let mut reported: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for (date, count) in &response.daily_stats {
        if let Ok(date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
            *reported.entry(date).or_default() += *count;
        }
    }
    let (Some((&first, _)), Some((&last, _))) =
        (reported.first_key_value(), reported.last_key_value())
    else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut day = first;
    while day <= last {
        series.push((day, reported.get(&day).copied().unwrap_or(0)));
        day += Duration::days(1);
    }
    series
}

/// One utilisation gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    /// Percentage clamped to [0, 100].
    pub percent: f64,
    /// One-decimal label, e.g. `42.5%`.
    pub label: String,
}

impl Gauge {
    fn from_percent(raw: f64) -> Self {
        let percent = if raw.is_finite() {
            raw.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            percent,
            label: format!("{percent:.1}%"),
        }
    }
}

/// Host resource gauges derived from `/api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostUsage {
    /// CPU utilisation.
    pub cpu: Gauge,
    /// Memory utilisation.
    pub memory: Gauge,
    /// Disk utilisation.
    pub disk: Gauge,
}

/// Convert a status sample into gauges.
#[must_use]
pub fn host_usage(status: &SystemStatus) -> HostUsage {
    HostUsage {
        cpu: Gauge::from_percent(status.cpu_percent),
        memory: Gauge::from_percent(status.memory_percent),
        disk: Gauge::from_percent(status.disk_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Countdown, Entry, Todo, TodoKey};
    use chrono::{FixedOffset, TimeZone};

    fn todo(owner: &str, category: TodoCategory, index: usize, done: bool) -> TodoEntry {
        Entry {
            key: TodoKey {
                owner: owner.into(),
                category,
                index,
            },
            owner: owner.into(),
            payload: Todo {
                task: format!("task {index}"),
                done,
            },
        }
    }

    #[test]
    fn open_counts_exclude_done_entries() {
        let mut todos = vec![
            todo("1", TodoCategory::Work, 0, false),
            todo("1", TodoCategory::Work, 1, true),
            todo("1", TodoCategory::Play, 0, false),
            todo("2", TodoCategory::Play, 0, false),
        ];
        let before = open_todo_counts(&todos);
        assert_eq!(before, TodoCounts { work: 1, play: 2 });

        todos[1].payload.done = false;
        let after = open_todo_counts(&todos);
        assert_eq!(after.get(TodoCategory::Work), before.work + 1);
        assert_eq!(after.get(TodoCategory::Play), before.play);

        todos[2].payload.done = true;
        assert_eq!(open_todo_counts(&todos).play, before.play - 1);
    }

    #[test]
    fn dashboard_counts_expired_countdowns_and_passes_weekly_through() {
        let past = FixedOffset::east_opt(0)
            .and_then(|tz| tz.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single())
            .expect("valid instant");
        let countdowns = vec![Entry {
            key: CountdownKey {
                owner: "1".into(),
                event_name: "y2k".into(),
            },
            owner: "1".into(),
            payload: Countdown {
                target: past,
                created_at: None,
            },
        }];
        let todos = vec![todo("1", TodoCategory::Work, 0, true)];
        let overview = UsageOverview {
            total_calls: 90,
            recent_7days: 17,
            total_records: 90,
        };

        let stats = dashboard_stats(&[], &todos, &countdowns, &overview);
        assert_eq!(
            stats,
            DashboardStats {
                reminders: 0,
                open_todos: 0,
                countdowns: 1,
                weekly_messages: 17,
            }
        );

        let lines = countdown_lines(&countdowns, Utc::now());
        assert_eq!(lines[0].time_left, "expired");
        assert!(lines[0].expired);
    }

    #[test]
    fn hourly_series_is_dense() {
        let response = HourlyStatsResponse {
            hourly_stats: BTreeMap::from([("3".into(), 5), ("23".into(), 1), ("24".into(), 9)]),
        };
        let series = hourly_series(&response);
        assert_eq!(series.len(), 24);
        assert_eq!(series[3], 5);
        assert_eq!(series[23], 1);
        assert_eq!(series.iter().sum::<u64>(), 6);
    }

    #[test]
    fn weekday_series_fills_missing_days_in_canonical_order() {
        let response = WeekdayStatsResponse {
            weekday_stats: BTreeMap::from([("Sunday".into(), 4), ("Tuesday".into(), 2)]),
        };
        let series = weekday_series(&response);
        assert_eq!(series[0], (Weekday::Mon, 0));
        assert_eq!(series[1], (Weekday::Tue, 2));
        assert_eq!(series[6], (Weekday::Sun, 4));
    }

    #[test]
    fn daily_series_fills_gaps_between_reported_dates() {
        let response = DailyStatsResponse {
            daily_stats: BTreeMap::from([
                ("2025-02-27".into(), 3),
                ("2025-03-02".into(), 1),
                ("garbage".into(), 8),
            ]),
        };
        let series = daily_series(&response);
        let counts: Vec<u64> = series.iter().map(|(_, count)| *count).collect();
        assert_eq!(counts, vec![3, 0, 0, 1]);
        assert_eq!(
            series[1].0,
            NaiveDate::from_ymd_opt(2025, 2, 28).expect("date")
        );
        assert!(daily_series(&DailyStatsResponse::default()).is_empty());
    }

    #[test]
    fn daily_series_spans_a_distant_outlier_once_per_day() {
        let response = DailyStatsResponse {
            daily_stats: BTreeMap::from([
                ("1900-01-01".into(), 1),
                ("2025-03-01".into(), 2),
                (" 2025-03-01".into(), 3),
            ]),
        };
        let series = daily_series(&response);
        let first = NaiveDate::from_ymd_opt(1900, 1, 1).expect("date");
        let last = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let span = usize::try_from((last - first).num_days()).expect("span") + 1;
        assert_eq!(series.len(), span);
        assert_eq!(series.first(), Some(&(first, 1)));
        assert_eq!(series.last(), Some(&(last, 5)));
        assert_eq!(series.iter().map(|(_, count)| *count).sum::<u64>(), 6);
    }

    #[test]
    fn gauges_clamp_and_label() {
        let usage = host_usage(&SystemStatus {
            cpu_percent: 12.345,
            memory_percent: 140.0,
            disk_percent: f64::NAN,
            ..SystemStatus::default()
        });
        assert_eq!(usage.cpu.label, "12.3%");
        assert!((usage.memory.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(usage.disk.label, "0.0%");
    }
}
