//! Normalized entries, addressing keys and resource vocabulary.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use mybot_api_models::{FoodList, ImageFolder, TodoCategory};
use serde::Serialize;

/// Resource kinds owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Scheduled reminders.
    Reminders,
    /// Categorized todo items.
    Todos,
    /// Countdown events.
    Countdowns,
    /// Food-suggestion lists.
    Food,
    /// Stored image assets.
    Images,
    /// Read-only usage and host statistics.
    Telemetry,
}

impl ResourceKind {
    /// Short label used in notices and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reminders => "reminders",
            Self::Todos => "todos",
            Self::Countdowns => "countdowns",
            Self::Food => "food",
            Self::Images => "images",
            Self::Telemetry => "telemetry",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One flattened entry: the key that addresses it, its owner, and its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry<K, P> {
    /// Exact key the gateway needs to mutate or delete this entry.
    pub key: K,
    /// Owner id (user id, list name or folder name).
    pub owner: String,
    /// Validated entry content.
    pub payload: P,
}

/// Key for a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReminderKey {
    /// Owning user id.
    pub owner: String,
    /// Scheduler job id assigned by the backend.
    pub job_id: String,
}

/// Key for a todo item. The index is positional and only valid for the
/// snapshot it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TodoKey {
    /// Owning user id.
    pub owner: String,
    /// Bucket within the owner's list.
    pub category: TodoCategory,
    /// Position within the bucket at fetch time.
    pub index: usize,
}

/// Key for a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CountdownKey {
    /// Owning user id.
    pub owner: String,
    /// Event name, unique per owner.
    pub event_name: String,
}

/// Key for a food entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FoodKey {
    /// List holding the food.
    pub list: FoodList,
    /// Food text, unique within the list.
    pub food: String,
}

/// Key for an image asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageKey {
    /// Folder holding the file.
    pub folder: ImageFolder,
    /// File name, unique within the folder.
    pub filename: String,
}

/// Reminder content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    /// Announced text.
    pub event: String,
    /// Hour of day.
    pub hour: u8,
    /// Minute of hour.
    pub minute: u8,
    /// Delivery session.
    pub session_id: String,
    /// Delivered into a group chat.
    pub is_group: bool,
    /// Fires daily.
    pub is_daily: bool,
    /// Mentions everyone.
    pub mention_all: bool,
    /// Fires every N days.
    pub interval_days: Option<u32>,
    /// Fires on these weekdays (0 = Monday).
    pub weekdays: Option<Vec<u8>>,
    /// One-shot date, when set.
    pub date: Option<String>,
}

/// How a reminder repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderSchedule {
    /// Every day.
    Daily,
    /// Every N days.
    EveryDays(u32),
    /// On a fixed set of weekdays.
    Weekdays(Vec<u8>),
    /// Once, optionally on a given date.
    Once(Option<String>),
}

impl Reminder {
    /// Repeat rule; daily beats interval beats weekdays beats one-shot.
    #[must_use]
    pub fn schedule(&self) -> ReminderSchedule {
        if self.is_daily {
            ReminderSchedule::Daily
        } else if let Some(days) = self.interval_days {
            ReminderSchedule::EveryDays(days)
        } else if let Some(weekdays) = &self.weekdays {
            ReminderSchedule::Weekdays(weekdays.clone())
        } else {
            ReminderSchedule::Once(self.date.clone())
        }
    }

    /// `HH:MM` firing time.
    #[must_use]
    pub fn time_of_day(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl Display for ReminderSchedule {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        match self {
            Self::Daily => formatter.write_str("daily"),
            Self::EveryDays(days) => write!(formatter, "every {days} days"),
            Self::Weekdays(days) => {
                let names: Vec<&str> = days
                    .iter()
                    .filter_map(|day| NAMES.get(usize::from(*day)).copied())
                    .collect();
                write!(formatter, "weekly {}", names.join(","))
            }
            Self::Once(Some(date)) => write!(formatter, "once {date}"),
            Self::Once(None) => formatter.write_str("once"),
        }
    }
}

/// Todo content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Todo {
    /// Task text.
    pub task: String,
    /// Completed flag.
    pub done: bool,
}

/// Countdown content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    /// Target instant.
    pub target: DateTime<FixedOffset>,
    /// Creation instant, when recorded.
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Image content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time in server-local time.
    pub modified: Option<NaiveDateTime>,
    /// Retrieval path relative to the API origin.
    pub locator: String,
}

/// Flattened reminder.
pub type ReminderEntry = Entry<ReminderKey, Reminder>;
/// Flattened todo.
pub type TodoEntry = Entry<TodoKey, Todo>;
/// Flattened countdown.
pub type CountdownEntry = Entry<CountdownKey, Countdown>;
/// Flattened food entry; the owner is the list name and the payload the food text.
pub type FoodEntry = Entry<FoodKey, String>;
/// Flattened image; the owner is the folder name.
pub type ImageEntry = Entry<ImageKey, ImageAsset>;

/// A malformed backend entry that was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityWarning {
    /// Resource being normalized.
    pub kind: ResourceKind,
    /// Owner whose collection held the entry.
    pub owner: String,
    /// What was wrong with it.
    pub detail: String,
}

impl Display for IntegrityWarning {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} entry for '{}' dropped: {}",
            self.kind, self.owner, self.detail
        )
    }
}

/// Result of normalizing one backend snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized<E> {
    /// Entries in source order.
    pub entries: Vec<E>,
    /// Entries that were dropped.
    pub warnings: Vec<IntegrityWarning>,
}

impl<E> Default for Normalized<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> Reminder {
        Reminder {
            event: "water plants".into(),
            hour: 7,
            minute: 5,
            session_id: "1001".into(),
            is_group: false,
            is_daily: false,
            mention_all: false,
            interval_days: None,
            weekdays: None,
            date: None,
        }
    }

    #[test]
    fn schedule_precedence_is_daily_interval_weekdays_once() {
        let mut item = reminder();
        item.is_daily = true;
        item.interval_days = Some(3);
        item.weekdays = Some(vec![0, 2]);
        assert_eq!(item.schedule(), ReminderSchedule::Daily);

        item.is_daily = false;
        assert_eq!(item.schedule(), ReminderSchedule::EveryDays(3));

        item.interval_days = None;
        assert_eq!(item.schedule(), ReminderSchedule::Weekdays(vec![0, 2]));
        assert_eq!(item.schedule().to_string(), "weekly Mon,Wed");

        item.weekdays = None;
        item.date = Some("2025-03-01".into());
        assert_eq!(item.schedule().to_string(), "once 2025-03-01");
    }

    #[test]
    fn time_of_day_is_zero_padded() {
        assert_eq!(reminder().time_of_day(), "07:05");
    }
}
