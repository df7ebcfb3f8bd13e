#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Wire DTOs for the MyBot management API.
//!
//! The per-owner listings for reminders, todos and countdowns are duck-typed
//! on the server side, so they are decoded as raw JSON maps and validated by
//! the admin engine's normalizer. Everything with a fixed shape (request
//! bodies, food lists, image listings, usage statistics, host status) is
//! modelled here so the CLI and its tests share one contract.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw nested listing keyed first by owner id, in the order the server sent it.
pub type OwnerMap = serde_json::Map<String, Value>;

/// Error body returned by the API on non-success responses (`{"detail": ...}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Either a human-readable string or a list of field validation errors.
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Flatten the `detail` payload into a single message when one is present.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        }
    }
}

/// Acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    /// Server-side confirmation text.
    #[serde(default)]
    pub message: String,
}

/// Error raised when a path segment does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// Vocabulary being parsed (`category`, `list`, `folder`).
    pub kind: &'static str,
    /// Offending input.
    pub value: String,
}

impl Display for UnknownVariant {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Todo bucket within an owner's list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TodoCategory {
    /// Work items.
    Work,
    /// Leisure items.
    Play,
}

impl TodoCategory {
    /// Every category in display order.
    pub const ALL: [Self; 2] = [Self::Work, Self::Play];

    /// Path segment used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Play => "play",
        }
    }
}

impl FromStr for TodoCategory {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "work" => Ok(Self::Work),
            "play" => Ok(Self::Play),
            other => Err(UnknownVariant {
                kind: "todo category",
                value: other.to_string(),
            }),
        }
    }
}

/// Named food-suggestion list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FoodList {
    /// The "android" list.
    Android,
    /// The "apple" list.
    Apple,
}

impl FoodList {
    /// Every list in display order.
    pub const ALL: [Self; 2] = [Self::Android, Self::Apple];

    /// Path segment used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Apple => "apple",
        }
    }
}

impl FromStr for FoodList {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "android" => Ok(Self::Android),
            "apple" => Ok(Self::Apple),
            other => Err(UnknownVariant {
                kind: "food list",
                value: other.to_string(),
            }),
        }
    }
}

/// Image folder managed by the bot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ImageFolder {
    /// Random pictures.
    Pics,
    /// Pictures attached to food suggestions.
    FoodImages,
    /// Rendered LaTeX output.
    Latex,
}

impl ImageFolder {
    /// Every folder in display order.
    pub const ALL: [Self; 3] = [Self::Pics, Self::FoodImages, Self::Latex];

    /// Path segment used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pics => "pics",
            Self::FoodImages => "food_images",
            Self::Latex => "latex",
        }
    }
}

impl FromStr for ImageFolder {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pics" => Ok(Self::Pics),
            "food_images" => Ok(Self::FoodImages),
            "latex" => Ok(Self::Latex),
            other => Err(UnknownVariant {
                kind: "image folder",
                value: other.to_string(),
            }),
        }
    }
}

/// Body for `POST /api/reminders/{owner}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderCreateRequest {
    /// Text announced when the reminder fires.
    pub event: String,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Minute of hour, 0-59.
    pub minute: u8,
    /// Fire every day.
    #[serde(default)]
    pub is_daily: bool,
    /// Fire every N days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    /// One-shot date (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Weekdays to fire on (0 = Monday).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<Vec<u8>>,
    /// Chat session the reminder is delivered to.
    pub session_id: String,
    /// Whether the session is a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// Mention everyone in the group.
    #[serde(default)]
    pub mention_all: bool,
}

/// Body for `POST /api/todos/{owner}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoCreateRequest {
    /// Task text.
    pub task: String,
    /// Bucket the task lands in.
    pub category: TodoCategory,
}

/// Body for `POST /api/countdowns/{owner}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountdownCreateRequest {
    /// Event name, unique per owner.
    pub event_name: String,
    /// Target instant as an ISO-8601 string.
    pub time: String,
}

/// Response of `GET /api/eat`.
///
/// Items stay raw so one malformed element does not fail the whole listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoodCatalogResponse {
    /// Foods on the android list.
    #[serde(default)]
    pub android: Vec<Value>,
    /// Foods on the apple list.
    #[serde(default)]
    pub apple: Vec<Value>,
}

impl FoodCatalogResponse {
    /// Foods on the given list.
    #[must_use]
    pub fn foods(&self, list: FoodList) -> &[Value] {
        match list {
            FoodList::Android => &self.android,
            FoodList::Apple => &self.apple,
        }
    }
}

/// Response of `GET /api/eat/{list}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoodListResponse {
    /// List that was queried.
    pub list_name: FoodList,
    /// Foods on that list, in stored order, undecoded.
    #[serde(default)]
    pub foods: Vec<Value>,
}

/// One image file as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageFileView {
    /// File name within the folder.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time (ISO-8601, no offset).
    pub modified: String,
    /// Retrieval path relative to the API origin.
    pub url: String,
}

/// Response of `GET /api/images/{folder}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderImagesResponse {
    /// Folder that was queried.
    pub folder: ImageFolder,
    /// Files in the folder, undecoded; see [`ImageFileView`].
    #[serde(default)]
    pub images: Vec<Value>,
}

/// Response of `POST /api/images/{folder}/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Server-side confirmation text.
    #[serde(default)]
    pub message: String,
    /// Stored file; the server may rename it to avoid collisions.
    pub file: ImageFileView,
}

/// Response of `GET /api/usage/overview`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageOverview {
    /// Messages recorded since the bot started tracking.
    #[serde(default)]
    pub total_calls: u64,
    /// Messages recorded during the last seven days.
    #[serde(default)]
    pub recent_7days: u64,
    /// Raw record count.
    #[serde(default)]
    pub total_records: u64,
}

/// Response of `GET /api/usage/hourly`; keys are hour numbers as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourlyStatsResponse {
    /// Message count per hour of day.
    #[serde(default)]
    pub hourly_stats: BTreeMap<String, u64>,
}

/// Response of `GET /api/usage/weekday`; keys are English weekday names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekdayStatsResponse {
    /// Message count per weekday.
    #[serde(default)]
    pub weekday_stats: BTreeMap<String, u64>,
}

/// Response of `GET /api/usage/daily`; keys are `YYYY-MM-DD` dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyStatsResponse {
    /// Message count per calendar day (the server keeps the latest 30).
    #[serde(default)]
    pub daily_stats: BTreeMap<String, u64>,
}

/// Response of `GET /api/status`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemStatus {
    /// CPU utilisation percentage.
    pub cpu_percent: f64,
    /// Memory utilisation percentage.
    pub memory_percent: f64,
    /// Memory in use (GiB).
    #[serde(default)]
    pub memory_used_gb: f64,
    /// Installed memory (GiB).
    #[serde(default)]
    pub memory_total_gb: f64,
    /// Root filesystem utilisation percentage.
    pub disk_percent: f64,
    /// Disk space in use (GiB).
    #[serde(default)]
    pub disk_used_gb: f64,
    /// Disk capacity (GiB).
    #[serde(default)]
    pub disk_total_gb: f64,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// `healthy` when the API is serving.
    #[serde(default)]
    pub status: String,
    /// Server clock at the time of the probe.
    #[serde(default)]
    pub timestamp: String,
}
