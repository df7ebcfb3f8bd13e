//! Flattening of nested per-owner backend listings into addressable entries.
//!
//! # Design
//! - Pure functions over decoded JSON; the same snapshot always yields the
//!   same entries in the same order.
//! - Source order is preserved (owner maps are decoded order-preserving).
//! - A malformed entry is dropped and reported as an [`IntegrityWarning`];
//!   the rest of the snapshot survives.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use mybot_api_models::{
    FoodCatalogResponse, FoodList, FoodListResponse, ImageFileView, ImageFolder, OwnerMap,
    TodoCategory,
};
use serde_json::{Map, Value};

use crate::model::{
    Countdown, CountdownEntry, CountdownKey, Entry, FoodEntry, FoodKey, ImageAsset, ImageEntry,
    ImageKey, IntegrityWarning, Normalized, Reminder, ReminderEntry, ReminderKey, ResourceKind,
    Todo, TodoEntry, TodoKey,
};

/// Offset applied to timestamps stored without one (the bot runs on
/// Asia/Shanghai time).
pub const NAIVE_TIMESTAMP_OFFSET_SECS: i32 = 8 * 3600;

type FieldResult<T> = Result<T, String>;

struct Collector<E> {
    kind: ResourceKind,
    out: Normalized<E>,
}

impl<E> Collector<E> {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            out: Normalized::default(),
        }
    }

    fn accept(&mut self, owner: &str, entry: FieldResult<E>) {
        match entry {
            Ok(entry) => self.out.entries.push(entry),
            Err(detail) => self.warn(owner, detail),
        }
    }

    fn warn(&mut self, owner: &str, detail: impl Into<String>) {
        self.out.warnings.push(IntegrityWarning {
            kind: self.kind,
            owner: owner.to_string(),
            detail: detail.into(),
        });
    }

    fn finish(self) -> Normalized<E> {
        self.out
    }
}

/// Flatten `GET /api/reminders` (owner → list of reminders).
#[must_use]
pub fn reminders(listing: &OwnerMap) -> Normalized<ReminderEntry> {
    let mut collector = Collector::new(ResourceKind::Reminders);
    for (owner, items) in listing {
        collect_owner_reminders(&mut collector, owner, items);
    }
    collector.finish()
}

/// Flatten `GET /api/reminders/{owner}` (a bare list).
#[must_use]
pub fn owner_reminders(owner: &str, items: &Value) -> Normalized<ReminderEntry> {
    let mut collector = Collector::new(ResourceKind::Reminders);
    collect_owner_reminders(&mut collector, owner, items);
    collector.finish()
}

fn collect_owner_reminders(collector: &mut Collector<ReminderEntry>, owner: &str, items: &Value) {
    let Some(items) = items.as_array() else {
        collector.warn(owner, "reminder collection is not a list");
        return;
    };
    for item in items {
        collector.accept(owner, reminder_entry(owner, item));
    }
}

fn reminder_entry(owner: &str, item: &Value) -> FieldResult<ReminderEntry> {
    let fields = as_object(item, "reminder")?;
    let job_id = required_text(fields, "job_id")?;
    let reminder = Reminder {
        event: required_text(fields, "event")?,
        hour: bounded_u8(fields, "hour", 23)?,
        minute: bounded_u8(fields, "minute", 59)?,
        session_id: required_text(fields, "session_id")?,
        is_group: optional_bool(fields, "is_group")?,
        is_daily: optional_bool(fields, "is_daily")?,
        mention_all: optional_bool(fields, "mention_all")?,
        interval_days: optional_u32(fields, "interval_days")?,
        weekdays: optional_weekdays(fields)?,
        date: optional_text(fields, "date")?,
    };
    Ok(Entry {
        key: ReminderKey {
            owner: owner.to_string(),
            job_id,
        },
        owner: owner.to_string(),
        payload: reminder,
    })
}

/// Flatten `GET /api/todos` (owner → {work: [...], play: [...]}).
#[must_use]
pub fn todos(listing: &OwnerMap) -> Normalized<TodoEntry> {
    let mut collector = Collector::new(ResourceKind::Todos);
    for (owner, buckets) in listing {
        collect_owner_todos(&mut collector, owner, buckets);
    }
    collector.finish()
}

/// Flatten `GET /api/todos/{owner}` (`{work: [...], play: [...]}`).
#[must_use]
pub fn owner_todos(owner: &str, buckets: &Value) -> Normalized<TodoEntry> {
    let mut collector = Collector::new(ResourceKind::Todos);
    collect_owner_todos(&mut collector, owner, buckets);
    collector.finish()
}

fn collect_owner_todos(collector: &mut Collector<TodoEntry>, owner: &str, buckets: &Value) {
    let Some(buckets) = buckets.as_object() else {
        collector.warn(owner, "todo collection is not split into work/play");
        return;
    };
    for (name, items) in buckets {
        let Ok(category) = name.parse::<TodoCategory>() else {
            collector.warn(owner, format!("unknown todo category '{name}'"));
            continue;
        };
        let Some(items) = items.as_array() else {
            collector.warn(owner, format!("todo bucket '{name}' is not a list"));
            continue;
        };
        // The index is the raw position in the bucket, counted before any
        // malformed siblings are dropped, so it stays a valid backend address.
        for (index, item) in items.iter().enumerate() {
            collector.accept(owner, todo_entry(owner, category, index, item));
        }
    }
}

fn todo_entry(
    owner: &str,
    category: TodoCategory,
    index: usize,
    item: &Value,
) -> FieldResult<TodoEntry> {
    let fields = as_object(item, "todo")?;
    Ok(Entry {
        key: TodoKey {
            owner: owner.to_string(),
            category,
            index,
        },
        owner: owner.to_string(),
        payload: Todo {
            task: required_text(fields, "task")?,
            done: optional_bool(fields, "done")?,
        },
    })
}

/// Flatten `GET /api/countdowns` (owner → {event name → {time, created_at}}).
#[must_use]
pub fn countdowns(listing: &OwnerMap) -> Normalized<CountdownEntry> {
    let mut collector = Collector::new(ResourceKind::Countdowns);
    for (owner, events) in listing {
        collect_owner_countdowns(&mut collector, owner, events);
    }
    collector.finish()
}

/// Flatten `GET /api/countdowns/{owner}` (`{event name → {...}}`).
#[must_use]
pub fn owner_countdowns(owner: &str, events: &Value) -> Normalized<CountdownEntry> {
    let mut collector = Collector::new(ResourceKind::Countdowns);
    collect_owner_countdowns(&mut collector, owner, events);
    collector.finish()
}

fn collect_owner_countdowns(
    collector: &mut Collector<CountdownEntry>,
    owner: &str,
    events: &Value,
) {
    let Some(events) = events.as_object() else {
        collector.warn(owner, "countdown collection is not keyed by event name");
        return;
    };
    for (event_name, item) in events {
        collector.accept(owner, countdown_entry(owner, event_name, item));
    }
}

fn countdown_entry(owner: &str, event_name: &str, item: &Value) -> FieldResult<CountdownEntry> {
    if event_name.trim().is_empty() {
        return Err("countdown has an empty event name".to_string());
    }
    let fields = as_object(item, "countdown")?;
    let raw_target = required_text(fields, "time")?;
    let target = parse_instant(&raw_target)
        .ok_or_else(|| format!("countdown '{event_name}' has an unreadable time '{raw_target}'"))?;
    let created_at = optional_text(fields, "created_at")?
        .as_deref()
        .and_then(parse_instant);
    Ok(Entry {
        key: CountdownKey {
            owner: owner.to_string(),
            event_name: event_name.to_string(),
        },
        owner: owner.to_string(),
        payload: Countdown { target, created_at },
    })
}

/// Flatten `GET /api/eat`; the list name is the owner.
#[must_use]
pub fn food(catalog: &FoodCatalogResponse) -> Normalized<FoodEntry> {
    let mut collector = Collector::new(ResourceKind::Food);
    for list in FoodList::ALL {
        collect_food(&mut collector, list, catalog.foods(list));
    }
    collector.finish()
}

/// Flatten `GET /api/eat/{list}`.
#[must_use]
pub fn food_list(listing: &FoodListResponse) -> Normalized<FoodEntry> {
    let mut collector = Collector::new(ResourceKind::Food);
    collect_food(&mut collector, listing.list_name, &listing.foods);
    collector.finish()
}

fn collect_food(collector: &mut Collector<FoodEntry>, list: FoodList, foods: &[Value]) {
    for food in foods {
        let entry = match food {
            Value::String(text) if !text.trim().is_empty() => Ok(Entry {
                key: FoodKey {
                    list,
                    food: text.clone(),
                },
                owner: list.as_str().to_string(),
                payload: text.clone(),
            }),
            Value::String(_) => Err("food entry is empty".to_string()),
            _ => Err("food entry is not text".to_string()),
        };
        collector.accept(list.as_str(), entry);
    }
}

/// Flatten one folder listing.
#[must_use]
pub fn images(folder: ImageFolder, files: &[Value]) -> Normalized<ImageEntry> {
    let mut collector = Collector::new(ResourceKind::Images);
    for file in files {
        collector.accept(folder.as_str(), decode_image(folder, file));
    }
    collector.finish()
}

/// Flatten `GET /api/images` (folder → list of files, or `{error}` when the
/// server could not read a folder).
#[must_use]
pub fn image_catalog(listing: &OwnerMap) -> Normalized<ImageEntry> {
    let mut collector = Collector::new(ResourceKind::Images);
    for (name, files) in listing {
        let Ok(folder) = name.parse::<ImageFolder>() else {
            collector.warn(name, format!("unknown image folder '{name}'"));
            continue;
        };
        if let Some(error) = files.get("error").and_then(Value::as_str) {
            collector.warn(name, format!("server could not list folder: {error}"));
            continue;
        }
        let Some(files) = files.as_array() else {
            collector.warn(name, "image listing is not a list");
            continue;
        };
        for file in files {
            collector.accept(name, decode_image(folder, file));
        }
    }
    collector.finish()
}

fn decode_image(folder: ImageFolder, file: &Value) -> FieldResult<ImageEntry> {
    let view = serde_json::from_value::<ImageFileView>(file.clone())
        .map_err(|err| format!("malformed image record: {err}"))?;
    image_entry(folder, &view)
}

fn image_entry(folder: ImageFolder, file: &ImageFileView) -> FieldResult<ImageEntry> {
    if file.name.trim().is_empty() {
        return Err("image has an empty file name".to_string());
    }
    Ok(Entry {
        key: ImageKey {
            folder,
            filename: file.name.clone(),
        },
        owner: folder.as_str().to_string(),
        payload: ImageAsset {
            size: file.size,
            modified: parse_naive(&file.modified),
            locator: file.url.clone(),
        },
    })
}

/// Parse an ISO-8601 instant, assuming UTC+08:00 when no offset is present.
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant);
    }
    let naive = parse_naive(raw)?;
    FixedOffset::east_opt(NAIVE_TIMESTAMP_OFFSET_SECS)?
        .from_local_datetime(&naive)
        .single()
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
}

fn as_object<'a>(item: &'a Value, what: &str) -> FieldResult<&'a Map<String, Value>> {
    item.as_object()
        .ok_or_else(|| format!("{what} record is not an object"))
}

fn required_text(fields: &Map<String, Value>, name: &str) -> FieldResult<String> {
    match fields.get(name) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::String(_)) => Err(format!("field '{name}' is empty")),
        Some(_) => Err(format!("field '{name}' is not text")),
        None => Err(format!("missing field '{name}'")),
    }
}

fn optional_text(fields: &Map<String, Value>, name: &str) -> FieldResult<Option<String>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(format!("field '{name}' is not text")),
    }
}

fn optional_bool(fields: &Map<String, Value>, name: &str) -> FieldResult<bool> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(format!("field '{name}' is not a boolean")),
    }
}

fn bounded_u8(fields: &Map<String, Value>, name: &str, max: u8) -> FieldResult<u8> {
    let value = fields
        .get(name)
        .ok_or_else(|| format!("missing field '{name}'"))?
        .as_u64()
        .ok_or_else(|| format!("field '{name}' is not a non-negative integer"))?;
    u8::try_from(value)
        .ok()
        .filter(|value| *value <= max)
        .ok_or_else(|| format!("field '{name}' is out of range (0-{max})"))
}

/// Zero or negative counts mean "no interval".
fn optional_u32(fields: &Map<String, Value>, name: &str) -> FieldResult<Option<u32>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let count = value
                .as_i64()
                .ok_or_else(|| format!("field '{name}' is not an integer"))?;
            Ok(u32::try_from(count).ok().filter(|count| *count > 0))
        }
    }
}

/// Days outside 0-6 are skipped; an empty result means no weekday rule.
fn optional_weekdays(fields: &Map<String, Value>) -> FieldResult<Option<Vec<u8>>> {
    let Some(value) = fields.get("weekdays").filter(|value| !value.is_null()) else {
        return Ok(None);
    };
    let days = value
        .as_array()
        .ok_or_else(|| "field 'weekdays' is not a list".to_string())?;
    let days: Vec<u8> = days
        .iter()
        .filter_map(|day| day.as_u64().and_then(|day| u8::try_from(day).ok()))
        .filter(|day| *day <= 6)
        .collect();
    Ok(Some(days).filter(|days| !days.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReminderSchedule;
    use serde_json::json;

    fn owner_map(value: Value) -> OwnerMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn reminder_json(job: &str, event: &str) -> Value {
        json!({
            "event": event,
            "hour": 8,
            "minute": 0,
            "job_id": job,
            "is_daily": true,
            "session_id": "5550",
            "is_group": false
        })
    }

    #[test]
    fn reminders_flatten_every_owner_entry_with_unique_keys() {
        let mut listing = Map::new();
        for owner in ["300", "100", "200"] {
            let items: Vec<Value> = (0..4)
                .map(|n| reminder_json(&format!("reminder_{owner}_{n}"), "same text"))
                .collect();
            listing.insert(owner.to_string(), Value::Array(items));
        }

        let flat = reminders(&listing);
        assert_eq!(flat.entries.len(), 12);
        assert!(flat.warnings.is_empty());
        let owners: Vec<&str> = flat.entries.iter().map(|e| e.owner.as_str()).collect();
        assert_eq!(&owners[..5], &["300", "300", "300", "300", "100"]);

        let mut keys: Vec<&ReminderKey> = flat.entries.iter().map(|e| &e.key).collect();
        keys.sort_by(|a, b| (&a.owner, &a.job_id).cmp(&(&b.owner, &b.job_id)));
        keys.dedup();
        assert_eq!(keys.len(), 12);
        for entry in &flat.entries {
            assert_eq!(entry.key.owner, entry.owner);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let listing = owner_map(json!({
            "9": {"work": [{"task": "a", "done": false}], "play": [{"task": "b", "done": true}]},
            "1": {"play": [{"task": "c"}]}
        }));
        assert_eq!(todos(&listing), todos(&listing));
    }

    #[test]
    fn malformed_reminder_is_dropped_with_warning() {
        let listing = owner_map(json!({
            "42": [
                reminder_json("job-1", "ok"),
                {"event": "no job", "hour": 1, "minute": 1, "session_id": "1"},
                {"event": "late", "hour": 24, "minute": 0, "job_id": "job-3", "session_id": "1"},
                reminder_json("job-4", "also ok")
            ],
            "43": "not a list"
        }));

        let flat = reminders(&listing);
        let jobs: Vec<&str> = flat.entries.iter().map(|e| e.key.job_id.as_str()).collect();
        assert_eq!(jobs, vec!["job-1", "job-4"]);
        assert_eq!(flat.warnings.len(), 3);
        assert!(flat.warnings[0].detail.contains("job_id"));
        assert!(flat.warnings[1].detail.contains("out of range"));
        assert_eq!(flat.warnings[2].owner, "43");
    }

    #[test]
    fn unusable_schedule_fields_fall_through_to_the_next_rule() {
        let flat = owner_reminders(
            "7",
            &json!([
                {"event": "zero", "hour": 1, "minute": 2, "job_id": "a", "session_id": "1",
                 "interval_days": 0, "weekdays": [1, 9]},
                {"event": "negative", "hour": 1, "minute": 2, "job_id": "b", "session_id": "1",
                 "interval_days": -3, "weekdays": [7], "date": "2025-06-07"}
            ]),
        );
        assert!(flat.warnings.is_empty());
        assert_eq!(flat.entries.len(), 2);
        assert_eq!(flat.entries[0].payload.interval_days, None);
        assert_eq!(
            flat.entries[0].payload.schedule(),
            ReminderSchedule::Weekdays(vec![1])
        );
        assert_eq!(
            flat.entries[1].payload.schedule(),
            ReminderSchedule::Once(Some("2025-06-07".to_string()))
        );
    }

    #[test]
    fn numeric_session_ids_are_accepted() {
        let flat = owner_reminders(
            "7",
            &json!([{"event": "e", "hour": 1, "minute": 2, "job_id": "j", "session_id": 123456}]),
        );
        assert_eq!(flat.entries[0].payload.session_id, "123456");
    }

    #[test]
    fn todo_index_is_position_within_owner_and_category() {
        let flat = owner_todos(
            "5",
            &json!({
                "work": [{"task": "a"}, {"done": true}, {"task": "c", "done": true}],
                "play": [{"task": "d", "done": false}]
            }),
        );
        let keys: Vec<(TodoCategory, usize)> = flat
            .entries
            .iter()
            .map(|e| (e.key.category, e.key.index))
            .collect();
        assert_eq!(
            keys,
            vec![
                (TodoCategory::Work, 0),
                (TodoCategory::Work, 2),
                (TodoCategory::Play, 0)
            ]
        );
        assert_eq!(flat.warnings.len(), 1);
    }

    #[test]
    fn todo_owner_in_bot_list_format_is_reported() {
        let listing = owner_map(json!({"5": [{"task": "legacy", "done": false}]}));
        let flat = todos(&listing);
        assert!(flat.entries.is_empty());
        assert_eq!(flat.warnings.len(), 1);
    }

    #[test]
    fn countdowns_key_by_event_name_and_parse_offsets() {
        let listing = owner_map(json!({
            "11": {
                "exam": {"time": "2025-06-07T09:00:00+08:00", "created_at": "2025-01-01T10:00:00"},
                "trip": {"time": "2025-07-01T00:00:00Z"},
                "broken": {"time": "someday"}
            }
        }));
        let flat = countdowns(&listing);
        assert_eq!(flat.entries.len(), 2);
        assert_eq!(flat.entries[0].key.event_name, "exam");
        assert_eq!(flat.entries[0].payload.target.offset().local_minus_utc(), 8 * 3600);
        assert!(flat.entries[0].payload.created_at.is_some());
        assert_eq!(flat.entries[1].payload.target.offset().local_minus_utc(), 0);
        assert_eq!(flat.warnings.len(), 1);
    }

    #[test]
    fn naive_instants_are_read_at_utc_plus_eight() {
        let instant = parse_instant("2025-06-07T09:00:00").expect("naive instant");
        let explicit = parse_instant("2025-06-07T01:00:00Z").expect("utc instant");
        assert_eq!(instant, explicit);
        assert!(parse_instant("tomorrow").is_none());
    }

    #[test]
    fn food_entries_are_owned_by_their_list() {
        let catalog = FoodCatalogResponse {
            android: vec![json!("noodles"), json!("")],
            apple: vec![json!("noodles")],
        };
        let flat = food(&catalog);
        assert_eq!(flat.entries.len(), 2);
        assert_ne!(flat.entries[0].key, flat.entries[1].key);
        assert_eq!(flat.entries[1].owner, "apple");
        assert_eq!(flat.warnings.len(), 1);
    }

    #[test]
    fn image_catalog_skips_unreadable_folders() {
        let listing = owner_map(json!({
            "pics": [{"name": "cat.png", "size": 2048, "modified": "2025-01-02T03:04:05.123456", "url": "/api/images/pics/cat.png"}],
            "latex": {"error": "permission denied"},
            "food_images": [{"name": "x.png"}]
        }));
        let flat = image_catalog(&listing);
        assert_eq!(flat.entries.len(), 1);
        assert_eq!(flat.entries[0].key.folder, ImageFolder::Pics);
        assert!(flat.entries[0].payload.modified.is_some());
        assert_eq!(flat.warnings.len(), 2);
    }

    #[test]
    fn folder_listing_keeps_valid_files_around_a_bad_one() {
        let files = [
            json!({"name": "cat.png", "size": 2048, "modified": "2025-01-02T03:04:05", "url": "/api/images/pics/cat.png"}),
            json!({"name": "bad.png"}),
        ];
        let flat = images(ImageFolder::Pics, &files);
        assert_eq!(flat.entries.len(), 1);
        assert_eq!(flat.entries[0].key.filename, "cat.png");
        assert_eq!(flat.warnings.len(), 1);
        assert_eq!(flat.warnings[0].owner, "pics");
    }

    #[test]
    fn food_list_drops_non_text_items() {
        let listing = FoodListResponse {
            list_name: FoodList::Apple,
            foods: vec![json!("rice"), Value::Null, json!(3)],
        };
        let flat = food_list(&listing);
        assert_eq!(flat.entries.len(), 1);
        assert_eq!(flat.entries[0].payload, "rice");
        assert_eq!(flat.warnings.len(), 2);
    }
}
