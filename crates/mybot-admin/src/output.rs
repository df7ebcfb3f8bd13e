//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use mybot_api_models::{HealthResponse, TodoCategory, UploadResponse, UsageOverview};
use serde::Serialize;
use serde_json::json;

use crate::aggregate::{
    self, CountdownLine, DashboardStats, HostUsage, UsageBreakdown, WEEKDAY_NAMES,
};
use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};
use crate::model::{FoodEntry, ImageEntry, IntegrityWarning, ReminderEntry, TodoEntry};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_reminders(entries: &[ReminderEntry], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(entries)?,
        OutputFormat::Table => {
            println!(
                "{:<12} {:<40} {:<5} {:<16} {:<14} EVENT",
                "OWNER", "JOB", "TIME", "REPEAT", "SESSION"
            );
            for entry in entries {
                let reminder = &entry.payload;
                let mut session = reminder.session_id.clone();
                if reminder.is_group {
                    session.push_str(" (group)");
                }
                let event = if reminder.mention_all {
                    format!("{} @all", reminder.event)
                } else {
                    reminder.event.clone()
                };
                println!(
                    "{:<12} {:<40} {:<5} {:<16} {:<14} {}",
                    entry.owner,
                    entry.key.job_id,
                    reminder.time_of_day(),
                    reminder.schedule().to_string(),
                    session,
                    event
                );
            }
            println!("{} reminder(s)", entries.len());
        }
    }
    Ok(())
}

pub(crate) fn render_todos(entries: &[TodoEntry], format: OutputFormat) -> CliResult<()> {
    let open = aggregate::open_todo_counts(entries);
    match format {
        OutputFormat::Json => print_json(&json!({
            "entries": entries,
            "open": open,
        }))?,
        OutputFormat::Table => {
            println!("{:<12} {:<6} {:>5} {:<4} TASK", "OWNER", "BUCKET", "INDEX", "DONE");
            for entry in entries {
                println!(
                    "{:<12} {:<6} {:>5} {:<4} {}",
                    entry.owner,
                    entry.key.category.as_str(),
                    entry.key.index,
                    if entry.payload.done { "x" } else { "" },
                    entry.payload.task
                );
            }
            println!(
                "open: {} work, {} play",
                open.get(TodoCategory::Work),
                open.get(TodoCategory::Play)
            );
        }
    }
    Ok(())
}

pub(crate) fn render_countdowns(lines: &[CountdownLine], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(lines)?,
        OutputFormat::Table => {
            println!(
                "{:<12} {:<24} {:<26} LEFT",
                "OWNER", "EVENT", "TARGET"
            );
            for line in lines {
                println!(
                    "{:<12} {:<24} {:<26} {}",
                    line.key.owner, line.key.event_name, line.target, line.time_left
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_food(entries: &[FoodEntry], format: OutputFormat) -> CliResult<()> {
    let counts = aggregate::food_counts(entries);
    match format {
        OutputFormat::Json => print_json(&json!({
            "entries": entries,
            "counts": counts,
        }))?,
        OutputFormat::Table => {
            println!("{:<8} FOOD", "LIST");
            for entry in entries {
                println!("{:<8} {}", entry.key.list.as_str(), entry.payload);
            }
            println!("android: {}, apple: {}", counts.android, counts.apple);
        }
    }
    Ok(())
}

pub(crate) fn render_images(entries: &[ImageEntry], format: OutputFormat) -> CliResult<()> {
    let totals = aggregate::folder_totals(entries);
    match format {
        OutputFormat::Json => print_json(&json!({
            "entries": entries,
            "folders": totals,
        }))?,
        OutputFormat::Table => {
            println!(
                "{:<12} {:<32} {:>12} {:<20} URL",
                "FOLDER", "NAME", "SIZE", "MODIFIED"
            );
            for entry in entries {
                let modified = entry
                    .payload
                    .modified
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<12} {:<32} {:>12} {:<20} {}",
                    entry.key.folder.as_str(),
                    entry.key.filename,
                    format_bytes(entry.payload.size),
                    modified,
                    entry.payload.locator
                );
            }
            for total in &totals {
                println!(
                    "{}: {} file(s), {}",
                    total.folder.as_str(),
                    total.files,
                    format_bytes(total.bytes)
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_upload(receipt: &UploadResponse, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(receipt)?,
        OutputFormat::Table => {
            println!(
                "stored {} ({}) at {}",
                receipt.file.name,
                format_bytes(receipt.file.size),
                receipt.file.url
            );
        }
    }
    Ok(())
}

pub(crate) fn render_dashboard(
    stats: Option<&DashboardStats>,
    host: Option<&HostUsage>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "stats": stats,
            "host": host,
        }))?,
        OutputFormat::Table => {
            if let Some(stats) = stats {
                println!("reminders: {}", stats.reminders);
                println!("open todos: {}", stats.open_todos);
                println!("countdowns: {}", stats.countdowns);
                println!("messages (7 days): {}", stats.weekly_messages);
            }
            if let Some(host) = host {
                println!(
                    "cpu {} | memory {} | disk {}",
                    host.cpu.label, host.memory.label, host.disk.label
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_usage(
    overview: &UsageOverview,
    breakdown: &UsageBreakdown,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "overview": overview,
            "breakdown": breakdown,
        }))?,
        OutputFormat::Table => {
            println!(
                "total messages: {} (last 7 days: {})",
                overview.total_calls, overview.recent_7days
            );
            println!("by hour:");
            for (hour, count) in breakdown.hourly.iter().enumerate() {
                println!("  {hour:02}:00 {count:>6}");
            }
            println!("by weekday:");
            for (name, (_, count)) in WEEKDAY_NAMES.iter().zip(breakdown.weekday.iter()) {
                println!("  {name:<9} {count:>6}");
            }
            println!("by day:");
            for (date, count) in &breakdown.daily {
                println!("  {date} {count:>6}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_health(
    health: &HealthResponse,
    checked_at: DateTime<Utc>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(health)?,
        OutputFormat::Table => {
            println!("status: {}", health.status);
            println!("server time: {}", health.timestamp);
            println!("checked at: {}", checked_at.to_rfc3339());
        }
    }
    Ok(())
}

pub(crate) fn report_warnings(warnings: &[IntegrityWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
