use chrono::NaiveDate;
use mybot_api_models::ReminderCreateRequest;

use crate::cli::{OwnerFilterArgs, ReminderAddArgs, ReminderRemoveArgs};
use crate::client::{AppContext, CliError, CliResult, confirmation_gate};
use crate::commands::{load, settle};
use crate::model::ReminderKey;
use crate::notice::Notices;
use crate::output::render_reminders;
use crate::refresh::RefreshController;
use crate::views::{Reminders, ResourceView};

pub(crate) async fn handle_reminder_list(ctx: &AppContext, args: OwnerFilterArgs) -> CliResult<()> {
    let (notices, _stream) = Notices::channel();
    let view = ResourceView::open(
        Reminders { owner: args.owner },
        ctx.gateway.clone(),
        notices,
    );
    let entries = load(&view).await?;
    render_reminders(&entries, ctx.output)
}

pub(crate) async fn handle_reminder_add(ctx: &AppContext, args: ReminderAddArgs) -> CliResult<()> {
    let request = build_request(&args)?;
    let owner = args.owner.trim();

    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        Reminders {
            owner: Some(owner.to_string()),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );
    let outcome = RefreshController::new(notices)
        .create(
            &view,
            "create reminder",
            &[
                ("owner id", owner),
                ("event", request.event.as_str()),
                ("session id", request.session_id.as_str()),
            ],
            || view.gateway().create_reminder(owner, &request),
        )
        .await;

    if settle(outcome, &mut stream)? {
        render_reminders(&view.entries(), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_reminder_remove(
    ctx: &AppContext,
    args: ReminderRemoveArgs,
) -> CliResult<()> {
    let confirm = confirmation_gate(args.yes)?;
    let key = ReminderKey {
        owner: args.owner.trim().to_string(),
        job_id: args.job_id.trim().to_string(),
    };

    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        Reminders {
            owner: Some(key.owner.clone()),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );
    let prompt = format!("Delete reminder {} of {}?", key.job_id, key.owner);
    let outcome = RefreshController::new(notices)
        .delete(&view, "delete reminder", confirm.as_ref(), &prompt, || {
            view.gateway().delete_reminder(&key)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_reminders(&view.entries(), ctx.output)?;
    }
    Ok(())
}

fn build_request(args: &ReminderAddArgs) -> CliResult<ReminderCreateRequest> {
    let date = match args.date.as_deref().map(str::trim) {
        Some(raw) => {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                CliError::validation(format!("date must be formatted YYYY-MM-DD, got '{raw}'"))
            })?;
            Some(raw.to_string())
        }
        None => None,
    };
    let mut weekdays = args.weekdays.clone();
    weekdays.sort_unstable();
    weekdays.dedup();

    Ok(ReminderCreateRequest {
        event: args.event.trim().to_string(),
        hour: args.hour,
        minute: args.minute,
        is_daily: args.daily,
        interval_days: args.every_days,
        date,
        weekdays: (!weekdays.is_empty()).then_some(weekdays),
        session_id: args.session.trim().to_string(),
        is_group: args.group,
        mention_all: args.mention_all,
    })
}
