use anyhow::anyhow;
use chrono::Utc;
use mybot_api_models::CountdownCreateRequest;
use tokio::sync::watch;

use crate::aggregate::{CountdownLine, countdown_lines};
use crate::cli::{CountdownAddArgs, CountdownRemoveArgs, CountdownWatchArgs, OwnerFilterArgs};
use crate::client::{AppContext, CliError, CliResult, confirmation_gate};
use crate::commands::{load, print_notices, settle};
use crate::model::CountdownKey;
use crate::normalize::parse_instant;
use crate::notice::{NoticeStream, Notices};
use crate::output::{render_countdowns, report_warnings};
use crate::refresh::RefreshController;
use crate::views::{CountdownBoard, Countdowns, Reload, ResourceView};

pub(crate) async fn handle_countdown_list(ctx: &AppContext, args: OwnerFilterArgs) -> CliResult<()> {
    let (notices, _stream) = Notices::channel();
    let view = ResourceView::open(Countdowns { owner: args.owner }, ctx.gateway.clone(), notices);
    let entries = load(&view).await?;
    render_countdowns(&countdown_lines(&entries, Utc::now()), ctx.output)
}

pub(crate) async fn handle_countdown_add(ctx: &AppContext, args: CountdownAddArgs) -> CliResult<()> {
    let owner = args.owner.trim();
    let time = args.at.trim();
    if !time.is_empty() && parse_instant(time).is_none() {
        return Err(CliError::validation(format!(
            "time must be an ISO-8601 timestamp, got '{time}'"
        )));
    }
    let request = CountdownCreateRequest {
        event_name: args.event.trim().to_string(),
        time: time.to_string(),
    };

    let (notices, mut stream) = Notices::channel();
    let view = owner_view(ctx, owner, notices.clone());
    let outcome = RefreshController::new(notices)
        .create(
            &view,
            "create countdown",
            &[
                ("owner id", owner),
                ("event name", request.event_name.as_str()),
                ("time", request.time.as_str()),
            ],
            || view.gateway().create_countdown(owner, &request),
        )
        .await;

    if settle(outcome, &mut stream)? {
        render_countdowns(&countdown_lines(&view.entries(), Utc::now()), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_countdown_remove(
    ctx: &AppContext,
    args: CountdownRemoveArgs,
) -> CliResult<()> {
    let confirm = confirmation_gate(args.yes)?;
    let key = CountdownKey {
        owner: args.owner.trim().to_string(),
        event_name: args.event.trim().to_string(),
    };

    let (notices, mut stream) = Notices::channel();
    let view = owner_view(ctx, &key.owner, notices.clone());
    let prompt = format!("Delete countdown '{}' of {}?", key.event_name, key.owner);
    let outcome = RefreshController::new(notices)
        .delete(&view, "delete countdown", confirm.as_ref(), &prompt, || {
            view.gateway().delete_countdown(&key)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_countdowns(&countdown_lines(&view.entries(), Utc::now()), ctx.output)?;
    }
    Ok(())
}

/// Fetch once, then redraw the time-left column on the display schedule
/// until interrupted. The board never refetches on its own.
pub(crate) async fn handle_countdown_watch(
    ctx: &AppContext,
    args: CountdownWatchArgs,
) -> CliResult<()> {
    let (notices, mut stream) = Notices::channel();
    let mut board = CountdownBoard::open(
        Countdowns { owner: args.owner },
        ctx.gateway.clone(),
        notices,
    );
    board.reload().await?;
    if let Some(snapshot) = board.view().snapshot() {
        report_warnings(&snapshot.warnings);
    }

    let mut lines = board.subscribe();
    lines.mark_changed();
    board.start_display(ctx.scheduler.display_period);

    let result = watch_lines(ctx, &mut lines, &mut stream).await;
    board.retire();
    result
}

async fn watch_lines(
    ctx: &AppContext,
    lines: &mut watch::Receiver<Vec<CountdownLine>>,
    stream: &mut NoticeStream,
) -> CliResult<()> {
    loop {
        tokio::select! {
            changed = lines.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = lines.borrow_and_update().clone();
                render_countdowns(&current, ctx.output)?;
                print_notices(stream);
            }
            interrupted = tokio::signal::ctrl_c() => {
                return interrupted.map_err(|err| {
                    CliError::failure(anyhow!("failed to listen for interrupt: {err}"))
                });
            }
        }
    }
}

fn owner_view(ctx: &AppContext, owner: &str, notices: Notices) -> ResourceView<Countdowns> {
    ResourceView::open(
        Countdowns {
            owner: Some(owner.to_string()),
        },
        ctx.gateway.clone(),
        notices,
    )
}
