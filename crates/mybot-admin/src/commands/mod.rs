//! Command handlers grouped by resource.
//!
//! Every handler opens a view, works through it, and lets it retire when the
//! handler returns. Writes go through the refresh controller; its notices are
//! printed on stderr unless the write is surfaced as the command error.

pub(crate) mod countdowns;
pub(crate) mod dashboard;
pub(crate) mod food;
pub(crate) mod images;
pub(crate) mod reminders;
pub(crate) mod todos;
pub(crate) mod usage;

use crate::client::CliResult;
use crate::notice::{NoticeStream, drain};
use crate::output::report_warnings;
use crate::refresh::MutationOutcome;
use crate::views::{Collection, Reload, ResourceView};

/// Fetch the view once and return its entries, reporting dropped entries.
pub(crate) async fn load<C: Collection>(view: &ResourceView<C>) -> CliResult<Vec<C::Entry>> {
    view.reload().await?;
    if let Some(snapshot) = view.snapshot() {
        report_warnings(&snapshot.warnings);
    }
    Ok(view.entries())
}

/// Print pending notices on stderr.
pub(crate) fn print_notices(stream: &mut NoticeStream) {
    for notice in drain(stream) {
        eprintln!("{notice}");
    }
}

/// Turn a write outcome into the command result. `Ok(true)` means the view
/// now reflects the write and is worth rendering.
pub(crate) fn settle(outcome: MutationOutcome, stream: &mut NoticeStream) -> CliResult<bool> {
    let refreshed = match outcome {
        MutationOutcome::Applied { refreshed } => refreshed,
        MutationOutcome::Declined => {
            eprintln!("aborted; nothing was changed");
            false
        }
        MutationOutcome::Rejected(err) | MutationOutcome::Failed(err) => {
            drain(stream);
            return Err(err.into());
        }
    };
    print_notices(stream);
    Ok(refreshed)
}
