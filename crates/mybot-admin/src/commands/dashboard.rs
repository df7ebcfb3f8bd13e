use anyhow::anyhow;

use crate::cli::DashboardArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::print_notices;
use crate::notice::Notices;
use crate::output::render_dashboard;
use crate::views::DashboardView;

pub(crate) async fn handle_dashboard(ctx: &AppContext, args: DashboardArgs) -> CliResult<()> {
    let (notices, mut stream) = Notices::channel();
    let mut dashboard = DashboardView::open(ctx.gateway.clone(), notices);

    if !args.watch {
        let (stats, host) = tokio::join!(dashboard.load_stats(), dashboard.load_host());
        stats?;
        host?;
        return render_dashboard(
            dashboard.stats().as_ref(),
            dashboard.host().as_ref(),
            ctx.output,
        );
    }

    dashboard.refresh_stats().await;
    print_notices(&mut stream);
    let mut host = dashboard.subscribe_host();
    dashboard.start_telemetry(ctx.scheduler.telemetry_period);

    let result = loop {
        tokio::select! {
            changed = host.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = host.borrow_and_update().clone();
                if let Err(err) =
                    render_dashboard(dashboard.stats().as_ref(), current.as_ref(), ctx.output)
                {
                    break Err(err);
                }
                print_notices(&mut stream);
            }
            interrupted = tokio::signal::ctrl_c() => {
                break interrupted.map_err(|err| {
                    CliError::failure(anyhow!("failed to listen for interrupt: {err}"))
                });
            }
        }
    };
    dashboard.retire();
    result
}
