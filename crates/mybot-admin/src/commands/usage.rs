use anyhow::anyhow;
use chrono::Utc;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_health, render_usage};
use crate::views::{Reload, UsageView};

pub(crate) async fn handle_usage(ctx: &AppContext) -> CliResult<()> {
    let view = UsageView::open(ctx.gateway.clone());
    let (overview, _) = tokio::try_join!(ctx.gateway.usage_overview(), view.reload())?;
    let breakdown = view
        .breakdown()
        .ok_or_else(|| CliError::failure(anyhow!("usage breakdown was not loaded")))?;
    render_usage(&overview, &breakdown, ctx.output)
}

pub(crate) async fn handle_health(ctx: &AppContext) -> CliResult<()> {
    let health = ctx.gateway.health().await?;
    render_health(&health, Utc::now(), ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::gateway::{GatewayConfig, ResourceGateway};
    use crate::schedule::SchedulerConfig;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn context(server: &MockServer) -> Result<AppContext> {
        Ok(AppContext {
            gateway: ResourceGateway::new(GatewayConfig::new(server.base_url().parse()?))?,
            output: OutputFormat::Json,
            scheduler: SchedulerConfig::default(),
        })
    }

    #[tokio::test]
    async fn health_reports_backend_status() -> Result<()> {
        let server = MockServer::start_async().await;
        let probe = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(json!({"status": "healthy", "timestamp": "2025-03-01T08:00:00"}));
        });

        let ctx = context(&server)?;
        assert!(handle_health(&ctx).await.is_ok());
        probe.assert();
        Ok(())
    }

    #[tokio::test]
    async fn usage_fails_when_any_breakdown_fails() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/overview");
            then.status(200)
                .json_body(json!({"total_calls": 10, "recent_7days": 4, "total_records": 10}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/hourly");
            then.status(200).json_body(json!({"hourly_stats": {"9": 3}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/weekday");
            then.status(200).json_body(json!({"weekday_stats": {"Monday": 3}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/daily");
            then.status(500).json_body(json!({"detail": "stats unavailable"}));
        });

        let ctx = context(&server)?;
        let err = handle_usage(&ctx).await.expect_err("daily failed");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("stats unavailable"));
        Ok(())
    }
}
