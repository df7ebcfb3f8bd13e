use crate::cli::{FoodAddArgs, FoodListArgs, FoodRemoveArgs};
use crate::client::{AppContext, CliResult, confirmation_gate};
use crate::commands::{load, settle};
use crate::model::FoodKey;
use crate::notice::Notices;
use crate::output::render_food;
use crate::refresh::RefreshController;
use crate::views::{FoodLists, ResourceView};

pub(crate) async fn handle_food_list(ctx: &AppContext, args: FoodListArgs) -> CliResult<()> {
    let (notices, _stream) = Notices::channel();
    let view = ResourceView::open(FoodLists { list: args.list }, ctx.gateway.clone(), notices);
    let entries = load(&view).await?;
    render_food(&entries, ctx.output)
}

pub(crate) async fn handle_food_add(ctx: &AppContext, args: FoodAddArgs) -> CliResult<()> {
    let food = args.food.trim();
    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        FoodLists {
            list: Some(args.list),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );
    let outcome = RefreshController::new(notices)
        .create(&view, "add food", &[("food", food)], || {
            view.gateway().add_food(args.list, food)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_food(&view.entries(), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_food_remove(ctx: &AppContext, args: FoodRemoveArgs) -> CliResult<()> {
    let confirm = confirmation_gate(args.yes)?;
    let key = FoodKey {
        list: args.list,
        food: args.food.trim().to_string(),
    };

    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        FoodLists {
            list: Some(key.list),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );
    let prompt = format!("Remove '{}' from the {} list?", key.food, key.list.as_str());
    let outcome = RefreshController::new(notices)
        .delete(&view, "delete food", confirm.as_ref(), &prompt, || {
            view.gateway().delete_food(&key)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_food(&view.entries(), ctx.output)?;
    }
    Ok(())
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
    use mybot_api_models::FoodList;
    use serde_json::json;

    fn context(server: &MockServer) -> Result<AppContext> {
        Ok(AppContext {
            gateway: ResourceGateway::new(GatewayConfig::new(server.base_url().parse()?))?,
            output: OutputFormat::Table,
            scheduler: SchedulerConfig::default(),
        })
    }

    #[tokio::test]
    async fn duplicate_food_is_a_validation_error() -> Result<()> {
        let server = MockServer::start_async().await;
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/api/eat/apple")
                .query_param("food", "noodles");
            then.status(400).json_body(json!({"detail": "noodles already exists"}));
        });

        let ctx = context(&server)?;
        let err = handle_food_add(
            &ctx,
            FoodAddArgs {
                list: FoodList::Apple,
                food: " noodles ".to_string(),
            },
        )
        .await
        .expect_err("duplicate");
        add.assert();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "already exists: noodles already exists");
        Ok(())
    }

    #[tokio::test]
    async fn confirmed_removal_refetches_the_list() -> Result<()> {
        let server = MockServer::start_async().await;
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api/eat/android/rice");
            then.status(200).json_body(json!({"message": "deleted"}));
        });
        let listing = server.mock(|when, then| {
            when.method(GET).path("/api/eat/android");
            then.status(200)
                .json_body(json!({"list_name": "android", "foods": ["noodles"]}));
        });

        let ctx = context(&server)?;
        handle_food_remove(
            &ctx,
            FoodRemoveArgs {
                list: FoodList::Android,
                food: "rice".to_string(),
                yes: true,
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        delete.assert();
        listing.assert();
        Ok(())
    }
}
