use mybot_api_models::{TodoCategory, TodoCreateRequest};

use crate::cli::{OwnerFilterArgs, TodoAddArgs, TodoDoneArgs, TodoRemoveArgs};
use crate::client::{AppContext, CliError, CliResult, confirmation_gate};
use crate::commands::{load, settle};
use crate::model::{TodoEntry, TodoKey};
use crate::notice::Notices;
use crate::output::render_todos;
use crate::refresh::RefreshController;
use crate::views::{ResourceView, Todos};

pub(crate) async fn handle_todo_list(ctx: &AppContext, args: OwnerFilterArgs) -> CliResult<()> {
    let (notices, _stream) = Notices::channel();
    let view = ResourceView::open(Todos { owner: args.owner }, ctx.gateway.clone(), notices);
    let entries = load(&view).await?;
    render_todos(&entries, ctx.output)
}

pub(crate) async fn handle_todo_add(ctx: &AppContext, args: TodoAddArgs) -> CliResult<()> {
    let owner = args.owner.trim();
    let request = TodoCreateRequest {
        task: args.task.trim().to_string(),
        category: args.category,
    };

    let (notices, mut stream) = Notices::channel();
    let view = owner_view(ctx, owner, notices.clone());
    let outcome = RefreshController::new(notices)
        .create(
            &view,
            "add todo",
            &[("owner id", owner), ("task", request.task.as_str())],
            || view.gateway().create_todo(owner, &request),
        )
        .await;

    if settle(outcome, &mut stream)? {
        render_todos(&view.entries(), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_todo_done(ctx: &AppContext, args: TodoDoneArgs) -> CliResult<()> {
    let (notices, mut stream) = Notices::channel();
    let view = owner_view(ctx, args.owner.trim(), notices.clone());
    let entries = load(&view).await?;
    let key = locate(&entries, args.category, args.index)?;

    let done = !args.undo;
    let action = if done { "complete todo" } else { "reopen todo" };
    let outcome = RefreshController::new(notices)
        .apply(&view, action, || view.gateway().update_todo(&key, done))
        .await;

    if settle(outcome, &mut stream)? {
        render_todos(&view.entries(), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_todo_remove(ctx: &AppContext, args: TodoRemoveArgs) -> CliResult<()> {
    let confirm = confirmation_gate(args.yes)?;
    let (notices, mut stream) = Notices::channel();
    let view = owner_view(ctx, args.owner.trim(), notices.clone());
    let entries = load(&view).await?;
    let key = locate(&entries, args.category, args.index)?;
    let task = entries
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| entry.payload.task.clone())
        .unwrap_or_default();

    let prompt = format!(
        "Delete {} todo #{} of {} ('{task}')?",
        key.category.as_str(),
        key.index,
        key.owner
    );
    let outcome = RefreshController::new(notices)
        .delete(&view, "delete todo", confirm.as_ref(), &prompt, || {
            view.gateway().delete_todo(&key)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_todos(&view.entries(), ctx.output)?;
    }
    Ok(())
}

fn owner_view(ctx: &AppContext, owner: &str, notices: Notices) -> ResourceView<Todos> {
    ResourceView::open(
        Todos {
            owner: Some(owner.to_string()),
        },
        ctx.gateway.clone(),
        notices,
    )
}

/// Positional keys are only meaningful against the snapshot they came from,
/// so the key is looked up in a fresh fetch rather than built from input.
fn locate(entries: &[TodoEntry], category: TodoCategory, index: usize) -> CliResult<TodoKey> {
    entries
        .iter()
        .find(|entry| entry.key.category == category && entry.key.index == index)
        .map(|entry| entry.key.clone())
        .ok_or_else(|| {
            CliError::validation(format!("no {} todo at index {index}", category.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, Todo};

    fn entry(category: TodoCategory, index: usize) -> TodoEntry {
        Entry {
            key: TodoKey {
                owner: "1001".to_string(),
                category,
                index,
            },
            owner: "1001".to_string(),
            payload: Todo {
                task: format!("task {index}"),
                done: false,
            },
        }
    }

    #[test]
    fn locate_matches_category_and_index() -> CliResult<()> {
        let entries = vec![
            entry(TodoCategory::Work, 0),
            entry(TodoCategory::Play, 0),
            entry(TodoCategory::Play, 1),
        ];
        let key = locate(&entries, TodoCategory::Play, 1)?;
        assert_eq!(key.category, TodoCategory::Play);
        assert_eq!(key.index, 1);

        let err = locate(&entries, TodoCategory::Work, 3).expect_err("missing index");
        assert!(matches!(err, CliError::Validation(message) if message == "no work todo at index 3"));
        Ok(())
    }
}
