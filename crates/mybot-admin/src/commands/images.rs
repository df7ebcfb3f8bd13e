use std::path::PathBuf;

use anyhow::anyhow;
use mybot_api_models::{ImageFolder, MessageResponse};

use crate::cli::{ImageGetArgs, ImageListArgs, ImageRemoveArgs, ImageUploadArgs};
use crate::client::{AppContext, CliError, CliResult, confirmation_gate};
use crate::commands::{load, settle};
use crate::error::AdminError;
use crate::gateway::ImageUpload;
use crate::model::ImageKey;
use crate::notice::Notices;
use crate::output::{format_bytes, render_images, render_upload};
use crate::refresh::RefreshController;
use crate::views::{Images, ResourceView};

pub(crate) async fn handle_image_list(ctx: &AppContext, args: ImageListArgs) -> CliResult<()> {
    let (notices, _stream) = Notices::channel();
    let view = ResourceView::open(Images { folder: args.folder }, ctx.gateway.clone(), notices);
    let entries = load(&view).await?;
    render_images(&entries, ctx.output)
}

pub(crate) async fn handle_image_upload(ctx: &AppContext, args: ImageUploadArgs) -> CliResult<()> {
    let upload = ImageUpload::from_path(&args.path).await?;
    let folder = args.folder;

    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        Images {
            folder: Some(folder),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );

    let mut receipt = None;
    let slot = &mut receipt;
    let gateway = view.gateway();
    let upload = &upload;
    let outcome = RefreshController::new(notices)
        .apply(&view, "upload image", move || async move {
            let stored = gateway.upload_image(folder, upload).await?;
            let ack = MessageResponse {
                message: stored.message.clone(),
            };
            *slot = Some(stored);
            Ok::<_, AdminError>(ack)
        })
        .await;

    let refreshed = settle(outcome, &mut stream)?;
    if let Some(stored) = &receipt {
        render_upload(stored, ctx.output)?;
    }
    if refreshed {
        render_images(&view.entries(), ctx.output)?;
    }
    Ok(())
}

pub(crate) async fn handle_image_get(ctx: &AppContext, args: ImageGetArgs) -> CliResult<()> {
    let key = image_key(args.folder, &args.filename)?;
    let bytes = ctx.gateway.download_image(&key).await?;
    let target = args
        .out
        .unwrap_or_else(|| PathBuf::from(key.filename.as_str()));
    tokio::fs::write(&target, &bytes).await.map_err(|err| {
        CliError::failure(anyhow!("failed to write {}: {err}", target.display()))
    })?;
    eprintln!(
        "saved {} ({})",
        target.display(),
        format_bytes(u64::try_from(bytes.len()).unwrap_or(u64::MAX))
    );
    Ok(())
}

pub(crate) async fn handle_image_remove(ctx: &AppContext, args: ImageRemoveArgs) -> CliResult<()> {
    let key = image_key(args.folder, &args.filename)?;
    let confirm = confirmation_gate(args.yes)?;

    let (notices, mut stream) = Notices::channel();
    let view = ResourceView::open(
        Images {
            folder: Some(key.folder),
        },
        ctx.gateway.clone(),
        notices.clone(),
    );
    let prompt = format!("Delete {}/{}?", key.folder.as_str(), key.filename);
    let outcome = RefreshController::new(notices)
        .delete(&view, "delete image", confirm.as_ref(), &prompt, || {
            view.gateway().delete_image(&key)
        })
        .await;

    if settle(outcome, &mut stream)? {
        render_images(&view.entries(), ctx.output)?;
    }
    Ok(())
}

fn image_key(folder: ImageFolder, filename: &str) -> CliResult<ImageKey> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(CliError::validation("file name must not be empty"));
    }
    Ok(ImageKey {
        folder,
        filename: filename.to_string(),
    })
}
