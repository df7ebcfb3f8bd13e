//! Mutate-then-refetch sequencing around every write.
//!
//! A successful write is followed by a full reload of the affected view; a
//! failed write leaves the view's snapshot exactly as it was. Local state is
//! never patched speculatively.

use std::future::Future;

use mybot_api_models::MessageResponse;
use tracing::{debug, warn};

use crate::error::{AdminError, AdminResult};
use crate::notice::Notices;
use crate::views::Reload;

/// Synchronous yes/no gate consulted before a delete.
pub trait Confirm {
    /// Ask the operator; `true` lets the delete proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Gate that always agrees (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Result of one guarded write.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The backend accepted the write. `refreshed` is false when the
    /// follow-up reload failed and the previous snapshot was kept.
    Applied {
        /// Whether the view now reflects the write.
        refreshed: bool,
    },
    /// The operator declined the confirmation; nothing was sent.
    Declined,
    /// Local validation failed; nothing was sent.
    Rejected(AdminError),
    /// The backend or the transport refused the write.
    Failed(AdminError),
}

impl MutationOutcome {
    /// Whether the backend accepted the write.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// `Ok(true)` when applied, `Ok(false)` when declined.
    ///
    /// # Errors
    ///
    /// The rejection or failure cause.
    pub fn into_result(self) -> AdminResult<bool> {
        match self {
            Self::Applied { .. } => Ok(true),
            Self::Declined => Ok(false),
            Self::Rejected(err) | Self::Failed(err) => Err(err),
        }
    }
}

/// Runs writes and reconciles the affected view afterwards.
#[derive(Debug, Clone)]
pub struct RefreshController {
    notices: Notices,
}

impl RefreshController {
    /// Controller reporting through `notices`.
    #[must_use]
    pub const fn new(notices: Notices) -> Self {
        Self { notices }
    }

    /// Run `mutation`, then reload `view` on success.
    pub async fn apply<V, F, Fut>(&self, view: &V, action: &str, mutation: F) -> MutationOutcome
    where
        V: Reload + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdminResult<MessageResponse>>,
    {
        match mutation().await {
            Ok(_) => {
                self.notices.success(format!("{action} succeeded"));
                match view.reload().await {
                    Ok(outcome) => {
                        debug!(%action, kind = %view.kind(), ?outcome, "view reloaded after write");
                        MutationOutcome::Applied { refreshed: true }
                    }
                    Err(err) => {
                        warn!(%action, kind = %view.kind(), error = %err, "reload after write failed");
                        self.notices.error(format!(
                            "{action} succeeded but reloading {} failed: {}",
                            view.kind(),
                            err.notice_text()
                        ));
                        MutationOutcome::Applied { refreshed: false }
                    }
                }
            }
            Err(err) if err.is_validation() => {
                self.notices.error(err.notice_text());
                MutationOutcome::Rejected(err)
            }
            Err(err) => {
                debug!(%action, error = %err, "write failed");
                self.notices
                    .error(format!("{action} failed: {}", err.notice_text()));
                MutationOutcome::Failed(err)
            }
        }
    }

    /// Check that every `(field, value)` in `required` is non-blank, then
    /// [`apply`](Self::apply). A blank field rejects the write before any call.
    pub async fn create<V, F, Fut>(
        &self,
        view: &V,
        action: &str,
        required: &[(&str, &str)],
        mutation: F,
    ) -> MutationOutcome
    where
        V: Reload + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdminResult<MessageResponse>>,
    {
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            let err = AdminError::validation(format!("{field} is required"));
            self.notices.error(err.notice_text());
            return MutationOutcome::Rejected(err);
        }
        self.apply(view, action, mutation).await
    }

    /// Ask `confirm`, then [`apply`](Self::apply). A declined confirmation
    /// issues no call.
    pub async fn delete<V, F, Fut>(
        &self,
        view: &V,
        action: &str,
        confirm: &dyn Confirm,
        prompt: &str,
        mutation: F,
    ) -> MutationOutcome
    where
        V: Reload + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdminResult<MessageResponse>>,
    {
        if !confirm.confirm(prompt) {
            debug!(%action, "delete declined");
            return MutationOutcome::Declined;
        }
        self.apply(view, action, mutation).await
    }
}
