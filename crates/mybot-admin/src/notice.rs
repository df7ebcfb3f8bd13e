//! Transient user-visible messages emitted by every engine boundary.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tokio::sync::mpsc;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// A mutation went through.
    Success,
    /// Something failed; prior state was kept.
    Error,
}

/// One transient message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Operator-facing text.
    pub message: String,
}

impl Notice {
    /// Success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl Display for Notice {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(formatter, "ok: {}", self.message),
            NoticeLevel::Error => write!(formatter, "error: {}", self.message),
        }
    }
}

/// Sending half shared by views and the refresh controller.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: mpsc::UnboundedSender<Notice>,
}

/// Receiving half drained by the frontend.
pub type NoticeStream = mpsc::UnboundedReceiver<Notice>;

impl Notices {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, NoticeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish a notice. Dropped silently when nobody is listening.
    pub fn emit(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::debug!(text = %notice.message, "success notice"),
            NoticeLevel::Error => tracing::debug!(text = %notice.message, "error notice"),
        }
        let _ = self.tx.send(notice);
    }

    /// Shorthand for [`Notice::success`].
    pub fn success(&self, message: impl Into<String>) {
        self.emit(Notice::success(message));
    }

    /// Shorthand for [`Notice::error`].
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Notice::error(message));
    }
}

/// Collect every notice currently queued without waiting.
pub fn drain(stream: &mut NoticeStream) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = stream.try_recv() {
        notices.push(notice);
    }
    notices
}
