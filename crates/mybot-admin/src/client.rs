//! CLI edge plumbing: error tiers, command context, credentials and the
//! delete confirmation prompt.

use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::anyhow;
use url::Url;

use crate::cli::OutputFormat;
use crate::error::AdminError;
use crate::gateway::{BasicCredentials, ResourceGateway};
use crate::refresh::{AssumeYes, Confirm};
use crate::schedule::SchedulerConfig;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<AdminError> for CliError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(message) => Self::Validation(message),
            AdminError::DuplicateEntry { .. } => Self::Validation(err.notice_text()),
            other => Self::failure(other),
        }
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) gateway: ResourceGateway,
    pub(crate) output: OutputFormat,
    pub(crate) scheduler: SchedulerConfig,
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Resolve Basic credentials from flags, prompting for a missing password
/// when attached to a terminal.
pub(crate) fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
) -> CliResult<Option<BasicCredentials>> {
    let username = username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let Some(username) = username else {
        if password.is_some() {
            return Err(CliError::validation(
                "--password requires --username (or MYBOT_ADMIN_USERNAME)",
            ));
        }
        return Ok(None);
    };

    let password = match password {
        Some(password) => password,
        None => prompt_password(&username)?,
    };

    Ok(Some(BasicCredentials {
        username,
        password: Some(password),
    }))
}

fn prompt_password(username: &str) -> CliResult<String> {
    if io::stdin().is_terminal() {
        let pass = rpassword::prompt_password(format!("Password for {username}: ")).map_err(
            |err| CliError::failure(anyhow!("failed to read password from stdin: {err}")),
        )?;
        if pass.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        Ok(pass)
    } else {
        Err(CliError::validation(
            "password required; supply via --password or MYBOT_ADMIN_PASSWORD when running non-interactively",
        ))
    }
}

/// Interactive `[y/N]` prompt on stderr/stdin.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stderr = io::stderr();
        if write!(stderr, "{prompt} [y/N] ").is_err() || stderr.flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Pick the delete gate: `--yes` skips it, a terminal gets a prompt, anything
/// else is refused up front.
pub(crate) fn confirmation_gate(assume_yes: bool) -> CliResult<Box<dyn Confirm>> {
    if assume_yes {
        Ok(Box::new(AssumeYes))
    } else if io::stdin().is_terminal() {
        Ok(Box::new(TerminalConfirm))
    } else {
        Err(CliError::validation(
            "refusing to delete without confirmation; pass --yes when running non-interactively",
        ))
    }
}
