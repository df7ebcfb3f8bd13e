//! Command-line surface for the MyBot admin engine.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mybot_api_models::{FoodList, ImageFolder, TodoCategory};
use mybot_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, parse_url, resolve_credentials};
use crate::commands::countdowns::{
    handle_countdown_add, handle_countdown_list, handle_countdown_remove, handle_countdown_watch,
};
use crate::commands::dashboard::handle_dashboard;
use crate::commands::food::{handle_food_add, handle_food_list, handle_food_remove};
use crate::commands::images::{
    handle_image_get, handle_image_list, handle_image_remove, handle_image_upload,
};
use crate::commands::reminders::{
    handle_reminder_add, handle_reminder_list, handle_reminder_remove,
};
use crate::commands::todos::{
    handle_todo_add, handle_todo_done, handle_todo_list, handle_todo_remove,
};
use crate::commands::usage::{handle_health, handle_usage};
use crate::gateway::{GatewayConfig, ResourceGateway};
use crate::schedule::{DISPLAY_REFRESH_PERIOD, SchedulerConfig, TELEMETRY_REFRESH_PERIOD};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let ctx = match build_context(&cli, trace_id.clone()) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    debug!(command = command_name, %trace_id, api = %ctx.gateway.base_url(), "dispatching");

    match dispatch(cli.command, &ctx).await {
        Ok(()) => {
            debug!(command = command_name, "command succeeded");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            debug!(command = command_name, exit_code, "command failed");
            eprintln!("error: {}", err.display_message());
            exit_code
        }
    }
}

fn build_context(cli: &Cli, trace_id: String) -> CliResult<AppContext> {
    if cli.timeout == 0 {
        return Err(CliError::validation("--timeout must be at least one second"));
    }
    let mut config = GatewayConfig::new(cli.api_url.clone());
    config.timeout = Duration::from_secs(cli.timeout);
    config.trace_id = trace_id;
    if let Some(credentials) = resolve_credentials(cli.username.clone(), cli.password.clone())? {
        config = config.with_credentials(credentials);
    }

    Ok(AppContext {
        gateway: ResourceGateway::new(config)?,
        output: cli.output,
        scheduler: SchedulerConfig {
            display_period: Duration::from_millis(cli.display_period_ms),
            telemetry_period: Duration::from_millis(cli.telemetry_period_ms),
        },
    })
}

async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Reminders(reminders) => match reminders {
            ReminderCommand::Ls(args) => handle_reminder_list(ctx, args).await,
            ReminderCommand::Add(args) => handle_reminder_add(ctx, args).await,
            ReminderCommand::Rm(args) => handle_reminder_remove(ctx, args).await,
        },
        Command::Todos(todos) => match todos {
            TodoCommand::Ls(args) => handle_todo_list(ctx, args).await,
            TodoCommand::Add(args) => handle_todo_add(ctx, args).await,
            TodoCommand::Done(args) => handle_todo_done(ctx, args).await,
            TodoCommand::Rm(args) => handle_todo_remove(ctx, args).await,
        },
        Command::Countdowns(countdowns) => match countdowns {
            CountdownCommand::Ls(args) => handle_countdown_list(ctx, args).await,
            CountdownCommand::Add(args) => handle_countdown_add(ctx, args).await,
            CountdownCommand::Rm(args) => handle_countdown_remove(ctx, args).await,
            CountdownCommand::Watch(args) => handle_countdown_watch(ctx, args).await,
        },
        Command::Food(food) => match food {
            FoodCommand::Ls(args) => handle_food_list(ctx, args).await,
            FoodCommand::Add(args) => handle_food_add(ctx, args).await,
            FoodCommand::Rm(args) => handle_food_remove(ctx, args).await,
        },
        Command::Images(images) => match images {
            ImageCommand::Ls(args) => handle_image_list(ctx, args).await,
            ImageCommand::Upload(args) => handle_image_upload(ctx, args).await,
            ImageCommand::Get(args) => handle_image_get(ctx, args).await,
            ImageCommand::Rm(args) => handle_image_remove(ctx, args).await,
        },
        Command::Dashboard(args) => handle_dashboard(ctx, args).await,
        Command::Usage => handle_usage(ctx).await,
        Command::Health => handle_health(ctx).await,
    }
}

#[derive(Parser)]
#[command(name = "mybot-admin", about = "Administrative CLI for the MyBot backend")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "MYBOT_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    api_url: Url,
    #[arg(long, global = true, env = "MYBOT_ADMIN_USERNAME")]
    username: Option<String>,
    #[arg(long, global = true, env = "MYBOT_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(
        long,
        global = true,
        env = "MYBOT_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, env = "MYBOT_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, global = true, env = "MYBOT_LOG_FORMAT", help = "pretty or json")]
    log_format: Option<LogFormat>,
    #[arg(
        long,
        global = true,
        hide = true,
        default_value_t = duration_millis(DISPLAY_REFRESH_PERIOD),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    display_period_ms: u64,
    #[arg(
        long,
        global = true,
        hide = true,
        default_value_t = duration_millis(TELEMETRY_REFRESH_PERIOD),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    telemetry_period_ms: u64,
    #[command(subcommand)]
    command: Command,
}

const fn duration_millis(period: Duration) -> u64 {
    period.as_secs() * 1000 + period.subsec_millis() as u64
}

#[derive(Subcommand)]
enum Command {
    /// Scheduled reminders.
    #[command(subcommand)]
    Reminders(ReminderCommand),
    /// Work and play todo lists.
    #[command(subcommand)]
    Todos(TodoCommand),
    /// Countdown events.
    #[command(subcommand)]
    Countdowns(CountdownCommand),
    /// Food-suggestion lists.
    #[command(subcommand)]
    Food(FoodCommand),
    /// Stored images.
    #[command(subcommand)]
    Images(ImageCommand),
    /// Headline counts and host usage.
    Dashboard(DashboardArgs),
    /// Message volume by hour, weekday and day.
    Usage,
    /// Probe the backend's health endpoint.
    Health,
}

#[derive(Subcommand)]
pub(crate) enum ReminderCommand {
    Ls(OwnerFilterArgs),
    Add(ReminderAddArgs),
    Rm(ReminderRemoveArgs),
}

#[derive(Subcommand)]
pub(crate) enum TodoCommand {
    Ls(OwnerFilterArgs),
    Add(TodoAddArgs),
    Done(TodoDoneArgs),
    Rm(TodoRemoveArgs),
}

#[derive(Subcommand)]
pub(crate) enum CountdownCommand {
    Ls(OwnerFilterArgs),
    Add(CountdownAddArgs),
    Rm(CountdownRemoveArgs),
    Watch(CountdownWatchArgs),
}

#[derive(Subcommand)]
pub(crate) enum FoodCommand {
    Ls(FoodListArgs),
    Add(FoodAddArgs),
    Rm(FoodRemoveArgs),
}

#[derive(Subcommand)]
pub(crate) enum ImageCommand {
    Ls(ImageListArgs),
    Upload(ImageUploadArgs),
    Get(ImageGetArgs),
    Rm(ImageRemoveArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct OwnerFilterArgs {
    #[arg(long, help = "Only show entries owned by this user id")]
    pub(crate) owner: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReminderAddArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(long, help = "Text announced when the reminder fires")]
    pub(crate) event: String,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=23))]
    pub(crate) hour: u8,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=59))]
    pub(crate) minute: u8,
    #[arg(long, help = "Chat session the reminder is delivered to")]
    pub(crate) session: String,
    #[arg(long, help = "The session is a group chat")]
    pub(crate) group: bool,
    #[arg(long, requires = "group", help = "Mention everyone in the group")]
    pub(crate) mention_all: bool,
    #[arg(long, conflicts_with_all = ["every_days", "weekdays", "date"])]
    pub(crate) daily: bool,
    #[arg(
        long,
        conflicts_with_all = ["weekdays", "date"],
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub(crate) every_days: Option<u32>,
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "date",
        value_parser = clap::value_parser!(u8).range(0..=6),
        help = "Weekdays to fire on, 0 = Monday"
    )]
    pub(crate) weekdays: Vec<u8>,
    #[arg(long, help = "One-shot date (YYYY-MM-DD)")]
    pub(crate) date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReminderRemoveArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "Scheduler job id")]
    pub(crate) job_id: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TodoAddArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "Task text")]
    pub(crate) task: String,
    #[arg(long, default_value = "work", help = "work or play")]
    pub(crate) category: TodoCategory,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TodoDoneArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "work or play")]
    pub(crate) category: TodoCategory,
    #[arg(help = "Position within the bucket, as listed")]
    pub(crate) index: usize,
    #[arg(long, help = "Mark the item as not done")]
    pub(crate) undo: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TodoRemoveArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "work or play")]
    pub(crate) category: TodoCategory,
    #[arg(help = "Position within the bucket, as listed")]
    pub(crate) index: usize,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CountdownAddArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "Event name, unique per owner")]
    pub(crate) event: String,
    #[arg(long, help = "Target time, ISO-8601 (e.g. 2025-12-31T23:59:00)")]
    pub(crate) at: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CountdownRemoveArgs {
    #[arg(help = "Owning user id")]
    pub(crate) owner: String,
    #[arg(help = "Event name")]
    pub(crate) event: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CountdownWatchArgs {
    #[arg(long, help = "Only show countdowns owned by this user id")]
    pub(crate) owner: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct FoodListArgs {
    #[arg(long, help = "Only show this list (android or apple)")]
    pub(crate) list: Option<FoodList>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FoodAddArgs {
    #[arg(help = "android or apple")]
    pub(crate) list: FoodList,
    #[arg(help = "Food to suggest")]
    pub(crate) food: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FoodRemoveArgs {
    #[arg(help = "android or apple")]
    pub(crate) list: FoodList,
    #[arg(help = "Food to remove")]
    pub(crate) food: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ImageListArgs {
    #[arg(long, help = "Only show this folder (pics, food_images, latex)")]
    pub(crate) folder: Option<ImageFolder>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ImageUploadArgs {
    #[arg(help = "Destination folder")]
    pub(crate) folder: ImageFolder,
    #[arg(help = "Image file to upload")]
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ImageGetArgs {
    #[arg(help = "Folder holding the image")]
    pub(crate) folder: ImageFolder,
    #[arg(help = "File name within the folder")]
    pub(crate) filename: String,
    #[arg(long, short = 'o', help = "Write to this path (defaults to the file name)")]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ImageRemoveArgs {
    #[arg(help = "Folder holding the image")]
    pub(crate) folder: ImageFolder,
    #[arg(help = "File name within the folder")]
    pub(crate) filename: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct DashboardArgs {
    #[arg(long, help = "Keep polling host usage until interrupted")]
    pub(crate) watch: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Reminders(ReminderCommand::Ls(_)) => "reminders_ls",
        Command::Reminders(ReminderCommand::Add(_)) => "reminders_add",
        Command::Reminders(ReminderCommand::Rm(_)) => "reminders_rm",
        Command::Todos(TodoCommand::Ls(_)) => "todos_ls",
        Command::Todos(TodoCommand::Add(_)) => "todos_add",
        Command::Todos(TodoCommand::Done(_)) => "todos_done",
        Command::Todos(TodoCommand::Rm(_)) => "todos_rm",
        Command::Countdowns(CountdownCommand::Ls(_)) => "countdowns_ls",
        Command::Countdowns(CountdownCommand::Add(_)) => "countdowns_add",
        Command::Countdowns(CountdownCommand::Rm(_)) => "countdowns_rm",
        Command::Countdowns(CountdownCommand::Watch(_)) => "countdowns_watch",
        Command::Food(FoodCommand::Ls(_)) => "food_ls",
        Command::Food(FoodCommand::Add(_)) => "food_add",
        Command::Food(FoodCommand::Rm(_)) => "food_rm",
        Command::Images(ImageCommand::Ls(_)) => "images_ls",
        Command::Images(ImageCommand::Upload(_)) => "images_upload",
        Command::Images(ImageCommand::Get(_)) => "images_get",
        Command::Images(ImageCommand::Rm(_)) => "images_rm",
        Command::Dashboard(_) => "dashboard",
        Command::Usage => "usage",
        Command::Health => "health",
    }
}
