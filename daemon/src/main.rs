//! Rewards daemon: administrator command line over the LMDB ledger.

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rewards_node::{init_logging, LogFormat, RewardsConfig};
use rewards_types::{Amount, Schedule, TaskPatch, VerificationMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rewards-daemon", about = "Rewards ledger administration")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "REWARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "REWARDS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Chat that receives the decision mirror and debug logs.
    #[arg(long, env = "REWARDS_ADMIN_CHAT_ID")]
    admin_chat_id: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "REWARDS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "REWARDS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Print Prometheus metrics to stderr before exiting.
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage the task catalog.
    #[command(subcommand)]
    Task(TaskAction),
    /// Inspect and moderate users.
    #[command(subcommand)]
    User(UserAction),
    /// Review manual task submissions.
    #[command(subcommand)]
    Queue(QueueAction),
    /// Review withdrawal requests.
    #[command(subcommand)]
    Withdrawal(WithdrawalAction),
    /// Import a JSON export of the legacy collections.
    Import { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ModeArg {
    Automatic,
    Manual,
}

impl From<ModeArg> for VerificationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Automatic => VerificationMode::Automatic,
            ModeArg::Manual => VerificationMode::Manual,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ScheduleArg {
    Once,
    Daily,
}

impl From<ScheduleArg> for Schedule {
    fn from(schedule: ScheduleArg) -> Self {
        match schedule {
            ScheduleArg::Once => Schedule::Once,
            ScheduleArg::Daily => Schedule::Daily,
        }
    }
}

/// Task fields an edit may change; omitted fields are unchanged.
#[derive(Args)]
pub(crate) struct TaskEdit {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    reward: Option<u64>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Daily tasks must use automatic verification.
    #[arg(long, value_enum)]
    schedule: Option<ScheduleArg>,
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    kind: Option<String>,
    #[arg(long)]
    active: Option<bool>,
}

impl TaskEdit {
    pub(crate) fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title,
            description: self.description,
            kind: self.kind,
            reward_amount: self.reward.map(Amount::new),
            verification_mode: self.mode.map(Into::into),
            schedule: self.schedule.map(Into::into),
            target: self.target,
            active: self.active,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum TaskAction {
    /// Create a task.
    Add {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        reward: u64,
        #[arg(long, value_enum, default_value_t = ModeArg::Automatic)]
        mode: ModeArg,
        /// Repeatable once per UTC day (automatic tasks only).
        #[arg(long)]
        daily: bool,
        #[arg(long, default_value = "")]
        target: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        kind: String,
        /// Create the task hidden from users.
        #[arg(long)]
        inactive: bool,
    },
    /// Edit a task; omitted fields are unchanged.
    Update {
        id: String,
        #[command(flatten)]
        edit: TaskEdit,
    },
    Delete { id: String },
    List {
        #[arg(long)]
        active_only: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum UserAction {
    Show { id: String },
    Ban { id: String },
    Unban { id: String },
    List,
}

#[derive(Subcommand)]
pub(crate) enum QueueAction {
    /// Pending submissions, oldest first.
    List,
    Approve { user: String, task: String },
    Reject { user: String, task: String },
}

#[derive(Subcommand)]
pub(crate) enum WithdrawalAction {
    /// Pending requests, newest first.
    List,
    Approve { id: String },
    Reject { id: String },
    /// All requests of one user, newest first.
    History { user: String },
}

fn load_config(cli: &Cli) -> anyhow::Result<RewardsConfig> {
    let mut config = match &cli.config {
        Some(path) => RewardsConfig::from_toml_file(path)?,
        None => RewardsConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(chat) = &cli.admin_chat_id {
        config.admin_chat_id = Some(chat.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    commands::run(&config, cli.command, cli.metrics).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_update(args: &[&str]) -> TaskPatch {
        let mut argv = vec!["rewards-daemon", "task", "update", "t1"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Task(TaskAction::Update { id, edit }) => {
                assert_eq!(id, "t1");
                edit.into_patch()
            }
            _ => panic!("expected task update"),
        }
    }

    #[test]
    fn update_can_switch_schedule() {
        let patch = task_update(&["--schedule", "daily", "--reward", "5"]);
        assert_eq!(patch.schedule, Some(Schedule::Daily));
        assert_eq!(patch.reward_amount, Some(Amount::new(5)));
        assert_eq!(patch.title, None);

        let patch = task_update(&["--schedule", "once"]);
        assert_eq!(patch.schedule, Some(Schedule::Once));
    }

    #[test]
    fn update_without_flags_is_empty() {
        assert!(task_update(&[]).is_empty());
    }

    #[test]
    fn unknown_schedule_is_refused() {
        let argv = ["rewards-daemon", "task", "update", "t1", "--schedule", "weekly"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
