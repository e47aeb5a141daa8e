//! Command execution. Every command prints its result as JSON on stdout.

use std::sync::Arc;

use anyhow::Context;
use rewards_node::{RewardsConfig, RewardsService};
use rewards_notify::LogNotifier;
use rewards_store::ingest::export_from_json;
use rewards_types::{Amount, Schedule, Task, TaskId, UserId, WithdrawalId};
use serde::Serialize;

use crate::{Command, QueueAction, TaskAction, UserAction, WithdrawalAction};

pub(crate) async fn run(
    config: &RewardsConfig,
    command: Command,
    print_metrics: bool,
) -> anyhow::Result<()> {
    let service = RewardsService::open(config, Arc::new(LogNotifier))
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;

    let result = execute(&service, command).await;

    // Deliver whatever the command queued before reporting.
    service.flush_notifications().await?;
    if print_metrics {
        eprintln!("{}", service.metrics().encode()?);
    }
    service.shutdown().await?;
    result
}

async fn execute(service: &RewardsService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Task(action) => task(service, action).await,
        Command::User(action) => user(service, action).await,
        Command::Queue(action) => queue(service, action).await,
        Command::Withdrawal(action) => withdrawal(service, action).await,
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("parsing import file")?;
            let export = export_from_json(&value)?;
            let summary = service.import(&export).await?;
            print(&serde_json::json!({
                "tasks": summary.tasks,
                "users": summary.users,
                "withdrawals": summary.withdrawals,
            }))
        }
    }
}

async fn task(service: &RewardsService, action: TaskAction) -> anyhow::Result<()> {
    let catalog = service.catalog();
    match action {
        TaskAction::Add {
            id,
            title,
            reward,
            mode,
            daily,
            target,
            description,
            kind,
            inactive,
        } => {
            let mut task = Task::new(id, title, Amount::new(reward), mode.into()).with_target(target);
            if daily {
                task = task.with_schedule(Schedule::Daily);
            }
            task.description = description;
            task.kind = kind;
            task.active = !inactive;
            print(&catalog.create(task).await?)
        }
        TaskAction::Update { id, edit } => {
            print(&catalog.update(&TaskId::new(id), edit.into_patch()).await?)
        }
        TaskAction::Delete { id } => {
            catalog.delete(&TaskId::new(id.as_str())).await?;
            print(&serde_json::json!({ "deleted": id }))
        }
        TaskAction::List { active_only } => print(&catalog.list(active_only).await?),
    }
}

async fn user(service: &RewardsService, action: UserAction) -> anyhow::Result<()> {
    let ledger = service.ledger();
    match action {
        UserAction::Show { id } => print(&ledger.get(&UserId::new(id)).await?),
        UserAction::Ban { id } => print(&ledger.set_banned(&UserId::new(id), true).await?),
        UserAction::Unban { id } => print(&ledger.set_banned(&UserId::new(id), false).await?),
        UserAction::List => print(&ledger.list_users().await?),
    }
}

async fn queue(service: &RewardsService, action: QueueAction) -> anyhow::Result<()> {
    match action {
        QueueAction::List => print(&service.list_pending().await?),
        QueueAction::Approve { user, task } => print(
            &service
                .approve_submission(&UserId::new(user), &TaskId::new(task))
                .await?,
        ),
        QueueAction::Reject { user, task } => print(
            &service
                .reject_submission(&UserId::new(user), &TaskId::new(task))
                .await?,
        ),
    }
}

async fn withdrawal(service: &RewardsService, action: WithdrawalAction) -> anyhow::Result<()> {
    match action {
        WithdrawalAction::List => print(&service.withdrawals().pending().await?),
        WithdrawalAction::Approve { id } => {
            print(&service.approve_withdrawal(&WithdrawalId::new(id)).await?)
        }
        WithdrawalAction::Reject { id } => {
            print(&service.reject_withdrawal(&WithdrawalId::new(id)).await?)
        }
        WithdrawalAction::History { user } => print(
            &service
                .withdrawals()
                .history_for_user(&UserId::new(user))
                .await?,
        ),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
