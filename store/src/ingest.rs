//! Ingestion boundary: loosely shaped legacy records in, strict schema out.
//!
//! Records exported from the old document store come in several shapes
//! (`reward` vs `rewardAmount`, a `tasks` map vs a `completedTaskIds` array,
//! Firestore `{seconds, nanoseconds}` timestamps, float balances, numeric
//! chat ids). Every alternative is resolved here, once. Nothing past this
//! module ever looks at a `serde_json::Value`.

use rewards_types::{
    Amount, PendingSnapshot, Schedule, Task, TaskId, Timestamp, UserAccount, UserId,
    VerificationMode, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("{record} record is not a JSON object")]
    NotAnObject { record: &'static str },

    #[error("{record} record is missing field `{field}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("{record} record has invalid `{field}`: {reason}")]
    InvalidField {
        record: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// A full export: the three logical collections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Export {
    pub tasks: Vec<Task>,
    pub users: Vec<UserAccount>,
    pub withdrawals: Vec<WithdrawalRequest>,
}

/// Normalize an export of the form `{"tasks": [...], "users": [...], "withdrawals": [...]}`.
///
/// Tasks are read first so that user records can fill missing pending
/// snapshots from the task definitions.
pub fn export_from_json(value: &Value) -> Result<Export, IngestError> {
    let root = object(value, "export")?;
    let mut export = Export::default();

    for raw in array(root, "tasks") {
        export.tasks.push(task_from_json(raw)?);
    }
    let catalog: HashMap<TaskId, Task> = export
        .tasks
        .iter()
        .map(|t| (t.id.clone(), t.clone()))
        .collect();
    for raw in array(root, "users") {
        export.users.push(user_from_json(raw, &catalog)?);
    }
    for raw in array(root, "withdrawals") {
        export.withdrawals.push(withdrawal_from_json(raw)?);
    }
    Ok(export)
}

pub fn task_from_json(value: &Value) -> Result<Task, IngestError> {
    const R: &str = "task";
    let obj = object(value, R)?;

    let id = required_string(obj, R, "id", &["id"])?;
    let title = required_string(obj, R, "title", &["title", "name"])?;
    let reward = amount(obj, R, "reward", &["rewardAmount", "reward"])?.unwrap_or(Amount::ZERO);
    let mode = match string(obj, &["verificationMode", "verificationType"]) {
        None => VerificationMode::Automatic,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "manual" => VerificationMode::Manual,
            "auto" | "automatic" => VerificationMode::Automatic,
            other => {
                return Err(IngestError::InvalidField {
                    record: R,
                    field: "verificationMode",
                    reason: format!("unknown mode `{other}`"),
                })
            }
        },
    };
    let kind = string(obj, &["kind", "type"]).unwrap_or_default();
    let schedule = match string(obj, &["schedule"]).as_deref() {
        Some("daily") => Schedule::Daily,
        Some("once") => Schedule::Once,
        None if kind == "daily_checkin" => Schedule::Daily,
        None => Schedule::Once,
        Some(other) => {
            return Err(IngestError::InvalidField {
                record: R,
                field: "schedule",
                reason: format!("unknown schedule `{other}`"),
            })
        }
    };

    Ok(Task {
        id: TaskId::new(id),
        title,
        description: string(obj, &["description"]).unwrap_or_default(),
        kind,
        reward_amount: reward,
        verification_mode: mode,
        schedule,
        target: string(obj, &["target", "link", "url"]).unwrap_or_default(),
        active: boolean(obj, &["active"]).unwrap_or(true),
    })
}

/// Normalize a user record.
///
/// `catalog` supplies snapshots for pending entries that were queued before
/// snapshots were recorded. A pending entry with neither a recorded
/// snapshot nor a known task is refused, since its reward is unknowable.
pub fn user_from_json(
    value: &Value,
    catalog: &HashMap<TaskId, Task>,
) -> Result<UserAccount, IngestError> {
    const R: &str = "user";
    let obj = object(value, R)?;

    let id = UserId::new(required_string(obj, R, "id", &["id", "telegramId"])?);
    let joined_at = timestamp(obj, &["joinedAt"]).unwrap_or(Timestamp::EPOCH);
    let last_check_in = timestamp(obj, &["lastCheckIn"]);

    let mut completed: BTreeSet<TaskId> = BTreeSet::new();
    if let Some(Value::Object(done)) = obj.get("tasks") {
        completed.extend(
            done.iter()
                .filter(|(_, v)| v.as_bool().unwrap_or(false))
                .map(|(k, _)| TaskId::new(k.as_str())),
        );
    }
    if let Some(Value::Array(ids)) = obj.get("completedTaskIds") {
        completed.extend(ids.iter().filter_map(scalar_string).map(TaskId::new));
    }

    let mut daily_claims = BTreeMap::new();
    completed.retain(|task| match catalog.get(task) {
        Some(def) if def.schedule == Schedule::Daily => {
            if let Some(at) = last_check_in {
                daily_claims.insert(task.clone(), at.day_number());
            }
            false
        }
        _ => true,
    });

    let pending = pending_entries(obj, catalog)?
        .into_iter()
        .filter(|(task, _)| !completed.contains(task))
        .collect();

    let balance = amount(obj, R, "balance", &["balance"])?.unwrap_or(Amount::ZERO);
    let username = string(obj, &["username"]).or_else(|| string(obj, &["firstName"]));
    let wallet = string(obj, &["walletAddress", "wallet"]).filter(|w| !w.trim().is_empty());

    Ok(UserAccount {
        id,
        username,
        balance,
        completed_task_ids: completed,
        pending_verification: pending,
        daily_claims,
        debited_withdrawals: BTreeSet::new(),
        is_banned: boolean(obj, &["isBanned"]).unwrap_or(false),
        wallet_address: wallet,
        joined_at,
    })
}

fn pending_entries(
    obj: &Map<String, Value>,
    catalog: &HashMap<TaskId, Task>,
) -> Result<BTreeMap<TaskId, PendingSnapshot>, IngestError> {
    const R: &str = "user";
    let mut pending = BTreeMap::new();

    // Current shape: a map of snapshots.
    if let Some(Value::Object(entries)) = obj.get("pendingVerification") {
        for (task, raw) in entries {
            let snap = snapshot(raw)?;
            pending.insert(TaskId::new(task.as_str()), snap);
        }
    }

    // Legacy shape: an id array, with optional details keyed by id. Details
    // left behind by a rejection (id no longer in the array) are ignored.
    if let Some(Value::Array(ids)) = obj.get("pendingVerificationTasks") {
        let details = match obj.get("pendingVerificationDetails") {
            Some(Value::Object(d)) => Some(d),
            _ => None,
        };
        for task in ids.iter().filter_map(scalar_string).map(TaskId::new) {
            if pending.contains_key(&task) {
                continue;
            }
            let snap = match details.and_then(|d| d.get(task.as_str())) {
                Some(raw) => snapshot(raw)?,
                None => match catalog.get(&task) {
                    Some(def) => def.snapshot(Timestamp::EPOCH),
                    None => {
                        return Err(IngestError::InvalidField {
                            record: R,
                            field: "pendingVerificationTasks",
                            reason: format!("no snapshot and no task definition for `{task}`"),
                        })
                    }
                },
            };
            pending.insert(task, snap);
        }
    }
    Ok(pending)
}

fn snapshot(value: &Value) -> Result<PendingSnapshot, IngestError> {
    const R: &str = "pending snapshot";
    let obj = object(value, R)?;
    Ok(PendingSnapshot {
        title: string(obj, &["title"]).unwrap_or_default(),
        reward_amount: amount(obj, R, "reward", &["rewardAmount", "reward"])?
            .ok_or(IngestError::MissingField { record: R, field: "reward" })?,
        target: string(obj, &["target"]).unwrap_or_default(),
        submitted_at: timestamp(obj, &["submittedAt"]).unwrap_or(Timestamp::EPOCH),
    })
}

pub fn withdrawal_from_json(value: &Value) -> Result<WithdrawalRequest, IngestError> {
    const R: &str = "withdrawal";
    let obj = object(value, R)?;

    let amount = amount(obj, R, "amount", &["amount"])?
        .ok_or(IngestError::MissingField { record: R, field: "amount" })?;
    if amount.is_zero() {
        return Err(IngestError::InvalidField {
            record: R,
            field: "amount",
            reason: "must be positive".into(),
        });
    }
    let status = match string(obj, &["status"]).as_deref() {
        Some("pending") | None => WithdrawalStatus::Pending,
        Some("approved") => WithdrawalStatus::Approved,
        Some("rejected") => WithdrawalStatus::Rejected,
        Some(other) => {
            return Err(IngestError::InvalidField {
                record: R,
                field: "status",
                reason: format!("unknown status `{other}`"),
            })
        }
    };
    let decided_at = match status {
        WithdrawalStatus::Pending => None,
        _ => timestamp(obj, &["decidedAt", "approvedAt", "rejectedAt"]),
    };

    Ok(WithdrawalRequest {
        id: WithdrawalId::new(required_string(obj, R, "id", &["id"])?),
        user_id: UserId::new(required_string(obj, R, "userId", &["userId"])?),
        username: string(obj, &["username"]),
        amount,
        wallet_address: required_string(obj, R, "walletAddress", &["walletAddress", "wallet"])?,
        balance_snapshot: amount_lenient(obj, &["balanceSnapshot", "userBalance"]),
        status,
        created_at: timestamp(obj, &["createdAt"]).unwrap_or(Timestamp::EPOCH),
        decided_at,
    })
}

// ── Field readers ──────────────────────────────────────────────────────

fn object<'a>(value: &'a Value, record: &'static str) -> Result<&'a Map<String, Value>, IngestError> {
    value.as_object().ok_or(IngestError::NotAnObject { record })
}

fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Strings and numbers both read as strings (chat ids are often numeric).
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(scalar_string))
}

fn required_string(
    obj: &Map<String, Value>,
    record: &'static str,
    field: &'static str,
    keys: &[&str],
) -> Result<String, IngestError> {
    string(obj, keys)
        .filter(|s| !s.trim().is_empty())
        .ok_or(IngestError::MissingField { record, field })
}

fn boolean(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_bool))
}

/// Integers, whole non-negative floats, and numeric strings.
fn amount(
    obj: &Map<String, Value>,
    record: &'static str,
    field: &'static str,
    keys: &[&str],
) -> Result<Option<Amount>, IngestError> {
    let Some(raw) = keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null())) else {
        return Ok(None);
    };
    let invalid = |reason: &str| IngestError::InvalidField {
        record,
        field,
        reason: reason.to_string(),
    };
    let parsed = match raw {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => whole(n.as_f64().ok_or_else(|| invalid("not a number"))?)
                .ok_or_else(|| invalid("must be a whole non-negative number"))?,
        },
        Value::String(s) => {
            let f: f64 = s.trim().parse().map_err(|_| invalid("not a number"))?;
            whole(f).ok_or_else(|| invalid("must be a whole non-negative number"))?
        }
        _ => return Err(invalid("not a number")),
    };
    Ok(Some(Amount::new(parsed)))
}

fn amount_lenient(obj: &Map<String, Value>, keys: &[&str]) -> Amount {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().and_then(whole)))
        .map(Amount::new)
        .unwrap_or(Amount::ZERO)
}

fn whole(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// Seconds as a number, or `{seconds}` / `{_seconds}` objects.
fn timestamp(obj: &Map<String, Value>, keys: &[&str]) -> Option<Timestamp> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_u64().map(Timestamp::new),
        Value::Object(ts) => ts
            .get("seconds")
            .or_else(|| ts.get("_seconds"))
            .and_then(Value::as_u64)
            .map(Timestamp::new),
        _ => None,
    })
}
