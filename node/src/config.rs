//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rewards_ledger::DEFAULT_CHECK_IN_TASK;
use rewards_notify::DispatchConfig;
use rewards_types::{Amount, TaskId};

use crate::{LogFormat, NodeError};

/// Configuration for the rewards service.
///
/// Can be loaded from a TOML file via [`RewardsConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Chat that receives the decision mirror and debug logs.
    #[serde(default)]
    pub admin_chat_id: Option<String>,

    /// Currency symbol shown in messages.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Send decision messages to the affected user.
    #[serde(default = "default_true")]
    pub notify_users: bool,

    /// Mirror every decision to the admin chat.
    #[serde(default = "default_true")]
    pub mirror_to_admin: bool,

    /// Task completed by the daily check-in.
    #[serde(default = "default_check_in_task_id")]
    pub check_in_task_id: String,

    /// Smallest withdrawal a user may request.
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./rewards_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_currency() -> String {
    "STON".to_string()
}

fn default_true() -> bool {
    true
}

fn default_check_in_task_id() -> String {
    DEFAULT_CHECK_IN_TASK.to_string()
}

fn default_min_withdrawal() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl RewardsConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NodeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if let Some(chat) = &self.admin_chat_id {
            if chat.trim().is_empty() {
                return Err(NodeError::Config("admin_chat_id must not be empty".into()));
            }
        }
        if self.min_withdrawal == 0 {
            return Err(NodeError::Config("min_withdrawal must be positive".into()));
        }
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("map_size_mb must be positive".into()));
        }
        if self.check_in_task_id.trim().is_empty() {
            return Err(NodeError::Config("check_in_task_id must not be empty".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(NodeError::Config("currency must not be empty".into()));
        }
        Ok(())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn min_withdrawal(&self) -> Amount {
        Amount::new(self.min_withdrawal)
    }

    pub fn check_in_task(&self) -> TaskId {
        TaskId::new(self.check_in_task_id.trim())
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            admin_chat_id: self.admin_chat_id.clone(),
            notify_users: self.notify_users,
            mirror_to_admin: self.mirror_to_admin,
            currency: self.currency.clone(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            admin_chat_id: None,
            currency: default_currency(),
            notify_users: default_true(),
            mirror_to_admin: default_true(),
            check_in_task_id: default_check_in_task_id(),
            min_withdrawal: default_min_withdrawal(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
