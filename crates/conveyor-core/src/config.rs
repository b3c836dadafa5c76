//! WorkerConfig - 起動時に 1 回だけ読む設定
//!
//! | env var | 必須 | デフォルト |
//! |---|---|---|
//! | `CONVEYOR_QUEUE_URL` | yes | |
//! | `AWS_REGION` | yes | |
//! | `CONVEYOR_ENDPOINT_URL` | no | なし |
//! | `CONVEYOR_ACK_MODE` | no | `process-then-delete` |
//! | `CONVEYOR_RECEIVE_BACKOFF_MS` | no | 1000 |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigurationError;
use crate::impls::{DeleteThenProcess, ProcessThenDelete};
use crate::ports::AckStrategy;

/// long poll の待ち時間。SQS の上限（20 秒）で固定。
pub const MAX_WAIT_SECONDS: i32 = 20;

pub const QUEUE_URL_VAR: &str = "CONVEYOR_QUEUE_URL";
pub const REGION_VAR: &str = "AWS_REGION";
pub const ENDPOINT_URL_VAR: &str = "CONVEYOR_ENDPOINT_URL";
pub const ACK_MODE_VAR: &str = "CONVEYOR_ACK_MODE";
pub const RECEIVE_BACKOFF_VAR: &str = "CONVEYOR_RECEIVE_BACKOFF_MS";

const DEFAULT_RECEIVE_BACKOFF: Duration = Duration::from_millis(1000);

/// 組み込みの ack strategy の選択肢
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AckMode {
    #[default]
    ProcessThenDelete,
    DeleteThenProcess,
}

impl AckMode {
    pub fn strategy(self) -> Arc<dyn AckStrategy> {
        match self {
            Self::ProcessThenDelete => Arc::new(ProcessThenDelete),
            Self::DeleteThenProcess => Arc::new(DeleteThenProcess),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessThenDelete => "process-then-delete",
            Self::DeleteThenProcess => "delete-then-process",
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process-then-delete" | "process-first" => Ok(Self::ProcessThenDelete),
            "delete-then-process" | "delete-first" => Ok(Self::DeleteThenProcess),
            _ => Err(ConfigurationError::Invalid {
                name: ACK_MODE_VAR,
                value: s.to_string(),
                reason: "expected process-then-delete or delete-then-process".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub queue_url: String,
    pub region: String,
    /// LocalStack などを使う場合の endpoint
    pub endpoint_url: Option<String>,
    pub ack_mode: AckMode,
    /// receive が失敗したときに次の receive まで空ける時間
    pub receive_error_backoff: Duration,
}

impl WorkerConfig {
    pub fn new(queue_url: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            region: region.into(),
            endpoint_url: None,
            ack_mode: AckMode::default(),
            receive_error_backoff: DEFAULT_RECEIVE_BACKOFF,
        }
    }

    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `lookup` から値を読む（空文字は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let queue_url = get(QUEUE_URL_VAR).ok_or(ConfigurationError::Missing(QUEUE_URL_VAR))?;
        let region = get(REGION_VAR).ok_or(ConfigurationError::Missing(REGION_VAR))?;

        let ack_mode = match get(ACK_MODE_VAR) {
            Some(v) => v.parse()?,
            None => AckMode::default(),
        };

        let receive_error_backoff = match get(RECEIVE_BACKOFF_VAR) {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigurationError::Invalid {
                    name: RECEIVE_BACKOFF_VAR,
                    value: v.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_RECEIVE_BACKOFF,
        };

        Ok(Self {
            queue_url,
            region,
            endpoint_url: get(ENDPOINT_URL_VAR),
            ack_mode,
            receive_error_backoff,
        })
    }
}
