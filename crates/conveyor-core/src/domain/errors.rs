//! Errors - エラー型と分類
//!
//! - `GatewayError`: receive / delete の失敗（ループの外には出さない）
//! - `ProcessingError`: handler chain 内の失敗（必ず failure callback に回る）
//! - `ConfigurationError`: 起動時の設定不足（run() の前に失敗する）
//! - `WorkerError`: run() が返しうる唯一のエラー

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// ErrorKind は処理エラーの運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 再配送で成功しうる
    Transient,
    /// 何度やっても同じ結果になる（decode 失敗など）
    Permanent,
    /// キューサービス側の障害
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("receive failed: {0}")]
    Receive(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("receipt handle is invalid or expired: {0}")]
    InvalidReceiptHandle(String),

    #[error("message was delivered without a receipt handle")]
    MissingReceiptHandle,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Infrastructure
    }
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("no route for key {0:?}")]
    NoRoute(Option<String>),

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl ProcessingError {
    /// 任意のエラーを handler 失敗として包む
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) | Self::NoRoute(_) => ErrorKind::Permanent,
            Self::Handler(_) | Self::Panicked(_) => ErrorKind::Transient,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failure callback faulted: {0}")]
    FailureCallback(#[source] BoxError),

    /// worker の task が panic した（failure callback の panic など）
    #[error("worker task aborted: {0}")]
    Aborted(String),
}
