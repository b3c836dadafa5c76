//! Cycle - 1 回の receive / process / ack の結果

use super::envelope::Envelope;
use super::errors::{GatewayError, ProcessingError};

/// delete がどうなったか
#[derive(Debug)]
pub enum AckResult {
    /// キューから削除済み
    Deleted,
    /// delete を呼んだが失敗した（再配送されうる）
    DeleteFailed(GatewayError),
    /// delete していない（visibility timeout 後に再配送される）
    Retained,
}

impl AckResult {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// 受信できた 1 件の処理結果
#[derive(Debug)]
pub struct Delivery {
    pub envelope: Envelope,
    pub outcome: Result<(), ProcessingError>,
    pub ack: AckResult,
}

/// AckStrategy::fetch_and_process の戻り値
///
/// # 状態遷移
/// `Idle → Received → {Deleting → Processing | Processing → Deleting} → Idle`
#[derive(Debug)]
pub enum Cycle {
    /// long poll がタイムアウトした（メッセージなし）
    Empty,
    /// receive 自体が失敗した
    ReceiveFailed(GatewayError),
    Processed(Delivery),
}

impl Cycle {
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Self::Processed(delivery) => Some(delivery),
            _ => None,
        }
    }
}
