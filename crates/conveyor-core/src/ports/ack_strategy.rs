//! AckStrategy port - 「処理」と「削除」の順序を決める
//!
//! # 組み込み実装
//! - `ProcessThenDelete`: 成功時のみ削除（at-least-once、handler は冪等であるべき）
//! - `DeleteThenProcess`: 先に削除（at-most-once、失敗しても再配送されない）

use std::fmt;

use async_trait::async_trait;

use crate::chain::HandlerChain;
use crate::domain::{AckResult, Cycle, Envelope};
use crate::ports::QueueGateway;

/// AckStrategy は 1 サイクル分の receive → process → ack を実行する
///
/// gateway と chain への参照以外に状態を持たない。
/// handler の失敗は `Cycle::Processed` の `outcome` に入れて返し、
/// failure callback の呼び出しは Worker に任せる。
#[async_trait]
pub trait AckStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    async fn fetch_and_process(
        &self,
        gateway: &dyn QueueGateway,
        chain: &HandlerChain,
        wait_seconds: i32,
    ) -> Cycle;
}

/// どの strategy でも共通の「1 件受信」部分
///
/// メッセージが無い場合・受信に失敗した場合は、そのまま返すべき `Cycle` を `Err` で返す。
pub(crate) async fn receive_one(
    gateway: &dyn QueueGateway,
    wait_seconds: i32,
) -> Result<Envelope, Cycle> {
    match gateway.receive(wait_seconds).await {
        Ok(Some(envelope)) => Ok(envelope),
        Ok(None) => Err(Cycle::Empty),
        Err(err) => Err(Cycle::ReceiveFailed(err)),
    }
}

/// delete して結果を `AckResult` にする。失敗はログに出すだけで伝播しない。
pub(crate) async fn delete_one(gateway: &dyn QueueGateway, envelope: &Envelope) -> AckResult {
    match gateway.delete(envelope).await {
        Ok(()) => {
            tracing::debug!("deleted from queue");
            AckResult::Deleted
        }
        Err(err) => {
            tracing::error!(error = %err, "delete failed; message may be redelivered");
            AckResult::DeleteFailed(err)
        }
    }
}

pub(crate) fn delivery_span(envelope: &Envelope) -> tracing::Span {
    tracing::info_span!(
        "delivery",
        message_id = envelope.message_id(),
        receive_count = envelope.receive_count()
    )
}
