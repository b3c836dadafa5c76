//! QueueGateway port - マネージドキューへの薄いクライアント
//!
//! # 設計原則
//! - receive は 1 件だけ要求する（バッチにしない）
//! - 呼び出し間でローカル状態を持たない
//! - リトライはしない（receive のリトライは次のループ、delete 失敗は再配送扱い）

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Envelope, GatewayError};

#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// 最大 `wait_seconds` 秒待って 1 件受信する。タイムアウト時は `Ok(None)`。
    async fn receive(&self, wait_seconds: i32) -> Result<Option<Envelope>, GatewayError>;

    /// この配送をキューから削除する。
    ///
    /// 期限切れのハンドルで再試行してはいけない。
    async fn delete(&self, envelope: &Envelope) -> Result<(), GatewayError>;
}

#[async_trait]
impl<G> QueueGateway for Arc<G>
where
    G: QueueGateway + ?Sized,
{
    async fn receive(&self, wait_seconds: i32) -> Result<Option<Envelope>, GatewayError> {
        (**self).receive(wait_seconds).await
    }

    async fn delete(&self, envelope: &Envelope) -> Result<(), GatewayError> {
        (**self).delete(envelope).await
    }
}
