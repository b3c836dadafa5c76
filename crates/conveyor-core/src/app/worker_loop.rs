//! WorkerLoop - 1 件ずつ receive → process → ack を繰り返す
//!
//! # フロー
//! 1. AckStrategy::fetch_and_process() で 1 サイクル実行
//! 2. メッセージが無ければ何もせずすぐ次の receive へ
//! 3. receive 失敗はログを出して backoff 後に次のループへ
//! 4. 処理失敗は failure callback に回して次のループへ
//!
//! ループが止まるのは failure callback が `Err` を返すか panic したときだけ。

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span};

use super::builder::WorkerBuilder;
use crate::chain::HandlerChain;
use crate::config::MAX_WAIT_SECONDS;
use crate::domain::{Cycle, WorkerError};
use crate::ports::{AckStrategy, FailureCallback, QueueGateway};

/// 1 本の受信ループ
///
/// 設定は構築後に変更されない。clone すると同じ設定の独立したワーカーになる
/// （gateway や chain は共有するが、ループ間で可変状態は共有しない）。
#[derive(Clone)]
pub struct Worker {
    pub(super) queue_url: String,
    pub(super) region: String,
    pub(super) receive_error_backoff: Duration,
    pub(super) gateway: Arc<dyn QueueGateway>,
    pub(super) strategy: Arc<dyn AckStrategy>,
    pub(super) chain: HandlerChain,
    pub(super) on_failure: Arc<dyn FailureCallback>,
    pub(super) span: Span,
}

impl Worker {
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// 永久にループする。戻るのは failure callback が失敗したときだけ。
    pub async fn run(&self) -> Result<Infallible, WorkerError> {
        self.span.in_scope(|| {
            tracing::info!(strategy = self.strategy_name(), "worker started");
        });
        loop {
            self.run_once().await.inspect_err(|err| {
                self.span
                    .in_scope(|| tracing::error!(error = %err, "worker stopped"));
            })?;
        }
    }

    /// 1 サイクルだけ実行して結果を返す
    pub async fn run_once(&self) -> Result<Cycle, WorkerError> {
        let cycle = self
            .strategy
            .fetch_and_process(self.gateway.as_ref(), &self.chain, MAX_WAIT_SECONDS)
            .instrument(self.span.clone())
            .await;

        match &cycle {
            Cycle::Empty => {
                self.span.in_scope(|| tracing::debug!("no message"));
            }
            Cycle::ReceiveFailed(err) => {
                self.span.in_scope(|| {
                    tracing::warn!(
                        error = %err,
                        backoff_ms = self.receive_error_backoff.as_millis() as u64,
                        "receive failed"
                    )
                });
                tokio::time::sleep(self.receive_error_backoff).await;
            }
            Cycle::Processed(delivery) => match &delivery.outcome {
                Ok(()) => self.span.in_scope(|| {
                    tracing::debug!(
                        message_id = delivery.envelope.message_id(),
                        deleted = delivery.ack.is_deleted(),
                        "message processed"
                    )
                }),
                Err(error) => self
                    .span
                    .in_scope(|| self.on_failure.on_failure(self, &delivery.envelope, error))
                    .map_err(WorkerError::FailureCallback)?,
            },
        }

        Ok(cycle)
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("queue_url", &self.queue_url)
            .field("region", &self.region)
            .field("strategy", &self.strategy)
            .field("receive_error_backoff", &self.receive_error_backoff)
            .finish_non_exhaustive()
    }
}
