//! WorkerBuilder - Worker の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - queue_url / region / gateway / chain が無ければ `build()` が `ConfigurationError` を返す
//! - strategy は省略時 `ProcessThenDelete`、failure callback は省略時 `LogAndDump`
//! - 一度作った Worker の設定は変更できない

use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use super::worker_loop::Worker;
use crate::chain::HandlerChain;
use crate::config::{AckMode, WorkerConfig};
use crate::domain::ConfigurationError;
use crate::impls::{LogAndDump, ProcessThenDelete};
use crate::ports::{AckStrategy, FailureCallback, QueueGateway};

/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::from_config(&config)
///     .gateway(SqsGateway::connect(&config).await)
///     .chain(chain)
///     .build()?;
/// worker.run().await?;
/// ```
#[derive(Default)]
pub struct WorkerBuilder {
    queue_url: Option<String>,
    region: Option<String>,
    receive_error_backoff: Option<Duration>,
    gateway: Option<Arc<dyn QueueGateway>>,
    strategy: Option<Arc<dyn AckStrategy>>,
    chain: Option<HandlerChain>,
    on_failure: Option<Arc<dyn FailureCallback>>,
    span: Option<Span>,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// queue_url / region / ack_mode / backoff を設定から埋める
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new()
            .queue_url(config.queue_url.clone())
            .region(config.region.clone())
            .ack_mode(config.ack_mode)
            .receive_error_backoff(config.receive_error_backoff)
    }

    pub fn queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn receive_error_backoff(mut self, backoff: Duration) -> Self {
        self.receive_error_backoff = Some(backoff);
        self
    }

    pub fn gateway<G>(mut self, gateway: G) -> Self
    where
        G: QueueGateway + 'static,
    {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    pub fn strategy<S>(mut self, strategy: S) -> Self
    where
        S: AckStrategy + 'static,
    {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn ack_mode(mut self, mode: AckMode) -> Self {
        self.strategy = Some(mode.strategy());
        self
    }

    pub fn chain(mut self, chain: HandlerChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: FailureCallback + 'static,
    {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    /// ログ出力に使う span（省略時は queue と region を持つ `worker` span）
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<Worker, ConfigurationError> {
        let queue_url = self
            .queue_url
            .filter(|q| !q.trim().is_empty())
            .ok_or(ConfigurationError::Missing("queue_url"))?;
        let region = self
            .region
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigurationError::Missing("region"))?;
        let gateway = self.gateway.ok_or(ConfigurationError::Missing("gateway"))?;
        let chain = self.chain.ok_or(ConfigurationError::Missing("chain"))?;

        let span = self.span.unwrap_or_else(|| {
            tracing::info_span!("worker", queue = %queue_url, region = %region)
        });

        Ok(Worker {
            queue_url,
            region,
            receive_error_backoff: self
                .receive_error_backoff
                .unwrap_or(Duration::from_secs(1)),
            gateway,
            strategy: self.strategy.unwrap_or_else(|| Arc::new(ProcessThenDelete)),
            chain,
            on_failure: self.on_failure.unwrap_or_else(|| Arc::new(LogAndDump)),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBuilder;
    use crate::impls::InMemoryQueue;
    use crate::testing::{Journal, tagging_terminal};

    fn chain() -> HandlerChain {
        ChainBuilder::new(tagging_terminal(Journal::default(), Ok(()))).build()
    }

    #[test]
    fn defaults_are_process_then_delete() {
        let worker = WorkerBuilder::new()
            .queue_url("q")
            .region("us-east-1")
            .gateway(InMemoryQueue::new())
            .chain(chain())
            .build()
            .unwrap();

        assert_eq!(worker.strategy_name(), "process-then-delete");
        assert_eq!(worker.queue_url(), "q");
        assert_eq!(worker.region(), "us-east-1");
    }

    #[test]
    fn from_config_picks_ack_mode() {
        let mut config = WorkerConfig::new("q", "eu-west-1");
        config.ack_mode = AckMode::DeleteThenProcess;

        let worker = WorkerBuilder::from_config(&config)
            .gateway(InMemoryQueue::new())
            .chain(chain())
            .build()
            .unwrap();

        assert_eq!(worker.strategy_name(), "delete-then-process");
    }

    #[test]
    fn missing_parameters_fail_at_build() {
        let err = WorkerBuilder::new()
            .region("r")
            .gateway(InMemoryQueue::new())
            .chain(chain())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("queue_url"));

        let err = WorkerBuilder::new()
            .queue_url("q")
            .gateway(InMemoryQueue::new())
            .chain(chain())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("region"));

        let err = WorkerBuilder::new()
            .queue_url("q")
            .region("r")
            .chain(chain())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("gateway"));

        let err = WorkerBuilder::new()
            .queue_url("q")
            .region("r")
            .gateway(InMemoryQueue::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("chain"));
    }
}
