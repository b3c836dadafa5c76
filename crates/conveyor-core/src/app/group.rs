//! WorkerGroup - 独立したワーカーを複数本動かす
//!
//! 並列化はワーカーを増やすことで行う。ワーカー同士は何も協調しない
//! （同じメッセージの排他は visibility timeout に任せる）。

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::worker_loop::Worker;
use crate::domain::WorkerError;

/// 複数ワーカーのハンドル
///
/// - `request_shutdown()` 後、各ワーカーは実行中のサイクルを終えてから止まる
/// - long poll の途中で打ち切ることはしない
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<Result<(), WorkerError>>>,
}

impl WorkerGroup {
    /// `worker` の clone を `n` 本 spawn する
    pub fn spawn(n: usize, worker: &Worker) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for instance in 0..n {
            let span = tracing::info_span!(parent: worker.span(), "instance", instance);
            let worker = worker.clone().with_span(span);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(run_until_shutdown(worker, rx)));
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// shutdown を要求して全ワーカーの終了を待つ
    pub async fn shutdown_and_join(self) -> Vec<Result<(), WorkerError>> {
        self.request_shutdown();
        let mut results = Vec::with_capacity(self.joins.len());
        for join in self.joins {
            results.push(match join.await {
                Ok(result) => result,
                Err(err) => Err(WorkerError::Aborted(err.to_string())),
            });
        }
        results
    }
}

async fn run_until_shutdown(
    worker: Worker,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), WorkerError> {
    while !*shutdown_rx.borrow() {
        worker.run_once().await?;
    }
    worker
        .span()
        .in_scope(|| tracing::info!("worker shut down"));
    Ok(())
}
