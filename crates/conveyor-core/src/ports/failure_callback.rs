//! FailureCallback port - 処理失敗時のフック
//!
//! デフォルト実装は `impls::LogAndDump`。
//! `Err` を返す（あるいは panic する）とワーカーのループは終了する。
//! これがシステム全体で唯一の致命的な経路。

use crate::app::Worker;
use crate::domain::{BoxError, Envelope, ProcessingError};

pub trait FailureCallback: Send + Sync {
    fn on_failure(
        &self,
        worker: &Worker,
        envelope: &Envelope,
        error: &ProcessingError,
    ) -> Result<(), BoxError>;
}

impl<F> FailureCallback for F
where
    F: Fn(&Worker, &Envelope, &ProcessingError) -> Result<(), BoxError> + Send + Sync,
{
    fn on_failure(
        &self,
        worker: &Worker,
        envelope: &Envelope,
        error: &ProcessingError,
    ) -> Result<(), BoxError> {
        self(worker, envelope, error)
    }
}
