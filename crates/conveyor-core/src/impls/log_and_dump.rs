//! LogAndDump - デフォルトの failure callback
//!
//! エラーと Envelope 全体（JSON）を error レベルで出すだけ。失敗しない。

use crate::app::Worker;
use crate::domain::{BoxError, Envelope, ProcessingError};
use crate::ports::FailureCallback;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndDump;

impl LogAndDump {
    pub(crate) fn dump(envelope: &Envelope) -> String {
        serde_json::to_string(envelope)
            .unwrap_or_else(|e| format!("<unserializable envelope: {e}> {envelope:?}"))
    }
}

impl FailureCallback for LogAndDump {
    fn on_failure(
        &self,
        worker: &Worker,
        envelope: &Envelope,
        error: &ProcessingError,
    ) -> Result<(), BoxError> {
        tracing::error!(
            queue = worker.queue_url(),
            strategy = worker.strategy_name(),
            message_id = envelope.message_id(),
            kind = ?error.kind(),
            error = %error,
            envelope = %Self::dump(envelope),
            "message processing failed"
        );
        Ok(())
    }
}
