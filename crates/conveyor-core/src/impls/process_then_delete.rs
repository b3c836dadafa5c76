//! ProcessThenDelete - 処理が成功したときだけ削除する
//!
//! `Received → Processing → Deleting → Idle`。
//! 失敗したら削除せずに `Idle` に戻るので、visibility timeout 後に再配送される
//! （再配送上限を超えたら DLQ に行くが、それはキューサービス側の仕事）。

use async_trait::async_trait;
use tracing::Instrument;

use crate::chain::HandlerChain;
use crate::domain::{AckResult, Cycle, Delivery};
use crate::ports::QueueGateway;
use crate::ports::ack_strategy::{AckStrategy, delete_one, delivery_span, receive_one};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessThenDelete;

#[async_trait]
impl AckStrategy for ProcessThenDelete {
    fn name(&self) -> &'static str {
        "process-then-delete"
    }

    async fn fetch_and_process(
        &self,
        gateway: &dyn QueueGateway,
        chain: &HandlerChain,
        wait_seconds: i32,
    ) -> Cycle {
        let envelope = match receive_one(gateway, wait_seconds).await {
            Ok(envelope) => envelope,
            Err(cycle) => return cycle,
        };

        let span = delivery_span(&envelope);
        async move {
            let outcome = chain.invoke(&envelope).await;
            let ack = match &outcome {
                Ok(()) => delete_one(gateway, &envelope).await,
                Err(_) => AckResult::Retained,
            };
            Cycle::Processed(Delivery {
                envelope,
                outcome,
                ack,
            })
        }
        .instrument(span)
        .await
    }
}
