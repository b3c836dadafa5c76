//! DeleteThenProcess - 受信したら先に削除してから処理する
//!
//! `Received → Deleting → Processing → Idle`。
//! delete の成否に関係なく処理は行う。処理が失敗してもメッセージは既に無いので再配送されない。

use async_trait::async_trait;
use tracing::Instrument;

use crate::chain::HandlerChain;
use crate::domain::{Cycle, Delivery};
use crate::ports::QueueGateway;
use crate::ports::ack_strategy::{AckStrategy, delete_one, delivery_span, receive_one};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteThenProcess;

#[async_trait]
impl AckStrategy for DeleteThenProcess {
    fn name(&self) -> &'static str {
        "delete-then-process"
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
            let ack = delete_one(gateway, &envelope).await;
            let outcome = chain.invoke(&envelope).await;
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

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::chain::ChainBuilder;
    use crate::domain::{AckResult, Envelope};
    use crate::testing::{Journal, ScriptedGateway, tagging_terminal};

    #[rstest]
    #[case::handler_succeeds(Ok(()))]
    #[case::handler_fails(Err("bad".to_string()))]
    #[tokio::test]
    async fn deletes_once_before_handler(#[case] result: Result<(), String>) {
        let journal = Journal::default();
        let gateway = ScriptedGateway::new(journal.clone()).deliver(Envelope::new("{}", "rh-1"));
        let expect_ok = result.is_ok();
        let chain = ChainBuilder::new(tagging_terminal(journal.clone(), result)).build();

        let cycle = DeleteThenProcess.fetch_and_process(&gateway, &chain, 20).await;

        let delivery = cycle.delivery().unwrap();
        assert!(delivery.ack.is_deleted());
        assert_eq!(delivery.outcome.is_ok(), expect_ok);
        assert_eq!(journal.entries(), vec!["receive", "delete", "terminal"]);
    }

    #[tokio::test]
    async fn handler_runs_even_if_delete_fails() {
        let journal = Journal::default();
        let gateway = ScriptedGateway::new(journal.clone())
            .deliver(Envelope::new("{}", "rh-1"))
            .failing_deletes();
        let chain = ChainBuilder::new(tagging_terminal(journal.clone(), Ok(()))).build();

        let cycle = DeleteThenProcess.fetch_and_process(&gateway, &chain, 20).await;

        let delivery = cycle.delivery().unwrap();
        assert!(matches!(delivery.ack, AckResult::DeleteFailed(_)));
        assert!(delivery.outcome.is_ok());
        assert_eq!(journal.entries(), vec!["receive", "delete", "terminal"]);
    }

    #[tokio::test]
    async fn receive_failure_is_returned() {
        let journal = Journal::default();
        let gateway = ScriptedGateway::new(journal.clone()).receive_error("throttled");
        let chain = ChainBuilder::new(tagging_terminal(journal.clone(), Ok(()))).build();

        let cycle = DeleteThenProcess.fetch_and_process(&gateway, &chain, 20).await;

        assert!(matches!(cycle, Cycle::ReceiveFailed(_)));
        assert_eq!(journal.count("terminal"), 0);
        assert_eq!(journal.count("delete"), 0);
    }
}
