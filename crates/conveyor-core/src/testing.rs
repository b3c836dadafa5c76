//! テスト用の double（cfg(test) のみ）

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::chain::Handler;
use crate::domain::{Envelope, GatewayError, ProcessingError};
use crate::ports::QueueGateway;

/// 呼び出し順を記録する共有ログ
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// 委譲の前後にタグを残す decorator
pub struct Tag<H> {
    name: &'static str,
    journal: Journal,
    inner: H,
}

impl<H> Tag<H> {
    pub fn layer(name: &'static str, journal: Journal) -> impl FnOnce(H) -> Tag<H> {
        move |inner| Tag {
            name,
            journal,
            inner,
        }
    }
}

#[async_trait]
impl<M, H> Handler<M> for Tag<H>
where
    M: Send + Sync + 'static,
    H: Handler<M>,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        self.journal.push(format!("{}:before", self.name));
        let result = self.inner.handle(message).await;
        self.journal.push(format!("{}:after", self.name));
        result
    }
}

/// "terminal" を記録して決められた結果を返す handler
pub struct TaggingTerminal {
    journal: Journal,
    result: Result<(), String>,
}

pub fn tagging_terminal(journal: Journal, result: Result<(), String>) -> TaggingTerminal {
    TaggingTerminal { journal, result }
}

#[async_trait]
impl Handler<Envelope> for TaggingTerminal {
    async fn handle(&self, _envelope: &Envelope) -> Result<(), ProcessingError> {
        self.journal.push("terminal");
        self.result.clone().map_err(ProcessingError::handler)
    }
}

/// 受け取った Envelope を全部保存する handler
#[derive(Clone, Default)]
pub struct Capture {
    seen: Arc<Mutex<Vec<Envelope>>>,
}

impl Capture {
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single(&self) -> Envelope {
        let seen = self.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "expected exactly one envelope");
        seen[0].clone()
    }
}

#[async_trait]
impl Handler<Envelope> for Capture {
    async fn handle(&self, envelope: &Envelope) -> Result<(), ProcessingError> {
        self.seen.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

/// 決められた順に receive の結果を返す gateway
///
/// 台本が尽きたら `Ok(None)`。receive / delete は journal に記録する。
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<Option<Envelope>, GatewayError>>>,
    journal: Journal,
    fail_deletes: bool,
}

impl ScriptedGateway {
    pub fn new(journal: Journal) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            journal,
            fail_deletes: false,
        }
    }

    pub fn deliver(self, envelope: Envelope) -> Self {
        self.script.lock().unwrap().push_back(Ok(Some(envelope)));
        self
    }

    pub fn empty_poll(self) -> Self {
        self.script.lock().unwrap().push_back(Ok(None));
        self
    }

    pub fn receive_error(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::Receive(message.to_string())));
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }
}

#[async_trait]
impl QueueGateway for ScriptedGateway {
    async fn receive(&self, _wait_seconds: i32) -> Result<Option<Envelope>, GatewayError> {
        self.journal.push("receive");
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn delete(&self, envelope: &Envelope) -> Result<(), GatewayError> {
        self.journal.push("delete");
        if self.fail_deletes {
            return Err(GatewayError::Delete(format!(
                "refused {}",
                envelope.receipt_handle()
            )));
        }
        Ok(())
    }
}
