//! Instrumented decorator - 下流の呼び出し前後をログに出す

use std::time::Instant;

use async_trait::async_trait;

use super::handler::Handler;
use crate::domain::ProcessingError;

pub struct Instrumented<H> {
    name: &'static str,
    inner: H,
}

impl<H> Instrumented<H> {
    pub fn new(name: &'static str, inner: H) -> Self {
        Self { name, inner }
    }

    /// `ChainBuilder::wrap(Instrumented::layer("decode"))` 用
    pub fn layer(name: &'static str) -> impl FnOnce(H) -> Self {
        move |inner| Self::new(name, inner)
    }
}

#[async_trait]
impl<M, H> Handler<M> for Instrumented<H>
where
    M: Send + Sync + 'static,
    H: Handler<M>,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        let started = Instant::now();
        tracing::debug!(stage = self.name, "entering");
        let result = self.inner.handle(message).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => tracing::debug!(stage = self.name, elapsed_ms, "completed"),
            Err(err) => tracing::debug!(stage = self.name, elapsed_ms, error = %err, "failed"),
        }
        result
    }
}
