//! ChainBuilder / HandlerChain - decorator の合成
//!
//! # 合成順序
//! `ChainBuilder::new(terminal).wrap(a).wrap(b).build()` は内側から順に包む。
//! 実行時は `b → a → terminal → a → b` の順になる（外側が最初に入り、最後に出る）。
//!
//! # 境界
//! `HandlerChain::invoke` が chain の境界。ここで panic も `ProcessingError` に変換し、
//! Worker のループには失敗を値としてしか返さない。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::handler::Handler;
use crate::domain::{Envelope, ProcessingError};

/// Decorator は内側の handler を受け取って 1 段外側の handler を作る
///
/// `FnOnce(H) -> W` なら何でも decorator になるので、
/// `SnsUnwrap::new` のような関数をそのまま渡せる。
pub trait Decorator<H> {
    type Wrapped;

    fn decorate(self, inner: H) -> Self::Wrapped;
}

impl<H, W, F> Decorator<H> for F
where
    F: FnOnce(H) -> W,
{
    type Wrapped = W;

    fn decorate(self, inner: H) -> W {
        self(inner)
    }
}

/// ChainBuilder は terminal handler から外側へ decorator を積み上げる
///
/// # 使用例
/// ```ignore
/// let chain = ChainBuilder::new(GreetHandler)
///     .wrap(decode_json::<Greeting, _>)
///     .wrap(SnsUnwrap::new)
///     .build();
/// ```
pub struct ChainBuilder<H> {
    handler: H,
}

impl<H> ChainBuilder<H> {
    pub fn new(terminal: H) -> Self {
        Self { handler: terminal }
    }

    /// 現在の chain を `decorator` で包み、新しい最外層にする
    pub fn wrap<D>(self, decorator: D) -> ChainBuilder<D::Wrapped>
    where
        D: Decorator<H>,
    {
        ChainBuilder {
            handler: decorator.decorate(self.handler),
        }
    }

    pub fn build(self) -> HandlerChain
    where
        H: Handler<Envelope> + 'static,
    {
        HandlerChain::new(self.handler)
    }
}

/// 合成済みの chain（先頭は `Envelope` を受け取る）
#[derive(Clone)]
pub struct HandlerChain {
    inner: Arc<dyn Handler<Envelope>>,
}

impl HandlerChain {
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler<Envelope> + 'static,
    {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// chain を 1 回実行する。panic も含めて失敗は `ProcessingError` で返る。
    pub async fn invoke(&self, envelope: &Envelope) -> Result<(), ProcessingError> {
        match AssertUnwindSafe(self.inner.handle(envelope))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(ProcessingError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Journal, Tag, tagging_terminal};

    #[tokio::test]
    async fn decorators_nest_outer_first_in_outer_last_out() {
        let journal = Journal::default();
        let chain = ChainBuilder::new(tagging_terminal(journal.clone(), Ok(())))
            .wrap(Tag::layer("a", journal.clone()))
            .wrap(Tag::layer("b", journal.clone()))
            .wrap(Tag::layer("c", journal.clone()))
            .build();

        chain.invoke(&Envelope::new("{}", "rh")).await.unwrap();

        assert_eq!(
            journal.entries(),
            vec![
                "c:before",
                "b:before",
                "a:before",
                "terminal",
                "a:after",
                "b:after",
                "c:after",
            ]
        );
    }

    #[tokio::test]
    async fn empty_chain_is_just_the_terminal() {
        let journal = Journal::default();
        let chain = ChainBuilder::new(tagging_terminal(journal.clone(), Ok(()))).build();

        chain.invoke(&Envelope::new("{}", "rh")).await.unwrap();
        assert_eq!(journal.entries(), vec!["terminal"]);
    }

    #[tokio::test]
    async fn panics_become_processing_errors() {
        struct Explodes;

        #[async_trait::async_trait]
        impl Handler<Envelope> for Explodes {
            async fn handle(&self, _envelope: &Envelope) -> Result<(), ProcessingError> {
                panic!("kaboom");
            }
        }

        let chain = HandlerChain::new(Explodes);
        let err = chain.invoke(&Envelope::new("{}", "rh")).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Panicked(ref msg) if msg == "kaboom"));
    }

    #[tokio::test]
    async fn failure_unwinds_through_every_decorator() {
        let journal = Journal::default();
        let chain = ChainBuilder::new(tagging_terminal(
            journal.clone(),
            Err("nope".to_string()),
        ))
        .wrap(Tag::layer("a", journal.clone()))
        .build();

        let err = chain.invoke(&Envelope::new("{}", "rh")).await.unwrap_err();
        assert_eq!(err.to_string(), "handler failed: nope");
        assert_eq!(journal.entries(), vec!["a:before", "terminal", "a:after"]);
    }
}
