//! Handler trait - メッセージを処理する単位
//!
//! terminal handler（ユーザーのロジック）も decorator も同じ `Handler<M>` を実装する。
//! `M` は chain のその位置を流れる論理的な payload 型で、
//! 先頭は常に `Envelope`、decode 系の decorator より下ではユーザーの型になる。

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ProcessingError;

/// Handler は `M` を処理して成功か失敗を返す
///
/// # 使用例
/// ```ignore
/// struct Greet;
///
/// #[async_trait]
/// impl Handler<Greeting> for Greet {
///     async fn handle(&self, message: &Greeting) -> Result<(), ProcessingError> {
///         tracing::info!(name = %message.name, "hello");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError>;
}

#[async_trait]
impl<M, H> Handler<M> for Arc<H>
where
    M: Send + Sync + 'static,
    H: Handler<M> + ?Sized,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        (**self).handle(message).await
    }
}

#[async_trait]
impl<M, H> Handler<M> for Box<H>
where
    M: Send + Sync + 'static,
    H: Handler<M> + ?Sized,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        (**self).handle(message).await
    }
}

/// クロージャを terminal handler として使うためのアダプタ
///
/// async クロージャに参照を渡すとライフタイムが面倒なので、メッセージは clone して渡す。
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<M, F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(M) -> Fut,
    Fut: Future<Output = Result<(), ProcessingError>>,
{
    FnHandler { f }
}

#[async_trait]
impl<M, F, Fut> Handler<M> for FnHandler<F>
where
    M: Clone + Send + Sync + 'static,
    F: Fn(M) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessingError>> + Send,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        (self.f)(message.clone()).await
    }
}
