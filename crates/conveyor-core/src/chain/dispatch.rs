//! Dispatch - メッセージの内容で下流の handler を選ぶ
//!
//! routing key を取り出す関数と、key → handler のテーブルを持つ。
//! 1 回の handle で呼ばれる下流の handler は高々 1 つ。
//!
//! # 設計原則
//! - テーブルは起動時に組み立てて、実行中は変更しない（ロック不要）
//! - 二重登録はエラーにする（後勝ちにはしない）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::codec::{Decode, JsonCodec, Message};
use super::handler::Handler;
use crate::domain::{Envelope, ProcessingError};

type KeyFn<M> = dyn Fn(&M) -> Option<String> + Send + Sync;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("handler for route '{0}' is already registered")]
    AlreadyRegistered(String),
}

pub struct Dispatch<M> {
    key: Box<KeyFn<M>>,
    routes: HashMap<String, Arc<dyn Handler<M>>>,
    fallback: Option<Arc<dyn Handler<M>>>,
}

impl<M> Dispatch<M>
where
    M: Send + Sync + 'static,
{
    /// `key` が返した値でテーブルを引く。None なら fallback（なければ NoRoute）。
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&M) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            key: Box::new(key),
            routes: HashMap::new(),
            fallback: None,
        }
    }

    pub fn route<H>(mut self, key: impl Into<String>, handler: H) -> Result<Self, RouteError>
    where
        H: Handler<M> + 'static,
    {
        let key = key.into();
        if self.routes.contains_key(&key) {
            return Err(RouteError::AlreadyRegistered(key));
        }
        self.routes.insert(key, Arc::new(handler));
        Ok(self)
    }

    /// どの route にも当たらなかった場合の handler
    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: Handler<M> + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn routes(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn select(&self, message: &M) -> Result<&Arc<dyn Handler<M>>, ProcessingError> {
        let key = (self.key)(message);
        key.as_deref()
            .and_then(|k| self.routes.get(k))
            .or(self.fallback.as_ref())
            .ok_or(ProcessingError::NoRoute(key))
    }
}

impl Dispatch<Envelope> {
    /// Envelope の attribute `name` の値で振り分ける
    pub fn by_attribute(name: &str) -> Self {
        let name = name.to_string();
        Self::new(move |envelope: &Envelope| envelope.attribute(&name).map(str::to_owned))
    }

    /// `T::TYPE` を key にして、JSON デコード付きで `Handler<T>` を登録する
    pub fn register<T, H>(self, handler: H) -> Result<Self, RouteError>
    where
        T: Message,
        H: Handler<T> + 'static,
    {
        self.route(T::TYPE, Decode::<JsonCodec, T, H>::new(JsonCodec, handler))
    }
}

#[async_trait]
impl<M> Handler<M> for Dispatch<M>
where
    M: Send + Sync + 'static,
{
    async fn handle(&self, message: &M) -> Result<(), ProcessingError> {
        let handler = self.select(message)?;
        handler.handle(message).await
    }
}
