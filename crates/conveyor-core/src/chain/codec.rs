//! Decode decorator - body をユーザーの型にデコードして下流に渡す
//!
//! フォーマットは `PayloadCodec` で差し替えられる。組み込みは JSON のみ。

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::handler::Handler;
use crate::domain::{Envelope, ProcessingError};

/// Message は routing key（型名）と Rust の型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Deserialize)]
/// struct Greeting { name: String }
///
/// impl Message for Greeting {
///     const TYPE: &'static str = "demo.greeting.v1";
/// }
/// ```
pub trait Message: DeserializeOwned + Send + Sync + 'static {
    /// `{namespace}.{domain}.{action}.v{major}` 形式を推奨
    const TYPE: &'static str;
}

/// PayloadCodec は body 文字列を `T` に変換する
pub trait PayloadCodec<T>: Send + Sync {
    fn decode(&self, body: &str) -> Result<T, ProcessingError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: DeserializeOwned> PayloadCodec<T> for JsonCodec {
    fn decode(&self, body: &str) -> Result<T, ProcessingError> {
        serde_json::from_str(body).map_err(|e| ProcessingError::Decode(format!("json decode: {e}")))
    }
}

/// `Handler<T>` を `Handler<Envelope>` に変換する decorator
///
/// decode に失敗した場合は下流を呼ばずに `ProcessingError::Decode` を返す。
pub struct Decode<C, T, H> {
    codec: C,
    inner: H,
    _marker: PhantomData<fn() -> T>,
}

impl<C, T, H> Decode<C, T, H> {
    pub fn new(codec: C, inner: H) -> Self {
        Self {
            codec,
            inner,
            _marker: PhantomData,
        }
    }
}

/// `ChainBuilder::wrap(decode_json::<MyType, _>)` 用のショートカット
pub fn decode_json<T, H>(inner: H) -> Decode<JsonCodec, T, H>
where
    T: DeserializeOwned,
{
    Decode::new(JsonCodec, inner)
}

#[async_trait]
impl<C, T, H> Handler<Envelope> for Decode<C, T, H>
where
    C: PayloadCodec<T>,
    T: Send + Sync + 'static,
    H: Handler<T>,
{
    async fn handle(&self, envelope: &Envelope) -> Result<(), ProcessingError> {
        let payload = self.codec.decode(envelope.body())?;
        self.inner.handle(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde::Deserialize;

    use super::*;
    use crate::chain::handler_fn;

    #[derive(Debug, Clone, Deserialize)]
    struct Named {
        name: String,
    }

    #[tokio::test]
    async fn decodes_json_body_for_inner_handler() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let decode = decode_json::<Named, _>(handler_fn(move |n: Named| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = Some(n.name);
                Ok(())
            }
        }));

        decode
            .handle(&Envelope::new(r#"{"name":"x"}"#, "rh"))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn decode_failure_short_circuits() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let decode = decode_json::<Named, _>(handler_fn(move |_: Named| {
            let flag = flag.clone();
            async move {
                *flag.lock().unwrap() = true;
                Ok(())
            }
        }));

        let err = decode
            .handle(&Envelope::new("not json", "rh"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Decode(ref msg) if msg.starts_with("json decode")));
        assert!(!*called.lock().unwrap());
    }

    struct Upper;

    impl PayloadCodec<String> for Upper {
        fn decode(&self, body: &str) -> Result<String, ProcessingError> {
            Ok(body.to_uppercase())
        }
    }

    #[tokio::test]
    async fn custom_codec_is_used() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        let decode = Decode::new(
            Upper,
            handler_fn(move |s: String| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push_str(&s);
                    Ok(())
                }
            }),
        );

        decode.handle(&Envelope::new("abc", "rh")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), "ABC");
    }
}
