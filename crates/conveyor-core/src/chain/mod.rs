//! Chain - handler chain（decorator の連鎖）
//!
//! terminal handler を decorator で包み、`HandlerChain` として Worker に渡す。
//!
//! # 組み込み decorator
//! - **Decode**: body をユーザーの型にデコード（`PayloadCodec`）
//! - **SnsUnwrap**: SNS 通知 JSON を剥がす
//! - **Dispatch**: 内容で下流の handler を選ぶ
//! - **Instrumented**: 前後をログ出力

pub mod builder;
pub mod codec;
pub mod dispatch;
pub mod handler;
pub mod instrument;
pub mod sns;

pub use self::builder::{ChainBuilder, Decorator, HandlerChain};
pub use self::codec::{Decode, JsonCodec, Message, PayloadCodec, decode_json};
pub use self::dispatch::{Dispatch, RouteError};
pub use self::handler::{FnHandler, Handler, handler_fn};
pub use self::instrument::Instrumented;
pub use self::sns::{
    SNS_MESSAGE_ID_ATTRIBUTE, SNS_SUBJECT_ATTRIBUTE, SNS_TOPIC_ARN_ATTRIBUTE, SnsUnwrap,
};
