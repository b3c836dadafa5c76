//! conveyor-core
//!
//! ポイント・ツー・ポイントのメッセージキューを 1 件ずつ処理する
//! 長時間稼働ワーカーのための部品。
//!
//! # モジュール構成
//! - **domain**: データモデル（Envelope, Cycle, エラー分類）
//! - **ports**: 抽象化レイヤー（QueueGateway, AckStrategy, FailureCallback）
//! - **chain**: handler chain（Handler trait, decorator, ChainBuilder）
//! - **impls**: 実装（ProcessThenDelete, DeleteThenProcess, InMemoryQueue, SqsGateway など）
//! - **app**: ワーカー（WorkerBuilder, Worker, WorkerGroup）
//! - **config**: 起動時の設定（WorkerConfig, AckMode）
//!
//! # 制御の流れ
//! `Worker::run` → `AckStrategy::fetch_and_process` → `QueueGateway::receive`
//! → (`delete`) → `HandlerChain::invoke` → (`delete`) → 失敗時は failure callback

pub mod app;
pub mod chain;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{Worker, WorkerBuilder, WorkerGroup};
pub use chain::{ChainBuilder, Handler, HandlerChain};
pub use config::{AckMode, MAX_WAIT_SECONDS, WorkerConfig};
pub use domain::{ConfigurationError, Envelope, GatewayError, ProcessingError, WorkerError};
