//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: 設定と依存のワイヤリング（起動時検証）
//! - **Worker**: receive → process → ack のループ
//! - **WorkerGroup**: 独立したワーカーを複数本動かす

pub mod builder;
pub mod group;
pub mod worker_loop;

pub use self::builder::WorkerBuilder;
pub use self::group::WorkerGroup;
pub use self::worker_loop::Worker;
