//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ProcessThenDelete / DeleteThenProcess**: 組み込みの AckStrategy
//! - **LogAndDump**: デフォルトの FailureCallback
//! - **InMemoryQueue**: 開発・テスト用の QueueGateway
//! - **SqsGateway**: Amazon SQS 用の QueueGateway

pub mod delete_then_process;
pub mod log_and_dump;
pub mod memory;
pub mod process_then_delete;
pub mod sqs;

pub use self::delete_then_process::DeleteThenProcess;
pub use self::log_and_dump::LogAndDump;
pub use self::memory::{InMemoryQueue, SENT_TIMESTAMP_ATTRIBUTE};
pub use self::process_then_delete::ProcessThenDelete;
pub use self::sqs::SqsGateway;
