//! Ports - 抽象化レイヤー
//!
//! 外部システム（キューサービス）とポリシー（ack の順序、失敗時の扱い）を
//! trait として切り出す。実装は `impls` に置く。

pub mod ack_strategy;
pub mod failure_callback;
pub mod queue_gateway;

pub use self::ack_strategy::AckStrategy;
pub use self::failure_callback::FailureCallback;
pub use self::queue_gateway::QueueGateway;
