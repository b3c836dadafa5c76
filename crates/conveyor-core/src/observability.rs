use serde::{Deserialize, Serialize};

/// InMemoryQueue の状態別件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// 受信可能
    pub visible: usize,
    /// 受信済みで visibility timeout 中
    pub in_flight: usize,
    /// 受信回数の上限を超えて dead-letter に移ったもの
    pub dead: usize,
}
