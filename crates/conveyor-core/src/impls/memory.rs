//! InMemoryQueue - 開発・テスト用のキュー
//!
//! マネージドキューの受信まわりの振る舞いだけを真似る:
//! - long poll（`send` で待機中の receive が起きる）
//! - visibility timeout（削除されなければ再び受信可能になる）
//! - 受信ごとに新しい receipt handle、`ApproximateReceiveCount` の加算
//! - 受信回数の上限を超えたら dead-letter へ移す
//!
//! # 実装詳細
//! - `tokio::sync::Mutex` で状態を保護し、ロックを保持したまま待たない
//! - `Notify` で send → receive を起こす
//! - 時刻は `tokio::time::Instant`（テストでは時間を止められる）

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::{Envelope, GatewayError, RECEIVE_COUNT_ATTRIBUTE};
use crate::observability::QueueCounts;
use crate::ports::QueueGateway;

pub const SENT_TIMESTAMP_ATTRIBUTE: &str = "SentTimestamp";

/// SQS のデフォルトと同じ 30 秒
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
    attributes: HashMap<String, String>,
    receive_count: u32,
    sent_at: DateTime<Utc>,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    visible: VecDeque<StoredMessage>,
    /// receipt handle → 受信中のメッセージ
    in_flight: HashMap<String, InFlight>,
    dead: Vec<StoredMessage>,
}

impl State {
    /// visibility timeout が切れたものを受信可能に戻す
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();
        for handle in expired {
            if let Some(f) = self.in_flight.remove(&handle) {
                self.visible.push_back(f.message);
            }
        }
    }

    fn next_visibility_change(&self) -> Option<Instant> {
        self.in_flight.values().map(|f| f.visible_at).min()
    }
}

pub struct InMemoryQueue {
    state: Mutex<State>,
    notify: Notify,
    visibility_timeout: Duration,
    max_receive_count: Option<u32>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_receive_count: None,
        }
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// `max` 回受信されても削除されなかったメッセージは dead-letter に移す
    pub fn with_max_receive_count(mut self, max: u32) -> Self {
        self.max_receive_count = Some(max);
        self
    }

    /// メッセージを追加して message id を返す
    pub async fn send(&self, body: impl Into<String>) -> String {
        self.send_with_attributes(body, HashMap::new()).await
    }

    pub async fn send_with_attributes(
        &self,
        body: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> String {
        let message_id = Ulid::new().to_string();
        let message = StoredMessage {
            message_id: message_id.clone(),
            body: body.into(),
            attributes,
            receive_count: 0,
            sent_at: Utc::now(),
        };
        self.state.lock().await.visible.push_back(message);
        self.notify.notify_one();
        message_id
    }

    pub async fn counts(&self) -> QueueCounts {
        let mut state = self.state.lock().await;
        state.reclaim_expired(Instant::now());
        QueueCounts {
            visible: state.visible.len(),
            in_flight: state.in_flight.len(),
            dead: state.dead.len(),
        }
    }

    /// dead-letter に移ったメッセージの body
    pub async fn dead_letters(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.dead.iter().map(|m| m.body.clone()).collect()
    }

    fn take_next(&self, state: &mut State, now: Instant) -> Option<Envelope> {
        while let Some(mut message) = state.visible.pop_front() {
            if let Some(max) = self.max_receive_count
                && message.receive_count >= max
            {
                tracing::debug!(message_id = %message.message_id, "moving to dead-letter");
                state.dead.push(message);
                continue;
            }

            message.receive_count += 1;
            let receipt_handle = Ulid::new().to_string();
            let envelope = Envelope::new(message.body.clone(), receipt_handle.clone())
                .with_message_id(message.message_id.clone())
                .with_attributes(message.attributes.clone())
                .with_attribute(RECEIVE_COUNT_ATTRIBUTE, message.receive_count.to_string())
                .with_attribute(
                    SENT_TIMESTAMP_ATTRIBUTE,
                    message.sent_at.timestamp_millis().to_string(),
                );

            state.in_flight.insert(
                receipt_handle,
                InFlight {
                    message,
                    visible_at: now + self.visibility_timeout,
                },
            );
            return Some(envelope);
        }
        None
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueGateway for InMemoryQueue {
    async fn receive(&self, wait_seconds: i32) -> Result<Option<Envelope>, GatewayError> {
        let wait = Duration::from_secs(u64::try_from(wait_seconds).unwrap_or(0));
        let deadline = Instant::now() + wait;

        loop {
            let next_change = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.reclaim_expired(now);
                if let Some(envelope) = self.take_next(&mut state, now) {
                    return Ok(Some(envelope));
                }
                state.next_visibility_change()
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let wake_at = next_change.map_or(deadline, |t| t.min(deadline));
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, envelope: &Envelope) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.reclaim_expired(Instant::now());
        match state.in_flight.remove(envelope.receipt_handle()) {
            Some(_) => Ok(()),
            None => Err(GatewayError::InvalidReceiptHandle(
                envelope.receipt_handle().to_string(),
            )),
        }
    }
}
