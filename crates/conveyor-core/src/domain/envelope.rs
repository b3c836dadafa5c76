//! Envelope - キューから取り出した 1 件の配送
//!
//! body は不透明な payload、receipt_handle はこの配送を削除するためのトークン。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 受信回数を表す system attribute 名（SQS と同じ名前）
pub const RECEIVE_COUNT_ATTRIBUTE: &str = "ApproximateReceiveCount";

/// Envelope はキューから受信した 1 配送分のデータ
///
/// # 不変条件
/// - `receipt_handle` は配送ごとに一意（再配送されると別のハンドルになる）
/// - delete に渡した後はハンドルを保持しない
///
/// decorator が body を書き換えた Envelope を作って下流に渡すことはあるが、
/// receipt_handle は常に元の配送のものを引き継ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    body: String,
    receipt_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    attributes: HashMap<String, String>,
}

impl Envelope {
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            message_id: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// 同じ配送のまま body だけ差し替えた Envelope を作る
    pub fn derive(&self, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: self.receipt_handle.clone(),
            message_id: self.message_id.clone(),
            attributes: self.attributes.clone(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `ApproximateReceiveCount` を数値として読む（無い・壊れている場合は None）
    pub fn receive_count(&self) -> Option<u32> {
        self.attribute(RECEIVE_COUNT_ATTRIBUTE)?.parse().ok()
    }
}
