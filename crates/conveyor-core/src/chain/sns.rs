//! SnsUnwrap decorator - SNS → SQS 配信の通知 JSON を剥がす
//!
//! SNS から SQS に fan-out されたメッセージは body が通知 JSON になっている。
//! 中身の `Message` を body にした Envelope を作り直して下流に渡す。
//! SNS のメタデータは `sns.*`、SNS の message attributes は名前そのままで attributes に入る。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::handler::Handler;
use crate::domain::{Envelope, ProcessingError};

pub const SNS_TOPIC_ARN_ATTRIBUTE: &str = "sns.TopicArn";
pub const SNS_MESSAGE_ID_ATTRIBUTE: &str = "sns.MessageId";
pub const SNS_SUBJECT_ATTRIBUTE: &str = "sns.Subject";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Notification {
    #[serde(rename = "Type")]
    kind: String,
    message: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    topic_arn: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message_attributes: HashMap<String, NotificationAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NotificationAttribute {
    value: String,
}

pub struct SnsUnwrap<H> {
    inner: H,
}

impl<H> SnsUnwrap<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

fn unwrap_notification(envelope: &Envelope) -> Result<Envelope, ProcessingError> {
    let notification: Notification = serde_json::from_str(envelope.body())
        .map_err(|e| ProcessingError::Decode(format!("sns notification: {e}")))?;

    if notification.kind != "Notification" {
        return Err(ProcessingError::Decode(format!(
            "sns notification: unexpected Type {:?}",
            notification.kind
        )));
    }

    let mut unwrapped = envelope.derive(notification.message);
    for (name, attribute) in notification.message_attributes {
        unwrapped = unwrapped.with_attribute(name, attribute.value);
    }
    if let Some(topic_arn) = notification.topic_arn {
        unwrapped = unwrapped.with_attribute(SNS_TOPIC_ARN_ATTRIBUTE, topic_arn);
    }
    if let Some(message_id) = notification.message_id {
        unwrapped = unwrapped.with_attribute(SNS_MESSAGE_ID_ATTRIBUTE, message_id);
    }
    if let Some(subject) = notification.subject {
        unwrapped = unwrapped.with_attribute(SNS_SUBJECT_ATTRIBUTE, subject);
    }
    Ok(unwrapped)
}

#[async_trait]
impl<H> Handler<Envelope> for SnsUnwrap<H>
where
    H: Handler<Envelope>,
{
    async fn handle(&self, envelope: &Envelope) -> Result<(), ProcessingError> {
        let unwrapped = unwrap_notification(envelope)?;
        self.inner.handle(&unwrapped).await
    }
}
