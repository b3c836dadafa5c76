//! SqsGateway - Amazon SQS 用の QueueGateway
//!
//! receive は常に 1 件（`max_number_of_messages(1)`）、system attributes と
//! message attributes は全部取得して Envelope の attributes に平らに入れる。
//! Binary の message attribute は文字列にできないので入れない（debug ログのみ）。

use std::collections::HashMap;
use std::fmt::{self, Write};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};

use crate::config::WorkerConfig;
use crate::domain::{Envelope, GatewayError};
use crate::ports::QueueGateway;

#[derive(Clone, Debug)]
pub struct SqsGateway {
    client: Client,
    queue_url: String,
}

impl SqsGateway {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// 設定の region / endpoint で SDK クライアントを作る（認証情報は SDK のデフォルトチェーン）
    pub async fn connect(config: &WorkerConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.queue_url.clone())
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueGateway for SqsGateway {
    #[tracing::instrument(skip(self), fields(queue_url = %self.queue_url))]
    async fn receive(&self, wait_seconds: i32) -> Result<Option<Envelope>, GatewayError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|err| GatewayError::Receive(error_chain(&err)))?;

        match output.messages.unwrap_or_default().into_iter().next() {
            Some(message) => envelope_from_message(message).map(Some),
            None => Ok(None),
        }
    }

    #[tracing::instrument(
        skip(self, envelope),
        fields(queue_url = %self.queue_url, message_id = envelope.message_id())
    )]
    async fn delete(&self, envelope: &Envelope) -> Result<(), GatewayError> {
        if envelope.receipt_handle().is_empty() {
            return Err(GatewayError::MissingReceiptHandle);
        }

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(envelope.receipt_handle())
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(DeleteMessageError::ReceiptHandleIsInvalid(_)) => {
                    GatewayError::InvalidReceiptHandle(envelope.receipt_handle().to_string())
                }
                _ => GatewayError::Delete(error_chain(&err)),
            })?;

        Ok(())
    }
}

fn envelope_from_message(message: Message) -> Result<Envelope, GatewayError> {
    let receipt_handle = message
        .receipt_handle
        .filter(|h| !h.is_empty())
        .ok_or(GatewayError::MissingReceiptHandle)?;

    let mut attributes: HashMap<String, String> = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();
    for (name, value) in message.message_attributes.unwrap_or_default() {
        match value.string_value {
            Some(s) => {
                attributes.insert(name, s);
            }
            None => tracing::debug!(attribute = %name, "skipping binary message attribute"),
        }
    }

    let mut envelope =
        Envelope::new(message.body.unwrap_or_default(), receipt_handle).with_attributes(attributes);
    if let Some(message_id) = message.message_id {
        envelope = envelope.with_message_id(message_id);
    }
    Ok(envelope)
}

/// SDK のエラーは Display だけだと中身が出ないので source を辿って連結する
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = String::new();
    if write_err(&mut message, err).is_err() {
        return err.to_string();
    }
    message
}

fn write_err(s: &mut String, err: &dyn std::error::Error) -> fmt::Result {
    write!(s, "{err}")?;
    if let Some(source) = err.source() {
        write!(s, ": ")?;
        write_err(s, source)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use aws_sdk_sqs::primitives::Blob;
    use aws_sdk_sqs::types::MessageAttributeValue;

    use super::*;
    use crate::domain::RECEIVE_COUNT_ATTRIBUTE;

    #[test]
    fn message_maps_to_envelope() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body(r#"{"name":"x"}"#)
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "2")
            .message_attributes(
                "type",
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value("greeting")
                    .build()
                    .unwrap(),
            )
            .build();

        let env = envelope_from_message(message).unwrap();
        assert_eq!(env.body(), r#"{"name":"x"}"#);
        assert_eq!(env.receipt_handle(), "rh-1");
        assert_eq!(env.message_id(), Some("m-1"));
        assert_eq!(env.attribute(RECEIVE_COUNT_ATTRIBUTE), Some("2"));
        assert_eq!(env.receive_count(), Some(2));
        assert_eq!(env.attribute("type"), Some("greeting"));
    }

    #[test]
    fn binary_message_attributes_are_skipped() {
        let message = Message::builder()
            .receipt_handle("rh-1")
            .body("x")
            .message_attributes(
                "thumbnail",
                MessageAttributeValue::builder()
                    .data_type("Binary")
                    .binary_value(Blob::new(vec![0x89, 0x50]))
                    .build()
                    .unwrap(),
            )
            .message_attributes(
                "type",
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value("greeting")
                    .build()
                    .unwrap(),
            )
            .build();

        let env = envelope_from_message(message).unwrap();
        assert_eq!(env.attribute("thumbnail"), None);
        assert_eq!(env.attribute("type"), Some("greeting"));
    }

    #[test]
    fn message_without_receipt_handle_is_rejected() {
        let message = Message::builder().body("x").build();
        assert!(matches!(
            envelope_from_message(message),
            Err(GatewayError::MissingReceiptHandle)
        ));
    }

    #[test]
    fn error_chain_includes_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::other("inner"));
        assert_eq!(error_chain(&err), "outer: inner");
    }
}
