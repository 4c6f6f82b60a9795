use async_trait::async_trait;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use tracing::info;

use waterline_common::{EnrichmentEvent, WaterlineError};

use crate::traits::{EnrichmentSink, InboundQueue, ReceivedMessage};

/// Long-poll wait on each receive call.
const RECEIVE_WAIT_SECS: i32 = 10;
/// Batch size per receive. Kept small; each message fans out into its own
/// processing task anyway.
const RECEIVE_BATCH: i32 = 1;

/// SQS-backed inbound queue.
pub struct SqsInboundQueue {
    client: Client,
    queue_url: String,
}

impl SqsInboundQueue {
    pub fn new(client: Client, queue_url: String) -> Self {
        info!(queue_url = queue_url.as_str(), "Inbound SQS queue initialized");
        Self { client, queue_url }
    }
}

#[async_trait]
impl InboundQueue for SqsInboundQueue {
    async fn receive(&self) -> Result<Vec<ReceivedMessage>, WaterlineError> {
        let result = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(RECEIVE_BATCH)
            .wait_time_seconds(RECEIVE_WAIT_SECS)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| WaterlineError::Transport(e.to_string()))?;

        let messages = result
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let receive_count = m
                    .attributes()
                    .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                Some(ReceivedMessage {
                    body: m.body?,
                    receipt_handle: m.receipt_handle?,
                    receive_count,
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), WaterlineError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| WaterlineError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// SQS-backed downstream queue for enrichment events.
pub struct SqsEnrichmentSink {
    client: Client,
    queue_url: String,
}

impl SqsEnrichmentSink {
    pub fn new(client: Client, queue_url: String) -> Self {
        info!(queue_url = queue_url.as_str(), "Enrichment SQS queue initialized");
        Self { client, queue_url }
    }
}

#[async_trait]
impl EnrichmentSink for SqsEnrichmentSink {
    async fn send(&self, event: &EnrichmentEvent) -> Result<(), WaterlineError> {
        let body = serde_json::to_string(event)
            .map_err(|e| WaterlineError::Transport(e.to_string()))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| WaterlineError::Transport(e.to_string()))?;
        Ok(())
    }
}
