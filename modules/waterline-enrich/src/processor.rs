use std::sync::Arc;

use tracing::info;

use waterline_common::{InboundMessage, WaterlineError};

use crate::parser::parse_extraction;
use crate::publisher::EnrichmentPublisher;
use crate::traits::{Enricher, EnrichmentSink, InboundQueue, ReceivedMessage, RecordStore};
use crate::writer::RecordWriter;

/// Runs the full pipeline for one inbound message:
/// decode → enrich → parse → persist → publish → acknowledge.
///
/// Any error before the acknowledgment abandons the attempt: the message
/// stays on the queue and the queue's visibility window schedules the retry.
/// Deleting the message is the single commit point and happens only after
/// every record write succeeded. Publishing is best-effort and sits between
/// the writes and the delete without gating either.
pub struct MessageProcessor {
    enricher: Arc<dyn Enricher>,
    writer: RecordWriter,
    publisher: EnrichmentPublisher,
    queue: Arc<dyn InboundQueue>,
}

impl MessageProcessor {
    pub fn new(
        enricher: Arc<dyn Enricher>,
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn EnrichmentSink>,
        queue: Arc<dyn InboundQueue>,
    ) -> Self {
        Self {
            enricher,
            writer: RecordWriter::new(store),
            publisher: EnrichmentPublisher::new(sink),
            queue,
        }
    }

    pub async fn process(&self, message: ReceivedMessage) -> Result<(), WaterlineError> {
        let inbound: InboundMessage = serde_json::from_str(&message.body)
            .map_err(|e| WaterlineError::Decode(e.to_string()))?;

        let response = self.enricher.enrich(&inbound.raw_message).await?;
        let extraction = parse_extraction(&response)?;
        let records = self.writer.write(&inbound.id, &extraction).await?;

        self.publisher.publish_all(&records).await;

        self.queue.delete(&message.receipt_handle).await?;

        info!(
            id = inbound.id.as_str(),
            channel = inbound.source.channel.as_str(),
            records = records.len(),
            "Message processed and acknowledged"
        );
        Ok(())
    }
}
