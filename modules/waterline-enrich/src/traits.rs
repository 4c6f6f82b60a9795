// Trait abstractions for the pipeline's external dependencies.
//
// InboundQueue: receive/delete on the inbound queue.
// EnrichmentSink: send on the downstream queue.
// RecordStore: upsert into the key-value store.
// Enricher: the extraction service call.
//
// These enable deterministic testing with the fakes in `testing`:
// no network, no AWS, no LLM. `cargo test` in seconds.

use async_trait::async_trait;

use waterline_common::{EnrichmentEvent, PersistedRecord, WaterlineError};

/// One raw message as handed out by the inbound queue, before decoding.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub body: String,
    /// Opaque handle for the delete call.
    pub receipt_handle: String,
    /// How many times the queue has delivered this message (1 on first
    /// delivery). Drives the poison threshold.
    pub receive_count: u32,
}

#[async_trait]
pub trait InboundQueue: Send + Sync {
    /// Long-poll the queue. Returns zero or more messages.
    async fn receive(&self) -> Result<Vec<ReceivedMessage>, WaterlineError>;

    /// Delete a message by receipt handle. This is the pipeline's single
    /// commit point and must only be called after persistence succeeded.
    async fn delete(&self, receipt_handle: &str) -> Result<(), WaterlineError>;
}

#[async_trait]
pub trait EnrichmentSink: Send + Sync {
    /// Send one enrichment event to the downstream queue.
    async fn send(&self, event: &EnrichmentEvent) -> Result<(), WaterlineError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert one record keyed by (id, mp). Must be a pure overwrite:
    /// redelivery reprocesses messages, so writes repeat.
    async fn put(&self, record: &PersistedRecord) -> Result<(), WaterlineError>;
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Send raw message text to the extraction service and return its raw
    /// textual response. No validation of the response happens here.
    async fn enrich(&self, raw_message: &str) -> Result<String, WaterlineError>;
}
