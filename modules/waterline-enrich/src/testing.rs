// Test fakes for the enrichment pipeline.
//
// Four fakes matching the four trait boundaries:
// - FakeInboundQueue (InboundQueue): preloaded messages, records deletes
// - FakeEnricher (Enricher): canned response text or hard failure
// - FakeRecordStore (RecordStore): in-memory map keyed by mp
// - FakeEnrichmentSink (EnrichmentSink): collects sent events
//
// Plus helpers for building inbound message bodies.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use waterline_common::{EnrichmentEvent, PersistedRecord, WaterlineError};

use crate::traits::{Enricher, EnrichmentSink, InboundQueue, ReceivedMessage, RecordStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Wrap a body as a freshly-delivered queue message.
pub fn received(body: &str) -> ReceivedMessage {
    ReceivedMessage {
        body: body.to_string(),
        receipt_handle: "rh-1".to_string(),
        receive_count: 1,
    }
}

/// A well-formed inbound message body with the given id and raw text.
pub fn inbound_body(id: &str, raw_message: &str) -> String {
    serde_json::json!({
        "id": id,
        "service": "scraper",
        "created_at": "2024-05-03T09:12:44Z",
        "raw_message": raw_message,
        "source": {
            "channel": "telegram",
            "source_uri": "https://t.me/gorvodokanal",
            "sender_name": "Горводоканал",
            "sender_uri": "https://t.me/gorvodokanal"
        }
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// FakeInboundQueue
// ---------------------------------------------------------------------------

pub struct FakeInboundQueue {
    pending: Mutex<Vec<ReceivedMessage>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeInboundQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_message(self, message: ReceivedMessage) -> Self {
        self.pending.lock().unwrap().push(message);
        self
    }

    /// Receipt handles deleted so far, in delete order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl InboundQueue for FakeInboundQueue {
    async fn receive(&self) -> Result<Vec<ReceivedMessage>, WaterlineError> {
        Ok(self.pending.lock().unwrap().drain(..).collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), WaterlineError> {
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeEnricher
// ---------------------------------------------------------------------------

pub struct FakeEnricher {
    response: Option<String>,
}

impl FakeEnricher {
    /// Always answers with the given text.
    pub fn returning(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
        }
    }

    /// Always fails, as if the extraction service were unreachable.
    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl Enricher for FakeEnricher {
    async fn enrich(&self, _raw_message: &str) -> Result<String, WaterlineError> {
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(WaterlineError::Extraction(
                "fake enricher is down".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeRecordStore
// ---------------------------------------------------------------------------

pub struct FakeRecordStore {
    records: Mutex<BTreeMap<String, PersistedRecord>>,
    fail_writes: bool,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_writes: false,
        }
    }

    /// A store that rejects every write.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_writes: true,
        }
    }

    /// Current store content keyed by `mp`.
    pub fn records(&self) -> BTreeMap<String, PersistedRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn put(&self, record: &PersistedRecord) -> Result<(), WaterlineError> {
        if self.fail_writes {
            return Err(WaterlineError::Persistence(
                "fake store rejected write".to_string(),
            ));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.mp.clone(), record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeEnrichmentSink
// ---------------------------------------------------------------------------

pub struct FakeEnrichmentSink {
    events: Mutex<Vec<EnrichmentEvent>>,
    fail_sends: bool,
}

impl FakeEnrichmentSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    /// A sink that rejects every send.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    pub fn events(&self) -> Vec<EnrichmentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnrichmentSink for FakeEnrichmentSink {
    async fn send(&self, event: &EnrichmentEvent) -> Result<(), WaterlineError> {
        if self.fail_sends {
            return Err(WaterlineError::Transport(
                "fake downstream queue unavailable".to_string(),
            ));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
