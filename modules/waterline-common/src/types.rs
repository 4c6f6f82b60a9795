use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Inbound message ---

/// One raw notification as delivered on the inbound queue. Produced upstream;
/// read-only here. `id` is the natural key for everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub service: String,
    /// Opaque upstream timestamp. Never interpreted by this pipeline.
    pub created_at: String,
    pub raw_message: String,
    pub source: Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub channel: String,
    pub source_uri: String,
    pub sender_name: String,
    pub sender_uri: String,
}

// --- Extraction schema (what the LLM must return) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Shutdown,
    Resume,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Shutdown => write!(f, "shutdown"),
            EventKind::Resume => write!(f, "resume"),
        }
    }
}

/// Street designator as it appears in the source messages (Russian municipal
/// abbreviations). The wire tags are the canonical storage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum StreetType {
    #[serde(rename = "ул.")]
    Street,
    #[serde(rename = "пер.")]
    Lane,
    #[serde(rename = "пл.")]
    Square,
}

impl std::fmt::Display for StreetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreetType::Street => write!(f, "ул."),
            StreetType::Lane => write!(f, "пер."),
            StreetType::Square => write!(f, "пл."),
        }
    }
}

/// Structured facts extracted from one raw message. Transient: lives only
/// inside a single processing attempt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Extraction {
    pub organization: String,
    pub short_description: String,
    pub event: EventKind,
    /// Event start, local time, no timezone.
    pub event_start: NaiveDateTime,
    /// Absent when the event has no known end (e.g. an open-ended shutdown).
    #[serde(default)]
    pub event_stop: Option<NaiveDateTime>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Address {
    pub city: String,
    pub street_type: StreetType,
    pub street: String,
    pub house: House,
}

/// House scope for one street. Both sets empty means the whole street.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct House {
    /// Discrete house numbers, e.g. ["3", "5а"].
    #[serde(default)]
    pub numbers: Vec<String>,
    /// Inclusive [start, end] intervals, e.g. [["5", "9"]].
    #[serde(default)]
    pub ranges: Vec<[String; 2]>,
}

// --- Persisted record / downstream event ---

/// Sort key for the record derived from message `id` and the 1-based
/// position of its address in the extraction.
pub fn record_key(id: &str, index: usize) -> String {
    format!("water_mp:{id}:{index}")
}

/// One durable store row: message-level fields denormalized onto one address.
/// Derived deterministically from (id, Extraction), so reprocessing the same
/// message overwrites the same keys with the same content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: String,
    pub mp: String,
    pub organization: String,
    pub short_description: String,
    pub event: EventKind,
    pub event_start: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_stop: Option<NaiveDateTime>,
    pub city: String,
    pub street_type: StreetType,
    pub street: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub house_numbers: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub house_ranges: BTreeSet<String>,
}

/// Service discriminator stamped on every downstream event.
pub const ENRICHMENT_SERVICE: &str = "WATER";

/// What goes on the downstream queue: one persisted record, tagged with the
/// service that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentEvent {
    pub service: String,
    #[serde(flatten)]
    pub record: PersistedRecord,
}

impl EnrichmentEvent {
    pub fn for_record(record: PersistedRecord) -> Self {
        Self {
            service: ENRICHMENT_SERVICE.to_string(),
            record,
        }
    }
}
