use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use waterline_common::{record_key, Extraction, PersistedRecord, WaterlineError};

use crate::metrics::RECORDS_WRITTEN_TOTAL;
use crate::traits::RecordStore;

/// Build the per-address records for one message. Pure and deterministic:
/// the same (id, extraction) always yields the same keys and content, which
/// is what makes redelivered messages safe to reprocess.
pub fn build_records(id: &str, extraction: &Extraction) -> Vec<PersistedRecord> {
    extraction
        .addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            let house_numbers: BTreeSet<String> =
                address.house.numbers.iter().cloned().collect();
            let house_ranges: BTreeSet<String> = address
                .house
                .ranges
                .iter()
                .map(|[start, end]| format!("{start}-{end}"))
                .collect();

            PersistedRecord {
                id: id.to_string(),
                mp: record_key(id, i + 1),
                organization: extraction.organization.clone(),
                short_description: extraction.short_description.clone(),
                event: extraction.event,
                event_start: extraction.event_start,
                event_stop: extraction.event_stop,
                city: address.city.clone(),
                street_type: address.street_type,
                street: address.street.clone(),
                house_numbers,
                house_ranges,
            }
        })
        .collect()
}

/// Maps one extraction into records and upserts them. Any single failed
/// write fails the whole step (there is no partial-success contract); the
/// message stays on the queue and the idempotent keys absorb the rewrite.
pub struct RecordWriter {
    store: Arc<dyn RecordStore>,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Persist all records derived from `extraction`. Returns the records so
    /// the publisher can mirror them downstream. An empty address list is a
    /// success with zero records.
    pub async fn write(
        &self,
        id: &str,
        extraction: &Extraction,
    ) -> Result<Vec<PersistedRecord>, WaterlineError> {
        let records = build_records(id, extraction);
        for record in &records {
            self.store.put(record).await?;
            counter!(RECORDS_WRITTEN_TOTAL).increment(1);
            debug!(mp = record.mp.as_str(), "Record upserted");
        }
        Ok(records)
    }
}
