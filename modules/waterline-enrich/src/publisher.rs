use std::sync::Arc;

use metrics::counter;
use tracing::warn;

use waterline_common::{EnrichmentEvent, PersistedRecord};

use crate::metrics::{EVENTS_PUBLISHED_TOTAL, EVENTS_PUBLISH_FAILED_TOTAL};
use crate::traits::EnrichmentSink;

/// Emits one downstream event per persisted record. Best-effort: a failed
/// send is logged and swallowed, it never blocks the acknowledgment of the
/// inbound message.
pub struct EnrichmentPublisher {
    sink: Arc<dyn EnrichmentSink>,
}

impl EnrichmentPublisher {
    pub fn new(sink: Arc<dyn EnrichmentSink>) -> Self {
        Self { sink }
    }

    pub async fn publish_all(&self, records: &[PersistedRecord]) {
        for record in records {
            let event = EnrichmentEvent::for_record(record.clone());
            match self.sink.send(&event).await {
                Ok(()) => {
                    counter!(EVENTS_PUBLISHED_TOTAL).increment(1);
                }
                Err(e) => {
                    counter!(EVENTS_PUBLISH_FAILED_TOTAL).increment(1);
                    warn!(
                        mp = event.record.mp.as_str(),
                        error = %e,
                        "Failed to publish enrichment event"
                    );
                }
            }
        }
    }
}
