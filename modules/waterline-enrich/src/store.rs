use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::NaiveDateTime;
use tracing::info;

use waterline_common::{PersistedRecord, WaterlineError};

use crate::traits::RecordStore;

/// DynamoDB-backed record store. Items are keyed (id, mp); `put_item` is an
/// unconditional upsert, which is exactly the overwrite semantics the
/// at-least-once pipeline depends on.
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoRecordStore {
    pub fn new(client: Client, table_name: String) -> Self {
        info!(table_name = table_name.as_str(), "DynamoDB record store initialized");
        Self { client, table_name }
    }
}

fn iso_local(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn put(&self, record: &PersistedRecord) -> Result<(), WaterlineError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("id", AttributeValue::S(record.id.clone()))
            .item("mp", AttributeValue::S(record.mp.clone()))
            .item("organization", AttributeValue::S(record.organization.clone()))
            .item(
                "short_description",
                AttributeValue::S(record.short_description.clone()),
            )
            .item("event", AttributeValue::S(record.event.to_string()))
            .item("event_start", AttributeValue::S(iso_local(record.event_start)))
            .item("city", AttributeValue::S(record.city.clone()))
            .item("street_type", AttributeValue::S(record.street_type.to_string()))
            .item("street", AttributeValue::S(record.street.clone()));

        // Optional attributes are omitted entirely, never written empty.
        // DynamoDB rejects empty string sets anyway.
        if let Some(stop) = record.event_stop {
            request = request.item("event_stop", AttributeValue::S(iso_local(stop)));
        }
        if !record.house_numbers.is_empty() {
            request = request.item(
                "house_numbers",
                AttributeValue::Ss(record.house_numbers.iter().cloned().collect()),
            );
        }
        if !record.house_ranges.is_empty() {
            request = request.item(
                "house_ranges",
                AttributeValue::Ss(record.house_ranges.iter().cloned().collect()),
            );
        }

        request
            .send()
            .await
            .map_err(|e| WaterlineError::Persistence(e.to_string()))?;
        Ok(())
    }
}
