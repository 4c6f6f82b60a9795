//! Pipeline scenario tests: fakes on every boundary, one real processor or
//! consumer per test, asserting store content, published events, and
//! acknowledgment together.

use std::collections::BTreeSet;
use std::sync::Arc;

use waterline_common::{WaterlineError, ENRICHMENT_SERVICE};

use crate::consumer::QueueConsumer;
use crate::processor::MessageProcessor;
use crate::testing::*;
use crate::traits::Enricher;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extraction_response(addresses_json: &str) -> String {
    format!(
        r#"{{
            "organization": "МУП Водоканал",
            "short_description": "Отключение холодной воды",
            "event": "shutdown",
            "event_start": "2024-05-03T10:00:00",
            "event_stop": "2024-05-03T18:00:00",
            "addresses": {addresses_json}
        }}"#
    )
}

fn one_address() -> String {
    extraction_response(
        r#"[{"city":"Кострома","street_type":"ул.","street":"Ленина","house":{"numbers":["3","5"],"ranges":[]}}]"#,
    )
}

struct Fixture {
    queue: Arc<FakeInboundQueue>,
    store: Arc<FakeRecordStore>,
    sink: Arc<FakeEnrichmentSink>,
    processor: MessageProcessor,
}

fn fixture(enricher: impl Enricher + 'static) -> Fixture {
    fixture_with(enricher, FakeRecordStore::new(), FakeEnrichmentSink::new())
}

fn fixture_with(
    enricher: impl Enricher + 'static,
    store: FakeRecordStore,
    sink: FakeEnrichmentSink,
) -> Fixture {
    let queue = Arc::new(FakeInboundQueue::new());
    let store = Arc::new(store);
    let sink = Arc::new(sink);
    let processor = MessageProcessor::new(
        Arc::new(enricher),
        store.clone(),
        sink.clone(),
        queue.clone(),
    );
    Fixture {
        queue,
        store,
        sink,
        processor,
    }
}

fn string_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_address_persists_one_record_publishes_one_event_and_acks() {
    let f = fixture(FakeEnricher::returning(&one_address()));

    f.processor
        .process(received(&inbound_body("m1", "Отключение воды по ул. Ленина")))
        .await
        .unwrap();

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    let record = &records["water_mp:m1:1"];
    assert_eq!(record.id, "m1");
    assert_eq!(record.city, "Кострома");
    assert_eq!(record.house_numbers, string_set(&["3", "5"]));
    assert!(record.house_ranges.is_empty());

    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].service, ENRICHMENT_SERVICE);
    assert_eq!(events[0].record.mp, "water_mp:m1:1");

    assert_eq!(f.queue.deleted(), vec!["rh-1"]);
}

#[tokio::test]
async fn multiple_addresses_fan_out_into_matching_records_and_events() {
    let response = extraction_response(
        r#"[
            {"city":"Кострома","street_type":"ул.","street":"Ленина","house":{"numbers":["1"],"ranges":[]}},
            {"city":"Кострома","street_type":"пер.","street":"Речной","house":{"numbers":[],"ranges":[["5","9"]]}},
            {"city":"Кострома","street_type":"пл.","street":"Советская","house":{"numbers":[],"ranges":[]}}
        ]"#,
    );
    let f = fixture(FakeEnricher::returning(&response));

    f.processor
        .process(received(&inbound_body("m2", "...")))
        .await
        .unwrap();

    let records = f.store.records();
    let keys: Vec<&str> = records.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, ["water_mp:m2:1", "water_mp:m2:2", "water_mp:m2:3"]);
    assert_eq!(records["water_mp:m2:2"].house_ranges, string_set(&["5-9"]));

    let event_keys: Vec<String> = f
        .sink
        .events()
        .iter()
        .map(|e| e.record.mp.clone())
        .collect();
    assert_eq!(event_keys, ["water_mp:m2:1", "water_mp:m2:2", "water_mp:m2:3"]);
}

#[tokio::test]
async fn empty_address_list_writes_nothing_and_still_acks() {
    let f = fixture(FakeEnricher::returning(&extraction_response("[]")));

    f.processor
        .process(received(&inbound_body("m3", "...")))
        .await
        .unwrap();

    assert!(f.store.records().is_empty());
    assert!(f.sink.events().is_empty());
    assert_eq!(f.queue.deleted(), vec!["rh-1"]);
}

#[tokio::test]
async fn fenced_extraction_output_is_handled() {
    let fenced = format!("```json\n{}\n```", one_address());
    let f = fixture(FakeEnricher::returning(&fenced));

    f.processor
        .process(received(&inbound_body("m4", "...")))
        .await
        .unwrap();

    assert_eq!(f.store.records().len(), 1);
    assert_eq!(f.queue.deleted(), vec!["rh-1"]);
}

#[tokio::test]
async fn reprocessing_the_same_message_is_idempotent() {
    let f = fixture(FakeEnricher::returning(&one_address()));
    let body = inbound_body("m5", "...");

    f.processor.process(received(&body)).await.unwrap();
    let first = f.store.records();

    // Redelivery: same body, new receipt handle.
    let mut redelivered = received(&body);
    redelivered.receipt_handle = "rh-2".to_string();
    redelivered.receive_count = 2;
    f.processor.process(redelivered).await.unwrap();

    assert_eq!(f.store.records(), first);
    assert_eq!(f.queue.deleted(), vec!["rh-1", "rh-2"]);
}

#[tokio::test]
async fn absent_event_stop_is_omitted_from_the_published_event() {
    let response = r#"{
        "organization": "Водоканал",
        "short_description": "Отключение",
        "event": "shutdown",
        "event_start": "2024-05-03T10:00:00",
        "event_stop": null,
        "addresses": [{"city":"Кострома","street_type":"ул.","street":"Ленина","house":{"numbers":[],"ranges":[]}}]
    }"#;
    let f = fixture(FakeEnricher::returning(response));

    f.processor
        .process(received(&inbound_body("m6", "...")))
        .await
        .unwrap();

    let event = &f.sink.events()[0];
    assert!(event.record.event_stop.is_none());
    let json = serde_json::to_value(event).unwrap();
    assert!(json.get("event_stop").is_none());
    // Empty house sets are omitted too, never sent as empty lists.
    assert!(json.get("house_numbers").is_none());
}

// ---------------------------------------------------------------------------
// Failure paths: the message must stay on the queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undecodable_inbound_body_abandons_the_attempt() {
    let f = fixture(FakeEnricher::returning(&one_address()));

    let err = f
        .processor
        .process(received("definitely not json"))
        .await
        .unwrap_err();

    assert!(matches!(err, WaterlineError::Decode(_)));
    assert!(f.store.records().is_empty());
    assert!(f.queue.deleted().is_empty());
}

#[tokio::test]
async fn enricher_failure_leaves_message_on_queue() {
    let f = fixture(FakeEnricher::failing());

    let err = f
        .processor
        .process(received(&inbound_body("m7", "...")))
        .await
        .unwrap_err();

    assert!(matches!(err, WaterlineError::Extraction(_)));
    assert!(f.store.records().is_empty());
    assert!(f.sink.events().is_empty());
    assert!(f.queue.deleted().is_empty());
}

#[tokio::test]
async fn malformed_extraction_leaves_message_on_queue() {
    let f = fixture(FakeEnricher::returning("Sorry, no addresses found."));

    let err = f
        .processor
        .process(received(&inbound_body("m8", "...")))
        .await
        .unwrap_err();

    assert!(matches!(err, WaterlineError::MalformedExtraction(_)));
    assert!(f.queue.deleted().is_empty());
}

#[tokio::test]
async fn write_failure_blocks_publish_and_ack() {
    let f = fixture_with(
        FakeEnricher::returning(&one_address()),
        FakeRecordStore::failing(),
        FakeEnrichmentSink::new(),
    );

    let err = f
        .processor
        .process(received(&inbound_body("m9", "...")))
        .await
        .unwrap_err();

    assert!(matches!(err, WaterlineError::Persistence(_)));
    assert!(f.sink.events().is_empty());
    assert!(f.queue.deleted().is_empty());
}

#[tokio::test]
async fn publish_failure_does_not_block_the_ack() {
    let f = fixture_with(
        FakeEnricher::returning(&one_address()),
        FakeRecordStore::new(),
        FakeEnrichmentSink::failing(),
    );

    f.processor
        .process(received(&inbound_body("m10", "...")))
        .await
        .unwrap();

    assert_eq!(f.store.records().len(), 1);
    assert!(f.sink.events().is_empty());
    assert_eq!(f.queue.deleted(), vec!["rh-1"]);
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn consumer_processes_messages_from_the_queue() {
    let queue = Arc::new(
        FakeInboundQueue::new().with_message(received(&inbound_body("m13", "..."))),
    );
    let store = Arc::new(FakeRecordStore::new());
    let sink = Arc::new(FakeEnrichmentSink::new());
    let processor = Arc::new(MessageProcessor::new(
        Arc::new(FakeEnricher::returning(&one_address())),
        store.clone(),
        sink.clone(),
        queue.clone(),
    ));
    let consumer = QueueConsumer::new(queue.clone(), processor, 2, 1, 5);

    // run() never returns; the first poll drains the queue, the second one
    // finds it empty and sleeps past the timeout.
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), consumer.run()).await;
    consumer.drain_for_test(2).await;

    assert_eq!(store.records().len(), 1);
    assert!(store.records().contains_key("water_mp:m13:1"));
    assert_eq!(sink.events().len(), 1);
    assert_eq!(queue.deleted(), vec!["rh-1"]);
}

#[tokio::test]
async fn poison_message_is_deleted_without_processing() {
    let f = fixture(FakeEnricher::returning(&one_address()));
    let consumer = QueueConsumer::new(f.queue.clone(), Arc::new(f.processor), 4, 1, 5);

    let mut message = received(&inbound_body("m11", "..."));
    message.receive_count = 6;
    consumer.dispatch(message).await;

    assert_eq!(f.queue.deleted(), vec!["rh-1"]);
    assert!(f.store.records().is_empty());
    assert!(f.sink.events().is_empty());
}

#[tokio::test]
async fn message_at_the_threshold_is_still_processed() {
    let f = fixture(FakeEnricher::returning(&one_address()));
    let store = f.store.clone();
    let queue = f.queue.clone();
    let consumer = QueueConsumer::new(f.queue.clone(), Arc::new(f.processor), 1, 1, 5);

    let mut message = received(&inbound_body("m12", "..."));
    message.receive_count = 5;
    consumer.dispatch(message).await;

    // dispatch spawns the unit; draining the semaphore waits for it.
    consumer.drain_for_test(1).await;
    assert_eq!(store.records().len(), 1);
    assert_eq!(queue.deleted(), vec!["rh-1"]);
}
