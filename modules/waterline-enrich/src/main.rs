use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use waterline_common::Config;
use waterline_enrich::consumer::QueueConsumer;
use waterline_enrich::enricher::OpenAiEnricher;
use waterline_enrich::metrics;
use waterline_enrich::processor::MessageProcessor;
use waterline_enrich::queue::{SqsEnrichmentSink, SqsInboundQueue};
use waterline_enrich::store::DynamoRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("waterline_enrich=info".parse()?),
        )
        .init();

    info!("Waterline enrichment service starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Shared AWS clients
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;
    let sqs = aws_sdk_sqs::Client::new(&aws_config);
    let dynamo = aws_sdk_dynamodb::Client::new(&aws_config);

    let inbound = Arc::new(SqsInboundQueue::new(
        sqs.clone(),
        config.inbound_queue_url.clone(),
    ));
    let sink = Arc::new(SqsEnrichmentSink::new(sqs, config.enrich_queue_url.clone()));
    let store = Arc::new(DynamoRecordStore::new(dynamo, config.table_name.clone()));
    let enricher = Arc::new(OpenAiEnricher::new(&config.openai_api_key));

    // Metrics endpoint
    let bind = format!("{}:{}", config.metrics_host, config.metrics_port);
    let router = metrics::metrics_router();
    tokio::spawn(async move {
        if let Err(e) = metrics::serve(router, &bind).await {
            error!(error = %e, "Metrics server failed");
        }
    });

    // Run the pipeline
    let processor = Arc::new(MessageProcessor::new(
        enricher,
        store,
        sink,
        inbound.clone(),
    ));
    let consumer = QueueConsumer::new(
        inbound,
        processor,
        config.max_in_flight,
        config.poll_interval_secs,
        config.max_receive_count,
    );

    consumer.run().await;

    Ok(())
}
