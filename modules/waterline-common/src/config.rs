use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // DynamoDB
    pub table_name: String,

    // SQS
    pub inbound_queue_url: String,
    pub enrich_queue_url: String,
    pub aws_region: String,

    // OpenAI
    pub openai_api_key: String,

    // Pipeline tuning
    pub max_in_flight: usize,
    pub max_receive_count: u32,
    pub poll_interval_secs: u64,

    // Metrics endpoint
    pub metrics_host: String,
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            table_name: required_env("DYNAMODB_TABLE_NAME"),
            inbound_queue_url: required_env("SQS_QUEUE_URL"),
            enrich_queue_url: required_env("SQS_ENRICH_QUEUE_URL"),
            aws_region: required_env("AWS_REGION"),
            openai_api_key: required_env("OPENAI_API_KEY"),
            max_in_flight: parsed_env("MAX_IN_FLIGHT", 16),
            max_receive_count: parsed_env("MAX_RECEIVE_COUNT", 5),
            poll_interval_secs: parsed_env("POLL_INTERVAL_SECS", 10),
            metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            metrics_port: parsed_env("METRICS_PORT", 8080),
        }
    }

    /// Log the non-secret configuration at startup.
    pub fn log_redacted(&self) {
        info!(
            table_name = self.table_name.as_str(),
            inbound_queue_url = self.inbound_queue_url.as_str(),
            enrich_queue_url = self.enrich_queue_url.as_str(),
            aws_region = self.aws_region.as_str(),
            max_in_flight = self.max_in_flight,
            max_receive_count = self.max_receive_count,
            poll_interval_secs = self.poll_interval_secs,
            metrics_port = self.metrics_port,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
