use async_trait::async_trait;
use openai_client::{util::truncate_to_char_boundary, OpenAi};
use tracing::debug;

use waterline_common::{Extraction, WaterlineError};

use crate::traits::Enricher;

const EXTRACTION_MODEL: &str = "gpt-4o-mini";

/// Upper bound on the message text sent to the model. Inbound notifications
/// are short; anything past this is upstream garbage.
const MAX_MESSAGE_BYTES: usize = 16_384;

const EXTRACTION_SYSTEM_PROMPT: &str = "Given a text message describing a water supply event, \
generate a JSON object conforming to the JSON schema below. The JSON output must accurately \
reflect the details from the message. Response - ONLY JSON. Ignore named places, we need only \
addresses. Message starts with organization name usually. Be accurate with addresses. \
Timestamps are local time without timezone.";

/// Production [`Enricher`] backed by OpenAI chat completions. The system
/// prompt embeds the JSON schema generated from [`Extraction`] itself, so the
/// prompt and the parser cannot drift apart.
pub struct OpenAiEnricher {
    openai: OpenAi,
    system_prompt: String,
}

impl OpenAiEnricher {
    pub fn new(api_key: &str) -> Self {
        let schema = schemars::schema_for!(Extraction);
        let schema_json =
            serde_json::to_string(&schema).expect("extraction schema serializes to JSON");
        Self {
            openai: OpenAi::new(api_key, EXTRACTION_MODEL),
            system_prompt: format!("{EXTRACTION_SYSTEM_PROMPT}\n\n{schema_json}"),
        }
    }

    /// Point the underlying client at a different API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai = self.openai.with_base_url(url);
        self
    }
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    async fn enrich(&self, raw_message: &str) -> Result<String, WaterlineError> {
        let text = truncate_to_char_boundary(raw_message, MAX_MESSAGE_BYTES);

        debug!(model = EXTRACTION_MODEL, bytes = text.len(), "Extraction request");

        self.openai
            .chat_completion(&self.system_prompt, text)
            .await
            .map_err(|e| WaterlineError::Extraction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_the_extraction_schema() {
        let enricher = OpenAiEnricher::new("sk-test");
        assert!(enricher.system_prompt.contains("ONLY JSON"));
        assert!(enricher.system_prompt.contains("short_description"));
        assert!(enricher.system_prompt.contains("shutdown"));
        assert!(enricher.system_prompt.contains("ул."));
    }
}
