//! Decodes the extraction service's raw textual output into [`Extraction`].
//! Pure, no I/O. Models wrap JSON in markdown fences often enough that the
//! fences are stripped unconditionally before decoding.

use openai_client::util::strip_code_blocks;
use waterline_common::{Extraction, WaterlineError};

pub fn parse_extraction(raw: &str) -> Result<Extraction, WaterlineError> {
    let cleaned = strip_code_blocks(raw);
    serde_json::from_str(cleaned).map_err(|e| WaterlineError::MalformedExtraction(e.to_string()))
}
