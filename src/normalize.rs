use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::record::EnrichedDecision;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Pause after each successful extraction call to bound request rate.
const CHUNK_PAUSE: Duration = Duration::from_secs(1);

/// Normalized name pair for one raw heading. Either field may be absent
/// from the service response, in which case it defaults to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugNames {
    #[serde(default)]
    pub active_ingredient: String,
    #[serde(default)]
    pub trade_name: String,
}

/// Capability interface for the external structured-extraction service.
/// Injected into the pipeline so tests can use a deterministic fake.
#[async_trait]
pub trait NameExtractor: Send + Sync {
    /// Map each input string to its name pair. Keys must be echoed back
    /// character-for-character; a missing key is a miss, not an error.
    async fn extract_names(&self, texts: &[String]) -> Result<HashMap<String, DrugNames>>;
}

/// Gemini-backed extractor.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiClient {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: GEMINI_MODEL.to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{GEMINI_BASE_URL}/models/{}:generateContent",
            self.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?
            .error_for_status()
            .context("Gemini returned an error status")?;

        let reply: GenerateResponse = response
            .json()
            .await
            .context("failed to decode Gemini response envelope")?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .context("Gemini response contained no candidates")
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl NameExtractor for GeminiClient {
    async fn extract_names(&self, texts: &[String]) -> Result<HashMap<String, DrugNames>> {
        let json_input = serde_json::to_string(texts)?;
        let prompt = format!(
            "I will provide a JSON list of Danish medical header texts.\n\
             For each text extract the 'Active Ingredient' (generic name) and the \
             'Trade Name' (brand name).\n\
             If there are multiple drugs, join them with ' + '.\n\n\
             Return ONLY a JSON object where the keys are the EXACT input strings \
             provided, and the values are objects with keys \"active_ingredient\" \
             and \"trade_name\".\n\n\
             Input List:\n{json_input}"
        );

        let reply = self.generate(&prompt).await?;
        parse_names_response(&reply)
    }
}

/// Decode a service reply, tolerating markdown code-fence wrapping.
pub fn parse_names_response(reply: &str) -> Result<HashMap<String, DrugNames>> {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(cleaned).context("extraction reply is not a name mapping")
}

/// Run the extractor over `texts` in chunks of at most `chunk_size`,
/// merging all successful replies. A chunk whose call or decode fails is
/// logged and skipped whole; its entries simply stay absent.
pub async fn normalize_names(
    extractor: &dyn NameExtractor,
    texts: &[String],
    chunk_size: usize,
) -> HashMap<String, DrugNames> {
    let mut mapping = HashMap::new();
    if texts.is_empty() {
        return mapping;
    }

    let chunk_size = chunk_size.max(1);
    let chunk_count = texts.len().div_ceil(chunk_size);
    info!(
        "Extracting names for {} unique headings in {} chunk(s) of up to {}",
        texts.len(),
        chunk_count,
        chunk_size
    );

    for (index, chunk) in texts.chunks(chunk_size).enumerate() {
        info!("Processing chunk {}/{} ({} items)", index + 1, chunk_count, chunk.len());
        match extractor.extract_names(chunk).await {
            Ok(names) => {
                mapping.extend(names);
                tokio::time::sleep(CHUNK_PAUSE).await;
            }
            Err(e) => {
                warn!("Chunk {}/{} failed, skipping: {e:#}", index + 1, chunk_count);
            }
        }
    }

    mapping
}

/// Copy normalized names onto every record. Guarantees both name fields
/// are set afterwards: a heading the service missed falls back to the raw
/// heading itself, and heading-less records get empty strings.
pub fn apply_names(records: &mut [EnrichedDecision], mapping: &HashMap<String, DrugNames>) {
    for record in records {
        if record.raw_drug_text.is_empty() {
            record.active_ingredient = String::new();
            record.trade_name = String::new();
            continue;
        }

        match mapping.get(&record.raw_drug_text) {
            Some(names) => {
                record.active_ingredient = names.active_ingredient.clone();
                record.trade_name = names.trade_name.clone();
            }
            None => {
                warn!("Extractor missed heading: {}", record.raw_drug_text);
                record.active_ingredient = record.raw_drug_text.clone();
                record.trade_name = String::new();
            }
        }
    }
}
