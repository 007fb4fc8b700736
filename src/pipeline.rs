use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::fetch::{Source, BASE_URL};
use crate::normalize::{self, NameExtractor};
use crate::parser::{detail, listing};
use crate::record::{DecisionSummary, EnrichedDecision};

const PAGE_DELAY: Duration = Duration::from_secs(1);
const DETAIL_DELAY: Duration = Duration::from_secs(1);

/// Sequences listing pagination, approval filtering, detail enrichment and
/// name normalization. Only an unreadable first listing page aborts a run;
/// every later failure is contained to its page, record or chunk.
pub struct Pipeline<S, E> {
    source: S,
    extractor: E,
    chunk_size: usize,
    base_url: String,
}

impl<S: Source, E: NameExtractor> Pipeline<S, E> {
    pub fn new(source: S, extractor: E, chunk_size: usize) -> Self {
        Pipeline {
            source,
            extractor,
            chunk_size,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Run the full pipeline. `max_pages` overrides the detected page count
    /// for bounded runs; pagination still exits early on an empty page.
    pub async fn run(&self, max_pages: Option<u32>) -> Result<Vec<EnrichedDecision>> {
        info!("Fetching listing page 1...");
        let first = self
            .source
            .listing_page(1)
            .await
            .context("failed to fetch the first listing page")?;

        let total = match max_pages {
            Some(pages) => pages,
            None => {
                let detected = listing::total_pages(&first);
                info!("Detected {detected} listing page(s)");
                detected
            }
        };

        let mut summaries = listing::extract_summaries(&first, &self.base_url);
        for page in 2..=total {
            tokio::time::sleep(PAGE_DELAY).await;
            info!("Fetching listing page {page}/{total}...");
            let html = match self.source.listing_page(page).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Listing page {page} failed, stopping pagination: {e:#}");
                    break;
                }
            };
            let batch = listing::extract_summaries(&html, &self.base_url);
            if batch.is_empty() {
                info!("Listing page {page} had no decisions, stopping pagination");
                break;
            }
            summaries.extend(batch);
        }
        info!("Total decisions found: {}", summaries.len());

        let approved: Vec<DecisionSummary> = summaries
            .into_iter()
            .filter(|s| s.status.is_approved())
            .collect();
        info!("Approved or partially approved decisions: {}", approved.len());

        let (mut records, unique_texts) = self.enrich_details(approved).await;

        let texts: Vec<String> = unique_texts.into_iter().collect();
        let mapping = normalize::normalize_names(&self.extractor, &texts, self.chunk_size).await;
        normalize::apply_names(&mut records, &mapping);

        Ok(records)
    }

    /// Fetch and parse each approved decision's detail page. A failed record
    /// stays in its pre-enrichment state; non-empty headings are collected
    /// (deduplicated, ordered) for the normalization stage.
    async fn enrich_details(
        &self,
        approved: Vec<DecisionSummary>,
    ) -> (Vec<EnrichedDecision>, BTreeSet<String>) {
        let mut records = Vec::with_capacity(approved.len());
        let mut unique_texts = BTreeSet::new();
        if approved.is_empty() {
            return (records, unique_texts);
        }

        info!("Fetching details for {} decisions...", approved.len());
        let pb = ProgressBar::new(approved.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap()
                .progress_chars("=> "),
        );

        for (i, summary) in approved.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(DETAIL_DELAY).await;
            }
            let mut record = EnrichedDecision::from(summary);
            match self.source.detail_page(&record.url).await {
                Ok(html) => {
                    let fields = detail::extract_detail(&html);
                    if !fields.raw_drug_text.is_empty() {
                        unique_texts.insert(fields.raw_drug_text.clone());
                    }
                    record.merge_detail(fields);
                }
                Err(e) => warn!("Failed to enrich {}: {e:#}", record.url),
            }
            records.push(record);
            pb.inc(1);
        }
        pb.finish_and_clear();

        (records, unique_texts)
    }
}
