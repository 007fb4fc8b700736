use anyhow::{Context, Result};
use async_trait::async_trait;

pub const BASE_URL: &str = "https://medicinraadet.dk";
const LISTING_PATH: &str = "/anbefalinger-og-vejledninger";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Where listing and detail HTML comes from. The pipeline only ever talks
/// to this trait, so tests can substitute fixture pages for the live site.
#[async_trait]
pub trait Source: Send + Sync {
    async fn listing_page(&self, page: u32) -> Result<String>;
    async fn detail_page(&self, url: &str) -> Result<String>;
}

/// Live HTTP source against medicinraadet.dk.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpSource {
            client,
            base_url: BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn listing_page(&self, page: u32) -> Result<String> {
        let page = page.to_string();
        let params = [
            ("order", "updated desc"),
            ("currentpageid", "1095"),
            ("database", "1095"),
            ("secondary", "1096"),
            ("category", ""),
            ("archived", "0"),
            ("page", page.as_str()),
        ];

        let url = format!("{}{}", self.base_url, LISTING_PATH);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("failed to fetch listing page {page}"))?
            .error_for_status()
            .with_context(|| format!("listing page {page} returned an error status"))?;

        response
            .text()
            .await
            .with_context(|| format!("failed to read listing page {page} body"))
    }

    async fn detail_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        response
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))
    }
}
