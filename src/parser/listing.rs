use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::record::{DecisionSummary, Status};

const RESULTS_PER_PAGE: u32 = 25;

static RESULTS_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)af\s+(\d+)\s+resultater").unwrap());
static PAGE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"page=(\d+)").unwrap());

static CARD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="card"]"#).unwrap());
static ARTICLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").unwrap());
static DECISION_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/anbefalinger-og-vejledninger/"]"#).unwrap());
static PAGINATION_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="pagination"] a[href*="page="]"#).unwrap());

/// Extract one `DecisionSummary` per listing card. Cards without a decision
/// link or a recognizable status are dropped, not emitted.
pub fn extract_summaries(html: &str, base_url: &str) -> Vec<DecisionSummary> {
    let doc = Html::parse_document(html);
    card_candidates(&doc)
        .into_iter()
        .filter_map(|card| extract_summary(card, base_url))
        .collect()
}

/// Priority-ordered container strategies. The site's class names are not
/// stable, so each tier is tried until one yields candidates: card-like
/// divs, then articles, then the parents of decision anchors.
fn card_candidates(doc: &Html) -> Vec<ElementRef<'_>> {
    let cards: Vec<_> = doc.select(&CARD_SELECTOR).collect();
    if !cards.is_empty() {
        return cards;
    }

    let articles: Vec<_> = doc.select(&ARTICLE_SELECTOR).collect();
    if !articles.is_empty() {
        return articles;
    }

    doc.select(&DECISION_LINK_SELECTOR)
        .filter_map(|link| link.parent().and_then(ElementRef::wrap))
        .collect()
}

fn extract_summary(card: ElementRef<'_>, base_url: &str) -> Option<DecisionSummary> {
    let link = card.select(&DECISION_LINK_SELECTOR).next()?;
    let href = link.value().attr("href")?;
    let url = if href.starts_with('/') {
        format!("{base_url}{href}")
    } else {
        href.to_string()
    };

    let card_text: String = card.text().collect::<Vec<_>>().join(" ");
    let status = Status::classify(&card_text);
    if status == Status::Unknown {
        return None;
    }

    Some(DecisionSummary { url, status })
}

/// Page count for the listing. Primary signal is the "af N resultater"
/// phrase; fallback is the highest `page=` value among pagination links;
/// a page with neither counts as a single page.
pub fn total_pages(html: &str) -> u32 {
    let doc = Html::parse_document(html);

    let text: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
    if let Some(caps) = RESULTS_COUNT_RE.captures(&text) {
        if let Ok(total) = caps[1].parse::<u32>() {
            return ((total + RESULTS_PER_PAGE - 1) / RESULTS_PER_PAGE).max(1);
        }
    }

    let mut max_page = 1;
    for link in doc.select(&PAGINATION_LINK_SELECTOR) {
        if let Some(href) = link.value().attr("href") {
            if let Some(caps) = PAGE_PARAM_RE.captures(href) {
                if let Ok(page) = caps[1].parse::<u32>() {
                    max_page = max_page.max(page);
                }
            }
        }
    }
    max_page
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://medicinraadet.dk";

    #[test]
    fn listing_fixture_cards() {
        let html = std::fs::read_to_string("tests/fixtures/listing.html").unwrap();
        let summaries = extract_summaries(&html, BASE);
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].status, Status::Recommended);
        assert_eq!(summaries[1].status, Status::PartiallyRecommended);
        assert_eq!(summaries[2].status, Status::NotRecommended);
        assert!(summaries[0]
            .url
            .starts_with("https://medicinraadet.dk/anbefalinger-og-vejledninger/"));
    }

    #[test]
    fn relative_hrefs_are_absolutized() {
        let html = r#"<div class="result-card">
            <a href="/anbefalinger-og-vejledninger/abc">Abc</a>
            <span>Anbefalet</span>
        </div>"#;
        let summaries = extract_summaries(html, BASE);
        assert_eq!(
            summaries[0].url,
            "https://medicinraadet.dk/anbefalinger-og-vejledninger/abc"
        );
    }

    #[test]
    fn article_fallback() {
        let html = r#"<article>
            <a href="/anbefalinger-og-vejledninger/xyz">Xyz</a>
            <p>Ikke anbefalet</p>
        </article>"#;
        let summaries = extract_summaries(html, BASE);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, Status::NotRecommended);
    }

    #[test]
    fn anchor_parent_fallback() {
        let html = r#"<ul><li>
            <a href="/anbefalinger-og-vejledninger/plain">Plain</a>
            Delvist anbefalet
        </li></ul>"#;
        let summaries = extract_summaries(html, BASE);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, Status::PartiallyRecommended);
    }

    #[test]
    fn unknown_status_dropped() {
        let html = r#"<div class="card">
            <a href="/anbefalinger-og-vejledninger/pending">Pending</a>
            <span>Under vurdering</span>
        </div>"#;
        assert!(extract_summaries(html, BASE).is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = std::fs::read_to_string("tests/fixtures/listing.html").unwrap();
        let first = extract_summaries(&html, BASE);
        let second = extract_summaries(&html, BASE);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.url, b.url);
            assert_eq!(a.status, b.status);
        }
    }

    #[test]
    fn total_pages_from_results_count() {
        let html = "<p>Viser 1-25 af 132 resultater</p>";
        assert_eq!(total_pages(html), 6);
    }

    #[test]
    fn total_pages_exact_multiple() {
        let html = "<p>Viser 1-25 af 50 resultater</p>";
        assert_eq!(total_pages(html), 2);
    }

    #[test]
    fn total_pages_from_pagination_links() {
        let html = r#"<div class="pagination">
            <a href="?page=2">2</a>
            <a href="?page=7">7</a>
            <a href="?page=3">3</a>
        </div>"#;
        assert_eq!(total_pages(html), 7);
    }

    #[test]
    fn total_pages_defaults_to_one() {
        assert_eq!(total_pages("<p>Ingen resultater</p>"), 1);
    }
}
