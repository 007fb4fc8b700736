use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::record::DecisionDetail;

/// Tried in order; the heading splits at the first separator found.
const HEADING_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

const DANISH_MONTHS: &[(&str, u32)] = &[
    ("januar", 1),
    ("februar", 2),
    ("marts", 3),
    ("april", 4),
    ("maj", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("december", 12),
];

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static RECOMMENDATION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#recommendation").unwrap());

static USAGE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Anvendelse").unwrap());
static ATC_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)ATC-kode").unwrap());
static APPROVED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Godkendt\s+den\s+(\d{1,2})\.?\s+([a-zA-ZæøåÆØÅ]+)\s+(\d{4})").unwrap()
});
static ATC_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]\d{2}[A-Z]{2}\d{2}\b").unwrap());
static GENERIC_DATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\d{1,2}[./\-]\d{1,2}[./\-]\d{4}").unwrap(),
        Regex::new(r"\d{4}[./\-]\d{1,2}[./\-]\d{1,2}").unwrap(),
    ]
});

/// Pull structured fields out of one decision page. Each lookup degrades
/// to `None` when nothing matches; only the drug heading is mandatory for
/// downstream normalization, and even that may come back empty.
pub fn extract_detail(html: &str) -> DecisionDetail {
    let doc = Html::parse_document(html);

    let heading = doc
        .select(&H1_SELECTOR)
        .next()
        .map(|h| h.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let (raw_drug_text, mut indication) = split_heading(&heading);
    if indication.is_none() {
        indication = label_sibling_text(&doc, &USAGE_LABEL_RE);
    }

    let decision_date = approval_date(&doc).or_else(|| generic_date(&doc));

    let atc_code = label_sibling_text(&doc, &ATC_LABEL_RE).or_else(|| atc_by_shape(&doc));

    DecisionDetail {
        raw_drug_text,
        indication,
        decision_date,
        atc_code,
    }
}

/// Split "Drug - Condition" headings into drug and indication parts.
fn split_heading(heading: &str) -> (String, Option<String>) {
    for sep in HEADING_SEPARATORS {
        if let Some((drug, indication)) = heading.split_once(sep) {
            return (
                drug.trim().to_string(),
                Some(indication.trim().to_string()),
            );
        }
    }
    (heading.trim().to_string(), None)
}

/// Find the first text node matching `label`, then the text of its parent's
/// next element sibling. Mirrors the site's "label cell, value cell" markup.
fn label_sibling_text(doc: &Html, label: &Regex) -> Option<String> {
    for node in doc.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if !label.is_match(&text.text) {
            continue;
        }

        let parent = node.parent()?;
        let mut sibling = parent.next_sibling();
        while let Some(candidate) = sibling {
            if let Some(element) = ElementRef::wrap(candidate) {
                let value = element.text().collect::<String>().trim().to_string();
                return if value.is_empty() { None } else { Some(value) };
            }
            sibling = candidate.next_sibling();
        }
        return None;
    }
    None
}

/// "Godkendt den 5. januar 2024" inside the recommendation container,
/// normalized to ISO. An unrecognized month or impossible calendar date
/// falls through to the generic scan.
fn approval_date(doc: &Html) -> Option<String> {
    let container = doc.select(&RECOMMENDATION_SELECTOR).next()?;
    let text: String = container.text().collect::<Vec<_>>().join(" ");
    let caps = APPROVED_DATE_RE.captures(&text)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = danish_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;

    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn danish_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    DANISH_MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

/// Last-resort date: first date-shaped string anywhere in the page, kept
/// as-is rather than normalized.
fn generic_date(doc: &Html) -> Option<String> {
    let text = page_text(doc);
    GENERIC_DATE_RES
        .iter()
        .find_map(|re| re.find(&text).map(|m| m.as_str().to_string()))
}

fn atc_by_shape(doc: &Html) -> Option<String> {
    let text = page_text(doc);
    ATC_CODE_RE.find(&text).map(|m| m.as_str().to_string())
}

fn page_text(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/detail.html").unwrap();
        let detail = extract_detail(&html);
        assert_eq!(detail.raw_drug_text, "Semaglutid (Ozempic)");
        assert_eq!(detail.indication.as_deref(), Some("type 2-diabetes"));
        assert_eq!(detail.decision_date.as_deref(), Some("2024-01-05"));
        assert_eq!(detail.atc_code.as_deref(), Some("A10BJ06"));
    }

    #[test]
    fn heading_splits_on_hyphen() {
        let html = "<h1>Drug A - Condition X</h1>";
        let detail = extract_detail(html);
        assert_eq!(detail.raw_drug_text, "Drug A");
        assert_eq!(detail.indication.as_deref(), Some("Condition X"));
    }

    #[test]
    fn heading_splits_on_en_dash() {
        let html = "<h1>Drug B – Condition Y</h1>";
        let detail = extract_detail(html);
        assert_eq!(detail.raw_drug_text, "Drug B");
        assert_eq!(detail.indication.as_deref(), Some("Condition Y"));
    }

    #[test]
    fn no_separator_uses_usage_label() {
        let html = r#"
            <h1>Drug C</h1>
            <dl><dt>Anvendelse</dt><dd>Condition Z</dd></dl>
        "#;
        let detail = extract_detail(html);
        assert_eq!(detail.raw_drug_text, "Drug C");
        assert_eq!(detail.indication.as_deref(), Some("Condition Z"));
    }

    #[test]
    fn no_separator_no_label_is_none() {
        let detail = extract_detail("<h1>Drug D</h1>");
        assert_eq!(detail.raw_drug_text, "Drug D");
        assert!(detail.indication.is_none());
    }

    #[test]
    fn approval_date_normalizes() {
        let html = r#"
            <h1>Drug E</h1>
            <div id="recommendation"><p>Godkendt den 5. januar 2024</p></div>
        "#;
        let detail = extract_detail(html);
        assert_eq!(detail.decision_date.as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn approval_date_outside_container_ignored() {
        // The specific phrase only counts inside div#recommendation; here the
        // generic scan picks up the raw date shape instead.
        let html = "<h1>Drug F</h1><p>Godkendt den 5. januar 2024, opdateret 12.05.2023</p>";
        let detail = extract_detail(html);
        assert_eq!(detail.decision_date.as_deref(), Some("12.05.2023"));
    }

    #[test]
    fn generic_date_kept_raw() {
        let html = "<h1>Drug G</h1><p>Senest opdateret 2023-11-02</p>";
        let detail = extract_detail(html);
        assert_eq!(detail.decision_date.as_deref(), Some("2023-11-02"));
    }

    #[test]
    fn no_date_is_none() {
        let detail = extract_detail("<h1>Drug H</h1>");
        assert!(detail.decision_date.is_none());
    }

    #[test]
    fn atc_from_label_sibling() {
        let html = r#"
            <h1>Drug I</h1>
            <dl><dt>ATC-kode</dt><dd>L01XC18</dd></dl>
        "#;
        let detail = extract_detail(html);
        assert_eq!(detail.atc_code.as_deref(), Some("L01XC18"));
    }

    #[test]
    fn atc_by_shape_fallback() {
        let html = "<h1>Drug J</h1><p>Lægemidlet er klassificeret som A10BA02 i ATC-systemet.</p>";
        let detail = extract_detail(html);
        assert_eq!(detail.atc_code.as_deref(), Some("A10BA02"));
    }

    #[test]
    fn empty_page_degrades_to_defaults() {
        let detail = extract_detail("<p>Intet indhold</p>");
        assert!(detail.raw_drug_text.is_empty());
        assert!(detail.indication.is_none());
        assert!(detail.decision_date.is_none());
        assert!(detail.atc_code.is_none());
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = std::fs::read_to_string("tests/fixtures/detail.html").unwrap();
        let first = extract_detail(&html);
        let second = extract_detail(&html);
        assert_eq!(first.raw_drug_text, second.raw_drug_text);
        assert_eq!(first.indication, second.indication);
        assert_eq!(first.decision_date, second.decision_date);
        assert_eq!(first.atc_code, second.atc_code);
    }
}
