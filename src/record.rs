use std::sync::LazyLock;

use regex::Regex;

/// Recommendation verdict shown on a listing card.
///
/// Classification order matters: "Delvist anbefalet" and "Ikke anbefalet"
/// both contain "anbefalet" as a substring, so the more specific phrases
/// are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Recommended,
    PartiallyRecommended,
    NotRecommended,
    Unknown,
}

static STATUS_PATTERNS: LazyLock<Vec<(Regex, Status)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)Delvist\s+anbefalet").unwrap(),
            Status::PartiallyRecommended,
        ),
        (
            Regex::new(r"(?i)Ikke\s+anbefalet").unwrap(),
            Status::NotRecommended,
        ),
        (Regex::new(r"(?i)Anbefalet").unwrap(), Status::Recommended),
    ]
});

impl Status {
    /// Classify free card text by ordered pattern precedence.
    pub fn classify(text: &str) -> Status {
        for (pattern, status) in STATUS_PATTERNS.iter() {
            if pattern.is_match(text) {
                return *status;
            }
        }
        Status::Unknown
    }

    /// Approved decisions proceed to detail enrichment; the rest are dropped.
    pub fn is_approved(&self) -> bool {
        matches!(self, Status::Recommended | Status::PartiallyRecommended)
    }
}

/// One listing card: where the decision page lives and how it was decided.
#[derive(Debug, Clone)]
pub struct DecisionSummary {
    pub url: String,
    pub status: Status,
}

/// Fields parsed from a single decision page.
#[derive(Debug, Clone, Default)]
pub struct DecisionDetail {
    pub raw_drug_text: String,
    pub indication: Option<String>,
    pub decision_date: Option<String>,
    pub atc_code: Option<String>,
}

/// A decision carried through the whole pipeline. Detail fields stay at
/// their defaults when enrichment fails; name fields are filled during
/// normalization and are guaranteed non-absent afterwards.
#[derive(Debug, Clone)]
pub struct EnrichedDecision {
    pub url: String,
    pub status: Status,
    pub raw_drug_text: String,
    pub indication: Option<String>,
    pub decision_date: Option<String>,
    pub atc_code: Option<String>,
    pub active_ingredient: String,
    pub trade_name: String,
}

impl From<DecisionSummary> for EnrichedDecision {
    fn from(summary: DecisionSummary) -> Self {
        EnrichedDecision {
            url: summary.url,
            status: summary.status,
            raw_drug_text: String::new(),
            indication: None,
            decision_date: None,
            atc_code: None,
            active_ingredient: String::new(),
            trade_name: String::new(),
        }
    }
}

impl EnrichedDecision {
    pub fn merge_detail(&mut self, detail: DecisionDetail) {
        self.raw_drug_text = detail.raw_drug_text;
        self.indication = detail.indication;
        self.decision_date = detail.decision_date;
        self.atc_code = detail.atc_code;
    }
}
