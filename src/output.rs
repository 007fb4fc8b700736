use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::record::EnrichedDecision;

pub const OUTPUT_PATH: &str = "output.csv";

/// Excel recognizes UTF-8 only with a leading BOM.
const BOM: &str = "\u{feff}";

const COLUMNS: [&str; 5] = [
    "Active Ingredient",
    "Trade Name",
    "ATC Code",
    "Decision Date",
    "Indication",
];

/// Serialize records as UTF-8-with-BOM CSV in fixed column order. Absent
/// optional fields become empty cells.
pub fn write_csv(path: &Path, records: &[EnrichedDecision]) -> Result<()> {
    let mut out = String::from(BOM);
    out.push_str(&COLUMNS.join(","));
    out.push('\n');

    for record in records {
        let row = [
            record.active_ingredient.as_str(),
            record.trade_name.as_str(),
            record.atc_code.as_deref().unwrap_or(""),
            record.decision_date.as_deref().unwrap_or(""),
            record.indication.as_deref().unwrap_or(""),
        ];
        let cells: Vec<String> = row.iter().map(|field| escape(field)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }

    std::fs::write(path, out)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Saved {} row(s) to {}", records.len(), path.display());
    Ok(())
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
