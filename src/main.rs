mod config;
mod fetch;
mod normalize;
mod output;
mod parser;
mod pipeline;
mod record;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "medicinraadet_scraper",
    about = "Scrapes Medicinrådet drug decisions into a CSV, with Gemini name extraction"
)]
struct Cli {
    /// Path to the YAML configuration file holding the Gemini API key
    #[arg(short = 'c', long, default_value = "config.yaml")]
    config_file: PathBuf,

    /// Max headings per structured-extraction request
    #[arg(long, default_value_t = 200)]
    chunk_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let api_key = config::load_api_key(&cli.config_file)?;
    let source = fetch::HttpSource::new()?;
    let extractor = normalize::GeminiClient::new(api_key);
    let pipeline = pipeline::Pipeline::new(source, extractor, cli.chunk_size);

    let records = pipeline.run(None).await?;
    output::write_csv(Path::new(output::OUTPUT_PATH), &records)?;
    println!("Wrote {} decisions to {}", records.len(), output::OUTPUT_PATH);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("Done in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
