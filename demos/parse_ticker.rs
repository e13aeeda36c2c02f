use anyhow::{bail, Context};
use chrono::NaiveDate;
use exhibit_model_builder::*;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (Some(root), Some(ticker)) = (args.next(), args.next()) else {
        bail!("usage: parse_ticker <data-root> <TICKER> [YYYY-MM-DD]");
    };
    let as_of = match args.next() {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("invalid as-of date '{}'", date))?,
        None => chrono::Local::now().date_naive(),
    };

    let config = match std::env::var("EXHIBIT_CONFIG") {
        Ok(path) => PipelineConfig::from_json_file(&PathBuf::from(&path))
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => PipelineConfig::default(),
    };

    let dataset = load_dataset(&PathBuf::from(root), &ticker, as_of, &config)?;

    println!("📂 {} as of {}\n", dataset.ticker, dataset.as_of);
    for (kind, outcome) in &dataset.outcomes {
        match outcome {
            LoadOutcome::Loaded { path, metrics, report } => println!(
                "✅ {}: {} metrics from {} ({} rows skipped)",
                kind,
                metrics,
                path,
                report.skipped.len()
            ),
            LoadOutcome::NotFound { .. } => println!("➖ {}: not available", kind),
            LoadOutcome::Malformed { path, details } | LoadOutcome::Unreadable { path, details } => {
                println!("⚠️  {}: {} ({})", kind, path, details)
            }
        }
    }

    for statement in dataset.statements() {
        println!("\n{}", statement.to_markdown());
    }

    println!("{}", dataset.analytics.to_summary_text());

    match dataset.current_quarter_estimates()? {
        CurrentQuarterOutcome::Extracted(extract) => println!("\n{}", extract.to_prompt_text()),
        CurrentQuarterOutcome::NoEstimateData { period, .. } => {
            println!("\nNo values found for the current quarter ({})", period)
        }
    }

    Ok(())
}
