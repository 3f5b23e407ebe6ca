//! DelayLens CLI
//!
//! Runs the full delay analysis over a delivery CSV and logs the results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use delaylens_core::report::ReportSection;
use delaylens_core::{
    canonical_json_string, AnalysisConfig, AnalysisReport, AnalysisSession, DeliveryQuery,
    MissingPolicy,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "delaylens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Delivery delay analysis: association rules and classifier comparison", long_about = None)]
struct Args {
    /// Input CSV with Weather, Traffic, Vehicle, Area and Delivery_Time columns
    #[arg(short, long)]
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the full report as canonical JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Classify one delivery: weather,traffic,vehicle,area
    #[arg(long)]
    predict: Option<String>,

    /// Fill missing categorical values with the column mode instead of dropping rows
    #[arg(long)]
    fill_missing: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn parse_query(raw: &str) -> Result<DeliveryQuery> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [weather, traffic, vehicle, area] = parts.as_slice() else {
        bail!("--predict expects 4 comma-separated values, got {}", parts.len());
    };
    Ok(DeliveryQuery::new(*weather, *traffic, *vehicle, *area))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("DelayLens v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_toml_file(path).context("Failed to load configuration")?,
        None => AnalysisConfig::default(),
    };
    if args.fill_missing {
        config.missing = MissingPolicy::FillMode;
    }
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    let (session, load) =
        AnalysisSession::from_csv(&args.input, config).context("Failed to load dataset")?;
    info!(
        "Rows read={} kept={} dropped={} imputed={}",
        load.rows_read, load.rows_kept, load.rows_dropped, load.cells_imputed
    );
    info!(
        "Delay threshold {:.2} min; split test_fraction={} seed={}",
        session.threshold().value,
        session.config().test_fraction,
        session.config().seed
    );

    let report = AnalysisReport::build(&session, Some(load));

    if let ReportSection::Ready { value: rules } = &report.association_rules {
        info!("Association rules:");
        for rule in rules {
            info!(
                "  {:<42} support={:.4} confidence={:.4} lift={:.4} ({}/{} matching delayed)",
                rule.condition.name,
                rule.support,
                rule.confidence,
                rule.lift,
                rule.matching_delayed,
                rule.matching
            );
        }
    }

    if let ReportSection::Ready { value: tree } = &report.decision_tree {
        info!("Decision tree (test accuracy {:.4}):\n{}", tree.accuracy, tree.rendered);
        info!("Classification report:\n{}", tree.report.render());
    }

    if let Some(raw) = &args.predict {
        let query = parse_query(raw)?;
        match session.decision_tree_study() {
            Ok(study) => match study.predict(&query) {
                Ok(prediction) => info!(
                    "Prediction for {}: {} (node {}{})",
                    raw,
                    prediction.label,
                    prediction.node,
                    if prediction.fallback { ", fallback" } else { "" }
                ),
                Err(err) => warn!("Prediction rejected: {err}"),
            },
            Err(err) => warn!("Decision tree unavailable: {err}"),
        }
    }

    if let Some(path) = &args.output {
        let json = canonical_json_string(&report).context("Failed to serialize report")?;
        std::fs::write(path, json).context("Failed to write report")?;
        info!("Report written to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing() {
        let query = parse_query("Stormy, High ,bicycle,Urban").unwrap();
        assert_eq!(query, DeliveryQuery::new("Stormy", "High", "bicycle", "Urban"));
        assert!(parse_query("Stormy,High").is_err());
    }
}
