//! CLI command implementations

use std::sync::Arc;

use cadenza_analysis::{AnalysisParams, AnalysisResult, Operation};
use cadenza_core::{AssetCache, FetchConfig, HttpFetcher, SourceResolver};

use crate::output::{format_output, OutputFormat};

/// Run one analysis operation and print the result
pub async fn analyze(
    input: &str,
    operation: &str,
    hop_length: Option<i64>,
    n_mfcc: Option<i64>,
    offset: Option<f64>,
    duration: Option<f64>,
    format: &str,
) -> anyhow::Result<()> {
    let operation: Operation = operation.parse()?;
    let params = AnalysisParams::validate(hop_length, n_mfcc, offset, duration)?;

    let resolver = build_resolver()?;
    let asset = resolver.resolve(input).await?;
    let result = cadenza_analysis::analyze_file(&asset.canonical_path, operation, &params)?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", format_output(&result)),
        OutputFormat::Text => print_result(operation, &result),
    }

    Ok(())
}

/// Resolve a source and report where it landed
pub async fn resolve(input: &str, format: &str) -> anyhow::Result<()> {
    let resolver = build_resolver()?;
    let asset = resolver.resolve(input).await?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", format_output(&asset)),
        OutputFormat::Text => {
            println!("Resolved: {}", asset.canonical_path.display());
            println!("  Cache key: {}", asset.cache_key);
            println!("  Temporary: {}", asset.is_temporary);
        }
    }

    Ok(())
}

/// List every operation with its description
pub fn operations() {
    println!("Available operations:\n");
    for op in Operation::ALL {
        println!("  {:<20} {}", op.name(), op.describe());
    }
}

fn build_resolver() -> anyhow::Result<SourceResolver> {
    let cache = Arc::new(AssetCache::new(AssetCache::default_dir())?);
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::default()));
    Ok(SourceResolver::new(cache, fetcher))
}

fn print_result(operation: Operation, result: &AnalysisResult) {
    println!("\nAnalysis: {}", operation.name());

    match result {
        AnalysisResult::Scalar(scalar) => {
            println!("  {}: {:.5}", scalar.label, scalar.value);
        }
        AnalysisResult::Series(series) => {
            if let Some(summary) = &series.summary {
                println!("  {}: {:.5}", summary.label, summary.value);
            }
            println!("  {}: {} values", series.label, series.values.len());
            if !series.values.is_empty() {
                let preview: Vec<String> = series
                    .values
                    .iter()
                    .take(10)
                    .map(|v| format!("{v:.3}"))
                    .collect();
                println!("  First values: {}", preview.join(", "));
            }
        }
        AnalysisResult::Matrix(matrix) => {
            let frames = matrix.rows.first().map_or(0, Vec::len);
            println!("  {}: {} x {} matrix", matrix.label, matrix.rows.len(), frames);
        }
    }
}
