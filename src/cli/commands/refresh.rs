//! `refresh` command handler.

use serde_json::json;

use super::print_json;
use crate::cache::{EffectCache, RefreshReport};
use crate::cli::args::{OutputFormat, RefreshArgs};
use crate::error::HonorFxError;
use crate::store::GroupStore;

/// Load every stored group into a fresh cache and print the report.
///
/// Skipped documents are reported but do not fail the command.
///
/// # Errors
///
/// Returns a store error if the group directory cannot be listed.
pub async fn run(store: &dyn GroupStore, args: &RefreshArgs) -> Result<(), HonorFxError> {
    let cache = EffectCache::new();
    let report = cache.refresh(store).await?;

    match args.format {
        OutputFormat::Json => print_json(&report_json(&report))?,
        OutputFormat::Human => {
            println!(
                "Loaded {} group(s), skipped {}",
                report.loaded.len(),
                report.skipped.len()
            );
            for id in &report.loaded {
                println!("  loaded   {id}");
            }
            for (id, reason) in &report.skipped {
                println!("  skipped  {id}: {reason}");
            }
        }
    }
    Ok(())
}

fn report_json(report: &RefreshReport) -> serde_json::Value {
    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|(id, reason)| json!({ "id": id, "reason": reason }))
        .collect();
    json!({ "loaded": report.loaded, "skipped": skipped })
}
