//! Reconcile Binary - Billing Record Reconciliation
//!
//! Reads raw billing rows, spreads each line item's unassigned hours over its
//! country buckets by tier, and writes the tagged records.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin reconcile -- --backend jsonl
//! cargo run --release --bin reconcile -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - RECONCILE_INPUT_PATH - JSONL file of raw rows (default: data/rows.jsonl)
//! - RECONCILE_OUTPUT_PATH - Output file (default: output/country_tagged.jsonl, or data/billflow.db with --backend sqlite)
//! - ALLOCATION_TIERS_PATH - JSON tier policy file (takes precedence over ALLOCATION_TIERS)
//! - ALLOCATION_TIERS - Inline tier policy, e.g. `primary:Philippines,India;fallback:United States,Canada,Israel`
//! - UNASSIGNED_COUNTRY - Sentinel country (default: No Assigned Country Yet)
//! - UNASSIGNED_FACILITY - Sentinel facility (default: No Assigned Facility Yet)
//! - RUST_LOG - Logging level (optional, default: info)

use billflow::config::RuntimeConfig;
use billflow::reconcile_core::{
    format_total_units, JsonlRowReader, ReconcileRun, ReconcileWriter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = RuntimeConfig::from_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.rust_log.as_str()),
    )
    .target(env_logger::Target::Stderr)
    .init();

    log::info!("🚀 Starting billing reconciliation");
    log::info!("   Input: {}", config.input_path.display());
    log::info!("   Output: {}", config.output_path.display());
    for (idx, tier) in config.tier_policy.tiers().iter().enumerate() {
        log::info!(
            "   Tier {} ({}): {}",
            idx + 1,
            tier.name,
            tier.countries.join(", ")
        );
    }
    log::info!(
        "   Unassigned sentinel: {} / {}",
        config.sentinel.country,
        config.sentinel.facility
    );

    let mut reader = JsonlRowReader::new(config.input_path.clone());
    let rows = reader.read_all().await?;

    if rows.is_empty() {
        log::warn!("⚠️  No data rows found in {}", config.input_path.display());
        return Ok(());
    }

    let run = ReconcileRun::new(config.tier_policy.clone(), config.sentinel.clone());
    let reconciliation = run.execute(&rows);
    let summary = &reconciliation.summary;

    let mut writer = ReconcileWriter::new(config.backend, config.output_path.clone())?;
    log::info!("📊 Backend: {}", writer.backend_type());

    writer.write_all(&reconciliation.records).await?;
    writer.write_summary(summary).await?;
    writer.flush().await?;

    log::info!("✅ Reconciliation complete");
    log::info!(
        "   Rows: {} read, {} dropped, {} lines skipped",
        summary.rows_read,
        summary.rows_dropped,
        reader.skipped_lines()
    );
    log::info!(
        "   Line items: {} ({} adjusted)",
        summary.line_items,
        summary.adjusted_line_items
    );
    log::info!(
        "   Residual: {}h, allocated: {}h, unassigned: {}h",
        format_total_units(summary.residual_units),
        format_total_units(summary.allocated_units),
        format_total_units(summary.leftover_units)
    );
    log::info!("   Records written: {}", summary.records);

    if !summary.is_conserved() {
        log::error!("❌ Allocation totals do not reconcile with residuals");
    }

    Ok(())
}
