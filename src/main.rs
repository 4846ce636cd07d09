// Entry point and high-level pipeline flow.
//
// One run loads the sales export, narrows it to the configured market slice,
// builds the monthly, quarterly, and per-category summaries plus the derived
// metrics, shows the charts on the terminal, and writes every table to one
// workbook. Each stage takes the previous stage's tables by reference and
// returns new ones.
mod buckets;
mod charts;
mod config;
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use anyhow::{Context, Result};
use config::AnalysisConfig;
use loader::SliceFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::InfoRow;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_logging();
    let cfg = AnalysisConfig::default();
    run(&cfg)
}

fn run(cfg: &AnalysisConfig) -> Result<()> {
    let filter = SliceFilter::from(cfg);
    let (records, load_report) = loader::load_sales(&cfg.input_path, &filter)
        .with_context(|| format!("loading {}", cfg.input_path.display()))?;
    info!(
        "Processing dataset... ({} rows loaded, {} kept for {} / {} / {})",
        util::format_int(load_report.total_rows as u64),
        util::format_int(load_report.filtered_rows as u64),
        cfg.platform,
        cfg.region,
        cfg.year
    );

    let monthly = reports::monthly_summary(&records);
    let quarterly = reports::quarterly_summary(&records);
    let categories = reports::category_summaries(&records, &cfg.categories);
    let volatility = reports::discount_volatility(&records, cfg.year);
    let derived = reports::derive_metrics(&monthly);
    let profit = reports::profit_table(&derived);
    let correlation = reports::correlation_matrix(&derived);

    let undefined = derived.iter().filter(|d| d.return_impact.value().is_none()).count();
    if undefined > 0 {
        warn!(months = undefined, "return impact undefined where no units were sold");
    }

    output::preview_table("Monthly Summary", None, &monthly, 12);
    output::preview_table("Quarterly Summary", None, &quarterly, 4);
    output::preview_table(
        "Quarterly Discount Volatility",
        Some("sample std dev of discount, x100"),
        &volatility,
        4,
    );
    output::preview_table(
        "Discount & Return",
        Some("return impact = units returned / units sold x 100"),
        &derived,
        12,
    );

    let charts = [
        charts::volatility_chart(&volatility),
        charts::discount_return_chart(&derived),
        charts::correlation_heatmap(&correlation),
    ];
    for chart in &charts {
        chart.show()?;
    }

    let info_row = InfoRow {
        source: cfg.source_label.clone(),
        region: cfg.region.clone(),
        year: cfg.year,
        prepared_by: cfg.prepared_by.clone(),
    };
    let sheets = output::build_sheets(&output::ReportTables {
        records: &records,
        monthly: &monthly,
        quarterly: &quarterly,
        categories: &categories,
        profit: &profit,
        derived: &derived,
        info: &info_row,
    });
    output::write_workbook(&cfg.workbook_path, &sheets)
        .with_context(|| format!("writing {}", cfg.workbook_path.display()))?;

    println!("Output saved to {}", cfg.workbook_path.display());
    Ok(())
}
