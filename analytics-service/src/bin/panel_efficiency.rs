use analytics_service::{
    config::AppConfig,
    efficiency::{self, EfficiencyCalculator},
    observability,
};
use anyhow::Result;

/// Run one efficiency pass over the configured panel CSV and print the derived
/// table as JSON. Purely local: reads the file once, writes nothing but stdout.
fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let calculator = EfficiencyCalculator::new(cfg.panel_data.panel_area_m2)?;
    let rows = efficiency::load_measurements(&cfg.panel_data.csv_path)?;
    let derived = calculator.compute(&rows);

    let defined = derived.iter().filter(|r| r.efficiency_ratio.is_some()).count();
    tracing::info!(
        rows = derived.len(),
        defined_ratios = defined,
        panel_area_m2 = calculator.panel_area_m2(),
        "efficiency pass complete"
    );

    serde_json::to_writer_pretty(std::io::stdout().lock(), &derived)?;
    println!();

    Ok(())
}
