use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use solar_roi_ledger::clock::SystemClock;
use solar_roi_ledger::config::Config;
use solar_roi_ledger::import;
use solar_roi_ledger::ledger::LedgerService;
use solar_roi_ledger::report::{ConsumptionReport, ReportRange};
use solar_roi_ledger::store::ConsumptionStore;
use solar_roi_ledger::telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let store = build_store(&cfg).await?;
    let service = LedgerService::new(store.clone(), Arc::new(SystemClock), cfg.tariff.clone());

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| cfg.import.path.clone());
    info!(path = %path, "importing readings");
    let stats = import::import_readings(&service, Path::new(&path)).await?;
    info!(
        submitted = stats.submitted,
        skipped = stats.skipped,
        "import finished"
    );

    // Derived state as JSON lines: ROI records first, then the report.
    println!("# monthly_roi");
    for roi in store.list_roi().await? {
        println!("{}", serde_json::to_string(&roi)?);
    }

    println!("# average_consumption");
    let report = ConsumptionReport::new(store.clone());
    for row in report.execute(ReportRange::default()).await? {
        println!("{}", serde_json::to_string(&row)?);
    }

    Ok(())
}

#[cfg(feature = "db")]
async fn build_store(cfg: &Config) -> Result<Arc<dyn ConsumptionStore>> {
    use solar_roi_ledger::store::PgStore;
    Ok(Arc::new(PgStore::connect(&cfg.db.url).await?))
}

#[cfg(not(feature = "db"))]
async fn build_store(cfg: &Config) -> Result<Arc<dyn ConsumptionStore>> {
    use solar_roi_ledger::store::MemoryStore;
    let _ = cfg;
    Ok(Arc::new(MemoryStore::new()))
}
