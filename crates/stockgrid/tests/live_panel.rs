//! Smoke test against a running back office
//!
//! Needs node with the `playwright` package and a shop reachable at
//! `STOCKGRID_BASE_URL`. Run with `cargo test -- --ignored`.

use std::path::Path;
use std::process::Command;

use stockgrid::playwright::PlaywrightDriver;
use stockgrid::{GridConfig, StockGrid, StockStatus};

fn in_path(bin: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {bin} >/dev/null 2>&1"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn live_config() -> Option<GridConfig> {
    if std::env::var("STOCKGRID_BASE_URL").is_err() {
        eprintln!("Skipping: STOCKGRID_BASE_URL not set");
        return None;
    }
    let path = std::env::var("STOCKGRID_CONFIG").unwrap_or_else(|_| "stockgrid.toml".to_string());
    let mut config = GridConfig::load(Path::new(&path)).expect("load config");
    config.apply_env().expect("apply env overrides");
    if !in_path(&config.playwright.node_binary) {
        eprintln!("Skipping: {} not available in PATH", config.playwright.node_binary);
        return None;
    }
    Some(config)
}

#[tokio::test]
#[ignore]
async fn filters_settle_against_live_page() {
    let Some(config) = live_config() else { return };

    let driver = PlaywrightDriver::launch(&config.playwright)
        .await
        .expect("launch playwright bridge")
        .with_attribute_poll(config.sync.poll_interval());
    let grid = StockGrid::from_config(driver, &config);
    grid.open(&config.stock_url()).await.expect("open stock page");

    let total = grid.reset_and_count().await.expect("count rows");
    assert!(total > 0, "stock page lists no products");

    grid.filter_by_status(StockStatus::Enabled).await.expect("status filter");
    let enabled = grid.row_count().await.expect("count enabled");
    grid.filter_by_status(StockStatus::All).await.expect("status filter");
    assert!(grid.row_count().await.expect("count all") >= enabled);

    let first = grid.read_row(1).await.expect("read first row");
    grid.apply_text_filter(&first.reference).await.expect("text filter");
    let names = grid.all_names().await.expect("names");
    assert!(names.contains(&first.name), "{:?} missing from {:?}", first.name, names);

    assert_eq!(grid.clear_filters().await.expect("clear filters"), total);
}

#[tokio::test]
#[ignore]
async fn quantity_edit_round_trips_on_live_page() {
    let Some(config) = live_config() else { return };

    let driver = PlaywrightDriver::launch(&config.playwright)
        .await
        .expect("launch playwright bridge")
        .with_attribute_poll(config.sync.poll_interval());
    let grid = StockGrid::from_config(driver, &config);
    grid.open(&config.stock_url()).await.expect("open stock page");

    let before = grid.stock_quantities(1).await.expect("read quantities");
    let message = grid
        .update_row_quantity(1, before.physical + 1)
        .await
        .expect("update quantity");
    assert!(message.contains("successfully"), "unexpected notification {:?}", message);
    assert_eq!(grid.stock_quantities(1).await.expect("re-read").physical, before.physical + 1);

    grid.update_row_quantity(1, before.physical).await.expect("restore quantity");
}
