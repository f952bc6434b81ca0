//! Fixtures shared by the grid integration tests

#![allow(dead_code)]

use stockgrid::fake::{FakeProduct, FakeStockPanel, PanelTiming};
use stockgrid::{StockGrid, StockSelectors, SyncConfig};

pub type FakeGrid = StockGrid<FakeStockPanel>;

pub fn sync_config() -> SyncConfig {
    SyncConfig {
        timeout_ms: 5_000,
        appear_grace_ms: 200,
        poll_interval_ms: 10,
    }
}

/// A small catalog resembling the demo shop
pub fn catalog() -> Vec<FakeProduct> {
    vec![
        FakeProduct::new("Hummingbird printed t-shirt", "demo_1", "Fashion Supplier", 300)
            .in_category("Clothes")
            .in_category("Men"),
        FakeProduct::new("Brown bear cushion", "demo_13", "Accessories supplier", 300)
            .reserved(2)
            .in_category("Home Accessories"),
        FakeProduct::new("Mountain fox notebook", "demo_8", "Accessories supplier", 10)
            .disabled()
            .in_category("Stationery"),
        FakeProduct::new("Customizable mug", "demo_14", "", 5)
            .reserved(7)
            .in_category("Home Accessories"),
    ]
}

pub fn abc() -> Vec<FakeProduct> {
    vec![
        FakeProduct::new("A", "ref_a", "Acme", 1),
        FakeProduct::new("B", "ref_b", "Acme", 10),
        FakeProduct::new("C", "ref_c", "Acme", 3),
    ]
}

pub fn grid_with(products: Vec<FakeProduct>, timing: PanelTiming) -> FakeGrid {
    let panel = FakeStockPanel::new(StockSelectors::default(), products).with_timing(timing);
    StockGrid::new(panel, StockSelectors::default(), sync_config())
}

/// Grid whose loader is visible for 300 ms after each change
pub fn slow_grid(products: Vec<FakeProduct>) -> FakeGrid {
    grid_with(products, PanelTiming::default())
}

/// Grid whose server answers before any loader can be observed
pub fn fast_grid(products: Vec<FakeProduct>) -> FakeGrid {
    grid_with(products, PanelTiming::instant())
}
