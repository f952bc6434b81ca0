//! Filters and quantity edits against the in-memory stock page

mod common;

use stockgrid::fake::FakeStockPanel;
use stockgrid::{
    FilterState, GridError, GridState, StockGrid, StockSelectors, StockStatus, SyncConfig,
    SUCCESSFUL_UPDATE_MESSAGE,
};

use common::{abc, catalog, fast_grid, slow_grid};

#[tokio::test(start_paused = true)]
async fn clear_filters_is_idempotent() {
    let grid = slow_grid(catalog());
    grid.apply_text_filter("demo_1").await.unwrap();
    grid.apply_text_filter("cushion").await.unwrap();
    assert_eq!(grid.row_count().await.unwrap(), 1);

    let first = grid.clear_filters().await.unwrap();
    let second = grid.clear_filters().await.unwrap();

    assert_eq!(first, 4);
    assert_eq!(second, first);
    assert!(grid.search_tags().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeating_a_text_filter_keeps_the_same_rows() {
    let grid = slow_grid(catalog());

    grid.apply_text_filter("demo_1").await.unwrap();
    let first = grid.snapshot().await.unwrap();
    grid.apply_text_filter("demo_1").await.unwrap();
    let second = grid.snapshot().await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(grid.state(), GridState::Idle);
}

#[tokio::test(start_paused = true)]
async fn clear_filters_without_tags_returns_unfiltered_count() {
    let grid = fast_grid(abc());
    assert_eq!(grid.clear_filters().await.unwrap(), 3);
    assert_eq!(grid.state(), GridState::Idle);
}

#[tokio::test(start_paused = true)]
async fn status_all_lists_at_least_enabled() {
    let grid = slow_grid(catalog());

    grid.filter_by_status(StockStatus::Enabled).await.unwrap();
    let enabled = grid.row_count().await.unwrap();
    grid.filter_by_status(StockStatus::All).await.unwrap();
    let all = grid.row_count().await.unwrap();

    assert_eq!(enabled, 3);
    assert_eq!(all, 4);
    assert!(all >= enabled);
    assert!(grid.driver().is_panel_open());
}

#[tokio::test(start_paused = true)]
async fn status_disabled_lists_disabled_products() {
    let grid = slow_grid(catalog());
    grid.filter_by_status_named("disabled").await.unwrap();
    assert_eq!(grid.all_names().await.unwrap(), vec!["Mountain fox notebook"]);
}

#[tokio::test(start_paused = true)]
async fn invalid_status_fails_before_touching_the_page() {
    let grid = slow_grid(catalog());
    let err = grid.filter_by_status_named("archived").await.unwrap_err();

    assert!(matches!(err, GridError::InvalidStatus(s) if s == "archived"));
    assert!(!grid.driver().is_panel_open());
}

#[tokio::test(start_paused = true)]
async fn category_filter_restores_panel() {
    let grid = slow_grid(catalog());
    grid.filter_by_category("Home Accessories").await.unwrap();

    assert_eq!(
        grid.all_names().await.unwrap(),
        vec!["Brown bear cushion", "Customizable mug"]
    );
    let panel = grid.driver();
    assert!(!panel.is_panel_open());
    assert!(!panel.is_tree_expanded());
    assert!(panel.selected_categories().contains("Home Accessories"));
    assert_eq!(grid.state(), GridState::Idle);
}

#[tokio::test(start_paused = true)]
async fn category_filter_toggles() {
    let grid = fast_grid(catalog());
    grid.filter_by_category("Clothes").await.unwrap();
    assert_eq!(grid.row_count().await.unwrap(), 1);

    grid.filter_by_category("Clothes").await.unwrap();
    assert_eq!(grid.row_count().await.unwrap(), 4);
}

#[tokio::test(start_paused = true)]
async fn unknown_category_times_out() {
    let panel = FakeStockPanel::new(StockSelectors::default(), catalog());
    let grid = StockGrid::new(
        panel,
        StockSelectors::default(),
        SyncConfig {
            timeout_ms: 800,
            appear_grace_ms: 100,
            poll_interval_ms: 10,
        },
    );

    let err = grid.filter_by_category("Garden").await.unwrap_err();
    assert!(err.is_timeout(), "unexpected error {:?}", err);
}

#[tokio::test(start_paused = true)]
async fn row_quantity_round_trip() {
    let grid = slow_grid(abc());
    assert_eq!(grid.stock_quantities(2).await.unwrap().physical, 10);

    let message = grid.update_row_quantity(2, 50).await.unwrap();

    assert!(message.contains("successfully"), "got {:?}", message);
    assert_eq!(message, SUCCESSFUL_UPDATE_MESSAGE);
    assert_eq!(grid.stock_quantities(2).await.unwrap().physical, 50);
    assert_eq!(grid.stock_quantities(1).await.unwrap().physical, 1);
    assert_eq!(grid.state(), GridState::Idle);
}

#[tokio::test(start_paused = true)]
async fn row_quantity_on_fast_server() {
    let grid = fast_grid(abc());
    let message = grid.update_row_quantity(3, 0).await.unwrap();
    assert_eq!(message, SUCCESSFUL_UPDATE_MESSAGE);
    assert_eq!(grid.stock_quantities(3).await.unwrap().physical, 0);
}

#[tokio::test(start_paused = true)]
async fn row_quantity_out_of_range() {
    let grid = slow_grid(abc());
    grid.apply_text_filter("B").await.unwrap();

    let err = grid.update_row_quantity(2, 5).await.unwrap_err();
    assert!(matches!(err, GridError::RowOutOfRange { row: 2, count: 1 }));
    assert_eq!(grid.driver().products()[2].physical, 3);
}

#[tokio::test(start_paused = true)]
async fn bulk_quantity_updates_every_filtered_row() {
    let grid = slow_grid(catalog());
    grid.apply_text_filter("demo_1").await.unwrap();
    assert_eq!(grid.row_count().await.unwrap(), 3);

    let message = grid.bulk_update_quantity(7).await.unwrap();
    assert!(message.contains("successfully"));

    for row in 1..=3 {
        assert_eq!(grid.stock_quantities(row).await.unwrap().physical, 7);
    }
    let untouched = grid
        .driver()
        .products()
        .into_iter()
        .find(|p| p.reference == "demo_8")
        .unwrap();
    assert_eq!(untouched.physical, 10);
}

#[tokio::test(start_paused = true)]
async fn reset_discards_client_filters() {
    let grid = slow_grid(catalog());
    grid.apply_text_filter("mug").await.unwrap();
    grid.filter_by_status(StockStatus::Enabled).await.unwrap();
    assert_eq!(grid.row_count().await.unwrap(), 1);

    assert_eq!(grid.reset_and_count().await.unwrap(), 4);
    assert!(grid.search_tags().await.unwrap().is_empty());
    assert!(!grid.driver().is_panel_open());
    assert_eq!(grid.driver().reload_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn filter_state_applies_every_part() {
    let grid = slow_grid(catalog());
    let filters = FilterState::new()
        .search("supplier")
        .status(StockStatus::Enabled)
        .category("Home Accessories");

    grid.apply_filter_state(&filters).await.unwrap();

    assert_eq!(grid.all_names().await.unwrap(), vec!["Brown bear cushion"]);
    assert_eq!(grid.search_tags().await.unwrap(), vec!["supplier"]);
}

#[tokio::test(start_paused = true)]
async fn stuck_loader_surfaces_timeout() {
    let grid = slow_grid(abc());
    grid.driver().stall_loader(true);

    let err = grid.apply_text_filter("A").await.unwrap_err();
    assert!(matches!(err, GridError::SyncTimeout { .. }));

    // Reads keep failing rather than returning a half-rendered grid
    assert!(grid.row_count().await.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn movements_tab_becomes_active() {
    let grid = slow_grid(abc());
    grid.go_to_movements_tab().await.unwrap();
    assert!(grid.driver().is_movements_active());
}

#[tokio::test(start_paused = true)]
async fn open_navigates_and_settles() {
    let grid = slow_grid(abc());
    grid.open("http://shop.test/admin/index.php/sell/stocks/").await.unwrap();

    assert_eq!(
        grid.driver().current_url().as_deref(),
        Some("http://shop.test/admin/index.php/sell/stocks/")
    );
    assert_eq!(grid.row_count().await.unwrap(), 3);
}
