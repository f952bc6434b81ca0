//! Queries and mutations on the stock grid
//!
//! `StockGrid` owns no row data. Every read goes to the live page after the
//! grid has settled, and every mutation is issued through [`GridSync`] so the
//! next read cannot observe a superseded render. Callers must await each
//! operation before starting the next; nothing here queues or locks.

use tracing::{debug, info};

use crate::config::GridConfig;
use crate::config::SyncConfig;
use crate::error::{GridError, GridResult};
use crate::model::{CellValue, Column, FilterState, GridSnapshot, Row, StockQuantities, StockStatus};
use crate::page::PageDriver;
use crate::selectors::StockSelectors;
use crate::sync::{GridState, GridSync};

const ARIA_EXPANDED: &str = "aria-expanded";

pub struct StockGrid<D> {
    driver: D,
    selectors: StockSelectors,
    sync: GridSync,
}

impl<D: PageDriver> StockGrid<D> {
    pub fn new(driver: D, selectors: StockSelectors, sync: SyncConfig) -> Self {
        Self {
            driver,
            selectors,
            sync: GridSync::new(sync),
        }
    }

    pub fn from_config(driver: D, config: &GridConfig) -> Self {
        Self::new(driver, config.selectors.clone(), config.sync.clone())
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn selectors(&self) -> &StockSelectors {
        &self.selectors
    }

    /// Current position in the re-render cycle
    pub fn state(&self) -> GridState {
        self.sync.state()
    }

    /// Navigate to the stock page and wait for the first render
    pub async fn open(&self, url: &str) -> GridResult<()> {
        info!("Opening stock page {}", url);
        self.driver.goto(url, self.sync.timeout()).await?;
        self.sync.wait_settled(&self.driver, &self.selectors.grid_loader).await
    }

    /// Switch to the "Movements" sub-tab
    pub async fn go_to_movements_tab(&self) -> GridResult<()> {
        let link = &self.selectors.movements_nav_link;
        self.driver.click(link, self.sync.timeout()).await?;
        self.driver
            .wait_for_visible(&link.with_class("active"), self.sync.timeout())
            .await
    }

    // Queries

    /// Number of rendered rows once the grid has settled
    pub async fn row_count(&self) -> GridResult<usize> {
        self.sync.wait_settled(&self.driver, &self.selectors.grid_loader).await?;
        let count = self.driver.count(&self.selectors.product_rows).await?;
        debug!("grid has {} rows", count);
        Ok(count)
    }

    async fn check_row(&self, row: usize) -> GridResult<usize> {
        let count = self.row_count().await?;
        if row == 0 || row > count {
            return Err(GridError::RowOutOfRange { row, count });
        }
        Ok(count)
    }

    /// Value of `column` in the 1-based `row`
    pub async fn column_value(&self, row: usize, column: Column) -> GridResult<CellValue> {
        self.check_row(row).await?;
        self.read_cell(row, column).await
    }

    /// Like [`column_value`](Self::column_value), with the column given by name
    pub async fn column_value_named(&self, row: usize, column: &str) -> GridResult<CellValue> {
        let column = column.parse::<Column>()?;
        self.column_value(row, column).await
    }

    async fn read_cell(&self, row: usize, column: Column) -> GridResult<CellValue> {
        let cell = self.selectors.cell(row, column);
        let timeout = self.sync.timeout();
        if column.is_numeric() {
            Ok(CellValue::Number(self.driver.number_from_text(&cell, timeout).await?))
        } else {
            Ok(CellValue::Text(self.driver.read_text(&cell, timeout).await?.trim().to_string()))
        }
    }

    async fn read_text_cell(&self, row: usize, column: Column) -> GridResult<String> {
        let cell = self.selectors.cell(row, column);
        Ok(self.driver.read_text(&cell, self.sync.timeout()).await?.trim().to_string())
    }

    async fn read_number_cell(&self, row: usize, column: Column) -> GridResult<i64> {
        let cell = self.selectors.cell(row, column);
        self.driver.number_from_text(&cell, self.sync.timeout()).await
    }

    /// Names of every rendered row, in order
    pub async fn all_names(&self) -> GridResult<Vec<String>> {
        let count = self.row_count().await?;
        let mut names = Vec::with_capacity(count);
        for row in 1..=count {
            names.push(self.read_text_cell(row, Column::Name).await?);
        }
        Ok(names)
    }

    /// Physical, reserved and available quantities of one row
    pub async fn stock_quantities(&self, row: usize) -> GridResult<StockQuantities> {
        self.check_row(row).await?;
        self.read_quantities(row).await
    }

    async fn read_quantities(&self, row: usize) -> GridResult<StockQuantities> {
        Ok(StockQuantities {
            physical: self.read_number_cell(row, Column::Physical).await?,
            reserved: self.read_number_cell(row, Column::Reserved).await?,
            available: self.read_number_cell(row, Column::Available).await?,
        })
    }

    /// Every field of one row
    pub async fn read_row(&self, row: usize) -> GridResult<Row> {
        self.check_row(row).await?;
        self.read_row_unchecked(row).await
    }

    async fn read_row_unchecked(&self, row: usize) -> GridResult<Row> {
        let quantities = self.read_quantities(row).await?;
        Ok(Row {
            position: row,
            name: self.read_text_cell(row, Column::Name).await?,
            reference: self.read_text_cell(row, Column::Reference).await?,
            supplier: self.read_text_cell(row, Column::Supplier).await?,
            physical: quantities.physical,
            reserved: quantities.reserved,
            available: quantities.available,
        })
    }

    /// All rendered rows at this point in time
    pub async fn snapshot(&self) -> GridResult<GridSnapshot> {
        let count = self.row_count().await?;
        let mut rows = Vec::with_capacity(count);
        for row in 1..=count {
            rows.push(self.read_row_unchecked(row).await?);
        }
        Ok(GridSnapshot { rows })
    }

    /// Active search tags, in display order
    pub async fn search_tags(&self) -> GridResult<Vec<String>> {
        let tags = &self.selectors.search_tags;
        let count = self.driver.count(tags).await?;
        let mut texts = Vec::with_capacity(count);
        for i in 0..count {
            texts.push(self.driver.read_text(&tags.nth(i), self.sync.timeout()).await?);
        }
        Ok(texts)
    }

    // Mutations

    /// Search for `text` and wait for the filtered rows
    pub async fn apply_text_filter(&self, text: &str) -> GridResult<()> {
        info!("Filtering stock by {:?}", text);
        let s = &self.selectors;
        let timeout = self.sync.timeout();
        self.driver.type_text(&s.search_input, text, timeout).await?;
        self.sync
            .settle(&self.driver, self.driver.click(&s.search_button, timeout), &s.grid_loader)
            .await?;
        Ok(())
    }

    /// Remove every search tag. Returns the row count afterwards.
    pub async fn clear_filters(&self) -> GridResult<usize> {
        let s = &self.selectors;
        let tags = self.driver.count(&s.search_tag_close).await?;
        info!("Clearing {} search tag(s)", tags);
        let close = s.search_tag_close.first();
        for _ in 0..tags {
            self.sync
                .settle(&self.driver, self.driver.click(&close, self.sync.timeout()), &s.grid_loader)
                .await?;
        }
        self.row_count().await
    }

    /// Open or close the advanced filter panel. No-op if it is already there.
    pub async fn set_advanced_filters_open(&self, open: bool) -> GridResult<()> {
        let button = &self.selectors.advanced_filters_button;
        let current = self
            .driver
            .attribute(button, ARIA_EXPANDED, self.sync.timeout())
            .await?;
        if current.as_deref() == Some(if open { "true" } else { "false" }) {
            return Ok(());
        }
        debug!("{} advanced filters", if open { "Opening" } else { "Closing" });
        self.sync
            .await_attribute(
                &self.driver,
                self.driver.click(button, self.sync.timeout()),
                button,
                ARIA_EXPANDED,
                &open.to_string(),
            )
            .await
    }

    pub async fn filter_by_status(&self, status: StockStatus) -> GridResult<()> {
        info!("Filtering stock by status {}", status);
        self.set_advanced_filters_open(true).await?;
        let s = &self.selectors;
        self.sync
            .settle(
                &self.driver,
                self.driver.click(s.status_label(status), self.sync.timeout()),
                &s.grid_loader,
            )
            .await?;
        Ok(())
    }

    /// Like [`filter_by_status`](Self::filter_by_status), with the status given by name
    pub async fn filter_by_status_named(&self, status: &str) -> GridResult<()> {
        self.filter_by_status(status.parse::<StockStatus>()?).await
    }

    /// Toggle `category` in the category tree. Leaves the panel closed.
    pub async fn filter_by_category(&self, category: &str) -> GridResult<()> {
        info!("Toggling stock category {:?}", category);
        let s = &self.selectors;
        let timeout = self.sync.timeout();

        self.set_advanced_filters_open(true).await?;
        self.sync
            .settle(
                &self.driver,
                self.driver.click(&s.category_expand_button, timeout),
                &s.category_tree_loader,
            )
            .await?;

        let checkbox = s.category_checkbox.category(category);
        self.sync
            .settle(&self.driver, self.driver.click(&checkbox, timeout), &s.grid_loader)
            .await?;

        self.driver.click(&s.category_collapse_button, timeout).await?;
        self.set_advanced_filters_open(false).await
    }

    /// Apply every part of `filters`: tags first, then status, then categories
    pub async fn apply_filter_state(&self, filters: &FilterState) -> GridResult<()> {
        for tag in &filters.search_tags {
            self.apply_text_filter(tag).await?;
        }
        if let Some(status) = filters.status {
            self.filter_by_status(status).await?;
        }
        for category in &filters.categories {
            self.filter_by_category(category).await?;
        }
        Ok(())
    }

    /// Set the quantity of one row through its inline input.
    /// Returns the confirmation message.
    pub async fn update_row_quantity(&self, row: usize, value: i64) -> GridResult<String> {
        self.check_row(row).await?;
        info!("Setting quantity of row {} to {}", row, value);
        let s = &self.selectors;
        let timeout = self.sync.timeout();

        self.driver
            .set_value(&s.quantity_input.row(row), &value.to_string(), timeout)
            .await?;
        self.sync
            .settle_and_acknowledge(
                &self.driver,
                self.driver.click(&s.quantity_update_button.row(row), timeout),
                &s.row_loader.row(row),
                &s.alert_text,
                &s.alert_close,
            )
            .await
    }

    /// Set the quantity of every row matching the current filters.
    /// Returns the confirmation message.
    pub async fn bulk_update_quantity(&self, value: i64) -> GridResult<String> {
        info!("Setting quantity of all listed rows to {}", value);
        let s = &self.selectors;
        let timeout = self.sync.timeout();

        self.driver.click(&s.select_all_checkbox, timeout).await?;
        self.driver
            .set_value(&s.bulk_quantity_input, &value.to_string(), timeout)
            .await?;
        self.sync
            .settle_and_acknowledge(
                &self.driver,
                self.driver.click(&s.bulk_apply_button, timeout),
                &s.grid_loader,
                &s.alert_text,
                &s.alert_close,
            )
            .await
    }

    /// Reload the page, dropping every filter, and count the rows
    pub async fn reset_and_count(&self) -> GridResult<usize> {
        info!("Reloading stock page");
        self.driver.reload(self.sync.timeout()).await?;
        self.row_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeProduct, FakeStockPanel, PanelTiming};

    fn grid() -> StockGrid<FakeStockPanel> {
        let panel = FakeStockPanel::new(
            StockSelectors::default(),
            vec![
                FakeProduct::new("A", "ref_a", "Acme", 1),
                FakeProduct::new("B", "ref_b", "Acme", 2),
            ],
        )
        .with_timing(PanelTiming::instant());
        StockGrid::new(
            panel,
            StockSelectors::default(),
            SyncConfig {
                timeout_ms: 1_000,
                appear_grace_ms: 50,
                poll_interval_ms: 10,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_zero_is_out_of_range() {
        let err = grid().column_value(0, Column::Name).await.unwrap_err();
        assert!(matches!(err, GridError::RowOutOfRange { row: 0, count: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_past_end_is_out_of_range() {
        let err = grid().stock_quantities(3).await.unwrap_err();
        assert!(matches!(err, GridError::RowOutOfRange { row: 3, count: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panel_toggle_is_idempotent() {
        let grid = grid();
        grid.set_advanced_filters_open(true).await.unwrap();
        grid.set_advanced_filters_open(true).await.unwrap();
        assert!(grid.driver().is_panel_open());
        grid.set_advanced_filters_open(false).await.unwrap();
        assert!(!grid.driver().is_panel_open());
    }
}
