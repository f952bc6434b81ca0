//! Stock grid test adapter
//!
//! This crate lets end-to-end tests drive the back-office stock page:
//! searching, filtering, editing quantities inline or in bulk, and reading
//! rows back. The grid re-renders asynchronously after almost every action,
//! so every mutation goes through a settle barrier before the next read.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  StockGrid<D: PageDriver>                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  queries    row_count, column_value, all_names,             │
//! │             stock_quantities, read_row, snapshot            │
//! │  mutations  apply_text_filter, clear_filters,               │
//! │             filter_by_status, filter_by_category,           │
//! │             update_row_quantity, bulk_update_quantity,      │
//! │             reset_and_count                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  GridSync   settle (trigger ∥ loader visible → hidden)      │
//! │             await_attribute (aria-expanded)                 │
//! │             settle_and_acknowledge (notification)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver PlaywrightDriver (node bridge) | FakeStockPanel │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fake;
pub mod grid;
pub mod locator;
pub mod model;
pub mod page;
pub mod playwright;
pub mod selectors;
pub mod sync;

pub use config::{GridConfig, SyncConfig};
pub use error::{GridError, GridResult};
pub use grid::StockGrid;
pub use locator::Locator;
pub use model::{CellValue, Column, FilterState, GridSnapshot, Row, StockQuantities, StockStatus};
pub use page::PageDriver;
pub use selectors::{StockSelectors, SUCCESSFUL_UPDATE_MESSAGE};
pub use sync::{GridState, GridSync, Settled};
