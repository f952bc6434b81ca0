//! Selectors of the back-office stock page
//!
//! Defaults match the PrestaShop "Stock" page. Every entry can be overridden
//! from the `[selectors]` table of the configuration file, which is how the
//! adapter is pointed at themes or versions that move the markup around.

use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::model::{Column, StockStatus};

/// Notification text shown after a successful quantity update
pub const SUCCESSFUL_UPDATE_MESSAGE: &str = "Stock successfully updated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSelectors {
    pub movements_nav_link: Locator,

    // Search form and its tags
    pub search_input: Locator,
    pub search_button: Locator,
    pub search_tags: Locator,
    pub search_tag_close: Locator,

    // Bulk edit
    pub select_all_checkbox: Locator,
    pub bulk_quantity_input: Locator,
    pub bulk_apply_button: Locator,

    // Product table; `%ROW` is the 1-based row index
    pub product_rows: Locator,
    pub name_cell: Locator,
    pub reference_cell: Locator,
    pub supplier_cell: Locator,
    pub physical_cell: Locator,
    pub reserved_cell: Locator,
    pub available_cell: Locator,
    pub quantity_input: Locator,
    pub quantity_update_button: Locator,

    // Loaders
    pub grid_loader: Locator,
    pub row_loader: Locator,
    pub category_tree_loader: Locator,

    // Advanced filters
    pub advanced_filters_button: Locator,
    pub status_enabled_label: Locator,
    pub status_disabled_label: Locator,
    pub status_all_label: Locator,
    pub category_expand_button: Locator,
    pub category_collapse_button: Locator,
    /// `%CATEGORY` is the tree item label
    pub category_checkbox: Locator,

    // Confirmation notification
    pub alert_text: Locator,
    pub alert_close: Locator,
}

impl Default for StockSelectors {
    fn default() -> Self {
        let row = "table.table tbody tr:nth-child(%ROW)";
        let qty = format!("{} td.qty-spinner", row);
        let filters = "#filters-container";
        let categories = format!("{} div.filter-categories", filters);

        Self {
            movements_nav_link: "#head_tabs li:nth-child(2) > a".into(),

            search_input: "form.search-form input.input".into(),
            search_button: "form.search-form button.search-button".into(),
            search_tags: "form.search-form div.tags-wrapper span.tag".into(),
            search_tag_close: "form.search-form div.tags-wrapper span.tag i".into(),

            select_all_checkbox: "#bulk-action + i".into(),
            bulk_quantity_input: "div.bulk-qty input".into(),
            bulk_apply_button: "button.update-qty".into(),

            product_rows: "table.table tbody tr".into(),
            name_cell: Locator::new(format!("{} td:nth-child(1) div.media-body p", row)),
            reference_cell: Locator::new(format!("{} td:nth-child(2)", row)),
            supplier_cell: Locator::new(format!("{} td:nth-child(3)", row)),
            physical_cell: Locator::new(format!("{} td:nth-child(5)", row)),
            reserved_cell: Locator::new(format!("{} td:nth-child(6)", row)),
            available_cell: Locator::new(format!("{} td:nth-child(7)", row)),
            quantity_input: Locator::new(format!("{} div.edit-qty input", qty)),
            quantity_update_button: Locator::new(format!("{} button.check-button", qty)),

            grid_loader: "table.table tbody tr:nth-child(1) td:nth-child(1) div.ps-loader".into(),
            row_loader: Locator::new(format!("{} div.ps-loader", qty)),
            category_tree_loader: Locator::new(format!("{} div.ps-loader", categories)),

            advanced_filters_button: Locator::new(format!("{} button[data-target='#filters']", filters)),
            status_enabled_label: "#enable + label".into(),
            status_disabled_label: "#disable + label".into(),
            status_all_label: "#all + label".into(),
            category_expand_button: Locator::new(format!("{} button:nth-child(1)", categories)),
            category_collapse_button: Locator::new(format!("{} button:nth-child(2)", categories)),
            category_checkbox: Locator::new(format!(
                "{} div.ps-tree-items[label='%CATEGORY'] .md-checkbox",
                categories
            )),

            alert_text: ".alert-box div div span".into(),
            alert_close: ".alert-box button.close".into(),
        }
    }
}

impl StockSelectors {
    /// Cell of `column` in the 1-based `row`
    pub fn cell(&self, row: usize, column: Column) -> Locator {
        let template = match column {
            Column::Name => &self.name_cell,
            Column::Reference => &self.reference_cell,
            Column::Supplier => &self.supplier_cell,
            Column::Physical => &self.physical_cell,
            Column::Reserved => &self.reserved_cell,
            Column::Available => &self.available_cell,
        };
        template.row(row)
    }

    pub fn status_label(&self, status: StockStatus) -> &Locator {
        match status {
            StockStatus::Enabled => &self.status_enabled_label,
            StockStatus::Disabled => &self.status_disabled_label,
            StockStatus::All => &self.status_all_label,
        }
    }
}
