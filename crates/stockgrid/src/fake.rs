//! In-memory stock page for exercising the adapter without a browser
//!
//! `FakeStockPanel` answers the same locators as the real page (it resolves
//! them against a [`StockSelectors`]) and imitates its timing: each filter
//! change or quantity edit opens a loading window during which the loader is
//! visible and the rows still show the previous state. Rows switch to the new
//! state only when the window closes. Timing runs on the tokio clock, so tests
//! can use a paused runtime.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{GridError, GridResult};
use crate::locator::{Locator, CATEGORY_PLACEHOLDER, ROW_PLACEHOLDER};
use crate::model::{Column, StockStatus};
use crate::page::PageDriver;
use crate::selectors::{StockSelectors, SUCCESSFUL_UPDATE_MESSAGE};

/// A product held by the fake back office
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeProduct {
    pub name: String,
    pub reference: String,
    pub supplier: String,
    pub physical: i64,
    pub reserved: i64,
    pub enabled: bool,
    pub categories: Vec<String>,
    /// Cell text rendered instead of the field value
    pub shown: HashMap<Column, String>,
}

impl FakeProduct {
    pub fn new(name: &str, reference: &str, supplier: &str, physical: i64) -> Self {
        Self {
            name: name.to_string(),
            reference: reference.to_string(),
            supplier: supplier.to_string(),
            physical,
            reserved: 0,
            enabled: true,
            categories: Vec::new(),
            shown: HashMap::new(),
        }
    }

    pub fn reserved(mut self, reserved: i64) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }

    /// Render `text` in `column` whatever the stored value
    pub fn showing(mut self, column: Column, text: &str) -> Self {
        self.shown.insert(column, text.to_string());
        self
    }

    fn available(&self) -> i64 {
        self.physical - self.reserved
    }

    fn matches(&self, filters: &Filters) -> bool {
        let tags_match = filters.tags.iter().all(|tag| {
            let tag = tag.to_lowercase();
            [&self.name, &self.reference, &self.supplier]
                .iter()
                .any(|field| field.to_lowercase().contains(&tag))
        });
        let status_match = match filters.status {
            StockStatus::All => true,
            StockStatus::Enabled => self.enabled,
            StockStatus::Disabled => !self.enabled,
        };
        let category_match = filters.categories.is_empty()
            || self.categories.iter().any(|c| filters.categories.contains(c));
        tags_match && status_match && category_match
    }
}

/// Latencies of the simulated page
#[derive(Debug, Clone, Copy)]
pub struct PanelTiming {
    /// Delay between an action and its loader showing up
    pub appear_after: Duration,
    /// How long the loader stays visible; zero means it is never observable
    pub loading_for: Duration,
    /// Time for the advanced filter panel to open or close
    pub panel_transition: Duration,
    /// Delay before a click lands, like a browser waiting for actionability
    pub click_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self {
            appear_after: Duration::from_millis(20),
            loading_for: Duration::from_millis(300),
            panel_transition: Duration::from_millis(150),
            click_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl PanelTiming {
    /// Server answers before any loader can be seen
    pub fn instant() -> Self {
        Self {
            appear_after: Duration::ZERO,
            loading_for: Duration::ZERO,
            panel_transition: Duration::ZERO,
            click_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Filters {
    tags: Vec<String>,
    status: StockStatus,
    categories: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoadScope {
    Grid,
    Row(usize),
    Tree,
}

#[derive(Debug, Clone, Copy)]
struct LoadWindow {
    scope: LoadScope,
    visible_from: Instant,
    /// `None` while the loader is stalled
    done_at: Option<Instant>,
}

#[derive(Debug, Clone)]
enum Mutation {
    SetPhysical { product: usize, value: i64 },
    Notify(String),
}

#[derive(Debug)]
struct PanelState {
    products: Vec<FakeProduct>,
    /// What the filter controls show
    requested: Filters,
    /// What the rows currently reflect
    rendered: Filters,
    inputs: HashMap<String, String>,
    select_all: bool,
    panel_open: bool,
    panel_target: Option<(bool, Instant)>,
    tree_expanded: bool,
    movements_active: bool,
    load: Option<LoadWindow>,
    pending: Vec<Mutation>,
    notification: Option<String>,
    stalled: bool,
    url: Option<String>,
    reloads: usize,
}

impl PanelState {
    fn new(products: Vec<FakeProduct>) -> Self {
        Self {
            products,
            requested: Filters::default(),
            rendered: Filters::default(),
            inputs: HashMap::new(),
            select_all: false,
            panel_open: false,
            panel_target: None,
            tree_expanded: false,
            movements_active: false,
            load: None,
            pending: Vec::new(),
            notification: None,
            stalled: false,
            url: None,
            reloads: 0,
        }
    }

    /// Advance simulated time to `now`
    fn tick(&mut self, now: Instant) {
        if let Some((open, at)) = self.panel_target {
            if now >= at {
                self.panel_open = open;
                self.panel_target = None;
            }
        }
        if let Some(load) = self.load {
            if load.done_at.is_some_and(|done| now >= done) {
                self.commit();
            }
        }
    }

    fn commit(&mut self) {
        self.load = None;
        self.rendered = self.requested.clone();
        for mutation in std::mem::take(&mut self.pending) {
            match mutation {
                Mutation::SetPhysical { product, value } => {
                    if let Some(p) = self.products.get_mut(product) {
                        p.physical = value;
                    }
                }
                Mutation::Notify(text) => self.notification = Some(text),
            }
        }
    }

    fn start_load(&mut self, scope: LoadScope, now: Instant, timing: &PanelTiming) {
        let visible_from = now + timing.appear_after;
        let done_at = (!self.stalled).then_some(visible_from + timing.loading_for);
        self.load = Some(LoadWindow {
            scope,
            visible_from,
            done_at,
        });
        self.tick(now);
    }

    fn loader_visible(&self, scope: LoadScope, now: Instant) -> bool {
        self.load.is_some_and(|load| {
            load.scope == scope
                && now >= load.visible_from
                && load.done_at.map_or(true, |done| now < done)
        })
    }

    /// Indices into `products` of the rendered rows, in display order
    fn rendered_rows(&self) -> Vec<usize> {
        self.products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches(&self.rendered))
            .map(|(i, _)| i)
            .collect()
    }

    fn product_at(&self, row: usize) -> Option<usize> {
        row.checked_sub(1).and_then(|i| self.rendered_rows().get(i).copied())
    }

    fn known_category(&self, category: &str) -> bool {
        self.products
            .iter()
            .any(|p| p.categories.iter().any(|c| c == category))
    }

    fn reset_client_state(&mut self) {
        if self.load.is_some_and(|l| l.done_at.is_some()) {
            self.commit();
        }
        self.load = None;
        self.pending.clear();
        self.requested = Filters::default();
        self.rendered = Filters::default();
        self.inputs.clear();
        self.select_all = false;
        self.panel_open = false;
        self.panel_target = None;
        self.tree_expanded = false;
        self.movements_active = false;
        self.notification = None;
    }
}

/// Element of the stock page a locator points at
#[derive(Debug, Clone, PartialEq)]
enum Target {
    MovementsLink,
    MovementsLinkActive,
    SearchInput,
    SearchButton,
    SearchTags,
    SearchTag(usize),
    SearchTagCloses,
    SearchTagClose(usize),
    SelectAll,
    BulkInput,
    BulkApply,
    Rows,
    Cell(usize, Column),
    QuantityInput(usize),
    QuantityButton(usize),
    Loader(LoadScope),
    FiltersButton,
    StatusLabel(StockStatus),
    TreeExpand,
    TreeCollapse,
    CategoryCheckbox(String),
    AlertText,
    AlertClose,
}

fn match_slot<'a>(template: &Locator, placeholder: &str, candidate: &'a str) -> Option<&'a str> {
    let (pre, post) = template.as_str().split_once(placeholder)?;
    candidate
        .strip_prefix(pre)?
        .strip_suffix(post)
        .filter(|slot| !slot.is_empty())
}

fn match_row(template: &Locator, candidate: &str) -> Option<usize> {
    match_slot(template, ROW_PLACEHOLDER, candidate)?.parse().ok()
}

/// In-memory implementation of [`PageDriver`]. Clones share the same page.
#[derive(Clone)]
pub struct FakeStockPanel {
    selectors: Arc<StockSelectors>,
    timing: PanelTiming,
    inner: Arc<Mutex<PanelState>>,
}

impl FakeStockPanel {
    pub fn new(selectors: StockSelectors, products: Vec<FakeProduct>) -> Self {
        Self {
            selectors: Arc::new(selectors),
            timing: PanelTiming::default(),
            inner: Arc::new(Mutex::new(PanelState::new(products))),
        }
    }

    pub fn with_timing(mut self, timing: PanelTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Keep any loader started from now on visible forever
    pub fn stall_loader(&self, stalled: bool) {
        self.inner.lock().stalled = stalled;
    }

    /// Current server-side products, regardless of filters
    pub fn products(&self) -> Vec<FakeProduct> {
        self.inner.lock().products.clone()
    }

    /// Change a product behind the adapter's back
    pub fn update_product(&self, index: usize, f: impl FnOnce(&mut FakeProduct)) {
        if let Some(p) = self.inner.lock().products.get_mut(index) {
            f(p);
        }
    }

    pub fn is_panel_open(&self) -> bool {
        self.inner.lock().panel_open
    }

    pub fn is_tree_expanded(&self) -> bool {
        self.inner.lock().tree_expanded
    }

    pub fn is_movements_active(&self) -> bool {
        self.inner.lock().movements_active
    }

    pub fn selected_categories(&self) -> BTreeSet<String> {
        self.inner.lock().requested.categories.clone()
    }

    pub fn current_url(&self) -> Option<String> {
        self.inner.lock().url.clone()
    }

    pub fn reload_count(&self) -> usize {
        self.inner.lock().reloads
    }

    fn resolve(&self, locator: &Locator, state: &PanelState) -> Option<Target> {
        let s = &*self.selectors;
        let raw = locator.as_str();
        let (base, nth) = match raw.split_once(" >> nth=") {
            Some((base, n)) => (base, Some(n.parse::<usize>().ok()?)),
            None => (raw, None),
        };

        let exact = [
            (&s.movements_nav_link, Target::MovementsLink),
            (&s.search_input, Target::SearchInput),
            (&s.search_button, Target::SearchButton),
            (&s.select_all_checkbox, Target::SelectAll),
            (&s.bulk_quantity_input, Target::BulkInput),
            (&s.bulk_apply_button, Target::BulkApply),
            (&s.product_rows, Target::Rows),
            (&s.grid_loader, Target::Loader(LoadScope::Grid)),
            (&s.category_tree_loader, Target::Loader(LoadScope::Tree)),
            (&s.advanced_filters_button, Target::FiltersButton),
            (&s.status_enabled_label, Target::StatusLabel(StockStatus::Enabled)),
            (&s.status_disabled_label, Target::StatusLabel(StockStatus::Disabled)),
            (&s.status_all_label, Target::StatusLabel(StockStatus::All)),
            (&s.category_expand_button, Target::TreeExpand),
            (&s.category_collapse_button, Target::TreeCollapse),
            (&s.alert_text, Target::AlertText),
            (&s.alert_close, Target::AlertClose),
        ];

        if base == s.search_tags.as_str() {
            return Some(nth.map_or(Target::SearchTags, Target::SearchTag));
        }
        if base == s.search_tag_close.as_str() {
            return Some(nth.map_or(Target::SearchTagCloses, Target::SearchTagClose));
        }
        if nth.is_some_and(|n| n > 0) {
            return None;
        }
        if base == s.movements_nav_link.with_class("active").as_str() {
            return Some(Target::MovementsLinkActive);
        }
        if let Some((_, target)) = exact.into_iter().find(|(loc, _)| loc.as_str() == base) {
            return Some(target);
        }

        for column in Column::ALL {
            if let Some(row) = match_row(&column_template(s, column), base) {
                return Some(Target::Cell(row, column));
            }
        }
        if let Some(row) = match_row(&s.quantity_input, base) {
            return Some(Target::QuantityInput(row));
        }
        if let Some(row) = match_row(&s.quantity_update_button, base) {
            return Some(Target::QuantityButton(row));
        }
        if let Some(row) = match_row(&s.row_loader, base) {
            return Some(Target::Loader(LoadScope::Row(row)));
        }
        if let Some(category) = match_slot(&s.category_checkbox, CATEGORY_PLACEHOLDER, base) {
            if state.known_category(category) {
                return Some(Target::CategoryCheckbox(category.to_string()));
            }
        }
        None
    }

    /// Whether `target` is in the DOM and can be interacted with
    fn present(&self, target: &Target, state: &PanelState) -> bool {
        match target {
            Target::SearchTag(i) | Target::SearchTagClose(i) => *i < state.requested.tags.len(),
            Target::Cell(row, _) | Target::QuantityInput(row) => state.product_at(*row).is_some(),
            Target::QuantityButton(row) => {
                state.product_at(*row).is_some()
                    && state
                        .inputs
                        .get(self.selectors.quantity_input.row(*row).as_str())
                        .is_some_and(|v| !v.is_empty())
            }
            Target::BulkApply => state.select_all,
            Target::StatusLabel(_) | Target::TreeExpand | Target::TreeCollapse => state.panel_open,
            Target::CategoryCheckbox(_) => state.panel_open && state.tree_expanded,
            Target::AlertText | Target::AlertClose => state.notification.is_some(),
            Target::MovementsLinkActive => state.movements_active,
            _ => true,
        }
    }

    fn visible(&self, target: &Target, state: &PanelState, now: Instant) -> bool {
        match target {
            Target::Loader(scope) => state.loader_visible(*scope, now),
            Target::Rows | Target::SearchTags | Target::SearchTagCloses => true,
            other => self.present(other, state),
        }
    }

    /// Poll until `probe` yields a value or `timeout` runs out
    async fn wait_until<T: Send>(
        &self,
        locator: &Locator,
        condition: &str,
        timeout: Duration,
        mut probe: impl FnMut(&Self, Option<Target>, &mut PanelState, Instant) -> Option<T> + Send,
    ) -> GridResult<T> {
        let start = Instant::now();
        loop {
            let now = Instant::now();
            let found = {
                let mut state = self.inner.lock();
                state.tick(now);
                let target = self.resolve(locator, &*state);
                probe(self, target, &mut *state, now)
            };
            if let Some(value) = found {
                return Ok(value);
            }
            let waited = now.duration_since(start);
            if waited >= timeout {
                return Err(GridError::timeout(locator, condition, waited.as_millis() as u64));
            }
            tokio::time::sleep(self.timing.poll_interval.min(timeout - waited)).await;
        }
    }

    fn perform_click(&self, target: Target, state: &mut PanelState, now: Instant) {
        let timing = &self.timing;
        match target {
            Target::MovementsLink => state.movements_active = true,
            Target::SearchButton => {
                let key = self.selectors.search_input.as_str().to_string();
                let text = state.inputs.remove(&key).unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() && !state.requested.tags.iter().any(|t| t == text) {
                    state.requested.tags.push(text.to_string());
                }
                state.start_load(LoadScope::Grid, now, timing);
            }
            Target::SearchTagClose(i) => {
                state.requested.tags.remove(i);
                state.start_load(LoadScope::Grid, now, timing);
            }
            Target::SelectAll => state.select_all = !state.select_all,
            Target::BulkApply => {
                let key = self.selectors.bulk_quantity_input.as_str();
                if let Some(value) = state.inputs.get(key).and_then(|v| v.trim().parse::<i64>().ok()) {
                    for product in state.rendered_rows() {
                        state.pending.push(Mutation::SetPhysical { product, value });
                    }
                    state.pending.push(Mutation::Notify(SUCCESSFUL_UPDATE_MESSAGE.to_string()));
                    state.select_all = false;
                    state.start_load(LoadScope::Grid, now, timing);
                }
            }
            Target::QuantityButton(row) => {
                let key = self.selectors.quantity_input.row(row);
                let value = state.inputs.remove(key.as_str()).and_then(|v| v.trim().parse::<i64>().ok());
                if let (Some(product), Some(value)) = (state.product_at(row), value) {
                    state.pending.push(Mutation::SetPhysical { product, value });
                    state.pending.push(Mutation::Notify(SUCCESSFUL_UPDATE_MESSAGE.to_string()));
                    state.start_load(LoadScope::Row(row), now, timing);
                }
            }
            Target::FiltersButton => {
                let target_open = !state.panel_target.map_or(state.panel_open, |(open, _)| open);
                state.panel_target = Some((target_open, now + timing.panel_transition));
                state.tick(now);
            }
            Target::StatusLabel(status) => {
                state.requested.status = status;
                state.start_load(LoadScope::Grid, now, timing);
            }
            Target::TreeExpand => {
                state.tree_expanded = true;
                state.start_load(LoadScope::Tree, now, timing);
            }
            Target::TreeCollapse => state.tree_expanded = false,
            Target::CategoryCheckbox(category) => {
                if !state.requested.categories.remove(&category) {
                    state.requested.categories.insert(category);
                }
                state.start_load(LoadScope::Grid, now, timing);
            }
            Target::AlertClose => state.notification = None,
            _ => {}
        }
    }

    fn text_of(&self, target: &Target, state: &PanelState) -> Option<String> {
        match target {
            Target::Cell(row, column) => {
                let p = &state.products[state.product_at(*row)?];
                if let Some(text) = p.shown.get(column) {
                    return Some(text.clone());
                }
                Some(match column {
                    Column::Name => p.name.clone(),
                    Column::Reference => p.reference.clone(),
                    Column::Supplier => p.supplier.clone(),
                    Column::Physical => p.physical.to_string(),
                    Column::Reserved => p.reserved.to_string(),
                    Column::Available => p.available().to_string(),
                })
            }
            Target::SearchTag(i) => state.requested.tags.get(*i).cloned(),
            Target::AlertText => state.notification.clone(),
            Target::MovementsLink => Some("Movements".to_string()),
            _ => None,
        }
    }

    fn reset(&self, url: Option<&str>) {
        let now = Instant::now();
        let mut state = self.inner.lock();
        state.tick(now);
        state.reset_client_state();
        state.reloads += 1;
        if let Some(url) = url {
            state.url = Some(url.to_string());
        }
    }
}

/// Row template for `column`, kept as a template so it can be matched
fn column_template(s: &StockSelectors, column: Column) -> Locator {
    match column {
        Column::Name => s.name_cell.clone(),
        Column::Reference => s.reference_cell.clone(),
        Column::Supplier => s.supplier_cell.clone(),
        Column::Physical => s.physical_cell.clone(),
        Column::Reserved => s.reserved_cell.clone(),
        Column::Available => s.available_cell.clone(),
    }
}

#[async_trait]
impl PageDriver for FakeStockPanel {
    async fn goto(&self, url: &str, _timeout: Duration) -> GridResult<()> {
        self.reset(Some(url));
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> GridResult<()> {
        self.reset(None);
        Ok(())
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        if !self.timing.click_delay.is_zero() {
            tokio::time::sleep(self.timing.click_delay).await;
        }
        self.wait_until(locator, "clickable", timeout, |panel, target, state, now| {
            let target = target.filter(|t| panel.present(t, state))?;
            panel.perform_click(target, state, now);
            Some(())
        })
        .await
    }

    async fn type_text(&self, locator: &Locator, text: &str, timeout: Duration) -> GridResult<()> {
        self.wait_until(locator, "editable", timeout, |panel, target, state, _| {
            target.filter(|t| panel.present(t, state))?;
            state
                .inputs
                .entry(locator.as_str().to_string())
                .or_default()
                .push_str(text);
            Some(())
        })
        .await
    }

    async fn set_value(&self, locator: &Locator, value: &str, timeout: Duration) -> GridResult<()> {
        self.wait_until(locator, "editable", timeout, |panel, target, state, _| {
            target.filter(|t| panel.present(t, state))?;
            state
                .inputs
                .insert(locator.as_str().to_string(), value.to_string());
            Some(())
        })
        .await
    }

    async fn read_text(&self, locator: &Locator, timeout: Duration) -> GridResult<String> {
        self.wait_until(locator, "readable", timeout, |panel, target, state, _| {
            let target = target.filter(|t| panel.present(t, state))?;
            panel.text_of(&target, state).map(|t| t.trim().to_string())
        })
        .await
    }

    async fn count(&self, locator: &Locator) -> GridResult<usize> {
        let now = Instant::now();
        let mut state = self.inner.lock();
        state.tick(now);
        let count = match self.resolve(locator, &*state) {
            Some(Target::Rows) => state.rendered_rows().len(),
            Some(Target::SearchTags) | Some(Target::SearchTagCloses) => state.requested.tags.len(),
            Some(target) => usize::from(self.present(&target, &*state)),
            None => 0,
        };
        Ok(count)
    }

    async fn attribute(&self, locator: &Locator, name: &str, timeout: Duration) -> GridResult<Option<String>> {
        self.wait_until(locator, "attached", timeout, |panel, target, state, _| {
            let target = target.filter(|t| panel.present(t, state))?;
            Some(match (target, name) {
                (Target::FiltersButton, "aria-expanded") => Some(state.panel_open.to_string()),
                (Target::MovementsLink, "class") => state.movements_active.then(|| "active".to_string()),
                _ => None,
            })
        })
        .await
    }

    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        self.wait_until(locator, "visible", timeout, |panel, target, state, now| {
            target.filter(|t| panel.visible(t, state, now)).map(|_| ())
        })
        .await
    }

    async fn wait_for_hidden(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        self.wait_until(locator, "hidden", timeout, |panel, target, state, now| match target {
            Some(t) if panel.visible(&t, state, now) => None,
            _ => Some(()),
        })
        .await
    }

    async fn wait_for_attribute_equals(
        &self,
        locator: &Locator,
        name: &str,
        value: &str,
        timeout: Duration,
    ) -> GridResult<()> {
        let condition = format!("{}={}", name, value);
        self.wait_until(locator, &condition, timeout, |panel, target, state, _| {
            let target = target.filter(|t| panel.present(t, state))?;
            let current = match (target, name) {
                (Target::FiltersButton, "aria-expanded") => state.panel_open.to_string(),
                _ => return None,
            };
            (current == value).then_some(())
        })
        .await
    }
}
