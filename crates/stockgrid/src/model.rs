//! Values read from, or applied to, the stock grid

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// A column of the stock table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Name,
    Reference,
    Supplier,
    Physical,
    Reserved,
    Available,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Name,
        Column::Reference,
        Column::Supplier,
        Column::Physical,
        Column::Reserved,
        Column::Available,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Reference => "reference",
            Column::Supplier => "supplier",
            Column::Physical => "physical",
            Column::Reserved => "reserved",
            Column::Available => "available",
        }
    }

    /// Numeric columns are parsed to integers, the rest are returned as text
    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Physical | Column::Reserved | Column::Available)
    }
}

impl FromStr for Column {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GridError::UnknownColumn(s.to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(i64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(t) => Some(t),
            CellValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(t) => f.write_str(t),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Product status filter of the advanced panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Enabled,
    Disabled,
    #[default]
    All,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Enabled => "enabled",
            StockStatus::Disabled => "disabled",
            StockStatus::All => "all",
        }
    }
}

impl FromStr for StockStatus {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(StockStatus::Enabled),
            "disabled" => Ok(StockStatus::Disabled),
            "all" => Ok(StockStatus::All),
            other => Err(GridError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock figures of one row. `available` is read from the page, never computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuantities {
    pub physical: i64,
    pub reserved: i64,
    pub available: i64,
}

/// One rendered row of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// 1-based rendering position
    pub position: usize,
    pub name: String,
    pub reference: String,
    pub supplier: String,
    pub physical: i64,
    pub reserved: i64,
    pub available: i64,
}

impl Row {
    pub fn quantities(&self) -> StockQuantities {
        StockQuantities {
            physical: self.physical,
            reserved: self.reserved,
            available: self.available,
        }
    }
}

/// Rows visible at one point in time, in rendering order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub rows: Vec<Row>,
}

impl GridSnapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn find_by_reference(&self, reference: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.reference == reference)
    }
}

/// Filters to apply to the grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Free-text tags, in display order
    #[serde(default)]
    pub search_tags: Vec<String>,

    #[serde(default)]
    pub status: Option<StockStatus>,

    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.search_tags.contains(&tag) {
            self.search_tags.push(tag);
        }
        self
    }

    /// Replaces any previously chosen status
    pub fn status(mut self, status: StockStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search_tags.is_empty() && self.status.is_none() && self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("name", Column::Name)]
    #[test_case("reference", Column::Reference)]
    #[test_case("supplier", Column::Supplier)]
    #[test_case("physical", Column::Physical)]
    #[test_case("reserved", Column::Reserved)]
    #[test_case("available", Column::Available)]
    fn test_parse_column(input: &str, expected: Column) {
        assert_eq!(input.parse::<Column>().unwrap(), expected);
    }

    #[test_case("color")]
    #[test_case("Name")]
    #[test_case("")]
    fn test_unknown_column(input: &str) {
        let err = input.parse::<Column>().unwrap_err();
        assert!(matches!(err, GridError::UnknownColumn(c) if c == input));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("enabled".parse::<StockStatus>().unwrap(), StockStatus::Enabled);
        assert_eq!("all".parse::<StockStatus>().unwrap(), StockStatus::All);
        assert!(matches!(
            "archived".parse::<StockStatus>(),
            Err(GridError::InvalidStatus(s)) if s == "archived"
        ));
    }

    #[test]
    fn test_filter_state_single_status() {
        let state = FilterState::new()
            .search("mug")
            .search("mug")
            .status(StockStatus::Enabled)
            .status(StockStatus::Disabled)
            .category("Home");
        assert_eq!(state.search_tags, vec!["mug".to_string()]);
        assert_eq!(state.status, Some(StockStatus::Disabled));
        assert!(!state.is_empty());
        assert!(FilterState::default().is_empty());
    }

    #[test]
    fn test_cell_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            CellValue::Text("Mug".into()),
            CellValue::Number(-2),
        ])
        .unwrap();
        assert_eq!(json, r#"["Mug",-2]"#);
    }
}
