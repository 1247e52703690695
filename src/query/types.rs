use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::FilterField;
use crate::search::strategy::SearchQuery;

/// Per-request filters. OR within a field, AND across fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub query: Option<String>,
    pub by_field: BTreeMap<FilterField, BTreeSet<String>>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        FilterSpec::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_values<I, S>(mut self, field: FilterField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_field
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_age(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_age = min;
        self.max_age = max;
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Parsed text query, `None` when absent or blank.
    pub fn text_query(&self) -> Option<SearchQuery> {
        self.query.as_deref().and_then(SearchQuery::parse)
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// True when any non-text predicate would reject something.
    pub fn has_structural_filters(&self) -> bool {
        self.by_field.values().any(|values| values.iter().any(|v| !v.trim().is_empty()))
            || self.min_age.is_some()
            || self.max_age.is_some()
            || self.has_date_bounds()
    }

    pub fn is_empty(&self) -> bool {
        self.text_query().is_none() && !self.has_structural_filters()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Date,
    Quantity,
    CustomerName,
    FinalAmount,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "quantity" => Ok(SortKey::Quantity),
            "name" | "customername" | "customer_name" => Ok(SortKey::CustomerName),
            "amount" | "finalamount" | "final_amount" => Ok(SortKey::FinalAmount),
            other => Err(Error::invalid_input(format!(
                "Unknown sort key '{}': expected date, quantity, name or amount",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SortKey::Date => "date",
            SortKey::Quantity => "quantity",
            SortKey::CustomerName => "name",
            SortKey::FinalAmount => "amount",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(Error::invalid_input(format!(
                "Unknown sort direction '{}': expected asc or desc",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec::NATURAL
    }
}

impl SortSpec {
    /// The store's load order.
    pub const NATURAL: SortSpec = SortSpec {
        key: SortKey::Date,
        direction: SortDirection::Desc,
    };

    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        SortSpec { key, direction }
    }

    pub fn parse(key: &str, direction: &str) -> Result<Self> {
        Ok(SortSpec {
            key: key.parse()?,
            direction: direction.parse()?,
        })
    }

    pub fn is_natural(&self) -> bool {
        *self == SortSpec::NATURAL
    }
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageSpec {
    fn default() -> Self {
        PageSpec { page: 1, page_size: 10 }
    }
}

impl PageSpec {
    pub fn new(page: usize, page_size: usize) -> Self {
        PageSpec { page, page_size }
    }

    pub fn validate(&self, max_page_size: usize) -> Result<()> {
        if self.page < 1 {
            return Err(Error::invalid_input(format!(
                "Page must be at least 1, got {}",
                self.page
            )));
        }
        if self.page_size < 1 || self.page_size > max_page_size {
            return Err(Error::invalid_input(format!(
                "Page size must be between 1 and {}, got {}",
                max_page_size, self.page_size
            )));
        }
        Ok(())
    }

    /// Index of the first item on this page, saturating on overflow.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1)).saturating_mul(self.page_size)
    }

    pub fn end(&self) -> usize {
        self.offset().saturating_add(self.page_size)
    }
}
