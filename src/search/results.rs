use roaring::RoaringBitmap;
use serde::Serialize;
use crate::core::types::{Position, Record};
use crate::index::background::IndexStatus;

/// Candidate set handed from text search to the filter pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    /// No text query: every record is a candidate.
    All,
    /// Positions matched by the text query, possibly none.
    Positions(RoaringBitmap),
}

impl Candidates {
    pub fn is_all(&self) -> bool {
        matches!(self, Candidates::All)
    }
}

/// Text-search answer plus which strategy produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits {
    pub candidates: Candidates,
    pub strategy: Option<&'static str>,
}

/// Everything a request matched, before ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchSet {
    /// The whole collection, positions `0..n`.
    All(usize),
    /// Matching positions in collection order.
    Positions(Vec<Position>),
}

impl MatchSet {
    pub fn len(&self) -> usize {
        match self {
            MatchSet::All(len) => *len,
            MatchSet::Positions(positions) => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of a query, with exact totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub records: Vec<Record>,
    pub total_items: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// Search strategy that produced the candidates, if a text query ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_strategy: Option<&'static str>,
}

/// A served answer, or the signal that text search is still warming up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "data")]
pub enum QueryOutcome<T> {
    Ready(T),
    IndexNotReady(IndexStatus),
}

impl<T> QueryOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, QueryOutcome::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            QueryOutcome::Ready(value) => Some(value),
            QueryOutcome::IndexNotReady(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueryOutcome<U> {
        match self {
            QueryOutcome::Ready(value) => QueryOutcome::Ready(f(value)),
            QueryOutcome::IndexNotReady(status) => QueryOutcome::IndexNotReady(status),
        }
    }
}
