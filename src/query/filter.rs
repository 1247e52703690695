use std::collections::HashSet;
use chrono::NaiveDate;
use rayon::prelude::*;
use crate::core::cancel::CancelToken;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{FilterField, Position, Record};
use crate::query::types::FilterSpec;
use crate::search::results::Candidates;
use crate::store::record_store::RecordStore;

/// Structural predicates compiled once per request.
///
/// Requested values are lowercased up front and compared against the
/// records' precomputed lowercase keys.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    fields: Vec<(FilterField, HashSet<String>)>,
    tags: Option<HashSet<String>>,
    min_age: Option<u32>,
    max_age: Option<u32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl CompiledFilter {
    pub fn compile(spec: &FilterSpec) -> Self {
        let mut compiled = CompiledFilter {
            min_age: spec.min_age,
            max_age: spec.max_age,
            start_date: spec.start_date,
            end_date: spec.end_date,
            ..CompiledFilter::default()
        };

        for (field, values) in &spec.by_field {
            let wanted: HashSet<String> = values
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect();
            if wanted.is_empty() {
                continue;
            }
            match field {
                FilterField::Tags => compiled.tags = Some(wanted),
                other => compiled.fields.push((*other, wanted)),
            }
        }

        compiled
    }

    /// True when every record passes.
    pub fn is_pass_all(&self) -> bool {
        self.fields.is_empty()
            && self.tags.is_none()
            && self.min_age.is_none()
            && self.max_age.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// All predicates, cheapest first, stopping at the first failure.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(min) = self.min_age {
            if record.age < min {
                return false;
            }
        }
        if let Some(max) = self.max_age {
            if record.age > max {
                return false;
            }
        }

        if self.start_date.is_some() || self.end_date.is_some() {
            // an undated record cannot satisfy a date bound
            let Some(date) = record.date else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start) {
                return false;
            }
            if self.end_date.is_some_and(|end| date > end) {
                return false;
            }
        }

        for (field, wanted) in &self.fields {
            match record.field_key(*field) {
                Some(value) if wanted.contains(value) => {}
                _ => return false,
            }
        }

        if let Some(wanted) = &self.tags {
            if !record.keys.tags.iter().any(|t| wanted.contains(t)) {
                return false;
            }
        }

        true
    }
}

/// Single-pass filter over a candidate set or the whole store.
pub struct FilterEvaluator {
    filter: CompiledFilter,
    chunk_size: usize,
    parallel_threshold: usize,
}

impl FilterEvaluator {
    pub fn new(spec: &FilterSpec, config: &EngineConfig) -> Self {
        FilterEvaluator {
            filter: CompiledFilter::compile(spec),
            chunk_size: config.scan_chunk_size.max(1),
            parallel_threshold: config.parallel_filter_threshold,
        }
    }

    pub fn compiled(&self) -> &CompiledFilter {
        &self.filter
    }

    /// Matching positions in ascending (collection) order.
    pub fn apply(
        &self,
        store: &RecordStore,
        candidates: &Candidates,
        cancel: &CancelToken,
    ) -> Result<Vec<Position>> {
        match candidates {
            Candidates::All => self.scan_all(store, cancel),
            Candidates::Positions(bitmap) => {
                let positions: Vec<Position> = bitmap.iter().collect();
                if self.filter.is_pass_all() {
                    return Ok(positions);
                }
                self.scan_positions(store, &positions, cancel)
            }
        }
    }

    fn scan_all(&self, store: &RecordStore, cancel: &CancelToken) -> Result<Vec<Position>> {
        if self.filter.is_pass_all() {
            return Ok(store.all_positions().collect());
        }

        let chunk_size = self.chunk_size;
        let keep = |chunk_no: usize, chunk: &[Record]| -> Vec<Position> {
            let base = chunk_no * chunk_size;
            chunk
                .iter()
                .enumerate()
                .filter(|(_, record)| self.filter.matches(record))
                .map(|(offset, _)| (base + offset) as Position)
                .collect()
        };

        if store.len() >= self.parallel_threshold {
            let parts = store
                .records()
                .par_chunks(chunk_size)
                .enumerate()
                .map(|(chunk_no, chunk)| -> Result<Vec<Position>> {
                    cancel.check()?;
                    Ok(keep(chunk_no, chunk))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.concat())
        } else {
            let mut matched = Vec::new();
            for (chunk_no, chunk) in store.records().chunks(chunk_size).enumerate() {
                cancel.check()?;
                matched.extend(keep(chunk_no, chunk));
            }
            Ok(matched)
        }
    }

    fn scan_positions(
        &self,
        store: &RecordStore,
        positions: &[Position],
        cancel: &CancelToken,
    ) -> Result<Vec<Position>> {
        let keep = |chunk: &[Position]| -> Vec<Position> {
            chunk
                .iter()
                .copied()
                .filter(|p| store.get(*p).is_some_and(|r| self.filter.matches(r)))
                .collect()
        };

        if positions.len() >= self.parallel_threshold {
            let parts = positions
                .par_chunks(self.chunk_size)
                .map(|chunk| -> Result<Vec<Position>> {
                    cancel.check()?;
                    Ok(keep(chunk))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.concat())
        } else {
            let mut matched = Vec::new();
            for chunk in positions.chunks(self.chunk_size) {
                cancel.check()?;
                matched.extend(keep(chunk));
            }
            Ok(matched)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::normalize::Normalizer;
    use crate::store::source::RawRecord;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        let raw: RawRecord = serde_json::from_value(value).unwrap();
        Normalizer::new(',').normalize(&raw, 1).0
    }

    #[test]
    fn enumerated_values_match_case_insensitively() {
        let spec = FilterSpec::new().with_values(FilterField::Region, ["NORTH", "east"]);
        let filter = CompiledFilter::compile(&spec);

        assert!(filter.matches(&record(json!({"region": "North"}))));
        assert!(filter.matches(&record(json!({"region": "East"}))));
        assert!(!filter.matches(&record(json!({"region": "South"}))));
        assert!(!filter.matches(&record(json!({}))));
    }

    #[test]
    fn tags_need_a_non_empty_intersection() {
        let spec = FilterSpec::new().with_values(FilterField::Tags, ["Loyal", "vip"]);
        let filter = CompiledFilter::compile(&spec);

        assert!(filter.matches(&record(json!({"tags": "new,loyal"}))));
        assert!(!filter.matches(&record(json!({"tags": "new,returning"}))));
        assert!(!filter.matches(&record(json!({"tags": ""}))));
    }

    #[test]
    fn date_bounds_are_inclusive_and_fail_closed() {
        let day = |d| NaiveDate::from_ymd_opt(2023, 5, d);
        let spec = FilterSpec::new().with_dates(day(1), day(31));
        let filter = CompiledFilter::compile(&spec);

        assert!(filter.matches(&record(json!({"date": "2023-05-01"}))));
        assert!(filter.matches(&record(json!({"date": "2023-05-31"}))));
        assert!(!filter.matches(&record(json!({"date": "2023-06-01"}))));
        assert!(!filter.matches(&record(json!({"date": "garbage"}))));

        let open_ended = CompiledFilter::compile(&FilterSpec::new().with_dates(None, day(31)));
        assert!(!open_ended.matches(&record(json!({}))));
    }

    #[test]
    fn age_range_is_inclusive() {
        let filter = CompiledFilter::compile(&FilterSpec::new().with_age(Some(30), Some(40)));

        assert!(filter.matches(&record(json!({"age": 30}))));
        assert!(filter.matches(&record(json!({"age": 40}))));
        assert!(!filter.matches(&record(json!({"age": 41}))));
        assert!(!filter.matches(&record(json!({"age": 29}))));

        let inverted = CompiledFilter::compile(&FilterSpec::new().with_age(Some(50), Some(20)));
        assert!(!inverted.matches(&record(json!({"age": 35}))));
    }

    #[test]
    fn cancelled_pass_stops() {
        let store = RecordStore::from_records(vec![record(json!({"age": 1}))]).unwrap();
        let spec = FilterSpec::new().with_age(Some(0), None);
        let evaluator = FilterEvaluator::new(&spec, &EngineConfig::default());
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = evaluator.apply(&store, &Candidates::All, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }
}
