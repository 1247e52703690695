use std::collections::{BTreeMap, BTreeSet};
use chrono::NaiveDate;
use serde::Serialize;
use crate::core::types::{FilterField, Record};

/// Sum / count / average over a set of sales.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_records: usize,
    pub total_amount: f64,
    pub total_quantity: u64,
    pub total_discount: f64,
    pub average_order_value: f64,
}

impl SalesStats {
    pub fn add(&mut self, record: &Record) {
        self.total_records += 1;
        self.total_amount += record.final_amount;
        self.total_quantity += record.quantity;
        self.total_discount += record.discount_amount();
    }

    pub fn finish(mut self) -> Self {
        self.average_order_value = if self.total_records == 0 {
            0.0
        } else {
            self.total_amount / self.total_records as f64
        };
        self
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut stats = SalesStats::default();
        for record in records {
            stats.add(record);
        }
        stats.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: Ord + Copy> ValueRange<T> {
    fn widen(range: &mut Option<ValueRange<T>>, value: T) {
        match range {
            Some(r) => {
                r.min = r.min.min(value);
                r.max = r.max.max(value);
            }
            None => *range = Some(ValueRange { min: value, max: value }),
        }
    }
}

/// Filter options and global statistics for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    pub distinct_values_by_field: BTreeMap<FilterField, Vec<String>>,
    pub age_range: Option<ValueRange<u32>>,
    pub date_range: Option<ValueRange<NaiveDate>>,
    pub stats: SalesStats,
    /// Collection size these numbers were computed from.
    pub record_count: usize,
}

impl Aggregates {
    /// One pass over every record.
    pub fn compute(records: &[Record]) -> Self {
        let mut distinct: BTreeMap<FilterField, BTreeSet<&str>> = FilterField::ALL
            .iter()
            .map(|field| (*field, BTreeSet::new()))
            .collect();
        let mut age_range = None;
        let mut date_range = None;
        let mut stats = SalesStats::default();

        for record in records {
            for (field, values) in distinct.iter_mut() {
                values.extend(record.field_values(*field).into_iter().filter(|v| !v.is_empty()));
            }
            ValueRange::widen(&mut age_range, record.age);
            if let Some(date) = record.date {
                ValueRange::widen(&mut date_range, date);
            }
            stats.add(record);
        }

        Aggregates {
            distinct_values_by_field: distinct
                .into_iter()
                .map(|(field, values)| (field, values.into_iter().map(str::to_string).collect()))
                .collect(),
            age_range,
            date_range,
            stats: stats.finish(),
            record_count: records.len(),
        }
    }
}
