use std::collections::HashMap;
use std::ops::Range;
use rayon::prelude::*;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Position, Record, RecordId, RecordKeys};

/// Largest collection a store can address with `Position`.
pub const MAX_RECORDS: usize = Position::MAX as usize;

/// The canonical, immutable record collection.
///
/// Records are kept in natural order: date descending, undated records last,
/// source order among equal dates. Every record's lookup keys are derived
/// here, whatever the record's origin.
#[derive(Debug)]
pub struct RecordStore {
    records: Vec<Record>,
    by_id: HashMap<RecordId, Position>,
}

impl RecordStore {
    pub fn from_records(mut records: Vec<Record>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::new(
                ErrorKind::EmptySource,
                "Collection has no records".to_string(),
            ));
        }
        if records.len() > MAX_RECORDS {
            return Err(Error::invalid_input(format!(
                "Collection of {} records exceeds {}",
                records.len(),
                MAX_RECORDS
            )));
        }

        records
            .par_iter_mut()
            .for_each(|record| record.keys = RecordKeys::from_record(record));

        // stable: equal dates keep source order
        records.sort_by(|a, b| b.date.cmp(&a.date));

        let mut by_id = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            by_id.entry(record.id).or_insert(position as Position);
        }

        Ok(RecordStore { records, by_id })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, position: Position) -> Option<&Record> {
        self.records.get(position as usize)
    }

    /// Position access for positions produced by this store's own index.
    pub fn at(&self, position: Position) -> &Record {
        &self.records[position as usize]
    }

    pub fn position_of(&self, id: RecordId) -> Option<Position> {
        self.by_id.get(&id).copied()
    }

    pub fn by_id(&self, id: RecordId) -> Option<&Record> {
        self.position_of(id).map(|p| self.at(p))
    }

    pub fn all_positions(&self) -> Range<Position> {
        0..self.records.len() as Position
    }
}
