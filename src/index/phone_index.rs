use std::collections::HashMap;
use roaring::RoaringBitmap;
use crate::core::types::Position;
use crate::store::record_store::RecordStore;

/// Digit-prefix and digit-suffix buckets over phone numbers.
pub struct PhoneIndex {
    pub(crate) prefixes: HashMap<String, RoaringBitmap>,
    pub(crate) suffixes: HashMap<String, RoaringBitmap>,
    min_len: usize,
    max_len: usize,
    suffix_len: usize,
}

impl PhoneIndex {
    pub fn new(min_len: usize, max_len: usize, suffix_len: usize) -> Self {
        PhoneIndex {
            prefixes: HashMap::new(),
            suffixes: HashMap::new(),
            min_len,
            max_len: max_len.max(min_len),
            suffix_len,
        }
    }

    pub fn insert(&mut self, digits: &str, position: Position) {
        if digits.len() < self.min_len {
            return;
        }

        for len in self.min_len..=self.max_len.min(digits.len()) {
            self.prefixes
                .entry(digits[..len].to_string())
                .or_default()
                .insert(position);
        }

        if self.suffix_len > 0 && digits.len() >= self.suffix_len {
            self.suffixes
                .entry(digits[digits.len() - self.suffix_len..].to_string())
                .or_default()
                .insert(position);
        }
    }

    /// Fold another partial index (built over a disjoint chunk) into this one.
    pub fn merge(&mut self, other: PhoneIndex) {
        for (key, positions) in other.prefixes {
            *self.prefixes.entry(key).or_default() |= positions;
        }
        for (key, positions) in other.suffixes {
            *self.suffixes.entry(key).or_default() |= positions;
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.prefixes.len() + self.suffixes.len()
    }

    /// Positions whose phone digits start with `digits`, plus those ending
    /// with it when `digits` is exactly the suffix length.
    ///
    /// Queries longer than the prefix cap read the cap-length bucket and keep
    /// only entries that really start with the whole query.
    pub fn lookup(&self, digits: &str, store: &RecordStore) -> RoaringBitmap {
        let mut hits = RoaringBitmap::new();
        let len = digits.len();
        if len < self.min_len {
            return hits;
        }

        if len <= self.max_len {
            if let Some(bucket) = self.prefixes.get(digits) {
                hits |= bucket;
            }
        } else if let Some(bucket) = self.prefixes.get(&digits[..self.max_len]) {
            for position in bucket.iter() {
                let matches = store
                    .get(position)
                    .is_some_and(|r| r.keys.phone_digits.starts_with(digits));
                if matches {
                    hits.insert(position);
                }
            }
        }

        if len == self.suffix_len {
            if let Some(bucket) = self.suffixes.get(digits) {
                hits |= bucket;
            }
        }

        hits
    }
}
