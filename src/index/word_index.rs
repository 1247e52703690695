use std::collections::BTreeMap;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use roaring::RoaringBitmap;
use crate::core::error::Result;

/// Word → positions, with an FST term dictionary for prefix scans.
///
/// The FST maps each term to its ordinal in `postings`. A prefix lookup walks
/// the sorted range starting at the prefix and stops at the first term that
/// no longer starts with it, so cost follows the number of matching terms,
/// not the vocabulary size.
pub struct WordIndex {
    fst: Map<Vec<u8>>,
    postings: Vec<RoaringBitmap>,
}

impl WordIndex {
    /// Build from terms already in sorted order (BTreeMap iteration order).
    pub fn from_terms(terms: BTreeMap<String, RoaringBitmap>) -> Result<Self> {
        let mut builder = MapBuilder::memory();
        let mut postings = Vec::with_capacity(terms.len());

        for (ordinal, (term, positions)) in terms.into_iter().enumerate() {
            builder.insert(term.as_bytes(), ordinal as u64)?;
            postings.push(positions);
        }

        Ok(WordIndex {
            fst: builder.into_map(),
            postings,
        })
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Positions whose name has a word starting with `prefix` (or equal to it).
    pub fn prefix_lookup(&self, prefix: &str) -> RoaringBitmap {
        let mut hits = RoaringBitmap::new();
        if prefix.is_empty() {
            return hits;
        }

        let prefix_bytes = prefix.as_bytes();
        let mut stream = self.fst.range().ge(prefix_bytes).into_stream();

        while let Some((term_bytes, ordinal)) = stream.next() {
            if !term_bytes.starts_with(prefix_bytes) {
                break;
            }
            hits |= &self.postings[ordinal as usize];
        }

        hits
    }

    /// Terms starting with `prefix`, in sorted order.
    pub fn matching_terms(&self, prefix: &str) -> Vec<String> {
        let mut terms = Vec::new();
        let prefix_bytes = prefix.as_bytes();
        let mut stream = self.fst.range().ge(prefix_bytes).into_stream();

        while let Some((term_bytes, _)) = stream.next() {
            if !term_bytes.starts_with(prefix_bytes) {
                break;
            }
            if let Ok(term) = String::from_utf8(term_bytes.to_vec()) {
                terms.push(term);
            }
        }

        terms
    }

    pub fn exact(&self, term: &str) -> Option<&RoaringBitmap> {
        self.fst.get(term).map(|ordinal| &self.postings[ordinal as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &[u32])]) -> WordIndex {
        let terms = entries
            .iter()
            .map(|(term, positions)| (term.to_string(), positions.iter().copied().collect()))
            .collect();
        WordIndex::from_terms(terms).unwrap()
    }

    #[test]
    fn prefix_lookup_unions_every_matching_term() {
        let index = index(&[
            ("nisha", &[1]),
            ("nishant", &[2, 5]),
            ("nitin", &[3]),
            ("rao", &[2]),
        ]);

        let hits: Vec<u32> = index.prefix_lookup("nish").iter().collect();
        assert_eq!(hits, vec![1, 2, 5]);
        assert_eq!(index.matching_terms("ni"), vec!["nisha", "nishant", "nitin"]);
        assert!(index.prefix_lookup("z").is_empty());
    }

    #[test]
    fn exact_term_is_its_own_prefix() {
        let index = index(&[("rao", &[7]), ("raoul", &[8])]);

        assert_eq!(index.prefix_lookup("rao").len(), 2);
        assert_eq!(index.exact("rao").map(|b| b.len()), Some(1));
    }
}
