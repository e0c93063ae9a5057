//! Sorted-array backed backoff model (`sorted_array`)
//!
//! Each order stores its keys flattened into one `Vec<WordId>` with stride
//! `n`, sorted lexicographically, and a parallel entry array. Lookups are a
//! binary search over the key rows. The vocabulary is a sorted word list.

use crate::arpa::ArpaModel;
use crate::model::{LanguageModel, WordScore};
use crate::ngram::{self, NGramEntry, NGramLookup, NGramState, Vocabulary, WordId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One order of n-grams
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SortedTable {
    n: usize,
    keys: Vec<WordId>,
    entries: Vec<NGramEntry>,
}

impl SortedTable {
    /// Sort rows by key; a repeated key keeps its last entry, as a hash table would
    fn build(n: usize, mut rows: Vec<(Vec<WordId>, NGramEntry)>) -> Self {
        // Stable, so equal keys stay in input order
        rows.par_sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys: Vec<WordId> = Vec::with_capacity(rows.len() * n);
        let mut entries: Vec<NGramEntry> = Vec::with_capacity(rows.len());
        for (key, entry) in rows {
            if let Some(last) = entries.last_mut() {
                if keys[keys.len() - n..] == key[..] {
                    *last = entry;
                    continue;
                }
            }
            keys.extend_from_slice(&key);
            entries.push(entry);
        }
        Self { n, keys, entries }
    }

    fn key(&self, row: usize) -> &[WordId] {
        &self.keys[row * self.n..(row + 1) * self.n]
    }

    fn get(&self, key: &[WordId]) -> Option<NGramEntry> {
        let (mut lo, mut hi) = (0, self.entries.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.key(mid).cmp(key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(self.entries[mid]),
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortedArrayModel {
    /// `(word, id)` sorted by word
    words: Vec<(String, WordId)>,
    unk: WordId,
    bos: Option<WordId>,
    tables: Vec<SortedTable>,
}

impl SortedArrayModel {
    pub fn from_arpa(arpa: &ArpaModel) -> Self {
        let vocab = Vocabulary::from_arpa(arpa);
        let (unk, bos) = ngram::special_ids(&vocab);

        let mut words: Vec<(String, WordId)> = arpa
            .unigrams()
            .iter()
            .filter_map(|e| vocab.get(&e.words[0]).map(|id| (e.words[0].clone(), id)))
            .collect();
        words.sort_unstable();
        words.dedup_by(|a, b| a.0 == b.0);

        let tables = ngram::keyed_entries(arpa, &vocab)
            .into_par_iter()
            .enumerate()
            .map(|(i, rows)| SortedTable::build(i + 1, rows))
            .collect();

        Self {
            words,
            unk,
            bos,
            tables,
        }
    }

    pub fn ngram_count(&self) -> u64 {
        self.tables.iter().map(|t| t.len() as u64).sum()
    }
}

impl NGramLookup for SortedArrayModel {
    fn order(&self) -> usize {
        self.tables.len()
    }

    fn word_id(&self, word: &str) -> Option<WordId> {
        self.words
            .binary_search_by(|(w, _)| w.as_str().cmp(word))
            .ok()
            .map(|i| self.words[i].1)
    }

    fn unk_id(&self) -> WordId {
        self.unk
    }

    fn bos_id(&self) -> Option<WordId> {
        self.bos
    }

    fn lookup(&self, key: &[WordId]) -> Option<NGramEntry> {
        self.tables.get(key.len().checked_sub(1)?)?.get(key)
    }
}

impl LanguageModel for SortedArrayModel {
    type State = NGramState;

    fn state(&self) -> NGramState {
        self.new_state()
    }

    fn score(&self, state: &mut NGramState, word: &str) -> WordScore {
        ngram::backoff_score(self, state, word)
    }

    fn order(&self) -> usize {
        self.tables.len()
    }

    fn vocab_size(&self) -> usize {
        self.words.len()
    }
}
