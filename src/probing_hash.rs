//! Hash-table backed backoff model (`probing_hash`)
//!
//! One hash table per order, keyed by the word-id sequence.

use crate::arpa::ArpaModel;
use crate::model::{LanguageModel, WordScore};
use crate::ngram::{self, NGramEntry, NGramLookup, NGramState, Vocabulary, WordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbingHashModel {
    vocab: Vocabulary,
    unk: WordId,
    bos: Option<WordId>,
    /// `tables[n - 1]` holds the n-grams
    tables: Vec<HashMap<Box<[WordId]>, NGramEntry>>,
}

impl ProbingHashModel {
    pub fn from_arpa(arpa: &ArpaModel) -> Self {
        let vocab = Vocabulary::from_arpa(arpa);
        let (unk, bos) = ngram::special_ids(&vocab);
        let tables = ngram::keyed_entries(arpa, &vocab)
            .into_iter()
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|(key, entry)| (key.into_boxed_slice(), entry))
                    .collect()
            })
            .collect();

        Self {
            vocab,
            unk,
            bos,
            tables,
        }
    }

    pub fn ngram_count(&self) -> u64 {
        self.tables.iter().map(|t| t.len() as u64).sum()
    }
}

impl NGramLookup for ProbingHashModel {
    fn order(&self) -> usize {
        self.tables.len()
    }

    fn word_id(&self, word: &str) -> Option<WordId> {
        self.vocab.get(word)
    }

    fn unk_id(&self) -> WordId {
        self.unk
    }

    fn bos_id(&self) -> Option<WordId> {
        self.bos
    }

    fn lookup(&self, key: &[WordId]) -> Option<NGramEntry> {
        let table = self.tables.get(key.len().checked_sub(1)?)?;
        table.get(key).copied()
    }
}

impl LanguageModel for ProbingHashModel {
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
        self.vocab.len()
    }
}
