//! Shared backoff n-gram machinery
//!
//! Both index representations store the same `(log10 prob, backoff)` pairs
//! keyed by word-id sequences; they only differ in how a key is looked up.
//! The backoff walk and the per-sentence state live here.

use crate::arpa::{ArpaModel, BOS, DEFAULT_UNK_LOG10_PROB, UNK};
use crate::model::{ScoringState, WordScore};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Word id within a model vocabulary
pub type WordId = u32;

/// Inline capacity for context windows and lookup keys
pub(crate) const INLINE_ORDER: usize = 8;

pub(crate) type IdBuffer = SmallVec<[WordId; INLINE_ORDER]>;

/// Stored n-gram values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NGramEntry {
    pub log10_prob: f32,
    pub backoff: f32,
}

/// Hash vocabulary (word → id), ids follow ARPA unigram order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    ids: HashMap<String, WordId>,
}

impl Vocabulary {
    /// Build from the unigram section of an ARPA model
    pub fn from_arpa(arpa: &ArpaModel) -> Self {
        let ids = arpa
            .unigrams()
            .iter()
            .enumerate()
            .map(|(id, entry)| (entry.words[0].clone(), id as WordId))
            .collect();
        Self { ids }
    }

    pub fn get(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Lookup surface the backoff walk needs from a model representation
pub(crate) trait NGramLookup {
    /// Highest stored order
    fn order(&self) -> usize;
    fn word_id(&self, word: &str) -> Option<WordId>;
    fn unk_id(&self) -> WordId;
    fn bos_id(&self) -> Option<WordId>;
    /// Entry for an id sequence (oldest first); `None` if not stored
    fn lookup(&self, key: &[WordId]) -> Option<NGramEntry>;

    fn new_state(&self) -> NGramState {
        NGramState::new(self.order().saturating_sub(1), self.bos_id())
    }
}

/// Per-sentence scoring state for backoff models
///
/// Keeps the last `order - 1` word ids. `init` clears it in place, so the
/// window never reallocates between sentences.
#[derive(Debug, Clone)]
pub struct NGramState {
    context: IdBuffer,
    scratch: IdBuffer,
    max_context: usize,
    bos: Option<WordId>,
    oovs: u64,
}

impl NGramState {
    fn new(max_context: usize, bos: Option<WordId>) -> Self {
        let mut state = Self {
            context: SmallVec::with_capacity(max_context),
            scratch: SmallVec::with_capacity(max_context + 1),
            max_context,
            bos,
            oovs: 0,
        };
        state.init();
        state
    }

    /// Current context, oldest first
    pub fn context(&self) -> &[WordId] {
        &self.context
    }

    fn push(&mut self, id: WordId) {
        if self.max_context == 0 {
            return;
        }
        if self.context.len() == self.max_context {
            self.context.remove(0);
        }
        self.context.push(id);
    }
}

impl ScoringState for NGramState {
    fn init(&mut self) {
        self.context.clear();
        self.oovs = 0;
        if let Some(bos) = self.bos {
            self.push(bos);
        }
    }

    fn oovs(&self) -> u64 {
        self.oovs
    }
}

/// Score `word` after the state's context, then append it to the context
pub(crate) fn backoff_score<L: NGramLookup + ?Sized>(
    lm: &L,
    state: &mut NGramState,
    word: &str,
) -> WordScore {
    let (id, is_oov) = match lm.word_id(word) {
        Some(id) => (id, false),
        None => {
            state.oovs += 1;
            (lm.unk_id(), true)
        }
    };

    let mut backoff = 0.0f32;
    let mut log10_prob = None;
    for start in 0..=state.context.len() {
        let history = &state.context[start..];
        state.scratch.clear();
        state.scratch.extend_from_slice(history);
        state.scratch.push(id);

        if let Some(entry) = lm.lookup(&state.scratch) {
            log10_prob = Some(entry.log10_prob + backoff);
            break;
        }
        if !history.is_empty() {
            if let Some(entry) = lm.lookup(history) {
                backoff += entry.backoff;
            }
        }
    }

    state.push(id);
    WordScore {
        // Unreachable with a built model: every word id has a unigram
        log10_prob: log10_prob.unwrap_or(DEFAULT_UNK_LOG10_PROB + backoff),
        is_oov,
    }
}

/// Resolve the special token ids of an ARPA vocabulary
pub(crate) fn special_ids(vocab: &Vocabulary) -> (WordId, Option<WordId>) {
    // ArpaReader guarantees <unk>; fall back to id 0 for hand-built models
    let unk = vocab.get(UNK).unwrap_or(0);
    (unk, vocab.get(BOS))
}

/// Map every n-gram of an ARPA model to its id key
pub(crate) fn keyed_entries(
    arpa: &ArpaModel,
    vocab: &Vocabulary,
) -> Vec<Vec<(Vec<WordId>, NGramEntry)>> {
    arpa.orders
        .iter()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let key: Option<Vec<WordId>> =
                        entry.words.iter().map(|w| vocab.get(w)).collect();
                    if key.is_none() {
                        log::warn!("Skipping n-gram with unknown word: {:?}", entry.words);
                    }
                    key.map(|key| {
                        (
                            key,
                            NGramEntry {
                                log10_prob: entry.log10_prob,
                                backoff: entry.backoff,
                            },
                        )
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arpa::ArpaReader;

    /// Minimal map-backed lookup for exercising the backoff walk
    struct MapLookup {
        vocab: Vocabulary,
        order: usize,
        table: HashMap<Vec<WordId>, NGramEntry>,
    }

    impl MapLookup {
        fn from_arpa(text: &str) -> Self {
            let arpa = ArpaReader::new().read(text.as_bytes()).unwrap();
            let vocab = Vocabulary::from_arpa(&arpa);
            let table = keyed_entries(&arpa, &vocab).into_iter().flatten().collect();
            Self {
                vocab,
                order: arpa.order(),
                table,
            }
        }
    }

    impl NGramLookup for MapLookup {
        fn order(&self) -> usize {
            self.order
        }
        fn word_id(&self, word: &str) -> Option<WordId> {
            self.vocab.get(word)
        }
        fn unk_id(&self) -> WordId {
            special_ids(&self.vocab).0
        }
        fn bos_id(&self) -> Option<WordId> {
            special_ids(&self.vocab).1
        }
        fn lookup(&self, key: &[WordId]) -> Option<NGramEntry> {
            self.table.get(key).copied()
        }
    }

    const TRIGRAM_ARPA: &str = "\\data\\
ngram 1=5
ngram 2=3
ngram 3=1

\\1-grams:
-2.0\t<unk>
-1.0\t<s>\t-0.5
-0.7\ta\t-0.4
-0.8\tb\t-0.3
-0.9\tc

\\2-grams:
-0.3\t<s> a\t-0.2
-0.4\ta b\t-0.1
-0.6\tb c

\\3-grams:
-0.05\t<s> a b

\\end\\
";

    fn score_all(lm: &MapLookup, state: &mut NGramState, words: &[&str]) -> Vec<WordScore> {
        words.iter().map(|w| backoff_score(lm, state, w)).collect()
    }

    #[test]
    fn test_longest_match_wins() {
        let lm = MapLookup::from_arpa(TRIGRAM_ARPA);
        let mut state = lm.new_state();

        let scores = score_all(&lm, &mut state, &["a", "b"]);
        assert_eq!(scores[0].log10_prob, -0.3);
        assert_eq!(scores[1].log10_prob, -0.05);
        assert!(!scores[0].is_oov && !scores[1].is_oov);
    }

    #[test]
    fn test_backoff_accumulates() {
        let lm = MapLookup::from_arpa(TRIGRAM_ARPA);
        let mut state = lm.new_state();

        // context <s> a b; "a" unseen after "a b" and "b"
        let scores = score_all(&lm, &mut state, &["a", "b", "a"]);
        // bow(a b) + bow(b) + p(a)
        let expected = -0.1f32 + -0.3 + -0.7;
        assert!((scores[2].log10_prob - expected).abs() < 1e-6);
    }

    #[test]
    fn test_oov_counts_and_maps_to_unk() {
        let lm = MapLookup::from_arpa(TRIGRAM_ARPA);
        let mut state = lm.new_state();

        let scores = score_all(&lm, &mut state, &["zzz", "yyy"]);
        assert!(scores.iter().all(|s| s.is_oov));
        assert_eq!(state.oovs(), 2);
        // bow(<s>) + p(<unk>), then no stored context for <unk>
        assert!((scores[0].log10_prob - (-0.5 + -2.0)).abs() < 1e-6);
        assert_eq!(scores[1].log10_prob, -2.0);
    }

    #[test]
    fn test_init_resets_context_and_oovs() {
        let lm = MapLookup::from_arpa(TRIGRAM_ARPA);
        let mut state = lm.new_state();
        let bos = lm.bos_id().unwrap();

        score_all(&lm, &mut state, &["zzz", "a", "b"]);
        assert_eq!(state.oovs(), 1);
        assert_eq!(state.context().len(), 2);

        state.init();
        assert_eq!(state.oovs(), 0);
        assert_eq!(state.context(), &[bos]);
    }

    #[test]
    fn test_context_window_is_bounded() {
        let lm = MapLookup::from_arpa(TRIGRAM_ARPA);
        let mut state = lm.new_state();

        score_all(&lm, &mut state, &["a", "b", "c", "a", "b"]);
        assert_eq!(state.context().len(), 2);
        let a = lm.word_id("a").unwrap();
        let b = lm.word_id("b").unwrap();
        assert_eq!(state.context(), &[a, b]);
    }

    #[test]
    fn test_unigram_model_has_no_context() {
        let arpa = "\\data\\\nngram 1=2\n\\1-grams:\n-1.0\t<unk>\n-0.5\ta\n\\end\\\n";
        let lm = MapLookup::from_arpa(arpa);
        let mut state = lm.new_state();

        let scores = score_all(&lm, &mut state, &["a", "a"]);
        assert_eq!(scores[1].log10_prob, -0.5);
        assert!(state.context().is_empty());
    }
}
