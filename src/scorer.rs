//! Corpus scorer
//!
//! Drives one scoring state through every sentence of a corpus and
//! accumulates the corpus totals.
//!
//! Per-word and per-sentence masses are summed in `f32`, matching the
//! precision the models return; [`crate::Perplexity`] widens to `f64` only
//! for the final ratio.

use crate::corpus::CorpusReader;
use crate::model::{LanguageModel, ScoringState, WordScore};
use crate::Result;
use log::{debug, info};
use serde::Serialize;
use std::io::BufRead;
use std::time::{Duration, Instant};

/// Corpus totals after a scoring run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusStats {
    /// Sum of every word's log10 probability
    pub tot_log10_prob: f32,
    /// Sum over OOV words only
    pub tot_log10_prob_only_oovs: f32,
    /// OOV words
    pub oovs: u64,
    /// Words
    pub corpus_tokens: u64,
    /// Lines
    pub corpus_sentences: u64,
    /// Wall time of the scoring loop (model load excluded)
    pub elapsed: Duration,
}

/// Per-sentence result handed to observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentenceScore {
    /// 0-based line index
    pub sentence: u64,
    pub log10_prob: f32,
    pub oovs: u64,
    pub words: u64,
}

/// Scores corpora against one model, reusing a single state
pub struct CorpusScorer<'m, M: LanguageModel> {
    model: &'m M,
    state: M::State,
}

impl<'m, M: LanguageModel> CorpusScorer<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self {
            model,
            state: model.state(),
        }
    }

    /// Score every sentence of `corpus`
    pub fn score<R: BufRead>(&mut self, corpus: &mut CorpusReader<R>) -> Result<CorpusStats> {
        self.score_with(corpus, |_| {})
    }

    /// Score every sentence of `corpus`, calling `observer` after each one
    pub fn score_with<R, F>(&mut self, corpus: &mut CorpusReader<R>, mut observer: F) -> Result<CorpusStats>
    where
        R: BufRead,
        F: FnMut(&SentenceScore),
    {
        let mut stats = CorpusStats::default();

        info!("Scoring");
        let start = Instant::now();
        while let Some(sentence) = corpus.next_sentence()? {
            self.state.init();
            let mut sentence_log10_prob = 0.0f32;
            let mut words = 0u64;

            for word in sentence {
                let WordScore { log10_prob, is_oov } = self.model.score(&mut self.state, word);
                sentence_log10_prob += log10_prob;
                if is_oov {
                    stats.tot_log10_prob_only_oovs += log10_prob;
                }
                words += 1;
            }

            let sentence_score = SentenceScore {
                sentence: stats.corpus_sentences,
                log10_prob: sentence_log10_prob,
                oovs: self.state.oovs(),
                words,
            };
            stats.oovs += sentence_score.oovs;
            stats.tot_log10_prob += sentence_log10_prob;
            stats.corpus_sentences += 1;

            debug!(
                "sentence {}: log10_prob = {}, OOVs = {}",
                sentence_score.sentence, sentence_score.log10_prob, sentence_score.oovs
            );
            observer(&sentence_score);
        }
        stats.elapsed = start.elapsed();
        stats.corpus_tokens = corpus.num_words();

        info!(
            "Scored {} sentences ({} tokens) in {:.3}s",
            stats.corpus_sentences,
            stats.corpus_tokens,
            stats.elapsed.as_secs_f64()
        );
        Ok(stats)
    }
}
