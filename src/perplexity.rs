//! Perplexity from corpus totals
//!
//! Masses arrive as `f32` sums; token counts and masses are widened to `f64`
//! before the division that feeds the exponent.

use crate::scorer::CorpusStats;

/// Corpus perplexity figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perplexity {
    /// `10^(-tot_log10_prob / corpus_tokens)`; NaN for an empty corpus
    pub including_oovs: f64,
    /// Same over in-vocabulary tokens; `None` when every token was OOV
    pub excluding_oovs: Option<f64>,
}

impl Perplexity {
    /// Compute from raw totals
    pub fn compute(
        corpus_tokens: u64,
        oovs: u64,
        tot_log10_prob: f32,
        tot_log10_prob_only_oovs: f32,
    ) -> Self {
        if corpus_tokens == 0 {
            log::warn!("Empty corpus: perplexity is undefined");
        }
        let including_oovs = 10f64.powf(-(tot_log10_prob as f64 / corpus_tokens as f64));

        let excluding_oovs = match corpus_tokens.checked_sub(oovs) {
            Some(in_vocab) if in_vocab != 0 => {
                let in_vocab_log10_prob = tot_log10_prob - tot_log10_prob_only_oovs;
                Some(10f64.powf(-(in_vocab_log10_prob as f64 / in_vocab as f64)))
            }
            _ => None,
        };

        Self {
            including_oovs,
            excluding_oovs,
        }
    }

    pub fn from_stats(stats: &CorpusStats) -> Self {
        Self::compute(
            stats.corpus_tokens,
            stats.oovs,
            stats.tot_log10_prob,
            stats.tot_log10_prob_only_oovs,
        )
    }
}
