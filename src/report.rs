//! Report emitter
//!
//! Text output keeps the classic `key = value` layout with 8 significant
//! digits; JSON output carries the same figures in one object.

use crate::perplexity::Perplexity;
use crate::scorer::CorpusStats;
use crate::Result;
use serde::Serialize;
use std::io::Write;

/// Significant digits for floating point figures
pub const REPORT_PRECISION: usize = 8;

/// Scoring results ready to print
#[derive(Debug, Clone)]
pub struct Report {
    stats: CorpusStats,
    perplexity: Perplexity,
}

/// JSON shape of a report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub tot_log10_prob: f32,
    pub tot_log10_prob_only_oovs: f32,
    pub perplexity_including_oovs: f64,
    pub perplexity_excluding_oovs: Option<f64>,
    pub oovs: u64,
    pub corpus_tokens: u64,
    pub corpus_sentences: u64,
    pub elapsed_secs: f64,
}

impl Report {
    pub fn new(stats: CorpusStats) -> Self {
        let perplexity = Perplexity::from_stats(&stats);
        Self { stats, perplexity }
    }

    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }

    pub fn perplexity(&self) -> &Perplexity {
        &self.perplexity
    }

    /// Scoring wall time in seconds, from whole microseconds
    pub fn elapsed_secs(&self) -> f64 {
        self.stats.elapsed.as_micros() as f64 / 1_000_000.0
    }

    /// Write the text report
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        let fmt = |v: f64| format_significant(v, REPORT_PRECISION);

        writeln!(writer, "tot_log10_prob = {}", fmt(self.stats.tot_log10_prob as f64))?;
        writeln!(
            writer,
            "tot_log10_prob_only_OOVs = {}",
            fmt(self.stats.tot_log10_prob_only_oovs as f64)
        )?;
        writeln!(
            writer,
            "perplexity including OOVs = {}",
            fmt(self.perplexity.including_oovs)
        )?;
        if let Some(excluding) = self.perplexity.excluding_oovs {
            writeln!(writer, "perplexity excluding OOVs = {}", fmt(excluding))?;
        }
        writeln!(writer, "OOVs = {}", self.stats.oovs)?;
        writeln!(writer, "corpus tokens = {}", self.stats.corpus_tokens)?;
        writeln!(writer, "corpus sentences = {}", self.stats.corpus_sentences)?;
        writeln!(writer, "elapsed time: {} [sec]", fmt(self.elapsed_secs()))?;
        Ok(())
    }

    pub fn to_json(&self) -> JsonReport {
        JsonReport {
            tot_log10_prob: self.stats.tot_log10_prob,
            tot_log10_prob_only_oovs: self.stats.tot_log10_prob_only_oovs,
            perplexity_including_oovs: self.perplexity.including_oovs,
            perplexity_excluding_oovs: self.perplexity.excluding_oovs,
            oovs: self.stats.oovs,
            corpus_tokens: self.stats.corpus_tokens,
            corpus_sentences: self.stats.corpus_sentences,
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Write the JSON report as a single line
    pub fn write_json<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *writer, &self.to_json())?;
        writeln!(writer)?;
        Ok(())
    }
}

/// Format like C's `%g` with `precision` significant digits
///
/// Fixed notation when the decimal exponent is in `[-4, precision)`,
/// scientific otherwise; trailing zeros are dropped.
pub fn format_significant(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    // Exponent after rounding to `precision` digits
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
