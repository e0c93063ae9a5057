//! # ALICE-Score
//!
//! Corpus perplexity scoring for n-gram language model indices.
//!
//! Feed every line of a held-out corpus through a backoff language model,
//! accumulate log10 probability mass, and report perplexity including and
//! excluding out-of-vocabulary tokens.
//!
//! ## Principle
//!
//! ```text
//! Corpus line (sentence)
//!     ↓
//! State reset → score(w1) → score(w2) → ... → sentence mass
//!     ↓
//! Corpus totals (all tokens / OOV tokens only)
//!     ↓
//! Perplexity = 10^(-total / tokens)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use alice_score::{AnyModel, ArpaReader, CorpusReader, ModelType, Report};
//!
//! let arpa = "\\data\\\nngram 1=3\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\ta\n-0.3\tb\n\n\\end\\\n";
//! let arpa = ArpaReader::new().read(arpa.as_bytes()).unwrap();
//! let model = AnyModel::build(ModelType::ProbingHash, &arpa);
//!
//! let mut corpus = CorpusReader::new("a b\n".as_bytes());
//! let stats = model.score_corpus(&mut corpus).unwrap();
//! assert_eq!(stats.corpus_tokens, 2);
//!
//! let report = Report::new(stats);
//! assert!(report.perplexity().excluding_oovs.is_some());
//! ```

// --- Global Allocator: mimalloc (Microsoft's high-performance allocator) ---
#[cfg(not(target_env = "msvc"))]
use mimalloc::MiMalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod arpa;
pub mod corpus;
pub mod index;
pub mod model;
pub mod ngram;
pub mod perplexity;
pub mod probing_hash;
pub mod report;
pub mod scorer;
pub mod sorted_array;

pub use arpa::{ArpaEntry, ArpaModel, ArpaReader};
pub use corpus::{CorpusReader, Sentence};
pub use index::{
    read_index_info, read_model_type, write_index, CompressionMode, IndexHeader, IndexInfo,
    MappedIndex,
};
pub use model::{AnyModel, LanguageModel, ModelType, ScoringState, WordScore};
pub use ngram::{NGramEntry, NGramState, Vocabulary};
pub use perplexity::Perplexity;
pub use probing_hash::ProbingHashModel;
pub use report::{format_significant, JsonReport, Report};
pub use scorer::{CorpusScorer, CorpusStats, SentenceScore};
pub use sorted_array::SortedArrayModel;

use std::path::Path;
use thiserror::Error;

/// ALICE-Score index magic bytes
pub const ALICE_LM_MAGIC: &[u8; 8] = b"ALICE-LM";

/// ALICE-Score index format version
pub const ALICE_LM_VERSION: (u8, u8) = (1, 0);

/// Error types for ALICE-Score operations
#[derive(Error, Debug)]
pub enum ALICEScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic: expected ALICE-LM")]
    InvalidMagic,

    #[error("Invalid version: {0}.{1}")]
    InvalidVersion(u8, u8),

    #[error("Invalid index header: {0}")]
    InvalidHeader(String),

    #[error("score() not supported with type '{0}'")]
    UnsupportedModelType(String),

    #[error("ARPA error at line {line}: {message}")]
    Arpa { line: usize, message: String },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ALICEScoreError>;

/// Load an index, score a corpus file against it and build the report.
///
/// `corpus_path` may be `-` to read the corpus from stdin.
pub fn score_files<P: AsRef<Path>, Q: AsRef<Path>>(index_path: P, corpus_path: Q) -> Result<Report> {
    let model = AnyModel::load(index_path)?;
    let mut corpus = CorpusReader::open(corpus_path)?;
    let stats = model.score_corpus(&mut corpus)?;
    Ok(Report::new(stats))
}
