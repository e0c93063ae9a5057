//! Scoring interface and model registry
//!
//! The scorer only sees [`LanguageModel`] and [`ScoringState`]. Concrete
//! representations are a closed set selected at run time by the type tag
//! stored in the index header.

use crate::arpa::ArpaModel;
use crate::corpus::CorpusReader;
use crate::index::{self, CompressionMode, IndexHeader, MappedIndex};
use crate::probing_hash::ProbingHashModel;
use crate::scorer::{CorpusScorer, CorpusStats, SentenceScore};
use crate::sorted_array::SortedArrayModel;
use crate::{ALICEScoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

/// Per-sentence scoring context owned by a model
pub trait ScoringState {
    /// Reset for a new sentence without reallocating
    fn init(&mut self);

    /// Words marked OOV since the last `init`
    fn oovs(&self) -> u64;
}

/// Result of scoring a single word
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordScore {
    /// log10 P(word | context)
    pub log10_prob: f32,
    /// The word is not in the model vocabulary
    pub is_oov: bool,
}

/// A language model that can be driven word by word
pub trait LanguageModel {
    type State: ScoringState;

    /// Fresh state, already initialised for a first sentence
    fn state(&self) -> Self::State;

    /// Score `word` after the state's context and advance the context
    fn score(&self, state: &mut Self::State, word: &str) -> WordScore;

    /// Highest n-gram order
    fn order(&self) -> usize;

    /// Number of vocabulary entries
    fn vocab_size(&self) -> usize;
}

/// Closed set of model representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// Per-order hash tables
    ProbingHash,
    /// Per-order sorted key arrays, binary search
    SortedArray,
}

impl ModelType {
    /// Every registered type
    pub const ALL: [ModelType; 2] = [ModelType::ProbingHash, ModelType::SortedArray];

    /// Tag written to the index header
    pub fn tag(self) -> &'static str {
        match self {
            Self::ProbingHash => "probing_hash",
            Self::SortedArray => "sorted_array",
        }
    }

    /// Look up a registered type by tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelType {
    type Err = ALICEScoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s).ok_or_else(|| ALICEScoreError::UnsupportedModelType(s.to_string()))
    }
}

/// A loaded model of any registered type
#[derive(Debug, Clone)]
pub enum AnyModel {
    ProbingHash(ProbingHashModel),
    SortedArray(SortedArrayModel),
}

impl AnyModel {
    /// Build a model of the given type from ARPA tables
    pub fn build(model_type: ModelType, arpa: &ArpaModel) -> Self {
        match model_type {
            ModelType::ProbingHash => Self::ProbingHash(ProbingHashModel::from_arpa(arpa)),
            ModelType::SortedArray => Self::SortedArray(SortedArrayModel::from_arpa(arpa)),
        }
    }

    /// Load an index file, dispatching on its type tag
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading data structure from {}", path.display());
        let index = MappedIndex::open(path)?;
        let tag = &index.info().model_type;
        let model_type = ModelType::from_tag(tag)
            .ok_or_else(|| ALICEScoreError::UnsupportedModelType(tag.clone()))?;

        let model = match model_type {
            ModelType::ProbingHash => Self::ProbingHash(index.decode()?),
            ModelType::SortedArray => Self::SortedArray(index.decode()?),
        };
        log::info!(
            "Loaded {} model: order {}, {} words",
            model_type,
            model.order(),
            model.vocab_size()
        );
        Ok(model)
    }

    /// Serialize into the index container format
    pub fn write_to<W: Write>(&self, writer: &mut W, mode: CompressionMode) -> Result<u64> {
        let header = self.header()?;
        match self {
            Self::ProbingHash(m) => index::write_index(writer, ModelType::ProbingHash, &header, m, mode),
            Self::SortedArray(m) => index::write_index(writer, ModelType::SortedArray, &header, m, mode),
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Self::ProbingHash(_) => ModelType::ProbingHash,
            Self::SortedArray(_) => ModelType::SortedArray,
        }
    }

    pub fn order(&self) -> usize {
        match self {
            Self::ProbingHash(m) => m.order(),
            Self::SortedArray(m) => m.order(),
        }
    }

    pub fn vocab_size(&self) -> usize {
        match self {
            Self::ProbingHash(m) => m.vocab_size(),
            Self::SortedArray(m) => m.vocab_size(),
        }
    }

    pub fn ngram_count(&self) -> u64 {
        match self {
            Self::ProbingHash(m) => m.ngram_count(),
            Self::SortedArray(m) => m.ngram_count(),
        }
    }

    /// Score a whole corpus with the concrete model
    pub fn score_corpus<R: BufRead>(&self, corpus: &mut CorpusReader<R>) -> Result<CorpusStats> {
        self.score_corpus_with(corpus, |_| {})
    }

    /// Score a whole corpus, calling `observer` after every sentence
    pub fn score_corpus_with<R, F>(&self, corpus: &mut CorpusReader<R>, observer: F) -> Result<CorpusStats>
    where
        R: BufRead,
        F: FnMut(&SentenceScore),
    {
        match self {
            Self::ProbingHash(m) => CorpusScorer::new(m).score_with(corpus, observer),
            Self::SortedArray(m) => CorpusScorer::new(m).score_with(corpus, observer),
        }
    }

    fn header(&self) -> Result<IndexHeader> {
        let order = u8::try_from(self.order()).map_err(|_| {
            ALICEScoreError::EncodingError(format!("Order {} does not fit the index header", self.order()))
        })?;
        let vocab_size = u32::try_from(self.vocab_size()).map_err(|_| {
            ALICEScoreError::EncodingError(format!(
                "Vocabulary of {} words does not fit the index header",
                self.vocab_size()
            ))
        })?;
        Ok(IndexHeader {
            order,
            vocab_size,
            ngram_count: self.ngram_count(),
        })
    }
}
