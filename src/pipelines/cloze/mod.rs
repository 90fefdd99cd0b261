//! Cloze scoring pipeline for hypernymy probing.
//!
//! Builds masked variants of Hearst-style template sentences for a
//! (hyponym, hypernym) pair, runs them through a masked-LM, and reads back
//! per-subword scores. Several scoring modes are supported; see
//! [`ScoreMode`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cloze_probe::cloze::{ClozePipelineBuilder, ScoreMode};
//! use cloze_probe::dataset::EvalPair;
//! use cloze_probe::patterns::{builtin_patterns, PatternLanguage};
//!
//! # fn main() -> cloze_probe::Result<()> {
//! let pipeline = ClozePipelineBuilder::bert("neuralmind/bert-base-portuguese-cased").build()?;
//!
//! let patterns = builtin_patterns(PatternLanguage::Portuguese);
//! let pairs = vec![EvalPair {
//!     hyponym: "tigre".into(),
//!     hypernym: "animal".into(),
//!     is_hyper: true,
//!     relation: "hyper".into(),
//! }];
//!
//! let report = pipeline.score_dataset(&patterns, &pairs, ScoreMode::LogSoftmax, None, true)?;
//! println!("scored {} pairs", report.pairs.len());
//! # Ok(())
//! # }
//! ```

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod pipeline;
pub(crate) mod sentence;
pub(crate) mod zscore;

pub mod model;

// ============ Public API ============

pub use crate::pipelines::stats::PipelineStats;
pub use builder::ClozePipelineBuilder;
pub use model::MaskedLmModel;
pub use pipeline::{
    ClozePipeline, DatasetReport, PairScores, PatternScores, ScoreMode, TokenPrediction,
};
pub use sentence::{MaskedSentence, SpecialTokens};
