//! Cloze probing of masked language models for hypernymy detection.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Scores
//! (hyponym, hypernym) word pairs against Hearst-style templates by masking
//! each word subword-by-subword and reading the model's predictions back.

// ============ Internal API ============

pub(crate) mod loaders;

// ============ Public API ============

pub mod dataset;
pub mod error;
pub mod models;
pub mod patterns;
pub mod pipelines;
pub mod report;

pub use error::{ProbeError, Result};
pub use models::{BertModelId, ClozeBertModel};
pub use pipelines::cloze;
