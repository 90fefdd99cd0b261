use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use crate::error::Result;

/// Seam between the cloze pipeline and a concrete masked-LM implementation.
pub trait MaskedLmModel {
    type Options: std::fmt::Debug + Clone;

    fn new(options: Self::Options, device: Device) -> Result<Self>
    where
        Self: Sized;

    /// Forward a rectangular batch of token-id sentences.
    ///
    /// Returns logits of shape `(sentences, seq_len, vocab)`.
    fn forward_batch(&self, sentences: &[Vec<u32>]) -> Result<Tensor>;

    fn get_tokenizer(options: Self::Options) -> Result<Tokenizer>;

    fn device(&self) -> &Device;
}
