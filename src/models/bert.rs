//! BERT masked-LM wrapper for the cloze pipeline.
//!
//! Uses `candle_transformers::models::bert` for the underlying implementation.
//! Any Hub checkpoint with a BERT architecture works, e.g.
//! `neuralmind/bert-base-portuguese-cased` or `bert-base-uncased`.

use candle_core::{Device, Tensor};
use candle_transformers::models::bert::BertForMaskedLM;
use tokenizers::Tokenizer;

use crate::error::{ProbeError, Result};
use crate::loaders::{load_model_weights, load_tokenizer};

/// Hugging Face Hub repository id of a BERT masked-LM checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BertModelId(pub String);

impl BertModelId {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self(repo_id.into())
    }

    /// Hub id with path separators flattened, for use in file names.
    pub fn as_file_stem(&self) -> String {
        self.0.replace('/', "-")
    }
}

impl std::fmt::Display for BertModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl crate::pipelines::cache::ModelOptions for BertModelId {
    fn cache_key(&self) -> String {
        self.0.clone()
    }
}

/// BERT with its masked-LM head, run over batches of pre-built token ids.
#[derive(Clone)]
pub struct ClozeBertModel {
    model: std::sync::Arc<BertForMaskedLM>,
    device: Device,
}

impl ClozeBertModel {
    pub fn new(id: &BertModelId, device: Device) -> Result<Self> {
        let (config, vb) = load_model_weights(&id.0, &device)?;
        let model = BertForMaskedLM::load(vb, &config)?;

        Ok(Self {
            model: std::sync::Arc::new(model),
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Forward a rectangular batch of token-id sentences.
    ///
    /// Returns logits of shape `(sentences, seq_len, vocab)`.
    pub fn forward_batch(&self, sentences: &[Vec<u32>]) -> Result<Tensor> {
        let n = sentences.len();
        if n == 0 {
            return Err(ProbeError::Unexpected("Empty sentence batch".to_string()));
        }
        let len = sentences[0].len();
        if sentences.iter().any(|s| s.len() != len) {
            return Err(ProbeError::Unexpected(
                "Ragged sentence batch: all sentences must have equal length".to_string(),
            ));
        }

        let flat: Vec<u32> = sentences.iter().flatten().copied().collect();
        let input_ids = Tensor::from_vec(flat, (n, len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let logits = self.model.forward(&input_ids, &token_type_ids, None)?;
        Ok(logits)
    }

    pub fn get_tokenizer(id: &BertModelId) -> Result<Tokenizer> {
        load_tokenizer(&id.0)
    }
}

impl crate::pipelines::cloze::model::MaskedLmModel for ClozeBertModel {
    type Options = BertModelId;

    fn new(options: Self::Options, device: Device) -> Result<Self> {
        ClozeBertModel::new(&options, device)
    }

    fn forward_batch(&self, sentences: &[Vec<u32>]) -> Result<Tensor> {
        self.forward_batch(sentences)
    }

    fn get_tokenizer(options: Self::Options) -> Result<Tokenizer> {
        Self::get_tokenizer(&options)
    }

    fn device(&self) -> &Device {
        &self.device
    }
}
