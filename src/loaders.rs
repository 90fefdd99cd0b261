//! Hugging Face Hub loading for BERT checkpoints and tokenizers.

use candle_core::Device;
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use crate::error::{ProbeError, Result};

pub fn load_tokenizer(repo_id: &str) -> Result<Tokenizer> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));
    let tokenizer_path = repo.get("tokenizer.json")?;
    let path_str = tokenizer_path.display().to_string();
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        ProbeError::Tokenization(format!(
            "Failed to load tokenizer from '{}': {}",
            path_str, e
        ))
    })
}

pub fn load_model_weights(repo_id: &str, device: &Device) -> Result<(Config, VarBuilder<'static>)> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

    let config_path = repo.get("config.json")?;
    let weights_path = repo
        .get("model.safetensors")
        .or_else(|_| repo.get("pytorch_model.bin"))?;

    let config: Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

    let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)? }
    } else {
        VarBuilder::from_pth(&weights_path, DTYPE, device)?
    };

    Ok((config, vb))
}
