use super::model::MaskedLmModel;
use super::pipeline::ClozePipeline;
use super::sentence::SpecialTokens;
use crate::error::Result;
use crate::pipelines::cache::ModelOptions;
use crate::pipelines::utils::{BasePipelineBuilder, DeviceRequest, StandardPipelineBuilder};

crate::pipelines::utils::impl_device_methods!(delegated: ClozePipelineBuilder<M: MaskedLmModel>);

/// Builder for creating [`ClozePipeline`] instances.
///
/// Use [`Self::bert`] as the entry point.
///
/// # Examples
///
/// ```rust,no_run
/// use cloze_probe::cloze::ClozePipelineBuilder;
///
/// # fn main() -> cloze_probe::Result<()> {
/// let pipeline = ClozePipelineBuilder::bert("neuralmind/bert-base-portuguese-cased")
///     .cpu()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClozePipelineBuilder<M: MaskedLmModel>(StandardPipelineBuilder<M::Options>);

impl<M: MaskedLmModel> ClozePipelineBuilder<M> {
    pub(crate) fn new(options: M::Options) -> Self {
        Self(StandardPipelineBuilder::new(options))
    }

    /// Builds the pipeline with configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading or device initialization fails, or
    /// if the tokenizer lacks the `[MASK]`/`[CLS]`/`[SEP]` special tokens.
    pub fn build(self) -> Result<ClozePipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
        M::Options: ModelOptions + Clone,
    {
        BasePipelineBuilder::build(self)
    }
}

impl<M: MaskedLmModel> BasePipelineBuilder<M> for ClozePipelineBuilder<M>
where
    M: Clone + Send + Sync + 'static,
    M::Options: ModelOptions + Clone,
{
    type Model = M;
    type Pipeline = ClozePipeline<M>;
    type Options = M::Options;

    fn options(&self) -> &Self::Options {
        &self.0.options
    }

    fn device_request(&self) -> &DeviceRequest {
        &self.0.device_request
    }

    fn create_model(options: Self::Options, device: candle_core::Device) -> Result<M> {
        M::new(options, device)
    }

    fn get_tokenizer(options: Self::Options) -> Result<tokenizers::Tokenizer> {
        M::get_tokenizer(options)
    }

    fn construct_pipeline(model: M, tokenizer: tokenizers::Tokenizer) -> Result<Self::Pipeline> {
        let special = SpecialTokens::from_tokenizer(&tokenizer)?;
        Ok(ClozePipeline {
            model,
            tokenizer,
            special,
        })
    }
}

impl ClozePipelineBuilder<crate::models::ClozeBertModel> {
    /// Creates a builder for a BERT masked-LM checkpoint on the Hub.
    pub fn bert(repo_id: impl Into<String>) -> Self {
        Self::new(crate::models::BertModelId::new(repo_id))
    }
}
