use std::collections::{BTreeMap, HashSet};

use candle_core::{IndexOp, D};
use candle_nn::ops::{log_softmax, softmax};
use serde::Serialize;
use tokenizers::Tokenizer;
use tracing::debug;

use super::model::MaskedLmModel;
use super::sentence::{
    bare_pattern_variants, multi_mask_sentence, spliced_variants, MaskedSentence, SpecialTokens,
};
use super::zscore::{dataset_tokens, ZTable};
use crate::dataset::EvalPair;
use crate::error::{ProbeError, Result};
use crate::patterns::{Pattern, MASK_SLOT};
use crate::pipelines::stats::{PipelineStats, PipelineStatsBuilder};

// ============ Scoring modes ============

/// How pair scores are extracted from the model. Modes are mutually
/// exclusive; each corresponds to one CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Per-subword spliced sentences, log-softmax over the vocabulary.
    LogSoftmax,
    /// Bare-pattern per-subword sentences, raw logits.
    BertScore,
    /// Whole word replaced by a `[MASK]` run, raw logits per position.
    BertScoreMulti,
    /// Per-subword spliced sentences, raw logits, z sums recorded alongside.
    ZScore,
    /// Like `ZScore` with scores and z sums exponentiated.
    ZScoreExp,
}

impl ScoreMode {
    /// Whether this mode records z normalization sums.
    pub fn is_z(self) -> bool {
        matches!(self, ScoreMode::ZScore | ScoreMode::ZScoreExp)
    }

    fn exponentiate(self) -> bool {
        matches!(self, ScoreMode::ZScoreExp)
    }
}

#[derive(Clone, Copy)]
enum Norm {
    Raw,
    LogSoftmax,
    Exp,
}

// ============ Output types ============

/// Scores for one pattern: hyponym-masked then hypernym-masked, one score
/// per masked subword. Serializes as a two-element array.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatternScores(pub Vec<f32>, pub Vec<f32>);

/// All pattern scores for one pair, plus z sums in z modes.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PairScores {
    /// Per-pattern z normalization sums for this pair's subword counts.
    #[serde(rename = "z_score", skip_serializing_if = "Option::is_none")]
    pub z_scores: Option<BTreeMap<String, f64>>,
    /// Pattern text to scores.
    #[serde(flatten)]
    pub patterns: BTreeMap<String, PatternScores>,
}

/// Scoring results for one dataset.
#[derive(Debug)]
pub struct DatasetReport {
    /// Pair key to its scores.
    pub pairs: BTreeMap<String, PairScores>,
    /// Pairs with the `hyper` relation label among those scored.
    pub hyper_num: usize,
    /// Pairs skipped as out-of-vocabulary.
    pub oov_num: usize,
    /// Execution statistics.
    pub stats: PipelineStats,
}

/// A predicted token with confidence score.
#[derive(Debug, Clone)]
pub struct TokenPrediction {
    pub token: String,
    pub score: f32,
}

// ============ Pipeline ============

/// Scores (hyponym, hypernym) pairs against Hearst-style patterns with a
/// masked-LM.
///
/// Construct with [`ClozePipelineBuilder`](super::ClozePipelineBuilder).
pub struct ClozePipeline<M: MaskedLmModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) special: SpecialTokens,
}

impl<M: MaskedLmModel> ClozePipeline<M> {
    /// Score every pair of `dataset` against every pattern.
    ///
    /// With `include_oov` false and a reference `vocab` present, pairs with
    /// either word missing from the vocabulary are skipped and counted in
    /// [`DatasetReport::oov_num`].
    pub fn score_dataset(
        &self,
        patterns: &[Pattern],
        dataset: &[EvalPair],
        mode: ScoreMode,
        vocab: Option<&HashSet<String>>,
        include_oov: bool,
    ) -> Result<DatasetReport> {
        let mut stats = PipelineStats::start();
        let mut pairs_out: BTreeMap<String, PairScores> = BTreeMap::new();
        let mut hyper_num = 0;
        let mut oov_num = 0;

        let z_tokens = if mode.is_z() {
            Some(dataset_tokens(&self.tokenizer, dataset)?)
        } else {
            None
        };
        let mut z_table = ZTable::new();

        for pair in dataset {
            if !include_oov {
                if let Some(vocab) = vocab {
                    if !vocab.contains(&pair.hyponym) || !vocab.contains(&pair.hypernym) {
                        oov_num += 1;
                        continue;
                    }
                }
            }
            if pair.relation == "hyper" {
                hyper_num += 1;
            }

            debug!(pair = %pair.key(), "scoring pair");
            let hypo_ids = self.encode_word(&pair.hyponym)?;
            let hyper_ids = self.encode_word(&pair.hypernym)?;

            let mut out = PairScores::default();
            for pattern in patterns {
                let scores = match mode {
                    ScoreMode::LogSoftmax => self.spliced_scores(
                        pattern,
                        pair,
                        &hypo_ids,
                        &hyper_ids,
                        Norm::LogSoftmax,
                        &mut stats,
                    )?,
                    ScoreMode::BertScore => {
                        self.bare_scores(pattern, &hypo_ids, &hyper_ids, &mut stats)?
                    }
                    ScoreMode::BertScoreMulti => {
                        self.multi_scores(pattern, &hypo_ids, &hyper_ids, &mut stats)?
                    }
                    ScoreMode::ZScore => self.spliced_scores(
                        pattern,
                        pair,
                        &hypo_ids,
                        &hyper_ids,
                        Norm::Raw,
                        &mut stats,
                    )?,
                    ScoreMode::ZScoreExp => self.spliced_scores(
                        pattern,
                        pair,
                        &hypo_ids,
                        &hyper_ids,
                        Norm::Exp,
                        &mut stats,
                    )?,
                };

                if let Some(tokens) = &z_tokens {
                    let pattern_ids = self.encode_bare_pattern(pattern)?;
                    z_table.get_or_compute(
                        &self.model,
                        tokens,
                        hypo_ids.len(),
                        hyper_ids.len(),
                        pattern,
                        &pattern_ids,
                        self.special,
                        mode.exponentiate(),
                        &mut stats,
                    )?;
                }

                out.patterns.insert(pattern.template().to_string(), scores);
            }

            if mode.is_z() {
                let sums = patterns
                    .iter()
                    .filter_map(|p| {
                        z_table
                            .get(hypo_ids.len(), hyper_ids.len(), p)
                            .map(|z| (p.template().to_string(), z))
                    })
                    .collect();
                out.z_scores = Some(sums);
            }

            pairs_out.insert(pair.key(), out);
        }

        let scored = pairs_out.len();
        Ok(DatasetReport {
            pairs: pairs_out,
            hyper_num,
            oov_num,
            stats: stats.finish(scored),
        })
    }

    /// Top `k` vocabulary tokens for the first `[MASK]` in `text`.
    pub fn top_k_predictions(&self, text: &str, k: usize) -> Result<Vec<TokenPrediction>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let ids = self.encode_sentence(text)?;
        let mask_index = ids
            .iter()
            .position(|&id| id == self.special.mask)
            .ok_or_else(|| {
                let preview: String = text.chars().take(50).collect();
                ProbeError::InvalidInput(format!("No [MASK] token in input '{preview}'"))
            })?;

        let logits = self.model.forward_batch(&[ids])?;
        let at_mask = logits.i((0, mask_index, ..))?;
        let probs = softmax(&at_mask, D::Minus1)?;
        let probs_vec = probs.to_vec1::<f32>()?;

        let mut idxs: Vec<usize> = (0..probs_vec.len()).collect();
        idxs.sort_by(|&i, &j| probs_vec[j].total_cmp(&probs_vec[i]));
        idxs.truncate(k.min(idxs.len()));

        let mut out = Vec::with_capacity(idxs.len());
        for idx in idxs {
            let token = self
                .tokenizer
                .decode(&[idx as u32], true)
                .unwrap_or_default()
                .trim()
                .to_string();
            if token.is_empty() {
                continue;
            }
            out.push(TokenPrediction {
                token,
                score: probs_vec[idx],
            });
        }
        Ok(out)
    }

    /// Count pairs by (hyponym, hypernym) subword length.
    pub fn subword_length_histogram(
        &self,
        dataset: &[EvalPair],
    ) -> Result<BTreeMap<(usize, usize), usize>> {
        let mut histogram = BTreeMap::new();
        for pair in dataset {
            let hypo = self.encode_word(&pair.hyponym)?.len();
            let hyper = self.encode_word(&pair.hypernym)?.len();
            *histogram.entry((hypo, hyper)).or_insert(0) += 1;
        }
        Ok(histogram)
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }

    // ============ Internals ============

    fn encode_word(&self, word: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer.encode(word, false).map_err(|e| {
            ProbeError::Tokenization(format!("Tokenization failed on '{word}': {e}"))
        })?;
        let ids = encoding.get_ids().to_vec();
        if ids.is_empty() {
            return Err(ProbeError::Tokenization(format!(
                "Word '{word}' tokenized to nothing"
            )));
        }
        Ok(ids)
    }

    fn encode_sentence(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            let preview: String = text.chars().take(50).collect();
            ProbeError::Tokenization(format!("Tokenization failed on '{preview}': {e}"))
        })?;
        Ok(encoding.get_ids().to_vec())
    }

    fn encode_bare_pattern(&self, pattern: &Pattern) -> Result<Vec<u32>> {
        let bare = pattern.bare();
        let encoding = self.tokenizer.encode(bare.as_str(), false).map_err(|e| {
            ProbeError::Tokenization(format!("Tokenization failed on pattern '{bare}': {e}"))
        })?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Forward one rectangular group and read each sentence's score for its
    /// true subword at the mask.
    fn gather_group(
        &self,
        group: &[MaskedSentence],
        word: &[u32],
        norm: Norm,
        stats: &mut PipelineStatsBuilder,
    ) -> Result<Vec<f32>> {
        let batch: Vec<Vec<u32>> = group.iter().map(|s| s.ids.clone()).collect();
        let logits = self.model.forward_batch(&batch)?;
        stats.record_forward();
        let logits = match norm {
            Norm::LogSoftmax => log_softmax(&logits, D::Minus1)?,
            Norm::Raw | Norm::Exp => logits,
        };

        let mut scores = Vec::with_capacity(group.len());
        for (row, sentence) in group.iter().enumerate() {
            let score = logits
                .i((row, sentence.mask_position(), word[row] as usize))?
                .to_scalar::<f32>()?;
            scores.push(match norm {
                Norm::Exp => score.exp(),
                _ => score,
            });
        }
        Ok(scores)
    }

    fn spliced_scores(
        &self,
        pattern: &Pattern,
        pair: &EvalPair,
        hypo_ids: &[u32],
        hyper_ids: &[u32],
        norm: Norm,
        stats: &mut PipelineStatsBuilder,
    ) -> Result<PatternScores> {
        let hypo_sentence = self.encode_sentence(&pattern.fill(MASK_SLOT, &pair.hypernym))?;
        let hyper_sentence = self.encode_sentence(&pattern.fill(&pair.hyponym, MASK_SLOT))?;

        let hypo_group = spliced_variants(&hypo_sentence, hypo_ids, &self.special)?;
        let hyper_group = spliced_variants(&hyper_sentence, hyper_ids, &self.special)?;

        Ok(PatternScores(
            self.gather_group(&hypo_group, hypo_ids, norm, stats)?,
            self.gather_group(&hyper_group, hyper_ids, norm, stats)?,
        ))
    }

    fn bare_scores(
        &self,
        pattern: &Pattern,
        hypo_ids: &[u32],
        hyper_ids: &[u32],
        stats: &mut PipelineStatsBuilder,
    ) -> Result<PatternScores> {
        let pattern_ids = self.encode_bare_pattern(pattern)?;

        let hypo_group =
            bare_pattern_variants(hypo_ids, hyper_ids, &pattern_ids, &self.special, true);
        let hyper_group =
            bare_pattern_variants(hyper_ids, hypo_ids, &pattern_ids, &self.special, false);

        Ok(PatternScores(
            self.gather_group(&hypo_group, hypo_ids, Norm::Raw, stats)?,
            self.gather_group(&hyper_group, hyper_ids, Norm::Raw, stats)?,
        ))
    }

    fn multi_scores(
        &self,
        pattern: &Pattern,
        hypo_ids: &[u32],
        hyper_ids: &[u32],
        stats: &mut PipelineStatsBuilder,
    ) -> Result<PatternScores> {
        let pattern_ids = self.encode_bare_pattern(pattern)?;

        let hypo_masked =
            multi_mask_sentence(hypo_ids.len(), hyper_ids, &pattern_ids, &self.special, true);
        let hyper_masked =
            multi_mask_sentence(hyper_ids.len(), hypo_ids, &pattern_ids, &self.special, false);

        // Both sentences carry both words' lengths, so they batch together.
        let logits = self
            .model
            .forward_batch(&[hypo_masked.ids.clone(), hyper_masked.ids.clone()])?;
        stats.record_forward();

        let mut hypo_scores = Vec::with_capacity(hypo_ids.len());
        for (j, &pos) in hypo_masked.mask_positions.iter().enumerate() {
            hypo_scores.push(logits.i((0, pos, hypo_ids[j] as usize))?.to_scalar::<f32>()?);
        }
        let mut hyper_scores = Vec::with_capacity(hyper_ids.len());
        for (j, &pos) in hyper_masked.mask_positions.iter().enumerate() {
            hyper_scores.push(
                logits
                    .i((1, pos, hyper_ids[j] as usize))?
                    .to_scalar::<f32>()?,
            );
        }

        Ok(PatternScores(hypo_scores, hyper_scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_modes() {
        assert!(ScoreMode::ZScore.is_z());
        assert!(ScoreMode::ZScoreExp.is_z());
        assert!(!ScoreMode::LogSoftmax.is_z());
        assert!(!ScoreMode::BertScore.is_z());
        assert!(ScoreMode::ZScoreExp.exponentiate());
        assert!(!ScoreMode::ZScore.exponentiate());
    }

    #[test]
    fn pair_scores_serialize_as_pattern_to_array_pair() {
        let mut scores = PairScores::default();
        scores.patterns.insert(
            "{} is a {}".to_string(),
            PatternScores(vec![1.0, 2.0], vec![3.0]),
        );
        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "{} is a {}": [[1.0, 2.0], [3.0]] })
        );
    }

    #[test]
    fn z_sums_serialize_under_z_score_key() {
        let mut scores = PairScores::default();
        scores
            .patterns
            .insert("{} , a {}".to_string(), PatternScores(vec![0.5], vec![0.5]));
        let mut sums = BTreeMap::new();
        sums.insert("{} , a {}".to_string(), 12.5);
        scores.z_scores = Some(sums);
        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(json["z_score"]["{} , a {}"], 12.5);
    }
}
