//! Z normalization sums for raw-logit pair scores.
//!
//! For a given pattern and a (hyponym, hypernym) subword-count pair, the z
//! sum enumerates every placement of a single `[MASK]` over sentences built
//! from the cartesian product of the dataset's subword tokens, and sums the
//! model's score for every dataset token at each mask position. The sum
//! depends only on the subword counts and the pattern, so it is memoized per
//! dataset run.

use std::collections::HashMap;

use candle_core::{IndexOp, Tensor};
use tokenizers::Tokenizer;
use tracing::debug;

use super::model::MaskedLmModel;
use super::sentence::{MaskedSentence, SpecialTokens};
use crate::error::{ProbeError, Result};
use crate::patterns::Pattern;
use crate::pipelines::stats::PipelineStatsBuilder;

/// Sentences per forward pass during z enumeration.
const Z_BATCH: usize = 64;

/// Unique subword token ids over all words of a dataset, first-seen order.
pub fn dataset_tokens(
    tokenizer: &Tokenizer,
    pairs: &[crate::dataset::EvalPair],
) -> Result<Vec<u32>> {
    let mut seen = std::collections::HashSet::new();
    let mut tokens = Vec::new();
    for pair in pairs {
        for word in [&pair.hyponym, &pair.hypernym] {
            let encoding = tokenizer.encode(word.as_str(), false).map_err(|e| {
                ProbeError::Tokenization(format!("Tokenization failed on '{word}': {e}"))
            })?;
            for &id in encoding.get_ids() {
                if seen.insert(id) {
                    tokens.push(id);
                }
            }
        }
    }
    Ok(tokens)
}

/// Odometer over `tokens^width`.
struct TokenCombos<'a> {
    tokens: &'a [u32],
    idx: Vec<usize>,
    done: bool,
}

impl<'a> TokenCombos<'a> {
    fn new(tokens: &'a [u32], width: usize) -> Self {
        Self {
            tokens,
            idx: vec![0; width],
            done: width > 0 && tokens.is_empty(),
        }
    }
}

impl Iterator for TokenCombos<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        if self.done {
            return None;
        }
        let combo: Vec<u32> = self.idx.iter().map(|&i| self.tokens[i]).collect();
        // advance rightmost digit first
        let mut pos = self.idx.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.idx[pos] += 1;
            if self.idx[pos] < self.tokens.len() {
                break;
            }
            self.idx[pos] = 0;
        }
        Some(combo)
    }
}

/// All z sentences for one pattern and subword-count pair.
///
/// Each sentence is `[CLS] hypo-part pattern hyper-part [SEP]` where the
/// parts are filled from a token combination with a single `[MASK]` inserted
/// at one of the `hypo_len + hyper_len` positions.
pub struct ZSentences<'a> {
    tokens: &'a [u32],
    hypo_len: usize,
    hyper_len: usize,
    pattern_ids: &'a [u32],
    special: SpecialTokens,
    insert_pos: usize,
    combos: TokenCombos<'a>,
}

impl<'a> ZSentences<'a> {
    pub fn new(
        tokens: &'a [u32],
        hypo_len: usize,
        hyper_len: usize,
        pattern_ids: &'a [u32],
        special: SpecialTokens,
    ) -> Self {
        let width = hypo_len + hyper_len - 1;
        Self {
            tokens,
            hypo_len,
            hyper_len,
            pattern_ids,
            special,
            insert_pos: 0,
            combos: TokenCombos::new(tokens, width),
        }
    }

    fn build(&self, combo: &[u32]) -> MaskedSentence {
        let mut content = combo.to_vec();
        content.insert(self.insert_pos, self.special.mask);
        let (hypo_part, hyper_part) = content.split_at(self.hypo_len);

        let mut ids =
            Vec::with_capacity(2 + self.hypo_len + self.pattern_ids.len() + self.hyper_len);
        ids.push(self.special.cls);
        ids.extend_from_slice(hypo_part);
        ids.extend_from_slice(self.pattern_ids);
        ids.extend_from_slice(hyper_part);
        ids.push(self.special.sep);

        let mask_idx = if self.insert_pos < self.hypo_len {
            1 + self.insert_pos
        } else {
            1 + self.hypo_len + self.pattern_ids.len() + (self.insert_pos - self.hypo_len)
        };
        MaskedSentence {
            ids,
            mask_positions: vec![mask_idx],
        }
    }
}

impl Iterator for ZSentences<'_> {
    type Item = MaskedSentence;

    fn next(&mut self) -> Option<MaskedSentence> {
        loop {
            if self.insert_pos >= self.hypo_len + self.hyper_len {
                return None;
            }
            match self.combos.next() {
                Some(combo) => return Some(self.build(&combo)),
                None => {
                    self.insert_pos += 1;
                    let width = self.hypo_len + self.hyper_len - 1;
                    self.combos = TokenCombos::new(self.tokens, width);
                }
            }
        }
    }
}

/// Memo table for z sums, keyed by subword counts and pattern text.
#[derive(Default)]
pub struct ZTable {
    sums: HashMap<(usize, usize, String), f64>,
}

impl ZTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized z sum for `(hypo_len, hyper_len, pattern)`, computing it
    /// on first request.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_compute<M: MaskedLmModel>(
        &mut self,
        model: &M,
        tokens: &[u32],
        hypo_len: usize,
        hyper_len: usize,
        pattern: &Pattern,
        pattern_ids: &[u32],
        special: SpecialTokens,
        exponentiate: bool,
        stats: &mut PipelineStatsBuilder,
    ) -> Result<f64> {
        let key = (hypo_len, hyper_len, pattern.template().to_string());
        if let Some(&z) = self.sums.get(&key) {
            return Ok(z);
        }
        let z = compute_z(
            model,
            tokens,
            hypo_len,
            hyper_len,
            pattern_ids,
            special,
            exponentiate,
            stats,
        )?;
        self.sums.insert(key, z);
        Ok(z)
    }

    pub fn get(&self, hypo_len: usize, hyper_len: usize, pattern: &Pattern) -> Option<f64> {
        self.sums
            .get(&(hypo_len, hyper_len, pattern.template().to_string()))
            .copied()
    }
}

/// Sum model scores for every dataset token at every mask placement.
#[allow(clippy::too_many_arguments)]
fn compute_z<M: MaskedLmModel>(
    model: &M,
    tokens: &[u32],
    hypo_len: usize,
    hyper_len: usize,
    pattern_ids: &[u32],
    special: SpecialTokens,
    exponentiate: bool,
    stats: &mut PipelineStatsBuilder,
) -> Result<f64> {
    if tokens.is_empty() {
        return Ok(0.0);
    }
    let size = hypo_len + hyper_len;
    let total = (size as f64) * (tokens.len() as f64).powi(size as i32 - 1);
    debug!(
        hypo_len,
        hyper_len,
        sentences = total,
        "computing z sum"
    );

    let token_ids = Tensor::new(tokens, model.device())?;
    let mut sentences = ZSentences::new(tokens, hypo_len, hyper_len, pattern_ids, special);

    let mut sum = 0.0f64;
    loop {
        let chunk: Vec<MaskedSentence> = sentences.by_ref().take(Z_BATCH).collect();
        if chunk.is_empty() {
            break;
        }
        let batch: Vec<Vec<u32>> = chunk.iter().map(|s| s.ids.clone()).collect();
        let logits = model.forward_batch(&batch)?;
        stats.record_forward();

        for (row, sentence) in chunk.iter().enumerate() {
            let at_mask = logits.i((row, sentence.mask_position(), ..))?;
            let scores = at_mask.index_select(&token_ids, 0)?;
            let scores = if exponentiate { scores.exp()? } else { scores };
            sum += scores.sum_all()?.to_scalar::<f32>()? as f64;
        }
    }
    Ok(sum)
}
