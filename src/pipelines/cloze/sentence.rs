//! Masked sentence construction in token-id space.
//!
//! Everything here is pure index bookkeeping over already-tokenized words and
//! patterns, so the model and tokenizer never appear. Three constructions are
//! supported, matching the scoring modes that consume them:
//!
//! - spliced variants: a word's subwords spliced into a fully rendered
//!   pattern sentence at its mask slot, one sentence per subword with that
//!   subword masked;
//! - bare-pattern variants: `[CLS] word pattern other [SEP]` assembled from
//!   raw ids, again one sentence per masked subword;
//! - multi-mask: the whole word replaced by a run of `[MASK]`s in a single
//!   sentence.

use tokenizers::Tokenizer;

use crate::error::{ProbeError, Result};

/// Special token ids the constructions need.
#[derive(Debug, Clone, Copy)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub mask: u32,
}

impl SpecialTokens {
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self> {
        let get = |token: &str| {
            tokenizer.token_to_id(token).ok_or_else(|| {
                ProbeError::Tokenization(format!("Tokenizer has no '{token}' token"))
            })
        };
        Ok(Self {
            cls: get("[CLS]")?,
            sep: get("[SEP]")?,
            mask: get("[MASK]")?,
        })
    }
}

/// A token-id sentence with the positions of its `[MASK]` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedSentence {
    pub ids: Vec<u32>,
    pub mask_positions: Vec<usize>,
}

impl MaskedSentence {
    /// The single mask position of a one-mask sentence.
    pub fn mask_position(&self) -> usize {
        self.mask_positions[0]
    }
}

/// One copy of `word` per subword, each with that subword masked.
fn subword_masked(word: &[u32], mask: u32) -> Vec<Vec<u32>> {
    (0..word.len())
        .map(|i| {
            let mut w = word.to_vec();
            w[i] = mask;
            w
        })
        .collect()
}

/// Splice masked variants of `word` into `sentence_ids` at its mask slot.
///
/// `sentence_ids` is the tokenized pattern sentence with `word`'s slot
/// rendered as a single `[MASK]`. Each returned sentence replaces that slot
/// with the full word, one subword masked; its mask position is recorded.
pub fn spliced_variants(
    sentence_ids: &[u32],
    word: &[u32],
    special: &SpecialTokens,
) -> Result<Vec<MaskedSentence>> {
    let slot = sentence_ids
        .iter()
        .position(|&id| id == special.mask)
        .ok_or_else(|| {
            ProbeError::Unexpected("Rendered pattern sentence has no [MASK] slot".to_string())
        })?;
    let before = &sentence_ids[..slot];
    let after = &sentence_ids[slot + 1..];

    Ok(subword_masked(word, special.mask)
        .into_iter()
        .enumerate()
        .map(|(i, masked_word)| {
            let mut ids = Vec::with_capacity(before.len() + word.len() + after.len());
            ids.extend_from_slice(before);
            ids.extend_from_slice(&masked_word);
            ids.extend_from_slice(after);
            MaskedSentence {
                ids,
                mask_positions: vec![slot + i],
            }
        })
        .collect())
}

/// `[CLS] word pattern other [SEP]` (or `[CLS] other pattern word [SEP]`),
/// one sentence per masked subword of `word`.
pub fn bare_pattern_variants(
    word: &[u32],
    other: &[u32],
    pattern: &[u32],
    special: &SpecialTokens,
    word_first: bool,
) -> Vec<MaskedSentence> {
    let word_offset = if word_first { 1 } else { 1 + other.len() + pattern.len() };

    subword_masked(word, special.mask)
        .into_iter()
        .enumerate()
        .map(|(i, masked_word)| {
            let mut ids = Vec::with_capacity(3 + word.len() + pattern.len() + other.len());
            ids.push(special.cls);
            if word_first {
                ids.extend_from_slice(&masked_word);
                ids.extend_from_slice(pattern);
                ids.extend_from_slice(other);
            } else {
                ids.extend_from_slice(other);
                ids.extend_from_slice(pattern);
                ids.extend_from_slice(&masked_word);
            }
            ids.push(special.sep);
            MaskedSentence {
                ids,
                mask_positions: vec![word_offset + i],
            }
        })
        .collect()
}

/// `[CLS] word pattern other [SEP]` with the whole word as a `[MASK]` run.
pub fn multi_mask_sentence(
    word_len: usize,
    other: &[u32],
    pattern: &[u32],
    special: &SpecialTokens,
    word_first: bool,
) -> MaskedSentence {
    let word_offset = if word_first { 1 } else { 1 + other.len() + pattern.len() };

    let mut ids = Vec::with_capacity(3 + word_len + pattern.len() + other.len());
    ids.push(special.cls);
    if word_first {
        ids.extend(std::iter::repeat(special.mask).take(word_len));
        ids.extend_from_slice(pattern);
        ids.extend_from_slice(other);
    } else {
        ids.extend_from_slice(other);
        ids.extend_from_slice(pattern);
        ids.extend(std::iter::repeat(special.mask).take(word_len));
    }
    ids.push(special.sep);

    MaskedSentence {
        ids,
        mask_positions: (word_offset..word_offset + word_len).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens {
        cls: 101,
        sep: 102,
        mask: 103,
    };

    #[test]
    fn spliced_one_variant_per_subword() {
        // "<w> 5 6 <slot> 8" with a 3-subword word
        let sentence = [101, 5, 6, 103, 8, 102];
        let word = [20, 21, 22];
        let variants = spliced_variants(&sentence, &word, &SPECIAL).unwrap();
        assert_eq!(variants.len(), word.len());

        assert_eq!(variants[0].ids, vec![101, 5, 6, 103, 21, 22, 8, 102]);
        assert_eq!(variants[1].ids, vec![101, 5, 6, 20, 103, 22, 8, 102]);
        assert_eq!(variants[2].ids, vec![101, 5, 6, 20, 21, 103, 8, 102]);
    }

    #[test]
    fn spliced_mask_positions_point_at_masks() {
        let sentence = [101, 5, 103, 8, 102];
        let word = [20, 21];
        for v in spliced_variants(&sentence, &word, &SPECIAL).unwrap() {
            assert_eq!(v.ids[v.mask_position()], SPECIAL.mask);
            assert_eq!(
                v.ids.iter().filter(|&&id| id == SPECIAL.mask).count(),
                1,
                "exactly one mask per spliced variant"
            );
        }
    }

    #[test]
    fn spliced_errors_without_slot() {
        let sentence = [101, 5, 6, 102];
        assert!(spliced_variants(&sentence, &[20], &SPECIAL).is_err());
    }

    #[test]
    fn bare_variants_word_first() {
        let word = [20, 21];
        let other = [30];
        let pattern = [40, 41];
        let variants = bare_pattern_variants(&word, &other, &pattern, &SPECIAL, true);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].ids, vec![101, 103, 21, 40, 41, 30, 102]);
        assert_eq!(variants[1].ids, vec![101, 20, 103, 40, 41, 30, 102]);
        for v in &variants {
            assert_eq!(v.ids[v.mask_position()], SPECIAL.mask);
        }
    }

    #[test]
    fn bare_variants_word_last() {
        let word = [20, 21];
        let other = [30];
        let pattern = [40, 41];
        let variants = bare_pattern_variants(&word, &other, &pattern, &SPECIAL, false);
        assert_eq!(variants[0].ids, vec![101, 30, 40, 41, 103, 21, 102]);
        assert_eq!(variants[1].ids, vec![101, 30, 40, 41, 20, 103, 102]);
        assert_eq!(variants[0].mask_position(), 4);
        assert_eq!(variants[1].mask_position(), 5);
    }

    #[test]
    fn group_sentences_are_rectangular() {
        // Hyponym-masked and hypernym-masked groups of one pair end up the
        // same length: each sentence holds both words plus the pattern.
        let hypo = [20, 21, 22];
        let hyper = [30, 31];
        let pattern = [40, 41];
        let a = bare_pattern_variants(&hypo, &hyper, &pattern, &SPECIAL, true);
        let b = bare_pattern_variants(&hyper, &hypo, &pattern, &SPECIAL, false);
        let len = a[0].ids.len();
        assert!(a.iter().chain(b.iter()).all(|s| s.ids.len() == len));
    }

    #[test]
    fn multi_mask_covers_whole_word() {
        let other = [30, 31];
        let pattern = [40];
        let s = multi_mask_sentence(3, &other, &pattern, &SPECIAL, true);
        assert_eq!(s.ids, vec![101, 103, 103, 103, 40, 30, 31, 102]);
        assert_eq!(s.mask_positions, vec![1, 2, 3]);

        let s = multi_mask_sentence(2, &other, &pattern, &SPECIAL, false);
        assert_eq!(s.ids, vec![101, 30, 31, 40, 103, 103, 102]);
        assert_eq!(s.mask_positions, vec![4, 5]);
    }
}
