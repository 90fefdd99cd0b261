//! Integration tests for the cloze scoring pipeline.
//! These download real model weights; run with: cargo test --features integration

#![cfg(feature = "integration")]

use cloze_probe::cloze::{ClozePipelineBuilder, ScoreMode};
use cloze_probe::dataset::EvalPair;
use cloze_probe::patterns::{builtin_patterns, Pattern, PatternLanguage};

const MODEL: &str = "google-bert/bert-base-uncased";

fn sample_pairs() -> Vec<EvalPair> {
    vec![
        EvalPair {
            hyponym: "tiger".into(),
            hypernym: "animal".into(),
            is_hyper: true,
            relation: "hyper".into(),
        },
        EvalPair {
            hyponym: "banana".into(),
            hypernym: "avocado".into(),
            is_hyper: false,
            relation: "random".into(),
        },
    ]
}

#[test]
fn logsoftmax_scores_every_pair_and_pattern() -> anyhow::Result<()> {
    let pipeline = ClozePipelineBuilder::bert(MODEL).build()?;
    let patterns = builtin_patterns(PatternLanguage::English);
    let pairs = sample_pairs();

    let report = pipeline.score_dataset(&patterns, &pairs, ScoreMode::LogSoftmax, None, true)?;

    assert_eq!(report.pairs.len(), pairs.len());
    assert_eq!(report.hyper_num, 1);
    assert_eq!(report.oov_num, 0);

    let tiger = &report.pairs["tiger animal True hyper"];
    assert_eq!(tiger.patterns.len(), patterns.len());
    for scores in tiger.patterns.values() {
        // one score per subword, log-probs are non-positive
        assert!(!scores.0.is_empty());
        assert!(!scores.1.is_empty());
        assert!(scores.0.iter().chain(scores.1.iter()).all(|&s| s <= 0.0));
    }
    Ok(())
}

#[test]
fn score_lists_match_subword_counts() -> anyhow::Result<()> {
    let pipeline = ClozePipelineBuilder::bert(MODEL).build()?;
    let patterns = vec![Pattern::new("{} is a type of {}")?];
    let pairs = vec![EvalPair {
        hyponym: "steamboat".into(),
        hypernym: "vehicle".into(),
        is_hyper: true,
        relation: "hyper".into(),
    }];

    let report = pipeline.score_dataset(&patterns, &pairs, ScoreMode::BertScore, None, true)?;
    let scores = &report.pairs["steamboat vehicle True hyper"].patterns["{} is a type of {}"];
    // the tokenizer decides the exact split, but counts must line up
    assert!(scores.0.len() >= 1 && scores.1.len() >= 1);
    Ok(())
}

#[test]
fn multi_mask_mode_runs() -> anyhow::Result<()> {
    let pipeline = ClozePipelineBuilder::bert(MODEL).build()?;
    let patterns = vec![Pattern::new("{} is a {}")?];
    let report =
        pipeline.score_dataset(&patterns, &sample_pairs(), ScoreMode::BertScoreMulti, None, true)?;
    assert_eq!(report.pairs.len(), 2);
    Ok(())
}

#[test]
fn top_k_predictions_are_ranked() -> anyhow::Result<()> {
    let pipeline = ClozePipelineBuilder::bert(MODEL).build()?;
    let predictions = pipeline.top_k_predictions("The capital of France is [MASK].", 5)?;
    assert!(!predictions.is_empty());
    assert!(predictions.len() <= 5);
    for pair in predictions.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    Ok(())
}

#[test]
fn top_k_without_mask_errors() -> anyhow::Result<()> {
    let pipeline = ClozePipelineBuilder::bert(MODEL).build()?;
    assert!(pipeline.top_k_predictions("No mask here.", 3).is_err());
    Ok(())
}
