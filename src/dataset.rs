//! Evaluation datasets and reference vocabularies.
//!
//! Eval files are tab-separated with four columns per line:
//! `hyponym<TAB>hypernym<TAB>True|False<TAB>relation`.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{ProbeError, Result};

/// One labeled word pair from an eval file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalPair {
    pub hyponym: String,
    pub hypernym: String,
    /// Whether the pair is labeled as a true hypernymy pair.
    pub is_hyper: bool,
    /// Relation label, e.g. `hyper`, `random`, `mero`.
    pub relation: String,
}

impl EvalPair {
    /// Report key for this pair, preserving the original column text.
    pub fn key(&self) -> String {
        format!(
            "{} {} {} {}",
            self.hyponym,
            self.hypernym,
            if self.is_hyper { "True" } else { "False" },
            self.relation
        )
    }
}

fn parse_line(line: &str, path: &Path, lineno: usize) -> Result<EvalPair> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(ProbeError::InvalidInput(format!(
            "{}:{}: expected 4 tab-separated fields, got {}",
            path.display(),
            lineno,
            fields.len()
        )));
    }
    let is_hyper = match fields[2] {
        "True" => true,
        "False" => false,
        other => {
            return Err(ProbeError::InvalidInput(format!(
                "{}:{}: expected True/False label, got '{}'",
                path.display(),
                lineno,
                other
            )))
        }
    };
    Ok(EvalPair {
        hyponym: fields[0].to_string(),
        hypernym: fields[1].to_string(),
        is_hyper,
        relation: fields[3].to_string(),
    })
}

/// Load an eval file, erroring on the first malformed line.
///
/// Blank lines are skipped.
pub fn load_eval_file(path: &Path) -> Result<Vec<EvalPair>> {
    let file = File::open(path).map_err(|e| {
        ProbeError::InvalidInput(format!("Cannot open dataset {}: {e}", path.display()))
    })?;
    let mut pairs = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        pairs.push(parse_line(&line, path, i + 1)?);
    }
    Ok(pairs)
}

/// Load a reference vocabulary file with `word count` per line.
///
/// Only the word is kept; the count column is ignored.
pub fn load_vocab_file(path: &Path) -> Result<HashSet<String>> {
    let file = File::open(path).map_err(|e| {
        ProbeError::InvalidInput(format!("Cannot open vocab {}: {e}", path.display()))
    })?;
    let mut vocab = HashSet::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let word = line.split_whitespace().next().ok_or_else(|| {
            ProbeError::InvalidInput(format!("{}:{}: empty vocab line", path.display(), i + 1))
        })?;
        vocab.insert(word.to_string());
    }
    Ok(vocab)
}
