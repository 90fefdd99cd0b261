use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};
use tracing::info;

use cloze_probe::cloze::{ClozePipelineBuilder, ScoreMode};
use cloze_probe::dataset::{load_eval_file, load_vocab_file};
use cloze_probe::error::{ProbeError, Result};
use cloze_probe::models::BertModelId;
use cloze_probe::patterns::{builtin_patterns, PatternLanguage};
use cloze_probe::report::ReportWriter;

/// Probe a BERT masked-LM with Hearst-style patterns over hypernymy datasets.
#[derive(Parser, Debug)]
#[command(name = "cloze-probe", version)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["logsoftmax", "bert_score", "bert_score_multi", "zscore", "zscore_exp"])
))]
struct Cli {
    /// Hugging Face Hub id of a BERT masked-LM checkpoint
    #[arg(short, long, value_name = "REPO_ID")]
    model_id: String,

    /// Directory of tab-separated eval datasets
    #[arg(short = 'e', long, value_name = "DIR")]
    datasets: PathBuf,

    /// Output directory for JSON reports and info.tsv
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Reference vocabulary file (`word count` per line)
    #[arg(short, long, value_name = "FILE")]
    vocab: Option<PathBuf>,

    /// Skip pairs absent from the reference vocabulary
    #[arg(long, requires = "vocab")]
    skip_oov: bool,

    /// Language of the built-in pattern set
    #[arg(long, value_enum, default_value = "pt")]
    language: Language,

    /// Per-subword masking with log-softmax scores
    #[arg(short, long)]
    logsoftmax: bool,

    /// Per-subword masking around the bare pattern, raw logits
    #[arg(short, long)]
    bert_score: bool,

    /// Whole-word multi-mask scoring, raw logits
    #[arg(long)]
    bert_score_multi: bool,

    /// Raw-logit scores with z normalization sums
    #[arg(short, long)]
    zscore: bool,

    /// Exponentiated scores with z normalization sums
    #[arg(short = 'x', long)]
    zscore_exp: bool,

    /// Also write a subword-length histogram per dataset
    #[arg(long)]
    subtoken_stats: bool,

    /// Run on a CUDA GPU by index instead of CPU
    #[arg(long, value_name = "INDEX")]
    cuda: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Language {
    Pt,
    En,
}

impl Cli {
    fn mode(&self) -> ScoreMode {
        if self.logsoftmax {
            ScoreMode::LogSoftmax
        } else if self.bert_score {
            ScoreMode::BertScore
        } else if self.bert_score_multi {
            ScoreMode::BertScoreMulti
        } else if self.zscore {
            ScoreMode::ZScore
        } else {
            ScoreMode::ZScoreExp
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloze_probe=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mode = cli.mode();
    let model_id = BertModelId::new(cli.model_id.as_str());

    info!(model = %model_id, ?mode, "loading model");
    let mut builder = ClozePipelineBuilder::bert(cli.model_id.as_str());
    if let Some(index) = cli.cuda {
        builder = builder.cuda(index);
    }
    let pipeline = builder.build()?;

    let patterns = builtin_patterns(match cli.language {
        Language::Pt => PatternLanguage::Portuguese,
        Language::En => PatternLanguage::English,
    });

    let vocab = cli.vocab.as_deref().map(load_vocab_file).transpose()?;
    let writer = ReportWriter::new(&cli.output, &model_id)?;

    let mut entries: Vec<PathBuf> = std::fs::read_dir(&cli.datasets)
        .map_err(|e| {
            ProbeError::InvalidInput(format!(
                "Cannot read dataset directory {}: {e}",
                cli.datasets.display()
            ))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Err(ProbeError::InvalidInput(format!(
            "No dataset files in {}",
            cli.datasets.display()
        )));
    }

    for path in entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();
        info!(dataset = %name, "loading dataset");
        let pairs = load_eval_file(&path)?;

        let report =
            pipeline.score_dataset(&patterns, &pairs, mode, vocab.as_ref(), !cli.skip_oov)?;
        info!(
            dataset = %name,
            scored = report.pairs.len(),
            oov = report.oov_num,
            hyper = report.hyper_num,
            forwards = report.stats.forward_passes,
            elapsed_ms = report.stats.total_time.as_millis() as u64,
            "dataset scored"
        );

        let json_path = writer.write_dataset(&name, &report)?;
        writer.append_info(&name, &report, !cli.skip_oov)?;
        info!(path = %json_path.display(), "report written");

        if cli.subtoken_stats {
            let histogram = pipeline.subword_length_histogram(&pairs)?;
            writer.append_subtoken_histogram(&name, &histogram)?;
        }
    }

    info!("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mode_flags_are_mutually_exclusive() {
        let err = Cli::try_parse_from([
            "cloze-probe",
            "-m",
            "bert-base-uncased",
            "-e",
            "data",
            "-o",
            "out",
            "--logsoftmax",
            "--zscore",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn mode_flag_is_required() {
        let err = Cli::try_parse_from([
            "cloze-probe",
            "-m",
            "bert-base-uncased",
            "-e",
            "data",
            "-o",
            "out",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn parses_each_mode() {
        let base = ["cloze-probe", "-m", "m", "-e", "d", "-o", "o"];
        let with = |flag: &str| {
            let mut args: Vec<&str> = base.to_vec();
            args.push(flag);
            Cli::try_parse_from(args).unwrap().mode()
        };
        assert_eq!(with("--logsoftmax"), ScoreMode::LogSoftmax);
        assert_eq!(with("--bert-score"), ScoreMode::BertScore);
        assert_eq!(with("--bert-score-multi"), ScoreMode::BertScoreMulti);
        assert_eq!(with("--zscore"), ScoreMode::ZScore);
        assert_eq!(with("--zscore-exp"), ScoreMode::ZScoreExp);
    }

    #[test]
    fn skip_oov_requires_vocab() {
        let err = Cli::try_parse_from([
            "cloze-probe",
            "-m",
            "m",
            "-e",
            "d",
            "-o",
            "o",
            "--logsoftmax",
            "--skip-oov",
        ]);
        assert!(err.is_err());
    }
}
