//! Flat-file outputs: per-dataset JSON reports and the summary TSV.
//!
//! Layout under the output directory:
//!
//! ```text
//! <output>/<model-id with '/' flattened>/
//!     <dataset>.json      pair -> pattern -> [hypo scores, hyper scores]
//!     info.tsv            one summary line per scored dataset
//!     subtoken.tsv        optional subword-length histogram
//! ```

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ProbeError, Result};
use crate::models::BertModelId;
use crate::pipelines::cloze::DatasetReport;

const INFO_HEADER: &str = "model\tdataset\tN\toov\thyper_num\tinclude_oov\n";
const SUBTOKEN_HEADER: &str = "model\tdataset\tsubtoken\tN\n";

/// Writes all outputs for one model under one output directory.
pub struct ReportWriter {
    model_id: BertModelId,
    model_dir: PathBuf,
}

impl ReportWriter {
    /// Creates the model's output directory if needed.
    pub fn new(output: &Path, model_id: &BertModelId) -> Result<Self> {
        let model_dir = output.join(model_id.as_file_stem());
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            ProbeError::Report(format!(
                "Cannot create output directory {}: {e}",
                model_dir.display()
            ))
        })?;
        Ok(Self {
            model_id: model_id.clone(),
            model_dir,
        })
    }

    /// Serialize a dataset's scores to `<dataset-stem>.json`.
    pub fn write_dataset(&self, dataset_name: &str, report: &DatasetReport) -> Result<PathBuf> {
        let stem = Path::new(dataset_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(dataset_name);
        let path = self.model_dir.join(format!("{stem}.json"));
        let json = serde_json::to_string(&report.pairs)?;
        let mut file = File::create(&path)?;
        file.write_all(json.as_bytes())?;
        Ok(path)
    }

    /// Append one summary line to `info.tsv`, writing the header when the
    /// file is first created.
    pub fn append_info(
        &self,
        dataset_name: &str,
        report: &DatasetReport,
        include_oov: bool,
    ) -> Result<()> {
        let path = self.model_dir.join("info.tsv");
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            file.write_all(INFO_HEADER.as_bytes())?;
        }
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.model_id,
            dataset_name,
            report.pairs.len(),
            report.oov_num,
            report.hyper_num,
            include_oov
        )?;
        Ok(())
    }

    /// Append a dataset's subword-length histogram to `subtoken.tsv`.
    pub fn append_subtoken_histogram(
        &self,
        dataset_name: &str,
        histogram: &BTreeMap<(usize, usize), usize>,
    ) -> Result<()> {
        let path = self.model_dir.join("subtoken.tsv");
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            file.write_all(SUBTOKEN_HEADER.as_bytes())?;
        }
        for (&(hypo, hyper), &count) in histogram {
            writeln!(
                file,
                "{}\t{}\t{},{}\t{}",
                self.model_id, dataset_name, hypo, hyper, count
            )?;
        }
        Ok(())
    }

    /// The directory reports are written into.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::cloze::{PairScores, PatternScores};
    use crate::pipelines::stats::PipelineStats;
    use std::time::Duration;

    fn sample_report() -> DatasetReport {
        let mut scores = PairScores::default();
        scores.patterns.insert(
            "{} is a {}".to_string(),
            PatternScores(vec![-1.5], vec![-2.0, -0.5]),
        );
        let mut pairs = BTreeMap::new();
        pairs.insert("tigre animal True hyper".to_string(), scores);
        DatasetReport {
            pairs,
            hyper_num: 1,
            oov_num: 0,
            stats: PipelineStats {
                total_time: Duration::from_millis(10),
                items_processed: 1,
                forward_passes: 2,
            },
        }
    }

    #[test]
    fn writes_json_named_after_dataset_stem() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), &BertModelId::new("org/model")).unwrap();
        let path = writer
            .write_dataset("ontoPT-test.tsv", &sample_report())
            .unwrap();
        assert!(path.ends_with("org-model/ontoPT-test.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &json["tigre animal True hyper"]["{} is a {}"];
        assert_eq!(entry[0].as_array().unwrap().len(), 1);
        assert_eq!(entry[1].as_array().unwrap().len(), 2);
    }

    #[test]
    fn info_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), &BertModelId::new("m")).unwrap();
        let report = sample_report();
        writer.append_info("a.tsv", &report, true).unwrap();
        writer.append_info("b.tsv", &report, true).unwrap();

        let contents = std::fs::read_to_string(writer.model_dir().join("info.tsv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "model\tdataset\tN\toov\thyper_num\tinclude_oov");
        assert_eq!(lines[1], "m\ta.tsv\t1\t0\t1\ttrue");
    }

    #[test]
    fn subtoken_histogram_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), &BertModelId::new("m")).unwrap();
        let mut histogram = BTreeMap::new();
        histogram.insert((1, 2), 4);
        histogram.insert((2, 2), 1);
        writer
            .append_subtoken_histogram("a.tsv", &histogram)
            .unwrap();

        let contents = std::fs::read_to_string(writer.model_dir().join("subtoken.tsv")).unwrap();
        assert!(contents.contains("m\ta.tsv\t1,2\t4"));
        assert!(contents.contains("m\ta.tsv\t2,2\t1"));
    }
}
