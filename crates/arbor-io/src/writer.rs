//! Result writer for rules, predictions, and evaluation artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_cart::{FeatureImportance, Metrics, Prediction, ProbabilityVector, RocCurve, Tree, TreeStats};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes tree outputs into one directory under one experiment name.
///
/// Creates the output directory on construction if it does not exist.
/// Files are named `{experiment}_rules.txt`, `{experiment}_predictions.csv`,
/// `{experiment}_evaluate.json`, and `{experiment}_model.bin`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

/// Everything the evaluation artifact reports about a trained tree.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport<'a> {
    /// Shape of the tree.
    pub stats: &'a TreeStats,
    /// Metrics on held-out data.
    pub test: &'a Metrics,
    /// Metrics on the training data, for the overfitting gap.
    pub train: Option<&'a Metrics>,
    /// ROC curve of the positive class, binary problems only.
    pub roc: Option<&'a RocCurve>,
    /// Ranked feature importances.
    pub importances: &'a [FeatureImportance],
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    /// Write the tree's decision rules to `{experiment}_rules.txt`.
    ///
    /// A short header gives the tree shape and class list; then one rule per
    /// line, in depth-first order, with leaf confidence and sample count.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_rules(&self, tree: &Tree) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("rules.txt");
        let text = render_rules(tree);
        fs::write(&path, text).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), n_rules = tree.n_leaves(), "rules written");
        Ok(path)
    }

    /// Write per-sample predictions to `{experiment}_predictions.csv`.
    ///
    /// Columns are `actual,predicted,confidence,prob_<class>...` with numbers
    /// rounded to 3 decimals. `actual` is left empty when `actual` is `None`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`IoError::PredictionLengthMismatch`] | the three inputs differ in length |
    /// | [`IoError::WriteCsv`] | the file cannot be written |
    #[instrument(skip_all, fields(n = predictions.len()))]
    pub fn write_predictions(
        &self,
        classes: &[String],
        actual: Option<&[String]>,
        predictions: &[Prediction],
        probabilities: &[ProbabilityVector],
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("predictions.csv");
        let n_actual = actual.map(<[String]>::len);
        if probabilities.len() != predictions.len() || n_actual.is_some_and(|n| n != predictions.len()) {
            return Err(IoError::PredictionLengthMismatch {
                path,
                n_predictions: predictions.len(),
                n_probabilities: probabilities.len(),
                n_actual,
            });
        }
        let csv_err = |e: csv::Error| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;

        let mut header = vec!["actual".to_string(), "predicted".into(), "confidence".into()];
        header.extend(classes.iter().map(|c| format!("prob_{c}")));
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, (prediction, proba)) in predictions.iter().zip(probabilities).enumerate() {
            let mut record = vec![
                actual.map(|a| a[i].clone()).unwrap_or_default(),
                classes[prediction.class()].clone(),
                format!("{:.3}", prediction.confidence()),
            ];
            record.extend(proba.as_slice().iter().map(|p| format!("{p:.3}")));
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write evaluation results to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// [`IoError::EncodeJson`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_evaluation(&self, report: &EvaluationReport<'_>) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("evaluate.json");

        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            tree: report.stats,
            test: report.test,
            train: report.train,
            accuracy_gap: report.train.map(|t| t.accuracy - report.test.accuracy),
            roc: report.roc,
            feature_importances: report.importances,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::EncodeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_path("model.bin")
    }
}

/// Plain-text rule listing used by [`ResultWriter::write_rules`].
#[must_use]
pub fn render_rules(tree: &Tree) -> String {
    let stats = tree.stats();
    let mut out = format!(
        "# Decision rules: {} leaves, {} nodes, depth {}\n# Classes: {}\n\n",
        stats.n_leaves,
        stats.n_nodes,
        stats.depth,
        stats.classes.join(", ")
    );
    for (i, rule) in tree.rules().iter().enumerate() {
        out.push_str(&format!(
            "Rule {}: {} (confidence {:.1}%, n = {})\n",
            i + 1,
            rule,
            rule.confidence * 100.0,
            rule.n_samples
        ));
    }
    out
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    tree: &'a TreeStats,
    test: &'a Metrics,
    train: Option<&'a Metrics>,
    accuracy_gap: Option<f64>,
    roc: Option<&'a RocCurve>,
    feature_importances: &'a [FeatureImportance],
}
