use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use arbor_cart::{Criterion, Metrics, Tree, TreeConfig, UnseenCategoryPolicy, roc_curve};
use arbor_io::{EvaluationReport, ExperimentName, ResultWriter, TableReader, render_rules};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Train, inspect, and apply CART classification trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/test shuffle
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

/// How the CSV columns are interpreted.
#[derive(Args, Debug, Clone)]
struct TableArgs {
    /// Target column name (defaults to the last column)
    #[arg(long)]
    target: Option<String>,

    /// Columns to treat as categorical regardless of inference
    #[arg(long, value_delimiter = ',')]
    categorical: Vec<String>,

    /// Numeric columns to treat as continuous regardless of inference
    #[arg(long, value_delimiter = ',')]
    continuous: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CriterionArg {
    Gini,
    Entropy,
}

impl From<CriterionArg> for Criterion {
    fn from(arg: CriterionArg) -> Self {
        match arg {
            CriterionArg::Gini => Criterion::Gini,
            CriterionArg::Entropy => Criterion::Entropy,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Grow a tree on a training split, evaluate it on the rest, and save it
    Train {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Maximum tree depth
        #[arg(long, default_value_t = 3)]
        max_depth: usize,

        /// Minimum samples in each leaf
        #[arg(long, default_value_t = 10)]
        min_samples_leaf: usize,

        /// Impurity criterion
        #[arg(long, value_enum, default_value_t = CriterionArg::Gini)]
        criterion: CriterionArg,

        /// Fraction of rows used for training
        #[arg(long, default_value_t = 0.7)]
        train_fraction: f64,

        /// Positive class for binary metrics and ROC (defaults to the first class)
        #[arg(long)]
        positive_class: Option<String>,

        /// Fail on categories a split never saw instead of following the larger child
        #[arg(long, default_value_t = false)]
        reject_unseen: bool,
    },

    /// Apply a saved tree to a CSV file
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Target column to score against, if present in the file
        #[arg(long)]
        target: Option<String>,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Print the decision rules of a saved tree
    Rules {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_train: usize,
    n_test: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    train_accuracy: f64,
    test_accuracy: f64,
    auc: Option<f64>,
    model: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_samples: usize,
    accuracy: Option<f64>,
    predictions: PathBuf,
}

fn positive_class(tree: &Tree, name: Option<&str>) -> Result<usize> {
    match name {
        Some(name) => tree
            .schema()
            .class_index(name)
            .with_context(|| format!("positive class \"{name}\" is not one of {:?}", tree.schema().classes())),
        None => Ok(0),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Train {
            data,
            table,
            experiment,
            output_dir,
            max_depth,
            min_samples_leaf,
            criterion,
            train_fraction,
            positive_class: positive_name,
            reject_unseen,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read and validate the table
            let mut reader = TableReader::new(&data)
                .with_categorical(table.categorical)
                .with_continuous(table.continuous);
            if let Some(target) = table.target {
                reader = reader.with_target(target);
            }
            let dataset = reader
                .read()
                .context("failed to read input CSV")?
                .into_dataset()
                .context("input CSV is not a valid dataset")?;
            info!(n_samples = dataset.n_samples(), n_classes = dataset.schema().n_classes(), "dataset loaded");

            // 2. Split and grow
            let (train, test) = dataset
                .train_test_split(train_fraction, cli.seed)
                .context("train/test split failed")?;
            let policy = if reject_unseen {
                UnseenCategoryPolicy::Reject
            } else {
                UnseenCategoryPolicy::MajorityChild
            };
            let config = TreeConfig::new()
                .with_max_depth(max_depth)
                .with_min_samples_leaf(min_samples_leaf)
                .with_criterion(criterion.into())
                .with_unseen_category(policy);
            let tree = config.fit(&train).context("tree training failed")?;
            info!(n_nodes = tree.n_nodes(), depth = tree.depth(), "tree trained");

            // 3. Evaluate
            let positive = positive_class(&tree, positive_name.as_deref())?;
            let test_metrics = tree.evaluate(&test, Some(positive)).context("evaluation failed")?;
            let train_metrics = tree.evaluate(&train, Some(positive)).context("evaluation failed")?;
            let test_predictions = tree.predict(test.rows())?;
            let test_probabilities = tree.predict_proba(test.rows())?;
            let roc = if tree.schema().n_classes() == 2 {
                Some(roc_curve(test.labels(), &test_probabilities, positive)?)
            } else {
                None
            };
            if train_metrics.accuracy - test_metrics.accuracy > 0.1 {
                warn!(
                    train_accuracy = train_metrics.accuracy,
                    test_accuracy = test_metrics.accuracy,
                    "train accuracy exceeds test accuracy by more than 10 points"
                );
            }

            // 4. Save model and artifacts
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            tree.save(writer.model_path()).context("failed to save model")?;
            let stats = tree.stats();
            let importances = tree.feature_importances();
            writer.write_evaluation(&EvaluationReport {
                stats: &stats,
                test: &test_metrics,
                train: Some(&train_metrics),
                roc: roc.as_ref(),
                importances: &importances,
            })?;
            writer.write_rules(&tree)?;
            let actual: Vec<String> = test
                .labels()
                .iter()
                .map(|&l| test.schema().classes()[l].clone())
                .collect();
            writer.write_predictions(
                tree.schema().classes(),
                Some(actual.as_slice()),
                &test_predictions,
                &test_probabilities,
            )?;

            // 5. Print summary
            let output = TrainOutput {
                experiment,
                n_train: train.n_samples(),
                n_test: test.n_samples(),
                n_nodes: stats.n_nodes,
                n_leaves: stats.n_leaves,
                depth: stats.depth,
                train_accuracy: train_metrics.accuracy,
                test_accuracy: test_metrics.accuracy,
                auc: roc.map(|r| r.auc),
                model: writer.model_path(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            target,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let tree = Tree::load(&model).context("failed to load model")?;
            info!(n_nodes = tree.n_nodes(), n_features = tree.schema().n_features(), "model loaded");

            // 2. Read rows in the model's feature order
            let mut reader = TableReader::new(&data);
            if let Some(target) = target {
                reader = reader.with_target(target);
            }
            let table = reader
                .read_for(tree.schema())
                .context("failed to read input CSV")?;

            // 3. Predict, and score when labels are present
            let predictions = tree.predict(&table.rows).context("prediction failed")?;
            let probabilities = tree.predict_proba(&table.rows)?;
            let accuracy = match &table.labels {
                Some(labels) => {
                    let truth = labels
                        .iter()
                        .map(|l| {
                            tree.schema()
                                .class_index(l)
                                .with_context(|| format!("label \"{l}\" is not a class of this model"))
                        })
                        .collect::<Result<Vec<usize>>>()?;
                    let metrics = Metrics::from_predictions(&truth, &predictions, tree.schema().classes(), None)?;
                    Some(metrics.accuracy)
                }
                None => None,
            };

            // 4. Write predictions CSV
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let path = writer.write_predictions(
                tree.schema().classes(),
                table.labels.as_deref(),
                &predictions,
                &probabilities,
            )?;

            // 5. Print summary
            let output = PredictOutput {
                experiment,
                n_samples: predictions.len(),
                accuracy,
                predictions: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Rules { model } => {
            let tree = Tree::load(&model).context("failed to load model")?;
            print!("{}", render_rules(&tree));
        }
    }

    Ok(())
}
