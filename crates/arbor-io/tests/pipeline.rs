//! End-to-end integration tests: CSV -> tree -> artifacts -> read back.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_cart::{FeatureKind, Tree, TreeConfig, roc_curve};
use arbor_io::{EvaluationReport, ExperimentName, ResultWriter, TableReader};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config() -> TreeConfig {
    TreeConfig::new().with_max_depth(3).with_min_samples_leaf(2)
}

#[test]
fn fixture_types_are_inferred() {
    let table = TableReader::new(&fixture_path("churn.csv"))
        .read()
        .expect("fixture should parse");

    assert_eq!(table.target(), "churned");
    assert_eq!(table.n_samples(), 40);
    let kinds: Vec<(&str, FeatureKind)> = table
        .features()
        .iter()
        .map(|f| (f.name(), f.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("tenure", FeatureKind::Continuous),
            ("plan", FeatureKind::Categorical),
            ("support_calls", FeatureKind::Categorical),
            ("monthly_fee", FeatureKind::Continuous),
        ]
    );
}

#[test]
fn train_evaluate_round_trip() {
    let dataset = TableReader::new(&fixture_path("churn.csv"))
        .read()
        .unwrap()
        .into_dataset()
        .unwrap();
    let (train, test) = dataset.train_test_split(0.75, 42).unwrap();
    let tree = config().fit(&train).unwrap();

    let test_metrics = tree.evaluate(&test, None).unwrap();
    let train_metrics = tree.evaluate(&train, None).unwrap();
    assert!(test_metrics.accuracy > 0.8, "test accuracy {}", test_metrics.accuracy);
    assert_eq!(train_metrics.accuracy, 1.0);

    let positive = tree.schema().class_index("yes").unwrap();
    let probabilities = tree.predict_proba(test.rows()).unwrap();
    let roc = roc_curve(test.labels(), &probabilities, positive).unwrap();
    let stats = tree.stats();
    let importances = tree.feature_importances();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("churn_rt".into()).unwrap()).unwrap();
    let report = EvaluationReport {
        stats: &stats,
        test: &test_metrics,
        train: Some(&train_metrics),
        roc: Some(&roc),
        importances: &importances,
    };
    let json_path = writer.write_evaluation(&report).unwrap();
    assert_eq!(json_path, dir.path().join("churn_rt_evaluate.json"));

    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "churn_rt");
    assert_eq!(content["tree"]["n_leaves"].as_u64().unwrap() as usize, tree.n_leaves());
    assert_eq!(content["test"]["n_samples"].as_u64().unwrap(), 10);
    let gap = content["accuracy_gap"].as_f64().unwrap();
    assert!((gap - (1.0 - test_metrics.accuracy)).abs() < 1e-12);
    assert_eq!(content["feature_importances"][0]["name"], "tenure");
    let fpr = content["roc"]["fpr"].as_array().unwrap();
    assert_eq!(fpr.first().unwrap().as_f64().unwrap(), 0.0);

    let rules_path = writer.write_rules(&tree).unwrap();
    let rules = fs::read_to_string(rules_path).unwrap();
    assert!(rules.contains("IF tenure ≤"));
    assert_eq!(rules.lines().filter(|l| l.starts_with("Rule ")).count(), tree.n_leaves());

    tree.save(writer.model_path()).unwrap();
    let loaded = Tree::load(writer.model_path()).unwrap();
    assert_eq!(loaded, tree);
}

#[test]
fn predict_new_rows_with_saved_schema() {
    let dataset = TableReader::new(&fixture_path("churn.csv"))
        .read()
        .unwrap()
        .into_dataset()
        .unwrap();
    let tree = config().fit(&dataset).unwrap();

    let table = TableReader::new(&fixture_path("new_customers.csv"))
        .with_target("churned")
        .read_for(tree.schema())
        .unwrap();
    assert!(table.labels.is_none());

    let predictions = tree.predict(&table.rows).unwrap();
    let named: Vec<&str> = predictions
        .iter()
        .map(|p| tree.schema().class_name(p.class()).unwrap())
        .collect();
    assert_eq!(named, vec!["yes", "no", "no"]);

    let probabilities = tree.predict_proba(&table.rows).unwrap();
    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("new".into()).unwrap()).unwrap();
    let path = writer
        .write_predictions(tree.schema().classes(), None, &predictions, &probabilities)
        .unwrap();
    let csv = fs::read_to_string(path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("actual,predicted,confidence,prob_no,prob_yes"));
    assert_eq!(lines.next(), Some(",yes,1.000,0.000,1.000"));
    assert_eq!(lines.count(), 2);
}
