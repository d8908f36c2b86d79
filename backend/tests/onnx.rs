mod common;

use std::fs;
use std::path::{Path, PathBuf};

use deposit_backend::artifact::load_artifact;
use deposit_backend::classifier::ModelSpec;
use deposit_backend::error::ArtifactError;
use deposit_backend::inference::DepositPredictor;
use deposit_backend::models::Label;
use tempfile::TempDir;

use common::{bundle, scenario_record, write_bundle};

/// Both fixture graphs compute `10 * x[51] - 5` over a 1x62 row; column 51 is
/// `poutcome_success` in the fixture bundle. `logit.onnx` returns that float,
/// `label.onnx` returns `cast<int64>(logit > 0)`.
const HOT_COLUMN: usize = 51;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Writes the fixture bundle with an `onnx` classifier pointing at `relative`,
/// and copies `graph` to that location next to the bundle.
fn onnx_bundle(dir: &TempDir, graph: &str, relative: &str) -> PathBuf {
    let target = dir.path().join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::copy(fixture(graph), &target).unwrap();

    let mut b = bundle();
    b.best_model = ModelSpec::Onnx {
        path: PathBuf::from(relative),
    };
    write_bundle(dir, &b)
}

#[test]
fn fixture_graphs_read_the_previous_outcome_column() {
    let names = bundle().preprocessor.feature_names_out();
    assert_eq!(names.len(), 62);
    assert_eq!(names[HOT_COLUMN], "poutcome_success");
}

#[test]
fn bundle_kind_onnx_is_parsed_from_json() {
    let spec: ModelSpec = serde_json::from_str(r#"{"kind": "onnx", "path": "label.onnx"}"#).unwrap();
    match spec {
        ModelSpec::Onnx { path } => assert_eq!(path, PathBuf::from("label.onnx")),
        other => panic!("unexpected spec {other:?}"),
    }
}

#[test]
fn int64_output_is_taken_as_the_label() {
    let dir = TempDir::new().unwrap();
    let path = onnx_bundle(&dir, "label.onnx", "models/label.onnx");
    let predictor = DepositPredictor::load(&path).unwrap();
    assert_eq!(predictor.model_info().classifier, "onnx");

    let miss = predictor.predict(&scenario_record()).unwrap();
    assert_eq!(miss.class, 0);
    assert_eq!(miss.label, Label::NotSubscribed);

    let hit = predictor
        .predict(&scenario_record().with("poutcome", "success"))
        .unwrap();
    assert_eq!(hit.class, 1);
    assert_eq!(hit.label, Label::Subscribed);
}

#[test]
fn float_output_is_thresholded_as_a_logit() {
    let dir = TempDir::new().unwrap();
    let path = onnx_bundle(&dir, "logit.onnx", "logit.onnx");
    let predictor = DepositPredictor::load(&path).unwrap();

    let miss = predictor.predict(&scenario_record()).unwrap();
    assert_eq!(miss.label, Label::NotSubscribed);

    let hit = predictor
        .predict(&scenario_record().with("poutcome", "success"))
        .unwrap();
    assert_eq!(hit.label, Label::Subscribed);

    let stats = predictor.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.failures, 0);
}

#[test]
fn relative_model_path_resolves_against_the_bundle() {
    let dir = TempDir::new().unwrap();
    let path = onnx_bundle(&dir, "logit.onnx", "models/logit.onnx");
    let artifact = load_artifact(&path).unwrap();
    assert_eq!(artifact.classifier.kind(), "onnx");

    // same bundle, graph no longer beside it
    fs::remove_file(dir.path().join("models/logit.onnx")).unwrap();
    match load_artifact(&path).err().unwrap() {
        ArtifactError::Onnx { path, .. } => {
            assert_eq!(path, dir.path().join("models/logit.onnx"))
        }
        other => panic!("expected an onnx load error, got {other:?}"),
    }
}

#[test]
fn absolute_model_path_is_used_as_is() {
    let dir = TempDir::new().unwrap();
    let mut b = bundle();
    b.best_model = ModelSpec::Onnx {
        path: fixture("label.onnx"),
    };
    let path = write_bundle(&dir, &b);
    let predictor = DepositPredictor::load(&path).unwrap();
    let hit = predictor
        .predict(&scenario_record().with("poutcome", "success"))
        .unwrap();
    assert_eq!(hit.label, Label::Subscribed);
}
