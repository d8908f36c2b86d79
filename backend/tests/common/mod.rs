#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use deposit_backend::artifact::{from_bundle, ArtifactBundle, LoadedArtifact};
use deposit_backend::classifier::{LogisticRegression, ModelSpec};
use deposit_backend::preprocessing::{
    CategoricalImputer, HandleUnknown, NumericalImputer, OneHotEncoder, Preprocessor,
    StandardScaler,
};
use deposit_backend::schema::{CustomerRecord, FieldKind, FORM_FIELDS};
use serde_json::{json, Value};
use tempfile::TempDir;

/// A bundle fitted on the form schema whose classifier only looks at
/// `poutcome_success`: success -> class 1, anything else -> class 0.
pub fn bundle() -> ArtifactBundle {
    let categorical: Vec<_> = FORM_FIELDS
        .iter()
        .filter(|f| f.kind == FieldKind::Categorical)
        .collect();
    let numerical: Vec<_> = FORM_FIELDS
        .iter()
        .filter(|f| f.kind == FieldKind::Numeric)
        .collect();

    let categories: Vec<Vec<String>> = categorical
        .iter()
        .map(|f| {
            let mut cats: Vec<String> = f.choices.iter().map(|c| c.to_string()).collect();
            cats.sort();
            cats
        })
        .collect();

    let encoder = OneHotEncoder {
        columns: categorical.iter().map(|f| f.name.to_string()).collect(),
        categories,
        handle_unknown: HandleUnknown::Error,
    };
    let names = encoder.feature_names_out();
    let width = encoder.width() + numerical.len();
    let mut coefficients = vec![0.0; width];
    let hot = names
        .iter()
        .position(|n| n == "poutcome_success")
        .expect("poutcome_success column");
    coefficients[hot] = 10.0;

    let preprocessor = Preprocessor {
        categorical_imputer: CategoricalImputer {
            strategy: "most_frequent".into(),
            columns: encoder.columns.clone(),
            fill_values: encoder.categories.iter().map(|c| c[0].clone()).collect(),
        },
        numerical_imputer: NumericalImputer {
            strategy: "mean".into(),
            columns: numerical.iter().map(|f| f.name.to_string()).collect(),
            fill_values: vec![0.0; numerical.len()],
        },
        encoder,
        scaler: StandardScaler {
            columns: numerical.iter().map(|f| f.name.to_string()).collect(),
            mean: vec![0.0; numerical.len()],
            scale: vec![1.0; numerical.len()],
        },
    };

    ArtifactBundle {
        preprocessor,
        best_model: ModelSpec::LogisticRegression(LogisticRegression {
            coefficients,
            intercept: -5.0,
            threshold: 0.5,
        }),
    }
}

pub fn loaded(bundle: ArtifactBundle) -> LoadedArtifact {
    from_bundle(bundle, Path::new("."), PathBuf::from("fixture.json")).expect("valid fixture")
}

pub fn write_bundle(dir: &TempDir, bundle: &ArtifactBundle) -> PathBuf {
    let path = dir.path().join("bundle.json");
    fs::write(&path, serde_json::to_vec_pretty(bundle).unwrap()).unwrap();
    path
}

pub fn demo_artifact_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts/deposit_bundle.json")
}

pub fn scenario_values() -> Vec<Value> {
    vec![
        json!(35),
        json!("technician"),
        json!("married"),
        json!("university.degree"),
        json!("no"),
        json!("yes"),
        json!("no"),
        json!("cellular"),
        json!("may"),
        json!("mon"),
        json!(2),
        json!(999),
        json!(0),
        json!("nonexistent"),
        json!(-1.8),
        json!(93.0),
        json!(-36.4),
        json!(4.857),
        json!(5191),
    ]
}

pub fn scenario_record() -> CustomerRecord {
    CustomerRecord::new()
        .with("age", 35.0)
        .with("job", "technician")
        .with("marital", "married")
        .with("education", "university.degree")
        .with("default", "no")
        .with("housing", "yes")
        .with("loan", "no")
        .with("contact", "cellular")
        .with("month", "may")
        .with("day_of_week", "mon")
        .with("campaign", 2.0)
        .with("pdays", 999.0)
        .with("previous", 0.0)
        .with("poutcome", "nonexistent")
        .with("emp.var.rate", -1.8)
        .with("cons.price.idx", 93.0)
        .with("cons.conf.idx", -36.4)
        .with("euribor3m", 4.857)
        .with("nr.employed", 5191.0)
}
