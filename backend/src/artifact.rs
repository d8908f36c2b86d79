//! Artifact loading.
//!
//! The artifact is a JSON bundle holding the fitted imputers, the encoder,
//! the scaler and the classifier. It is read once at startup; anything wrong
//! with it is an [`ArtifactError`] and the service does not start.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, ModelSpec};
use crate::error::ArtifactError;
use crate::preprocessing::{HandleUnknown, OneHotEncoder, Preprocessor};
use crate::schema::{columns_of_kind, descriptor, FieldKind};

/// On-disk layout of the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    #[serde(flatten)]
    pub preprocessor: Preprocessor,
    pub best_model: ModelSpec,
}

pub struct LoadedArtifact {
    pub path: PathBuf,
    pub preprocessor: Preprocessor,
    pub classifier: Classifier,
}

impl LoadedArtifact {
    pub fn width(&self) -> usize {
        self.preprocessor.width()
    }
}

pub fn load_artifact<P: AsRef<Path>>(path: P) -> Result<LoadedArtifact, ArtifactError> {
    let path = path.as_ref().to_path_buf();
    let raw = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;
    let bundle: ArtifactBundle =
        serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
            path: path.clone(),
            source,
        })?;
    debug!("decoded artifact {} ({} bytes)", path.display(), raw.len());

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let artifact = from_bundle(bundle, base_dir, path.clone())?;
    info!(
        "artifact loaded from {}: {} features, classifier {}",
        path.display(),
        artifact.width(),
        artifact.classifier.kind()
    );
    Ok(artifact)
}

/// Validates a decoded bundle and builds the classifier. `base_dir` anchors
/// relative model paths.
pub fn from_bundle(
    bundle: ArtifactBundle,
    base_dir: &Path,
    path: PathBuf,
) -> Result<LoadedArtifact, ArtifactError> {
    let ArtifactBundle {
        preprocessor,
        best_model,
    } = bundle;

    preprocessor.validate()?;
    check_columns(
        "categorical",
        preprocessor.categorical_columns(),
        FieldKind::Categorical,
    )?;
    check_columns(
        "numerical",
        preprocessor.numerical_columns(),
        FieldKind::Numeric,
    )?;
    check_vocabulary(&preprocessor.encoder)?;

    let classifier = Classifier::from_spec(best_model, base_dir, preprocessor.width())?;
    Ok(LoadedArtifact {
        path,
        preprocessor,
        classifier,
    })
}

fn check_columns(what: &str, fitted: &[String], kind: FieldKind) -> Result<(), ArtifactError> {
    let fitted: BTreeSet<&str> = fitted.iter().map(String::as_str).collect();
    let expected: BTreeSet<&str> = columns_of_kind(kind).collect();
    if fitted == expected {
        return Ok(());
    }
    let missing: Vec<_> = expected.difference(&fitted).collect();
    let unexpected: Vec<_> = fitted.difference(&expected).collect();
    Err(ArtifactError::Schema(format!(
        "{what} columns disagree with the form: missing {missing:?}, unexpected {unexpected:?}"
    )))
}

/// Under the `error` policy every dropdown choice must be a fitted category,
/// otherwise a form submission would be rejected at request time.
fn check_vocabulary(encoder: &OneHotEncoder) -> Result<(), ArtifactError> {
    if encoder.handle_unknown == HandleUnknown::Ignore {
        return Ok(());
    }
    for (column, cats) in encoder.columns.iter().zip(&encoder.categories) {
        let Some(field) = descriptor(column) else {
            continue;
        };
        let unseen: Vec<&str> = field
            .choices
            .iter()
            .copied()
            .filter(|choice| !cats.iter().any(|c| c == choice))
            .collect();
        if !unseen.is_empty() {
            return Err(ArtifactError::Schema(format!(
                "encoder for `{column}` was not fitted on form choices {unseen:?}"
            )));
        }
    }
    Ok(())
}
