use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::debug;
use serde::Serialize;

use crate::artifact::{load_artifact, LoadedArtifact};
use crate::error::{ArtifactError, PredictionError};
use crate::models::{Label, PredictionResult};
use crate::schema::CustomerRecord;

/// Read-only after load; shared between workers behind an `Arc`.
pub struct DepositPredictor {
    artifact: LoadedArtifact,
    stats: PredictionStats,
}

#[derive(Default)]
struct PredictionStats {
    total: AtomicU64,
    failures: AtomicU64,
    by_label: DashMap<Label, u64>,
}

#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub failures: u64,
    pub by_label: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub artifact_path: String,
    pub classifier: &'static str,
    pub input_width: usize,
    pub categorical_columns: Vec<String>,
    pub numerical_columns: Vec<String>,
    pub feature_names: Vec<String>,
}

impl DepositPredictor {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        load_artifact(path).map(Self::new)
    }

    pub fn new(artifact: LoadedArtifact) -> Self {
        Self {
            artifact,
            stats: PredictionStats::default(),
        }
    }

    /// Preprocess, classify, format. Fails instead of guessing a label.
    pub fn predict(&self, record: &CustomerRecord) -> Result<PredictionResult, PredictionError> {
        self.stats.total.fetch_add(1, Ordering::Relaxed);
        match self.classify(record) {
            Ok(class) => {
                let result = PredictionResult::new(class);
                *self.stats.by_label.entry(result.label).or_insert(0) += 1;
                debug!("class {} -> {}", class, result.label);
                Ok(result)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// All-or-nothing: the first failing record fails the batch.
    pub fn batch_predict(
        &self,
        records: &[CustomerRecord],
    ) -> Result<Vec<PredictionResult>, PredictionError> {
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                self.predict(record).map_err(|e| match e {
                    PredictionError::DataContract(msg) => {
                        PredictionError::DataContract(format!("record {}: {}", i + 1, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }

    fn classify(&self, record: &CustomerRecord) -> Result<i64, PredictionError> {
        let row = self.artifact.preprocessor.transform(record)?;
        self.artifact.classifier.predict(row.view())
    }

    pub fn model_info(&self) -> ModelInfo {
        let pre = &self.artifact.preprocessor;
        ModelInfo {
            artifact_path: self.artifact.path.display().to_string(),
            classifier: self.artifact.classifier.kind(),
            input_width: pre.width(),
            categorical_columns: pre.categorical_columns().to_vec(),
            numerical_columns: pre.numerical_columns().to_vec(),
            feature_names: pre.feature_names_out(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.stats.total.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            by_label: self
                .stats
                .by_label
                .iter()
                .map(|entry| (entry.key().to_string(), *entry.value()))
                .collect(),
        }
    }
}
