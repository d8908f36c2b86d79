use std::path::{Path, PathBuf};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

use crate::error::{ArtifactError, PredictionError};

fn default_threshold() -> f64 {
    0.5
}

/// Classifier entry of the artifact bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LogisticRegression),
    /// ONNX graph on disk; relative paths resolve against the artifact file.
    Onnx { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticRegression {
    pub fn predict(&self, row: ArrayView1<f64>) -> Result<i64, PredictionError> {
        if row.len() != self.coefficients.len() {
            return Err(PredictionError::data_contract(format!(
                "classifier expects {} features, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }
        let z = ArrayView1::from(&self.coefficients[..]).dot(&row) + self.intercept;
        let p = 1.0 / (1.0 + (-z).exp());
        Ok(if p >= self.threshold { 1 } else { 0 })
    }
}

pub struct OnnxClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    width: usize,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P, width: usize) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)))?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model, width })
    }

    /// Label outputs (int64) are used as-is; a float output is read as a logit.
    pub fn predict(&self, row: ArrayView1<f64>) -> TractResult<i64> {
        let features: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let input = Tensor::from_shape(&[1, self.width], &features)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let first = outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("model produced no outputs"))?;

        if first.datum_type() == i64::datum_type() {
            let label = *first
                .to_array_view::<i64>()?
                .iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("empty label output"))?;
            return Ok(label);
        }

        let logit: f32 = *first
            .to_array_view::<f32>()?
            .iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty score output"))?;
        let p = 1.0 / (1.0 + (-logit).exp());
        Ok(if p >= 0.5 { 1 } else { 0 })
    }
}

/// The loaded, immutable model.
pub enum Classifier {
    Logistic(LogisticRegression),
    Onnx(OnnxClassifier),
}

impl Classifier {
    /// `width` is the preprocessed row width; the model must accept exactly that.
    pub fn from_spec(spec: ModelSpec, base_dir: &Path, width: usize) -> Result<Self, ArtifactError> {
        match spec {
            ModelSpec::LogisticRegression(model) => {
                if model.coefficients.len() != width {
                    return Err(ArtifactError::Schema(format!(
                        "classifier has {} coefficients but preprocessing yields {} features",
                        model.coefficients.len(),
                        width
                    )));
                }
                if !model.intercept.is_finite()
                    || model.coefficients.iter().any(|c| !c.is_finite())
                {
                    return Err(ArtifactError::Schema(
                        "classifier weights must be finite".into(),
                    ));
                }
                if !(0.0..=1.0).contains(&model.threshold) {
                    return Err(ArtifactError::Schema(format!(
                        "classifier threshold {} outside [0, 1]",
                        model.threshold
                    )));
                }
                Ok(Classifier::Logistic(model))
            }
            ModelSpec::Onnx { path } => {
                let path = if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                };
                OnnxClassifier::load(&path, width)
                    .map(Classifier::Onnx)
                    .map_err(|e| ArtifactError::Onnx {
                        path,
                        message: format!("{e:#}"),
                    })
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Logistic(_) => "logistic_regression",
            Classifier::Onnx(_) => "onnx",
        }
    }

    pub fn predict(&self, row: ArrayView1<f64>) -> Result<i64, PredictionError> {
        match self {
            Classifier::Logistic(model) => model.predict(row),
            Classifier::Onnx(model) => model
                .predict(row)
                .map_err(|e| PredictionError::Model(format!("{e:#}"))),
        }
    }
}
