//! Fitted preprocessing transforms loaded from the artifact.
//!
//! Every transform carries the column list it was fitted on and reads the
//! record by those names, in that order. The output row is the one-hot block
//! followed by the scaled numeric block, which is the layout the classifier
//! was trained against.

use std::collections::HashSet;

use ndarray::{concatenate, Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, PredictionError};
use crate::schema::{CustomerRecord, FieldValue};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalImputer {
    #[serde(default = "most_frequent")]
    pub strategy: String,
    pub columns: Vec<String>,
    pub fill_values: Vec<String>,
}

fn most_frequent() -> String {
    "most_frequent".to_string()
}

impl CategoricalImputer {
    pub fn transform(&self, record: &CustomerRecord) -> Result<Vec<String>, PredictionError> {
        self.columns
            .iter()
            .zip(&self.fill_values)
            .map(|(column, fill)| match cell(record, column)? {
                FieldValue::Text(s) => Ok(s.clone()),
                v if v.is_missing() => Ok(fill.clone()),
                other => Err(PredictionError::data_contract(format!(
                    "column `{column}` is categorical, got {other}"
                ))),
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        same_len("categorical_imputer.fill_values", &self.columns, self.fill_values.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalImputer {
    #[serde(default = "mean")]
    pub strategy: String,
    pub columns: Vec<String>,
    pub fill_values: Vec<f64>,
}

fn mean() -> String {
    "mean".to_string()
}

impl NumericalImputer {
    pub fn transform(&self, record: &CustomerRecord) -> Result<Array1<f64>, PredictionError> {
        self.columns
            .iter()
            .zip(&self.fill_values)
            .map(|(column, fill)| match cell(record, column)? {
                v if v.is_missing() => Ok(*fill),
                FieldValue::Number(n) => Ok(*n),
                other => Err(PredictionError::data_contract(format!(
                    "column `{column}` is numeric, got {other}"
                ))),
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        same_len("numerical_imputer.fill_values", &self.columns, self.fill_values.len())?;
        if self.fill_values.iter().any(|v| !v.is_finite()) {
            return Err(ArtifactError::Schema(
                "numerical_imputer.fill_values must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

/// One-hot encoder. Output width is the total size of all vocabularies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn feature_names_out(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |c| format!("{column}_{c}")))
            .collect()
    }

    /// `values` must be aligned with `columns`.
    pub fn transform(&self, values: &[String]) -> Result<Array1<f64>, PredictionError> {
        if values.len() != self.columns.len() {
            return Err(PredictionError::data_contract(format!(
                "encoder expects {} categorical values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        let mut out = Array1::zeros(self.width());
        let mut offset = 0;
        for ((column, cats), value) in self.columns.iter().zip(&self.categories).zip(values) {
            match cats.iter().position(|c| c == value) {
                Some(idx) => out[offset + idx] = 1.0,
                None if self.handle_unknown == HandleUnknown::Ignore => {}
                None => {
                    return Err(PredictionError::data_contract(format!(
                        "unknown category {value:?} for column `{column}`"
                    )))
                }
            }
            offset += cats.len();
        }
        Ok(out)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        same_len("encoder.categories", &self.columns, self.categories.len())?;
        for (column, cats) in self.columns.iter().zip(&self.categories) {
            if cats.is_empty() {
                return Err(ArtifactError::Schema(format!(
                    "encoder has no categories for `{column}`"
                )));
            }
            let unique: HashSet<&String> = cats.iter().collect();
            if unique.len() != cats.len() {
                return Err(ArtifactError::Schema(format!(
                    "encoder has duplicate categories for `{column}`"
                )));
            }
        }
        Ok(())
    }
}

/// Standard scaler: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, values: ArrayView1<f64>) -> Result<Array1<f64>, PredictionError> {
        if values.len() != self.columns.len() {
            return Err(PredictionError::data_contract(format!(
                "scaler expects {} numeric values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        let mean = ArrayView1::from(&self.mean[..]);
        let scale = ArrayView1::from(&self.scale[..]);
        Ok((&values - &mean) / &scale)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        same_len("scaler.mean", &self.columns, self.mean.len())?;
        same_len("scaler.scale", &self.columns, self.scale.len())?;
        if let Some(col) = self
            .columns
            .iter()
            .zip(&self.scale)
            .find(|(_, s)| !s.is_finite() || **s == 0.0)
            .map(|(c, _)| c)
        {
            return Err(ArtifactError::Schema(format!(
                "scaler has a zero or non-finite scale for `{col}`"
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ArtifactError::Schema("scaler.mean must be finite".into()));
        }
        Ok(())
    }
}

/// The four fitted transforms of the bundle, applied as one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    pub categorical_imputer: CategoricalImputer,
    pub numerical_imputer: NumericalImputer,
    pub encoder: OneHotEncoder,
    pub scaler: StandardScaler,
}

impl Preprocessor {
    pub fn categorical_columns(&self) -> &[String] {
        &self.encoder.columns
    }

    pub fn numerical_columns(&self) -> &[String] {
        &self.scaler.columns
    }

    pub fn width(&self) -> usize {
        self.encoder.width() + self.scaler.columns.len()
    }

    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names = self.encoder.feature_names_out();
        names.extend(self.scaler.columns.iter().cloned());
        names
    }

    pub fn transform(&self, record: &CustomerRecord) -> Result<Array1<f64>, PredictionError> {
        if let Some(extra) = record
            .columns()
            .find(|c| !self.categorical_columns().iter().chain(self.numerical_columns()).any(|k| k == c))
        {
            return Err(PredictionError::data_contract(format!(
                "column `{extra}` is not part of the training schema"
            )));
        }

        let categorical = self.categorical_imputer.transform(record)?;
        let encoded = self.encoder.transform(&categorical)?;

        let numerical = self.numerical_imputer.transform(record)?;
        let scaled = self.scaler.transform(numerical.view())?;

        concatenate(Axis(0), &[encoded.view(), scaled.view()])
            .map_err(|e| PredictionError::data_contract(format!("cannot assemble row: {e}")))
    }

    /// Internal consistency of the fitted transforms. Schema agreement with
    /// the form is checked by the artifact loader.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.categorical_imputer.validate()?;
        self.numerical_imputer.validate()?;
        self.encoder.validate()?;
        self.scaler.validate()?;

        if self.categorical_imputer.columns != self.encoder.columns {
            return Err(ArtifactError::Schema(format!(
                "categorical imputer columns {:?} differ from encoder columns {:?}",
                self.categorical_imputer.columns, self.encoder.columns
            )));
        }
        if self.numerical_imputer.columns != self.scaler.columns {
            return Err(ArtifactError::Schema(format!(
                "numerical imputer columns {:?} differ from scaler columns {:?}",
                self.numerical_imputer.columns, self.scaler.columns
            )));
        }
        if let Some(dup) = self
            .encoder
            .columns
            .iter()
            .find(|c| self.scaler.columns.contains(c))
        {
            return Err(ArtifactError::Schema(format!(
                "column `{dup}` is both categorical and numerical"
            )));
        }
        Ok(())
    }
}

fn cell<'a>(record: &'a CustomerRecord, column: &str) -> Result<&'a FieldValue, PredictionError> {
    record
        .get(column)
        .ok_or_else(|| PredictionError::data_contract(format!("missing column `{column}`")))
}

fn same_len(what: &str, columns: &[String], len: usize) -> Result<(), ArtifactError> {
    if columns.len() == len {
        Ok(())
    } else {
        Err(ArtifactError::Schema(format!(
            "{what} has {len} entries for {} columns",
            columns.len()
        )))
    }
}
