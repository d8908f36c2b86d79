//! Customer record schema and form descriptors.
//!
//! The field list below is the single source of truth for the form, the
//! positional request order and the column names the artifact was fitted on.
//! Multi-word columns use the dot spelling (`emp.var.rate`); the underscore
//! spelling is accepted on named requests and rewritten on the way in.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// One form widget: a bounded number input or a dropdown.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub choices: &'static [&'static str],
    pub label: &'static str,
}

impl FieldDescriptor {
    const fn numeric(name: &'static str, minimum: f64, maximum: f64, label: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric,
            minimum: Some(minimum),
            maximum: Some(maximum),
            choices: &[],
            label,
        }
    }

    const fn categorical(
        name: &'static str,
        choices: &'static [&'static str],
        label: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Categorical,
            minimum: None,
            maximum: None,
            choices,
            label,
        }
    }
}

const YES_NO: &[&str] = &["no", "yes"];

pub static FORM_FIELDS: [FieldDescriptor; 19] = [
    FieldDescriptor::numeric("age", 18.0, 100.0, "age: Enter the age of the customer."),
    FieldDescriptor::categorical(
        "job",
        &[
            "blue-collar",
            "entrepreneur",
            "housemaid",
            "management",
            "retired",
            "self-employed",
            "services",
            "student",
            "technician",
            "unemployed",
            "admin.",
            "unknown",
        ],
        "job: Select the job type of the customer.",
    ),
    FieldDescriptor::categorical(
        "marital",
        &["single", "married", "divorced"],
        "marital: Select the marital status of the customer.",
    ),
    FieldDescriptor::categorical(
        "education",
        &[
            "basic.4y",
            "basic.6y",
            "basic.9y",
            "high.school",
            "illiterate",
            "professional.course",
            "university.degree",
            "unknown",
        ],
        "education: Select the education level of the customer.",
    ),
    FieldDescriptor::categorical(
        "default",
        YES_NO,
        "default: Select if the customer has credit in default.",
    ),
    FieldDescriptor::categorical(
        "housing",
        YES_NO,
        "housing: Select if the customer has housing loan.",
    ),
    FieldDescriptor::categorical(
        "loan",
        YES_NO,
        "loan: Select if the customer has personal loan.",
    ),
    FieldDescriptor::categorical(
        "contact",
        &["cellular", "telephone", "unknown"],
        "contact: Select the communication type used for contact.",
    ),
    FieldDescriptor::categorical(
        "month",
        &[
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ],
        "month: Select the last contact month of the customer.",
    ),
    FieldDescriptor::categorical(
        "day_of_week",
        &["mon", "tue", "wed", "thu", "fri"],
        "day_of_week: Select the last contact day of the week.",
    ),
    FieldDescriptor::numeric(
        "campaign",
        0.0,
        100.0,
        "campaign: Enter the number of contacts performed during the campaign.",
    ),
    FieldDescriptor::numeric(
        "pdays",
        -1.0,
        1000.0,
        "pdays: Enter the number of days since the client was last contacted.",
    ),
    FieldDescriptor::numeric(
        "previous",
        0.0,
        100.0,
        "previous: Enter the number of contacts performed before this campaign.",
    ),
    FieldDescriptor::categorical(
        "poutcome",
        &["failure", "nonexistent", "success", "unknown"],
        "poutcome: Select the outcome of the previous marketing campaign.",
    ),
    FieldDescriptor::numeric(
        "emp.var.rate",
        -3.0,
        3.0,
        "emp.var.rate: Enter the employment variation rate.",
    ),
    FieldDescriptor::numeric(
        "cons.price.idx",
        92.0,
        95.0,
        "cons.price.idx: Enter the consumer price index.",
    ),
    FieldDescriptor::numeric(
        "cons.conf.idx",
        -50.0,
        50.0,
        "cons.conf.idx: Enter the consumer confidence index.",
    ),
    FieldDescriptor::numeric(
        "euribor3m",
        0.0,
        6.0,
        "euribor3m: Enter the Euribor 3 month rate.",
    ),
    FieldDescriptor::numeric(
        "nr.employed",
        1000.0,
        6000.0,
        "nr.employed: Enter the number of employees.",
    ),
];

#[derive(Debug, Serialize)]
pub struct FormSpec {
    pub title: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldDescriptor],
}

pub static FORM_SPEC: FormSpec = FormSpec {
    title: "Bank Deposit Subscription Prediction",
    description: "Predict whether a customer will subscribe to a term deposit \
                  from their profile and the context of the last marketing contact.",
    fields: &FORM_FIELDS,
};

static FIELDS_BY_NAME: Lazy<HashMap<&'static str, &'static FieldDescriptor>> =
    Lazy::new(|| FORM_FIELDS.iter().map(|f| (f.name, f)).collect());

// emp_var_rate -> emp.var.rate, only for names whose dot form is a real column.
static UNDERSCORE_ALIASES: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    FORM_FIELDS
        .iter()
        .filter(|f| f.name.contains('.'))
        .map(|f| (f.name.replace('.', "_"), f.name))
        .collect()
});

pub fn descriptor(name: &str) -> Option<&'static FieldDescriptor> {
    FIELDS_BY_NAME.get(name).copied()
}

pub fn columns_of_kind(kind: FieldKind) -> impl Iterator<Item = &'static str> {
    FORM_FIELDS
        .iter()
        .filter(move |f| f.kind == kind)
        .map(|f| f.name)
}

/// Maps a request key onto its training-time column name.
pub fn canonical_name(raw: &str) -> &str {
    match UNDERSCORE_ALIASES.get(raw) {
        Some(name) => *name,
        None => raw,
    }
}

/// A single cell of the customer record. `null` means missing and is left
/// to the imputers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Text(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Missing => f.write_str("null"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One row keyed by column name. Column order is whatever the caller used;
/// the preprocessing stage addresses cells by name only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, FieldValue>", into = "BTreeMap<String, FieldValue>")]
pub struct CustomerRecord {
    cells: Vec<(String, FieldValue)>,
}

impl CustomerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from one value per form field, in form order.
    pub fn from_positional(values: Vec<FieldValue>) -> Result<Self, PredictionError> {
        if values.len() != FORM_FIELDS.len() {
            return Err(PredictionError::InvalidRequest(format!(
                "expected {} positional values, got {}",
                FORM_FIELDS.len(),
                values.len()
            )));
        }
        Ok(FORM_FIELDS
            .iter()
            .zip(values)
            .map(|(field, value)| (field.name.to_string(), value))
            .collect())
    }

    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    pub fn insert(&mut self, column: &str, value: FieldValue) {
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        let idx = self.cells.iter().position(|(name, _)| name == column)?;
        Some(self.cells.remove(idx).1)
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

}

impl FromIterator<(String, FieldValue)> for CustomerRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = CustomerRecord::new();
        for (name, value) in iter {
            record.insert(&name, value);
        }
        record
    }
}

impl TryFrom<BTreeMap<String, FieldValue>> for CustomerRecord {
    type Error = String;

    fn try_from(map: BTreeMap<String, FieldValue>) -> Result<Self, Self::Error> {
        let mut record = CustomerRecord::new();
        for (raw, value) in map {
            let name = canonical_name(&raw);
            if record.get(name).is_some() {
                return Err(format!("column `{name}` given more than once"));
            }
            record.insert(name, value);
        }
        Ok(record)
    }
}

impl From<CustomerRecord> for BTreeMap<String, FieldValue> {
    fn from(record: CustomerRecord) -> Self {
        record.cells.into_iter().collect()
    }
}
