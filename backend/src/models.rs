use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::schema::FieldValue;

pub const SUBSCRIBED: &str = "Subscribed to Deposit";
pub const NOT_SUBSCRIBED: &str = "Not Subscribed to Deposit";

/// Display label for a predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Subscribed,
    NotSubscribed,
}

impl Label {
    /// Class 1 is the positive class; every other value reads as negative.
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            Label::Subscribed
        } else {
            Label::NotSubscribed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Subscribed => SUBSCRIBED,
            Label::NotSubscribed => NOT_SUBSCRIBED,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn format_prediction(class: i64) -> &'static str {
    Label::from_class(class).as_str()
}

#[derive(Debug, Serialize, Clone)]
pub struct PredictionResult {
    pub label: Label,
    pub class: i64,
    pub timestamp: String,
}

impl PredictionResult {
    pub fn new(class: i64) -> Self {
        PredictionResult {
            label: Label::from_class(class),
            class,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Form submission: one value per field in form order.
#[derive(Debug, Deserialize)]
pub struct PositionalRequest {
    pub data: Vec<FieldValue>,
}

/// Form output: the single text component.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionalResponse {
    pub data: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn timed(mut self, elapsed_ms: u128) -> Self {
        self.execution_time_ms = Some(elapsed_ms as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatter_maps_both_classes() {
        assert_eq!(format_prediction(1), "Subscribed to Deposit");
        assert_eq!(format_prediction(0), "Not Subscribed to Deposit");
    }

    #[test]
    fn formatter_is_total() {
        for class in [-1, 2, 7, i64::MIN, i64::MAX] {
            assert_eq!(format_prediction(class), NOT_SUBSCRIBED);
        }
    }

    #[test]
    fn label_serializes_as_display_text() {
        let result = PredictionResult::new(1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "Subscribed to Deposit");
        assert_eq!(json["class"], 1);
    }

    #[test]
    fn error_envelope_has_no_data() {
        let resp = ApiResponse::<()>::error("boom").timed(12);
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert_eq!(resp.execution_time_ms, Some(12));
    }
}
