//! Uniform response envelope
//!
//! Every list and detail response, success or failure, has the shape
//! `{ success, data?, error?: { message, details? } }`.

use crate::core::error::TallyError;
use crate::core::summary::Summary;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeError {
    pub message: String,

    /// Field name to messages, only for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(
        message: impl Into<String>,
        details: Option<BTreeMap<String, Vec<String>>>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(EnvelopeError {
                message: message.into(),
                details,
            }),
        }
    }
}

impl Envelope<Value> {
    /// Failure envelope for a pipeline error, with internals stripped
    pub fn from_error(err: &TallyError) -> Self {
        Self::failure(err.public_message(), err.details())
    }
}

/// Payload of a successful list response
///
/// Serialized as `{ <plural>: [...], summary?, isNext, totalCount }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListData {
    pub plural: String,
    pub items: Vec<Value>,
    pub summary: Option<Summary>,
    pub is_next: bool,
    pub total_count: u64,
}

impl Serialize for ListData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.summary.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(&self.plural, &self.items)?;
        if let Some(summary) = &self.summary {
            map.serialize_entry("summary", summary)?;
        }
        map.serialize_entry("isNext", &self.is_next)?;
        map.serialize_entry("totalCount", &self.total_count)?;
        map.end()
    }
}

impl IntoResponse for TallyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            TallyError::Storage(e) => tracing::error!(error = %e, "storage failure"),
            TallyError::Config(e) => tracing::error!(error = %e, "configuration failure"),
            _ => tracing::debug!(code = self.error_code(), status = %status, "request rejected"),
        }
        (status, Json(Envelope::from_error(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{FieldValidationError, ValidationError};
    use serde_json::json;

    #[test]
    fn test_ok_envelope_omits_error() {
        let value = serde_json::to_value(Envelope::ok(json!({"a": 1}))).unwrap();
        assert_eq!(value, json!({"success": true, "data": {"a": 1}}));
    }

    #[test]
    fn test_validation_failure_carries_details() {
        let err: TallyError = ValidationError::FieldErrors(vec![FieldValidationError::new(
            "branchId",
            "must be a valid id",
        )])
        .into();
        let value = serde_json::to_value(Envelope::from_error(&err)).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("data").is_none());
        assert_eq!(
            value["error"]["details"]["branchId"],
            json!(["must be a valid id"])
        );
    }

    #[test]
    fn test_not_found_failure_has_no_details() {
        let err = TallyError::not_found("sale", uuid::Uuid::nil());
        let value = serde_json::to_value(Envelope::from_error(&err)).unwrap();
        assert_eq!(value["error"], json!({"message": "Sale not found"}));
    }

    #[test]
    fn test_list_data_shape() {
        let data = ListData {
            plural: "purchases".to_string(),
            items: vec![json!({"reference": "INV-1"})],
            summary: Some(Summary::empty(&["grand_total".to_string()])),
            is_next: false,
            total_count: 1,
        };
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "purchases": [{"reference": "INV-1"}],
                "summary": {"count": 0, "totalGrandTotal": 0.0},
                "isNext": false,
                "totalCount": 1
            })
        );
    }

    #[test]
    fn test_list_data_without_summary() {
        let data = ListData {
            plural: "branches".to_string(),
            items: vec![],
            summary: None,
            is_next: false,
            total_count: 0,
        };
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("summary").is_none());
        assert_eq!(value["branches"], json!([]));
    }
}
