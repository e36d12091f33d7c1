//! Uniform result contract returned by every dispatch.
//!
//! Wire shape is `{"status": "success", "data": ...}` or
//! `{"status": "error", "message": "..."}`. The error kind travels alongside
//! in-process but is not part of the wire form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DispatchError, ErrorKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    Success {
        data: Value,
    },
    Error {
        message: String,
        #[serde(skip)]
        kind: Option<ErrorKind>,
    },
}

impl Envelope {
    pub fn success(data: impl Into<Value>) -> Self {
        Self::Success { data: data.into() }
    }

    pub fn error(error: &DispatchError) -> Self {
        Self::Error { message: error.to_string(), kind: Some(error.kind()) }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } => Some(data),
            Self::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            Self::Success { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => *kind,
            Self::Success { .. } => None,
        }
    }

    /// Serializes to the wire form. Falls back to a hand-built error body so
    /// callers always get valid JSON.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                "{{\"status\":\"error\",\"message\":\"envelope serialization failed: {}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    }
}

impl From<DispatchError> for Envelope {
    fn from(error: DispatchError) -> Self {
        Self::error(&error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::envelope::Envelope;
    use crate::errors::{DispatchError, ErrorKind};

    #[test]
    fn success_wire_shape() {
        let envelope = Envelope::success(json!({ "id": 7 }));
        let wire: serde_json::Value =
            serde_json::from_str(&envelope.to_json_string()).expect("valid json");

        assert_eq!(wire, json!({ "status": "success", "data": { "id": 7 } }));
    }

    #[test]
    fn error_wire_shape_hides_kind() {
        let envelope = Envelope::from(DispatchError::UnknownOperation("fly".to_owned()));
        let wire: serde_json::Value =
            serde_json::from_str(&envelope.to_json_string()).expect("valid json");

        assert_eq!(wire, json!({ "status": "error", "message": "Unknown operation 'fly'" }));
        assert_eq!(envelope.kind(), Some(ErrorKind::UnknownOperation));
    }

    #[test]
    fn error_envelope_parses_back_without_kind() {
        let envelope: Envelope =
            serde_json::from_value(json!({ "status": "error", "message": "nope" }))
                .expect("error envelope");

        assert!(!envelope.is_success());
        assert_eq!(envelope.message(), Some("nope"));
        assert_eq!(envelope.kind(), None);
    }
}
