use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure talking to the CRM store. Carries the store's own status and
/// message so they can be surfaced verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("no {entity} with id {id}")]
    Missing { entity: &'static str, id: String },
}

impl StoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Missing { .. } => Some(404),
            _ => None,
        }
    }
}

/// Outcome of turning a natural-language name into a single store record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0}")]
    NotFound(String),
    #[error(
        "Multiple contacts found for '{query}'. Please be more specific. Found: {}",
        candidates.join(", ")
    )]
    MultipleMatches { query: String, candidates: Vec<String> },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownOperation,
    ValidationError,
    NotFoundError,
    MultipleMatchesError,
    RemoteError,
    Defect,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownOperation => "unknown_operation",
            Self::ValidationError => "validation_error",
            Self::NotFoundError => "not_found_error",
            Self::MultipleMatchesError => "multiple_matches_error",
            Self::RemoteError => "remote_error",
            Self::Defect => "defect",
        }
    }
}

/// Every way a single dispatch can fail. Never escapes the dispatcher; it is
/// folded into an error envelope at the boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("Invalid argument '{field}': {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error(
        "Multiple contacts found for '{query}'. Please be more specific. Found: {}",
        candidates.join(", ")
    )]
    MultipleMatches { query: String, candidates: Vec<String> },
    #[error("CRM request failed: {0}")]
    Remote(#[from] StoreError),
    #[error("internal defect: {0}")]
    Defect(String),
}

impl DispatchError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::MultipleMatches { .. } => ErrorKind::MultipleMatchesError,
            Self::Remote(_) => ErrorKind::RemoteError,
            Self::Defect(_) => ErrorKind::Defect,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<ResolveError> for DispatchError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound(message) => Self::NotFound(message),
            ResolveError::MultipleMatches { query, candidates } => {
                Self::MultipleMatches { query, candidates }
            }
            ResolveError::Store(error) => Self::Remote(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DispatchError, ErrorKind, ResolveError, StoreError};

    #[test]
    fn resolver_errors_keep_their_message_verbatim() {
        let resolve = ResolveError::NotFound("No contact found matching 'Zed'".to_owned());
        let dispatch = DispatchError::from(resolve.clone());

        assert_eq!(dispatch.kind(), ErrorKind::NotFoundError);
        assert_eq!(dispatch.to_string(), resolve.to_string());
    }

    #[test]
    fn multiple_matches_lists_every_candidate() {
        let dispatch = DispatchError::from(ResolveError::MultipleMatches {
            query: "Alex".to_owned(),
            candidates: vec!["Alex Johnson".to_owned(), "Alex Smith".to_owned()],
        });

        assert_eq!(dispatch.kind(), ErrorKind::MultipleMatchesError);
        assert_eq!(
            dispatch.to_string(),
            "Multiple contacts found for 'Alex'. Please be more specific. Found: Alex Johnson, Alex Smith"
        );
    }

    #[test]
    fn store_failure_inside_resolution_maps_to_remote_error() {
        let dispatch = DispatchError::from(ResolveError::Store(StoreError::Status {
            status: 502,
            message: "bad gateway".to_owned(),
        }));

        assert_eq!(dispatch.kind(), ErrorKind::RemoteError);
        assert_eq!(dispatch.to_string(), "CRM request failed: status 502: bad gateway");
    }

    #[test]
    fn validation_error_names_the_field() {
        let dispatch = DispatchError::validation("amount", "expected a number");

        assert_eq!(dispatch.kind(), ErrorKind::ValidationError);
        assert_eq!(dispatch.field(), Some("amount"));
        assert_eq!(dispatch.to_string(), "Invalid argument 'amount': expected a number");
    }
}
