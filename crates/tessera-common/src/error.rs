//! Error types for Tessera

use thiserror::Error;

/// Main error type for Tessera operations
///
/// Each variant carries the context needed to act on the failure: the
/// resource it concerns, a field path when one is known, or the component
/// that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// A resource failed admission validation
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Name of the resource that failed validation
        resource: String,
        /// Description of the validation failure
        message: String,
        /// Field path that failed validation (e.g., "spec.subclusters[0].size")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
        /// Kind of resource being processed (e.g., "TesseraDB")
        kind: Option<String>,
    },

    /// Internal error (unexpected state)
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
        /// Component or operation where the error occurred
        context: String,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
            kind: None,
        }
    }
}

impl Error {
    /// Create a validation error for a specific resource
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error for a specific field of a resource
    pub fn validation_for_field(
        resource: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Returns true if the error was caused by the submitted object rather
    /// than by the process handling it
    ///
    /// Admission callers map user errors to a denial and everything else to
    /// a server failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::Serialization { .. }
        )
    }

    /// Get the resource name if this error concerns a specific resource
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::Validation { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Get the field path if this error points at one
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
