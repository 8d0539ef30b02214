//! Error types for the freightline service core.
//!
//! Every failure surfaced to a caller carries an [`ErrorCode`] so request
//! handlers can translate it into their own status model. Validation,
//! authorization and lookup failures are reported before any side effect;
//! store, conversion, delivery and aggregate failures are all `Internal`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::ObjectKey;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed input or a violated exclusivity rule.
    InvalidArgument,
    /// A referenced object does not exist.
    NotFound,
    /// The authorizer refused the request.
    PermissionDenied,
    /// Store communication, schema conversion or fan-out failure.
    Internal,
    /// The caller cancelled a long-lived operation.
    Canceled,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Internal => "internal",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// The main error type for freightline operations.
#[derive(Debug, Error)]
pub enum FreightlineError {
    /// The request was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The authorizer denied the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A resource store call failed.
    #[error("{context}: {source}")]
    Store {
        /// What the service was doing when the store failed.
        context: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// A loosely-typed object could not be converted to its typed form.
    #[error("convert {kind}: {message}")]
    Conversion {
        /// The expected kind.
        kind: String,
        /// Decoder message.
        message: String,
    },

    /// A watch event could not be delivered to its sink.
    #[error("send response: {source}")]
    Delivery {
        /// The sink failure.
        #[source]
        source: SinkError,
    },

    /// One or more independent operations of a fan-out failed.
    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    /// A long-lived operation was cancelled by its caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FreightlineError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a permission denied error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Wraps a store error with context.
    #[must_use]
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// Returns the caller-facing classification of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Cancelled(_) => ErrorCode::Canceled,
            Self::Store { .. }
            | Self::Conversion { .. }
            | Self::Delivery { .. }
            | Self::Aggregate(_)
            | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Errors returned by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{kind} {key} not found")]
    NotFound {
        /// Object kind.
        kind: String,
        /// Object key.
        key: ObjectKey,
    },

    /// An object with the same key already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists {
        /// Object kind.
        kind: String,
        /// Object key.
        key: ObjectKey,
    },

    /// An optimistic write lost against a concurrent writer.
    #[error("conflict writing {kind} {key}: expected resource version {expected}, found {actual}")]
    Conflict {
        /// Object kind.
        kind: String,
        /// Object key.
        key: ObjectKey,
        /// The version the writer based its change on.
        expected: String,
        /// The version currently stored.
        actual: String,
    },

    /// The object was rejected by validation.
    #[error("invalid object: {0}")]
    Invalid(String),

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is an optimistic concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Errors returned by a [`WatchSink`](crate::events::WatchSink).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The consumer went away.
    #[error("stream closed by consumer")]
    Closed,

    /// Any other delivery failure.
    #[error("{0}")]
    Other(String),
}

/// A multi-error collecting every failure of an independent fan-out.
///
/// Unlike first-error reporting, each member failure is preserved and
/// rendered on its own line.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<FreightlineError>,
}

impl AggregateError {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a failure.
    pub fn push(&mut self, error: FreightlineError) {
        self.errors.push(error);
    }

    /// Returns the collected failures.
    #[must_use]
    pub fn errors(&self) -> &[FreightlineError] {
        &self.errors
    }

    /// Returns the number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts to `None` if empty, otherwise wraps in a [`FreightlineError`].
    #[must_use]
    pub fn into_error(self) -> Option<FreightlineError> {
        if self.is_empty() {
            None
        } else {
            Some(FreightlineError::Aggregate(self))
        }
    }
}

impl FromIterator<FreightlineError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = FreightlineError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Result alias used throughout the crate.
pub type Result<T, E = FreightlineError> = std::result::Result<T, E>;
