//! Request field validation.

use std::fmt;

use crate::errors::{FreightlineError, Result};

/// Fails with `InvalidArgument` if `value` is empty.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(FreightlineError::invalid_argument(format!(
            "{field} should not be empty"
        )));
    }
    Ok(())
}

/// Identifies one Freight either by exact name or by alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FreightRef {
    /// Exact object name.
    Name(String),
    /// Human-friendly alias.
    Alias(String),
}

impl FreightRef {
    /// Builds a reference from a name/alias pair of which exactly one is set.
    pub fn from_name_or_alias(name: &str, alias: &str) -> Result<Self> {
        match (name.is_empty(), alias.is_empty()) {
            (false, true) => Ok(Self::Name(name.to_string())),
            (true, false) => Ok(Self::Alias(alias.to_string())),
            _ => Err(FreightlineError::invalid_argument(
                "exactly one of name or alias should not be empty",
            )),
        }
    }

    /// The `NotFound` error for this reference in `namespace`.
    pub(crate) fn not_found(&self, namespace: &str) -> FreightlineError {
        FreightlineError::not_found(format!("{self} not found in namespace {namespace:?}"))
    }
}

impl fmt::Display for FreightRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "freight {name:?}"),
            Self::Alias(alias) => write!(f, "freight with alias {alias:?}"),
        }
    }
}
