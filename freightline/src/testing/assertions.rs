//! Assertions on service outcomes.

use std::fmt::Debug;

use crate::errors::{ErrorCode, FreightlineError};

/// Asserts that `result` failed with the expected code and returns the error.
#[track_caller]
pub fn assert_error_code<T: Debug>(
    result: Result<T, FreightlineError>,
    expected: ErrorCode,
) -> FreightlineError {
    match result {
        Ok(value) => panic!("Expected {expected} error, got Ok({value:?})"),
        Err(err) => {
            assert_eq!(
                err.code(),
                expected,
                "Expected {expected} error, got {}: {err}",
                err.code()
            );
            err
        }
    }
}

/// Asserts that the error message contains `needle`.
#[track_caller]
pub fn assert_error_contains(err: &FreightlineError, needle: &str) {
    let message = err.to_string();
    assert!(
        message.contains(needle),
        "Expected error to contain '{needle}', got '{message}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_error_code() {
        let err = assert_error_code::<()>(
            Err(FreightlineError::not_found("stage \"x\"")),
            ErrorCode::NotFound,
        );
        assert_error_contains(&err, "stage");
    }

    #[test]
    #[should_panic(expected = "Expected not_found error")]
    fn test_assert_error_code_on_ok() {
        assert_error_code(Ok(1), ErrorCode::NotFound);
    }
}
