//! Testing utilities for freightline services.
//!
//! This module provides:
//! - Seeded in-memory stores
//! - A fault-injecting store wrapper and a recording authorizer
//! - Assertions on error codes

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_error_code, assert_error_contains};
pub use fixtures::{Fixture, PROJECT};
pub use mocks::{FaultyStore, RecordingAuthorizer};
