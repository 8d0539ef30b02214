//! Logging setup and request spans.

mod tracing;

pub use self::tracing::{init_tracing, operation_span, OperationTimer};
