//! Cooperative cancellation for long-lived operations.

mod token;

pub use token::CancellationToken;
