#![warn(missing_docs)]

//! Shared datatypes and helpers used by the anonymous ballot rust projects
//!
//! Provide:
//! - The [entities] exchanged between the proof generation and the vote submission workflows.
//! - Helpers for the fixed cryptographic scheme with the [crypto_helper] (Poseidon hashing and
//!   the append-only commitment tree).
//! - A way to store data with the [store] types.
//! - [Logging][logging] extensions for `slog`.
//! - Useful test utilities including a test logger, temp directories and
//!   [fake data][test_utils::fake_data] builders.

pub mod crypto_helper;
pub mod entities;
pub mod logging;
pub mod store;

#[cfg(any(test, feature = "test_tools"))]
pub mod test_utils;

/// Generic error type
pub type StdError = anyhow::Error;

/// Generic result type
pub type StdResult<T> = anyhow::Result<T, StdError>;

/// Depth of the commitment tree supported by the vote circuit.
pub const DEFAULT_CIRCUIT_DEPTH: usize = 16;
