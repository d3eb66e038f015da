// Error types for the RTC engine SDK
//
// This module defines the engine error taxonomy and warning codes, providing
// structured error handling with numeric codes that survive the binary
// boundary unchanged.

mod engine;
mod warning;

pub use engine::{error_description, log_engine_error, EngineError, EngineErrorCodes};
pub use warning::WarningCode;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Integer outcome of an engine call: `0` on success, `-code` on failure.
///
/// This is the integer a C caller of the SDK observes.
pub fn result_code<T, E: ErrorCode>(result: &Result<T, E>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => -err.code(),
    }
}
