// Engine error types and constants

use log::error;
use std::fmt;

use crate::error::ErrorCode;

/// Engine error code constants
///
/// Single source of truth for the numeric codes returned across the binary
/// boundary. Values match the SDK's `ERROR_CODE_TYPE` table; `TYPE_MISMATCH`
/// and `NOT_FOUND` occupy unused slots of the 1-1000 range.
pub struct EngineErrorCodes {}

impl EngineErrorCodes {
    pub const OK: i32 = 0;
    pub const FAILED: i32 = 1;
    pub const INVALID_ARGUMENT: i32 = 2;
    pub const NOT_READY: i32 = 3;
    pub const NOT_SUPPORTED: i32 = 4;
    pub const REFUSED: i32 = 5;
    pub const BUFFER_TOO_SMALL: i32 = 6;
    pub const NOT_INITIALIZED: i32 = 7;
    /// Parameter bus: stored value is not coercible to the requested type
    pub const TYPE_MISMATCH: i32 = 8;
    pub const NO_PERMISSION: i32 = 9;
    pub const TIMEDOUT: i32 = 10;
    pub const CANCELED: i32 = 11;
    pub const TOO_OFTEN: i32 = 12;
    /// Parameter bus: key is unset
    pub const NOT_FOUND: i32 = 16;
    pub const JOIN_CHANNEL_REJECTED: i32 = 17;
    pub const LEAVE_CHANNEL_REJECTED: i32 = 18;
    pub const ALREADY_IN_USE: i32 = 19;
    pub const ABORTED: i32 = 20;
    pub const INVALID_APP_ID: i32 = 101;
    pub const INVALID_CHANNEL_KEY: i32 = 104;
    pub const INVALID_DEVICE: i32 = 105;
    pub const INVALID_TOKEN: i32 = 112;
    pub const NOT_IN_CHANNEL: i32 = 113;
    pub const INVALID_CHANNEL_NAME: i32 = 114;
}

/// Log an engine error with structured context
///
/// Logs the numeric code, the component and the message. The logging is
/// non-blocking and will not panic on failure.
pub fn log_engine_error(err: &EngineError, context: &str) {
    error!(
        "Engine error in {}: code={}, component=RtcEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Human-readable description of a numeric error code (`getErrorDescription`).
///
/// Accepts both positive codes and the negated form returned by
/// [`crate::error::result_code`].
pub fn error_description(code: i32) -> &'static str {
    match code.saturating_abs() {
        EngineErrorCodes::OK => "no error",
        EngineErrorCodes::FAILED => "general failure",
        EngineErrorCodes::INVALID_ARGUMENT => "invalid argument",
        EngineErrorCodes::NOT_READY => "engine not ready",
        EngineErrorCodes::NOT_SUPPORTED => "not supported",
        EngineErrorCodes::REFUSED => "request refused",
        EngineErrorCodes::BUFFER_TOO_SMALL => "buffer too small",
        EngineErrorCodes::NOT_INITIALIZED => "not initialized",
        EngineErrorCodes::TYPE_MISMATCH => "parameter type mismatch",
        EngineErrorCodes::NO_PERMISSION => "no permission",
        EngineErrorCodes::TIMEDOUT => "timed out",
        EngineErrorCodes::CANCELED => "request canceled",
        EngineErrorCodes::TOO_OFTEN => "called too often",
        EngineErrorCodes::NOT_FOUND => "parameter not found",
        EngineErrorCodes::JOIN_CHANNEL_REJECTED => "join channel rejected",
        EngineErrorCodes::LEAVE_CHANNEL_REJECTED => "leave channel rejected",
        EngineErrorCodes::ALREADY_IN_USE => "resource already in use",
        EngineErrorCodes::ABORTED => "request aborted",
        EngineErrorCodes::INVALID_APP_ID => "invalid app id",
        EngineErrorCodes::INVALID_CHANNEL_KEY => "invalid channel key",
        EngineErrorCodes::INVALID_DEVICE => "invalid device",
        EngineErrorCodes::INVALID_TOKEN => "invalid token",
        EngineErrorCodes::NOT_IN_CHANNEL => "not in channel",
        EngineErrorCodes::INVALID_CHANNEL_NAME => "invalid channel name",
        _ => "unknown error",
    }
}

/// Engine errors
///
/// Covers capability queries, the parameter bus, the facade, exclusive
/// handles and the typed engine methods.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Unspecified failure reported by the media backend
    Failed { reason: String },

    /// Argument rejected before reaching the engine
    InvalidArgument { reason: String },

    /// Engine not initialized, or already releasing
    NotReady,

    /// Unknown capability identifier or feature
    NotSupported { feature: String },

    /// Backend refused the request
    Refused,

    /// Caller-provided buffer too small
    BufferTooSmall,

    /// Facade or bus not bound
    NotInitialized,

    /// Stored parameter value is not coercible to the requested type
    TypeMismatch { key: String, expected: &'static str },

    NoPermission,

    TimedOut,

    Canceled,

    TooOften,

    /// Parameter key is unset
    NotFound { key: String },

    JoinChannelRejected,

    LeaveChannelRejected,

    AlreadyInUse,

    Aborted,

    InvalidAppId,

    InvalidChannelKey,

    InvalidDevice { id: String },

    InvalidToken,

    NotInChannel,

    InvalidChannelName { name: String },

    /// Member access on an empty exclusive handle
    NullHandle,

    /// Handle derived from an engine that has started releasing
    HandleInvalidated,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl EngineError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn not_supported(feature: impl Into<String>) -> Self {
        EngineError::NotSupported {
            feature: feature.into(),
        }
    }

    pub fn lock_poisoned(component: impl Into<String>) -> Self {
        EngineError::LockPoisoned {
            component: component.into(),
        }
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> i32 {
        match self {
            EngineError::Failed { .. } => EngineErrorCodes::FAILED,
            EngineError::InvalidArgument { .. } => EngineErrorCodes::INVALID_ARGUMENT,
            EngineError::NotReady => EngineErrorCodes::NOT_READY,
            EngineError::NotSupported { .. } => EngineErrorCodes::NOT_SUPPORTED,
            EngineError::Refused => EngineErrorCodes::REFUSED,
            EngineError::BufferTooSmall => EngineErrorCodes::BUFFER_TOO_SMALL,
            EngineError::NotInitialized => EngineErrorCodes::NOT_INITIALIZED,
            EngineError::TypeMismatch { .. } => EngineErrorCodes::TYPE_MISMATCH,
            EngineError::NoPermission => EngineErrorCodes::NO_PERMISSION,
            EngineError::TimedOut => EngineErrorCodes::TIMEDOUT,
            EngineError::Canceled => EngineErrorCodes::CANCELED,
            EngineError::TooOften => EngineErrorCodes::TOO_OFTEN,
            EngineError::NotFound { .. } => EngineErrorCodes::NOT_FOUND,
            EngineError::JoinChannelRejected => EngineErrorCodes::JOIN_CHANNEL_REJECTED,
            EngineError::LeaveChannelRejected => EngineErrorCodes::LEAVE_CHANNEL_REJECTED,
            EngineError::AlreadyInUse => EngineErrorCodes::ALREADY_IN_USE,
            EngineError::Aborted => EngineErrorCodes::ABORTED,
            EngineError::InvalidAppId => EngineErrorCodes::INVALID_APP_ID,
            EngineError::InvalidChannelKey => EngineErrorCodes::INVALID_CHANNEL_KEY,
            EngineError::InvalidDevice { .. } => EngineErrorCodes::INVALID_DEVICE,
            EngineError::InvalidToken => EngineErrorCodes::INVALID_TOKEN,
            EngineError::NotInChannel => EngineErrorCodes::NOT_IN_CHANNEL,
            EngineError::InvalidChannelName { .. } => EngineErrorCodes::INVALID_CHANNEL_NAME,
            EngineError::NullHandle => EngineErrorCodes::NOT_INITIALIZED,
            EngineError::HandleInvalidated => EngineErrorCodes::NOT_READY,
            EngineError::LockPoisoned { .. } => EngineErrorCodes::FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            EngineError::Failed { reason } => format!("Engine failure: {}", reason),
            EngineError::InvalidArgument { reason } => format!("Invalid argument: {}", reason),
            EngineError::NotReady => {
                "Engine not ready. Call initialize() first.".to_string()
            }
            EngineError::NotSupported { feature } => format!("Not supported: {}", feature),
            EngineError::NotInitialized => {
                "Parameter bus not bound. Acquire the parameter interface first.".to_string()
            }
            EngineError::TypeMismatch { key, expected } => {
                format!("Parameter '{}' is not coercible to {}", key, expected)
            }
            EngineError::NotFound { key } => format!("Parameter '{}' is not set", key),
            EngineError::InvalidDevice { id } => format!("Unknown device id '{}'", id),
            EngineError::InvalidChannelName { name } => {
                format!("Invalid channel name '{}'", name)
            }
            EngineError::NullHandle => "Access through an empty handle".to_string(),
            EngineError::HandleInvalidated => {
                "Handle belongs to an engine that is being released".to_string()
            }
            EngineError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            other => error_description(other.code()).to_string(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EngineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidArgument {
            reason: format!("malformed JSON: {}", err),
        }
    }
}
