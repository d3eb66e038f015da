// RTC Engine SDK - public surface of a real-time communication engine
// Capability queries, a typed JSON parameter bus and asynchronous events

// Module declarations
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod parameters;
pub mod telemetry;

// Re-exports for convenience
pub use capability::{
    AnyCapability, AudioDeviceManager, AudioDeviceManagerHandle, InterfaceId, ParameterHandle,
    QueryInterface, VideoDeviceManager, VideoDeviceManagerHandle,
};
pub use config::EngineConfig;
pub use engine::{EngineContext, Lifecycle, LifecycleState, RtcEngine};
pub use error::{error_description, result_code, EngineError, ErrorCode, WarningCode};
pub use events::{EngineEvent, RtcEngineEventHandler};
pub use handle::{ExclusiveHandle, Release, StringHandle};
pub use parameters::{ParameterBus, ParameterValue, RtcEngineParameters};

use once_cell::sync::Lazy;

/// Build number derived from the package version as `major << 16 | minor << 8 | patch`.
static BUILD_NUMBER: Lazy<u32> = Lazy::new(|| {
    env!("CARGO_PKG_VERSION")
        .split('.')
        .take(3)
        .map(|part| part.parse::<u32>().unwrap_or(0) & 0xff)
        .fold(0, |acc, part| (acc << 8) | part)
});

/// Create a new, uninitialized engine (`createAgoraRtcEngine`).
///
/// The engine uses the loopback media backend and the configuration found
/// through [`EngineConfig::load`].
pub fn create_engine() -> RtcEngine {
    RtcEngine::new()
}

/// SDK version string and build number (`getAgoraRtcEngineVersion`).
pub fn engine_version() -> (&'static str, u32) {
    (env!("CARGO_PKG_VERSION"), *BUILD_NUMBER)
}

/// Install a `tracing` subscriber that also captures `log` records.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(level: tracing::Level) {
    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_err()
    {
        log::debug!("logging already initialized");
    }
}
