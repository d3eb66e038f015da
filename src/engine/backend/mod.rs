//! Media backend abstraction behind the engine root.
//!
//! The engine owns lifecycle, capability bookkeeping and the parameter
//! store; a backend only performs media work and reports back through the
//! event sink it receives on start.

use std::time::Instant;

use serde_json::Value;

use crate::capability::{DeviceInfo, InterfaceId};
use crate::engine::types::{
    ChannelProfile, ClientRole, MediaDeviceType, Uid, VideoCanvas, VideoProfile,
};
use crate::error::EngineError;
use crate::events::EventSink;

mod loopback;
pub use loopback::{LoopbackBackend, StubTimeSource};

/// Context provided to a backend when the engine is initialized.
pub struct BackendStartContext {
    pub app_id: String,
    /// Test-only engines skip anything that would touch real devices.
    pub test_only: bool,
    pub events: EventSink,
}

/// Work requested by the typed engine methods and device managers.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    JoinChannel {
        channel_key: Option<String>,
        channel_name: String,
        info: Option<String>,
        uid: Uid,
    },
    LeaveChannel,
    SetChannelProfile(ChannelProfile),
    SetClientRole {
        role: ClientRole,
        permission_key: Option<String>,
    },
    LastmileTest {
        enabled: bool,
    },
    EnableVideo {
        enabled: bool,
    },
    Preview {
        enabled: bool,
    },
    SetVideoProfile {
        profile: VideoProfile,
        swap_width_and_height: bool,
    },
    SetupLocalVideo(VideoCanvas),
    SetupRemoteVideo(VideoCanvas),
    EnableAudio {
        enabled: bool,
    },
    SelectDevice {
        kind: MediaDeviceType,
        id: String,
    },
    SetDeviceVolume {
        kind: MediaDeviceType,
        volume: i32,
    },
    /// `Some(file)` starts the playback test, `None` stops it.
    PlaybackDeviceTest {
        test_audio_file: Option<String>,
    },
    /// `Some(interval)` starts the recording test, `None` stops it.
    RecordingDeviceTest {
        indication_interval_ms: Option<i32>,
    },
}

impl BackendCommand {
    /// Name reported through `on_api_call_executed` and telemetry.
    pub fn api_name(&self) -> &'static str {
        match self {
            BackendCommand::JoinChannel { .. } => "join_channel",
            BackendCommand::LeaveChannel => "leave_channel",
            BackendCommand::SetChannelProfile(_) => "set_channel_profile",
            BackendCommand::SetClientRole { .. } => "set_client_role",
            BackendCommand::LastmileTest { enabled: true } => "enable_lastmile_test",
            BackendCommand::LastmileTest { enabled: false } => "disable_lastmile_test",
            BackendCommand::EnableVideo { enabled: true } => "enable_video",
            BackendCommand::EnableVideo { enabled: false } => "disable_video",
            BackendCommand::Preview { enabled: true } => "start_preview",
            BackendCommand::Preview { enabled: false } => "stop_preview",
            BackendCommand::SetVideoProfile { .. } => "set_video_profile",
            BackendCommand::SetupLocalVideo(_) => "setup_local_video",
            BackendCommand::SetupRemoteVideo(_) => "setup_remote_video",
            BackendCommand::EnableAudio { enabled: true } => "enable_audio",
            BackendCommand::EnableAudio { enabled: false } => "disable_audio",
            BackendCommand::SelectDevice { .. } => "set_device",
            BackendCommand::SetDeviceVolume { .. } => "set_device_volume",
            BackendCommand::PlaybackDeviceTest {
                test_audio_file: Some(_),
            } => "start_playback_device_test",
            BackendCommand::PlaybackDeviceTest { test_audio_file: None } => {
                "stop_playback_device_test"
            }
            BackendCommand::RecordingDeviceTest {
                indication_interval_ms: Some(_),
            } => "start_recording_device_test",
            BackendCommand::RecordingDeviceTest {
                indication_interval_ms: None,
            } => "stop_recording_device_test",
        }
    }
}

/// Trait implemented by media backends.
///
/// Calls may arrive from any thread; implementations guard their own state.
pub trait MediaBackend: Send + Sync {
    fn start(&self, ctx: BackendStartContext) -> Result<(), EngineError>;

    /// Stop all media work. Called once during engine teardown.
    fn stop(&self);

    /// Whether this backend provides the capability family `iid`.
    fn supports(&self, iid: InterfaceId) -> bool {
        !matches!(iid, InterfaceId::MediaEngine)
    }

    /// Observe a parameter before it is committed. Returning an error keeps
    /// the previous value.
    fn apply_parameter(&self, key: &str, value: &Value) -> Result<(), EngineError> {
        let _ = (key, value);
        Ok(())
    }

    /// Live value for read-only keys the backend owns (mixing position,
    /// file length). `None` falls through to the parameter store.
    fn query_parameter(&self, key: &str) -> Option<Value> {
        let _ = key;
        None
    }

    fn execute(&self, command: BackendCommand) -> Result<(), EngineError>;

    fn devices(&self, kind: MediaDeviceType) -> Vec<DeviceInfo>;
}

/// Trait representing a monotonic time source used for event timings.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
