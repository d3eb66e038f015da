//! Device-manager capabilities.
//!
//! Enumeration itself belongs to the media backend; these traits only define
//! the surface a caller sees after querying the engine.

use serde::{Deserialize, Serialize};

use crate::engine::types::MediaDeviceType;
use crate::error::EngineError;
use crate::handle::Release;

/// Longest device id accepted by any device call.
pub const MAX_DEVICE_ID_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub id: String,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Snapshot of the devices of one kind at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCollection {
    kind: MediaDeviceType,
    devices: Vec<DeviceInfo>,
}

impl DeviceCollection {
    pub fn new(kind: MediaDeviceType, devices: Vec<DeviceInfo>) -> Self {
        Self { kind, devices }
    }

    pub fn kind(&self) -> MediaDeviceType {
        self.kind
    }

    pub fn count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, index: usize) -> Result<&DeviceInfo, EngineError> {
        self.devices.get(index).ok_or_else(|| {
            EngineError::invalid_argument(format!(
                "device index {} out of range ({} devices)",
                index,
                self.devices.len()
            ))
        })
    }

    pub fn find(&self, id: &str) -> Option<&DeviceInfo> {
        self.devices.iter().find(|device| device.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter()
    }
}

/// Reject ids the engine would never accept.
pub fn validate_device_id(id: &str) -> Result<(), EngineError> {
    if id.is_empty() {
        return Err(EngineError::invalid_argument("device id is empty"));
    }
    if id.len() > MAX_DEVICE_ID_LENGTH {
        return Err(EngineError::invalid_argument(format!(
            "device id is {} bytes, limit is {}",
            id.len(),
            MAX_DEVICE_ID_LENGTH
        )));
    }
    Ok(())
}

/// Audio playback/recording device selection, volume and loopback tests.
///
/// Volumes are in `0..=255`.
pub trait AudioDeviceManager: Release + Send {
    fn enumerate_playback_devices(&self) -> Result<DeviceCollection, EngineError>;
    fn enumerate_recording_devices(&self) -> Result<DeviceCollection, EngineError>;

    fn set_playback_device(&self, id: &str) -> Result<(), EngineError>;
    fn playback_device(&self) -> Result<String, EngineError>;
    fn set_playback_device_volume(&self, volume: i32) -> Result<(), EngineError>;
    fn playback_device_volume(&self) -> Result<i32, EngineError>;

    fn set_recording_device(&self, id: &str) -> Result<(), EngineError>;
    fn recording_device(&self) -> Result<String, EngineError>;
    fn set_recording_device_volume(&self, volume: i32) -> Result<(), EngineError>;
    fn recording_device_volume(&self) -> Result<i32, EngineError>;

    /// Play `test_audio_file` through the selected playback device.
    fn start_playback_device_test(&self, test_audio_file: &str) -> Result<(), EngineError>;
    fn stop_playback_device_test(&self) -> Result<(), EngineError>;

    /// Report recording volume every `indication_interval_ms`.
    fn start_recording_device_test(&self, indication_interval_ms: i32) -> Result<(), EngineError>;
    fn stop_recording_device_test(&self) -> Result<(), EngineError>;
}

/// Video capture device selection.
pub trait VideoDeviceManager: Release + Send {
    fn enumerate_video_devices(&self) -> Result<DeviceCollection, EngineError>;
    fn set_device(&self, id: &str) -> Result<(), EngineError>;
    fn device(&self) -> Result<String, EngineError>;
}
