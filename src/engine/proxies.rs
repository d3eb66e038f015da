//! Capability objects handed out by `RtcEngine::query_interface`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::capability::{AudioDeviceManager, DeviceCollection, InterfaceId, VideoDeviceManager};
use crate::engine::inner::EngineCore;
use crate::engine::lifecycle::Lifecycle;
use crate::engine::types::MediaDeviceType;
use crate::engine::backend::BackendCommand;
use crate::error::EngineError;
use crate::handle::{Release, StringHandle};
use crate::parameters::store::{
    read_array_text, read_bool, read_int, read_number, read_object_text, read_string, read_uint,
};
use crate::parameters::{number_to_json, parse_object, ParameterBus};

/// One counted reference to the engine core.
///
/// Stops working as soon as the engine starts releasing, and gives its
/// count back exactly once, on `release` or on drop.
struct CapabilityRef {
    core: Weak<EngineCore>,
    lifecycle: Arc<Lifecycle>,
    live: Option<Arc<AtomicUsize>>,
    iid: InterfaceId,
}

impl CapabilityRef {
    fn new(core: &Arc<EngineCore>, iid: InterfaceId) -> Self {
        Self {
            core: Arc::downgrade(core),
            lifecycle: Arc::clone(core.lifecycle()),
            live: Some(core.capability_acquired()),
            iid,
        }
    }

    fn core(&self) -> Result<Arc<EngineCore>, EngineError> {
        if self.live.is_none() || !self.lifecycle.is_live() {
            return Err(EngineError::HandleInvalidated);
        }
        self.core.upgrade().ok_or(EngineError::HandleInvalidated)
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            live.fetch_sub(1, Ordering::SeqCst);
            log::debug!("[RtcEngine] released {:?} capability", self.iid);
        }
    }
}

impl Drop for CapabilityRef {
    fn drop(&mut self) {
        self.release();
    }
}

pub(crate) struct ParameterBusProxy {
    inner: CapabilityRef,
}

impl ParameterBusProxy {
    pub(crate) fn new(core: &Arc<EngineCore>) -> Self {
        Self {
            inner: CapabilityRef::new(core, InterfaceId::RtcEngineParameter),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), EngineError> {
        self.inner.core()?.set_parameter(key, value)
    }
}

impl Release for ParameterBusProxy {
    fn release(&mut self) {
        self.inner.release();
    }
}

impl ParameterBus for ParameterBusProxy {
    fn set_bool(&self, key: &str, value: bool) -> Result<(), EngineError> {
        self.set(key, Value::Bool(value))
    }

    fn get_bool(&self, key: &str) -> Result<bool, EngineError> {
        self.inner.core()?.read_parameter(key, read_bool)
    }

    fn set_int(&self, key: &str, value: i32) -> Result<(), EngineError> {
        self.set(key, Value::from(value))
    }

    fn get_int(&self, key: &str) -> Result<i32, EngineError> {
        self.inner.core()?.read_parameter(key, read_int)
    }

    fn set_uint(&self, key: &str, value: u32) -> Result<(), EngineError> {
        self.set(key, Value::from(value))
    }

    fn get_uint(&self, key: &str) -> Result<u32, EngineError> {
        self.inner.core()?.read_parameter(key, read_uint)
    }

    fn set_number(&self, key: &str, value: f64) -> Result<(), EngineError> {
        self.set(key, number_to_json(value)?)
    }

    fn get_number(&self, key: &str) -> Result<f64, EngineError> {
        self.inner.core()?.read_parameter(key, read_number)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.set(key, Value::String(value.to_string()))
    }

    fn get_string(&self, key: &str) -> Result<StringHandle, EngineError> {
        self.inner
            .core()?
            .read_parameter(key, read_string)
            .map(StringHandle::from)
    }

    fn set_object(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.set(key, parse_object(value)?)
    }

    fn get_object(&self, key: &str) -> Result<StringHandle, EngineError> {
        self.inner
            .core()?
            .read_parameter(key, read_object_text)
            .map(StringHandle::from)
    }

    fn get_array(&self, key: &str) -> Result<StringHandle, EngineError> {
        self.inner
            .core()?
            .read_parameter(key, read_array_text)
            .map(StringHandle::from)
    }

    fn set_parameters(&self, parameters: &str) -> Result<(), EngineError> {
        self.inner.core()?.set_parameters(parameters)
    }

    fn set_profile(&self, profile: &str, merge: bool) -> Result<(), EngineError> {
        self.inner.core()?.set_profile(profile, merge)
    }
}

pub(crate) struct AudioDeviceManagerProxy {
    inner: CapabilityRef,
}

impl AudioDeviceManagerProxy {
    pub(crate) fn new(core: &Arc<EngineCore>) -> Self {
        Self {
            inner: CapabilityRef::new(core, InterfaceId::AudioDeviceManager),
        }
    }
}

impl Release for AudioDeviceManagerProxy {
    fn release(&mut self) {
        self.inner.release();
    }
}

impl AudioDeviceManager for AudioDeviceManagerProxy {
    fn enumerate_playback_devices(&self) -> Result<DeviceCollection, EngineError> {
        Ok(self.inner.core()?.enumerate_devices(MediaDeviceType::AudioPlayback))
    }

    fn enumerate_recording_devices(&self) -> Result<DeviceCollection, EngineError> {
        Ok(self.inner.core()?.enumerate_devices(MediaDeviceType::AudioRecording))
    }

    fn set_playback_device(&self, id: &str) -> Result<(), EngineError> {
        self.inner.core()?.select_device(MediaDeviceType::AudioPlayback, id)
    }

    fn playback_device(&self) -> Result<String, EngineError> {
        self.inner.core()?.selected_device(MediaDeviceType::AudioPlayback)
    }

    fn set_playback_device_volume(&self, volume: i32) -> Result<(), EngineError> {
        self.inner
            .core()?
            .set_device_volume(MediaDeviceType::AudioPlayback, volume)
    }

    fn playback_device_volume(&self) -> Result<i32, EngineError> {
        self.inner.core()?.device_volume(MediaDeviceType::AudioPlayback)
    }

    fn set_recording_device(&self, id: &str) -> Result<(), EngineError> {
        self.inner.core()?.select_device(MediaDeviceType::AudioRecording, id)
    }

    fn recording_device(&self) -> Result<String, EngineError> {
        self.inner.core()?.selected_device(MediaDeviceType::AudioRecording)
    }

    fn set_recording_device_volume(&self, volume: i32) -> Result<(), EngineError> {
        self.inner
            .core()?
            .set_device_volume(MediaDeviceType::AudioRecording, volume)
    }

    fn recording_device_volume(&self) -> Result<i32, EngineError> {
        self.inner.core()?.device_volume(MediaDeviceType::AudioRecording)
    }

    fn start_playback_device_test(&self, test_audio_file: &str) -> Result<(), EngineError> {
        if test_audio_file.is_empty() {
            return Err(EngineError::invalid_argument("test audio file is empty"));
        }
        self.inner.core()?.execute(BackendCommand::PlaybackDeviceTest {
            test_audio_file: Some(test_audio_file.to_string()),
        })
    }

    fn stop_playback_device_test(&self) -> Result<(), EngineError> {
        self.inner.core()?.execute(BackendCommand::PlaybackDeviceTest {
            test_audio_file: None,
        })
    }

    fn start_recording_device_test(&self, indication_interval_ms: i32) -> Result<(), EngineError> {
        self.inner.core()?.execute(BackendCommand::RecordingDeviceTest {
            indication_interval_ms: Some(indication_interval_ms),
        })
    }

    fn stop_recording_device_test(&self) -> Result<(), EngineError> {
        self.inner.core()?.execute(BackendCommand::RecordingDeviceTest {
            indication_interval_ms: None,
        })
    }
}

pub(crate) struct VideoDeviceManagerProxy {
    inner: CapabilityRef,
}

impl VideoDeviceManagerProxy {
    pub(crate) fn new(core: &Arc<EngineCore>) -> Self {
        Self {
            inner: CapabilityRef::new(core, InterfaceId::VideoDeviceManager),
        }
    }
}

impl Release for VideoDeviceManagerProxy {
    fn release(&mut self) {
        self.inner.release();
    }
}

impl VideoDeviceManager for VideoDeviceManagerProxy {
    fn enumerate_video_devices(&self) -> Result<DeviceCollection, EngineError> {
        Ok(self.inner.core()?.enumerate_devices(MediaDeviceType::VideoCapture))
    }

    fn set_device(&self, id: &str) -> Result<(), EngineError> {
        self.inner.core()?.select_device(MediaDeviceType::VideoCapture, id)
    }

    fn device(&self) -> Result<String, EngineError> {
        self.inner.core()?.selected_device(MediaDeviceType::VideoCapture)
    }
}
