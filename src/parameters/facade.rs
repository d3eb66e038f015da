//! Semantic convenience layer over the parameter bus.
//!
//! Every operation is a fixed translation to one bus command. The facade
//! holds no state beyond its bus handle.

use crate::capability::{ParameterHandle, QueryInterface};
use crate::engine::types::{AudioRecordingQuality, LogLevel, RenderMode, Uid};
use crate::error::{log_engine_error, EngineError};
use crate::parameters::command::{ObjectCommand, ParametersCommand};
use crate::parameters::keys::*;
use crate::parameters::ParameterBus;

/// Playback volume range accepted by `che.audio.output.volume`.
const MAX_PLAYBACK_VOLUME: i32 = 255;

pub struct RtcEngineParameters {
    parameter: ParameterHandle,
}

impl RtcEngineParameters {
    /// Bind to the parameter capability of `engine`.
    ///
    /// If the query fails the facade is left unbound and every operation
    /// returns `NotInitialized`.
    pub fn new<Q>(engine: &Q) -> Self
    where
        Q: QueryInterface + ?Sized,
    {
        Self {
            parameter: ParameterHandle::acquire(engine),
        }
    }

    pub fn from_handle(parameter: ParameterHandle) -> Self {
        Self { parameter }
    }

    pub fn is_bound(&self) -> bool {
        self.parameter.is_some()
    }

    pub fn parameter(&self) -> &ParameterHandle {
        &self.parameter
    }

    pub fn into_handle(self) -> ParameterHandle {
        self.parameter
    }

    fn call<R>(
        &self,
        api: &str,
        f: impl FnOnce(&dyn ParameterBus) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let result = match self.parameter.with(|bus| f(&*bus)) {
            Ok(result) => result,
            Err(EngineError::NullHandle) => Err(EngineError::NotInitialized),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            log_engine_error(err, api);
        }
        result
    }

    fn set_bool(&self, api: &str, key: &str, value: bool) -> Result<(), EngineError> {
        self.call(api, |bus| bus.set_bool(key, value))
    }

    fn set_int(&self, api: &str, key: &str, value: i32) -> Result<(), EngineError> {
        self.call(api, |bus| bus.set_int(key, value))
    }

    fn set_object(&self, api: &str, key: &str, payload: ObjectCommand) -> Result<(), EngineError> {
        self.call(api, |bus| bus.set_object(key, &payload.to_json()))
    }

    fn set_parameters(&self, api: &str, command: ParametersCommand) -> Result<(), EngineError> {
        self.call(api, |bus| bus.set_parameters(&command.to_json()))
    }

    // Audio

    pub fn mute_local_audio_stream(&self, mute: bool) -> Result<(), EngineError> {
        self.set_parameters(
            "mute_local_audio_stream",
            ParametersCommand::new()
                .set(RTC_AUDIO_MUTE_ME, mute)
                .set(CHE_AUDIO_MUTE_ME, mute),
        )
    }

    pub fn mute_all_remote_audio_streams(&self, mute: bool) -> Result<(), EngineError> {
        self.set_bool("mute_all_remote_audio_streams", RTC_AUDIO_MUTE_PEERS, mute)
    }

    pub fn mute_remote_audio_stream(&self, uid: Uid, mute: bool) -> Result<(), EngineError> {
        self.set_object(
            "mute_remote_audio_stream",
            RTC_AUDIO_MUTE_PEER,
            ObjectCommand::new().field("uid", uid).field("mute", mute),
        )
    }

    /// Playback volume in `0..=255`.
    pub fn set_playback_device_volume(&self, volume: i32) -> Result<(), EngineError> {
        self.call("set_playback_device_volume", |bus| {
            if !(0..=MAX_PLAYBACK_VOLUME).contains(&volume) {
                return Err(EngineError::invalid_argument(format!(
                    "playback volume {} outside 0..={}",
                    volume, MAX_PLAYBACK_VOLUME
                )));
            }
            bus.set_int(CHE_AUDIO_OUTPUT_VOLUME, volume)
        })
    }

    /// Periodic speaker volume reports. An interval `<= 0` disables them.
    pub fn enable_audio_volume_indication(&self, interval_ms: i32, smooth: i32) -> Result<(), EngineError> {
        self.set_object(
            "enable_audio_volume_indication",
            CHE_AUDIO_VOLUME_INDICATION,
            ObjectCommand::new()
                .field("interval", interval_ms.max(0))
                .field("smooth", smooth),
        )
    }

    pub fn start_audio_recording(
        &self,
        file_path: &str,
        quality: AudioRecordingQuality,
    ) -> Result<(), EngineError> {
        self.call("start_audio_recording", |bus| {
            if file_path.is_empty() {
                return Err(EngineError::invalid_argument("recording path is empty"));
            }
            let payload = ObjectCommand::new()
                .field("filePath", file_path)
                .field("quality", quality as i32);
            bus.set_object(CHE_AUDIO_START_RECORDING, &payload.to_json())
        })
    }

    pub fn stop_audio_recording(&self) -> Result<(), EngineError> {
        self.set_bool("stop_audio_recording", CHE_AUDIO_STOP_RECORDING, true)
    }

    // Audio mixing

    /// Mix `file_path` into the local stream.
    ///
    /// `cycle` is the number of plays, `-1` loops forever.
    pub fn start_audio_mixing(
        &self,
        file_path: &str,
        loopback: bool,
        replace: bool,
        cycle: i32,
    ) -> Result<(), EngineError> {
        self.call("start_audio_mixing", |bus| {
            if file_path.is_empty() {
                return Err(EngineError::invalid_argument("mixing file path is empty"));
            }
            let payload = ObjectCommand::new()
                .field("filePath", file_path)
                .field("loopback", loopback)
                .field("replace", replace)
                .field("cycle", cycle);
            bus.set_object(CHE_AUDIO_START_FILE_AS_PLAYOUT, &payload.to_json())
        })
    }

    pub fn stop_audio_mixing(&self) -> Result<(), EngineError> {
        self.set_bool("stop_audio_mixing", CHE_AUDIO_STOP_FILE_AS_PLAYOUT, true)
    }

    pub fn pause_audio_mixing(&self) -> Result<(), EngineError> {
        self.set_bool("pause_audio_mixing", CHE_AUDIO_PAUSE_FILE_AS_PLAYOUT, true)
    }

    pub fn resume_audio_mixing(&self) -> Result<(), EngineError> {
        self.set_bool("resume_audio_mixing", CHE_AUDIO_PAUSE_FILE_AS_PLAYOUT, false)
    }

    pub fn adjust_audio_mixing_volume(&self, volume: i32) -> Result<(), EngineError> {
        self.set_int("adjust_audio_mixing_volume", CHE_AUDIO_SET_FILE_AS_PLAYOUT_VOLUME, volume)
    }

    /// Length of the mixing file in milliseconds.
    pub fn audio_mixing_duration(&self) -> Result<i32, EngineError> {
        self.call("audio_mixing_duration", |bus| {
            bus.get_int(CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS)
        })
    }

    /// Playback position in the mixing file, in milliseconds.
    pub fn audio_mixing_current_position(&self) -> Result<i32, EngineError> {
        self.call("audio_mixing_current_position", |bus| {
            bus.get_int(CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS)
        })
    }

    pub fn set_audio_mixing_position(&self, position_ms: i32) -> Result<(), EngineError> {
        self.set_int("set_audio_mixing_position", CHE_AUDIO_MIXING_FILE_POSITION, position_ms)
    }

    // Video

    pub fn mute_local_video_stream(&self, mute: bool) -> Result<(), EngineError> {
        self.set_parameters(
            "mute_local_video_stream",
            ParametersCommand::new()
                .set(RTC_VIDEO_MUTE_ME, mute)
                .set(CHE_VIDEO_LOCAL_SEND, !mute),
        )
    }

    /// Capture, render and send the local video together.
    pub fn enable_local_video(&self, enabled: bool) -> Result<(), EngineError> {
        self.set_parameters(
            "enable_local_video",
            ParametersCommand::new()
                .set(RTC_VIDEO_CAPTURE, enabled)
                .set(CHE_VIDEO_LOCAL_CAPTURE, enabled)
                .set(CHE_VIDEO_LOCAL_RENDER, enabled)
                .set(CHE_VIDEO_LOCAL_SEND, enabled),
        )
    }

    pub fn mute_all_remote_video_streams(&self, mute: bool) -> Result<(), EngineError> {
        self.set_bool("mute_all_remote_video_streams", RTC_VIDEO_MUTE_PEERS, mute)
    }

    pub fn mute_remote_video_stream(&self, uid: Uid, mute: bool) -> Result<(), EngineError> {
        self.set_object(
            "mute_remote_video_stream",
            RTC_VIDEO_MUTE_PEER,
            ObjectCommand::new().field("uid", uid).field("mute", mute),
        )
    }

    pub fn set_local_render_mode(&self, mode: RenderMode) -> Result<(), EngineError> {
        self.set_remote_render_mode(0, mode)
    }

    pub fn set_remote_render_mode(&self, uid: Uid, mode: RenderMode) -> Result<(), EngineError> {
        self.set_object(
            "set_render_mode",
            CHE_VIDEO_RENDER_MODE,
            ObjectCommand::new().field("uid", uid).field("mode", mode as i32),
        )
    }

    pub fn enable_local_video_capture(&self, enabled: bool) -> Result<(), EngineError> {
        self.set_bool("enable_local_video_capture", CHE_VIDEO_LOCAL_CAPTURE, enabled)
    }

    pub fn enable_local_video_render(&self, enabled: bool) -> Result<(), EngineError> {
        self.set_bool("enable_local_video_render", CHE_VIDEO_LOCAL_RENDER, enabled)
    }

    pub fn enable_local_video_send(&self, enabled: bool) -> Result<(), EngineError> {
        self.mute_local_video_stream(!enabled)
    }

    pub fn stop_all_remote_video(&self) -> Result<(), EngineError> {
        self.set_bool("stop_all_remote_video", CHE_VIDEO_PEER_STOP_RENDER, true)
    }

    // Logging

    pub fn set_log_file(&self, file_path: &str) -> Result<(), EngineError> {
        self.call("set_log_file", |bus| bus.set_string(RTC_LOG_FILE, file_path))
    }

    /// Bits outside [`LogLevel::MASK`] are dropped.
    pub fn set_log_filter(&self, filter: u32) -> Result<(), EngineError> {
        self.call("set_log_filter", |bus| {
            bus.set_uint(RTC_LOG_FILTER, filter & LogLevel::MASK)
        })
    }
}

impl std::fmt::Debug for RtcEngineParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcEngineParameters")
            .field("bound", &self.is_bound())
            .finish()
    }
}
