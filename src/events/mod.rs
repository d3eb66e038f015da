//! Engine-to-application notifications.
//!
//! Producers (the engine and its media backend) emit [`EngineEvent`] values
//! into an [`EventSink`]. The [`EventDispatcher`] delivers them on its own
//! thread to the single registered [`RtcEngineEventHandler`].

mod dispatcher;
mod handler;
pub mod stats;

pub use dispatcher::{EventDispatcher, EventSink};
pub use handler::{NoopEventHandler, RtcEngineEventHandler};
pub use stats::{AudioVolumeInfo, LocalVideoStats, RemoteVideoStats, RtcStats};

use crate::engine::types::{MediaDeviceState, MediaDeviceType, Quality, UserOfflineReason, Uid};

/// One notification, owned so it can cross to the dispatch thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    DebugCallback {
        kind: i32,
        opaque: String,
        arg1: i32,
        arg2: i32,
    },
    JoinChannelSuccess {
        channel: String,
        uid: Uid,
        elapsed_ms: i32,
    },
    RejoinChannelSuccess {
        channel: String,
        uid: Uid,
        elapsed_ms: i32,
    },
    Warning {
        code: i32,
        message: String,
    },
    Error {
        code: i32,
        message: String,
    },
    AudioQuality {
        uid: Uid,
        quality: Quality,
        delay_ms: u16,
        lost_percent: u16,
    },
    AudioVolumeIndication {
        speakers: Vec<AudioVolumeInfo>,
        total_volume: i32,
    },
    LeaveChannel(RtcStats),
    RtcStats(RtcStats),
    AudioDeviceStateChanged {
        device_id: String,
        device_type: MediaDeviceType,
        device_state: MediaDeviceState,
    },
    AudioMixingFinished,
    VideoDeviceStateChanged {
        device_id: String,
        device_type: MediaDeviceType,
        device_state: MediaDeviceState,
    },
    NetworkQuality {
        uid: Uid,
        tx_quality: Quality,
        rx_quality: Quality,
    },
    LastmileQuality(Quality),
    FirstLocalVideoFrame {
        width: i32,
        height: i32,
        elapsed_ms: i32,
    },
    FirstRemoteVideoDecoded {
        uid: Uid,
        width: i32,
        height: i32,
        elapsed_ms: i32,
    },
    VideoSizeChanged {
        uid: Uid,
        width: i32,
        height: i32,
        rotation: i32,
    },
    FirstRemoteVideoFrame {
        uid: Uid,
        width: i32,
        height: i32,
        elapsed_ms: i32,
    },
    UserJoined {
        uid: Uid,
        elapsed_ms: i32,
    },
    UserOffline {
        uid: Uid,
        reason: UserOfflineReason,
    },
    UserMuteAudio {
        uid: Uid,
        muted: bool,
    },
    UserMuteVideo {
        uid: Uid,
        muted: bool,
    },
    UserEnableVideo {
        uid: Uid,
        enabled: bool,
    },
    ApiCallExecuted {
        api: String,
        error: i32,
    },
    LocalVideoStats(LocalVideoStats),
    RemoteVideoStats(RemoteVideoStats),
    CameraReady,
    VideoStopped,
    ConnectionLost,
    ConnectionInterrupted,
    RefreshRecordingServiceStatus(i32),
    StreamMessage {
        uid: Uid,
        stream_id: i32,
        data: Vec<u8>,
    },
    StreamMessageError {
        uid: Uid,
        stream_id: i32,
        code: i32,
        missed: i32,
        cached: i32,
    },
    MediaEngineLoadSuccess,
    MediaEngineStartCallSuccess,
}

impl EngineEvent {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::DebugCallback { .. } => "debug_callback",
            EngineEvent::JoinChannelSuccess { .. } => "join_channel_success",
            EngineEvent::RejoinChannelSuccess { .. } => "rejoin_channel_success",
            EngineEvent::Warning { .. } => "warning",
            EngineEvent::Error { .. } => "error",
            EngineEvent::AudioQuality { .. } => "audio_quality",
            EngineEvent::AudioVolumeIndication { .. } => "audio_volume_indication",
            EngineEvent::LeaveChannel(_) => "leave_channel",
            EngineEvent::RtcStats(_) => "rtc_stats",
            EngineEvent::AudioDeviceStateChanged { .. } => "audio_device_state_changed",
            EngineEvent::AudioMixingFinished => "audio_mixing_finished",
            EngineEvent::VideoDeviceStateChanged { .. } => "video_device_state_changed",
            EngineEvent::NetworkQuality { .. } => "network_quality",
            EngineEvent::LastmileQuality(_) => "lastmile_quality",
            EngineEvent::FirstLocalVideoFrame { .. } => "first_local_video_frame",
            EngineEvent::FirstRemoteVideoDecoded { .. } => "first_remote_video_decoded",
            EngineEvent::VideoSizeChanged { .. } => "video_size_changed",
            EngineEvent::FirstRemoteVideoFrame { .. } => "first_remote_video_frame",
            EngineEvent::UserJoined { .. } => "user_joined",
            EngineEvent::UserOffline { .. } => "user_offline",
            EngineEvent::UserMuteAudio { .. } => "user_mute_audio",
            EngineEvent::UserMuteVideo { .. } => "user_mute_video",
            EngineEvent::UserEnableVideo { .. } => "user_enable_video",
            EngineEvent::ApiCallExecuted { .. } => "api_call_executed",
            EngineEvent::LocalVideoStats(_) => "local_video_stats",
            EngineEvent::RemoteVideoStats(_) => "remote_video_stats",
            EngineEvent::CameraReady => "camera_ready",
            EngineEvent::VideoStopped => "video_stopped",
            EngineEvent::ConnectionLost => "connection_lost",
            EngineEvent::ConnectionInterrupted => "connection_interrupted",
            EngineEvent::RefreshRecordingServiceStatus(_) => "refresh_recording_service_status",
            EngineEvent::StreamMessage { .. } => "stream_message",
            EngineEvent::StreamMessageError { .. } => "stream_message_error",
            EngineEvent::MediaEngineLoadSuccess => "media_engine_load_success",
            EngineEvent::MediaEngineStartCallSuccess => "media_engine_start_call_success",
        }
    }

    /// Invoke the matching callback on `handler`.
    pub fn deliver(&self, handler: &dyn RtcEngineEventHandler) {
        match self {
            EngineEvent::DebugCallback {
                kind,
                opaque,
                arg1,
                arg2,
            } => handler.on_debug_callback(*kind, opaque, *arg1, *arg2),
            EngineEvent::JoinChannelSuccess {
                channel,
                uid,
                elapsed_ms,
            } => handler.on_join_channel_success(channel, *uid, *elapsed_ms),
            EngineEvent::RejoinChannelSuccess {
                channel,
                uid,
                elapsed_ms,
            } => handler.on_rejoin_channel_success(channel, *uid, *elapsed_ms),
            EngineEvent::Warning { code, message } => handler.on_warning(*code, message),
            EngineEvent::Error { code, message } => handler.on_error(*code, message),
            EngineEvent::AudioQuality {
                uid,
                quality,
                delay_ms,
                lost_percent,
            } => handler.on_audio_quality(*uid, *quality, *delay_ms, *lost_percent),
            EngineEvent::AudioVolumeIndication {
                speakers,
                total_volume,
            } => handler.on_audio_volume_indication(speakers, *total_volume),
            EngineEvent::LeaveChannel(stats) => handler.on_leave_channel(stats),
            EngineEvent::RtcStats(stats) => handler.on_rtc_stats(stats),
            EngineEvent::AudioDeviceStateChanged {
                device_id,
                device_type,
                device_state,
            } => handler.on_audio_device_state_changed(device_id, *device_type, *device_state),
            EngineEvent::AudioMixingFinished => handler.on_audio_mixing_finished(),
            EngineEvent::VideoDeviceStateChanged {
                device_id,
                device_type,
                device_state,
            } => handler.on_video_device_state_changed(device_id, *device_type, *device_state),
            EngineEvent::NetworkQuality {
                uid,
                tx_quality,
                rx_quality,
            } => handler.on_network_quality(*uid, *tx_quality, *rx_quality),
            EngineEvent::LastmileQuality(quality) => handler.on_lastmile_quality(*quality),
            EngineEvent::FirstLocalVideoFrame {
                width,
                height,
                elapsed_ms,
            } => handler.on_first_local_video_frame(*width, *height, *elapsed_ms),
            EngineEvent::FirstRemoteVideoDecoded {
                uid,
                width,
                height,
                elapsed_ms,
            } => handler.on_first_remote_video_decoded(*uid, *width, *height, *elapsed_ms),
            EngineEvent::VideoSizeChanged {
                uid,
                width,
                height,
                rotation,
            } => handler.on_video_size_changed(*uid, *width, *height, *rotation),
            EngineEvent::FirstRemoteVideoFrame {
                uid,
                width,
                height,
                elapsed_ms,
            } => handler.on_first_remote_video_frame(*uid, *width, *height, *elapsed_ms),
            EngineEvent::UserJoined { uid, elapsed_ms } => handler.on_user_joined(*uid, *elapsed_ms),
            EngineEvent::UserOffline { uid, reason } => handler.on_user_offline(*uid, *reason),
            EngineEvent::UserMuteAudio { uid, muted } => handler.on_user_mute_audio(*uid, *muted),
            EngineEvent::UserMuteVideo { uid, muted } => handler.on_user_mute_video(*uid, *muted),
            EngineEvent::UserEnableVideo { uid, enabled } => {
                handler.on_user_enable_video(*uid, *enabled)
            }
            EngineEvent::ApiCallExecuted { api, error } => handler.on_api_call_executed(api, *error),
            EngineEvent::LocalVideoStats(stats) => handler.on_local_video_stats(stats),
            EngineEvent::RemoteVideoStats(stats) => handler.on_remote_video_stats(stats),
            EngineEvent::CameraReady => handler.on_camera_ready(),
            EngineEvent::VideoStopped => handler.on_video_stopped(),
            EngineEvent::ConnectionLost => handler.on_connection_lost(),
            EngineEvent::ConnectionInterrupted => handler.on_connection_interrupted(),
            EngineEvent::RefreshRecordingServiceStatus(status) => {
                handler.on_refresh_recording_service_status(*status)
            }
            EngineEvent::StreamMessage {
                uid,
                stream_id,
                data,
            } => handler.on_stream_message(*uid, *stream_id, data),
            EngineEvent::StreamMessageError {
                uid,
                stream_id,
                code,
                missed,
                cached,
            } => handler.on_stream_message_error(*uid, *stream_id, *code, *missed, *cached),
            EngineEvent::MediaEngineLoadSuccess => handler.on_media_engine_load_success(),
            EngineEvent::MediaEngineStartCallSuccess => {
                handler.on_media_engine_start_call_success()
            }
        }
    }
}
