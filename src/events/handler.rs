use crate::engine::types::{MediaDeviceState, MediaDeviceType, Quality, UserOfflineReason, Uid};
use crate::events::stats::{AudioVolumeInfo, LocalVideoStats, RemoteVideoStats, RtcStats};

/// Receiver for engine notifications.
///
/// Every method has an empty default, so implementors override only what
/// they care about. Callbacks run on the engine's dispatch thread, one at a
/// time. A panicking callback is logged and does not stop later events.
#[allow(unused_variables)]
pub trait RtcEngineEventHandler: Send + Sync {
    /// Diagnostic callback used by the media engine for internal tracing.
    fn on_debug_callback(&self, kind: i32, opaque: &str, arg1: i32, arg2: i32) {}

    fn on_join_channel_success(&self, channel: &str, uid: Uid, elapsed_ms: i32) {}

    fn on_rejoin_channel_success(&self, channel: &str, uid: Uid, elapsed_ms: i32) {}

    /// Advisory condition. The engine keeps running.
    fn on_warning(&self, warn: i32, message: &str) {}

    /// The engine could not recover without application action.
    fn on_error(&self, err: i32, message: &str) {}

    fn on_audio_quality(&self, uid: Uid, quality: Quality, delay_ms: u16, lost_percent: u16) {}

    fn on_audio_volume_indication(&self, speakers: &[AudioVolumeInfo], total_volume: i32) {}

    fn on_leave_channel(&self, stats: &RtcStats) {}

    fn on_rtc_stats(&self, stats: &RtcStats) {}

    fn on_audio_device_state_changed(
        &self,
        device_id: &str,
        device_type: MediaDeviceType,
        device_state: MediaDeviceState,
    ) {
    }

    fn on_audio_mixing_finished(&self) {}

    fn on_video_device_state_changed(
        &self,
        device_id: &str,
        device_type: MediaDeviceType,
        device_state: MediaDeviceState,
    ) {
    }

    fn on_network_quality(&self, uid: Uid, tx_quality: Quality, rx_quality: Quality) {}

    fn on_lastmile_quality(&self, quality: Quality) {}

    fn on_first_local_video_frame(&self, width: i32, height: i32, elapsed_ms: i32) {}

    fn on_first_remote_video_decoded(&self, uid: Uid, width: i32, height: i32, elapsed_ms: i32) {}

    fn on_video_size_changed(&self, uid: Uid, width: i32, height: i32, rotation: i32) {}

    fn on_first_remote_video_frame(&self, uid: Uid, width: i32, height: i32, elapsed_ms: i32) {}

    fn on_user_joined(&self, uid: Uid, elapsed_ms: i32) {}

    fn on_user_offline(&self, uid: Uid, reason: UserOfflineReason) {}

    fn on_user_mute_audio(&self, uid: Uid, muted: bool) {}

    fn on_user_mute_video(&self, uid: Uid, muted: bool) {}

    fn on_user_enable_video(&self, uid: Uid, enabled: bool) {}

    /// A typed engine method finished. `error` is `0` or a negated code.
    fn on_api_call_executed(&self, api: &str, error: i32) {}

    fn on_local_video_stats(&self, stats: &LocalVideoStats) {}

    fn on_remote_video_stats(&self, stats: &RemoteVideoStats) {}

    fn on_camera_ready(&self) {}

    fn on_video_stopped(&self) {}

    fn on_connection_lost(&self) {}

    fn on_connection_interrupted(&self) {}

    fn on_refresh_recording_service_status(&self, status: i32) {}

    fn on_stream_message(&self, uid: Uid, stream_id: i32, data: &[u8]) {}

    fn on_stream_message_error(
        &self,
        uid: Uid,
        stream_id: i32,
        code: i32,
        missed: i32,
        cached: i32,
    ) {
    }

    fn on_media_engine_load_success(&self) {}

    fn on_media_engine_start_call_success(&self) {}
}

/// Handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

impl RtcEngineEventHandler for NoopEventHandler {}
