//! Statistics payloads carried by events.

use serde::{Deserialize, Serialize};

use crate::engine::types::{RemoteVideoStreamType, Uid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioVolumeInfo {
    pub uid: Uid,
    /// `0..=255`
    pub volume: u32,
}

/// Session totals, reported periodically and once more on leave.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RtcStats {
    pub duration_secs: u32,
    pub tx_bytes: u32,
    pub rx_bytes: u32,
    pub tx_kbitrate: u16,
    pub rx_kbitrate: u16,
    pub rx_audio_kbitrate: u16,
    pub tx_audio_kbitrate: u16,
    pub rx_video_kbitrate: u16,
    pub tx_video_kbitrate: u16,
    pub users: u32,
    pub cpu_app_usage: f64,
    pub cpu_total_usage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalVideoStats {
    pub sent_bitrate: i32,
    pub sent_frame_rate: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVideoStats {
    pub uid: Uid,
    pub delay_ms: i32,
    pub width: i32,
    pub height: i32,
    pub received_bitrate: i32,
    pub received_frame_rate: i32,
    pub rx_stream_type: RemoteVideoStreamType,
}

impl Default for RemoteVideoStats {
    fn default() -> Self {
        Self {
            uid: 0,
            delay_ms: 0,
            width: 0,
            height: 0,
            received_bitrate: 0,
            received_frame_rate: 0,
            rx_stream_type: RemoteVideoStreamType::High,
        }
    }
}
