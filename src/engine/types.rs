//! Plain data carried by the typed engine methods and events.

use serde::{Deserialize, Serialize};

/// Remote or local user id. `0` addresses the local user.
pub type Uid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ChannelProfile {
    Communication = 0,
    LiveBroadcasting = 1,
    Game = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ClientRole {
    Broadcaster = 1,
    Audience = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RenderMode {
    Hidden = 1,
    Fit = 2,
    Adaptive = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum VideoMirrorMode {
    Auto = 0,
    Enabled = 1,
    Disabled = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AudioRecordingQuality {
    Low = 0,
    Medium = 1,
    High = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Quality {
    Unknown = 0,
    Down = 1,
    VeryBad = 2,
    Bad = 3,
    Poor = 4,
    Good = 5,
    Excellent = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum UserOfflineReason {
    Quit = 0,
    Dropped = 1,
    BecomeAudience = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RemoteVideoStreamType {
    High = 0,
    Low = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum MediaDeviceType {
    Unknown = -1,
    AudioPlayback = 0,
    AudioRecording = 1,
    VideoRender = 2,
    VideoCapture = 3,
}

/// Device state bits reported by the device-state events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum MediaDeviceState {
    Disabled = 1,
    Active = 1 << 1,
    Inactive = 1 << 2,
    Unplugged = 1 << 3,
}

/// Log filter bits accepted by `rtc.log_filter`.
pub struct LogLevel {}

impl LogLevel {
    pub const QUIET: u32 = 0x0000;
    pub const DEBUG: u32 = 0x080f;
    pub const INFO: u32 = 0x000f;
    pub const WARN: u32 = 0x000e;
    pub const ERROR: u32 = 0x000c;
    pub const CRITICAL: u32 = 0x0008;
    pub const MASK: u32 = 0x080f;
    pub const ALL: u32 = 0xffff;

    /// Map a filter value onto the `log` crate's level filter.
    pub fn to_level_filter(filter: u32) -> log::LevelFilter {
        let filter = filter & Self::MASK;
        if filter == Self::QUIET {
            log::LevelFilter::Off
        } else if filter & 0x0800 != 0 {
            log::LevelFilter::Debug
        } else if filter & 0x0001 != 0 {
            log::LevelFilter::Info
        } else if filter & 0x0002 != 0 {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Error
        }
    }
}

/// Video profiles: resolution, frame rate and bitrate presets.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum VideoProfile {
    P120 = 0,
    P120_3 = 2,
    P180 = 10,
    P180_3 = 12,
    P180_4 = 13,
    P240 = 20,
    P240_3 = 22,
    P240_4 = 23,
    P360 = 30,
    P360_3 = 32,
    P360_4 = 33,
    P360_6 = 35,
    P360_7 = 36,
    P360_8 = 37,
    P360_9 = 38,
    P360_10 = 39,
    P360_11 = 100,
    P480 = 40,
    P480_2 = 41,
    P480_3 = 42,
    P480_4 = 43,
    P480_6 = 45,
    P480_8 = 47,
    P480_9 = 48,
    P480_10 = 49,
    P720 = 50,
    P720_3 = 52,
    P720_5 = 54,
    P720_6 = 55,
    P1080 = 60,
    P1080_3 = 62,
    P1080_5 = 64,
    P1440 = 66,
    P1440_2 = 67,
    P4K = 70,
    P4K_3 = 72,
}

impl VideoProfile {
    pub const DEFAULT: VideoProfile = VideoProfile::P360;

    /// `(width, height, fps, kbps)`
    pub fn parameters(self) -> (u32, u32, u32, u32) {
        match self {
            VideoProfile::P120 => (160, 120, 15, 65),
            VideoProfile::P120_3 => (120, 120, 15, 50),
            VideoProfile::P180 => (320, 180, 15, 140),
            VideoProfile::P180_3 => (180, 180, 15, 100),
            VideoProfile::P180_4 => (240, 180, 15, 120),
            VideoProfile::P240 => (320, 240, 15, 200),
            VideoProfile::P240_3 => (240, 240, 15, 140),
            VideoProfile::P240_4 => (424, 240, 15, 220),
            VideoProfile::P360 => (640, 360, 15, 400),
            VideoProfile::P360_3 => (360, 360, 15, 260),
            VideoProfile::P360_4 => (640, 360, 30, 600),
            VideoProfile::P360_6 => (360, 360, 30, 400),
            VideoProfile::P360_7 => (480, 360, 15, 320),
            VideoProfile::P360_8 => (480, 360, 30, 490),
            VideoProfile::P360_9 => (640, 360, 15, 800),
            VideoProfile::P360_10 => (640, 360, 24, 800),
            VideoProfile::P360_11 => (640, 360, 24, 1000),
            VideoProfile::P480 => (640, 480, 15, 500),
            VideoProfile::P480_2 => (480, 640, 15, 500),
            VideoProfile::P480_3 => (480, 480, 15, 400),
            VideoProfile::P480_4 => (640, 480, 30, 750),
            VideoProfile::P480_6 => (480, 480, 30, 600),
            VideoProfile::P480_8 => (848, 480, 15, 610),
            VideoProfile::P480_9 => (848, 480, 30, 930),
            VideoProfile::P480_10 => (640, 480, 10, 400),
            VideoProfile::P720 => (1280, 720, 15, 1130),
            VideoProfile::P720_3 => (1280, 720, 30, 1710),
            VideoProfile::P720_5 => (960, 720, 15, 910),
            VideoProfile::P720_6 => (960, 720, 30, 1380),
            VideoProfile::P1080 => (1920, 1080, 15, 2080),
            VideoProfile::P1080_3 => (1920, 1080, 30, 3150),
            VideoProfile::P1080_5 => (1920, 1080, 60, 4780),
            VideoProfile::P1440 => (2560, 1440, 30, 4850),
            VideoProfile::P1440_2 => (2560, 1440, 60, 7350),
            VideoProfile::P4K => (3840, 2160, 30, 8910),
            VideoProfile::P4K_3 => (3840, 2160, 60, 13500),
        }
    }
}

/// Opaque platform view token. The engine never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCanvas {
    pub view: ViewHandle,
    pub render_mode: RenderMode,
    pub uid: Uid,
}

impl VideoCanvas {
    pub fn new(view: ViewHandle, render_mode: RenderMode, uid: Uid) -> Self {
        Self {
            view,
            render_mode,
            uid,
        }
    }
}

impl Default for VideoCanvas {
    fn default() -> Self {
        Self {
            view: ViewHandle::default(),
            render_mode: RenderMode::Hidden,
            uid: 0,
        }
    }
}
