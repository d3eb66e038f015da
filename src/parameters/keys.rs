//! Parameter keys with a fixed meaning, and the value shape each expects.
//!
//! Keys are wire contract: `rtc.*` for session-level concepts, `che.*` for the
//! underlying media engine. Keys not listed here are accepted as-is.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::EngineError;

pub const RTC_AUDIO_MUTE_ME: &str = "rtc.audio.mute_me";
pub const CHE_AUDIO_MUTE_ME: &str = "che.audio.mute_me";
pub const RTC_AUDIO_MUTE_PEERS: &str = "rtc.audio.mute_peers";
pub const RTC_AUDIO_MUTE_PEER: &str = "rtc.audio.mute_peer";

pub const RTC_VIDEO_MUTE_ME: &str = "rtc.video.mute_me";
pub const RTC_VIDEO_MUTE_PEERS: &str = "rtc.video.mute_peers";
pub const RTC_VIDEO_MUTE_PEER: &str = "rtc.video.mute_peer";
pub const RTC_VIDEO_CAPTURE: &str = "rtc.video.capture";
pub const CHE_VIDEO_LOCAL_CAPTURE: &str = "che.video.local.capture";
pub const CHE_VIDEO_LOCAL_RENDER: &str = "che.video.local.render";
pub const CHE_VIDEO_LOCAL_SEND: &str = "che.video.local.send";
pub const CHE_VIDEO_PEER_STOP_RENDER: &str = "che.video.peer.stop_render";
pub const CHE_VIDEO_RENDER_MODE: &str = "che.video.render_mode";

pub const CHE_AUDIO_OUTPUT_VOLUME: &str = "che.audio.output.volume";
pub const CHE_AUDIO_VOLUME_INDICATION: &str = "che.audio.volume_indication";
pub const CHE_AUDIO_START_RECORDING: &str = "che.audio.start_recording";
pub const CHE_AUDIO_STOP_RECORDING: &str = "che.audio.stop_recording";

pub const CHE_AUDIO_START_FILE_AS_PLAYOUT: &str = "che.audio.start_file_as_playout";
pub const CHE_AUDIO_STOP_FILE_AS_PLAYOUT: &str = "che.audio.stop_file_as_playout";
pub const CHE_AUDIO_PAUSE_FILE_AS_PLAYOUT: &str = "che.audio.pause_file_as_playout";
pub const CHE_AUDIO_SET_FILE_AS_PLAYOUT_VOLUME: &str = "che.audio.set_file_as_playout_volume";
pub const CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS: &str = "che.audio.get_mixing_file_length_ms";
pub const CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS: &str = "che.audio.get_mixing_file_played_ms";
pub const CHE_AUDIO_MIXING_FILE_POSITION: &str = "che.audio.mixing.file.position";

pub const RTC_LOG_FILE: &str = "rtc.log_file";
pub const RTC_LOG_FILTER: &str = "rtc.log_filter";

/// Expected JSON shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Bool,
    Int,
    UInt,
    Number,
    String,
    /// Object that must carry at least the listed fields.
    Object(&'static [(&'static str, ValueShape)]),
}

impl ValueShape {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueShape::Bool => value.is_boolean(),
            ValueShape::Int => value
                .as_i64()
                .map_or(false, |n| i32::try_from(n).is_ok()),
            ValueShape::UInt => value
                .as_u64()
                .map_or(false, |n| u32::try_from(n).is_ok()),
            ValueShape::Number => value.is_number(),
            ValueShape::String => value.is_string(),
            ValueShape::Object(fields) => match value.as_object() {
                Some(object) => fields.iter().all(|(name, shape)| {
                    object.get(*name).map_or(false, |field| shape.matches(field))
                }),
                None => false,
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ValueShape::Bool => "bool".to_string(),
            ValueShape::Int => "int".to_string(),
            ValueShape::UInt => "uint".to_string(),
            ValueShape::Number => "number".to_string(),
            ValueShape::String => "string".to_string(),
            ValueShape::Object(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(name, shape)| format!("\"{}\":{}", name, shape.describe()))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }
}

const PEER_MUTE: &[(&str, ValueShape)] = &[("uid", ValueShape::UInt), ("mute", ValueShape::Bool)];

const VOLUME_INDICATION: &[(&str, ValueShape)] =
    &[("interval", ValueShape::Int), ("smooth", ValueShape::Int)];

const START_RECORDING: &[(&str, ValueShape)] =
    &[("filePath", ValueShape::String), ("quality", ValueShape::Int)];

const START_FILE_AS_PLAYOUT: &[(&str, ValueShape)] = &[
    ("filePath", ValueShape::String),
    ("loopback", ValueShape::Bool),
    ("replace", ValueShape::Bool),
    ("cycle", ValueShape::Int),
];

const RENDER_MODE: &[(&str, ValueShape)] = &[("uid", ValueShape::UInt), ("mode", ValueShape::Int)];

static KNOWN_KEYS: Lazy<HashMap<&'static str, ValueShape>> = Lazy::new(|| {
    HashMap::from([
        (RTC_AUDIO_MUTE_ME, ValueShape::Bool),
        (CHE_AUDIO_MUTE_ME, ValueShape::Bool),
        (RTC_AUDIO_MUTE_PEERS, ValueShape::Bool),
        (RTC_AUDIO_MUTE_PEER, ValueShape::Object(PEER_MUTE)),
        (RTC_VIDEO_MUTE_ME, ValueShape::Bool),
        (RTC_VIDEO_MUTE_PEERS, ValueShape::Bool),
        (RTC_VIDEO_MUTE_PEER, ValueShape::Object(PEER_MUTE)),
        (RTC_VIDEO_CAPTURE, ValueShape::Bool),
        (CHE_VIDEO_LOCAL_CAPTURE, ValueShape::Bool),
        (CHE_VIDEO_LOCAL_RENDER, ValueShape::Bool),
        (CHE_VIDEO_LOCAL_SEND, ValueShape::Bool),
        (CHE_VIDEO_PEER_STOP_RENDER, ValueShape::Bool),
        (CHE_VIDEO_RENDER_MODE, ValueShape::Object(RENDER_MODE)),
        (CHE_AUDIO_OUTPUT_VOLUME, ValueShape::Int),
        (CHE_AUDIO_VOLUME_INDICATION, ValueShape::Object(VOLUME_INDICATION)),
        (CHE_AUDIO_START_RECORDING, ValueShape::Object(START_RECORDING)),
        (CHE_AUDIO_STOP_RECORDING, ValueShape::Bool),
        (CHE_AUDIO_START_FILE_AS_PLAYOUT, ValueShape::Object(START_FILE_AS_PLAYOUT)),
        (CHE_AUDIO_STOP_FILE_AS_PLAYOUT, ValueShape::Bool),
        (CHE_AUDIO_PAUSE_FILE_AS_PLAYOUT, ValueShape::Bool),
        (CHE_AUDIO_SET_FILE_AS_PLAYOUT_VOLUME, ValueShape::Int),
        (CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS, ValueShape::Int),
        (CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS, ValueShape::Int),
        (CHE_AUDIO_MIXING_FILE_POSITION, ValueShape::Int),
        (RTC_LOG_FILE, ValueShape::String),
        (RTC_LOG_FILTER, ValueShape::UInt),
    ])
});

/// Shape registered for `key`, if it is one of the known keys.
pub fn shape_of(key: &str) -> Option<ValueShape> {
    KNOWN_KEYS.get(key).copied()
}

/// Check `value` against the shape registered for `key`.
pub fn check_shape(key: &str, value: &Value) -> Result<(), EngineError> {
    match shape_of(key) {
        Some(shape) if !shape.matches(value) => Err(EngineError::invalid_argument(format!(
            "'{}' expects {}, got {}",
            key,
            shape.describe(),
            value
        ))),
        _ => Ok(()),
    }
}
