use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::capability::DeviceInfo;
use crate::engine::types::{
    ChannelProfile, ClientRole, MediaDeviceType, Quality, Uid, VideoCanvas, VideoProfile,
};
use crate::error::{EngineError, WarningCode};
use crate::events::{AudioVolumeInfo, EngineEvent, EventSink, RtcStats};
use crate::parameters::keys;

use super::{BackendCommand, BackendStartContext, MediaBackend, SystemTimeSource, TimeSource};

/// Longest channel name accepted by `join_channel`.
pub const MAX_CHANNEL_NAME_LENGTH: usize = 64;

/// First uid handed out when a join asks the engine to pick one.
const FIRST_ASSIGNED_UID: Uid = 10_000;

/// Nominal mixing bitrate used to turn a file size into a duration.
const MIXING_BYTES_PER_MS: u64 = 16;

const MAX_DEVICE_VOLUME: i32 = 255;

struct JoinedChannel {
    name: String,
    uid: Uid,
    joined_at: Instant,
}

struct MixingFile {
    length_ms: i32,
    position_ms: i32,
    paused: bool,
}

struct LoopbackState {
    channel: Option<JoinedChannel>,
    profile: ChannelProfile,
    role: ClientRole,
    audio_enabled: bool,
    video_enabled: bool,
    preview: bool,
    lastmile_test: bool,
    video_profile: VideoProfile,
    swap_width_and_height: bool,
    local_canvas: Option<VideoCanvas>,
    remote_canvases: HashMap<Uid, VideoCanvas>,
    playback_test: bool,
    recording_test: bool,
    mixing: Option<MixingFile>,
}

impl Default for LoopbackState {
    fn default() -> Self {
        Self {
            channel: None,
            profile: ChannelProfile::Communication,
            role: ClientRole::Broadcaster,
            audio_enabled: true,
            video_enabled: false,
            preview: false,
            lastmile_test: false,
            video_profile: VideoProfile::DEFAULT,
            swap_width_and_height: false,
            local_canvas: None,
            remote_canvases: HashMap::new(),
            playback_test: false,
            recording_test: false,
            mixing: None,
        }
    }
}

/// In-process backend that simulates a media engine without any I/O.
///
/// Used by the CLI, by tests, and as the default backend. It keeps just
/// enough state to answer every command the way a real engine would and
/// reports results through the event sink.
pub struct LoopbackBackend {
    running: AtomicBool,
    events: Mutex<Option<EventSink>>,
    state: Mutex<LoopbackState>,
    time_source: Arc<dyn TimeSource>,
    next_uid: AtomicU32,
    stops: AtomicU64,
}

impl LoopbackBackend {
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource::default()))
    }

    pub fn with_time_source(time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            running: AtomicBool::new(false),
            events: Mutex::new(None),
            state: Mutex::new(LoopbackState::default()),
            time_source,
            next_uid: AtomicU32::new(FIRST_ASSIGNED_UID),
            stops: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of times `stop` ran.
    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    /// `(channel, uid)` of the current session, if joined.
    pub fn joined_channel(&self) -> Option<(String, Uid)> {
        self.state()
            .ok()?
            .channel
            .as_ref()
            .map(|channel| (channel.name.clone(), channel.uid))
    }

    fn state(&self) -> Result<MutexGuard<'_, LoopbackState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::lock_poisoned("loopback_state"))
    }

    fn emit(&self, event: EngineEvent) {
        let sink = match self.events.lock() {
            Ok(sink) => sink.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(EngineError::NotReady)
        }
    }

    fn elapsed_ms(&self, since: Instant) -> i32 {
        let elapsed = self.time_source.now().saturating_duration_since(since);
        i32::try_from(elapsed.as_millis()).unwrap_or(i32::MAX)
    }

    fn join(&self, channel_name: String, uid: Uid) -> Result<(), EngineError> {
        validate_channel_name(&channel_name)?;
        let requested_at = self.time_source.now();

        let mut state = self.state()?;
        if state.channel.is_some() {
            return Err(EngineError::JoinChannelRejected);
        }
        let uid = if uid == 0 {
            self.next_uid.fetch_add(1, Ordering::SeqCst)
        } else {
            uid
        };
        state.channel = Some(JoinedChannel {
            name: channel_name.clone(),
            uid,
            joined_at: requested_at,
        });
        state.lastmile_test = false;
        drop(state);

        log::info!("[LoopbackBackend] joined '{}' as uid {}", channel_name, uid);
        self.emit(EngineEvent::JoinChannelSuccess {
            channel: channel_name,
            uid,
            elapsed_ms: self.elapsed_ms(requested_at),
        });
        Ok(())
    }

    fn leave(&self) -> Result<(), EngineError> {
        let channel = self.state()?.channel.take().ok_or(EngineError::NotInChannel)?;
        let duration = self
            .time_source
            .now()
            .saturating_duration_since(channel.joined_at);

        log::info!("[LoopbackBackend] left '{}'", channel.name);
        self.emit(EngineEvent::LeaveChannel(RtcStats {
            duration_secs: u32::try_from(duration.as_secs()).unwrap_or(u32::MAX),
            users: 1,
            ..RtcStats::default()
        }));
        Ok(())
    }

    fn start_preview(&self) -> Result<(), EngineError> {
        let (width, height) = {
            let mut state = self.state()?;
            if !state.video_enabled {
                return Err(EngineError::Refused);
            }
            if state.preview {
                return Ok(());
            }
            state.preview = true;
            let (width, height, _, _) = state.video_profile.parameters();
            if state.swap_width_and_height {
                (height, width)
            } else {
                (width, height)
            }
        };

        self.emit(EngineEvent::CameraReady);
        self.emit(EngineEvent::FirstLocalVideoFrame {
            width: width as i32,
            height: height as i32,
            elapsed_ms: 0,
        });
        Ok(())
    }

    fn stop_preview(&self) -> Result<(), EngineError> {
        let was_running = std::mem::replace(&mut self.state()?.preview, false);
        if was_running {
            self.emit(EngineEvent::VideoStopped);
        }
        Ok(())
    }

    fn start_mixing(&self, value: &Value) -> Result<(), EngineError> {
        let path = value
            .get("filePath")
            .and_then(Value::as_str)
            .unwrap_or_default();

        // A missing file is advisory: the call succeeds and a warning follows.
        match std::fs::metadata(Path::new(path)) {
            Ok(metadata) if metadata.is_file() => {
                let length_ms = i32::try_from(metadata.len() / MIXING_BYTES_PER_MS).unwrap_or(i32::MAX);
                self.state()?.mixing = Some(MixingFile {
                    length_ms,
                    position_ms: 0,
                    paused: false,
                });
                log::debug!("[LoopbackBackend] mixing '{}' ({} ms)", path, length_ms);
            }
            _ => {
                self.state()?.mixing = None;
                log::warn!("[LoopbackBackend] cannot open mixing file '{}'", path);
                self.emit(EngineEvent::Warning {
                    code: WarningCode::AudioMixingOpenError.code(),
                    message: format!("cannot open audio mixing file '{}'", path),
                });
            }
        }
        Ok(())
    }

    fn stop_mixing(&self) -> Result<(), EngineError> {
        if self.state()?.mixing.take().is_some() {
            self.emit(EngineEvent::AudioMixingFinished);
        }
        Ok(())
    }

    fn device_test(&self, kind: MediaDeviceType, start: bool, interval_ms: i32) -> Result<(), EngineError> {
        let mut state = self.state()?;
        let running = match kind {
            MediaDeviceType::AudioRecording => &mut state.recording_test,
            _ => &mut state.playback_test,
        };
        if start && *running {
            return Err(EngineError::AlreadyInUse);
        }
        *running = start;
        drop(state);

        if start && kind == MediaDeviceType::AudioRecording {
            log::debug!("[LoopbackBackend] recording test every {} ms", interval_ms);
            self.emit(EngineEvent::AudioVolumeIndication {
                speakers: vec![AudioVolumeInfo { uid: 0, volume: 0 }],
                total_volume: 0,
            });
        }
        Ok(())
    }
}

impl Default for LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for LoopbackBackend {
    fn start(&self, ctx: BackendStartContext) -> Result<(), EngineError> {
        if ctx.app_id.trim().is_empty() {
            return Err(EngineError::InvalidAppId);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyInUse);
        }

        match self.events.lock() {
            Ok(mut events) => *events = Some(ctx.events),
            Err(poisoned) => *poisoned.into_inner() = Some(ctx.events),
        }
        log::info!(
            "[LoopbackBackend] started (test_only={})",
            ctx.test_only
        );
        Ok(())
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state() {
            *state = LoopbackState::default();
        }
        match self.events.lock() {
            Ok(mut events) => *events = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        log::info!("[LoopbackBackend] stopped");
    }

    fn apply_parameter(&self, key: &str, value: &Value) -> Result<(), EngineError> {
        self.ensure_running()?;
        match key {
            keys::CHE_AUDIO_START_FILE_AS_PLAYOUT => self.start_mixing(value),
            keys::CHE_AUDIO_STOP_FILE_AS_PLAYOUT if value.as_bool() == Some(true) => {
                self.stop_mixing()
            }
            keys::CHE_AUDIO_PAUSE_FILE_AS_PLAYOUT => {
                if let Some(mixing) = self.state()?.mixing.as_mut() {
                    mixing.paused = value.as_bool().unwrap_or(false);
                }
                Ok(())
            }
            keys::CHE_AUDIO_MIXING_FILE_POSITION => {
                let mut state = self.state()?;
                let mixing = state.mixing.as_mut().ok_or(EngineError::Refused)?;
                let position = value.as_i64().unwrap_or_default();
                if position < 0 || position > i64::from(mixing.length_ms) {
                    return Err(EngineError::invalid_argument(format!(
                        "mixing position {} outside 0..={}",
                        position, mixing.length_ms
                    )));
                }
                mixing.position_ms = position as i32;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn query_parameter(&self, key: &str) -> Option<Value> {
        let state = self.state().ok()?;
        // Without an open mixing file these keys have no live value.
        let mixing = state.mixing.as_ref()?;
        match key {
            keys::CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS => Some(json!(mixing.length_ms)),
            keys::CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS => Some(json!(mixing.position_ms)),
            _ => None,
        }
    }

    fn execute(&self, command: BackendCommand) -> Result<(), EngineError> {
        self.ensure_running()?;
        match command {
            BackendCommand::JoinChannel {
                channel_name, uid, ..
            } => self.join(channel_name, uid),
            BackendCommand::LeaveChannel => self.leave(),
            BackendCommand::SetChannelProfile(profile) => {
                let mut state = self.state()?;
                if state.channel.is_some() {
                    return Err(EngineError::Refused);
                }
                state.profile = profile;
                Ok(())
            }
            BackendCommand::SetClientRole { role, .. } => {
                let mut state = self.state()?;
                if state.profile != ChannelProfile::LiveBroadcasting {
                    return Err(EngineError::Refused);
                }
                state.role = role;
                Ok(())
            }
            BackendCommand::LastmileTest { enabled } => {
                {
                    let mut state = self.state()?;
                    if enabled && state.channel.is_some() {
                        return Err(EngineError::Refused);
                    }
                    state.lastmile_test = enabled;
                }
                if enabled {
                    self.emit(EngineEvent::LastmileQuality(Quality::Excellent));
                }
                Ok(())
            }
            BackendCommand::EnableVideo { enabled } => {
                self.state()?.video_enabled = enabled;
                if !enabled {
                    self.stop_preview()?;
                }
                Ok(())
            }
            BackendCommand::Preview { enabled: true } => self.start_preview(),
            BackendCommand::Preview { enabled: false } => self.stop_preview(),
            BackendCommand::SetVideoProfile {
                profile,
                swap_width_and_height,
            } => {
                let mut state = self.state()?;
                state.video_profile = profile;
                state.swap_width_and_height = swap_width_and_height;
                Ok(())
            }
            BackendCommand::SetupLocalVideo(canvas) => {
                self.state()?.local_canvas = Some(canvas);
                Ok(())
            }
            BackendCommand::SetupRemoteVideo(canvas) => {
                if canvas.uid == 0 {
                    return Err(EngineError::invalid_argument("remote canvas needs a non-zero uid"));
                }
                self.state()?.remote_canvases.insert(canvas.uid, canvas);
                Ok(())
            }
            BackendCommand::EnableAudio { enabled } => {
                self.state()?.audio_enabled = enabled;
                Ok(())
            }
            BackendCommand::SelectDevice { kind, id } => {
                if self.devices(kind).iter().any(|device| device.id == id) {
                    Ok(())
                } else {
                    Err(EngineError::InvalidDevice { id })
                }
            }
            BackendCommand::SetDeviceVolume { volume, .. } => {
                if (0..=MAX_DEVICE_VOLUME).contains(&volume) {
                    Ok(())
                } else {
                    Err(EngineError::invalid_argument(format!(
                        "device volume {} outside 0..={}",
                        volume, MAX_DEVICE_VOLUME
                    )))
                }
            }
            BackendCommand::PlaybackDeviceTest { test_audio_file } => {
                self.device_test(MediaDeviceType::AudioPlayback, test_audio_file.is_some(), 0)
            }
            BackendCommand::RecordingDeviceTest {
                indication_interval_ms,
            } => match indication_interval_ms {
                Some(interval) if interval <= 0 => Err(EngineError::invalid_argument(format!(
                    "indication interval {} must be positive",
                    interval
                ))),
                Some(interval) => self.device_test(MediaDeviceType::AudioRecording, true, interval),
                None => self.device_test(MediaDeviceType::AudioRecording, false, 0),
            },
        }
    }

    fn devices(&self, kind: MediaDeviceType) -> Vec<DeviceInfo> {
        match kind {
            MediaDeviceType::AudioPlayback => vec![
                DeviceInfo::new("Loopback Speaker", "loopback-playback-0"),
                DeviceInfo::new("Loopback Headset", "loopback-playback-1"),
            ],
            MediaDeviceType::AudioRecording => {
                vec![DeviceInfo::new("Loopback Microphone", "loopback-recording-0")]
            }
            MediaDeviceType::VideoCapture => {
                vec![DeviceInfo::new("Loopback Camera", "loopback-camera-0")]
            }
            MediaDeviceType::VideoRender | MediaDeviceType::Unknown => Vec::new(),
        }
    }
}

fn validate_channel_name(name: &str) -> Result<(), EngineError> {
    let allowed = |c: char| {
        c.is_ascii_alphanumeric() || c == ' ' || "!#$%&()+-:;<=.>?@[]^_{}|~,".contains(c)
    };
    if name.is_empty() || name.len() > MAX_CHANNEL_NAME_LENGTH || !name.chars().all(allowed) {
        return Err(EngineError::InvalidChannelName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Deterministic time source for tests and CLI runs.
///
/// Each call to `now()` advances by a fixed 10ms to guarantee monotonic,
/// reproducible timings.
pub struct StubTimeSource {
    start: Instant,
    offset_ms: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        let ms = self.offset_ms.fetch_add(10, Ordering::SeqCst);
        self.start + Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventDispatcher;

    fn started() -> (LoopbackBackend, EventDispatcher) {
        let dispatcher = EventDispatcher::new("loopback-test");
        let backend = LoopbackBackend::with_time_source(Arc::new(StubTimeSource::new()));
        backend
            .start(BackendStartContext {
                app_id: "app".into(),
                test_only: true,
                events: dispatcher.sink(),
            })
            .unwrap();
        (backend, dispatcher)
    }

    fn join(name: &str, uid: Uid) -> BackendCommand {
        BackendCommand::JoinChannel {
            channel_key: None,
            channel_name: name.into(),
            info: None,
            uid,
        }
    }

    #[test]
    fn commands_require_start() {
        let backend = LoopbackBackend::new();
        assert_eq!(backend.execute(BackendCommand::LeaveChannel), Err(EngineError::NotReady));
    }

    #[test]
    fn empty_app_id_is_rejected() {
        let backend = LoopbackBackend::new();
        let result = backend.start(BackendStartContext {
            app_id: " ".into(),
            test_only: true,
            events: EventSink::detached(),
        });
        assert_eq!(result, Err(EngineError::InvalidAppId));
        assert!(!backend.is_running());
    }

    #[test]
    fn join_assigns_uid_and_rejects_second_join() {
        let (backend, _dispatcher) = started();
        backend.execute(join("lobby", 0)).unwrap();
        assert_eq!(backend.joined_channel(), Some(("lobby".into(), FIRST_ASSIGNED_UID)));
        assert_eq!(backend.execute(join("other", 5)), Err(EngineError::JoinChannelRejected));
    }

    #[test]
    fn leave_without_join_fails() {
        let (backend, _dispatcher) = started();
        assert_eq!(backend.execute(BackendCommand::LeaveChannel), Err(EngineError::NotInChannel));
        backend.execute(join("lobby", 9)).unwrap();
        backend.execute(BackendCommand::LeaveChannel).unwrap();
        assert!(backend.joined_channel().is_none());
    }

    #[test]
    fn channel_names_are_validated() {
        assert!(validate_channel_name("room-1 (main)").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("bad/slash").is_err());
        assert!(validate_channel_name(&"x".repeat(MAX_CHANNEL_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn preview_requires_video() {
        let (backend, _dispatcher) = started();
        assert_eq!(
            backend.execute(BackendCommand::Preview { enabled: true }),
            Err(EngineError::Refused)
        );
        backend.execute(BackendCommand::EnableVideo { enabled: true }).unwrap();
        backend.execute(BackendCommand::Preview { enabled: true }).unwrap();
    }

    #[test]
    fn client_role_needs_live_profile() {
        let (backend, _dispatcher) = started();
        let role = BackendCommand::SetClientRole {
            role: ClientRole::Audience,
            permission_key: None,
        };
        assert_eq!(backend.execute(role.clone()), Err(EngineError::Refused));
        backend
            .execute(BackendCommand::SetChannelProfile(ChannelProfile::LiveBroadcasting))
            .unwrap();
        backend.execute(role).unwrap();
    }

    #[test]
    fn plain_settings_are_not_retained_by_the_backend() {
        let (backend, _dispatcher) = started();
        for volume in 0..10_000 {
            backend
                .apply_parameter(keys::CHE_AUDIO_OUTPUT_VOLUME, &json!(volume % 256))
                .unwrap();
        }
        assert_eq!(backend.query_parameter(keys::CHE_AUDIO_OUTPUT_VOLUME), None);
    }

    #[test]
    fn missing_mixing_file_is_advisory() {
        let (backend, _dispatcher) = started();
        let payload = json!({"filePath": "/definitely/not/here.mp3", "loopback": false, "replace": false, "cycle": 1});
        assert!(backend
            .apply_parameter(keys::CHE_AUDIO_START_FILE_AS_PLAYOUT, &payload)
            .is_ok());
        assert_eq!(backend.query_parameter(keys::CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS), None);
        assert_eq!(backend.query_parameter(keys::CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS), None);
    }

    #[test]
    fn mixing_position_tracks_file_length() {
        let (backend, _dispatcher) = started();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 16_000]).unwrap();

        let payload = json!({"filePath": file.path().to_str().unwrap(), "loopback": false, "replace": false, "cycle": 1});
        backend
            .apply_parameter(keys::CHE_AUDIO_START_FILE_AS_PLAYOUT, &payload)
            .unwrap();
        assert_eq!(
            backend.query_parameter(keys::CHE_AUDIO_GET_MIXING_FILE_LENGTH_MS),
            Some(json!(1000))
        );

        backend
            .apply_parameter(keys::CHE_AUDIO_MIXING_FILE_POSITION, &json!(250))
            .unwrap();
        assert_eq!(
            backend.query_parameter(keys::CHE_AUDIO_GET_MIXING_FILE_PLAYED_MS),
            Some(json!(250))
        );
        assert!(backend
            .apply_parameter(keys::CHE_AUDIO_MIXING_FILE_POSITION, &json!(1001))
            .is_err());
    }

    #[test]
    fn device_selection_and_volume_checks() {
        let (backend, _dispatcher) = started();
        backend
            .execute(BackendCommand::SelectDevice {
                kind: MediaDeviceType::AudioPlayback,
                id: "loopback-playback-1".into(),
            })
            .unwrap();
        assert_eq!(
            backend.execute(BackendCommand::SelectDevice {
                kind: MediaDeviceType::AudioPlayback,
                id: "nope".into(),
            }),
            Err(EngineError::InvalidDevice { id: "nope".into() })
        );
        assert!(backend
            .execute(BackendCommand::SetDeviceVolume {
                kind: MediaDeviceType::AudioRecording,
                volume: 300,
            })
            .is_err());
    }

    #[test]
    fn device_tests_cannot_overlap() {
        let (backend, _dispatcher) = started();
        let start = BackendCommand::RecordingDeviceTest {
            indication_interval_ms: Some(200),
        };
        backend.execute(start.clone()).unwrap();
        assert_eq!(backend.execute(start), Err(EngineError::AlreadyInUse));
        backend
            .execute(BackendCommand::RecordingDeviceTest {
                indication_interval_ms: None,
            })
            .unwrap();
    }

    #[test]
    fn stop_resets_state_once() {
        let (backend, _dispatcher) = started();
        backend.execute(join("lobby", 1)).unwrap();
        backend.stop();
        backend.stop();
        assert_eq!(backend.stop_count(), 1);
        assert!(backend.joined_channel().is_none());
    }

    #[test]
    fn stub_time_source_advances_by_ten_ms() {
        let source = StubTimeSource::new();
        let first = source.now();
        let second = source.now();
        assert_eq!(second.duration_since(first), Duration::from_millis(10));
    }
}
