// Integration tests for the engine surface
//
// These drive the public API only: capability queries, the parameter bus,
// device managers, events and both release modes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_engine_sdk::capability::DeviceInfo;
use rtc_engine_sdk::engine::types::{MediaDeviceType, Uid};
use rtc_engine_sdk::engine::{BackendCommand, BackendStartContext, LoopbackBackend, MediaBackend};
use rtc_engine_sdk::{
    AudioDeviceManagerHandle, EngineConfig, EngineContext, EngineError, InterfaceId,
    LifecycleState, ParameterHandle, QueryInterface, RtcEngine, RtcEngineEventHandler,
    VideoDeviceManagerHandle,
};
use serde_json::{json, Value};

/// Loopback backend that counts how often it is stopped and destroyed.
struct CountingBackend {
    inner: LoopbackBackend,
    stops: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl CountingBackend {
    fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let drops = Arc::new(AtomicUsize::new(0));
        let backend = Self {
            inner: LoopbackBackend::new(),
            stops: Arc::clone(&stops),
            drops: Arc::clone(&drops),
        };
        (backend, stops, drops)
    }
}

impl MediaBackend for CountingBackend {
    fn start(&self, ctx: BackendStartContext) -> Result<(), EngineError> {
        self.inner.start(ctx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }

    fn supports(&self, iid: InterfaceId) -> bool {
        self.inner.supports(iid)
    }

    fn apply_parameter(&self, key: &str, value: &Value) -> Result<(), EngineError> {
        self.inner.apply_parameter(key, value)
    }

    fn query_parameter(&self, key: &str) -> Option<Value> {
        self.inner.query_parameter(key)
    }

    fn execute(&self, command: BackendCommand) -> Result<(), EngineError> {
        self.inner.execute(command)
    }

    fn devices(&self, kind: MediaDeviceType) -> Vec<DeviceInfo> {
        self.inner.devices(kind)
    }
}

impl Drop for CountingBackend {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingHandler {
    joined: Mutex<Vec<(String, Uid)>>,
    warnings: Mutex<Vec<i32>>,
    load_success: AtomicUsize,
    left: AtomicUsize,
}

impl RtcEngineEventHandler for RecordingHandler {
    fn on_join_channel_success(&self, channel: &str, uid: Uid, _elapsed_ms: i32) {
        self.joined.lock().unwrap().push((channel.to_string(), uid));
    }

    fn on_warning(&self, warn: i32, _message: &str) {
        self.warnings.lock().unwrap().push(warn);
    }

    fn on_leave_channel(&self, _stats: &rtc_engine_sdk::events::RtcStats) {
        self.left.fetch_add(1, Ordering::SeqCst);
    }

    fn on_media_engine_load_success(&self) {
        self.load_success.fetch_add(1, Ordering::SeqCst);
    }
}

fn engine() -> RtcEngine {
    let engine = RtcEngine::from_config(EngineConfig::default());
    engine
        .initialize(EngineContext::new("integration").test_only(true))
        .expect("initialize");
    engine
}

#[test]
fn query_interface_matrix() {
    let engine = RtcEngine::from_config(EngineConfig::default());
    assert_eq!(
        engine.query_interface(InterfaceId::RtcEngineParameter).unwrap_err(),
        EngineError::NotReady
    );

    engine
        .initialize(EngineContext::new("integration"))
        .unwrap();
    for iid in [
        InterfaceId::AudioDeviceManager,
        InterfaceId::VideoDeviceManager,
        InterfaceId::RtcEngineParameter,
    ] {
        let capability = engine.query_interface(iid).unwrap();
        assert_eq!(capability.interface_id(), iid);
    }
    assert!(matches!(
        engine.query_interface(InterfaceId::MediaEngine),
        Err(EngineError::NotSupported { .. })
    ));
    assert!(matches!(
        engine.query_interface_raw(99),
        Err(EngineError::NotSupported { .. })
    ));
    // every capability above was a temporary and is already released
    assert_eq!(engine.live_capabilities(), 0);
}

#[test]
fn typed_values_round_trip_through_the_bus() {
    let engine = engine();
    let bus = ParameterHandle::try_acquire(&engine).unwrap();

    bus.with(|bus| {
        bus.set_bool("rtc.audio.mute_me", true).unwrap();
        bus.set_int("che.audio.output.volume", 200).unwrap();
        bus.set_uint("rtc.log_filter", 0x0f).unwrap();
        bus.set_number("custom.ratio", 0.25).unwrap();
        bus.set_string("rtc.log_file", "/tmp/agora \"quoted\".log").unwrap();
        bus.set_object("rtc.audio.mute_peer", "{\"uid\":42,\"mute\":true}")
            .unwrap();

        assert!(bus.get_bool("rtc.audio.mute_me").unwrap());
        assert_eq!(bus.get_int("che.audio.output.volume").unwrap(), 200);
        assert_eq!(bus.get_uint("rtc.log_filter").unwrap(), 0x0f);
        assert_eq!(bus.get_number("custom.ratio").unwrap(), 0.25);
        assert_eq!(
            bus.get_string("rtc.log_file").unwrap().as_str(),
            "/tmp/agora \"quoted\".log"
        );
        let peer: Value = serde_json::from_str(bus.get_object("rtc.audio.mute_peer").unwrap().as_str()).unwrap();
        assert_eq!(peer, json!({"uid": 42, "mute": true}));
    })
    .unwrap();
}

#[test]
fn getters_report_missing_and_mismatched_values() {
    let engine = engine();
    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    bus.with(|bus| {
        assert!(matches!(
            bus.get_bool("rtc.video.mute_me"),
            Err(EngineError::NotFound { .. })
        ));
        bus.set_string("custom.name", "abc").unwrap();
        assert!(matches!(
            bus.get_int("custom.name"),
            Err(EngineError::TypeMismatch { .. })
        ));
        assert!(matches!(
            bus.set_object("custom.obj", "[1,2]"),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            bus.set_number("custom.nan", f64::NAN),
            Err(EngineError::InvalidArgument { .. })
        ));
        // known keys are shape-checked
        assert!(matches!(
            bus.set_string("rtc.audio.mute_me", "yes"),
            Err(EngineError::InvalidArgument { .. })
        ));
    })
    .unwrap();
}

#[test]
fn set_parameters_applies_batch_and_keeps_last_duplicate() {
    let engine = engine();
    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    bus.with(|bus| {
        bus.set_bool("rtc.video.mute_me", false).unwrap();
        bus.set_parameters(
            "{\"rtc.audio.mute_me\":true,\"che.audio.output.volume\":10,\"che.audio.output.volume\":20}",
        )
        .unwrap();

        assert!(bus.get_bool("rtc.audio.mute_me").unwrap());
        assert_eq!(bus.get_int("che.audio.output.volume").unwrap(), 20);
        // untouched by the batch
        assert!(!bus.get_bool("rtc.video.mute_me").unwrap());
    })
    .unwrap();
}

#[test]
fn invalid_batch_applies_nothing() {
    let engine = engine();
    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    bus.with(|bus| {
        let result = bus.set_parameters("{\"rtc.audio.mute_me\":true,\"rtc.video.mute_me\":\"no\"}");
        assert!(matches!(result, Err(EngineError::InvalidArgument { .. })));
        assert!(matches!(
            bus.get_bool("rtc.audio.mute_me"),
            Err(EngineError::NotFound { .. })
        ));
        assert!(bus.set_parameters("not json").is_err());
    })
    .unwrap();
}

#[test]
fn profile_merge_overlays_and_replace_resets() {
    let engine = engine();
    engine
        .set_parameters("{\"rtc.audio.mute_me\":true,\"rtc.video.mute_me\":true}")
        .unwrap();

    engine
        .set_profile("{\"rtc.audio.mute_me\":false,\"rtc.log_file\":\"a.log\"}", true)
        .unwrap();
    let merged: Value = serde_json::from_str(engine.profile().unwrap().as_str()).unwrap();
    assert_eq!(
        merged,
        json!({"rtc.audio.mute_me": false, "rtc.video.mute_me": true, "rtc.log_file": "a.log"})
    );

    engine
        .set_profile("{\"rtc.log_file\":\"b.log\"}", false)
        .unwrap();
    let replaced: Value = serde_json::from_str(engine.profile().unwrap().as_str()).unwrap();
    assert_eq!(replaced, json!({"rtc.log_file": "b.log"}));

    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    assert!(matches!(
        bus.with(|bus| bus.get_bool("rtc.video.mute_me")).unwrap(),
        Err(EngineError::NotFound { .. })
    ));
}

#[test]
fn refused_profile_keeps_previous_settings() {
    let engine = engine();
    engine
        .set_parameters("{\"rtc.audio.mute_me\":true,\"rtc.log_file\":\"keep.log\"}")
        .unwrap();
    let before: Value = serde_json::from_str(engine.profile().unwrap().as_str()).unwrap();

    // the loopback backend refuses a mixing position while nothing is mixing
    for merge in [false, true] {
        assert_eq!(
            engine.set_profile(
                "{\"che.audio.mixing.file.position\":5,\"rtc.video.mute_me\":true}",
                merge
            ),
            Err(EngineError::Refused)
        );
        let after: Value = serde_json::from_str(engine.profile().unwrap().as_str()).unwrap();
        assert_eq!(after, before);
    }
}

#[test]
fn mixing_queries_are_missing_without_a_mixing_file() {
    let engine = engine();
    engine.set_profile("{\"rtc.log_file\":\"a.log\"}", false).unwrap();

    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    assert!(matches!(
        bus.with(|bus| bus.get_int("che.audio.get_mixing_file_length_ms")).unwrap(),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        bus.with(|bus| bus.get_int("che.audio.get_mixing_file_played_ms")).unwrap(),
        Err(EngineError::NotFound { .. })
    ));
}

#[test]
fn initial_profile_from_config_is_applied() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"{\"rtc.audio.mute_peers\":true}").unwrap();

    let mut config = EngineConfig::default();
    config.parameters.initial_profile = Some(file.path().to_path_buf());
    let engine = RtcEngine::from_config(config);
    engine.initialize(EngineContext::new("integration")).unwrap();

    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    assert_eq!(bus.with(|bus| bus.get_bool("rtc.audio.mute_peers")).unwrap(), Ok(true));
}

#[test]
fn handle_release_then_engine_release_destroys_everything_once() {
    let (backend, stops, drops) = CountingBackend::new();
    let engine = RtcEngine::with_backend(Arc::new(backend), EngineConfig::default());
    engine.initialize(EngineContext::new("integration")).unwrap();

    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    assert_eq!(engine.live_capabilities(), 1);
    bus.with(|bus| bus.set_bool("rtc.audio.mute_me", true)).unwrap().unwrap();
    assert_eq!(bus.with(|bus| bus.get_bool("rtc.audio.mute_me")).unwrap(), Ok(true));

    bus.reset(None);
    assert!(bus.is_null());
    assert_eq!(engine.live_capabilities(), 0);
    // resetting an empty handle is a no-op
    bus.reset(None);
    assert_eq!(engine.live_capabilities(), 0);

    let lifecycle = engine.lifecycle_handle();
    engine.release(true);
    assert_eq!(lifecycle.state(), LifecycleState::Released);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn handles_are_invalidated_as_soon_as_async_release_starts() {
    let engine = engine();
    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    let devices = AudioDeviceManagerHandle::try_acquire(&engine).unwrap();
    let lifecycle = engine.lifecycle_handle();

    engine.release(false);
    assert_ne!(lifecycle.state(), LifecycleState::Live);
    assert_eq!(
        bus.with(|bus| bus.get_bool("rtc.audio.mute_me")).unwrap_err(),
        EngineError::HandleInvalidated
    );
    assert_eq!(
        devices.with(|devices| devices.playback_device()).unwrap_err(),
        EngineError::HandleInvalidated
    );

    assert!(lifecycle.wait_released(Duration::from_secs(5)));
    assert_eq!(lifecycle.state(), LifecycleState::Released);
}

#[test]
fn events_reach_the_registered_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let engine = RtcEngine::from_config(EngineConfig::default());
    engine
        .initialize(EngineContext::new("integration").with_event_handler(handler.clone()))
        .unwrap();

    engine.join_channel(None, "demo_room", None, 0).unwrap();
    assert_eq!(
        engine.join_channel(None, "demo_room", None, 0),
        Err(EngineError::JoinChannelRejected)
    );
    assert!(matches!(
        engine.join_channel(None, "bad/name", None, 7),
        Err(EngineError::InvalidChannelName { .. })
    ));
    engine.leave_channel().unwrap();

    let bus = ParameterHandle::try_acquire(&engine).unwrap();
    bus.with(|bus| {
        bus.set_object(
            "che.audio.start_file_as_playout",
            "{\"filePath\":\"/definitely/missing.mp3\",\"loopback\":false,\"replace\":false,\"cycle\":1}",
        )
    })
    .unwrap()
    .unwrap();
    drop(bus);

    // sync release drains queued events before returning
    engine.release(true);

    assert_eq!(handler.load_success.load(Ordering::SeqCst), 1);
    let joined = handler.joined.lock().unwrap().clone();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].0, "demo_room");
    assert_ne!(joined[0].1, 0);
    assert_eq!(handler.left.load(Ordering::SeqCst), 1);
    assert_eq!(handler.warnings.lock().unwrap().as_slice(), &[701]);
}

#[test]
fn device_managers_select_and_validate_devices() {
    let engine = engine();
    let audio = AudioDeviceManagerHandle::try_acquire(&engine).unwrap();
    let video = VideoDeviceManagerHandle::try_acquire(&engine).unwrap();
    assert_eq!(engine.live_capabilities(), 2);

    audio
        .with(|audio| {
            let playback = audio.enumerate_playback_devices().unwrap();
            assert_eq!(playback.count(), 2);
            let second = playback.device(1).unwrap().id.clone();

            audio.set_playback_device(&second).unwrap();
            assert_eq!(audio.playback_device().unwrap(), second);

            assert!(matches!(
                audio.set_playback_device("no-such-device"),
                Err(EngineError::InvalidDevice { .. })
            ));
            assert!(matches!(
                audio.set_recording_device(&"x".repeat(600)),
                Err(EngineError::InvalidArgument { .. })
            ));

            audio.set_recording_device_volume(128).unwrap();
            assert_eq!(audio.recording_device_volume().unwrap(), 128);
            assert!(audio.set_recording_device_volume(256).is_err());

            audio.start_recording_device_test(100).unwrap();
            assert_eq!(
                audio.start_recording_device_test(100),
                Err(EngineError::AlreadyInUse)
            );
            audio.stop_recording_device_test().unwrap();
        })
        .unwrap();

    video
        .with(|video| {
            let cameras = video.enumerate_video_devices().unwrap();
            assert_eq!(cameras.count(), 1);
            assert_eq!(video.device().unwrap(), "loopback-camera-0");
        })
        .unwrap();

    drop(audio);
    drop(video);
    assert_eq!(engine.live_capabilities(), 0);
}

#[test]
fn typed_engine_methods_follow_backend_rules() {
    let engine = engine();
    assert_eq!(engine.start_preview(), Err(EngineError::Refused));
    engine.enable_video().unwrap();
    engine.start_preview().unwrap();
    engine.stop_preview().unwrap();

    assert_eq!(
        engine.set_client_role(rtc_engine_sdk::engine::types::ClientRole::Broadcaster, None),
        Err(EngineError::Refused)
    );
    engine
        .set_channel_profile(rtc_engine_sdk::engine::types::ChannelProfile::LiveBroadcasting)
        .unwrap();
    engine
        .set_client_role(rtc_engine_sdk::engine::types::ClientRole::Broadcaster, None)
        .unwrap();

    engine.enable_lastmile_test().unwrap();
    engine.disable_lastmile_test().unwrap();
    engine.enable_audio().unwrap();
    engine.disable_audio().unwrap();
}

#[test]
fn releasing_an_uninitialized_engine_completes() {
    let engine = RtcEngine::from_config(EngineConfig::default());
    let lifecycle = engine.lifecycle_handle();
    engine.release(true);
    assert_eq!(lifecycle.state(), LifecycleState::Released);
}

#[test]
fn dropping_an_engine_releases_it() {
    let (backend, stops, drops) = CountingBackend::new();
    let engine = RtcEngine::with_backend(Arc::new(backend), EngineConfig::default());
    engine.initialize(EngineContext::new("integration")).unwrap();
    let lifecycle = engine.lifecycle_handle();

    drop(engine);
    assert_eq!(lifecycle.state(), LifecycleState::Released);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}
