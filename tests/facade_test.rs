// Parameter facade against a live engine

use std::io::Write;

use rtc_engine_sdk::engine::types::{AudioRecordingQuality, RenderMode};
use rtc_engine_sdk::{
    EngineConfig, EngineContext, EngineError, ParameterHandle, RtcEngine, RtcEngineParameters,
};
use serde_json::{json, Value};

fn engine() -> RtcEngine {
    let engine = RtcEngine::from_config(EngineConfig::default());
    engine
        .initialize(EngineContext::new("facade").test_only(true))
        .expect("initialize");
    engine
}

fn profile(engine: &RtcEngine) -> Value {
    serde_json::from_str(engine.profile().unwrap().as_str()).unwrap()
}

#[test]
fn facade_without_engine_is_not_initialized() {
    let engine = RtcEngine::from_config(EngineConfig::default());
    let facade = RtcEngineParameters::new(&engine);
    assert!(!facade.is_bound());
    assert_eq!(facade.mute_local_audio_stream(true), Err(EngineError::NotInitialized));
    assert_eq!(facade.audio_mixing_duration(), Err(EngineError::NotInitialized));
    assert_eq!(engine.live_capabilities(), 0);
}

#[test]
fn long_paths_reach_the_bus_untruncated() {
    let engine = engine();
    let facade = RtcEngineParameters::new(&engine);
    let path = format!("/recordings/{}\\\"end\".wav", "a".repeat(600));

    facade
        .start_audio_recording(&path, AudioRecordingQuality::High)
        .unwrap();

    let recording = &profile(&engine)["che.audio.start_recording"];
    assert_eq!(recording["filePath"], json!(path));
    assert_eq!(recording["quality"], json!(2));
}

#[test]
fn semantic_operations_write_their_keys() {
    let engine = engine();
    let facade = RtcEngineParameters::new(&engine);

    facade.mute_local_audio_stream(true).unwrap();
    facade.mute_remote_video_stream(9, true).unwrap();
    facade.enable_audio_volume_indication(-50, 3).unwrap();
    facade.set_local_render_mode(RenderMode::Fit).unwrap();
    facade.set_log_filter(0xffff_ffff).unwrap();
    facade.mute_local_video_stream(true).unwrap();

    let settings = profile(&engine);
    assert_eq!(settings["rtc.audio.mute_me"], json!(true));
    assert_eq!(settings["che.audio.mute_me"], json!(true));
    assert_eq!(settings["rtc.video.mute_peer"], json!({"uid": 9, "mute": true}));
    assert_eq!(settings["che.audio.volume_indication"], json!({"interval": 0, "smooth": 3}));
    assert_eq!(settings["che.video.render_mode"], json!({"uid": 0, "mode": 2}));
    assert_eq!(settings["rtc.log_filter"], json!(0x080f));
    assert_eq!(settings["rtc.video.mute_me"], json!(true));
    assert_eq!(settings["che.video.local.send"], json!(false));
}

#[test]
fn audio_mixing_reports_duration_and_position() {
    let engine = engine();
    let facade = RtcEngineParameters::new(&engine);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0u8; 16 * 1_000]).unwrap();
    let path = file.path().to_string_lossy().into_owned();

    facade.start_audio_mixing(&path, false, true, 1).unwrap();
    assert_eq!(facade.audio_mixing_duration().unwrap(), 1_000);
    assert_eq!(facade.audio_mixing_current_position().unwrap(), 0);

    facade.set_audio_mixing_position(400).unwrap();
    assert_eq!(facade.audio_mixing_current_position().unwrap(), 400);
    assert!(matches!(
        facade.set_audio_mixing_position(5_000),
        Err(EngineError::InvalidArgument { .. })
    ));

    facade.pause_audio_mixing().unwrap();
    facade.resume_audio_mixing().unwrap();
    facade.stop_audio_mixing().unwrap();
    assert!(matches!(facade.audio_mixing_duration(), Err(EngineError::NotFound { .. })));
    assert!(matches!(
        facade.audio_mixing_current_position(),
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(facade.set_audio_mixing_position(0), Err(EngineError::Refused));
}

#[test]
fn facade_stops_working_after_release() {
    let engine = engine();
    let facade = RtcEngineParameters::from_handle(ParameterHandle::acquire(&engine));
    facade.stop_all_remote_video().unwrap();

    engine.release(true);
    assert_eq!(facade.stop_all_remote_video(), Err(EngineError::HandleInvalidated));
}

#[test]
fn empty_paths_and_out_of_range_volume_are_invalid() {
    let engine = engine();
    let facade = RtcEngineParameters::new(&engine);

    assert!(matches!(
        facade.start_audio_recording("", AudioRecordingQuality::Low),
        Err(EngineError::InvalidArgument { .. })
    ));
    assert!(matches!(
        facade.start_audio_mixing("", false, false, 1),
        Err(EngineError::InvalidArgument { .. })
    ));
    assert!(matches!(
        facade.set_playback_device_volume(256),
        Err(EngineError::InvalidArgument { .. })
    ));
    facade.set_playback_device_volume(255).unwrap();

    let settings = profile(&engine);
    assert!(settings.get("che.audio.start_recording").is_none());
    assert!(settings.get("che.audio.start_file_as_playout").is_none());
}
