//! RtcEngine: root object of the SDK surface.
//!
//! Owns the media backend, the event dispatcher and the three-state
//! lifecycle, answers capability queries and forwards the typed engine
//! methods to the backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crate::capability::{AnyCapability, InterfaceId, QueryInterface};
use crate::config::EngineConfig;
use crate::engine::backend::{BackendCommand, BackendStartContext, LoopbackBackend, MediaBackend};
use crate::engine::inner::EngineCore;
use crate::engine::lifecycle::{Lifecycle, LifecycleState};
use crate::engine::proxies::{AudioDeviceManagerProxy, ParameterBusProxy, VideoDeviceManagerProxy};
use crate::engine::types::{ChannelProfile, ClientRole, Uid, VideoCanvas, VideoProfile};
use crate::error::{log_engine_error, EngineError};
use crate::events::{EngineEvent, EventDispatcher, RtcEngineEventHandler};
use crate::handle::StringHandle;
use crate::parameters::ParameterStore;
use crate::telemetry::{LifecyclePhase, TelemetryCollector, TelemetrySnapshot};

/// Poll interval while teardown waits for in-flight capability calls.
const IN_FLIGHT_POLL: Duration = Duration::from_millis(1);

/// Initialization parameters.
#[derive(Clone, Default)]
pub struct EngineContext {
    pub app_id: String,
    /// Receives every engine event; `None` discards them.
    pub event_handler: Option<Arc<dyn RtcEngineEventHandler>>,
    /// Skip anything that would touch real devices.
    pub test_only: bool,
}

impl EngineContext {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn RtcEngineEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn test_only(mut self, test_only: bool) -> Self {
        self.test_only = test_only;
        self
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("app_id", &self.app_id)
            .field("event_handler", &self.event_handler.is_some())
            .field("test_only", &self.test_only)
            .finish()
    }
}

/// Root engine object.
///
/// Not usable until [`initialize`](Self::initialize) succeeds. Release it
/// with [`release`](Self::release); dropping an engine that was never
/// released performs a synchronous release.
pub struct RtcEngine {
    config: EngineConfig,
    backend: Arc<dyn MediaBackend>,
    core: RwLock<Option<Arc<EngineCore>>>,
    dispatcher: Arc<EventDispatcher>,
    lifecycle: Arc<Lifecycle>,
    telemetry: Arc<TelemetryCollector>,
    live_capabilities: Arc<AtomicUsize>,
}

impl RtcEngine {
    /// Create an engine on the loopback backend with the platform config.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(LoopbackBackend::new()), EngineConfig::load())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self::with_backend(Arc::new(LoopbackBackend::new()), config)
    }

    pub fn with_backend(backend: Arc<dyn MediaBackend>, config: EngineConfig) -> Self {
        let telemetry = Arc::new(TelemetryCollector::from_config(&config.telemetry));
        telemetry.record_lifecycle(LifecyclePhase::Created);

        Self {
            dispatcher: Arc::new(EventDispatcher::new(config.events.thread_name.clone())),
            config,
            backend,
            core: RwLock::new(None),
            lifecycle: Arc::new(Lifecycle::new()),
            telemetry,
            live_capabilities: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Shared lifecycle, usable to await completion of an async release.
    pub fn lifecycle_handle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.is_live() && self.current_core().is_some()
    }

    /// Capability references handed out and not yet released.
    pub fn live_capabilities(&self) -> usize {
        self.live_capabilities.load(Ordering::SeqCst)
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    fn current_core(&self) -> Option<Arc<EngineCore>> {
        match self.core.read() {
            Ok(core) => core.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn live_core(&self) -> Result<Arc<EngineCore>, EngineError> {
        if !self.lifecycle.is_live() {
            return Err(EngineError::NotReady);
        }
        self.current_core().ok_or(EngineError::NotReady)
    }

    /// Bring the engine up.
    ///
    /// Calling it again on an initialized engine only replaces the event
    /// handler.
    ///
    /// # Errors
    /// - `InvalidAppId` for an empty app id
    /// - `NotReady` once a release was requested
    /// - whatever the backend reports from `start`
    pub fn initialize(&self, context: EngineContext) -> Result<(), EngineError> {
        if !self.lifecycle.is_live() {
            return Err(EngineError::NotReady);
        }
        if context.app_id.trim().is_empty() {
            log_engine_error(&EngineError::InvalidAppId, "initialize");
            return Err(EngineError::InvalidAppId);
        }

        let mut slot = self
            .core
            .write()
            .map_err(|_| EngineError::lock_poisoned("engine_core"))?;

        self.dispatcher.set_handler(context.event_handler.clone());
        if slot.is_some() {
            log::info!("[RtcEngine] already initialized, event handler replaced");
            return Ok(());
        }

        self.backend.start(BackendStartContext {
            app_id: context.app_id.clone(),
            test_only: context.test_only,
            events: self.dispatcher.sink(),
        })?;
        self.dispatcher.start();

        let core = Arc::new(EngineCore::new(
            Arc::clone(&self.backend),
            ParameterStore::new(self.config.parameters.enforce_shapes),
            self.dispatcher.sink(),
            Arc::clone(&self.telemetry),
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.live_capabilities),
        ));

        if let Some(path) = self.config.parameters.initial_profile.as_ref() {
            match std::fs::read_to_string(path) {
                Ok(profile) => {
                    if let Err(err) = core.set_profile(&profile, false) {
                        log::warn!("[RtcEngine] initial profile {:?} rejected: {}", path, err);
                    }
                }
                Err(err) => {
                    log::warn!("[RtcEngine] cannot read initial profile {:?}: {}", path, err);
                }
            }
        }

        core.emit(EngineEvent::MediaEngineLoadSuccess);
        *slot = Some(core);
        drop(slot);

        self.telemetry.record_lifecycle(LifecyclePhase::Initialized);
        log::info!(
            "[RtcEngine] initialized (app_id={}, test_only={})",
            context.app_id,
            context.test_only
        );
        Ok(())
    }

    /// Install, replace (`Some`) or clear (`None`) the event handler.
    pub fn set_event_handler(&self, handler: Option<Arc<dyn RtcEngineEventHandler>>) {
        self.dispatcher.set_handler(handler);
    }

    pub fn event_handler(&self) -> Option<Arc<dyn RtcEngineEventHandler>> {
        self.dispatcher.handler()
    }

    /// Query by raw numeric identifier.
    pub fn query_interface_raw(&self, iid: i32) -> Result<AnyCapability, EngineError> {
        self.live_core()?;
        self.query_interface(InterfaceId::try_from(iid)?)
    }

    fn query(&self, iid: InterfaceId) -> Result<AnyCapability, EngineError> {
        let core = self.live_core()?;
        if iid == InterfaceId::MediaEngine || !core.backend().supports(iid) {
            return Err(EngineError::not_supported(format!("{:?}", iid)));
        }

        let capability = match iid {
            InterfaceId::RtcEngineParameter => {
                AnyCapability::Parameter(Box::new(ParameterBusProxy::new(&core)))
            }
            InterfaceId::AudioDeviceManager => {
                AnyCapability::AudioDeviceManager(Box::new(AudioDeviceManagerProxy::new(&core)))
            }
            InterfaceId::VideoDeviceManager => {
                AnyCapability::VideoDeviceManager(Box::new(VideoDeviceManagerProxy::new(&core)))
            }
            InterfaceId::MediaEngine => {
                return Err(EngineError::not_supported("media engine"));
            }
        };
        log::debug!("[RtcEngine] handed out {:?}", iid);
        Ok(capability)
    }

    // IRtcEngineEx parameter entry points

    pub fn set_parameters(&self, parameters: &str) -> Result<(), EngineError> {
        let result = self.live_core()?.set_parameters(parameters);
        if let Err(err) = &result {
            log_engine_error(err, "set_parameters");
        }
        result
    }

    pub fn set_profile(&self, profile: &str, merge: bool) -> Result<(), EngineError> {
        let result = self.live_core()?.set_profile(profile, merge);
        if let Err(err) = &result {
            log_engine_error(err, "set_profile");
        }
        result
    }

    /// Whole settings surface as one JSON object.
    pub fn profile(&self) -> Result<StringHandle, EngineError> {
        self.live_core()?.profile_json().map(StringHandle::from)
    }

    // Typed engine methods

    fn run(&self, command: BackendCommand) -> Result<(), EngineError> {
        match self.live_core() {
            Ok(core) => core.execute(command),
            Err(err) => {
                log_engine_error(&err, command.api_name());
                self.telemetry.record_api_call(command.api_name(), &Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Join `channel_name`. A `uid` of `0` lets the engine assign one,
    /// reported through `on_join_channel_success`.
    pub fn join_channel(
        &self,
        channel_key: Option<&str>,
        channel_name: &str,
        info: Option<&str>,
        uid: Uid,
    ) -> Result<(), EngineError> {
        self.run(BackendCommand::JoinChannel {
            channel_key: channel_key.map(str::to_string),
            channel_name: channel_name.to_string(),
            info: info.map(str::to_string),
            uid,
        })
    }

    pub fn leave_channel(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::LeaveChannel)
    }

    pub fn set_channel_profile(&self, profile: ChannelProfile) -> Result<(), EngineError> {
        self.run(BackendCommand::SetChannelProfile(profile))
    }

    pub fn set_client_role(&self, role: ClientRole, permission_key: Option<&str>) -> Result<(), EngineError> {
        self.run(BackendCommand::SetClientRole {
            role,
            permission_key: permission_key.map(str::to_string),
        })
    }

    pub fn enable_lastmile_test(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::LastmileTest { enabled: true })
    }

    pub fn disable_lastmile_test(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::LastmileTest { enabled: false })
    }

    pub fn enable_video(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::EnableVideo { enabled: true })
    }

    pub fn disable_video(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::EnableVideo { enabled: false })
    }

    pub fn start_preview(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::Preview { enabled: true })
    }

    pub fn stop_preview(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::Preview { enabled: false })
    }

    pub fn set_video_profile(&self, profile: VideoProfile, swap_width_and_height: bool) -> Result<(), EngineError> {
        self.run(BackendCommand::SetVideoProfile {
            profile,
            swap_width_and_height,
        })
    }

    pub fn setup_local_video(&self, canvas: VideoCanvas) -> Result<(), EngineError> {
        self.run(BackendCommand::SetupLocalVideo(canvas))
    }

    pub fn setup_remote_video(&self, canvas: VideoCanvas) -> Result<(), EngineError> {
        self.run(BackendCommand::SetupRemoteVideo(canvas))
    }

    pub fn enable_audio(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::EnableAudio { enabled: true })
    }

    pub fn disable_audio(&self) -> Result<(), EngineError> {
        self.run(BackendCommand::EnableAudio { enabled: false })
    }

    /// Release the engine.
    ///
    /// Every handle derived from this engine stops working immediately. With
    /// `sync = true` this returns once all resources are gone; with
    /// `sync = false` teardown continues on a background thread and
    /// [`Lifecycle::wait_released`] can be used to await it.
    pub fn release(self, sync: bool) {
        self.begin_teardown(sync);
    }

    fn begin_teardown(&self, sync: bool) {
        if !self.lifecycle.begin_release() {
            return;
        }
        self.telemetry.record_lifecycle(LifecyclePhase::ReleaseRequested);
        log::info!("[RtcEngine] release requested (sync={})", sync);

        let core = match self.core.write() {
            Ok(mut core) => core.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let teardown = Teardown {
            core,
            dispatcher: Arc::clone(&self.dispatcher),
            lifecycle: Arc::clone(&self.lifecycle),
            telemetry: Arc::clone(&self.telemetry),
        };

        if sync {
            teardown.run();
            return;
        }

        // Shared so the teardown survives a failed spawn.
        let pending = Arc::new(Mutex::new(Some(teardown)));
        let worker = Arc::clone(&pending);
        let spawned = thread::Builder::new()
            .name("rtc-engine-release".to_string())
            .spawn(move || {
                if let Some(teardown) = take_pending(&worker) {
                    teardown.run();
                }
            });
        if let Err(err) = spawned {
            log::warn!("[RtcEngine] cannot spawn release thread ({}), releasing inline", err);
            if let Some(teardown) = take_pending(&pending) {
                teardown.run();
            }
        }
    }
}

fn take_pending(pending: &Mutex<Option<Teardown>>) -> Option<Teardown> {
    match pending.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

impl Default for RtcEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryInterface for RtcEngine {
    fn query_interface(&self, iid: InterfaceId) -> Result<AnyCapability, EngineError> {
        let result = self.query(iid);
        self.telemetry.record_capability_query(iid, result.is_ok());
        if let Err(err) = &result {
            log::debug!("[RtcEngine] query_interface({:?}) failed: {}", iid, err);
        }
        result
    }

    fn lifecycle(&self) -> Option<Arc<Lifecycle>> {
        Some(Arc::clone(&self.lifecycle))
    }
}

impl Drop for RtcEngine {
    fn drop(&mut self) {
        self.begin_teardown(true);
    }
}

impl std::fmt::Debug for RtcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcEngine")
            .field("state", &self.lifecycle.state())
            .field("initialized", &self.current_core().is_some())
            .field("live_capabilities", &self.live_capabilities())
            .finish()
    }
}

/// Everything teardown needs, detached from the engine so it can run on
/// another thread.
struct Teardown {
    core: Option<Arc<EngineCore>>,
    dispatcher: Arc<EventDispatcher>,
    lifecycle: Arc<Lifecycle>,
    telemetry: Arc<TelemetryCollector>,
}

impl Teardown {
    fn run(self) {
        if let Some(core) = self.core {
            let core = wait_for_in_flight(core);
            core.backend().stop();
        }

        self.dispatcher.shutdown();
        self.telemetry.record_lifecycle(LifecyclePhase::Released);
        self.lifecycle.finish_release();
        log::info!("[RtcEngine] released");
    }
}

/// Wait until no capability call holds the core, then take sole ownership.
fn wait_for_in_flight(mut core: Arc<EngineCore>) -> EngineCore {
    loop {
        match Arc::try_unwrap(core) {
            Ok(inner) => return inner,
            Err(shared) => {
                core = shared;
                thread::sleep(IN_FLIGHT_POLL);
            }
        }
    }
}
