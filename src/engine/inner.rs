//! State shared between the engine root and its capability proxies.
//!
//! The root keeps the only long-lived strong reference; proxies hold a
//! `Weak` and upgrade it per call, so teardown can wait for in-flight calls
//! by waiting for the strong count to drop back to one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::capability::device::validate_device_id;
use crate::capability::DeviceCollection;
use crate::engine::backend::{BackendCommand, MediaBackend};
use crate::engine::lifecycle::Lifecycle;
use crate::engine::types::{LogLevel, MediaDeviceType};
use crate::error::{log_engine_error, result_code, EngineError};
use crate::events::{EngineEvent, EventSink};
use crate::parameters::keys;
use crate::parameters::ParameterStore;
use crate::telemetry::TelemetryCollector;

/// Device volume reported before any volume was set.
pub(crate) const DEFAULT_DEVICE_VOLUME: i32 = 255;

#[derive(Default)]
struct DeviceSelection {
    selected: HashMap<MediaDeviceType, String>,
    volumes: HashMap<MediaDeviceType, i32>,
}

pub(crate) struct EngineCore {
    backend: Arc<dyn MediaBackend>,
    parameters: Mutex<ParameterStore>,
    devices: Mutex<DeviceSelection>,
    events: EventSink,
    telemetry: Arc<TelemetryCollector>,
    lifecycle: Arc<Lifecycle>,
    live_capabilities: Arc<AtomicUsize>,
}

impl EngineCore {
    pub(crate) fn new(
        backend: Arc<dyn MediaBackend>,
        parameters: ParameterStore,
        events: EventSink,
        telemetry: Arc<TelemetryCollector>,
        lifecycle: Arc<Lifecycle>,
        live_capabilities: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            backend,
            parameters: Mutex::new(parameters),
            devices: Mutex::new(DeviceSelection::default()),
            events,
            telemetry,
            lifecycle,
            live_capabilities,
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.backend
    }

    pub(crate) fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    /// Count a newly handed-out capability. The returned counter is
    /// decremented by the capability on release.
    pub(crate) fn capability_acquired(&self) -> Arc<AtomicUsize> {
        self.live_capabilities.fetch_add(1, Ordering::SeqCst);
        Arc::clone(&self.live_capabilities)
    }

    fn lock_parameters(&self) -> Result<MutexGuard<'_, ParameterStore>, EngineError> {
        self.parameters
            .lock()
            .map_err(|_| EngineError::lock_poisoned("parameter_store"))
    }

    fn lock_devices(&self) -> Result<MutexGuard<'_, DeviceSelection>, EngineError> {
        self.devices
            .lock()
            .map_err(|_| EngineError::lock_poisoned("device_selection"))
    }

    // Parameter bus

    pub(crate) fn set_parameter(&self, key: &str, value: Value) -> Result<(), EngineError> {
        let mut store = self.lock_parameters()?;
        store.validate(key, &value)?;
        self.commit(&mut store, key.to_string(), value)
    }

    /// Apply a validated batch in key order, stopping at the first value the
    /// backend refuses. Entries applied before the refusal stay applied.
    pub(crate) fn set_parameters(&self, text: &str) -> Result<(), EngineError> {
        let batch = ParameterStore::parse_batch(text)?;
        let mut store = self.lock_parameters()?;
        store.validate_batch(&batch)?;
        for (key, value) in batch {
            self.commit(&mut store, key, value)?;
        }
        Ok(())
    }

    /// Apply a profile. The stored settings change only if every entry is
    /// accepted; on a refusal the previous settings stay in place.
    pub(crate) fn set_profile(&self, text: &str, merge: bool) -> Result<(), EngineError> {
        let profile = ParameterStore::parse_batch(text)?;
        let mut store = self.lock_parameters()?;
        store.validate_batch(&profile)?;

        let mut next = store.clone();
        if !merge {
            log::debug!("[ParameterBus] replacing {} settings with profile", store.len());
            next.clear();
        }
        for (key, value) in profile {
            self.commit(&mut next, key, value)?;
        }
        *store = next;
        Ok(())
    }

    fn commit(&self, store: &mut ParameterStore, key: String, value: Value) -> Result<(), EngineError> {
        if let Err(err) = self.backend.apply_parameter(&key, &value) {
            log::warn!("[ParameterBus] backend refused '{}': {}", key, err);
            return Err(err);
        }

        if key == keys::RTC_LOG_FILTER {
            if let Some(filter) = value.as_u64().and_then(|n| u32::try_from(n).ok()) {
                log::set_max_level(LogLevel::to_level_filter(filter));
            }
        }

        self.telemetry.record_parameter_changed(&key);
        store.insert(key, value);
        Ok(())
    }

    /// Read `key` through `read`, preferring a live value from the backend.
    pub(crate) fn read_parameter<R>(
        &self,
        key: &str,
        read: impl FnOnce(&str, &Value) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        if let Some(live) = self.backend.query_parameter(key) {
            return read(key, &live);
        }
        let store = self.lock_parameters()?;
        read(key, store.get(key)?)
    }

    pub(crate) fn profile_json(&self) -> Result<String, EngineError> {
        Ok(self.lock_parameters()?.to_json())
    }

    // Typed commands

    pub(crate) fn execute(&self, command: BackendCommand) -> Result<(), EngineError> {
        let api = command.api_name();
        let result = self.backend.execute(command);
        self.report_api_call(api, &result);
        result
    }

    fn report_api_call(&self, api: &str, result: &Result<(), EngineError>) {
        self.telemetry.record_api_call(api, result);
        self.events.emit(EngineEvent::ApiCallExecuted {
            api: api.to_string(),
            error: result_code(result),
        });
        if let Err(err) = result {
            log_engine_error(err, api);
        }
    }

    // Devices

    pub(crate) fn enumerate_devices(&self, kind: MediaDeviceType) -> DeviceCollection {
        DeviceCollection::new(kind, self.backend.devices(kind))
    }

    pub(crate) fn select_device(&self, kind: MediaDeviceType, id: &str) -> Result<(), EngineError> {
        validate_device_id(id)?;
        if self.enumerate_devices(kind).find(id).is_none() {
            return Err(EngineError::InvalidDevice { id: id.to_string() });
        }
        self.execute(BackendCommand::SelectDevice {
            kind,
            id: id.to_string(),
        })?;
        self.lock_devices()?.selected.insert(kind, id.to_string());
        Ok(())
    }

    /// Selected device id, or the first enumerated device if none was chosen.
    pub(crate) fn selected_device(&self, kind: MediaDeviceType) -> Result<String, EngineError> {
        if let Some(id) = self.lock_devices()?.selected.get(&kind) {
            return Ok(id.clone());
        }
        self.enumerate_devices(kind)
            .iter()
            .next()
            .map(|device| device.id.clone())
            .ok_or_else(|| EngineError::Failed {
                reason: format!("no {:?} device available", kind),
            })
    }

    pub(crate) fn set_device_volume(&self, kind: MediaDeviceType, volume: i32) -> Result<(), EngineError> {
        self.execute(BackendCommand::SetDeviceVolume { kind, volume })?;
        self.lock_devices()?.volumes.insert(kind, volume);
        Ok(())
    }

    pub(crate) fn device_volume(&self, kind: MediaDeviceType) -> Result<i32, EngineError> {
        Ok(self
            .lock_devices()?
            .volumes
            .get(&kind)
            .copied()
            .unwrap_or(DEFAULT_DEVICE_VOLUME))
    }
}
