//! Capability identifiers and the identifier-keyed query protocol.
//!
//! The root engine answers [`QueryInterface::query_interface`] with an
//! [`AnyCapability`]; typed handles narrow it through [`CapabilityKind`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::Lifecycle;
use crate::error::EngineError;
use crate::handle::{ExclusiveHandle, Release};
use crate::parameters::ParameterBus;

pub mod device;

pub use device::{
    AudioDeviceManager, DeviceCollection, DeviceInfo, VideoDeviceManager, MAX_DEVICE_ID_LENGTH,
};

/// Closed, versioned set of capability families. New values are additive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum InterfaceId {
    AudioDeviceManager = 1,
    VideoDeviceManager = 2,
    RtcEngineParameter = 3,
    MediaEngine = 4,
}

impl InterfaceId {
    pub const ALL: [InterfaceId; 4] = [
        InterfaceId::AudioDeviceManager,
        InterfaceId::VideoDeviceManager,
        InterfaceId::RtcEngineParameter,
        InterfaceId::MediaEngine,
    ];

    pub fn id(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for InterfaceId {
    type Error = EngineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        InterfaceId::ALL
            .into_iter()
            .find(|iid| iid.id() == value)
            .ok_or_else(|| EngineError::not_supported(format!("interface id {}", value)))
    }
}

/// A freshly referenced capability returned by a query.
///
/// Dropping it without adopting it into a handle releases the reference.
pub enum AnyCapability {
    AudioDeviceManager(Box<dyn AudioDeviceManager>),
    VideoDeviceManager(Box<dyn VideoDeviceManager>),
    Parameter(Box<dyn ParameterBus>),
}

impl AnyCapability {
    pub fn interface_id(&self) -> InterfaceId {
        match self {
            AnyCapability::AudioDeviceManager(_) => InterfaceId::AudioDeviceManager,
            AnyCapability::VideoDeviceManager(_) => InterfaceId::VideoDeviceManager,
            AnyCapability::Parameter(_) => InterfaceId::RtcEngineParameter,
        }
    }
}

impl Release for AnyCapability {
    fn release(&mut self) {
        match self {
            AnyCapability::AudioDeviceManager(inner) => inner.release(),
            AnyCapability::VideoDeviceManager(inner) => inner.release(),
            AnyCapability::Parameter(inner) => inner.release(),
        }
    }
}

impl std::fmt::Debug for AnyCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnyCapability")
            .field(&self.interface_id())
            .finish()
    }
}

/// Anything that can answer identifier-based capability queries.
pub trait QueryInterface {
    /// Return a newly referenced, independently releasable capability.
    ///
    /// # Errors
    /// - `NotReady` if the root is not initialized (checked first)
    /// - `NotSupported` if `iid` is not provided by this root
    fn query_interface(&self, iid: InterfaceId) -> Result<AnyCapability, EngineError>;

    /// Lifecycle that invalidates handles derived from this root.
    fn lifecycle(&self) -> Option<Arc<Lifecycle>> {
        None
    }
}

/// Capability trait objects that a typed [`ExclusiveHandle`] can hold.
pub trait CapabilityKind: Release {
    const IID: InterfaceId;

    /// Narrow a query result, handing it back unchanged on a kind mismatch.
    fn from_capability(capability: AnyCapability) -> Result<Box<Self>, AnyCapability>;
}

impl CapabilityKind for dyn ParameterBus {
    const IID: InterfaceId = InterfaceId::RtcEngineParameter;

    fn from_capability(capability: AnyCapability) -> Result<Box<Self>, AnyCapability> {
        match capability {
            AnyCapability::Parameter(inner) => Ok(inner),
            other => Err(other),
        }
    }
}

impl CapabilityKind for dyn AudioDeviceManager {
    const IID: InterfaceId = InterfaceId::AudioDeviceManager;

    fn from_capability(capability: AnyCapability) -> Result<Box<Self>, AnyCapability> {
        match capability {
            AnyCapability::AudioDeviceManager(inner) => Ok(inner),
            other => Err(other),
        }
    }
}

impl CapabilityKind for dyn VideoDeviceManager {
    const IID: InterfaceId = InterfaceId::VideoDeviceManager;

    fn from_capability(capability: AnyCapability) -> Result<Box<Self>, AnyCapability> {
        match capability {
            AnyCapability::VideoDeviceManager(inner) => Ok(inner),
            other => Err(other),
        }
    }
}

/// Exclusive handle on the parameter bus (`AParameter`).
pub type ParameterHandle = ExclusiveHandle<dyn ParameterBus>;

/// Exclusive handle on the audio device manager (`AAudioDeviceManager`).
pub type AudioDeviceManagerHandle = ExclusiveHandle<dyn AudioDeviceManager>;

/// Exclusive handle on the video device manager (`AVideoDeviceManager`).
pub type VideoDeviceManagerHandle = ExclusiveHandle<dyn VideoDeviceManager>;
