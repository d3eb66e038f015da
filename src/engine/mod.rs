//! Engine root and the machinery behind it.
//!
//! `core` holds the public [`RtcEngine`]; `inner` is the state its
//! capability proxies share; `backend` is the seam to the media engine.

pub mod backend;
mod core;
mod inner;
pub mod lifecycle;
mod proxies;
pub mod types;

pub use backend::{
    BackendCommand, BackendStartContext, LoopbackBackend, MediaBackend, StubTimeSource,
    SystemTimeSource, TimeSource,
};
pub use self::core::{EngineContext, RtcEngine};
pub use lifecycle::{Lifecycle, LifecycleState};
