//! Ownership primitives shared by every capability.
//!
//! [`ExclusiveHandle`] owns one boxed capability object and releases it on
//! reset or drop. [`StringHandle`] carries string results (JSON text for
//! object/array reads) back across the boundary.

mod exclusive;
mod string;

pub use exclusive::{ExclusiveHandle, Release};
pub use string::StringHandle;
