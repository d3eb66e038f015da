use std::fmt;
use std::sync::Arc;

use super::Release;

/// Ref-counted string result with single-owner release.
///
/// The text is shared (`Arc<str>`) with whoever produced it, so handing a
/// cached JSON payload back to a caller does not copy it. The handle itself
/// is not `Clone`: ownership moves exactly once, and [`Release::release`]
/// drops this holder's reference. Releasing twice is a no-op.
#[derive(Default)]
pub struct StringHandle {
    text: Option<Arc<str>>,
}

impl StringHandle {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// True for a released handle as well as for an empty string.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.text.as_deref().map_or(0, str::len)
    }

    pub fn as_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is_released(&self) -> bool {
        self.text.is_none()
    }

    /// Copy the text out, leaving the handle untouched.
    pub fn to_owned_string(&self) -> String {
        self.as_str().to_owned()
    }
}

impl Release for StringHandle {
    fn release(&mut self) {
        self.text = None;
    }
}

impl AsRef<str> for StringHandle {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StringHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StringHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringHandle")
            .field("text", &self.text.as_deref())
            .finish()
    }
}

impl From<String> for StringHandle {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for StringHandle {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
