//! Secret string values.

use std::fmt;
use zeroize::Zeroize;

/// A secret (password, token) carried through the runtime.
///
/// The clear text is wiped from memory when the value is dropped and never
/// appears in `Debug` output. Read it through [`GuardedString::access`].
#[derive(Clone, Default)]
pub struct GuardedString {
    clear: Vec<u8>,
}

impl GuardedString {
    /// Wrap a clear-text secret.
    pub fn new(clear: impl Into<String>) -> Self {
        Self {
            clear: clear.into().into_bytes(),
        }
    }

    /// Run `f` with the clear text.
    ///
    /// The buffer only ever holds bytes that came from a `String`, so the
    /// UTF-8 conversion cannot fail.
    pub fn access<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(std::str::from_utf8(&self.clear).unwrap_or_default())
    }

    /// Check if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.clear.is_empty()
    }
}

impl Drop for GuardedString {
    fn drop(&mut self) {
        self.clear.zeroize();
    }
}

impl PartialEq for GuardedString {
    fn eq(&self, other: &Self) -> bool {
        self.clear == other.clear
    }
}

impl Eq for GuardedString {}

impl fmt::Debug for GuardedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GuardedString(***REDACTED***)")
    }
}

impl From<&str> for GuardedString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GuardedString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
