//! Numeric status codes surfaced by boundary collaborators.

use core::fmt;

/// Raw status word reported by a hardware collaborator.
///
/// Bring-up treats every non-success result as fatal, so the only thing the
/// core ever does with one of these is carry it into a
/// [`BringupError`](crate::bringup::BringupError) where the diagnostic
/// observer can emit it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusCode(u32);

impl StatusCode {
    /// Wraps a raw collaborator status word.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw status word.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
