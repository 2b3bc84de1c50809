//! Error definitions shared across library modules.
//! `TimerError` covers caller misuse of the public API; `TickError` is the
//! failure type a tick callback may hand back to the dispatcher.
use thiserror::Error;

/// Boxed failure returned by a tick callback.
///
/// The dispatcher never inspects or retries it: it is logged and dropped once
/// the execution guard has been restored.
pub type TickError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors returned by [`TimerCore`](crate::timer::TimerCore) and its handles.
pub enum TimerError {
    /// An argument was rejected before any timer state was touched
    /// (negative interval, missing callback, ...).
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },

    /// The timer was disposed (or dropped); it can no longer be armed.
    #[error("Timer `{name}` is disposed")]
    Disposed { name: String },

    /// Construction happened outside a tokio runtime and no handle was supplied,
    /// or the runtime cannot drive the default fire source (no time driver).
    #[error("No tokio runtime available: {reason}")]
    NoRuntime { reason: String },
}

impl TimerError {
    /// Shorthand used by the interval validators.
    pub(crate) const fn invalid(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { name, reason }
    }

    /// `true` for the `InvalidState` family (arming a disposed timer).
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// `true` for arguments rejected up front.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
