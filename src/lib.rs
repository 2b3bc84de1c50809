//! `tickguard` library: a self-rescheduling timer that runs an asynchronous
//! callback on a tokio runtime, never runs two invocations of it at once, and
//! lets the callback choose the next firing interval by re-arming the timer
//! before it returns. Disposal blocks until an in-flight invocation has fully
//! completed.
//!
//! Typical users are periodic flush or polling loops whose period changes at
//! runtime and whose iterations must not overlap.
//==================================================================================
/// Errors returned by the public API and the boxed callback failure type.
pub mod error;
/// Concrete fire sources (tokio-backed by default).
pub mod infra;
/// Validated, non-negative arming interval.
pub mod interval;
/// Timer core: construction, arming, dispatch, disposal.
pub mod timer;
/// Seams: fire source and tick handler traits.
pub mod traits;
//==================================================================================

pub use error::{TickError, TimerError};
pub use interval::Interval;
pub use timer::{TimerBuilder, TimerCore, TimerHandle, Trigger};
pub use traits::{fire_source::FireSource, tick_handler::TickHandler};
