//! Self-rescheduling timer whose callback never overlaps itself.
//!
//! A [`TimerCore`] owns one [`FireSource`] and one [`TickHandler`]. Each call
//! to `arm` schedules one fire; each fire dispatches at most one callback
//! invocation. The callback usually re-arms the timer before returning, which
//! lets it pick the next period on every cycle:
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tickguard::timer::TimerCore;
//!
//! let timer = TimerCore::new_cyclic(|handle| {
//!     move || {
//!         let handle = handle.clone();
//!         async move {
//!             flush_batch().await?;
//!             handle.arm(Duration::from_secs(2))
//!         }
//!     }
//! })?;
//! timer.arm(Duration::ZERO)?;
//! // ...
//! timer.dispose(); // blocks until an in-flight flush has completed
//! ```
//!
//! `dispose` (and therefore `Drop`) blocks the calling thread. Call it from
//! synchronous code, `spawn_blocking`, or a multi-threaded runtime, never from
//! a current-thread runtime that also has to drive the callback.
//!
//! A callback that stops its own timer must call [`TimerHandle::dispose`]
//! inline, on the task running the callback. That task is how `dispose`
//! recognises the caller as the current invocation. Moving the call to
//! another task or thread (`spawn_blocking` included) makes it wait for the
//! invocation that is awaiting it, which never returns.
mod guard;

use std::sync::{Arc, Weak};

use log::debug;
use tokio::runtime::Handle;

use crate::error::TimerError;
use crate::infra::tokio_fire::{has_time_driver, TokioFireSource};
use crate::interval::Interval;
use crate::traits::{fire_source::FireSource, tick_handler::TickHandler};

use guard::TimerShared;

/// Label used in log lines when the builder was not given a name.
pub const DEFAULT_TIMER_NAME: &str = "timer";

type FireSourceFactory = Box<dyn FnOnce(Trigger, &Handle) -> Box<dyn FireSource>>;

//==================================================================================TIMER_CORE
/// Owner of the timer. Dropping it disposes the timer.
pub struct TimerCore {
    shared: Arc<TimerShared>,
}

impl TimerCore {
    // Builder entry point
    /// Creates a `TimerBuilder` with the default name and fire source.
    pub fn builder() -> TimerBuilder {
        TimerBuilder::new()
    }

    /// Build a timer on the ambient tokio runtime with the default fire source.
    pub fn new<H: TickHandler>(handler: H) -> Result<Self, TimerError> {
        TimerBuilder::new().build(handler)
    }

    /// Dynamic constructor: a missing handler is rejected with
    /// [`TimerError::InvalidArgument`] before anything is allocated.
    pub fn try_new(handler: Option<Arc<dyn TickHandler>>) -> Result<Self, TimerError> {
        let handler =
            handler.ok_or_else(|| TimerError::invalid("callback", "must be provided"))?;
        TimerBuilder::new().build_dyn(move |_| handler)
    }

    /// Build the handler with a [`TimerHandle`] to its own timer, so it can
    /// re-arm it while running.
    pub fn new_cyclic<H, F>(make_handler: F) -> Result<Self, TimerError>
    where
        H: TickHandler,
        F: FnOnce(TimerHandle) -> H,
    {
        TimerBuilder::new().build_cyclic(make_handler)
    }

    /// Schedule one fire after `interval`, replacing any pending arming.
    ///
    /// Fails with [`TimerError::Disposed`] once `dispose` has run. Does not
    /// wait for a running callback.
    pub fn arm(&self, interval: impl Into<Interval>) -> Result<(), TimerError> {
        self.shared.arm(interval.into())
    }

    /// `arm` from a signed millisecond count; negative values are rejected
    /// and leave the pending arming untouched.
    pub fn arm_millis(&self, millis: i64) -> Result<(), TimerError> {
        self.arm(Interval::from_millis_signed(millis)?)
    }

    /// `arm` from fractional seconds, validated like [`Interval::from_secs_f64`].
    pub fn arm_secs_f64(&self, secs: f64) -> Result<(), TimerError> {
        self.arm(Interval::from_secs_f64(secs)?)
    }

    /// Wait for any in-flight callback to complete, then release the fire
    /// source for good. Idempotent; never fails.
    ///
    /// When called from inside this timer's own callback it cannot wait for
    /// itself: the timer is disposed immediately and the current invocation
    /// simply runs to completion.
    pub fn dispose(&self) {
        self.shared.dispose()
    }

    /// Weak arming handle, typically moved into the callback.
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            shared: Arc::downgrade(&self.shared),
            name: Arc::clone(self.shared.name()),
        }
    }

    /// `true` while a callback invocation is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }
}

impl Drop for TimerCore {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl core::fmt::Debug for TimerCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerCore")
            .field("name", &self.name())
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

//==================================================================================TIMER_HANDLE
/// Clonable arming handle that does not keep the timer alive.
///
/// Once the owning [`TimerCore`] is disposed or dropped every `arm` fails with
/// [`TimerError::Disposed`].
#[derive(Clone)]
pub struct TimerHandle {
    shared: Weak<TimerShared>,
    name: Arc<str>,
}

impl TimerHandle {
    /// Same contract as [`TimerCore::arm`].
    pub fn arm(&self, interval: impl Into<Interval>) -> Result<(), TimerError> {
        match self.shared.upgrade() {
            Some(shared) => shared.arm(interval.into()),
            None => Err(TimerError::Disposed {
                name: self.name.to_string(),
            }),
        }
    }

    pub fn arm_millis(&self, millis: i64) -> Result<(), TimerError> {
        self.arm(Interval::from_millis_signed(millis)?)
    }

    pub fn arm_secs_f64(&self, secs: f64) -> Result<(), TimerError> {
        self.arm(Interval::from_secs_f64(secs)?)
    }

    /// Same contract as [`TimerCore::dispose`]; a no-op once the timer is gone.
    /// This is how a callback stops its own timer: call it inline from the
    /// callback, never through `spawn_blocking` or another task.
    pub fn dispose(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.dispose();
        }
    }

    /// `true` once the timer is disposed or dropped.
    pub fn is_disposed(&self) -> bool {
        self.shared
            .upgrade()
            .map_or(true, |shared| shared.is_disposed())
    }
}

impl core::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

//==================================================================================TRIGGER
/// What a [`FireSource`] calls when its delay elapses.
///
/// `fire` runs the dispatcher synchronously on the calling thread and may
/// block it while a previous invocation is still running, so fire sources
/// should call it from a thread they can afford to park.
#[derive(Clone)]
pub struct Trigger {
    shared: Weak<TimerShared>,
}

impl Trigger {
    pub fn fire(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.dispatch();
        }
    }
}

impl core::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trigger").finish_non_exhaustive()
    }
}

//==================================================================================TIMER_BUILDER
/// Fluent builder for [`TimerCore`].
pub struct TimerBuilder {
    name: Option<String>,
    runtime: Option<Handle>,
    fire_source: Option<FireSourceFactory>,
}

impl Default for TimerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            runtime: None,
            fire_source: None,
        }
    }

    /// Label carried by every log line of this timer.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Runtime that drives callbacks and the default fire source.
    /// Defaults to `Handle::try_current()` at build time.
    ///
    /// Unless a custom [`fire_source`](Self::fire_source) is installed, the
    /// runtime must have its time driver enabled (`enable_time` or
    /// `enable_all`); `build` fails with [`TimerError::NoRuntime`] otherwise.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Replace the default [`TokioFireSource`]. The factory receives the
    /// timer's [`Trigger`] and runtime.
    pub fn fire_source<F, S>(mut self, factory: F) -> Self
    where
        F: FnOnce(Trigger, &Handle) -> S + 'static,
        S: FireSource,
    {
        self.fire_source = Some(Box::new(move |trigger: Trigger, runtime: &Handle| {
            Box::new(factory(trigger, runtime)) as Box<dyn FireSource>
        }));
        self
    }

    pub fn build<H: TickHandler>(self, handler: H) -> Result<TimerCore, TimerError> {
        self.build_cyclic(move |_| handler)
    }

    /// See [`TimerCore::new_cyclic`]. The handle cannot arm the timer until
    /// `build_cyclic` has returned.
    pub fn build_cyclic<H, F>(self, make_handler: F) -> Result<TimerCore, TimerError>
    where
        H: TickHandler,
        F: FnOnce(TimerHandle) -> H,
    {
        self.build_dyn(move |handle| Arc::new(make_handler(handle)) as Arc<dyn TickHandler>)
    }

    fn build_dyn<F>(self, make_handler: F) -> Result<TimerCore, TimerError>
    where
        F: FnOnce(TimerHandle) -> Arc<dyn TickHandler>,
    {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|err| TimerError::NoRuntime {
                reason: err.to_string(),
            })?,
        };
        let factory = self.fire_source;
        if factory.is_none() && !has_time_driver(&runtime) {
            return Err(TimerError::NoRuntime {
                reason: "the runtime was built without its time driver".to_string(),
            });
        }
        let name: Arc<str> = Arc::from(self.name.as_deref().unwrap_or(DEFAULT_TIMER_NAME));

        let shared = Arc::new_cyclic(|weak: &Weak<TimerShared>| {
            let handler = make_handler(TimerHandle {
                shared: weak.clone(),
                name: Arc::clone(&name),
            });
            let trigger = Trigger {
                shared: weak.clone(),
            };
            let fire_source: Box<dyn FireSource> = match factory {
                Some(factory) => factory(trigger, &runtime),
                None => Box::new(TokioFireSource::new(&runtime, trigger)),
            };
            TimerShared::new(Arc::clone(&name), runtime.clone(), handler, fire_source)
        });

        debug!("[{}] timer created", name);
        Ok(TimerCore { shared })
    }
}
