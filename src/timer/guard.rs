//! Execution guard and tick dispatcher.
//!
//! The guard is a `running`/`disposed` pair behind a mutex, with a condition
//! variable signalled every time `running` drops back to `false`. It gives
//! three guarantees:
//!
//! * at most one callback invocation is in flight per timer;
//! * a fire that lands while an invocation is still running waits for it
//!   instead of being dropped;
//! * `dispose` returns only once no invocation is in flight, and nothing
//!   starts afterwards.
//!
//! User code never runs while the mutex is held: the dispatcher claims the
//! guard, releases the lock and hands the callback to the tokio runtime.
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use log::{debug, error, trace, warn};
use tokio::runtime::Handle;

use crate::error::TimerError;
use crate::interval::Interval;
use crate::traits::{fire_source::FireSource, tick_handler::TickHandler};

tokio::task_local! {
    /// Identity of the timer whose callback the current task is running.
    static CURRENT_TICK: usize;
}

//==================================================================================GUARD_STATE
/// State protected by the guard mutex.
struct GuardState {
    /// `true` from the moment a dispatcher claims execution until the
    /// callback has completed.
    running: bool,
    /// Monotonic; never reset once set.
    disposed: bool,
    /// Taken exactly once, by the disposing thread.
    fire_source: Option<Box<dyn FireSource>>,
}

//==================================================================================TIMER_SHARED
/// Everything a `TimerCore`, its handles and its fire source share.
pub(crate) struct TimerShared {
    name: Arc<str>,
    runtime: Handle,
    handler: Arc<dyn TickHandler>,
    state: Mutex<GuardState>,
    idle: Condvar,
}

impl TimerShared {
    pub(crate) fn new(
        name: Arc<str>,
        runtime: Handle,
        handler: Arc<dyn TickHandler>,
        fire_source: Box<dyn FireSource>,
    ) -> Self {
        Self {
            name,
            runtime,
            handler,
            state: Mutex::new(GuardState {
                running: false,
                disposed: false,
                fire_source: Some(fire_source),
            }),
            idle: Condvar::new(),
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    // No user code runs under the lock, so a poisoned mutex still holds
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle<'a>(&self, state: MutexGuard<'a, GuardState>) -> MutexGuard<'a, GuardState> {
        self.idle
            .wait_while(state, |state| state.running)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    pub(crate) fn disposed_error(&self) -> TimerError {
        TimerError::Disposed {
            name: self.name.to_string(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock().running
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    //==============================================================================ARM
    /// Schedule the next fire. Never waits on `running`, so it is safe to call
    /// from inside the callback.
    pub(crate) fn arm(&self, interval: Interval) -> Result<(), TimerError> {
        let mut state = self.lock();
        if state.disposed {
            return Err(self.disposed_error());
        }
        let source = state
            .fire_source
            .as_mut()
            .ok_or_else(|| self.disposed_error())?;
        source.schedule(interval.as_duration());
        debug!("[{}] armed for {}", self.name, interval);
        Ok(())
    }

    //==============================================================================DISPATCH
    /// Body of every fire. Runs on whatever thread the fire source uses and
    /// may block that thread while a previous invocation is still running.
    pub(crate) fn dispatch(self: &Arc<Self>) {
        {
            // Step 1: take the guard.
            let mut state = self.lock();

            // Step 2: disposal won the race against this fire.
            if state.disposed {
                trace!("[{}] fire after dispose ignored", self.name);
                return;
            }

            // Step 3: a re-arm can land before the previous invocation has
            // cleared `running`. Wait for it rather than dropping the fire.
            if state.running {
                debug!("[{}] fire queued behind running tick", self.name);
                state = self.wait_idle(state);
                if state.disposed {
                    trace!("[{}] disposed while fire was queued", self.name);
                    return;
                }
            }

            // Step 4: claim execution.
            state.running = true;
        }
        trace!("[{}] tick claimed", self.name);

        // Step 5: hand the callback to the runtime. The lease restores the
        // guard (step 6) however the task ends, including when the runtime
        // drops it unpolled.
        let lease = RunLease {
            shared: Arc::clone(self),
        };
        let handler = Arc::clone(&self.handler);
        let name = Arc::clone(&self.name);
        self.runtime.spawn(CURRENT_TICK.scope(self.id(), async move {
            let _lease = lease;
            match AssertUnwindSafe(handler.on_tick()).catch_unwind().await {
                Ok(Ok(())) => trace!("[{}] tick completed", name),
                Ok(Err(err)) => warn!("[{}] tick callback failed: {}", name, err),
                Err(_) => error!("[{}] tick callback panicked", name),
            }
        }));
    }

    //==============================================================================DISPOSE
    /// Wait for any in-flight invocation, then release the fire source.
    /// Idempotent and infallible.
    pub(crate) fn dispose(&self) {
        // Waiting on our own invocation would never return.
        let from_own_tick = CURRENT_TICK
            .try_with(|id| *id == self.id())
            .unwrap_or(false);

        let released = {
            let mut state = self.lock();
            // Even when already disposed: a tick that disposed itself may
            // still be running.
            if state.running && !from_own_tick {
                debug!("[{}] dispose waiting for running tick", self.name);
                state = self.wait_idle(state);
            }
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.fire_source.take()
        };

        // Dropped outside the lock: a source may join work that is itself
        // blocked on the guard.
        drop(released);
        debug!("[{}] disposed", self.name);
    }
}

//==================================================================================RUN_LEASE
/// Proof that the holder owns `running`. Dropping it ends the invocation.
struct RunLease {
    shared: Arc<TimerShared>,
}

impl Drop for RunLease {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.running = false;
        self.shared.idle.notify_all();
    }
}
