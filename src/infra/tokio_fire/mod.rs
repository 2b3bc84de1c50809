//! Default [`FireSource`] backed by the tokio timer.
//!
//! One driver task per timer waits on a `watch` channel carrying the current
//! deadline. Every `schedule` publishes a new generation-stamped deadline, so
//! a re-arm issued before the pending fire lands simply replaces it. When a
//! deadline elapses the trigger is handed to tokio's blocking pool: the
//! dispatcher may park its thread behind a running callback, and the async
//! workers must stay free to drive that callback.
use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};

use log::trace;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle, time::Instant};

use crate::timer::Trigger;
use crate::traits::fire_source::FireSource;

/// Deadline used when `now + delay` overflows the clock (about 30 years).
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Arming {
    generation: u64,
    due: Instant,
}

//==================================================================================TOKIO_FIRE_SOURCE
/// Rearmable one-shot timer running on a tokio runtime.
pub struct TokioFireSource {
    arming: watch::Sender<Option<Arming>>,
    generation: u64,
    driver: JoinHandle<()>,
}

impl TokioFireSource {
    /// Spawn the driver task on `runtime`. Starts disarmed.
    pub fn new(runtime: &Handle, trigger: Trigger) -> Self {
        let (arming, pending) = watch::channel(None);
        let driver = runtime.spawn(drive(pending, trigger));
        Self {
            arming,
            generation: 0,
            driver,
        }
    }
}

/// `true` when `runtime` was built with its time driver enabled.
///
/// Tokio only reports a missing time driver by panicking when a sleep is
/// created, so the check builds and drops one inside `runtime`.
pub fn has_time_driver(runtime: &Handle) -> bool {
    let _entered = runtime.enter();
    panic::catch_unwind(AssertUnwindSafe(|| drop(tokio::time::sleep(Duration::ZERO)))).is_ok()
}

impl FireSource for TokioFireSource {
    fn schedule(&mut self, delay: Duration) {
        self.generation = self.generation.wrapping_add(1);
        let now = Instant::now();
        let due = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.arming.send_replace(Some(Arming {
            generation: self.generation,
            due,
        }));
    }
}

impl Drop for TokioFireSource {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Driver loop: sleep until the current deadline, fire once, then wait for
/// the next generation.
async fn drive(mut pending: watch::Receiver<Option<Arming>>, trigger: Trigger) {
    let mut fired: Option<u64> = None;

    loop {
        let current = *pending.borrow_and_update();
        match current {
            Some(arming) if fired != Some(arming.generation) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(arming.due) => {
                        fired = Some(arming.generation);
                        trace!("fire source elapsed (generation {})", arming.generation);
                        let trigger = trigger.clone();
                        tokio::task::spawn_blocking(move || trigger.fire());
                    }
                    changed = pending.changed() => {
                        // Sender gone: the source was released.
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
            _ => {
                if pending.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}
