//! Rearmable one-shot timer abstraction ("fire source").
//!
//! A fire source is owned exclusively by one `TimerCore`. The core only ever
//! calls it while holding its guard mutex, so implementations need no extra
//! locking to order concurrent `schedule` calls.
use core::time::Duration;

/// One-shot, rearmable delay primitive driving a [`Trigger`](crate::timer::Trigger).
///
/// Contract:
/// - after `schedule(d)`, the trigger is fired exactly once, no earlier than `d`;
/// - a `schedule` issued before the pending fire lands replaces it;
/// - fires may be delivered on any thread, including several at once;
/// - dropping the source releases it: no fire is started afterwards.
pub trait FireSource: Send + 'static {
    /// Fire once after `delay`, replacing any pending arming.
    fn schedule(&mut self, delay: Duration);
}
