//! Test doubles: a hand-fired fire source and an instrumented tick callback.
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tickguard::{FireSource, TickError, TimerBuilder, Trigger};

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Observes a `ManualFireSource` from the test body.
pub struct ManualProbe {
    pub scheduled: Arc<Mutex<Vec<Duration>>>,
    pub releases: Arc<AtomicUsize>,
    trigger: Arc<Mutex<Option<Trigger>>>,
}

#[allow(dead_code)]
impl ManualProbe {
    /// Trigger handed to the source at construction.
    pub fn trigger(&self) -> Trigger {
        self.trigger
            .lock()
            .unwrap()
            .clone()
            .expect("fire source was built")
    }
}

#[allow(dead_code)]
/// Fire source that never fires on its own: the test calls the trigger.
pub struct ManualFireSource {
    probe: ManualProbe,
}

impl FireSource for ManualFireSource {
    fn schedule(&mut self, delay: Duration) {
        self.probe.scheduled.lock().unwrap().push(delay);
    }
}

impl Drop for ManualFireSource {
    fn drop(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
/// Install a `ManualFireSource` on `builder`.
pub fn with_manual_source(builder: TimerBuilder) -> (TimerBuilder, ManualProbe) {
    let probe = ManualProbe::default();
    let captured = probe.clone();
    let builder = builder.fire_source(move |trigger, _runtime| {
        *captured.trigger.lock().unwrap() = Some(trigger);
        ManualFireSource { probe: captured }
    });
    (builder, probe)
}

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
/// Start and end of one callback invocation.
pub struct Span {
    pub start: Instant,
    pub end: Instant,
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Shared instrumentation for tick callbacks: overlap detection and timing.
pub struct TickRecorder {
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    spans: Arc<Mutex<Vec<Span>>>,
}

#[allow(dead_code)]
impl TickRecorder {
    /// Wrap one invocation: mark it active, run `body`, record its span.
    pub async fn run<F, Fut>(&self, body: F) -> Result<(), TickError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), TickError>>,
    {
        let start = Instant::now();
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let result = body().await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push(Span {
            start,
            end: Instant::now(),
        });
        result
    }

    pub fn completed(&self) -> usize {
        self.spans.lock().unwrap().len()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }
}

#[allow(dead_code)]
/// Poll `condition` until it holds, failing the test after `limit`.
pub async fn wait_for(limit: Duration, condition: impl Fn() -> bool) {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
