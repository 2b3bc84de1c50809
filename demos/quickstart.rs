//! # Quickstart
//!
//! A flush loop whose period backs off while there is nothing to flush and
//! snaps back once work shows up:
//! - the callback re-arms its own timer with the next period;
//! - a slow flush never overlaps the next one;
//! - `dispose` waits for the flush in progress.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example quickstart
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickguard::{TickError, TimerCore};

const MIN_PERIOD: Duration = Duration::from_millis(50);
const MAX_PERIOD: Duration = Duration::from_millis(400);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== tickguard Quickstart ===\n");

    // ======================================================================
    // 1. A queue producers push into
    // ======================================================================
    let pending = Arc::new(AtomicUsize::new(0));

    // ======================================================================
    // 2. A flush timer that picks its own next period
    // ======================================================================
    let timer = TimerCore::builder().name("flush").build_cyclic({
        let pending = pending.clone();
        move |handle| {
            let period = Arc::new(std::sync::Mutex::new(MIN_PERIOD));
            move || {
                let pending = pending.clone();
                let handle = handle.clone();
                let period = period.clone();
                async move {
                    let batch = pending.swap(0, Ordering::SeqCst);
                    let next = {
                        let mut period = period.lock().map_err(|_| "period lock poisoned")?;
                        *period = if batch == 0 {
                            (*period * 2).min(MAX_PERIOD)
                        } else {
                            MIN_PERIOD
                        };
                        *period
                    };

                    if batch > 0 {
                        println!("   flushing {batch} event(s)");
                        // Simulated network round-trip.
                        tokio::time::sleep(Duration::from_millis(30)).await;
                    } else {
                        println!("   idle, next flush in {next:?}");
                    }

                    handle.arm(next)?;
                    Ok::<(), TickError>(())
                }
            }
        }
    })?;
    timer.arm(Duration::ZERO)?;

    // ======================================================================
    // 3. Produce some bursts of work
    // ======================================================================
    for burst in [3, 0, 0, 7, 0, 1] {
        pending.fetch_add(burst, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    // ======================================================================
    // 4. Shut down: waits for an in-flight flush
    // ======================================================================
    tokio::task::spawn_blocking(move || timer.dispose()).await?;
    println!("\nTimer disposed");
    Ok(())
}
