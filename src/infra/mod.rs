//! Concrete fire sources backing the timer.
pub mod tokio_fire;
