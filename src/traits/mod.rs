//! Abstraction traits at the two seams of the timer: the fire source that
//! produces ticks and the handler that consumes them.
pub mod fire_source;
pub mod tick_handler;
