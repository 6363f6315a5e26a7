//! Intermediate stages: relay subscribers that forward the upstream
//! subscription untouched while rewriting (map) or dropping (filter)
//! elements on the way down.

pub mod filter;
pub mod map;

pub use filter::FilterPublisher;
pub use map::MapPublisher;

use std::any::Any;

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "transform panicked".to_string()
    }
}
