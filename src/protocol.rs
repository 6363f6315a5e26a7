//! The three wire contracts of the demand-propagation protocol.
//!
//! A [`Publisher`] accepts one [`Subscriber`] and hands it a
//! [`Subscription`]; demand flows upstream through the subscription,
//! elements flow downstream through the subscriber, and exactly one
//! terminal signal (`on_complete` or `on_error`) ends the exchange.
//!
//! All signalling is synchronous and call-stack-bound: a `request` call
//! emits `on_next` calls inline on the caller's thread. Callback methods
//! take `&self` because a subscriber re-enters `request` on the same
//! stack from inside `on_next`; implementations use interior mutability.

use std::sync::Arc;

use crate::error::StreamError;

/// The live binding between a publisher and its subscriber, carrying
/// demand and cancellation.
pub trait Subscription: Send + Sync {
    /// Grant `n` units of credit, each permitting one element emission.
    ///
    /// `request(0)` is a protocol violation: the subscription fails fast
    /// with [`StreamError::InvalidDemand`] and becomes inert. Calls after
    /// a terminal signal or cancellation are no-ops.
    fn request(&self, n: u64);

    /// Cancel the subscription. The subscription becomes inert for future
    /// `request` calls; the downstream receives a final completion signal.
    /// Idempotent.
    fn cancel(&self);
}

/// Receives subscription confirmation, elements, and a terminal signal.
///
/// At most one of `on_complete`/`on_error` ever fires, at most once;
/// after it fires no further `on_next` is permitted.
pub trait Subscriber<T>: Send + Sync {
    /// Called exactly once, synchronously within `subscribe`, before any
    /// element is delivered.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called once per unit of outstanding demand with the next element.
    fn on_next(&self, item: T);

    /// Called at most once when the stream fails terminally.
    ///
    /// Default implementation logs the error via `log::warn!`.
    fn on_error(&self, error: StreamError) {
        log::warn!("unhandled stream error: {}", error);
    }

    /// Called at most once when the stream completes normally.
    ///
    /// Default implementation is a no-op.
    fn on_complete(&self) {}
}

/// Component that can accept one subscriber and later emit elements to it
/// upon demand.
pub trait Publisher<T>: Send + Sync {
    /// Bind `subscriber` to this publisher. `on_subscribe` is invoked
    /// synchronously before this method returns. Behavior when the same
    /// publisher instance is subscribed more than once is unspecified.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}
