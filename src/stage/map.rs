//! Transform stage: one output element per input element.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{StreamError, StreamResult};
use crate::protocol::{Publisher, Subscriber, Subscription};
use crate::stage::panic_message;

/// Publisher that applies a mapper to every element of its upstream.
///
/// Subscribing does not allocate a subscription of its own: an internal
/// relay subscriber forwards the upstream's subscription straight to the
/// downstream, so demand flows to the source unchanged. The stage only
/// rewrites elements, never credit.
pub struct MapPublisher<T, R> {
    upstream: Arc<dyn Publisher<T>>,
    mapper: Arc<dyn Fn(T) -> StreamResult<R> + Send + Sync>,
}

impl<T, R> MapPublisher<T, R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Map with a total function. A panic inside `mapper` is caught and
    /// propagated as [`StreamError::TransformFault`].
    pub fn new<F>(upstream: Arc<dyn Publisher<T>>, mapper: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Self::fallible(upstream, move |item| Ok(mapper(item)))
    }

    /// Map with a fallible function; `Err` fails the downstream and
    /// cancels the upstream.
    pub fn fallible<F>(upstream: Arc<dyn Publisher<T>>, mapper: F) -> Self
    where
        F: Fn(T) -> StreamResult<R> + Send + Sync + 'static,
    {
        MapPublisher {
            upstream,
            mapper: Arc::new(mapper),
        }
    }
}

impl<T, R> Publisher<R> for MapPublisher<T, R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        let relay = Arc::new(MapSubscriber {
            downstream: subscriber,
            mapper: Arc::clone(&self.mapper),
            upstream: OnceLock::new(),
            done: AtomicBool::new(false),
        });
        self.upstream.subscribe(relay);
    }
}

struct MapSubscriber<T, R> {
    downstream: Arc<dyn Subscriber<R>>,
    mapper: Arc<dyn Fn(T) -> StreamResult<R> + Send + Sync>,
    upstream: OnceLock<Arc<dyn Subscription>>,
    done: AtomicBool,
}

impl<T, R> MapSubscriber<T, R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Latch the terminal state, cancel upstream, fail downstream.
    ///
    /// The latch is set before cancelling so the completion signal the
    /// cancellation produces is absorbed here and never follows the error
    /// past this stage.
    fn fail(&self, error: StreamError) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.upstream.get() {
            subscription.cancel();
        }
        self.downstream.on_error(error);
    }
}

impl<T, R> Subscriber<T> for MapSubscriber<T, R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = self.upstream.set(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, item: T) {
        if self.done.load(Ordering::Acquire) {
            log::warn!("map: element after terminal signal dropped");
            return;
        }
        match catch_unwind(AssertUnwindSafe(|| (self.mapper)(item))) {
            Ok(Ok(mapped)) => self.downstream.on_next(mapped),
            Ok(Err(error)) => self.fail(error),
            Err(panic) => self.fail(StreamError::TransformFault(panic_message(panic))),
        }
    }

    fn on_error(&self, error: StreamError) {
        if self.done.swap(true, Ordering::AcqRel) {
            log::warn!("map: duplicate terminal signal suppressed");
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            log::warn!("map: duplicate completion suppressed");
            return;
        }
        log::debug!("map: forwarding completion");
        self.downstream.on_complete();
    }
}
