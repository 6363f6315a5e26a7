//! Filter stage: drop elements while keeping the pipeline's demand whole.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::StreamError;
use crate::protocol::{Publisher, Subscriber, Subscription};
use crate::stage::panic_message;

/// Publisher that forwards only the elements accepted by a predicate.
///
/// Like the map stage this is a pure relay for subscription and demand,
/// with one addition: every dropped element consumed one unit of upstream
/// credit without producing anything downstream, so the stage re-requests
/// exactly one unit per drop. A downstream `request(n)` is therefore
/// satisfied by exactly `n` accepted elements, or by completion when the
/// upstream runs out first, no matter how many elements fall to the
/// predicate in between.
pub struct FilterPublisher<T> {
    upstream: Arc<dyn Publisher<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> FilterPublisher<T>
where
    T: Send + Sync + 'static,
{
    /// Filter with the given predicate. A panic inside `predicate` is
    /// caught and propagated as [`StreamError::TransformFault`].
    pub fn new<F>(upstream: Arc<dyn Publisher<T>>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        FilterPublisher {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

impl<T> Publisher<T> for FilterPublisher<T>
where
    T: Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let relay = Arc::new(FilterSubscriber {
            downstream: subscriber,
            predicate: Arc::clone(&self.predicate),
            upstream: OnceLock::new(),
            done: AtomicBool::new(false),
        });
        self.upstream.subscribe(relay);
    }
}

struct FilterSubscriber<T> {
    downstream: Arc<dyn Subscriber<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    upstream: OnceLock<Arc<dyn Subscription>>,
    done: AtomicBool,
}

impl<T> FilterSubscriber<T>
where
    T: Send + Sync + 'static,
{
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

impl<T> Subscriber<T> for FilterSubscriber<T>
where
    T: Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = self.upstream.set(Arc::clone(&subscription));
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, item: T) {
        if self.done.load(Ordering::Acquire) {
            log::warn!("filter: element after terminal signal dropped");
            return;
        }
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(&item))) {
            Ok(true) => self.downstream.on_next(item),
            Ok(false) => {
                // The dropped element consumed one upstream credit;
                // replenish it so the downstream's demand stays live.
                log::trace!("filter: dropped element, re-requesting 1");
                if let Some(subscription) = self.upstream.get() {
                    subscription.request(1);
                }
            }
            Err(panic) => self.fail(StreamError::TransformFault(panic_message(panic))),
        }
    }

    fn on_error(&self, error: StreamError) {
        if self.done.swap(true, Ordering::AcqRel) {
            log::warn!("filter: duplicate terminal signal suppressed");
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            log::warn!("filter: duplicate completion suppressed");
            return;
        }
        log::debug!("filter: forwarding completion");
        self.downstream.on_complete();
    }
}
