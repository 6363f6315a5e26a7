//! Source stage: a publisher over an in-memory finite sequence.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::demand::Demand;
use crate::error::StreamError;
use crate::protocol::{Publisher, Subscriber, Subscription};

/// Publisher that emits the elements of an owned sequence in order, one
/// per unit of demand, then completes.
///
/// The sequence is shared (`Arc<[T]>`) so the publisher itself stays
/// inert and cheap to clone; each subscriber receives an owned clone of
/// every element it has credit for.
pub struct VecPublisher<T> {
    items: Arc<[T]>,
}

impl<T> VecPublisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a publisher over the given elements.
    pub fn new(items: Vec<T>) -> Self {
        VecPublisher {
            items: items.into(),
        }
    }

    /// Create a publisher from any finite iterator.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::new(iter.into_iter().collect())
    }

    /// Number of elements the publisher will emit in total.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the publisher completes immediately on first request.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Clone for VecPublisher<T> {
    fn clone(&self) -> Self {
        VecPublisher {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Publisher<T> for VecPublisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(VecSubscription {
            items: Arc::clone(&self.items),
            subscriber: Arc::clone(&subscriber),
            cursor: AtomicUsize::new(0),
            demand: Demand::new(),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            emitting: AtomicBool::new(false),
        });
        log::debug!("source: subscribed ({} elements)", self.items.len());
        subscriber.on_subscribe(subscription);
    }
}

/// The source-side subscription: read cursor, credit counter, lifecycle
/// flags, and the drain loop that serializes emission.
struct VecSubscription<T> {
    items: Arc<[T]>,
    subscriber: Arc<dyn Subscriber<T>>,
    cursor: AtomicUsize,
    demand: Demand,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    emitting: AtomicBool,
}

impl<T> VecSubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Deliver the once-only completion signal and make the subscription
    /// inert.
    fn complete(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("source: complete");
        self.subscriber.on_complete();
    }

    /// Emit elements while credit and elements remain.
    ///
    /// Only one caller holds the `emitting` flag at a time; reentrant
    /// `request` calls (a subscriber requesting more from inside
    /// `on_next`) and cross-thread `request` calls merely add credit,
    /// which the holder picks up before releasing the flag. This is what
    /// serializes `on_next`/`on_complete` per subscription and keeps the
    /// stack depth flat for one-at-a-time consumers.
    ///
    /// The flag, the lifecycle flags and the credit counter all use
    /// `SeqCst`: the handshake relies on a total order between "publish
    /// credit/cancellation, then read `emitting`" on one side and
    /// "release `emitting`, then re-read credit/cancellation" on the
    /// other. Weaker orderings allow both sides to read stale values and
    /// strand a credit or a completion signal.
    fn drain(&self) {
        if self.emitting.swap(true, Ordering::SeqCst) {
            return;
        }
        loop {
            loop {
                // A terminal signal may have fired from inside on_next
                // (request(0) fails fast); nothing may follow it.
                if self.terminated.load(Ordering::SeqCst) {
                    self.emitting.store(false, Ordering::SeqCst);
                    return;
                }
                if self.cancelled.load(Ordering::SeqCst) {
                    self.emitting.store(false, Ordering::SeqCst);
                    self.complete();
                    return;
                }
                let index = self.cursor.load(Ordering::Acquire);
                if index >= self.items.len() {
                    break;
                }
                if !self.demand.try_consume_one() {
                    break;
                }
                // Exclusive writer while holding the emitting flag
                self.cursor.store(index + 1, Ordering::Release);
                log::trace!("source: emitting element {}", index);
                self.subscriber.on_next(self.items[index].clone());
            }

            if self.cursor.load(Ordering::Acquire) >= self.items.len() {
                self.emitting.store(false, Ordering::SeqCst);
                self.complete();
                return;
            }

            self.emitting.store(false, Ordering::SeqCst);

            // Credit or a lifecycle change may have arrived between the
            // last check and the flag release; re-check and re-acquire.
            if self.terminated.load(Ordering::SeqCst) {
                return;
            }
            if self.cancelled.load(Ordering::SeqCst) {
                self.complete();
                return;
            }
            if self.demand.outstanding() == 0 {
                return;
            }
            if self.emitting.swap(true, Ordering::SeqCst) {
                return;
            }
        }
    }
}

impl<T> Subscription for VecSubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if self.terminated.load(Ordering::SeqCst) || self.cancelled.load(Ordering::SeqCst) {
            log::warn!("source: request({}) after termination ignored", n);
            return;
        }
        if n == 0 {
            // Protocol violation: fail fast rather than silently ignore
            if !self.terminated.swap(true, Ordering::SeqCst) {
                log::warn!("source: request(0) is a protocol violation");
                self.subscriber.on_error(StreamError::InvalidDemand);
            }
            return;
        }
        self.demand.add(n);
        self.drain();
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            log::warn!("source: duplicate cancel ignored");
            return;
        }
        log::debug!("source: cancelled");
        // If a drain is in flight it observes the flag between emissions
        // and delivers the completion itself; the SeqCst order guarantees
        // either this load sees the in-flight drain or that drain's
        // re-check sees the cancellation.
        if !self.emitting.load(Ordering::SeqCst) {
            self.complete();
        }
    }
}
