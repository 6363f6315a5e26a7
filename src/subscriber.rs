//! Terminal consumers and their demand strategies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{StreamError, StreamResult};
use crate::protocol::{Subscriber, Subscription};

/// How a terminal consumer issues demand.
///
/// The stages never special-case any of these: every strategy is just a
/// different pattern of `request` calls on the same subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandStrategy {
    /// Strict one-at-a-time pull: `request(1)` on subscribe and after
    /// every consumed element.
    OneByOne,
    /// Request `n` up front and `n` more after each `n` consumed.
    Batch(u64),
    /// A single `request(u64::MAX)` on subscribe.
    Unbounded,
}

impl DemandStrategy {
    fn initial(&self) -> u64 {
        match self {
            DemandStrategy::OneByOne => 1,
            DemandStrategy::Batch(n) => (*n).max(1),
            DemandStrategy::Unbounded => u64::MAX,
        }
    }
}

/// Terminal consumer that collects every element it receives and records
/// the terminal signal.
///
/// All state is behind interior mutability so the same instance can be
/// handed to `subscribe` as an `Arc` and inspected afterwards; with the
/// synchronous protocol the whole run has finished by the time
/// `subscribe` returns.
pub struct CollectSubscriber<T> {
    strategy: DemandStrategy,
    items: Mutex<Vec<T>>,
    consumed_in_batch: AtomicU64,
    subscription: OnceLock<Arc<dyn Subscription>>,
    terminal: Mutex<Option<StreamResult<()>>>,
}

impl<T> CollectSubscriber<T>
where
    T: Send + 'static,
{
    pub fn new(strategy: DemandStrategy) -> Self {
        CollectSubscriber {
            strategy,
            items: Mutex::new(Vec::new()),
            consumed_in_batch: AtomicU64::new(0),
            subscription: OnceLock::new(),
            terminal: Mutex::new(None),
        }
    }

    /// Strict one-at-a-time consumer.
    pub fn one_by_one() -> Self {
        Self::new(DemandStrategy::OneByOne)
    }

    /// Consumer with a single unbounded request.
    pub fn unbounded() -> Self {
        Self::new(DemandStrategy::Unbounded)
    }

    /// Snapshot of the collected elements.
    pub fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.lock().unwrap().clone()
    }

    /// Drain the collected elements out of the consumer.
    pub fn take_items(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap())
    }

    /// Whether a terminal signal (completion or error) has fired.
    pub fn is_terminated(&self) -> bool {
        self.terminal.lock().unwrap().is_some()
    }

    /// Whether the stream completed normally.
    pub fn is_complete(&self) -> bool {
        matches!(&*self.terminal.lock().unwrap(), Some(Ok(())))
    }

    /// The terminal error, if the stream failed.
    pub fn error(&self) -> Option<StreamError> {
        match &*self.terminal.lock().unwrap() {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Cancel the underlying subscription, if one was received.
    pub fn cancel(&self) {
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }
    }

    /// Record a terminal signal; returns false if one already fired.
    fn set_terminal(&self, outcome: StreamResult<()>) -> bool {
        let mut terminal = self.terminal.lock().unwrap();
        if terminal.is_some() {
            return false;
        }
        *terminal = Some(outcome);
        true
    }
}

impl<T> Subscriber<T> for CollectSubscriber<T>
where
    T: Send + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = self.subscription.set(Arc::clone(&subscription));
        subscription.request(self.strategy.initial());
    }

    fn on_next(&self, item: T) {
        if self.is_terminated() {
            log::warn!("collect: element after terminal signal dropped");
            return;
        }
        // The items lock must be released before requesting: the request
        // re-enters on_next synchronously.
        self.items.lock().unwrap().push(item);
        match self.strategy {
            DemandStrategy::OneByOne => {
                if let Some(subscription) = self.subscription.get() {
                    subscription.request(1);
                }
            }
            DemandStrategy::Batch(n) => {
                let batch = n.max(1);
                let consumed = self.consumed_in_batch.fetch_add(1, Ordering::AcqRel) + 1;
                if consumed >= batch {
                    self.consumed_in_batch.store(0, Ordering::Release);
                    if let Some(subscription) = self.subscription.get() {
                        subscription.request(batch);
                    }
                }
            }
            DemandStrategy::Unbounded => {}
        }
    }

    fn on_error(&self, error: StreamError) {
        if !self.set_terminal(Err(error)) {
            log::warn!("collect: duplicate terminal signal suppressed");
        }
    }

    fn on_complete(&self) {
        if !self.set_terminal(Ok(())) {
            log::warn!("collect: duplicate completion suppressed");
        }
    }
}

/// Terminal consumer that hands each element to a closure, pulling one
/// element at a time. A printing sink is this with a `println!` closure.
pub struct ForEachSubscriber<T, F>
where
    F: Fn(T) + Send + Sync,
{
    handler: F,
    subscription: OnceLock<Arc<dyn Subscription>>,
    terminal: Mutex<Option<StreamResult<()>>>,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T, F> ForEachSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    pub fn new(handler: F) -> Self {
        ForEachSubscriber {
            handler,
            subscription: OnceLock::new(),
            terminal: Mutex::new(None),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal.lock().unwrap().is_some()
    }

    pub fn error(&self) -> Option<StreamError> {
        match &*self.terminal.lock().unwrap() {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }
}

impl<T, F> Subscriber<T> for ForEachSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = self.subscription.set(Arc::clone(&subscription));
        subscription.request(1);
    }

    fn on_next(&self, item: T) {
        if self.is_terminated() {
            log::warn!("for_each: element after terminal signal dropped");
            return;
        }
        (self.handler)(item);
        if let Some(subscription) = self.subscription.get() {
            subscription.request(1);
        }
    }

    fn on_error(&self, error: StreamError) {
        let mut terminal = self.terminal.lock().unwrap();
        if terminal.is_none() {
            *terminal = Some(Err(error));
        } else {
            log::warn!("for_each: duplicate terminal signal suppressed");
        }
    }

    fn on_complete(&self) {
        let mut terminal = self.terminal.lock().unwrap();
        if terminal.is_none() {
            *terminal = Some(Ok(()));
        } else {
            log::warn!("for_each: duplicate completion suppressed");
        }
    }
}
