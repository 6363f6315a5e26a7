//! Async interop: expose a pull pipeline as a `futures` stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::task::{Context, Poll, Waker};

use futures_core::Stream;
use futures_util::stream::BoxStream;

use crate::error::{StreamError, StreamResult};
use crate::protocol::{Publisher, Subscriber, Subscription};

/// Boxed form of [`PullStream`], analogous to a `BoxStream` of results.
pub type BoxedPullStream<T> = BoxStream<'static, StreamResult<T>>;

/// Adapter implementing `futures_core::Stream` over a publisher chain.
///
/// Each `poll_next` issues a `request(1)`; for the call-stack-bound
/// publishers built from this crate's stages the element (or the
/// terminal signal) lands in the adapter before `request` returns, so
/// the poll never parks. A publisher that emits off the polling thread
/// parks the task instead: the waker is registered before demand is
/// issued and every subscriber callback wakes it. A terminal error is
/// yielded as one `Err` item, then the stream ends.
///
/// Dropping the adapter cancels the subscription.
pub struct PullStream<T> {
    publisher: Arc<dyn Publisher<T>>,
    relay: Arc<BridgeSubscriber<T>>,
    subscribed: bool,
}

impl<T> PullStream<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(publisher: Arc<dyn Publisher<T>>) -> Self {
        PullStream {
            publisher,
            relay: Arc::new(BridgeSubscriber {
                buffered: Mutex::new(VecDeque::new()),
                terminal: Mutex::new(None),
                error_delivered: AtomicBool::new(false),
                subscription: OnceLock::new(),
                waker: Mutex::new(None),
            }),
            subscribed: false,
        }
    }
}

impl<T> Stream for PullStream<T>
where
    T: Send + Sync + 'static,
{
    type Item = StreamResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if !this.subscribed {
            this.subscribed = true;
            let relay: Arc<dyn Subscriber<T>> = this.relay.clone();
            this.publisher.subscribe(relay);
        }
        loop {
            if let Some(item) = this.relay.pop() {
                return Poll::Ready(Some(Ok(item)));
            }
            match this.relay.terminal() {
                Some(Ok(())) => return Poll::Ready(None),
                Some(Err(error)) => {
                    if this.relay.error_delivered.swap(true, Ordering::AcqRel) {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Err(error)));
                }
                None => {}
            }
            // Register before issuing demand so an emission landing from
            // another thread cannot slip between the idle check and the
            // park.
            this.relay.set_waker(cx.waker());
            match this.relay.subscription.get() {
                Some(subscription) => subscription.request(1),
                None => return Poll::Ready(None),
            }
            // A synchronous publisher has emitted or terminated by now;
            // an empty buffer with no terminal means the upstream will
            // deliver later and wake the registered waker.
            if this.relay.is_idle() {
                log::trace!("bridge: parked awaiting upstream emission");
                return Poll::Pending;
            }
        }
    }
}

impl<T> Drop for PullStream<T> {
    fn drop(&mut self) {
        if let Some(subscription) = self.relay.subscription.get() {
            subscription.cancel();
        }
    }
}

/// Internal subscriber feeding the adapter: elements queue up (at most
/// one at a time under `request(1)` demand), the terminal signal latches.
struct BridgeSubscriber<T> {
    buffered: Mutex<VecDeque<T>>,
    terminal: Mutex<Option<StreamResult<()>>>,
    error_delivered: AtomicBool,
    subscription: OnceLock<Arc<dyn Subscription>>,
    waker: Mutex<Option<Waker>>,
}

impl<T> BridgeSubscriber<T> {
    fn pop(&self) -> Option<T> {
        self.buffered.lock().unwrap().pop_front()
    }

    fn terminal(&self) -> Option<StreamResult<()>> {
        self.terminal.lock().unwrap().clone()
    }

    fn is_idle(&self) -> bool {
        self.buffered.lock().unwrap().is_empty() && self.terminal.lock().unwrap().is_none()
    }

    fn set_waker(&self, waker: &Waker) {
        *self.waker.lock().unwrap() = Some(waker.clone());
    }

    fn wake(&self) {
        if let Some(waker) = self.waker.lock().unwrap().take() {
            waker.wake();
        }
    }
}

impl<T> Subscriber<T> for BridgeSubscriber<T>
where
    T: Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        // Demand is issued from poll_next, not from here.
        let _ = self.subscription.set(subscription);
    }

    fn on_next(&self, item: T) {
        if self.terminal.lock().unwrap().is_some() {
            log::warn!("bridge: element after terminal signal dropped");
            return;
        }
        self.buffered.lock().unwrap().push_back(item);
        self.wake();
    }

    fn on_error(&self, error: StreamError) {
        {
            let mut terminal = self.terminal.lock().unwrap();
            if terminal.is_none() {
                *terminal = Some(Err(error));
            } else {
                log::warn!("bridge: duplicate terminal signal suppressed");
            }
        }
        self.wake();
    }

    fn on_complete(&self) {
        {
            let mut terminal = self.terminal.lock().unwrap();
            if terminal.is_none() {
                *terminal = Some(Ok(()));
            } else {
                log::warn!("bridge: duplicate completion suppressed");
            }
        }
        self.wake();
    }
}
