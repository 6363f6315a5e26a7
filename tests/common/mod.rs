//! Shared test subscriber that records every signal it receives.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use pullstream::{StreamError, Subscriber, Subscription};

#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

/// Subscriber that records signals and issues a fixed demand pattern:
/// `initial` units inside `on_subscribe`, `per_element` units after each
/// element. Either amount may be zero, meaning no request is made.
pub struct RecordingSubscriber<T> {
    events: Mutex<Vec<Event<T>>>,
    subscription: OnceLock<Arc<dyn Subscription>>,
    initial: u64,
    per_element: u64,
}

impl<T: Send + 'static> RecordingSubscriber<T> {
    pub fn new(initial: u64, per_element: u64) -> Self {
        RecordingSubscriber {
            events: Mutex::new(Vec::new()),
            subscription: OnceLock::new(),
            initial,
            per_element,
        }
    }

    /// Strict one-at-a-time consumer.
    pub fn one_by_one() -> Self {
        Self::new(1, 1)
    }

    /// Consumer that never requests on its own.
    pub fn passive() -> Self {
        Self::new(0, 0)
    }

    pub fn subscription(&self) -> Arc<dyn Subscription> {
        Arc::clone(self.subscription.get().expect("not subscribed"))
    }

    pub fn events(&self) -> Vec<Event<T>>
    where
        T: Clone,
    {
        self.events.lock().unwrap().clone()
    }

    pub fn received(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Next(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, Event::Complete | Event::Error(_)))
            .count()
    }

    pub fn completed(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, Event::Complete))
    }

    pub fn error(&self) -> Option<StreamError> {
        self.events.lock().unwrap().iter().find_map(|event| match event {
            Event::Error(error) => Some(error.clone()),
            _ => None,
        })
    }
}

impl<T: Send + 'static> Subscriber<T> for RecordingSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = self.subscription.set(Arc::clone(&subscription));
        if self.initial > 0 {
            subscription.request(self.initial);
        }
    }

    fn on_next(&self, item: T) {
        self.events.lock().unwrap().push(Event::Next(item));
        if self.per_element > 0 {
            if let Some(subscription) = self.subscription.get() {
                subscription.request(self.per_element);
            }
        }
    }

    fn on_error(&self, error: StreamError) {
        self.events.lock().unwrap().push(Event::Error(error));
    }

    fn on_complete(&self) {
        self.events.lock().unwrap().push(Event::Complete);
    }
}
