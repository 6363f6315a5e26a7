//! Fluent, lazy pipeline composition.
//!
//! `Pipeline::from_vec(..).map(..).filter(..)` only builds the publisher
//! chain; nothing subscribes, nothing reads the source, and no user
//! function runs until a terminal [`subscribe`](Pipeline::subscribe)
//! call. Construction has zero side effects.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::bridge::{BoxedPullStream, PullStream};
use crate::error::StreamResult;
use crate::protocol::{Publisher, Subscriber};
use crate::source::VecPublisher;
use crate::stage::{FilterPublisher, MapPublisher};
use crate::subscriber::CollectSubscriber;

/// An ordered chain of stages from a source through zero or more
/// map/filter stages, not yet subscribed.
pub struct Pipeline<T> {
    publisher: Arc<dyn Publisher<T>>,
}

impl<T> Pipeline<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a pipeline from an owned sequence.
    pub fn from_vec(items: Vec<T>) -> Self {
        Pipeline {
            publisher: Arc::new(VecPublisher::new(items)),
        }
    }

    /// Start a pipeline from any finite iterator.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Pipeline {
            publisher: Arc::new(VecPublisher::from_iter(iter)),
        }
    }
}

impl<T> Pipeline<T>
where
    T: Send + Sync + 'static,
{
    /// Wrap an existing publisher (e.g. a custom source stage).
    pub fn from_publisher(publisher: Arc<dyn Publisher<T>>) -> Self {
        Pipeline { publisher }
    }

    /// Append a transform stage.
    pub fn map<R, F>(self, mapper: F) -> Pipeline<R>
    where
        R: Send + Sync + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Pipeline {
            publisher: Arc::new(MapPublisher::new(self.publisher, mapper)),
        }
    }

    /// Append a fallible transform stage; an `Err` fails the pipeline
    /// and cancels the source.
    pub fn map_result<R, F>(self, mapper: F) -> Pipeline<R>
    where
        R: Send + Sync + 'static,
        F: Fn(T) -> StreamResult<R> + Send + Sync + 'static,
    {
        Pipeline {
            publisher: Arc::new(MapPublisher::fallible(self.publisher, mapper)),
        }
    }

    /// Append a filter stage.
    pub fn filter<F>(self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Pipeline {
            publisher: Arc::new(FilterPublisher::new(self.publisher, predicate)),
        }
    }

    /// Terminally subscribe: the whole exchange, from the first `request`
    /// to the terminal signal, runs synchronously inside this call for
    /// any consumer that issues demand from its callbacks.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    /// Run the pipeline to completion under unbounded demand and return
    /// the collected elements, or the terminal error.
    pub fn collect(self) -> StreamResult<Vec<T>> {
        let collector = Arc::new(CollectSubscriber::unbounded());
        self.publisher.subscribe(collector.clone());
        match collector.error() {
            Some(error) => Err(error),
            None => Ok(collector.take_items()),
        }
    }

    /// Expose the pipeline as a boxed async stream of results.
    pub fn into_stream(self) -> BoxedPullStream<T> {
        PullStream::new(self.publisher).boxed()
    }
}
