mod common;

use std::sync::Arc;

use common::{Event, RecordingSubscriber};
use pullstream::{FilterPublisher, MapPublisher, Publisher, VecPublisher};

#[test]
fn map_rewrites_every_element() {
    let source = Arc::new(VecPublisher::new(vec![1, 2, 3]));
    let mapped = MapPublisher::new(source, |x: i32| x * 10);
    let subscriber = Arc::new(RecordingSubscriber::one_by_one());

    mapped.subscribe(subscriber.clone());

    assert_eq!(subscriber.received(), vec![10, 20, 30]);
    assert!(subscriber.completed());
    assert_eq!(subscriber.terminal_count(), 1);
}

#[test]
fn map_changes_element_type() {
    let source = Arc::new(VecPublisher::new(vec![1, 22, 333]));
    let mapped = MapPublisher::new(source, |x: i32| x.to_string());
    let subscriber = Arc::new(RecordingSubscriber::one_by_one());

    mapped.subscribe(subscriber.clone());

    assert_eq!(
        subscriber.received(),
        vec!["1".to_string(), "22".to_string(), "333".to_string()]
    );
}

#[test]
fn map_relays_demand_unchanged() {
    // With a passive downstream, one request(2) through the map stage
    // must produce exactly two source emissions.
    let source = Arc::new(VecPublisher::new(vec![1, 2, 3, 4]));
    let mapped = MapPublisher::new(source, |x: i32| x + 1);
    let subscriber = Arc::new(RecordingSubscriber::passive());

    mapped.subscribe(subscriber.clone());
    subscriber.subscription().request(2);

    assert_eq!(subscriber.received(), vec![2, 3]);
    assert_eq!(subscriber.terminal_count(), 0);
}

#[test]
fn filter_drops_and_replenishes() {
    // Downstream asks one at a time; dropped elements must not stall the
    // pipeline.
    let source = Arc::new(VecPublisher::from_iter(1..=10));
    let filtered = FilterPublisher::new(source, |x: &i32| x % 3 == 0);
    let subscriber = Arc::new(RecordingSubscriber::one_by_one());

    filtered.subscribe(subscriber.clone());

    assert_eq!(subscriber.received(), vec![3, 6, 9]);
    assert!(subscriber.completed());
}

#[test]
fn filter_satisfies_single_request_with_exactly_one_element() {
    // request(1) must yield exactly one accepted element no matter how
    // many are dropped in between, with no completion while the source
    // still has elements.
    let source = Arc::new(VecPublisher::from_iter(1..=100));
    let filtered = FilterPublisher::new(source, |x: &i32| x % 10 == 0);
    let subscriber = Arc::new(RecordingSubscriber::passive());

    filtered.subscribe(subscriber.clone());
    subscriber.subscription().request(1);

    assert_eq!(subscriber.received(), vec![10]);
    assert_eq!(subscriber.terminal_count(), 0);

    subscriber.subscription().request(1);
    assert_eq!(subscriber.received(), vec![10, 20]);
    assert_eq!(subscriber.terminal_count(), 0);
}

#[test]
fn filter_completes_when_tail_is_all_dropped() {
    let source = Arc::new(VecPublisher::new(vec![2, 4, 5, 7, 9]));
    let filtered = FilterPublisher::new(source, |x: &i32| x % 2 == 0);
    let subscriber = Arc::new(RecordingSubscriber::<i32>::passive());

    filtered.subscribe(subscriber.clone());
    subscriber.subscription().request(3);

    // Only two elements pass; the replenishment for 5, 7 and 9 walks the
    // source to exhaustion and the completion comes through.
    assert_eq!(
        subscriber.events(),
        vec![Event::Next(2), Event::Next(4), Event::Complete]
    );
}

#[test]
fn filter_rejecting_everything_still_completes() {
    let source = Arc::new(VecPublisher::from_iter(1..=50));
    let filtered = FilterPublisher::new(source, |_: &i32| false);
    let subscriber = Arc::new(RecordingSubscriber::<i32>::passive());

    filtered.subscribe(subscriber.clone());
    subscriber.subscription().request(1);

    assert_eq!(subscriber.events(), vec![Event::Complete]);
}

#[test]
fn stages_preserve_source_order() {
    let source = Arc::new(VecPublisher::new(vec![5, 1, 4, 2, 3, 8, 7, 6]));
    let mapped = Arc::new(MapPublisher::new(source, |x: i32| x * 2));
    let filtered = FilterPublisher::new(mapped, |x: &i32| *x >= 6);
    let subscriber = Arc::new(RecordingSubscriber::one_by_one());

    filtered.subscribe(subscriber.clone());

    assert_eq!(subscriber.received(), vec![10, 8, 6, 16, 14, 12]);
}
