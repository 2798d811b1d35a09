//! Concurrent lifecycle transitions
//!
//! Racing callers on the same message must observe exactly one success.

use courier_test_utils::{fixtures, MessagePriority, MessageStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[path = "support/broker.rs"]
mod test_broker_support;
use test_broker_support::empty_broker;

const THREADS: usize = 16;

#[test]
fn concurrent_acknowledgers_see_one_success() {
    let broker = empty_broker();
    let id = broker
        .send(fixtures::onboarding_request("Agent-1", 1))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let successes = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let broker = broker.clone();
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                barrier.wait();
                if broker.acknowledge(&id, "Agent-1").unwrap() {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(
        broker.get_message(&id).unwrap().unwrap().status,
        MessageStatus::Acknowledged
    );
}

#[test]
fn concurrent_broadcast_acks_are_independent() {
    let broker = empty_broker();
    let id = broker.send(fixtures::broadcast_request(true)).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let broker = broker.clone();
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let agent = format!("Agent-{}", n % 4);
                broker.acknowledge(&id, &agent).unwrap()
            })
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|acked| *acked)
        .count();

    // One success per distinct agent.
    assert_eq!(successes, 4);
}

#[test]
fn concurrent_senders_all_land() {
    let broker = empty_broker();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let broker = broker.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    broker
                        .send(fixtures::direct_request("Agent-1", MessagePriority::Normal))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(broker.store().len().unwrap(), THREADS * 10);
    assert_eq!(
        broker.get_messages_for_agent("Agent-1", None, None).unwrap().len(),
        THREADS * 10
    );
}
