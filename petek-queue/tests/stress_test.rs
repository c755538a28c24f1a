//! MPMC exactly-once stress: every enqueued value is dequeued exactly
//! once, with no duplicates and nothing out of range.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use petek_queue::ms_queue::MsQueue;

#[test]
#[cfg_attr(miri, ignore)]
fn mpmc_exactly_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: usize = 50_000;
    const TOTAL: usize = PRODUCERS * ITEMS_PER_PRODUCER;

    let queue = Arc::new(MsQueue::new());
    let received: Arc<Vec<AtomicBool>> =
        Arc::new((0..TOTAL).map(|_| AtomicBool::new(false)).collect());
    let consumed = Arc::new(AtomicUsize::new(0));
    let duplicates = Arc::new(AtomicUsize::new(0));
    let out_of_range = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    queue.enqueue(p * ITEMS_PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            let received = received.clone();
            let consumed = consumed.clone();
            let duplicates = duplicates.clone();
            let out_of_range = out_of_range.clone();
            thread::spawn(move || {
                while consumed.load(Ordering::Acquire) < TOTAL {
                    match queue.try_dequeue() {
                        Some(value) => {
                            consumed.fetch_add(1, Ordering::AcqRel);
                            if value >= TOTAL {
                                out_of_range.fetch_add(1, Ordering::Relaxed);
                            } else if received[value].swap(true, Ordering::Relaxed) {
                                duplicates.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        None => thread::yield_now(),
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    for consumer in consumers {
        consumer.join().unwrap();
    }

    assert_eq!(consumed.load(Ordering::SeqCst), TOTAL);
    assert_eq!(duplicates.load(Ordering::SeqCst), 0);
    assert_eq!(out_of_range.load(Ordering::SeqCst), 0);
    assert!(received.iter().all(|r| r.load(Ordering::SeqCst)));
    assert!(queue.is_empty());

    // The queue was used standalone; give retired dummies back.
    petek_queue::drain_retired();
}
