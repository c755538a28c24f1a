//! Retirement engine tests: batch scans, thread-exit handoff, and the
//! global drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use petek::{drain_retired, retire};

struct Counted {
    drops: Arc<AtomicUsize>,
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn retire_counted(n: usize, drops: &Arc<AtomicUsize>) {
    for _ in 0..n {
        let node = Box::into_raw(Box::new(Counted {
            drops: drops.clone(),
        }));
        unsafe { retire(node) };
    }
}

/// Drain until the counter converges. Tests in this binary run in
/// parallel and share the process-wide exile bag, so another test's drain
/// may be freeing our records concurrently.
fn drain_until(drops: &AtomicUsize, expected: usize) {
    for _ in 0..1000 {
        drain_retired();
        if drops.load(Ordering::SeqCst) == expected {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!(
        "drain never converged: {} of {expected} freed",
        drops.load(Ordering::SeqCst)
    );
}

#[test]
fn batch_scan_frees_without_drain() {
    const NODES: usize = 200;
    let drops = Arc::new(AtomicUsize::new(0));

    // Run on a fresh thread so the batch starts empty and the threshold
    // arithmetic is deterministic.
    let handle = {
        let drops = drops.clone();
        thread::spawn(move || {
            retire_counted(NODES, &drops);
            // Nothing is protected, so the threshold scans freed batches
            // already, before any drain.
            assert!(drops.load(Ordering::SeqCst) > 0, "no scan ran");
        })
    };
    handle.join().unwrap();

    drain_until(&drops, NODES);
}

#[test]
#[cfg_attr(miri, ignore)]
fn exited_threads_hand_off_to_drain() {
    const THREADS: usize = 4;
    const NODES: usize = 1000;
    let drops = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let drops = drops.clone();
            thread::spawn(move || retire_counted(NODES, &drops))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every retiring thread has exited; anything its final scan could not
    // free sits in the exile bag. With no publications left the drain
    // reduces the outstanding set to zero.
    drain_until(&drops, THREADS * NODES);
}

#[test]
fn drain_on_empty_bag_is_a_no_op() {
    drain_retired();
    drain_retired();
}
