//! A fixed-size worker pool fed by a lock-free MPMC queue.
//!
//! Callers submit closures and get back a handle that eventually carries
//! the closure's result (or its panic). Workers drain the queue without
//! taking any lock; they only touch a mutex to sleep when the queue runs
//! dry, coordinated through a wake-sequence counter that cannot lose
//! wakeups.
//!
//! # Example
//!
//! ```rust
//! use petek_pool::WorkerPool;
//!
//! let pool = WorkerPool::new(4);
//! let sum = pool.submit(|| (1..=5).sum::<i32>()).unwrap();
//! assert_eq!(sum.join().unwrap(), 15);
//! ```

mod error;
mod pool;
mod task;
mod wake;

pub use error::SubmitError;
pub use pool::WorkerPool;
pub use task::JoinHandle;
