//! Submit a few tasks, wait on their handles, stop the pool.

use petek_pool::WorkerPool;

fn main() {
    let pool = WorkerPool::default();
    println!("pool size: {}", pool.size());

    let small = pool
        .submit(|| vec![1, 2, 3, 4, 5].into_iter().sum::<i32>())
        .unwrap();

    let big = pool.submit(|| (1u64..=100_000).sum::<u64>()).unwrap();

    pool.submit(|| println!("hello from a pool task"))
        .unwrap()
        .join()
        .unwrap();

    println!("sum(v) = {}", small.join().unwrap());
    println!("sum(1..=100000) = {}", big.join().unwrap());

    pool.request_stop();
}
