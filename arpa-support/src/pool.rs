//! Fixed-size worker pool for dispatching whole, disjoint tasks (spec
//! §10.4), grounded directly in `original_source/include/threadpool.hpp`'s
//! queue-of-closures/condition-variable design and adapted to Rust's
//! ownership model: a channel replaces the mutex-guarded queue plus condvar,
//! and shutdown is expressed as `Drop` rather than an explicit `wait()`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A pool of `threads` workers pulling boxed closures off a shared FIFO
/// queue. `execute` is fire-and-forget: callers that need a result send it
/// back themselves (a channel, a shared `Mutex<Vec<_>>`) rather than through
/// a per-task future.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

struct Worker {
    handle: Option<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `threads` workers (minimum 1). Falls back to the number of
    /// available cores when `threads == 0`, mirroring the source's
    /// `hardware_concurrency()` default.
    pub fn new(threads: usize) -> Self {
        let threads = if threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            threads
        };

        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            workers.push(Worker::spawn(Arc::clone(&receiver)));
        }

        ThreadPool { workers, sender: Some(sender) }
    }

    /// Queues `job` for execution by the next idle worker. Silently dropped
    /// if the pool is already shutting down (sender gone), matching the
    /// source's `if(!this->stop) ...` guard.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Number of live worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Worker {
    fn spawn(receiver: Arc<Mutex<Receiver<Job>>>) -> Self {
        let handle = thread::spawn(move || loop {
            let job = {
                let rx = receiver.lock().expect("thread pool receiver mutex poisoned");
                rx.recv()
            };
            match job {
                Ok(job) => job(),
                Err(_) => break, // sender dropped, queue drained: shut down
            }
        });
        Worker { handle: Some(handle) }
    }
}

/// Dropping the pool closes the job channel (waking every worker with a
/// `recv` error) then joins each thread, mirroring the source's
/// `~ThreadPool` calling `wait()`.
impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_queued_job() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool); // joins all workers, draining the queue first
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn zero_threads_falls_back_to_available_parallelism() {
        let pool = ThreadPool::new(0);
        assert!(pool.size() >= 1);
    }

    #[test]
    fn results_can_be_collected_through_a_shared_sink() {
        let pool = ThreadPool::new(2);
        let results = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let results = Arc::clone(&results);
            pool.execute(move || {
                results.lock().unwrap().push(i * i);
            });
        }
        drop(pool);
        let mut out = results.lock().unwrap().clone();
        out.sort_unstable();
        assert_eq!(out, (0..10).map(|i| i * i).collect::<Vec<_>>());
    }
}
