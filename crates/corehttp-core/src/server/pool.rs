// Fixed-size worker pool: a bounded job queue feeding N long-lived OS threads, each
// running one connection to completion before taking the next job. The pool carries no
// protocol knowledge; jobs are opaque closures scheduled by whatever accepts connections.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    /// A distinct channel variant for shutdown rather than a sentinel job value — each
    /// worker breaks its loop on receiving one.
    Shutdown,
}

/// A fixed-size pool of worker threads, each servicing exactly one connection job at a
/// time until the job completes, then pulling the next one from the shared queue.
pub struct WorkerPool {
    sender: Sender<Message>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` worker threads. Panics if `size` is zero, matching the precondition
    /// that a pool with no workers can never make progress.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "worker pool requires at least one thread");

        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            workers.push(thread::spawn(move || worker_loop(id, receiver)));
        }

        info!(worker_count = size, "worker pool started");
        Self { sender, workers }
    }

    /// Schedules a job onto the pool. The returned `Result` only fails if every worker has
    /// already exited (e.g. after `shutdown`), in which case the job is dropped unrun.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(Message::Run(Box::new(job))).is_err() {
            debug!("worker pool job dropped: all workers have exited");
        }
    }

    /// Sends one shutdown message per worker, then joins every thread. Jobs submitted
    /// after this call are never picked up.
    pub fn shutdown(mut self) {
        for _ in 0..self.workers.len() {
            let _ = self.sender.send(Message::Shutdown);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<Receiver<Message>>>) {
    loop {
        let message = {
            let guard = receiver.lock().expect("worker pool receiver lock poisoned");
            guard.recv()
        };
        match message {
            Ok(Message::Run(job)) => job(),
            Ok(Message::Shutdown) | Err(_) => {
                debug!(worker_id = id, "worker shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn runs_submitted_jobs() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(5));

        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
            });
        }
        barrier.wait();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        pool.shutdown();
    }

    #[test]
    fn shutdown_joins_all_workers() {
        let pool = WorkerPool::new(3);
        assert_eq!(pool.worker_count(), 3);
        pool.shutdown();
    }

    #[test]
    #[should_panic]
    fn zero_sized_pool_panics() {
        WorkerPool::new(0);
    }
}
