//! Deferred execution of handler bodies.
//!
//! The network context only accepts a request and hands the slow part to
//! [`Scheduler::schedule`], which queues it for a small pool of worker tasks.
//! Ordering across jobs is not guaranteed; each job runs to completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A fixed pool of workers draining one job queue.
pub struct Scheduler {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    completed: Arc<AtomicU64>,
}

impl Scheduler {
    /// Spawn `workers` worker tasks on the current runtime.
    ///
    /// Must be called from within a tokio runtime. Zero workers is treated
    /// as one.
    pub fn new(workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let completed = Arc::new(AtomicU64::new(0));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let completed = completed.clone();
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };

                        // Own task, so a panicking job is reported instead of
                        // taking the worker down with it.
                        if let Err(e) = tokio::spawn(job).await {
                            tracing::error!(worker, error = %e, "scheduled job failed");
                        }
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    tracing::trace!(worker, "scheduler worker stopped");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            completed,
        }
    }

    /// Queue `work` for execution. Never blocks.
    ///
    /// Returns `false` if the scheduler has been shut down.
    pub fn schedule<F>(&self, work: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(Box::pin(work)).is_ok(),
            None => false,
        }
    }

    /// Number of jobs that have finished, successfully or not.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Stop accepting work, let already queued jobs finish, then join the
    /// workers. Idempotent.
    pub async fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let workers: Vec<_> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "scheduler worker exited abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_scheduled_work() {
        let scheduler = Scheduler::new(2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        for i in 0..10 {
            let tx = tx.clone();
            assert!(scheduler.schedule(async move {
                tx.send(i).unwrap();
            }));
        }

        let mut seen = Vec::new();
        for _ in 0..10 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let scheduler = Scheduler::new(1);
        for _ in 0..5 {
            scheduler.schedule(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            });
        }

        scheduler.shutdown().await;
        assert_eq!(scheduler.completed(), 5);
        assert!(!scheduler.schedule(async {}));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let scheduler = Scheduler::new(1);
        scheduler.schedule(async { panic!("boom") });
        scheduler.schedule(async {});

        scheduler.shutdown().await;
        assert_eq!(scheduler.completed(), 2);
    }

    #[tokio::test]
    async fn test_schedule_does_not_wait_for_slow_job() {
        let scheduler = Scheduler::new(1);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        scheduler.schedule(async move {
            let _ = release_rx.await;
        });

        // The worker is busy; scheduling more still returns immediately.
        assert!(scheduler.schedule(async {}));
        assert_eq!(scheduler.completed(), 0);

        release_tx.send(()).unwrap();
        scheduler.shutdown().await;
        assert_eq!(scheduler.completed(), 2);
    }
}
