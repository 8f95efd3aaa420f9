use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Context, Result};
use onnxserve_core::{NamedArray, RunError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::{InferenceJob, InferenceResponse, Worker, WorkerModel};

#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// 0 means one worker per available CPU.
    pub workers: usize,
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_depth: 64,
        }
    }
}

impl PoolConfig {
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("worker pool is shut down")]
    PoolClosed,

    #[error("worker dropped the request")]
    WorkerLost,

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Cheap to clone; shared by every in-flight call.
#[derive(Clone)]
pub struct PoolHandle {
    txs: Arc<[mpsc::Sender<InferenceJob>]>,
    rr: Arc<AtomicUsize>,
}

impl PoolHandle {
    pub fn workers(&self) -> usize {
        self.txs.len()
    }

    pub async fn submit(&self, inputs: Vec<NamedArray>) -> Result<InferenceResponse, SubmitError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let job = InferenceJob {
            inputs,
            enqueued_at: Instant::now(),
            resp_tx,
        };

        self.dispatch(job).await?;

        let result = resp_rx.await.map_err(|_| SubmitError::WorkerLost)?;
        Ok(result?)
    }

    /// Round-robin, skipping workers whose inbox is full or closed. Waits on
    /// the first open inbox only when none has room, and reports the pool
    /// closed only when every inbox is.
    async fn dispatch(&self, job: InferenceJob) -> Result<(), SubmitError> {
        let start = self.rr.fetch_add(1, Ordering::Relaxed);
        let n = self.txs.len();

        let mut job = job;
        let mut fallback = None;
        for offset in 0..n {
            let idx = (start + offset) % n;
            match self.txs[idx].try_send(job) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    fallback.get_or_insert(idx);
                    job = back;
                }
                Err(TrySendError::Closed(back)) => job = back,
            }
        }

        let idx = fallback.ok_or(SubmitError::PoolClosed)?;
        self.txs[idx]
            .send(job)
            .await
            .map_err(|_| SubmitError::PoolClosed)
    }
}

pub struct WorkerPool {
    handle: PoolHandle,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(model: Arc<dyn WorkerModel>, config: PoolConfig) -> Result<Self> {
        let workers = config.resolved_workers();
        let queue_depth = config.queue_depth.max(1);

        let mut txs = Vec::with_capacity(workers);
        let mut threads = Vec::with_capacity(workers);
        for id in 0..workers {
            let (tx, inbox) = mpsc::channel(queue_depth);
            let worker = Worker {
                id,
                inbox,
                model: Arc::clone(&model),
            };
            let thread = std::thread::Builder::new()
                .name(format!("onnxserve-worker-{id}"))
                .spawn(move || worker.run())
                .with_context(|| format!("failed to spawn worker thread {id}"))?;
            txs.push(tx);
            threads.push(thread);
        }

        Ok(Self {
            handle: PoolHandle {
                txs: txs.into(),
                rr: Arc::new(AtomicUsize::new(0)),
            },
            threads,
        })
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Closes the pool's own handle and waits for the workers to drain.
    /// Returns once every other `PoolHandle` clone has been dropped too.
    pub fn join(self) {
        let WorkerPool { handle, threads } = self;
        drop(handle);
        for thread in threads {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> (InferenceJob, oneshot::Receiver<crate::JobResult>) {
        let (resp_tx, resp_rx) = oneshot::channel();
        let job = InferenceJob {
            inputs: vec![NamedArray::new("x", vec![1.0])],
            enqueued_at: Instant::now(),
            resp_tx,
        };
        (job, resp_rx)
    }

    #[tokio::test]
    async fn closed_inboxes_are_skipped() {
        let (dead_tx, dead_rx) = mpsc::channel(1);
        let (live_tx, mut live_rx) = mpsc::channel(1);
        drop(dead_rx);

        let handle = PoolHandle {
            txs: vec![dead_tx, live_tx].into(),
            rr: Arc::new(AtomicUsize::new(0)),
        };

        let (first, _rx) = job();
        handle.dispatch(first).await.expect("dispatch to the live inbox");
        assert!(live_rx.try_recv().is_ok());

        drop(live_rx);
        let (second, _rx) = job();
        assert!(matches!(
            handle.dispatch(second).await,
            Err(SubmitError::PoolClosed)
        ));
    }
}
