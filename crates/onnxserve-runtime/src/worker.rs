use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use onnxserve_core::{EngineError, RunError};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::{InferenceJob, InferenceResponse, WorkerModel};

/// Owns one OS thread; every job it receives runs to completion on that thread.
pub struct Worker {
    pub id: usize,
    pub inbox: mpsc::Receiver<InferenceJob>,
    pub model: Arc<dyn WorkerModel>,
}

impl Worker {
    pub fn run(mut self) {
        info!(worker_id = self.id, "worker started");
        while let Some(job) = self.inbox.blocking_recv() {
            self.handle(job);
        }
        info!(worker_id = self.id, "worker stopped");
    }

    fn handle(&self, job: InferenceJob) {
        let queued_us = u64::try_from(job.enqueued_at.elapsed().as_micros()).unwrap_or(u64::MAX);

        // A panicking model must not take the worker thread down with it.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.model.run(&job.inputs)))
            .unwrap_or_else(|payload| {
                Err(EngineError::Panicked {
                    message: panic_message(payload.as_ref()),
                }
                .into())
            });

        let result = match outcome {
            Ok(outcome) => {
                let timings = outcome.timings;
                debug!(
                    worker_id = self.id,
                    queued_us,
                    bind_us = timings.bind_us,
                    engine_us = timings.engine_us,
                    extract_us = timings.extract_us,
                    "request served"
                );
                Ok(InferenceResponse {
                    outputs: outcome.outputs,
                    queued_us,
                    timings,
                })
            }
            Err(RunError::Validation(err)) => {
                debug!(worker_id = self.id, error = %err, "request rejected");
                Err(RunError::Validation(err))
            }
            Err(RunError::Engine(err)) => {
                error!(worker_id = self.id, error = ?err, "model execution failed");
                Err(RunError::Engine(err))
            }
        };

        if job.resp_tx.send(result).is_err() {
            debug!(worker_id = self.id, "caller went away before the reply");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
