use std::sync::Arc;
use std::time::Instant;

use crate::{bind_inputs, extract_outputs, ModelHandle, NamedArray, RunError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub bind_us: u64,
    pub engine_us: u64,
    pub extract_us: u64,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub outputs: Vec<NamedArray>,
    pub timings: Timings,
}

/// Runs one request end to end against a shared model.
///
/// All native tensors for a call live inside `run`: inputs are moved into the
/// engine call and outputs are dropped once extracted, whichever step fails.
pub struct Dispatcher<M> {
    model: Arc<M>,
}

impl<M> Clone for Dispatcher<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
        }
    }
}

impl<M: ModelHandle> Dispatcher<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    pub fn run(&self, request: &[NamedArray]) -> Result<RunOutcome, RunError> {
        let model = self.model.as_ref();

        let t0 = Instant::now();
        let inputs = bind_inputs(model, request)?;
        let bind_us = elapsed_us(t0);

        let t1 = Instant::now();
        let outputs = model.execute(inputs)?;
        let engine_us = elapsed_us(t1);

        let t2 = Instant::now();
        let extracted = extract_outputs(model, &outputs);
        drop(outputs);
        let outputs = extracted?;
        let extract_us = elapsed_us(t2);

        Ok(RunOutcome {
            outputs,
            timings: Timings {
                bind_us,
                engine_us,
                extract_us,
            },
        })
    }
}

fn elapsed_us(t: Instant) -> u64 {
    u64::try_from(t.elapsed().as_micros()).unwrap_or(u64::MAX)
}
