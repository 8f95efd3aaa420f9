use onnxserve_core::{Dispatcher, ModelHandle, NamedArray, RunError, RunOutcome};

/// Object-safe view of a dispatcher, so workers do not carry the model type.
/// Synchronous; the worker thread calls it directly.
pub trait WorkerModel: Send + Sync {
    fn run(&self, inputs: &[NamedArray]) -> Result<RunOutcome, RunError>;
}

impl<M: ModelHandle> WorkerModel for Dispatcher<M> {
    fn run(&self, inputs: &[NamedArray]) -> Result<RunOutcome, RunError> {
        Dispatcher::run(self, inputs)
    }
}
