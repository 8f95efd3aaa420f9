use onnxserve_core::{NamedArray, RunError, Timings};
use tokio::sync::oneshot;

pub type JobResult = Result<InferenceResponse, RunError>;

#[derive(Debug)]
pub struct InferenceJob {
    pub inputs: Vec<NamedArray>,
    pub enqueued_at: std::time::Instant,
    pub resp_tx: oneshot::Sender<JobResult>,
}

#[derive(Debug)]
pub struct InferenceResponse {
    pub outputs: Vec<NamedArray>,
    /// Time spent waiting in a worker inbox.
    pub queued_us: u64,
    pub timings: Timings,
}
