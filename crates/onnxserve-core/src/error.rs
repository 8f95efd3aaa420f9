use std::path::PathBuf;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The request does not match the model's input slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Input name '{name}' not found in request")]
    InputNotFound { name: String },

    #[error("Invalid input size. Expected: '{expected}' Got: '{got}'")]
    InputSizeMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// The inference engine failed; never attributable to the request shape.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to bind input '{slot}'")]
    Bind { slot: String, source: BoxError },

    #[error("model execution failed")]
    Execute { source: BoxError },

    #[error("engine returned {got} outputs, model declares {expected}")]
    OutputCount { expected: usize, got: usize },

    #[error("output '{slot}' missing from engine result")]
    MissingOutput { slot: String },

    #[error("failed to read output '{slot}'")]
    Extract { slot: String, source: BoxError },

    #[error("inference panicked: {message}")]
    Panicked { message: String },
}

impl EngineError {
    pub fn bind(slot: &str, source: impl Into<BoxError>) -> Self {
        Self::Bind {
            slot: slot.to_string(),
            source: source.into(),
        }
    }

    pub fn execute(source: impl Into<BoxError>) -> Self {
        Self::Execute {
            source: source.into(),
        }
    }

    pub fn extract(slot: &str, source: impl Into<BoxError>) -> Self {
        Self::Extract {
            slot: slot.to_string(),
            source: source.into(),
        }
    }
}

/// Everything that can end a single `Run` call.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RunError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, RunError::Validation(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("File at '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("model file '{}' is not readable", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("engine rejected model '{}'", path.display())]
    Rejected { path: PathBuf, source: BoxError },

    #[error("slot '{name}' is not servable: {reason}")]
    UnsupportedSlot { name: String, reason: String },
}
