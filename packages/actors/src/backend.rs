//! Generation backend trait.

/// Raw output of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Backend failures.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for backend calls.
pub type BackendResult = Result<Generation, BackendError>;

/// Something that turns a prompt into text.
///
/// `generate` is blocking and may take minutes. Workers call it on the
/// blocking thread pool, never on an actor's task.
pub trait GenerationBackend: Send + Sync + 'static {
    /// Name reported by health and stats endpoints.
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str) -> BackendResult;
}

/// A simple function-based backend.
pub struct FnBackend<F>
where
    F: Fn(&str) -> BackendResult + Send + Sync + 'static,
{
    name: String,
    generate: F,
}

impl<F> FnBackend<F>
where
    F: Fn(&str) -> BackendResult + Send + Sync + 'static,
{
    /// Create a new function-based backend.
    pub fn new(name: impl Into<String>, generate: F) -> Self {
        Self {
            name: name.into(),
            generate,
        }
    }
}

impl<F> GenerationBackend for FnBackend<F>
where
    F: Fn(&str) -> BackendResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &str) -> BackendResult {
        (self.generate)(prompt)
    }
}
