pub mod assistant;
pub mod ollama;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model returned an empty response")]
    Empty,

    #[error("Model error: {0}")]
    Other(String),
}

/// Free-text generation. Output has no structure guarantees.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
