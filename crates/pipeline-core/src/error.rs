use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("LLM call failed: {0}")]
    LlmFailure(String),

    #[error("Fallback failed after LLM error; llm: {llm_error}; fallback: {fallback_error}")]
    FallbackFailure {
        llm_error: String,
        fallback_error: String,
    },

    #[error("Missing component score: {0}")]
    MissingComponent(String),
}
