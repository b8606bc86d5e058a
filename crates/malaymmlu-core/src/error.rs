use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EvalError {
    /// True for failures raised while talking to the model.
    pub fn is_inference(&self) -> bool {
        matches!(self, EvalError::Inference(_) | EvalError::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
