pub mod config;
pub mod error;
pub mod evaluation;
pub mod record;
pub mod scoring;

pub use config::{
    is_llama_family, BackendConfig, ChatTemplate, EvalConfig, DEFAULT_TASK, KNOWN_TASKS,
    MAX_SHOT, PLAYGROUND_SIZE,
};
pub use error::{EvalError, Result};
pub use evaluation::{EvaluationRow, EvaluationSummary};
pub use record::{AnswerKey, BenchmarkRecord, ANSWER_LETTERS};
pub use scoring::{Aggregation, Prediction, ScoredOption, ScoringMode, TokenLogprob, TokenTrace};
