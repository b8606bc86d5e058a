pub mod backend;
pub mod completions;
pub mod dataset;
pub mod pipeline;
pub mod prompt;
pub mod runner;
pub mod scorer;
pub mod writer;

#[cfg(test)]
mod testing;

pub use backend::InferenceBackend;
pub use completions::CompletionsBackend;
pub use dataset::{load_records, load_split, validate_records};
pub use pipeline::{evaluate_split, EvaluationReport};
pub use prompt::{render_chat, BuildPrompt, PromptBuilder, PromptedRecord, ANSWER_CUE};
pub use runner::{EvaluationRun, EvaluationRunner};
pub use scorer::{argmax, scorer_for, softmax, ByLetterScorer, FullAnswerScorer, OptionScorer};
pub use writer::{read_results, write_results};
