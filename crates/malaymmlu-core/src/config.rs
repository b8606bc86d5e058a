use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::scoring::{Aggregation, ScoringMode};

pub const DEFAULT_TASK: &str = "MalayMMLU";
pub const KNOWN_TASKS: &[&str] = &[DEFAULT_TASK];
pub const MAX_SHOT: u8 = 3;
/// Records kept in playground mode.
pub const PLAYGROUND_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_task")]
    pub task: String,
    pub base_model: String,
    /// Model name sent to the inference server when it differs from `base_model`.
    #[serde(default)]
    pub served_model: Option<String>,
    #[serde(default)]
    pub scoring_mode: ScoringMode,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub shot: u8,
    #[serde(default)]
    pub playground: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    #[serde(default)]
    pub chat_template: ChatTemplate,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_task() -> String {
    DEFAULT_TASK.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            task: default_task(),
            base_model: String::new(),
            served_model: None,
            scoring_mode: ScoringMode::default(),
            aggregation: Aggregation::default(),
            shot: 0,
            playground: false,
            data_dir: default_data_dir(),
            output_folder: default_output_folder(),
            chat_template: ChatTemplate::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Checks everything that must hold before the first record is touched.
    pub fn validate(&self) -> Result<()> {
        if self.base_model.trim().is_empty() {
            return Err(EvalError::Config("base model is required".to_string()));
        }
        if self.shot > MAX_SHOT {
            return Err(EvalError::Config(format!(
                "shot must be between 0 and {MAX_SHOT}, got {}",
                self.shot
            )));
        }
        if !KNOWN_TASKS.contains(&self.task.as_str()) {
            return Err(EvalError::Config(format!(
                "unknown task {:?} (known: {})",
                self.task,
                KNOWN_TASKS.join(", ")
            )));
        }
        self.backend.validate()
    }

    /// Last path segment of the model identity, e.g. `pixtral-12b`.
    pub fn model_basename(&self) -> &str {
        self.base_model
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.base_model)
    }

    pub fn served_model_name(&self) -> &str {
        self.served_model.as_deref().unwrap_or(&self.base_model)
    }

    pub fn template(&self) -> ChatTemplate {
        self.chat_template.resolve(&self.base_model)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}_{}shot.json", self.task, self.shot))
    }

    /// `{task}_result_{model}_{True|False}_{shot}shot.csv`
    pub fn result_file_name(&self) -> String {
        let by_letter = match self.scoring_mode.is_by_letter() {
            true => "True",
            false => "False",
        };
        format!(
            "{}_result_{}_{}_{}shot.csv",
            self.task,
            self.model_basename(),
            by_letter,
            self.shot
        )
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_folder.join(self.result_file_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub endpoint: String,
    /// Bearer token for gated weights or hosted endpoints.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            token: None,
            timeout_secs: 300,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(EvalError::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(EvalError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Chat wrapping applied around each user prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTemplate {
    /// Pick from the model identity.
    #[default]
    Auto,
    Raw,
    Llama3,
    Mistral,
    ChatMl,
}

impl ChatTemplate {
    pub fn label(&self) -> &'static str {
        match self {
            ChatTemplate::Auto => "auto",
            ChatTemplate::Raw => "raw",
            ChatTemplate::Llama3 => "llama3",
            ChatTemplate::Mistral => "mistral",
            ChatTemplate::ChatMl => "chatml",
        }
    }

    /// Replaces `Auto` with a concrete template for `model`.
    pub fn resolve(self, model: &str) -> ChatTemplate {
        if self != ChatTemplate::Auto {
            return self;
        }
        let model = model.to_lowercase();
        if is_llama_family(&model) {
            return ChatTemplate::Llama3;
        }
        if model.contains("mistral") || model.contains("pixtral") {
            return ChatTemplate::Mistral;
        }
        if model.contains("qwen") {
            return ChatTemplate::ChatMl;
        }
        ChatTemplate::Raw
    }
}

impl FromStr for ChatTemplate {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ChatTemplate::Auto),
            "raw" | "none" => Ok(ChatTemplate::Raw),
            "llama3" | "llama" => Ok(ChatTemplate::Llama3),
            "mistral" => Ok(ChatTemplate::Mistral),
            "chatml" => Ok(ChatTemplate::ChatMl),
            other => Err(EvalError::Config(format!("unknown chat template {other:?}"))),
        }
    }
}

impl fmt::Display for ChatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Llama models get their own few-shot prompt column.
pub fn is_llama_family(model: &str) -> bool {
    model.to_lowercase().contains("llama")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str) -> EvalConfig {
        EvalConfig {
            base_model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_model_rejected() {
        let err = EvalConfig::default().validate().unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));
    }

    #[test]
    fn test_shot_and_task_validated() {
        let mut cfg = config("mistralai/Pixtral-12B-2409");
        assert!(cfg.validate().is_ok());

        cfg.shot = 4;
        assert!(cfg.validate().is_err());

        cfg.shot = 3;
        cfg.task = "ArabicMMLU".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_endpoint_validated() {
        let mut cfg = config("model");
        cfg.backend.endpoint = "localhost:8000".to_string();
        assert!(matches!(cfg.validate(), Err(EvalError::Config(_))));
    }

    #[test]
    fn test_result_file_name() {
        let mut cfg = config("mistral-community/pixtral-12b");
        assert_eq!(cfg.result_file_name(), "MalayMMLU_result_pixtral-12b_False_0shot.csv");

        cfg.scoring_mode = ScoringMode::ByLetter;
        cfg.shot = 2;
        cfg.output_folder = PathBuf::from("out");
        assert_eq!(
            cfg.result_path(),
            PathBuf::from("out/MalayMMLU_result_pixtral-12b_True_2shot.csv")
        );
    }

    #[test]
    fn test_dataset_path() {
        let mut cfg = config("m");
        cfg.shot = 1;
        assert_eq!(cfg.dataset_path(), PathBuf::from("data/MalayMMLU_1shot.json"));
    }

    #[test]
    fn test_template_resolution() {
        assert_eq!(ChatTemplate::Auto.resolve("meta-llama/Llama-3.1-8B"), ChatTemplate::Llama3);
        assert_eq!(ChatTemplate::Auto.resolve("mistral-community/pixtral-12b"), ChatTemplate::Mistral);
        assert_eq!(ChatTemplate::Auto.resolve("Qwen/Qwen2-VL-7B"), ChatTemplate::ChatMl);
        assert_eq!(ChatTemplate::Auto.resolve("gpt2"), ChatTemplate::Raw);
        assert_eq!(ChatTemplate::Raw.resolve("meta-llama/Llama-3.1-8B"), ChatTemplate::Raw);
    }
}
