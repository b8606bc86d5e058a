use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use malaymmlu_core::{EvalError, Result, TokenTrace};

use crate::backend::InferenceBackend;

/// Deterministic backend for tests: log-probs are looked up by continuation.
#[derive(Default)]
pub struct ScriptedBackend {
    traces: HashMap<String, Vec<f64>>,
    default: Option<Vec<f64>>,
    failing_continuations: Vec<String>,
    failing_prompts: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continuation(mut self, continuation: &str, logprobs: &[f64]) -> Self {
        self.traces
            .insert(continuation.to_string(), logprobs.to_vec());
        self
    }

    pub fn with_default(mut self, logprobs: &[f64]) -> Self {
        self.default = Some(logprobs.to_vec());
        self
    }

    pub fn failing_on(mut self, continuation: &str) -> Self {
        self.failing_continuations.push(continuation.to_string());
        self
    }

    /// Fails every call whose prompt contains `marker`.
    pub fn failing_on_prompt(mut self, marker: &str) -> Self {
        self.failing_prompts.push(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn continuation_trace(&self, prompt: &str, continuation: &str) -> Result<TokenTrace> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_continuations.iter().any(|c| c == continuation)
            || self.failing_prompts.iter().any(|m| prompt.contains(m.as_str()))
        {
            return Err(EvalError::Inference(format!(
                "scripted failure for {continuation:?}"
            )));
        }

        self.traces
            .get(continuation)
            .or(self.default.as_ref())
            .map(|lp| TokenTrace::from_logprobs(lp))
            .ok_or_else(|| EvalError::Inference(format!("no script for {continuation:?}")))
    }
}
