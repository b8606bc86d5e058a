use std::time::Duration;

use async_trait::async_trait;
use malaymmlu_core::{BackendConfig, EvalError, Result, TokenLogprob, TokenTrace};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::backend::InferenceBackend;

/// Scores continuations through an OpenAI-compatible `/v1/completions`
/// endpoint (vLLM, llama.cpp server, TGI) using prompt echo.
#[derive(Debug, Clone)]
pub struct CompletionsBackend {
    url: String,
    model: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    logprobs: u32,
    echo: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    logprobs: Option<CompletionLogprobs>,
}

#[derive(Debug, Deserialize)]
struct CompletionLogprobs {
    tokens: Vec<String>,
    token_logprobs: Vec<Option<f64>>,
    text_offset: Vec<usize>,
}

impl CompletionsBackend {
    pub fn new(config: &BackendConfig, model: &str) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EvalError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: completions_url(&config.endpoint),
            model: model.to_string(),
            token: config.token.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn complete(&self, prompt: String) -> Result<CompletionResponse> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: 1,
            temperature: 0.0,
            logprobs: 1,
            echo: true,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| EvalError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EvalError::Inference(format!(
                "Completion failed: {} - {}",
                status,
                truncate(&body)
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| EvalError::Http(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            EvalError::Inference(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                truncate(&body)
            ))
        })
    }
}

#[async_trait]
impl InferenceBackend for CompletionsBackend {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn continuation_trace(&self, prompt: &str, continuation: &str) -> Result<TokenTrace> {
        let response = self.complete(format!("{prompt}{continuation}")).await?;

        let logprobs = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.logprobs)
            .ok_or_else(|| EvalError::Inference("response carries no logprobs".to_string()))?;

        let trace = extract_continuation(&logprobs, continuation.chars().count())?;
        debug!(tokens = trace.len(), total = trace.total_logprob(), "continuation scored");
        Ok(trace)
    }
}

/// Picks the echoed tokens that make up the continuation.
///
/// Offsets are counted over decoded token text, where special tokens of a
/// chat template decode to nothing, so the continuation is located from the
/// end: the last entry is the single generated token and its offset is where
/// the echoed text stops. A token straddling the prompt boundary is an error.
fn extract_continuation(
    logprobs: &CompletionLogprobs,
    continuation_chars: usize,
) -> Result<TokenTrace> {
    if logprobs.tokens.len() != logprobs.token_logprobs.len()
        || logprobs.tokens.len() != logprobs.text_offset.len()
    {
        return Err(EvalError::Inference(
            "logprobs arrays have mismatched lengths".to_string(),
        ));
    }

    let echoed = logprobs.tokens.len().saturating_sub(1);
    let echo_end = *logprobs
        .text_offset
        .last()
        .ok_or_else(|| EvalError::Inference("response carries no tokens".to_string()))?;
    let boundary = echo_end.checked_sub(continuation_chars).ok_or_else(|| {
        EvalError::Inference(format!(
            "echoed text ({echo_end} chars) is shorter than the continuation"
        ))
    })?;

    let mut tokens = Vec::new();
    for ((token, logprob), &start) in logprobs
        .tokens
        .iter()
        .zip(&logprobs.token_logprobs)
        .zip(&logprobs.text_offset)
        .take(echoed)
    {
        let end = start + token.chars().count();
        if end <= boundary || start >= echo_end {
            continue;
        }
        if start < boundary {
            return Err(EvalError::Inference(format!(
                "token {token:?} spans the prompt and the continuation"
            )));
        }
        let logprob = logprob.ok_or_else(|| {
            EvalError::Inference(format!("missing logprob for continuation token {token:?}"))
        })?;
        tokens.push(TokenLogprob {
            token: token.clone(),
            logprob,
        });
    }

    if tokens.is_empty() && continuation_chars > 0 {
        return Err(EvalError::Inference(
            "no echoed tokens cover the continuation".to_string(),
        ));
    }

    Ok(TokenTrace::new(tokens))
}

fn completions_url(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    match base.ends_with("/v1") {
        true => format!("{base}/completions"),
        false => format!("{base}/v1/completions"),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}
