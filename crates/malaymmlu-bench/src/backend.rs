use async_trait::async_trait;
use malaymmlu_core::{Result, TokenTrace};

/// Source of token log-probabilities for a prompt continuation.
///
/// Implementations are driven strictly sequentially by one runner; they do
/// not need to tolerate concurrent calls.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Log-probabilities of each token of `continuation` when it follows
    /// `prompt`, in order. A non-empty continuation must yield at least one
    /// token.
    async fn continuation_trace(&self, prompt: &str, continuation: &str) -> Result<TokenTrace>;
}

#[async_trait]
impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn continuation_trace(&self, prompt: &str, continuation: &str) -> Result<TokenTrace> {
        (**self).continuation_trace(prompt, continuation).await
    }
}
