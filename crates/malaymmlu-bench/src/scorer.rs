use async_trait::async_trait;
use malaymmlu_core::{
    Aggregation, AnswerKey, EvalError, Prediction, Result, ScoredOption, ScoringMode,
};
use tracing::debug;

use crate::backend::InferenceBackend;

/// Ranks candidate answers for one prompt.
#[async_trait]
pub trait OptionScorer: Send + Sync {
    fn mode(&self) -> ScoringMode;

    async fn score(
        &self,
        backend: &dyn InferenceBackend,
        prompt: &str,
        options: &[String],
    ) -> Result<Prediction>;
}

pub fn scorer_for(mode: ScoringMode, aggregation: Aggregation) -> Box<dyn OptionScorer> {
    match mode {
        ScoringMode::FullAnswer => Box::new(FullAnswerScorer::new(aggregation)),
        ScoringMode::ByLetter => Box::new(ByLetterScorer),
    }
}

/// Scores each option by the aggregated log-probability of its full text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAnswerScorer {
    aggregation: Aggregation,
}

impl FullAnswerScorer {
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation }
    }
}

#[async_trait]
impl OptionScorer for FullAnswerScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::FullAnswer
    }

    async fn score(
        &self,
        backend: &dyn InferenceBackend,
        prompt: &str,
        options: &[String],
    ) -> Result<Prediction> {
        ensure_options(options)?;

        let mut scores = Vec::with_capacity(options.len());
        for option in options {
            let trace = backend.continuation_trace(prompt, option).await?;
            let score = self.aggregation.apply(&trace).ok_or_else(|| {
                EvalError::Inference(format!("empty token trace for option {option:?}"))
            })?;
            scores.push(reject_nan(score, option)?);
        }

        let index = argmax(&scores)
            .ok_or_else(|| EvalError::Inference("all option scores are NaN".to_string()))?;
        debug!(?scores, index, aggregation = %self.aggregation, "full answer scored");

        Ok(Prediction {
            index,
            confidence: None,
            scored: pair(options, &scores),
        })
    }
}

/// Scores each option by the next-token probability of its answer letter,
/// normalised over the candidate letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByLetterScorer;

#[async_trait]
impl OptionScorer for ByLetterScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::ByLetter
    }

    async fn score(
        &self,
        backend: &dyn InferenceBackend,
        prompt: &str,
        options: &[String],
    ) -> Result<Prediction> {
        ensure_options(options)?;

        let letters = (0..options.len())
            .map(|i| AnswerKey::from_index(i).map(AnswerKey::letter))
            .collect::<Result<Vec<_>>>()?;

        let mut logprobs = Vec::with_capacity(letters.len());
        for letter in letters {
            let trace = backend.continuation_trace(prompt, letter).await?;
            let first = trace.first().ok_or_else(|| {
                EvalError::Inference(format!("empty token trace for letter {letter}"))
            })?;
            logprobs.push(reject_nan(first.logprob, letter)?);
        }

        let probs = softmax(&logprobs);
        let index = argmax(&probs)
            .ok_or_else(|| EvalError::Inference("all letter scores are NaN".to_string()))?;
        let confidence = probs[index];
        debug!(?probs, index, confidence, "by letter scored");

        Ok(Prediction {
            index,
            confidence: Some(confidence),
            scored: pair(options, &probs),
        })
    }
}

fn ensure_options(options: &[String]) -> Result<()> {
    if options.is_empty() {
        return Err(EvalError::DataFormat("record has no options".to_string()));
    }
    Ok(())
}

/// NaN log-probs fail the record in both modes; `-inf` is a valid score.
fn reject_nan(score: f64, continuation: &str) -> Result<f64> {
    if score.is_nan() {
        return Err(EvalError::Inference(format!(
            "NaN log-prob for {continuation:?}"
        )));
    }
    Ok(score)
}

fn pair(options: &[String], scores: &[f64]) -> Vec<ScoredOption> {
    options
        .iter()
        .zip(scores)
        .map(|(option, &score)| ScoredOption {
            option: option.clone(),
            score,
        })
        .collect()
}

/// Index of the largest value; the first one wins ties and NaN never wins.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Numerically stable softmax over log-probabilities. If every input is
/// `-inf` the result is uniform.
pub fn softmax(logprobs: &[f64]) -> Vec<f64> {
    let max = logprobs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        let n = logprobs.len() as f64;
        return logprobs.iter().map(|_| 1.0 / n).collect();
    }

    let exps: Vec<f64> = logprobs.iter().map(|lp| (lp - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
