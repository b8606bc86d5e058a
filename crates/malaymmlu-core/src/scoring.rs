use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// How candidate answers are ranked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Likelihood of the whole option text.
    #[default]
    FullAnswer,
    /// Probability of the answer letter as the next token.
    ByLetter,
}

impl ScoringMode {
    pub fn from_by_letter(by_letter: bool) -> Self {
        match by_letter {
            true => ScoringMode::ByLetter,
            false => ScoringMode::FullAnswer,
        }
    }

    pub fn is_by_letter(&self) -> bool {
        matches!(self, ScoringMode::ByLetter)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoringMode::FullAnswer => "full answer",
            ScoringMode::ByLetter => "by letter",
        }
    }
}

/// Reduction of per-token log-probabilities into one score per option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Joint log-likelihood. Favours shorter options.
    #[default]
    Sum,
    /// Per-token average. Length-normalised.
    Mean,
}

impl Aggregation {
    pub fn label(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
        }
    }

    /// `None` for an empty trace.
    pub fn apply(&self, trace: &TokenTrace) -> Option<f64> {
        if trace.is_empty() {
            return None;
        }
        let total = trace.total_logprob();
        match self {
            Aggregation::Sum => Some(total),
            Aggregation::Mean => Some(total / trace.len() as f64),
        }
    }
}

impl FromStr for Aggregation {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" | "avg" => Ok(Aggregation::Mean),
            other => Err(EvalError::Config(format!(
                "unknown aggregation {other:?} (expected sum or mean)"
            ))),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
}

/// Log-probabilities of the tokens of one continuation, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTrace {
    pub tokens: Vec<TokenLogprob>,
}

impl TokenTrace {
    pub fn new(tokens: Vec<TokenLogprob>) -> Self {
        Self { tokens }
    }

    pub fn from_logprobs(logprobs: &[f64]) -> Self {
        let tokens = logprobs
            .iter()
            .map(|&logprob| TokenLogprob {
                token: String::new(),
                logprob,
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first(&self) -> Option<&TokenLogprob> {
        self.tokens.first()
    }

    pub fn total_logprob(&self) -> f64 {
        self.tokens.iter().map(|t| t.logprob).sum()
    }
}

/// A candidate paired with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOption {
    pub option: String,
    pub score: f64,
}

/// Outcome of scoring one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: usize,
    /// Normalised probability of the chosen option (by-letter only).
    #[serde(default)]
    pub confidence: Option<f64>,
    pub scored: Vec<ScoredOption>,
}

impl Prediction {
    pub fn scores(&self) -> Vec<f64> {
        self.scored.iter().map(|s| s.score).collect()
    }
}
