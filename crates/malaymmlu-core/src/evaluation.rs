use serde::{Deserialize, Serialize};

/// One line of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub input: String,
    pub gold: usize,
    pub options: Vec<String>,
    pub pred: usize,
}

impl EvaluationRow {
    pub fn is_correct(&self) -> bool {
        self.gold == self.pred
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl EvaluationSummary {
    pub fn from_rows(rows: &[EvaluationRow]) -> Self {
        let total = rows.len();
        let correct = rows.iter().filter(|r| r.is_correct()).count();
        let accuracy = match total {
            0 => 0.0,
            n => correct as f64 / n as f64,
        };

        Self {
            total,
            correct,
            accuracy,
        }
    }
}
