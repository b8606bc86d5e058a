use malaymmlu_core::{BenchmarkRecord, EvalError, EvaluationRow, Result, ScoringMode};
use tracing::{debug, error, info};

use crate::backend::InferenceBackend;
use crate::prompt::BuildPrompt;
use crate::scorer::OptionScorer;

/// Owns the model handle for the duration of an evaluation.
pub struct EvaluationRunner<B, P> {
    backend: B,
    scorer: Box<dyn OptionScorer>,
    builder: P,
}

impl<B, P> EvaluationRunner<B, P>
where
    B: InferenceBackend,
    P: BuildPrompt,
{
    pub fn new(backend: B, scorer: Box<dyn OptionScorer>, builder: P) -> Self {
        Self {
            backend,
            scorer,
            builder,
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.scorer.mode()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Starts a lazy pass over `records`. Nothing is scored until rows are
    /// pulled; a second pass needs a second call and re-runs inference.
    pub fn run(&mut self, records: Vec<BenchmarkRecord>) -> EvaluationRun<'_, B, P> {
        info!(
            "Starting {} evaluation of {} records with {}",
            self.scorer.mode().label(),
            records.len(),
            self.backend.name()
        );

        EvaluationRun {
            total: records.len(),
            records: records.into_iter(),
            runner: self,
            processed: 0,
            failed: false,
        }
    }

    async fn evaluate(&self, record: &BenchmarkRecord) -> Result<EvaluationRow> {
        let prompted = self.builder.build(record)?;
        let prediction = self
            .scorer
            .score(&self.backend, &prompted.prompt, &prompted.options)
            .await?;

        if prediction.index >= prompted.options.len() {
            return Err(EvalError::Inference(format!(
                "scorer returned index {} for {} options",
                prediction.index,
                prompted.options.len()
            )));
        }

        debug!(
            gold = prompted.gold,
            pred = prediction.index,
            confidence = ?prediction.confidence,
            "record scored"
        );

        Ok(EvaluationRow {
            input: prompted.prompt,
            gold: prompted.gold,
            options: prompted.options,
            pred: prediction.index,
        })
    }
}

/// Sequential, fail-fast stream of evaluation rows.
pub struct EvaluationRun<'a, B, P> {
    runner: &'a mut EvaluationRunner<B, P>,
    records: std::vec::IntoIter<BenchmarkRecord>,
    total: usize,
    processed: usize,
    failed: bool,
}

impl<B, P> EvaluationRun<'_, B, P>
where
    B: InferenceBackend,
    P: BuildPrompt,
{
    pub fn total(&self) -> usize {
        self.total
    }

    /// Records scored so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Scores the next record. Returns `None` once all records are done or
    /// after the first error.
    pub async fn next_row(&mut self) -> Option<Result<EvaluationRow>> {
        if self.failed {
            return None;
        }
        let record = self.records.next()?;
        let position = self.processed + 1;

        match self.runner.evaluate(&record).await {
            Ok(row) => {
                self.processed = position;
                debug!("Record {}/{} done", position, self.total);
                Some(Ok(row))
            }
            Err(e) => {
                error!("Record {}/{} failed: {}", position, self.total, e);
                self.failed = true;
                self.records = Vec::new().into_iter();
                Some(Err(e))
            }
        }
    }

    /// Drains the run, returning every row or the first error.
    pub async fn collect_rows(mut self) -> Result<Vec<EvaluationRow>> {
        let mut rows = Vec::with_capacity(self.total);
        while let Some(row) = self.next_row().await {
            rows.push(row?);
        }
        Ok(rows)
    }
}
