use std::path::PathBuf;

use malaymmlu_core::{EvalConfig, EvaluationSummary, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::backend::InferenceBackend;
use crate::dataset::load_split;
use crate::prompt::PromptBuilder;
use crate::runner::EvaluationRunner;
use crate::scorer::scorer_for;
use crate::writer::write_results;

/// Where the results went and how they scored.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub path: PathBuf,
    pub summary: EvaluationSummary,
}

/// Loads the configured split, scores every record with `backend` and
/// writes the result table. The table is only written if every record
/// succeeded.
#[instrument(skip_all, fields(task = %config.task, model = %config.base_model))]
pub async fn evaluate_split<B: InferenceBackend>(
    config: &EvalConfig,
    backend: B,
) -> Result<EvaluationReport> {
    config.validate()?;

    let records = load_split(config)?;
    let builder = PromptBuilder::from_config(config);
    let scorer = scorer_for(config.scoring_mode, config.aggregation);
    let mut runner = EvaluationRunner::new(backend, scorer, builder);

    let mut run = runner.run(records);
    let total = run.total();
    let step = (total / 10).max(1);
    let mut rows = Vec::with_capacity(total);

    while let Some(row) = run.next_row().await {
        let row = row?;
        if rows.is_empty() {
            debug!(input = %row.input, "First prompt");
        }
        rows.push(row);

        let done = run.processed();
        if done % step == 0 || done == total {
            info!("Progress: {}/{}", done, total);
        }
    }

    let summary = EvaluationSummary::from_rows(&rows);
    let path = write_results(&config.result_path(), &rows)?;

    info!(
        "Accuracy {:.4} ({}/{}) -> {}",
        summary.accuracy,
        summary.correct,
        summary.total,
        path.display()
    );

    Ok(EvaluationReport { path, summary })
}
