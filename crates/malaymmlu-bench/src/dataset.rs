use std::path::Path;

use malaymmlu_core::{BenchmarkRecord, EvalConfig, EvalError, Result, PLAYGROUND_SIZE};
use tracing::{info, instrument};

/// Reads a benchmark file: a JSON array of records.
pub fn load_records(path: &Path) -> Result<Vec<BenchmarkRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EvalError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let records: Vec<BenchmarkRecord> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Loads the split selected by `config`, truncating it in playground mode
/// and rejecting any record whose answer key is unusable.
#[instrument(skip(config), fields(task = %config.task, shot = config.shot))]
pub fn load_split(config: &EvalConfig) -> Result<Vec<BenchmarkRecord>> {
    let path = config.dataset_path();
    let mut records = load_records(&path)?;

    if config.playground {
        records.truncate(PLAYGROUND_SIZE);
    }

    validate_records(&records)?;
    info!(count = records.len(), path = %path.display(), "Loaded benchmark split");
    Ok(records)
}

pub fn validate_records(records: &[BenchmarkRecord]) -> Result<()> {
    for (i, record) in records.iter().enumerate() {
        record.gold_index().map_err(|e| match e {
            EvalError::DataFormat(msg) => EvalError::DataFormat(format!("record {i}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}
