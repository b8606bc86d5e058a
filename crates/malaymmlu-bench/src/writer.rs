use std::path::{Path, PathBuf};

use malaymmlu_core::{EvalError, EvaluationRow, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

#[derive(Serialize)]
struct CsvRow<'a> {
    input: &'a str,
    golds: usize,
    options: String,
    preds: usize,
}

/// Writes the result table in one shot. Rows go to a temp file in the target
/// directory which is renamed into place only after every row is flushed.
pub fn write_results(path: &Path, rows: &[EvaluationRow]) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let tmp = NamedTempFile::new_in(&dir)?;
    let mut writer = csv::Writer::from_writer(tmp);

    for row in rows {
        writer.serialize(CsvRow {
            input: &row.input,
            golds: row.gold,
            options: serde_json::to_string(&row.options)?,
            preds: row.pred,
        })?;
    }

    // serde only emits headers alongside the first record
    if rows.is_empty() {
        writer.write_record(["input", "golds", "options", "preds"])?;
    }

    let tmp = writer.into_inner().map_err(|e| {
        EvalError::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
    })?;
    tmp.persist(path).map_err(|e| EvalError::Io(e.error))?;

    info!(rows = rows.len(), path = %path.display(), "Results written");
    Ok(path.to_path_buf())
}

/// Reads a result table back, e.g. to recompute accuracy.
pub fn read_results(path: &Path) -> Result<Vec<EvaluationRow>> {
    #[derive(serde::Deserialize)]
    struct OwnedRow {
        input: String,
        golds: usize,
        options: String,
        preds: usize,
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: OwnedRow = record?;
        rows.push(EvaluationRow {
            input: row.input,
            gold: row.golds,
            options: serde_json::from_str(&row.options)?,
            pred: row.preds,
        });
    }
    Ok(rows)
}
