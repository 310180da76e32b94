//! Batch result files

use chrono::Local;
use serde::Serialize;
use smsguard_core::{BatchPrediction, Error, Label, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Suffixed names tried after `{stem}.csv` is taken
const MAX_NAME_ATTEMPTS: usize = 1000;

/// One row of a batch response and of its result file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// 1-based position in the upload
    pub row_id: usize,
    pub text: String,
    pub label: Label,
    pub score: Option<f64>,
    pub threshold_used: f64,
    pub model_id: String,
}

impl ResultRow {
    pub fn from_predictions(predictions: Vec<BatchPrediction>) -> Vec<Self> {
        predictions
            .into_iter()
            .enumerate()
            .map(|(idx, prediction)| Self {
                row_id: idx + 1,
                text: prediction.text,
                label: prediction.result.label,
                score: prediction.result.score,
                threshold_used: prediction.result.threshold_used,
                model_id: prediction.result.model_id,
            })
            .collect()
    }
}

/// Writes result CSVs into one directory and serves them back by name
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Use `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `rows` and return the stored file name
    pub fn write(&self, model_id: &str, rows: &[ResultRow]) -> Result<String> {
        let stem = format!(
            "predict_{}_{}",
            model_id,
            Local::now().format("%Y%m%d%H%M%S")
        );
        let (name, mut file) = self.create_unique(&stem)?;
        let path = self.dir.join(&name);

        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush()?;

        info!("Wrote {} result rows to {}", rows.len(), path.display());
        Ok(name)
    }

    /// Create `{stem}.csv`, or `{stem}_{n}.csv` when earlier names exist.
    ///
    /// Files are opened with `create_new`, so a name is never reused.
    fn create_unique(&self, stem: &str) -> Result<(String, File)> {
        for attempt in 0..=MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{}.csv", stem),
                n => format!("{}_{}.csv", stem, n),
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&name))
            {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::internal(format!("no free result file name for '{}'", stem)))
    }

    /// Resolve a requested download to a file inside the results directory.
    ///
    /// Only the final path component of `requested` is honoured.
    pub fn locate(&self, requested: &str) -> Result<PathBuf> {
        let name = Path::new(requested)
            .file_name()
            .ok_or_else(|| Error::invalid_input("result file not found"))?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(Error::invalid_input("result file not found"));
        }
        Ok(path)
    }
}

fn csv_error(err: csv::Error) -> Error {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Error::Io(io),
            other => Error::internal(format!("{:?}", other)),
        }
    } else {
        Error::internal(format!("Failed to write result row: {}", err))
    }
}
