//! Out-of-process bulk file mover.
//!
//! Batch moves run in a separate worker process so a long transfer
//! never blocks the catalog owner. The parent writes a JSON job file
//! naming the source files and the destination folder, spawns the
//! worker with the job path as its argument, and forgets about it; the
//! worker logs per-file progress and exits when the batch is done.
//! There is no response channel - the next library scan picks up the
//! new locations.
//!
//! Individual failures (missing source, occupied destination) are
//! logged and skipped; the rest of the batch still runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result, ResultExt};

/// A batch move request, serialized as the job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveJob {
    pub source_files: Vec<PathBuf>,
    pub destination_folder: PathBuf,
}

impl MoveJob {
    /// Read a job file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(format!("reading job file {}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::file_move(format!("invalid job file {}: {}", path.display(), e)))
    }

    /// Write the job file the worker process will consume.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::file_move(format!("failed to serialize job: {}", e)))?;
        fs::write(path, json).with_context(format!("writing job file {}", path.display()))?;
        Ok(())
    }
}

/// Per-batch tally reported when the worker finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveSummary {
    pub moved: usize,
    pub failed: usize,
}

/// Run a batch move. The destination folder is created if missing;
/// per-file failures are logged and counted, never fatal.
pub fn run_job(job: &MoveJob) -> Result<MoveSummary> {
    fs::create_dir_all(&job.destination_folder).with_context(format!(
        "creating destination folder {}",
        job.destination_folder.display()
    ))?;

    let total = job.source_files.len();
    let mut summary = MoveSummary::default();
    for (index, source) in job.source_files.iter().enumerate() {
        match move_file(source, &job.destination_folder) {
            Ok(dest) => {
                summary.moved += 1;
                info!(
                    progress = format!("{}/{}", index + 1, total),
                    from = %source.display(),
                    to = %dest.display(),
                    "moved"
                );
            }
            Err(e) => {
                summary.failed += 1;
                warn!(from = %source.display(), error = %e, "move failed, continuing");
            }
        }
    }

    info!(moved = summary.moved, failed = summary.failed, "batch finished");
    Ok(summary)
}

/// Load a job file and run it.
pub fn run_job_file(path: &Path) -> Result<MoveSummary> {
    run_job(&MoveJob::load(path)?)
}

/// Move one file into the destination folder, refusing to overwrite.
fn move_file(source: &Path, destination_folder: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| Error::file_move(format!("source has no file name: {}", source.display())))?;
    let dest = destination_folder.join(file_name);

    if !source.exists() {
        return Err(Error::not_found(source));
    }
    if dest.exists() {
        return Err(Error::file_move(format!(
            "destination already exists: {}",
            dest.display()
        )));
    }

    // Rename first; on cross-device failure fall back to copy + delete
    if fs::rename(source, &dest).is_err() {
        fs::copy(source, &dest)?;
        fs::remove_file(source)?;
    }

    Ok(dest)
}
