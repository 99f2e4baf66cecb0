//! Library ingestion: walk a directory, probe each video file, and
//! mirror it into the store and the in-memory catalog.
//!
//! Ingestion is sequential because every file ends in a catalog
//! mutation (entity insert plus artist resolution); the directory walk
//! itself streams from a blocking task. A failed duration probe is not
//! fatal - the video is kept with a zero duration.

use std::path::{Path, PathBuf};
use std::pin::pin;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::artist::{resolve_artists_for_video, strip_artist_prefix};
use crate::catalog::Catalog;
use crate::db::{self, NewVideo};
use crate::error::{Error, Result, ResultExt};
use crate::{media, scanner};

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Processed(PathBuf),
    Error(PathBuf, String),
}

/// Scan a directory tree and ingest every video file found.
///
/// Emits one [`ScanEvent`] per file and keeps going past per-file
/// failures. Returns the number of files successfully ingested.
pub async fn scan_library(
    pool: &SqlitePool,
    catalog: &mut Catalog,
    root: PathBuf,
    mut on_event: impl FnMut(ScanEvent),
) -> Result<usize> {
    let mut paths = pin!(scanner::scan(root.clone()));
    let mut processed = 0usize;

    while let Some(path) = paths.next().await {
        match ingest_file(pool, catalog, &path).await {
            Ok(_) => {
                processed += 1;
                on_event(ScanEvent::Processed(path));
            }
            Err(e) => on_event(ScanEvent::Error(path, e.to_string())),
        }
    }

    info!(root = %root.display(), processed, "library scan finished");
    Ok(processed)
}

/// Ingest a single file: probe size/mtime/duration, upsert the store
/// row, mirror it into the catalog, and resolve its filename artists.
///
/// Re-ingesting a known path refreshes metadata in place; like/view
/// counters survive because the mirrored entity is re-read from the
/// store after the upsert.
pub async fn ingest_file(pool: &SqlitePool, catalog: &mut Catalog, path: &Path) -> Result<i64> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::not_found(path))?
        .to_string();
    let metadata = tokio::fs::metadata(path).await?;
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let duration = {
        let probe_path = path.to_path_buf();
        tokio::task::spawn_blocking(move || media::probe_duration(&probe_path))
            .await
            .map_err(|e| Error::probe(path, e.to_string()))?
            .unwrap_or_else(|e| {
                debug!(path = %path.display(), error = %e, "duration probe failed");
                0.0
            })
    };

    let new = NewVideo {
        path: path.to_string_lossy().into_owned(),
        display_name: strip_artist_prefix(&name).to_string(),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default(),
        name,
        size: metadata.len() as i64,
        modified,
        duration,
    };

    let id = db::upsert_video(pool, &new)
        .await
        .with_context(format!("storing {}", path.display()))?;
    let video = db::get_video_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::not_found(path))?;
    catalog.add_video(video);
    resolve_artists_for_video(pool, catalog, id).await?;
    Ok(id)
}
