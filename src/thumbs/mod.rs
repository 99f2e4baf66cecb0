//! Thumbnail extraction and disk cache.
//!
//! Frames are grabbed by shelling out to `ffmpeg` at a ladder of
//! offsets into the video; a grabbed frame below the configured byte
//! floor is treated as blank (black lead-in, title card) and the next
//! offset is tried. The whole ladder runs under a per-video deadline,
//! and a fixed-size semaphore keeps the number of concurrent ffmpeg
//! processes bounded. Every failure path degrades to `None` - a missing
//! thumbnail is never an error.
//!
//! Extracted frames are cached on disk keyed by video id, alongside the
//! bytes stored on the video row.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::config::ThumbnailConfig;
use crate::media;

/// Probe offsets as fractions of a known duration.
const OFFSET_FRACTIONS: &[f64] = &[0.2, 0.4, 0.6, 0.05];

/// Probe offsets in seconds when the duration is unknown.
const OFFSET_SECONDS: &[f64] = &[10.0, 30.0, 60.0, 0.0];

/// Thumbnail disk cache, one JPEG per video id.
pub struct ThumbCache {
    cache_dir: PathBuf,
}

impl ThumbCache {
    /// Create a new cache in the specified directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        // Ensure cache directory exists
        let _ = fs::create_dir_all(&cache_dir);
        Self { cache_dir }
    }

    /// Create a cache in the default location (user cache directory).
    pub fn default_location() -> Self {
        Self::new(crate::config::thumb_cache_dir())
    }

    /// Get cached thumbnail bytes for a video id.
    pub fn get(&self, video_id: i64) -> Option<Vec<u8>> {
        fs::read(self.cache_path(video_id)).ok()
    }

    /// Store thumbnail bytes in the cache.
    pub fn put(&self, video_id: i64, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        let path = self.cache_path(video_id);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Check if a video's thumbnail is cached.
    pub fn contains(&self, video_id: i64) -> bool {
        self.cache_path(video_id).exists()
    }

    /// Remove a video's cached thumbnail.
    pub fn remove(&self, video_id: i64) {
        let _ = fs::remove_file(self.cache_path(video_id));
    }

    /// Remove cache entries whose video id is not in `live_ids`.
    /// Returns how many files were removed.
    pub fn prune(&self, live_ids: &HashSet<i64>) -> usize {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok());
            match id {
                Some(id) if live_ids.contains(&id) => {}
                _ => {
                    if fs::remove_file(&path).is_ok() {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    fn cache_path(&self, video_id: i64) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", video_id))
    }
}

/// Bounded-concurrency frame extractor.
pub struct Extractor {
    semaphore: Arc<Semaphore>,
    config: ThumbnailConfig,
}

impl Extractor {
    pub fn new(config: ThumbnailConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        }
    }

    /// Grab a representative frame from the video.
    ///
    /// Offsets are fractions of the duration when it is known, fixed
    /// seconds otherwise; the first frame meeting the byte floor wins.
    /// Returns `None` on any failure (no ffmpeg, unreadable file,
    /// nothing but blank frames, deadline exceeded).
    pub async fn extract(&self, video_id: i64, video_path: &Path, duration: f64) -> Option<Vec<u8>> {
        let _permit = self.semaphore.acquire().await.ok()?;
        let ffmpeg = match media::find_ffmpeg() {
            Some(f) => f,
            None => {
                warn!("ffmpeg not found, skipping thumbnail extraction");
                return None;
            }
        };

        let offsets: Vec<f64> = if duration > 1.0 {
            OFFSET_FRACTIONS.iter().map(|f| f * duration).collect()
        } else {
            OFFSET_SECONDS.to_vec()
        };
        let deadline = Instant::now() + Duration::from_secs(self.config.max_probe_secs);
        let frame_path = std::env::temp_dir().join(format!(
            "clipshelf-thumb-{}-{}.jpg",
            std::process::id(),
            video_id
        ));

        let mut result = None;
        for offset in offsets {
            match timeout_at(deadline, grab_frame(ffmpeg, video_path, offset, &frame_path)).await {
                Err(_) => {
                    debug!(video_id, "thumbnail probe deadline exceeded");
                    break;
                }
                Ok(None) => continue,
                Ok(Some(bytes)) => {
                    if bytes.len() as u64 >= self.config.min_bytes {
                        result = Some(bytes);
                        break;
                    }
                    debug!(video_id, offset, size = bytes.len(), "frame below byte floor");
                }
            }
        }

        let _ = fs::remove_file(&frame_path);
        if result.is_none() {
            warn!(video_id, path = %video_path.display(), "no usable thumbnail frame");
        }
        result
    }
}

/// Run one ffmpeg frame grab at the given offset.
async fn grab_frame(
    ffmpeg: &str,
    video_path: &Path,
    offset: f64,
    frame_path: &Path,
) -> Option<Vec<u8>> {
    let output = tokio::process::Command::new(ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-ss", &format!("{:.2}", offset)])
        .arg("-i")
        .arg(video_path)
        .args(["-frames:v", "1", "-vf", "scale=480:-2", "-f", "image2"])
        .arg(frame_path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        debug!(
            path = %video_path.display(),
            offset,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ffmpeg frame grab failed"
        );
        return None;
    }
    fs::read(frame_path).ok().filter(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_put_and_get() {
        let temp = TempDir::new().unwrap();
        let cache = ThumbCache::new(temp.path());

        cache.put(42, b"fake jpeg data").unwrap();
        assert_eq!(cache.get(42).as_deref(), Some(b"fake jpeg data".as_ref()));
        assert!(cache.contains(42));
    }

    #[test]
    fn test_cache_miss() {
        let temp = TempDir::new().unwrap();
        let cache = ThumbCache::new(temp.path());
        assert!(cache.get(7).is_none());
        assert!(!cache.contains(7));
    }

    #[test]
    fn test_cache_remove() {
        let temp = TempDir::new().unwrap();
        let cache = ThumbCache::new(temp.path());
        cache.put(1, &[1, 2, 3]).unwrap();
        cache.remove(1);
        assert!(!cache.contains(1));
    }

    #[test]
    fn test_prune_keeps_live_entries() {
        let temp = TempDir::new().unwrap();
        let cache = ThumbCache::new(temp.path());
        cache.put(1, &[1]).unwrap();
        cache.put(2, &[2]).unwrap();
        cache.put(3, &[3]).unwrap();
        // A stray non-numeric file is treated as an orphan
        std::fs::write(temp.path().join("junk.jpg"), b"x").unwrap();

        let live: HashSet<i64> = [1, 3].into_iter().collect();
        let removed = cache.prune(&live);

        assert_eq!(removed, 2);
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
    }

    #[tokio::test]
    async fn test_extract_unreadable_file_degrades_to_none() {
        let extractor = Extractor::new(ThumbnailConfig {
            max_probe_secs: 2,
            ..ThumbnailConfig::default()
        });
        let result = extractor
            .extract(1, Path::new("/nonexistent/clip.mp4"), 120.0)
            .await;
        assert!(result.is_none());
    }
}
