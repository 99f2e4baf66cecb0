//! The in-memory video catalog.
//!
//! [`Catalog`] owns the canonical entity set as arenas keyed by store
//! id, with associations held as edge sets in both directions instead
//! of object references. All mutation funnels through its methods, so
//! the invariants (unique live path, bidirectional edges, alias
//! uniqueness via the resolver) are enforced in one place. A single
//! logical owner thread drives every mutation; there is no internal
//! locking.
//!
//! Mutators write through the store first and then the arena, and the
//! filtered view is only assembled by [`Catalog::view`] after counts
//! are recomputed, so a reader never observes stale counts against
//! fresh predicates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::artist::{extract_leading_bracket_group, resolve_artists_for_video, strip_artist_prefix};
use crate::db;
use crate::filter::{FilterEngine, FilteredCounts};
use crate::model::{Artist, Tag, Video, stem_lower};
use crate::sort::{SortDir, VideoSortKey, sort_videos};
use crate::tags::TagHierarchy;

static EMPTY_EDGES: LazyLock<BTreeSet<i64>> = LazyLock::new(BTreeSet::new);

/// Outcome of a rename request. Expected failure modes are values, not
/// errors; the video entity is untouched on anything but `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Success,
    AlreadyExists,
    AccessDenied,
    FileInUse,
    InvalidName,
    UnknownError,
}

/// A filtered, sorted snapshot of the library plus the counts computed
/// against the same predicate state.
pub struct LibraryView<'a> {
    pub videos: Vec<&'a Video>,
    pub counts: FilteredCounts,
}

/// Entity arenas plus bidirectional association edge sets.
#[derive(Debug, Default)]
pub struct Catalog {
    videos: BTreeMap<i64, Video>,
    tags: BTreeMap<i64, Tag>,
    artists: BTreeMap<i64, Artist>,
    video_tags: HashMap<i64, BTreeSet<i64>>,
    tag_videos: HashMap<i64, BTreeSet<i64>>,
    video_artists: HashMap<i64, BTreeSet<i64>>,
    artist_videos: HashMap<i64, BTreeSet<i64>>,
}

impl Catalog {
    /// Load the whole catalog from the store.
    pub async fn load(pool: &SqlitePool) -> sqlx::Result<Self> {
        let mut catalog = Self::default();
        for video in db::get_all_videos(pool).await? {
            catalog.add_video(video);
        }
        for tag in db::get_all_tags(pool).await? {
            catalog.add_tag(tag);
        }
        for row in db::get_all_artists(pool).await? {
            catalog.add_artist(Artist::from_row(row));
        }
        for (video_id, tag_id) in db::get_all_video_tags(pool).await? {
            catalog.add_tag_edge(video_id, tag_id);
        }
        for (video_id, artist_id) in db::get_all_video_artists(pool).await? {
            catalog.add_artist_edge(video_id, artist_id);
        }
        info!(
            videos = catalog.videos.len(),
            tags = catalog.tags.len(),
            artists = catalog.artists.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn video(&self, id: i64) -> Option<&Video> {
        self.videos.get(&id)
    }

    pub fn videos(&self) -> impl Iterator<Item = &Video> {
        self.videos.values()
    }

    pub fn tag(&self, id: i64) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn artist(&self, id: i64) -> Option<&Artist> {
        self.artists.get(&id)
    }

    pub fn artists(&self) -> impl Iterator<Item = &Artist> {
        self.artists.values()
    }

    pub fn artist_mut(&mut self, id: i64) -> Option<&mut Artist> {
        self.artists.get_mut(&id)
    }

    pub fn tags_of_video(&self, video_id: i64) -> &BTreeSet<i64> {
        self.video_tags.get(&video_id).unwrap_or(&EMPTY_EDGES)
    }

    pub fn videos_of_tag(&self, tag_id: i64) -> &BTreeSet<i64> {
        self.tag_videos.get(&tag_id).unwrap_or(&EMPTY_EDGES)
    }

    pub fn artists_of_video(&self, video_id: i64) -> &BTreeSet<i64> {
        self.video_artists.get(&video_id).unwrap_or(&EMPTY_EDGES)
    }

    pub fn videos_of_artist(&self, artist_id: i64) -> &BTreeSet<i64> {
        self.artist_videos.get(&artist_id).unwrap_or(&EMPTY_EDGES)
    }

    /// Tag→videos edge map, consumed by recursive count computation.
    pub fn tag_video_edges(&self) -> &HashMap<i64, BTreeSet<i64>> {
        &self.tag_videos
    }

    /// Videos with zero tag links (the computed "untagged" bucket).
    pub fn untagged_count(&self) -> usize {
        self.videos
            .keys()
            .filter(|id| self.tags_of_video(**id).is_empty())
            .count()
    }

    /// The current tag hierarchy. Rebuilt on demand from the arena.
    pub fn hierarchy(&self) -> TagHierarchy {
        TagHierarchy::build(self.tags.values())
    }

    /// Assemble the filtered, sorted view. Counts are recomputed first,
    /// against the same predicates the view is built with.
    pub fn view<'a>(
        &'a self,
        engine: &FilterEngine,
        hierarchy: &TagHierarchy,
        key: VideoSortKey,
        dir: SortDir,
    ) -> LibraryView<'a> {
        let counts = engine.filtered_counts(self, hierarchy);
        let mut videos = engine.apply(self, hierarchy, self.videos());
        sort_videos(&mut videos, key, dir);
        LibraryView { videos, counts }
    }

    // ------------------------------------------------------------------
    // In-memory arena maintenance (used by load and ingestion)
    // ------------------------------------------------------------------

    /// Insert a video into the arena. An existing entry with the same id
    /// is replaced, keeping its edges (re-scan refresh).
    pub fn add_video(&mut self, video: Video) {
        self.videos.insert(video.id, video);
    }

    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.insert(tag.id, tag);
    }

    pub fn add_artist(&mut self, artist: Artist) {
        self.artists.insert(artist.id, artist);
    }

    pub fn add_tag_edge(&mut self, video_id: i64, tag_id: i64) {
        self.video_tags.entry(video_id).or_default().insert(tag_id);
        self.tag_videos.entry(tag_id).or_default().insert(video_id);
    }

    fn remove_tag_edge(&mut self, video_id: i64, tag_id: i64) {
        if let Some(set) = self.video_tags.get_mut(&video_id) {
            set.remove(&tag_id);
        }
        if let Some(set) = self.tag_videos.get_mut(&tag_id) {
            set.remove(&video_id);
        }
    }

    pub fn add_artist_edge(&mut self, video_id: i64, artist_id: i64) {
        self.video_artists
            .entry(video_id)
            .or_default()
            .insert(artist_id);
        self.artist_videos
            .entry(artist_id)
            .or_default()
            .insert(video_id);
    }

    #[cfg(test)]
    pub fn set_video_name_for_test(&mut self, video_id: i64, name: &str) {
        if let Some(video) = self.videos.get_mut(&video_id) {
            video.name = name.to_string();
            video.display_name = strip_artist_prefix(name).to_string();
        }
    }

    // ------------------------------------------------------------------
    // Write-through mutators
    // ------------------------------------------------------------------

    /// Link a video to a tag (store, then both edge directions).
    pub async fn link_tag(
        &mut self,
        pool: &SqlitePool,
        video_id: i64,
        tag_id: i64,
    ) -> sqlx::Result<()> {
        db::link_video_tag(pool, video_id, tag_id).await?;
        self.add_tag_edge(video_id, tag_id);
        Ok(())
    }

    /// Remove a video↔tag link.
    pub async fn unlink_tag(
        &mut self,
        pool: &SqlitePool,
        video_id: i64,
        tag_id: i64,
    ) -> sqlx::Result<()> {
        db::unlink_video_tag(pool, video_id, tag_id).await?;
        self.remove_tag_edge(video_id, tag_id);
        Ok(())
    }

    /// Link a video to an artist (both directions).
    pub async fn link_artist(
        &mut self,
        pool: &SqlitePool,
        video_id: i64,
        artist_id: i64,
    ) -> sqlx::Result<()> {
        db::link_video_artist(pool, video_id, artist_id).await?;
        self.add_artist_edge(video_id, artist_id);
        Ok(())
    }

    /// Remove every artist link of a video (both directions). Stale
    /// artists keep their rows; the cleanup sweep collects them later.
    pub async fn clear_video_artists(
        &mut self,
        pool: &SqlitePool,
        video_id: i64,
    ) -> sqlx::Result<()> {
        db::unlink_artists_for_video(pool, video_id).await?;
        if let Some(artist_ids) = self.video_artists.remove(&video_id) {
            for artist_id in artist_ids {
                if let Some(set) = self.artist_videos.get_mut(&artist_id) {
                    set.remove(&video_id);
                }
            }
        }
        Ok(())
    }

    /// Create a tag and add it to the arena.
    pub async fn create_tag(
        &mut self,
        pool: &SqlitePool,
        name: &str,
        color: &str,
        is_group: bool,
        parent_id: Option<i64>,
    ) -> sqlx::Result<i64> {
        let sort_order = self
            .tags
            .values()
            .filter(|t| t.parent_id == parent_id)
            .map(|t| t.sort_order + 1)
            .max()
            .unwrap_or(0);
        let id = db::insert_tag(pool, name, color, is_group, sort_order, parent_id).await?;
        self.add_tag(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
            is_group,
            sort_order,
            expanded: true,
            parent_id,
        });
        Ok(id)
    }

    /// Persist edits to a tag already in the arena.
    pub async fn update_tag(&mut self, pool: &SqlitePool, tag: Tag) -> sqlx::Result<()> {
        db::update_tag(pool, &tag).await?;
        self.tags.insert(tag.id, tag);
        Ok(())
    }

    /// Delete a tag. Its children are promoted to roots and its video
    /// links removed; the videos themselves are untouched.
    pub async fn remove_tag(&mut self, pool: &SqlitePool, tag_id: i64) -> sqlx::Result<()> {
        db::delete_tag(pool, tag_id).await?;
        self.tags.remove(&tag_id);
        for tag in self.tags.values_mut() {
            if tag.parent_id == Some(tag_id) {
                tag.parent_id = None;
            }
        }
        if let Some(video_ids) = self.tag_videos.remove(&tag_id) {
            for video_id in video_ids {
                if let Some(set) = self.video_tags.get_mut(&video_id) {
                    set.remove(&tag_id);
                }
            }
        }
        Ok(())
    }

    /// Bump a video's like counter.
    pub async fn like_video(&mut self, pool: &SqlitePool, video_id: i64) -> sqlx::Result<i64> {
        let count = db::increment_video_likes(pool, video_id).await?;
        if let Some(video) = self.videos.get_mut(&video_id) {
            video.like_count = count;
        }
        Ok(count)
    }

    /// Bump a video's view counter.
    pub async fn view_video(&mut self, pool: &SqlitePool, video_id: i64) -> sqlx::Result<i64> {
        let count = db::increment_video_views(pool, video_id).await?;
        if let Some(video) = self.videos.get_mut(&video_id) {
            video.view_count = count;
        }
        Ok(count)
    }

    /// Set or clear an artist's favorite flag.
    pub async fn set_artist_favorite(
        &mut self,
        pool: &SqlitePool,
        artist_id: i64,
        favorite: bool,
    ) -> sqlx::Result<()> {
        let snapshot = match self.artists.get_mut(&artist_id) {
            Some(artist) => {
                artist.favorite = favorite;
                artist.clone()
            }
            None => return Ok(()),
        };
        db::update_artist(pool, &snapshot).await
    }

    // ------------------------------------------------------------------
    // Rename / delete coordination
    // ------------------------------------------------------------------

    /// Rename a video's file and update the entity.
    ///
    /// Validation runs before any filesystem call; on any failure the
    /// entity keeps its old path and name. When the bracket prefix
    /// changed, artist resolution re-runs for the video.
    pub async fn rename_video(
        &mut self,
        pool: &SqlitePool,
        video_id: i64,
        new_name: &str,
    ) -> RenameOutcome {
        let Some(video) = self.videos.get(&video_id) else {
            return RenameOutcome::UnknownError;
        };

        if !is_valid_file_name(new_name) {
            return RenameOutcome::InvalidName;
        }

        // Duplicate check: the new name against every other entry's full
        // and artist-stripped names, extension-insensitively.
        let new_stem = stem_lower(new_name);
        let duplicate = self.videos.values().any(|other| {
            other.id != video_id
                && (other.stem_lower() == new_stem
                    || stem_lower(&other.display_name) == new_stem)
        });
        if duplicate {
            return RenameOutcome::AlreadyExists;
        }

        let old_path = PathBuf::from(&video.path);
        let new_path = match old_path.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        if new_path.exists() {
            return RenameOutcome::AlreadyExists;
        }
        if let Err(e) = std::fs::rename(&old_path, &new_path) {
            warn!(video_id, error = %e, "rename failed");
            return map_rename_error(&e);
        }

        let old_name = video.name.clone();
        let display_name = strip_artist_prefix(new_name).to_string();
        let extension = new_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let path_str = new_path.to_string_lossy().into_owned();

        if let Err(e) =
            db::update_video_location(pool, video_id, &path_str, new_name, &display_name, &extension)
                .await
        {
            error!(video_id, error = %e, "file renamed but record update failed");
            return RenameOutcome::UnknownError;
        }
        if let Some(video) = self.videos.get_mut(&video_id) {
            video.path = path_str;
            video.name = new_name.to_string();
            video.display_name = display_name;
            video.extension = extension;
        }

        let prefix_changed =
            extract_leading_bracket_group(&old_name) != extract_leading_bracket_group(new_name);
        if prefix_changed
            && let Err(e) = resolve_artists_for_video(pool, self, video_id).await
        {
            error!(video_id, error = %e, "artist re-resolution failed after rename");
            return RenameOutcome::UnknownError;
        }

        RenameOutcome::Success
    }

    /// Delete a video's file and record.
    ///
    /// The filesystem removal happens first; a path that no longer
    /// exists counts as already deleted. Only on success are the store
    /// row and every in-memory association removed. A store failure
    /// after the file is gone leaves the record behind - logged, not
    /// recovered.
    pub async fn delete_video(&mut self, pool: &SqlitePool, video_id: i64) -> bool {
        let Some(video) = self.videos.get(&video_id) else {
            return false;
        };

        let path = Path::new(&video.path);
        if path.exists() {
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            if let Err(e) = removed {
                warn!(video_id, path = %video.path, error = %e, "delete failed");
                return false;
            }
        }

        if let Err(e) = db::delete_video(pool, video_id).await {
            error!(video_id, error = %e, "file removed but record remains");
            return false;
        }

        self.videos.remove(&video_id);
        if let Some(tag_ids) = self.video_tags.remove(&video_id) {
            for tag_id in tag_ids {
                if let Some(set) = self.tag_videos.get_mut(&tag_id) {
                    set.remove(&video_id);
                }
            }
        }
        if let Some(artist_ids) = self.video_artists.remove(&video_id) {
            for artist_id in artist_ids {
                if let Some(set) = self.artist_videos.get_mut(&artist_id) {
                    set.remove(&video_id);
                }
            }
        }
        true
    }

    /// Remove artists that no longer have any associated video. Only
    /// ever invoked explicitly; returns how many were removed.
    pub async fn cleanup_sweep(&mut self, pool: &SqlitePool) -> sqlx::Result<usize> {
        let orphaned: Vec<i64> = self
            .artists
            .keys()
            .filter(|id| self.videos_of_artist(**id).is_empty())
            .copied()
            .collect();
        for artist_id in &orphaned {
            db::delete_artist(pool, *artist_id).await?;
            self.artists.remove(artist_id);
            self.artist_videos.remove(artist_id);
        }
        if !orphaned.is_empty() {
            info!(removed = orphaned.len(), "cleanup removed orphaned artists");
        }
        Ok(orphaned.len())
    }
}

/// Reserved-character check for new file names.
fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
}

fn map_rename_error(e: &std::io::Error) -> RenameOutcome {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => RenameOutcome::AccessDenied,
        std::io::ErrorKind::AlreadyExists => RenameOutcome::AlreadyExists,
        std::io::ErrorKind::NotFound => RenameOutcome::UnknownError,
        _ => match e.raw_os_error() {
            // ERROR_SHARING_VIOLATION on Windows, EBUSY elsewhere
            Some(32) | Some(16) => RenameOutcome::FileInUse,
            _ => RenameOutcome::UnknownError,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use crate::test_utils::{ingest_mock_video, ingest_video_file, temp_db};

    #[tokio::test]
    async fn test_link_and_unlink_tag_keeps_both_directions() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let video_id = ingest_mock_video(&pool, &mut catalog, "/v/a.mp4").await;
        let tag_id = catalog
            .create_tag(&pool, "anime", "#ff0000", false, None)
            .await
            .unwrap();

        catalog.link_tag(&pool, video_id, tag_id).await.unwrap();
        assert!(catalog.tags_of_video(video_id).contains(&tag_id));
        assert!(catalog.videos_of_tag(tag_id).contains(&video_id));

        catalog.unlink_tag(&pool, video_id, tag_id).await.unwrap();
        assert!(catalog.tags_of_video(video_id).is_empty());
        assert!(catalog.videos_of_tag(tag_id).is_empty());
    }

    #[tokio::test]
    async fn test_remove_tag_promotes_children() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let parent = catalog
            .create_tag(&pool, "parent", "#fff", true, None)
            .await
            .unwrap();
        let child = catalog
            .create_tag(&pool, "child", "#fff", false, Some(parent))
            .await
            .unwrap();

        catalog.remove_tag(&pool, parent).await.unwrap();
        assert!(catalog.tag(parent).is_none());
        assert_eq!(catalog.tag(child).unwrap().parent_id, None);
        assert_eq!(catalog.hierarchy().roots(), &[child]);
    }

    #[tokio::test]
    async fn test_rename_invalid_name_rejected() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_mock_video(&pool, &mut catalog, "/v/a.mp4").await;

        assert_eq!(
            catalog.rename_video(&pool, id, "bad/name.mp4").await,
            RenameOutcome::InvalidName
        );
        assert_eq!(
            catalog.rename_video(&pool, id, "   ").await,
            RenameOutcome::InvalidName
        );
        assert_eq!(catalog.video(id).unwrap().name, "a.mp4");
    }

    #[tokio::test]
    async fn test_rename_duplicate_is_detected_extension_insensitively() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_mock_video(&pool, &mut catalog, "/v/a.mp4").await;
        ingest_mock_video(&pool, &mut catalog, "/v/Other Clip.mkv").await;

        // Same stem, different extension and case
        assert_eq!(
            catalog.rename_video(&pool, id, "OTHER clip.mp4").await,
            RenameOutcome::AlreadyExists
        );
        // Collides with the other entry's artist-stripped name
        ingest_mock_video(&pool, &mut catalog, "/v/[x] prefixed.mp4").await;
        assert_eq!(
            catalog.rename_video(&pool, id, "prefixed.avi").await,
            RenameOutcome::AlreadyExists
        );
        let video = catalog.video(id).unwrap();
        assert_eq!(video.name, "a.mp4");
        assert_eq!(video.path, "/v/a.mp4");
    }

    #[tokio::test]
    async fn test_rename_success_updates_entity_and_artists() {
        let (pool, dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_video_file(&pool, &mut catalog, dir.path(), "[old] clip.mp4").await;
        crate::artist::resolve_artists_for_video(&pool, &mut catalog, id)
            .await
            .unwrap();
        let old_artist = catalog.artists().next().unwrap().id;

        let outcome = catalog.rename_video(&pool, id, "[new] clip.avi").await;
        assert_eq!(outcome, RenameOutcome::Success);

        let video = catalog.video(id).unwrap();
        assert_eq!(video.name, "[new] clip.avi");
        assert_eq!(video.display_name, "clip.avi");
        assert_eq!(video.extension, "avi");
        assert!(video.path.ends_with("[new] clip.avi"));
        assert!(dir.path().join("[new] clip.avi").exists());
        assert!(!dir.path().join("[old] clip.mp4").exists());

        // The stored row agrees with the entity, extension included
        let stored = crate::db::get_video_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.name, "[new] clip.avi");
        assert_eq!(stored.extension, "avi");
        assert!(stored.path.ends_with("[new] clip.avi"));

        // The old artist lost its link; a new one holds the video
        assert!(catalog.videos_of_artist(old_artist).is_empty());
        let linked = catalog.artists_of_video(id);
        assert_eq!(linked.len(), 1);
        assert_ne!(linked.iter().next(), Some(&old_artist));
    }

    #[tokio::test]
    async fn test_rename_same_prefix_skips_reresolution() {
        let (pool, dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_video_file(&pool, &mut catalog, dir.path(), "[a] one.mp4").await;
        crate::artist::resolve_artists_for_video(&pool, &mut catalog, id)
            .await
            .unwrap();
        let artist_id = catalog.artists().next().unwrap().id;

        let outcome = catalog.rename_video(&pool, id, "[a] two.mp4").await;
        assert_eq!(outcome, RenameOutcome::Success);
        assert!(catalog.artists_of_video(id).contains(&artist_id));
        assert_eq!(catalog.artists().count(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_file_record_and_edges() {
        let (pool, dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_video_file(&pool, &mut catalog, dir.path(), "[a] gone.mp4").await;
        crate::artist::resolve_artists_for_video(&pool, &mut catalog, id)
            .await
            .unwrap();
        let artist_id = catalog.artists().next().unwrap().id;
        let tag_id = catalog
            .create_tag(&pool, "t", "#fff", false, None)
            .await
            .unwrap();
        catalog.link_tag(&pool, id, tag_id).await.unwrap();

        assert!(catalog.delete_video(&pool, id).await);
        assert!(catalog.video(id).is_none());
        assert!(!dir.path().join("[a] gone.mp4").exists());
        assert!(catalog.videos_of_tag(tag_id).is_empty());
        assert!(catalog.videos_of_artist(artist_id).is_empty());
        assert!(db::get_video_by_id(&pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_file_still_succeeds() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        // Path never existed on disk
        let id = ingest_mock_video(&pool, &mut catalog, "/nonexistent/clip.mp4").await;

        assert!(catalog.delete_video(&pool, id).await);
        assert!(catalog.video(id).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_sweep_removes_orphaned_artists() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let id = ingest_mock_video(&pool, &mut catalog, "/v/[a b] clip.mp4").await;
        crate::artist::resolve_artists_for_video(&pool, &mut catalog, id)
            .await
            .unwrap();
        assert_eq!(catalog.artists().count(), 2);

        // Unlink everything; both artists become orphans
        catalog.clear_video_artists(&pool, id).await.unwrap();
        let removed = catalog.cleanup_sweep(&pool).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(catalog.artists().count(), 0);
        assert!(db::get_all_artists(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_counts_match_predicates() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let v1 = ingest_mock_video(&pool, &mut catalog, "/v/[a] one.mp4").await;
        let v2 = ingest_mock_video(&pool, &mut catalog, "/v/[b] two.mp4").await;
        for id in [v1, v2] {
            crate::artist::resolve_artists_for_video(&pool, &mut catalog, id)
                .await
                .unwrap();
        }
        let tag_id = catalog
            .create_tag(&pool, "t", "#fff", false, None)
            .await
            .unwrap();
        catalog.link_tag(&pool, v1, tag_id).await.unwrap();

        let mut engine = FilterEngine::default();
        engine.set_filter(FilterValue::Tag(tag_id), "t", None);
        let hierarchy = catalog.hierarchy();
        let view = catalog.view(&engine, &hierarchy, VideoSortKey::Name, SortDir::Asc);

        assert_eq!(view.videos.len(), 1);
        assert_eq!(view.videos[0].id, v1);
        // Artist counts were narrowed by the tag predicate
        let a1 = *catalog.artists_of_video(v1).iter().next().unwrap();
        let a2 = *catalog.artists_of_video(v2).iter().next().unwrap();
        assert_eq!(view.counts.artists[&a1], 1);
        assert_eq!(view.counts.artists[&a2], 0);
    }
}
