//! Shared fixtures for unit tests.

use std::path::Path;

use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::artist::strip_artist_prefix;
use crate::catalog::Catalog;
use crate::db::{self, NewVideo};
use crate::model::{Artist, Tag, Video};
use crate::tags::TagHierarchy;

/// Create a migrated SQLite database in a temp directory. The directory
/// guard must be kept alive for the pool's lifetime.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let pool = db::init_db(&url).await.expect("failed to init test db");
    (pool, dir)
}

/// Ingestion-time fields for a video that never touched a disk.
pub fn mock_new_video(path: &str) -> NewVideo {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    let display_name = strip_artist_prefix(&name).to_string();
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    NewVideo {
        path: path.to_string(),
        name,
        display_name,
        extension,
        size: 1024,
        modified: "2026-01-01T00:00:00Z".to_string(),
        duration: 30.0,
    }
}

/// Upsert a mock video and mirror it into the catalog, returning the
/// store-assigned id. Artist resolution is left to the caller.
pub async fn ingest_mock_video(pool: &SqlitePool, catalog: &mut Catalog, path: &str) -> i64 {
    let new = mock_new_video(path);
    let id = db::upsert_video(pool, &new).await.expect("upsert failed");
    catalog.add_video(Video {
        id,
        path: new.path,
        name: new.name,
        display_name: new.display_name,
        extension: new.extension,
        size: new.size,
        modified: new.modified,
        duration: new.duration,
        like_count: 0,
        view_count: 0,
        thumbnail: None,
    });
    id
}

/// Like [`ingest_mock_video`] but backed by a real (empty) file under
/// `dir`, for tests exercising rename/delete filesystem behavior.
pub async fn ingest_video_file(
    pool: &SqlitePool,
    catalog: &mut Catalog,
    dir: &Path,
    name: &str,
) -> i64 {
    let path = dir.join(name);
    std::fs::write(&path, b"video bytes").expect("failed to write test file");
    ingest_mock_video(pool, catalog, path.to_str().expect("non-utf8 temp path")).await
}

fn fixture_video(id: i64, name: &str) -> Video {
    Video {
        id,
        path: format!("/videos/{}", name),
        name: name.to_string(),
        display_name: strip_artist_prefix(name).to_string(),
        extension: "mp4".to_string(),
        size: 1024,
        modified: "2026-01-01T00:00:00Z".to_string(),
        duration: 30.0,
        like_count: 0,
        view_count: 0,
        thumbnail: None,
    }
}

fn fixture_tag(id: i64, name: &str, parent_id: Option<i64>) -> Tag {
    Tag {
        id,
        name: name.to_string(),
        color: "#9e9e9e".to_string(),
        is_group: parent_id.is_none(),
        sort_order: id,
        expanded: true,
        parent_id,
    }
}

fn fixture_artist(id: i64, alias: &str) -> Artist {
    Artist {
        id,
        name: alias.to_string(),
        aliases: [alias.to_string()].into_iter().collect(),
        favorite: false,
        like_count: 0,
        icon_path: None,
    }
}

/// A small in-memory catalog with fixed ids:
///
/// - video 1 `[a] clip one.mp4`: tag 1, artist 1
/// - video 2 `[a] clip two.mp4`: tag 2 (child of tag 1), artist 1
/// - video 3 `solo video.mp4`: untagged, artist 2
pub fn catalog_fixture() -> (Catalog, TagHierarchy) {
    let mut catalog = Catalog::default();

    catalog.add_video(fixture_video(1, "[a] clip one.mp4"));
    catalog.add_video(fixture_video(2, "[a] clip two.mp4"));
    catalog.add_video(fixture_video(3, "solo video.mp4"));

    catalog.add_tag(fixture_tag(1, "parent", None));
    catalog.add_tag(fixture_tag(2, "child", Some(1)));

    catalog.add_artist(fixture_artist(1, "a"));
    catalog.add_artist(fixture_artist(2, "solo"));

    catalog.add_tag_edge(1, 1);
    catalog.add_tag_edge(2, 2);
    catalog.add_artist_edge(1, 1);
    catalog.add_artist_edge(2, 1);
    catalog.add_artist_edge(3, 2);

    let hierarchy = catalog.hierarchy();
    (catalog, hierarchy)
}
