//! Database module for video, tag, and artist persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Five record kinds are persisted: videos, tags, artists, and the two
//! association tables (`video_tags`, `video_artists`). Association rows
//! are removed by foreign-key cascade when either side is deleted.
//!
//! String fields are UTF-8 text, timestamps ISO-8601 text, booleans
//! 0/1 integers, nullable foreign keys NULL.

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::{Artist, ArtistRow, Tag, Video};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "clipshelf.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Fields of a video known at ingestion time, before the store has
/// assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub path: String,
    pub name: String,
    pub display_name: String,
    pub extension: String,
    pub size: i64,
    pub modified: String,
    pub duration: f64,
}

/// Insert or update a video record.
///
/// Uses SQLite's UPSERT keyed on the file path, so re-scanning a
/// directory refreshes size/mtime/duration without duplicating rows or
/// losing like/view counts.
///
/// Returns the database ID of the inserted or updated video.
pub async fn upsert_video(pool: &SqlitePool, video: &NewVideo) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO videos (path, name, display_name, extension, size, modified, duration)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            name = excluded.name,
            display_name = excluded.display_name,
            extension = excluded.extension,
            size = excluded.size,
            modified = excluded.modified,
            duration = excluded.duration
        RETURNING id
        "#,
    )
    .bind(&video.path)
    .bind(&video.name)
    .bind(&video.display_name)
    .bind(&video.extension)
    .bind(video.size)
    .bind(&video.modified)
    .bind(video.duration)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Get all videos. Thumbnail bytes are included; callers that only need
/// metadata should not hold the result longer than necessary.
pub async fn get_all_videos(pool: &SqlitePool) -> sqlx::Result<Vec<Video>> {
    sqlx::query_as::<_, Video>(
        "SELECT id, path, name, display_name, extension, size, modified, duration, \
         like_count, view_count, thumbnail FROM videos",
    )
    .fetch_all(pool)
    .await
}

/// Get a video by its database ID.
pub async fn get_video_by_id(pool: &SqlitePool, video_id: i64) -> sqlx::Result<Option<Video>> {
    sqlx::query_as::<_, Video>(
        "SELECT id, path, name, display_name, extension, size, modified, duration, \
         like_count, view_count, thumbnail FROM videos WHERE id = ?",
    )
    .bind(video_id)
    .fetch_optional(pool)
    .await
}

/// Update path/name/extension fields after a rename.
pub async fn update_video_location(
    pool: &SqlitePool,
    video_id: i64,
    path: &str,
    name: &str,
    display_name: &str,
    extension: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE videos SET path = ?, name = ?, display_name = ?, extension = ? WHERE id = ?",
    )
    .bind(path)
    .bind(name)
    .bind(display_name)
    .bind(extension)
    .bind(video_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Increment a video's like count, returning the new value.
pub async fn increment_video_likes(pool: &SqlitePool, video_id: i64) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "UPDATE videos SET like_count = like_count + 1 WHERE id = ? RETURNING like_count",
    )
    .bind(video_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Increment a video's view count, returning the new value.
pub async fn increment_video_views(pool: &SqlitePool, video_id: i64) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "UPDATE videos SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
    )
    .bind(video_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Store (or clear) a video's cached thumbnail bytes.
pub async fn update_video_thumbnail(
    pool: &SqlitePool,
    video_id: i64,
    thumbnail: Option<&[u8]>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE videos SET thumbnail = ? WHERE id = ?")
        .bind(thumbnail)
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a video row. Association rows go with it via cascade.
pub async fn delete_video(pool: &SqlitePool, video_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Tags
// ============================================================================

/// Insert a tag, returning its ID.
pub async fn insert_tag(
    pool: &SqlitePool,
    name: &str,
    color: &str,
    is_group: bool,
    sort_order: i64,
    parent_id: Option<i64>,
) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO tags (name, color, is_group, sort_order, parent_id) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(color)
    .bind(is_group)
    .bind(sort_order)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Update every editable field of a tag.
pub async fn update_tag(pool: &SqlitePool, tag: &Tag) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE tags SET name = ?, color = ?, is_group = ?, sort_order = ?, \
         expanded = ?, parent_id = ? WHERE id = ?",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(tag.is_group)
    .bind(tag.sort_order)
    .bind(tag.expanded)
    .bind(tag.parent_id)
    .bind(tag.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a tag. Children are promoted to roots by the store
/// (`ON DELETE SET NULL`); video links are cascade-removed.
pub async fn delete_tag(pool: &SqlitePool, tag_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Get all tags ordered by their explicit position.
pub async fn get_all_tags(pool: &SqlitePool) -> sqlx::Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>(
        "SELECT id, name, color, is_group, sort_order, expanded, parent_id \
         FROM tags ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await
}

// ============================================================================
// Artists
// ============================================================================

/// Insert an artist, returning its ID.
pub async fn insert_artist(
    pool: &SqlitePool,
    name: &str,
    aliases_column: &str,
) -> sqlx::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO artists (name, aliases) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(aliases_column)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Persist every mutable field of an artist.
pub async fn update_artist(pool: &SqlitePool, artist: &Artist) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE artists SET name = ?, aliases = ?, favorite = ?, like_count = ?, \
         icon_path = ? WHERE id = ?",
    )
    .bind(&artist.name)
    .bind(artist.aliases_column())
    .bind(artist.favorite)
    .bind(artist.like_count)
    .bind(&artist.icon_path)
    .bind(artist.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete an artist row (cleanup sweep only).
pub async fn delete_artist(pool: &SqlitePool, artist_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM artists WHERE id = ?")
        .bind(artist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Get all artists as raw rows; see [`Artist::from_row`].
pub async fn get_all_artists(pool: &SqlitePool) -> sqlx::Result<Vec<ArtistRow>> {
    sqlx::query_as::<_, ArtistRow>(
        "SELECT id, name, aliases, favorite, like_count, icon_path FROM artists",
    )
    .fetch_all(pool)
    .await
}

// ============================================================================
// Associations
// ============================================================================

/// Link a video to a tag. Already-linked pairs are a no-op.
pub async fn link_video_tag(pool: &SqlitePool, video_id: i64, tag_id: i64) -> sqlx::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO video_tags (video_id, tag_id) VALUES (?, ?)")
        .bind(video_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a video↔tag link.
pub async fn unlink_video_tag(pool: &SqlitePool, video_id: i64, tag_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM video_tags WHERE video_id = ? AND tag_id = ?")
        .bind(video_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All video↔tag pairs.
pub async fn get_all_video_tags(pool: &SqlitePool) -> sqlx::Result<Vec<(i64, i64)>> {
    sqlx::query_as::<_, (i64, i64)>("SELECT video_id, tag_id FROM video_tags")
        .fetch_all(pool)
        .await
}

/// Link a video to an artist. Already-linked pairs are a no-op.
pub async fn link_video_artist(
    pool: &SqlitePool,
    video_id: i64,
    artist_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO video_artists (video_id, artist_id) VALUES (?, ?)")
        .bind(video_id)
        .bind(artist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove every artist link of one video. Used before re-resolving a
/// renamed video's filename.
pub async fn unlink_artists_for_video(pool: &SqlitePool, video_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM video_artists WHERE video_id = ?")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All video↔artist pairs.
pub async fn get_all_video_artists(pool: &SqlitePool) -> sqlx::Result<Vec<(i64, i64)>> {
    sqlx::query_as::<_, (i64, i64)>("SELECT video_id, artist_id FROM video_artists")
        .fetch_all(pool)
        .await
}
