//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed
//! arguments and returns an `anyhow::Result<()>`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::warn;

use crate::catalog::{Catalog, RenameOutcome};
use crate::filter::{FilterEngine, FilterValue};
use crate::sort::{SortDir, VideoSortKey, sort_artists};
use crate::tags::{TagHierarchy, UNTAGGED};
use crate::{config, db, library, media, model, mover, thumbs};

/// Clipshelf CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database path (default: clipshelf.db, or the configured path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory for videos
    Scan {
        /// Path to the directory to scan
        path: PathBuf,
    },
    /// List videos, optionally filtered and sorted
    List {
        /// Sort key: name, size, modified, duration, likes, views
        #[arg(short, long, default_value = "name")]
        sort: String,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Filter by tag id (repeatable; -2 selects untagged videos)
        #[arg(short, long)]
        tag: Vec<i64>,
        /// Filter by artist id (repeatable)
        #[arg(short, long)]
        artist: Vec<i64>,
        /// Free-text search over file names (keywords are AND-ed)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the tag tree with recursive video counts
    Tags,
    /// List artists with their video counts
    Artists,
    /// Create a tag
    AddTag {
        name: String,
        /// Display color
        #[arg(long, default_value = model::NEUTRAL_COLOR)]
        color: String,
        /// Parent tag id
        #[arg(long)]
        parent: Option<i64>,
        /// Mark the tag as a grouping node
        #[arg(long)]
        group: bool,
    },
    /// Delete a tag (its children are promoted to roots)
    RmTag { tag_id: i64 },
    /// Link a video to a tag
    Tag { video_id: i64, tag_id: i64 },
    /// Remove a video's tag link
    Untag { video_id: i64, tag_id: i64 },
    /// Rename a video's file
    Rename { video_id: i64, new_name: String },
    /// Delete a video's file and record
    Delete { video_id: i64 },
    /// Bump a video's like counter
    Like { video_id: i64 },
    /// Bump a video's view counter
    View { video_id: i64 },
    /// Toggle an artist's favorite flag
    Favorite { artist_id: i64 },
    /// Remove artists with no videos and orphaned thumbnail cache files
    Cleanup,
    /// Extract missing thumbnails
    Thumbs,
    /// Run a batch move job file (worker process entry point)
    MoveWorker {
        /// Path to the JSON job file
        job: PathBuf,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command
/// was specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let rt = Runtime::new()?;

    match &cli.command {
        Some(Commands::Scan { path }) => {
            cmd_scan(&rt, cli.db.as_deref(), path)?;
            Ok(true)
        }
        Some(Commands::List {
            sort,
            desc,
            tag,
            artist,
            search,
        }) => {
            cmd_list(&rt, cli.db.as_deref(), sort, *desc, tag, artist, search.as_deref())?;
            Ok(true)
        }
        Some(Commands::Tags) => {
            cmd_tags(&rt, cli.db.as_deref())?;
            Ok(true)
        }
        Some(Commands::Artists) => {
            cmd_artists(&rt, cli.db.as_deref())?;
            Ok(true)
        }
        Some(Commands::AddTag {
            name,
            color,
            parent,
            group,
        }) => {
            cmd_add_tag(&rt, cli.db.as_deref(), name, color, *parent, *group)?;
            Ok(true)
        }
        Some(Commands::RmTag { tag_id }) => {
            cmd_rm_tag(&rt, cli.db.as_deref(), *tag_id)?;
            Ok(true)
        }
        Some(Commands::Tag { video_id, tag_id }) => {
            cmd_link_tag(&rt, cli.db.as_deref(), *video_id, *tag_id, true)?;
            Ok(true)
        }
        Some(Commands::Untag { video_id, tag_id }) => {
            cmd_link_tag(&rt, cli.db.as_deref(), *video_id, *tag_id, false)?;
            Ok(true)
        }
        Some(Commands::Rename { video_id, new_name }) => {
            cmd_rename(&rt, cli.db.as_deref(), *video_id, new_name)?;
            Ok(true)
        }
        Some(Commands::Delete { video_id }) => {
            cmd_delete(&rt, cli.db.as_deref(), *video_id)?;
            Ok(true)
        }
        Some(Commands::Like { video_id }) => {
            cmd_counter(&rt, cli.db.as_deref(), *video_id, true)?;
            Ok(true)
        }
        Some(Commands::View { video_id }) => {
            cmd_counter(&rt, cli.db.as_deref(), *video_id, false)?;
            Ok(true)
        }
        Some(Commands::Favorite { artist_id }) => {
            cmd_favorite(&rt, cli.db.as_deref(), *artist_id)?;
            Ok(true)
        }
        Some(Commands::Cleanup) => {
            cmd_cleanup(&rt, cli.db.as_deref())?;
            Ok(true)
        }
        Some(Commands::Thumbs) => {
            cmd_thumbs(&rt, cli.db.as_deref())?;
            Ok(true)
        }
        Some(Commands::MoveWorker { job }) => {
            cmd_move_worker(job)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Individual command implementations
// ============================================================================

/// Open the pool and load the catalog.
async fn open(db: Option<&Path>) -> anyhow::Result<(sqlx::SqlitePool, Catalog)> {
    let cfg = config::load();
    let db_path = db
        .map(Path::to_path_buf)
        .or(cfg.library.database_path.clone());
    let pool = db::init_db(&db::db_url(db_path.as_deref())).await?;
    let catalog = Catalog::load(&pool).await?;
    Ok((pool, catalog))
}

fn cmd_scan(rt: &Runtime, db: Option<&Path>, path: &Path) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        println!("Scanning directory: {:?}", path);

        let mut count = 0usize;
        let processed =
            library::scan_library(&pool, &mut catalog, path.to_path_buf(), |event| match event {
                library::ScanEvent::Processed(_) => {
                    count += 1;
                    if count % 100 == 0 {
                        print!("\rScanned {} videos...", count);
                        use std::io::Write;
                        let _ = std::io::stdout().flush();
                    }
                }
                library::ScanEvent::Error(p, e) => {
                    eprintln!("\nError processing {:?}: {}", p, e);
                }
            })
            .await?;
        println!("\nScan complete. Total scanned: {} videos.", processed);

        let mut cfg = config::load();
        cfg.library.last_scan_path = Some(path.to_path_buf());
        if let Err(e) = config::save(&cfg) {
            warn!(error = %e, "failed to remember last scan path");
        }
        Ok(())
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_list(
    rt: &Runtime,
    db: Option<&Path>,
    sort: &str,
    desc: bool,
    tag_ids: &[i64],
    artist_ids: &[i64],
    search: Option<&str>,
) -> anyhow::Result<()> {
    let key = VideoSortKey::parse(sort)
        .ok_or_else(|| anyhow::anyhow!("unknown sort key: {} (try name, size, modified, duration, likes, views)", sort))?;
    let dir = if desc { SortDir::Desc } else { SortDir::Asc };

    rt.block_on(async {
        let (_pool, catalog) = open(db).await?;
        let hierarchy = catalog.hierarchy();

        let mut engine = FilterEngine::default();
        engine.set_multi_select(tag_ids.len() + artist_ids.len() > 1);
        for tag_id in tag_ids {
            let label = if *tag_id == UNTAGGED {
                "untagged".to_string()
            } else {
                catalog
                    .tag(*tag_id)
                    .map(|t| t.name.clone())
                    .ok_or_else(|| anyhow::anyhow!("no such tag: {}", tag_id))?
            };
            engine.set_filter(FilterValue::Tag(*tag_id), label, None);
        }
        for artist_id in artist_ids {
            let label = catalog
                .artist(*artist_id)
                .map(|a| a.name.clone())
                .ok_or_else(|| anyhow::anyhow!("no such artist: {}", artist_id))?;
            engine.set_filter(FilterValue::Artist(*artist_id), label, None);
        }
        if let Some(query) = search {
            engine.set_filter(FilterValue::Search(query.to_string()), query, None);
        }

        let view = catalog.view(&engine, &hierarchy, key, dir);
        for video in &view.videos {
            println!(
                "{:>5}  {:>8}  {:>7.1}s  {:>3}♥ {:>4}▶  {}",
                video.id,
                format_size(video.size),
                video.duration,
                video.like_count,
                video.view_count,
                video.name
            );
        }
        println!("{} videos", view.videos.len());
        Ok(())
    })
}

fn cmd_tags(rt: &Runtime, db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let (_pool, catalog) = open(db).await?;
        let hierarchy = catalog.hierarchy();

        fn print_subtree(
            catalog: &Catalog,
            hierarchy: &TagHierarchy,
            tag_id: i64,
            depth: usize,
        ) {
            let Some(tag) = catalog.tag(tag_id) else {
                return;
            };
            let count = hierarchy.video_count_recursive(tag_id, catalog.tag_video_edges());
            println!("{}{} [{}]  ({})", "  ".repeat(depth), tag.name, tag.id, count);
            for child in hierarchy.children_of(tag_id) {
                print_subtree(catalog, hierarchy, *child, depth + 1);
            }
        }

        for root in hierarchy.roots() {
            print_subtree(&catalog, &hierarchy, *root, 0);
        }
        println!("untagged  ({})", catalog.untagged_count());
        Ok(())
    })
}

fn cmd_artists(rt: &Runtime, db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let (_pool, catalog) = open(db).await?;
        let mut artists: Vec<_> = catalog.artists().collect();
        sort_artists(&mut artists, |id| catalog.videos_of_artist(id).len());
        for artist in artists {
            println!(
                "{:>5}  {} {}  ({} videos, {} likes)",
                artist.id,
                if artist.favorite { "★" } else { " " },
                artist.name,
                catalog.videos_of_artist(artist.id).len(),
                artist.like_count
            );
        }
        Ok(())
    })
}

fn cmd_add_tag(
    rt: &Runtime,
    db: Option<&Path>,
    name: &str,
    color: &str,
    parent: Option<i64>,
    group: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        if let Some(parent_id) = parent
            && catalog.tag(parent_id).is_none()
        {
            anyhow::bail!("no such parent tag: {}", parent_id);
        }
        let id = catalog.create_tag(&pool, name, color, group, parent).await?;
        println!("Created tag {} [{}]", name, id);
        Ok(())
    })
}

fn cmd_rm_tag(rt: &Runtime, db: Option<&Path>, tag_id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        let Some(tag) = catalog.tag(tag_id) else {
            anyhow::bail!("no such tag: {}", tag_id);
        };
        let name = tag.name.clone();
        catalog.remove_tag(&pool, tag_id).await?;
        println!("Deleted tag {} [{}]; children promoted to roots", name, tag_id);
        Ok(())
    })
}

fn cmd_link_tag(
    rt: &Runtime,
    db: Option<&Path>,
    video_id: i64,
    tag_id: i64,
    link: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        if catalog.video(video_id).is_none() {
            anyhow::bail!("no such video: {}", video_id);
        }
        if catalog.tag(tag_id).is_none() {
            anyhow::bail!("no such tag: {}", tag_id);
        }
        if link {
            catalog.link_tag(&pool, video_id, tag_id).await?;
            println!("Tagged video {} with tag {}", video_id, tag_id);
        } else {
            catalog.unlink_tag(&pool, video_id, tag_id).await?;
            println!("Removed tag {} from video {}", tag_id, video_id);
        }
        Ok(())
    })
}

fn cmd_rename(rt: &Runtime, db: Option<&Path>, video_id: i64, new_name: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        match catalog.rename_video(&pool, video_id, new_name).await {
            RenameOutcome::Success => {
                println!("Renamed video {} to {}", video_id, new_name);
                Ok(())
            }
            RenameOutcome::AlreadyExists => {
                eprintln!("A video with that name already exists.");
                std::process::exit(1);
            }
            RenameOutcome::AccessDenied => {
                eprintln!("Access denied renaming the file.");
                std::process::exit(1);
            }
            RenameOutcome::FileInUse => {
                eprintln!("The file is in use by another process.");
                std::process::exit(1);
            }
            RenameOutcome::InvalidName => {
                eprintln!("Invalid file name: {:?}", new_name);
                std::process::exit(1);
            }
            RenameOutcome::UnknownError => {
                eprintln!("Rename failed; see the log for details.");
                std::process::exit(1);
            }
        }
    })
}

fn cmd_delete(rt: &Runtime, db: Option<&Path>, video_id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        if catalog.delete_video(&pool, video_id).await {
            println!("Deleted video {}", video_id);
            Ok(())
        } else {
            eprintln!("Delete failed; see the log for details.");
            std::process::exit(1);
        }
    })
}

fn cmd_counter(rt: &Runtime, db: Option<&Path>, video_id: i64, like: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        if catalog.video(video_id).is_none() {
            anyhow::bail!("no such video: {}", video_id);
        }
        if like {
            let count = catalog.like_video(&pool, video_id).await?;
            println!("Video {} now has {} likes", video_id, count);
        } else {
            let count = catalog.view_video(&pool, video_id).await?;
            println!("Video {} now has {} views", video_id, count);
        }
        Ok(())
    })
}

fn cmd_favorite(rt: &Runtime, db: Option<&Path>, artist_id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        let Some(artist) = catalog.artist(artist_id) else {
            anyhow::bail!("no such artist: {}", artist_id);
        };
        let favorite = !artist.favorite;
        catalog.set_artist_favorite(&pool, artist_id, favorite).await?;
        println!(
            "Artist {} is {} a favorite",
            artist_id,
            if favorite { "now" } else { "no longer" }
        );
        Ok(())
    })
}

fn cmd_cleanup(rt: &Runtime, db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let (pool, mut catalog) = open(db).await?;
        let removed = catalog.cleanup_sweep(&pool).await?;

        let live: std::collections::HashSet<i64> = catalog.videos().map(|v| v.id).collect();
        let cache = thumbs::ThumbCache::default_location();
        let pruned = cache.prune(&live);

        println!(
            "Cleanup complete: {} orphaned artists removed, {} stale thumbnails pruned",
            removed, pruned
        );
        Ok(())
    })
}

fn cmd_thumbs(rt: &Runtime, db: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        if media::find_ffmpeg().is_none() {
            eprintln!("Error: ffmpeg not found.");
            eprintln!("Install FFmpeg:");
            eprintln!("  Windows: winget install Gyan.FFmpeg");
            eprintln!("  macOS:   brew install ffmpeg");
            eprintln!("  Linux:   apt install ffmpeg");
            std::process::exit(1);
        }

        let (pool, catalog) = open(db).await?;
        let cfg = config::load();
        let max_concurrent = cfg.thumbnails.max_concurrent.max(1);
        let cache = thumbs::ThumbCache::default_location();
        let extractor = thumbs::Extractor::new(cfg.thumbnails);

        let missing: Vec<(i64, PathBuf, f64)> = catalog
            .videos()
            .filter(|v| v.thumbnail.is_none())
            .map(|v| (v.id, PathBuf::from(&v.path), v.duration))
            .collect();
        println!("Extracting {} thumbnail(s)...", missing.len());

        use futures::StreamExt;
        let mut results = futures::stream::iter(missing)
            .map(|(id, path, duration)| {
                let extractor = &extractor;
                async move { (id, extractor.extract(id, &path, duration).await) }
            })
            .buffer_unordered(max_concurrent);

        let mut extracted = 0usize;
        let mut skipped = 0usize;
        while let Some((id, bytes)) = results.next().await {
            match bytes {
                Some(bytes) => {
                    if let Err(e) = cache.put(id, &bytes) {
                        warn!(video_id = id, error = %e, "failed to cache thumbnail");
                    }
                    db::update_video_thumbnail(&pool, id, Some(&bytes)).await?;
                    extracted += 1;
                }
                None => skipped += 1,
            }
        }
        println!("Done: {} extracted, {} skipped", extracted, skipped);
        Ok(())
    })
}

fn cmd_move_worker(job: &Path) -> anyhow::Result<()> {
    let summary = mover::run_job_file(job)?;
    println!(
        "Move job complete: {} moved, {} failed",
        summary.moved, summary.failed
    );
    Ok(())
}

// ============================================================================
// Helper functions
// ============================================================================

fn format_size(bytes: i64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes.max(0) as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size as i64, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
