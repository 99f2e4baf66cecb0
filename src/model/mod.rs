//! Core data models for the video library.
//!
//! Defines the primary entities: [`Video`], [`Tag`], and [`Artist`].
//! These are derived from SQLx for database mapping.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `videos` - Catalogued video files
//! - `tags` - User-defined tags forming a tree via `parent_id`
//! - `artists` - Artist identities derived from bracketed filename prefixes
//! - `video_tags` / `video_artists` - Association rows

use smallvec::SmallVec;
use sqlx::FromRow;

/// Separator used when persisting an artist's alias list as one text column,
/// and when composing display names (U+3001 ideographic comma).
pub const ALIAS_SEPARATOR: &str = "、";

/// Accent color applied to favorite artists.
pub const ACCENT_COLOR: &str = "#e91e63";
/// Neutral color for everything else.
pub const NEUTRAL_COLOR: &str = "#9e9e9e";

/// An artist's alias names. Index 0 is the primary name; most artists have
/// one or two aliases, so the list lives on the stack.
pub type AliasList = SmallVec<[String; 2]>;

/// A video file in the library.
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Absolute file path (unique among live videos)
    pub path: String,
    /// File name including extension
    pub name: String,
    /// File name with the leading `[artist]` prefix stripped
    pub display_name: String,
    /// Lower-cased extension without the dot
    pub extension: String,
    /// File size in bytes
    pub size: i64,
    /// Last-modified timestamp, ISO-8601
    pub modified: String,
    /// Duration in seconds (0 when probing failed)
    pub duration: f64,
    pub like_count: i64,
    pub view_count: i64,
    /// Cached thumbnail image bytes, loaded lazily
    pub thumbnail: Option<Vec<u8>>,
}

impl Video {
    /// File name without its extension, lower-cased. Used for
    /// extension-insensitive duplicate checks on rename.
    pub fn stem_lower(&self) -> String {
        stem_lower(&self.name)
    }
}

/// Lower-cased stem (final `.ext` removed) of a file name.
pub fn stem_lower(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    stem.to_lowercase()
}

/// A tag in the library. Tags form a tree through `parent_id`.
#[derive(Debug, Clone, FromRow)]
pub struct Tag {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Tag name (unique)
    pub name: String,
    /// Display color, `#rrggbb`
    pub color: String,
    /// Group tags exist to hold children rather than direct links
    pub is_group: bool,
    /// Position among siblings
    pub sort_order: i64,
    /// Whether the node is expanded in the tree view (persisted UI state)
    pub expanded: bool,
    /// Parent tag, None for roots
    pub parent_id: Option<i64>,
}

/// Raw artist row as stored; `aliases` is a separator-joined text column.
#[derive(Debug, Clone, FromRow)]
pub struct ArtistRow {
    pub id: i64,
    pub name: String,
    pub aliases: String,
    pub favorite: bool,
    pub like_count: i64,
    pub icon_path: Option<String>,
}

/// An artist identity merged from one or more filename aliases.
#[derive(Debug, Clone)]
pub struct Artist {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Display name, `Primary` or `Primary(alias1、alias2)`
    pub name: String,
    /// Alias names, primary first
    pub aliases: AliasList,
    pub favorite: bool,
    pub like_count: i64,
    /// Optional path to a user-chosen icon image
    pub icon_path: Option<String>,
}

impl Artist {
    pub fn from_row(row: ArtistRow) -> Self {
        let aliases: AliasList = row
            .aliases
            .split(ALIAS_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            id: row.id,
            name: row.name,
            aliases,
            favorite: row.favorite,
            like_count: row.like_count,
            icon_path: row.icon_path,
        }
    }

    /// Alias list as the single text column it is persisted as.
    pub fn aliases_column(&self) -> String {
        self.aliases.join(ALIAS_SEPARATOR)
    }

    /// Case-insensitive alias membership test.
    pub fn has_alias(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        self.aliases.iter().any(|a| a.to_lowercase() == needle)
    }

    /// Derived display color: favorites get the accent color.
    pub fn color(&self) -> &'static str {
        if self.favorite {
            ACCENT_COLOR
        } else {
            NEUTRAL_COLOR
        }
    }
}
