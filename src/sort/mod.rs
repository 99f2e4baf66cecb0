//! Stable orderings for videos and artists. Tag ordering lives in the
//! hierarchy builder, which sorts siblings by their explicit position.

use std::cmp::Ordering;

use crate::model::{Artist, Video};

/// Sort direction. Direction applies to the primary key only; tiebreaks
/// stay ascending so runs are deterministic either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Selectable video sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSortKey {
    #[default]
    Name,
    Size,
    Modified,
    Duration,
    Likes,
    Views,
}

impl VideoSortKey {
    /// Parse a CLI-facing key name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "size" => Some(Self::Size),
            "modified" | "date" => Some(Self::Modified),
            "duration" => Some(Self::Duration),
            "likes" => Some(Self::Likes),
            "views" => Some(Self::Views),
            _ => None,
        }
    }
}

/// Sort videos by the selected key, name (case-insensitive) and id as
/// tiebreaks.
pub fn sort_videos(videos: &mut [&Video], key: VideoSortKey, dir: SortDir) {
    videos.sort_by(|a, b| {
        let primary = match key {
            VideoSortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            VideoSortKey::Size => a.size.cmp(&b.size),
            VideoSortKey::Modified => a.modified.cmp(&b.modified),
            VideoSortKey::Duration => a.duration.total_cmp(&b.duration),
            VideoSortKey::Likes => a.like_count.cmp(&b.like_count),
            VideoSortKey::Views => a.view_count.cmp(&b.view_count),
        };
        let primary = match dir {
            SortDir::Asc => primary,
            SortDir::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Artist ordering: favorite first, then like count, then associated
/// video count (all descending), then name ascending case-insensitive.
pub fn sort_artists(artists: &mut [&Artist], video_count: impl Fn(i64) -> usize) {
    artists.sort_by(|a, b| {
        b.favorite
            .cmp(&a.favorite)
            .then_with(|| b.like_count.cmp(&a.like_count))
            .then_with(|| video_count(b.id).cmp(&video_count(a.id)))
            .then_with(|| name_ci(&a.name, &b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn name_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
