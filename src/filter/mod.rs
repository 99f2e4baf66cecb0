//! Multi-criteria filtering over the video collection.
//!
//! The engine holds an ordered list of predicates over three axes - tag,
//! artist, and free-text search - and applies them with AND semantics.
//! Re-selecting a predicate's exact value toggles it off in place, so a
//! deactivated selection keeps its slot in the filter bar. Multi-select
//! mode allows several tag/artist predicates to coexist; free-text
//! search never accumulates.
//!
//! A predicate participates in filtering while `active` is true;
//! toggling it off excludes it (see DESIGN.md on the polarity decision).

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::model::Video;
use crate::tags::{ALL_VIDEOS, TagHierarchy, UNTAGGED};

/// One filtering condition: the tagged union over the three axes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Filter by a tag (descendant-inclusive). [`UNTAGGED`] matches
    /// videos with zero tag links; [`ALL_VIDEOS`] is the clear-all
    /// sentinel and never becomes a predicate.
    Tag(i64),
    /// Filter by an artist id.
    Artist(i64),
    /// Free-text search; whitespace-separated keywords, all required.
    Search(String),
}

impl FilterValue {
    /// Rank used to keep the predicate list ordered by kind.
    fn kind_rank(&self) -> u8 {
        match self {
            FilterValue::Tag(_) => 0,
            FilterValue::Artist(_) => 1,
            FilterValue::Search(_) => 2,
        }
    }

    fn same_kind(&self, other: &FilterValue) -> bool {
        self.kind_rank() == other.kind_rank()
    }
}

/// An entry in the filter bar.
#[derive(Debug, Clone)]
pub struct FilterItem {
    pub value: FilterValue,
    /// Display label shown in the filter bar
    pub label: String,
    /// Whether the predicate currently participates in filtering
    pub active: bool,
    /// Display color hint (tag color / artist accent)
    pub color: Option<String>,
}

/// Filtered per-tag and per-artist counts, recomputed after every
/// mutation so no view ever shows counts stale against the predicates.
#[derive(Debug, Default, Clone)]
pub struct FilteredCounts {
    /// Tag id → count; includes [`UNTAGGED`] and [`ALL_VIDEOS`]
    pub tags: HashMap<i64, usize>,
    /// Artist id → count
    pub artists: HashMap<i64, usize>,
}

/// The ordered set of active predicates.
#[derive(Debug, Default)]
pub struct FilterEngine {
    items: Vec<FilterItem>,
    multi_select: bool,
}

impl FilterEngine {
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    pub fn set_multi_select(&mut self, on: bool) {
        self.multi_select = on;
    }

    /// Remove every predicate.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Add, toggle, or replace a predicate. Returns whether the request
    /// was applied.
    ///
    /// - The [`ALL_VIDEOS`] sentinel clears everything and leaves
    ///   multi-select disabled.
    /// - A value already present toggles its `active` flag in place.
    /// - In single-select mode the new predicate replaces any existing
    ///   one of the same kind.
    /// - In multi-select mode search predicates are rejected.
    pub fn set_filter(
        &mut self,
        value: FilterValue,
        label: impl Into<String>,
        color: Option<String>,
    ) -> bool {
        if value == FilterValue::Tag(ALL_VIDEOS) {
            self.items.clear();
            self.multi_select = false;
            return true;
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.value == value) {
            item.active = !item.active;
            return true;
        }

        if self.multi_select {
            if matches!(value, FilterValue::Search(_)) {
                return false;
            }
        } else {
            self.items.retain(|i| !i.value.same_kind(&value));
        }

        self.items.push(FilterItem {
            value,
            label: label.into(),
            active: true,
            color,
        });
        self.items
            .sort_by(|a, b| (a.value.kind_rank(), &a.label).cmp(&(b.value.kind_rank(), &b.label)));
        true
    }

    /// Apply every active predicate with AND semantics. With no active
    /// predicate the input passes through unchanged, order preserved.
    pub fn apply<'a>(
        &self,
        catalog: &Catalog,
        hierarchy: &TagHierarchy,
        videos: impl IntoIterator<Item = &'a Video>,
    ) -> Vec<&'a Video> {
        let active: Vec<&FilterItem> = self.items.iter().filter(|i| i.active).collect();
        if active.is_empty() {
            return videos.into_iter().collect();
        }
        videos
            .into_iter()
            .filter(|v| {
                active
                    .iter()
                    .all(|item| matches(&item.value, v, catalog, hierarchy))
            })
            .collect()
    }

    /// Recompute per-tag and per-artist counts against the cross-axis
    /// predicates: each tag is counted over the videos passing all
    /// active non-tag predicates, each artist over the videos passing
    /// all active non-artist predicates. With no cross-axis filter the
    /// counts are the unfiltered totals (recursive for tags).
    pub fn filtered_counts(&self, catalog: &Catalog, hierarchy: &TagHierarchy) -> FilteredCounts {
        let mut counts = FilteredCounts::default();

        let non_tag: Vec<&FilterItem> = self
            .items
            .iter()
            .filter(|i| i.active && !matches!(i.value, FilterValue::Tag(_)))
            .collect();
        if non_tag.is_empty() {
            for tag in catalog.tags() {
                counts.tags.insert(
                    tag.id,
                    hierarchy.video_count_recursive(tag.id, catalog.tag_video_edges()),
                );
            }
            counts.tags.insert(UNTAGGED, catalog.untagged_count());
            counts.tags.insert(ALL_VIDEOS, catalog.videos().count());
        } else {
            let passing: Vec<&Video> = catalog
                .videos()
                .filter(|v| {
                    non_tag
                        .iter()
                        .all(|item| matches(&item.value, v, catalog, hierarchy))
                })
                .collect();
            for tag in catalog.tags() {
                let closure = hierarchy.descendant_ids(tag.id);
                let count = passing
                    .iter()
                    .filter(|v| {
                        catalog
                            .tags_of_video(v.id)
                            .iter()
                            .any(|t| closure.contains(t))
                    })
                    .count();
                counts.tags.insert(tag.id, count);
            }
            counts.tags.insert(
                UNTAGGED,
                passing
                    .iter()
                    .filter(|v| catalog.tags_of_video(v.id).is_empty())
                    .count(),
            );
            counts.tags.insert(ALL_VIDEOS, passing.len());
        }

        let non_artist: Vec<&FilterItem> = self
            .items
            .iter()
            .filter(|i| i.active && !matches!(i.value, FilterValue::Artist(_)))
            .collect();
        if non_artist.is_empty() {
            for artist in catalog.artists() {
                counts
                    .artists
                    .insert(artist.id, catalog.videos_of_artist(artist.id).len());
            }
        } else {
            for artist in catalog.artists() {
                let count = catalog
                    .videos()
                    .filter(|v| catalog.artists_of_video(v.id).contains(&artist.id))
                    .filter(|v| {
                        non_artist
                            .iter()
                            .all(|item| matches(&item.value, v, catalog, hierarchy))
                    })
                    .count();
                counts.artists.insert(artist.id, count);
            }
        }

        counts
    }
}

/// One predicate's membership test against one video.
fn matches(value: &FilterValue, video: &Video, catalog: &Catalog, hierarchy: &TagHierarchy) -> bool {
    match value {
        FilterValue::Tag(UNTAGGED) => catalog.tags_of_video(video.id).is_empty(),
        FilterValue::Tag(tag_id) => {
            let closure = hierarchy.descendant_ids(*tag_id);
            catalog
                .tags_of_video(video.id)
                .iter()
                .any(|t| closure.contains(t))
        }
        FilterValue::Artist(artist_id) => catalog.artists_of_video(video.id).contains(artist_id),
        FilterValue::Search(query) => {
            let name = video.name.to_lowercase();
            query
                .to_lowercase()
                .split_whitespace()
                .all(|kw| name.contains(kw))
        }
    }
}
