//! Tag hierarchy construction and traversal.
//!
//! Tags are flat rows with a `parent_id`; this module builds the
//! parent→children view used by the tree UI and by tag filtering
//! (filtering by a parent tag includes every descendant's videos).
//! Counts are always computed fresh from the association edges so they
//! can never go stale.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::Tag;

/// Sentinel id for the "all videos" pseudo-tag. Selecting it clears
/// every active filter. Never persisted.
pub const ALL_VIDEOS: i64 = -1;

/// Sentinel id for the "untagged" bucket: videos with zero tag links.
/// Computed as a complement, never stored as edges.
pub const UNTAGGED: i64 = -2;

/// Parent→children view over a flat tag list.
#[derive(Debug, Default)]
pub struct TagHierarchy {
    roots: Vec<i64>,
    children: HashMap<i64, Vec<i64>>,
}

impl TagHierarchy {
    /// Build the hierarchy from a flat tag list.
    ///
    /// Children within each parent, and roots, are ordered by
    /// `sort_order` (id as tiebreak). A tag whose parent id is null,
    /// zero, self-referential, or unresolved becomes a root; bad parent
    /// references never raise.
    pub fn build<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        let mut sorted: Vec<&Tag> = tags.into_iter().collect();
        sorted.sort_by_key(|t| (t.sort_order, t.id));
        let ids: HashSet<i64> = sorted.iter().map(|t| t.id).collect();

        let mut roots = Vec::new();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for tag in sorted {
            match tag.parent_id {
                Some(pid) if pid != 0 && pid != tag.id && ids.contains(&pid) => {
                    children.entry(pid).or_default().push(tag.id);
                }
                _ => roots.push(tag.id),
            }
        }
        Self { roots, children }
    }

    /// Root tag ids in display order.
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    /// Direct children of a tag in display order.
    pub fn children_of(&self, tag_id: i64) -> &[i64] {
        self.children.get(&tag_id).map_or(&[], Vec::as_slice)
    }

    /// The tag itself plus every tag reachable through child links.
    ///
    /// Iterative with a visited set, so it terminates for arbitrarily
    /// deep trees regardless of traversal order.
    pub fn descendant_ids(&self, tag_id: i64) -> BTreeSet<i64> {
        let mut out = BTreeSet::new();
        let mut stack = vec![tag_id];
        while let Some(id) = stack.pop() {
            if out.insert(id) {
                stack.extend(self.children_of(id));
            }
        }
        out
    }

    /// Direct video links of a tag plus all descendants' links, computed
    /// fresh from the edge sets.
    pub fn video_count_recursive(
        &self,
        tag_id: i64,
        tag_videos: &HashMap<i64, BTreeSet<i64>>,
    ) -> usize {
        self.descendant_ids(tag_id)
            .iter()
            .map(|id| tag_videos.get(id).map_or(0, BTreeSet::len))
            .sum()
    }
}
