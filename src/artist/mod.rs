//! Artist-identity resolution from bracketed filename prefixes.
//!
//! Filenames in the library follow the convention
//! `[Artist1 Artist2(Alias1、Alias2)] title.mp4`: a leading bracket group
//! naming one or more artists, where a parenthesized suffix lists further
//! aliases of the preceding name. This module parses that convention and
//! keeps the artist registry consistent as videos are added and renamed:
//! alias sets that overlap (case-insensitively) are merged into one
//! identity, and the original primary name of an identity never changes
//! once set.
//!
//! Parsing is tolerant by design. Malformed bracket or paren syntax
//! degrades to a best-effort single-name group and never errors.

use sqlx::SqlitePool;
use tracing::debug;

use crate::catalog::Catalog;
use crate::db;
use crate::model::{ALIAS_SEPARATOR, AliasList, Artist};

/// Returns the substring between a leading `[`/`【` and the first `]`/`】`,
/// or empty if the filename does not start with a bracket (or the bracket
/// never closes).
pub fn extract_leading_bracket_group(file_name: &str) -> &str {
    let mut chars = file_name.char_indices();
    let Some((_, first)) = chars.next() else {
        return "";
    };
    if first != '[' && first != '【' {
        return "";
    }
    let start = first.len_utf8();
    for (idx, c) in chars {
        if c == ']' || c == '】' {
            return &file_name[start..idx];
        }
    }
    ""
}

/// File name with the leading bracket group (and whitespace after it)
/// removed. Filenames without a prefix pass through unchanged.
pub fn strip_artist_prefix(file_name: &str) -> &str {
    let mut chars = file_name.char_indices();
    let Some((_, first)) = chars.next() else {
        return file_name;
    };
    if first != '[' && first != '【' {
        return file_name;
    }
    for (idx, c) in chars {
        if c == ']' || c == '】' {
            return file_name[idx + c.len_utf8()..].trim_start();
        }
    }
    file_name
}

/// Tokenize bracket content into name groups.
///
/// Splits on whitespace, except that a run of non-whitespace followed by
/// one or more `(...)`/`（...）` suffixes stays one group, so
/// `浜崎りお(篠原絵梨香、森下えりか) 吉沢明歩` yields two groups, not four.
/// Left-to-right order is preserved; an unclosed paren absorbs the rest of
/// the string.
pub fn split_into_name_groups(content: &str) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in content.chars() {
        match c {
            '(' | '（' => {
                depth += 1;
                current.push(c);
            }
            ')' | '）' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Split one name group into its ordered alias list.
///
/// `main(alias1、alias2,alias3)` (half- or full-width parens, `、` or `,`
/// separators) becomes `[main, alias1, alias2, alias3]`, each trimmed,
/// case-insensitively deduplicated, main always at index 0. Anything that
/// doesn't match the shape becomes a single-element list.
pub fn split_alias_group(group: &str) -> AliasList {
    let trimmed = group.trim();
    let mut out = AliasList::new();

    let Some(open) = trimmed.find(['(', '（']) else {
        out.push(trimmed.to_string());
        return out;
    };
    let close = trimmed.rfind([')', '）']).filter(|&c| c > open);
    let main = trimmed[..open].trim();
    let (Some(close), false) = (close, main.is_empty()) else {
        // Unbalanced parens or no main name: degrade to a single entry
        out.push(trimmed.to_string());
        return out;
    };

    let open_len = trimmed[open..]
        .chars()
        .next()
        .map(char::len_utf8)
        .unwrap_or(1);
    out.push(main.to_string());
    for alias in trimmed[open + open_len..close].split(['、', ',']) {
        let alias = alias.trim();
        if alias.is_empty() {
            continue;
        }
        let lower = alias.to_lowercase();
        if !out.iter().any(|a| a.to_lowercase() == lower) {
            out.push(alias.to_string());
        }
    }
    out
}

/// Compose an artist's display name: `Primary` or `Primary(a、b)`.
pub fn display_name(aliases: &[String]) -> String {
    match aliases.split_first() {
        None => String::new(),
        Some((primary, [])) => primary.clone(),
        Some((primary, rest)) => format!("{}({})", primary, rest.join(ALIAS_SEPARATOR)),
    }
}

/// Union a new alias group into an existing artist.
///
/// The primary alias (index 0) is preserved; the remaining aliases become
/// the sorted, case-insensitively deduplicated union of old and new. The
/// display name is recomposed from the result. Returns whether anything
/// changed.
pub fn merge_alias_group(artist: &mut Artist, group: &[String]) -> bool {
    let Some(primary) = artist.aliases.first().cloned() else {
        artist.aliases = group.iter().cloned().collect();
        artist.name = display_name(&artist.aliases);
        return true;
    };

    let primary_lower = primary.to_lowercase();
    let mut others: Vec<String> = artist.aliases[1..].to_vec();
    for alias in group {
        let lower = alias.to_lowercase();
        if lower == primary_lower {
            continue;
        }
        if !others.iter().any(|a| a.to_lowercase() == lower) {
            others.push(alias.clone());
        }
    }
    others.sort();

    let merged: AliasList = std::iter::once(primary).chain(others).collect();
    if merged == artist.aliases {
        return false;
    }
    artist.aliases = merged;
    artist.name = display_name(&artist.aliases);
    true
}

/// Derive and attach artists for one video from its filename.
///
/// The video's existing artist links are removed first, so filename edits
/// correctly drop artists the name no longer mentions (stale artists keep
/// their row and become candidates for the cleanup sweep). Each name group
/// then either merges into the first artist whose alias set intersects it,
/// or creates a new artist with a store-assigned id. Re-running for an
/// unchanged video yields an identical artist graph.
pub async fn resolve_artists_for_video(
    pool: &SqlitePool,
    catalog: &mut Catalog,
    video_id: i64,
) -> sqlx::Result<()> {
    let Some(video) = catalog.video(video_id) else {
        return Ok(());
    };
    let file_name = video.name.clone();

    catalog.clear_video_artists(pool, video_id).await?;

    let bracket = extract_leading_bracket_group(&file_name);
    if bracket.is_empty() {
        return Ok(());
    }

    for group in split_into_name_groups(bracket) {
        let aliases = split_alias_group(&group);
        let matched = catalog
            .artists()
            .find(|a| aliases.iter().any(|alias| a.has_alias(alias)))
            .map(|a| a.id);

        let artist_id = match matched {
            Some(id) => {
                let mut snapshot = None;
                if let Some(artist) = catalog.artist_mut(id)
                    && merge_alias_group(artist, &aliases)
                {
                    snapshot = Some(artist.clone());
                }
                if let Some(artist) = snapshot {
                    debug!(artist_id = id, name = %artist.name, "merged alias group");
                    db::update_artist(pool, &artist).await?;
                }
                id
            }
            None => {
                let name = display_name(&aliases);
                let id = db::insert_artist(pool, &name, &aliases.join(ALIAS_SEPARATOR)).await?;
                debug!(artist_id = id, name = %name, "created artist");
                catalog.add_artist(Artist {
                    id,
                    name,
                    aliases,
                    favorite: false,
                    like_count: 0,
                    icon_path: None,
                });
                id
            }
        };
        catalog.link_artist(pool, video_id, artist_id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ingest_mock_video, temp_db};

    fn aliases(items: &[&str]) -> AliasList {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_leading_bracket_group() {
        assert_eq!(extract_leading_bracket_group("[吉沢明歩] title.mp4"), "吉沢明歩");
        assert_eq!(extract_leading_bracket_group("【吉沢明歩] title.mp4"), "吉沢明歩");
        assert_eq!(extract_leading_bracket_group("[a b(c)】x.mp4"), "a b(c)");
        assert_eq!(extract_leading_bracket_group("title.mp4"), "");
        assert_eq!(extract_leading_bracket_group("title [a].mp4"), "");
        assert_eq!(extract_leading_bracket_group("[never closed"), "");
        assert_eq!(extract_leading_bracket_group(""), "");
    }

    #[test]
    fn test_strip_artist_prefix() {
        assert_eq!(strip_artist_prefix("[吉沢明歩] title.mp4"), "title.mp4");
        assert_eq!(strip_artist_prefix("【a】title.mp4"), "title.mp4");
        assert_eq!(strip_artist_prefix("title.mp4"), "title.mp4");
        assert_eq!(strip_artist_prefix("[never closed"), "[never closed");
    }

    #[test]
    fn test_split_into_name_groups() {
        assert_eq!(
            split_into_name_groups("浜崎りお(篠原絵梨香、森下えりか) 吉沢明歩"),
            vec!["浜崎りお(篠原絵梨香、森下えりか)", "吉沢明歩"]
        );
        assert_eq!(split_into_name_groups("a b c"), vec!["a", "b", "c"]);
        assert_eq!(split_into_name_groups("  spaced   out  "), vec!["spaced", "out"]);
        // Whitespace inside parens does not split the group
        assert_eq!(split_into_name_groups("a(b, c) d"), vec!["a(b, c)", "d"]);
        // Unclosed paren absorbs the rest
        assert_eq!(split_into_name_groups("a(b c"), vec!["a(b c"]);
        assert!(split_into_name_groups("").is_empty());
    }

    #[test]
    fn test_split_alias_group() {
        assert_eq!(
            split_alias_group("浜崎りお(篠原絵梨香、森下えりか)"),
            aliases(&["浜崎りお", "篠原絵梨香", "森下えりか"])
        );
        assert_eq!(split_alias_group("吉沢明歩"), aliases(&["吉沢明歩"]));
        // Full-width parens and comma separators
        assert_eq!(
            split_alias_group("main（one,two）"),
            aliases(&["main", "one", "two"])
        );
        // Trimming
        assert_eq!(
            split_alias_group(" main ( a 、 b ) "),
            aliases(&["main", "a", "b"])
        );
        // Case-insensitive dedupe within the group
        assert_eq!(split_alias_group("Abc(abc、x)"), aliases(&["Abc", "x"]));
    }

    #[test]
    fn test_split_alias_group_malformed_degrades() {
        assert_eq!(split_alias_group("main(unclosed"), aliases(&["main(unclosed"]));
        assert_eq!(split_alias_group("(orphan)"), aliases(&["(orphan)"]));
        assert_eq!(split_alias_group("main()"), aliases(&["main"]));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(&aliases(&["吉沢明歩"])), "吉沢明歩");
        assert_eq!(
            display_name(&aliases(&["浜崎りお", "篠原絵梨香", "森下えりか"])),
            "浜崎りお(篠原絵梨香、森下えりか)"
        );
    }

    #[test]
    fn test_merge_preserves_primary() {
        let mut artist = Artist {
            id: 1,
            name: "浜崎りお(篠原絵梨香)".to_string(),
            aliases: aliases(&["浜崎りお", "篠原絵梨香"]),
            favorite: false,
            like_count: 0,
            icon_path: None,
        };
        // Incoming group leads with a different name; primary must not move
        let changed = merge_alias_group(&mut artist, &aliases(&["森下えりか", "浜崎りお"]));
        assert!(changed);
        assert_eq!(artist.aliases[0], "浜崎りお");
        assert!(artist.has_alias("森下えりか"));
        assert!(artist.name.starts_with("浜崎りお("));

        // Merging the same group again is a no-op
        assert!(!merge_alias_group(&mut artist, &aliases(&["森下えりか"])));
    }

    #[tokio::test]
    async fn test_resolve_creates_and_links_artists() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let video_id = ingest_mock_video(
            &pool,
            &mut catalog,
            "/v/[浜崎りお(篠原絵梨香、森下えりか) 吉沢明歩] t.mp4",
        )
        .await;

        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();

        assert_eq!(catalog.artists().count(), 2);
        assert_eq!(catalog.artists_of_video(video_id).len(), 2);
        let names: Vec<&str> = catalog.artists().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"浜崎りお(篠原絵梨香、森下えりか)"));
        assert!(names.contains(&"吉沢明歩"));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let video_id =
            ingest_mock_video(&pool, &mut catalog, "/v/[a(b) c] t.mp4").await;

        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();
        let first: Vec<Artist> = catalog.artists().cloned().collect();
        let first_links = catalog.artists_of_video(video_id).clone();

        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();
        let second: Vec<Artist> = catalog.artists().cloned().collect();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.aliases, b.aliases);
            assert_eq!(a.name, b.name);
        }
        assert_eq!(&first_links, catalog.artists_of_video(video_id));
    }

    #[tokio::test]
    async fn test_resolve_merges_overlapping_alias() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();

        let v1 = ingest_mock_video(
            &pool,
            &mut catalog,
            "/v/[浜崎りお(篠原絵梨香、森下えりか)] one.mp4",
        )
        .await;
        resolve_artists_for_video(&pool, &mut catalog, v1).await.unwrap();

        // A later video naming only one of the aliases attaches to the
        // existing artist instead of creating a duplicate
        let v2 = ingest_mock_video(&pool, &mut catalog, "/v/[森下えりか] two.mp4").await;
        resolve_artists_for_video(&pool, &mut catalog, v2).await.unwrap();

        assert_eq!(catalog.artists().count(), 1);
        let artist = catalog.artists().next().unwrap();
        assert_eq!(artist.aliases[0], "浜崎りお");
        assert_eq!(catalog.videos_of_artist(artist.id).len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_merge_persists_to_store() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();

        let v1 = ingest_mock_video(&pool, &mut catalog, "/v/[浜崎りお] one.mp4").await;
        resolve_artists_for_video(&pool, &mut catalog, v1).await.unwrap();

        let v2 =
            ingest_mock_video(&pool, &mut catalog, "/v/[浜崎りお(篠原絵梨香)] two.mp4").await;
        resolve_artists_for_video(&pool, &mut catalog, v2).await.unwrap();

        // The merged alias set survives a full reload from the store
        let reloaded = Catalog::load(&pool).await.unwrap();
        assert_eq!(reloaded.artists().count(), 1);
        let artist = reloaded.artists().next().unwrap();
        assert_eq!(artist.aliases[0], "浜崎りお");
        assert!(artist.has_alias("篠原絵梨香"));
        assert_eq!(artist.name, "浜崎りお(篠原絵梨香)");
    }

    #[tokio::test]
    async fn test_resolve_after_rename_drops_stale_links() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let video_id = ingest_mock_video(&pool, &mut catalog, "/v/[old] t.mp4").await;
        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();
        let old_id = catalog.artists().next().unwrap().id;

        catalog.set_video_name_for_test(video_id, "[new] t.mp4");
        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();

        // Old artist still exists but is unlinked; new artist holds the video
        assert!(catalog.videos_of_artist(old_id).is_empty());
        assert_eq!(catalog.artists_of_video(video_id).len(), 1);
        assert_eq!(catalog.artists().count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_without_prefix_links_nothing() {
        let (pool, _dir) = temp_db().await;
        let mut catalog = Catalog::default();
        let video_id = ingest_mock_video(&pool, &mut catalog, "/v/plain title.mp4").await;
        resolve_artists_for_video(&pool, &mut catalog, video_id)
            .await
            .unwrap();
        assert_eq!(catalog.artists().count(), 0);
        assert!(catalog.artists_of_video(video_id).is_empty());
    }
}

/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Parsing arbitrary filenames never panics and never returns
        /// groups with surrounding whitespace.
        #[test]
        fn parse_never_panics(input in ".{0,80}") {
            let bracket = extract_leading_bracket_group(&input);
            for group in split_into_name_groups(bracket) {
                prop_assert_eq!(group.trim(), group.as_str());
                let aliases = split_alias_group(&group);
                prop_assert!(!aliases.is_empty());
            }
            let _ = strip_artist_prefix(&input);
        }

        /// For `[name]rest`, extraction returns exactly `name`.
        #[test]
        fn extract_returns_bracket_content(
            name in "[^\\[\\]【】]{1,20}",
            rest in "[^\\[\\]【】]{0,20}",
        ) {
            let file = format!("[{}]{}", name, rest);
            prop_assert_eq!(extract_leading_bracket_group(&file), name.as_str());
        }

        /// Alias splitting puts the main name first and dedupes.
        #[test]
        fn alias_group_main_first(
            main in "[a-zA-Z]{1,10}",
            a in "[a-zA-Z]{1,10}",
            b in "[a-zA-Z]{1,10}",
        ) {
            let group = format!("{}({}、{})", main, a, b);
            let aliases = split_alias_group(&group);
            prop_assert_eq!(aliases[0].as_str(), main.as_str());
            let mut lowered: Vec<String> = aliases.iter().map(|s| s.to_lowercase()).collect();
            lowered.sort();
            lowered.dedup();
            prop_assert_eq!(lowered.len(), aliases.len());
        }
    }
}
