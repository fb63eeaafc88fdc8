//! Tag pairing and overlap filtering.
//!
//! Turns the raw, source-ordered tag list from [`extract`](crate::extract)
//! into a list of non-overlapping start tags:
//!
//! 1. Each end tag is folded into the nearest preceding unfolded start tag
//!    with the same name. End tags without a partner are dropped.
//! 2. Tags the caller does not keep (no handler) are dropped.
//! 3. Tags starting inside an earlier kept tag's span are dropped. They
//!    are picked up on the next pass if the outer handler leaves them in
//!    its output.

use crate::tag::Tag;

/// Pair, filter and de-overlap `tags` taken from `text`.
///
/// `keep` decides which paired start tags take part in overlap filtering;
/// tags nobody handles must not hide handled tags nested inside them.
pub fn resolve(text: &str, tags: Vec<Tag>, keep: impl Fn(&Tag) -> bool) -> Vec<Tag> {
    let paired = fold_end_tags(text, tags);
    let kept = paired.into_iter().filter(|tag| keep(tag)).collect();
    drop_overlapping(kept)
}

/// Fold end tags into their start tags and remove every end tag.
pub fn fold_end_tags(text: &str, mut tags: Vec<Tag>) -> Vec<Tag> {
    for idx in 0..tags.len() {
        if !tags[idx].end_tag {
            continue;
        }

        let (before, rest) = tags.split_at_mut(idx);
        let end_tag = &rest[0];

        let partner = before
            .iter_mut()
            .rev()
            .find(|t| !t.end_tag && t.self_closing && t.tag_name == end_tag.tag_name);

        match partner {
            Some(start_tag) => start_tag.absorb(end_tag, text),
            None => tracing::trace!(
                tag = %end_tag.tag_name,
                offset = end_tag.start,
                "Dropping end tag without start tag"
            ),
        }
    }

    tags.retain(|tag| !tag.end_tag);
    tags
}

/// Drop tags that start before the end of an earlier surviving tag.
///
/// Input must be ordered by `start`.
pub fn drop_overlapping(tags: Vec<Tag>) -> Vec<Tag> {
    let mut claimed = 0;
    let mut resolved = Vec::with_capacity(tags.len());

    for tag in tags {
        if tag.start < claimed {
            tracing::trace!(
                tag = %tag.tag_name,
                offset = tag.start,
                "Skipping tag nested in a claimed span"
            );
            continue;
        }
        claimed = tag.end;
        resolved.push(tag);
    }

    resolved
}
