use url::Url;

use super::source::ItemNode;
use super::{resolve_link, LocationOrigin, RawItem};

pub(super) const TITLE: &str = "a.topic-title";
pub(super) const CATEGORY: &str = "a.js-topic-prefix";
pub(super) const AUTHOR: &str = "div.topic-info a";
pub(super) const CREATED: &str = "div.topic-info span.date";
pub(super) const REPLIES: &str = "div.posts-count";
pub(super) const LAST_POST_BY: &str = "div.lastpost-by a";
pub(super) const LAST_POST_AT: &str = "span.post-date";

/// Forum topic row: the title anchor carries both the announcement text and
/// its link; location and schedule are later read from the title.
pub fn extract_forum_row(node: &dyn ItemNode, base: &Url) -> RawItem {
    let title = node.text(TITLE);
    RawItem {
        link: resolve_link(base, node.attr(TITLE, "href")),
        location_text: title.clone(),
        location_origin: LocationOrigin::Title,
        title,
        category: node.text(CATEGORY),
        author: node.text(AUTHOR),
        created_text: node.text(CREATED),
        replies_text: node.text(REPLIES),
        last_post_by: node.text(LAST_POST_BY),
        last_post_text: node.text(LAST_POST_AT),
        ..RawItem::default()
    }
}
