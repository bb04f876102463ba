//! Turns a listing page into raw field bundles, one per announcement.

mod card;
mod forum_row;
pub mod source;

pub use card::extract_card;
pub use forum_row::extract_forum_row;
pub use source::{HtmlListing, ItemNode, ListingSource};

use tenisdemasa_common::ListingLayout;
use thiserror::Error;
use url::Url;

/// Where the location text of a bundle came from, which decides the order of
/// location rules applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationOrigin {
    /// A dedicated `<city> (<venue>)` block.
    Block,
    /// Free text, usually the announcement title.
    #[default]
    Title,
}

/// Raw, un-normalized fields of one item. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    /// Absolute announcement URL.
    pub link: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub location_text: Option<String>,
    pub location_origin: LocationOrigin,
    pub maps_url: Option<String>,
    /// Site-side listing id, carried into per-item logs.
    pub listing_id: Option<String>,
    pub author: Option<String>,
    pub created_text: Option<String>,
    pub replies_text: Option<String>,
    pub last_post_by: Option<String>,
    pub last_post_text: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("item {index}: no announcement link")]
    MissingLink { index: usize },

    #[error("item {index}: link '{href}' is not an http(s) URL")]
    InvalidLink { index: usize, href: String },

    #[error("no identity key can be derived from '{link}'")]
    NoIdentity { link: String },
}

/// Outcome of extracting one page: the usable bundles plus the items that had
/// to be dropped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub items: Vec<RawItem>,
    pub errors: Vec<ExtractionError>,
}

/// CSS selector addressing one item node in `layout`.
pub fn item_selector(layout: ListingLayout) -> &'static str {
    match layout {
        ListingLayout::Card => "#load_data .l1.lx",
        ListingLayout::ForumRow => "tr.topic-item",
    }
}

/// Extract every item of a listing, preserving document order. Items without
/// a usable link cannot be identified and are reported in `errors` instead.
pub fn extract_listing(source: &dyn ListingSource, layout: ListingLayout, base: &Url) -> Extraction {
    let mut extraction = Extraction::default();

    for (index, node) in source.items(item_selector(layout)).iter().enumerate() {
        let raw = match layout {
            ListingLayout::Card => extract_card(node.as_ref(), base),
            ListingLayout::ForumRow => extract_forum_row(node.as_ref(), base),
        };
        match &raw.link {
            Some(_) => extraction.items.push(raw),
            None => extraction.errors.push(link_error(index, node.as_ref(), layout)),
        }
    }

    extraction
}

fn link_error(index: usize, node: &dyn ItemNode, layout: ListingLayout) -> ExtractionError {
    let href = match layout {
        ListingLayout::Card => node.attr(card::LINK, "href"),
        ListingLayout::ForumRow => node.attr(forum_row::TITLE, "href"),
    };
    match href {
        Some(href) => ExtractionError::InvalidLink { index, href },
        None => ExtractionError::MissingLink { index },
    }
}

/// Resolve `href` against the listing URL; only http(s) results are kept.
pub(crate) fn resolve_link(base: &Url, href: Option<String>) -> Option<String> {
    let href = href?;
    let resolved = base.join(&href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
