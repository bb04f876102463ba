use url::Url;

use super::source::ItemNode;
use super::{resolve_link, LocationOrigin, RawItem};

pub(super) const TITLE: &str = ".d2d";
pub(super) const LOCATION: &str = ".t2l";
pub(super) const LINK: &str = ".w3.bo a";
pub(super) const MAPS: &str = ".w2.bo a";
pub(super) const LISTING_ID: &str = ".idt";

/// Card layout: a block per tournament with title, `<city> (<venue>)`
/// location, a link to the forum thread and a map link.
pub fn extract_card(node: &dyn ItemNode, base: &Url) -> RawItem {
    RawItem {
        link: resolve_link(base, node.attr(LINK, "href")),
        title: node.text(TITLE),
        location_text: node.text(LOCATION),
        location_origin: LocationOrigin::Block,
        maps_url: resolve_link(base, node.attr(MAPS, "href")),
        listing_id: node.text(LISTING_ID),
        ..RawItem::default()
    }
}
