// Listing-source capability: "query all item nodes" and "read a field by
// address from a node". Extractors only see these traits, so they run the same
// against parsed HTML and against hand-built nodes in tests.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// One item's markup fragment.
pub trait ItemNode {
    /// Whitespace-collapsed text of the first descendant matching `selector`.
    /// `None` when nothing matches or the text is empty.
    fn text(&self, selector: &str) -> Option<String>;

    /// Trimmed attribute `name` of the first descendant matching `selector`.
    fn attr(&self, selector: &str, name: &str) -> Option<String>;
}

/// A listing page.
pub trait ListingSource {
    /// All item nodes matching `selector`, in document order.
    fn items(&self, selector: &str) -> Vec<Box<dyn ItemNode + '_>>;
}

/// A parsed HTML listing page.
///
/// `scraper::Html` is not `Send`; parse, extract, and drop it without holding
/// it across an `.await`.
pub struct HtmlListing {
    document: Html,
}

impl HtmlListing {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }
}

impl ListingSource for HtmlListing {
    fn items(&self, selector: &str) -> Vec<Box<dyn ItemNode + '_>> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|el| Box::new(HtmlItem(el)) as Box<dyn ItemNode + '_>)
            .collect()
    }
}

struct HtmlItem<'a>(ElementRef<'a>);

impl HtmlItem<'_> {
    fn first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let selector = parse_selector(selector)?;
        self.0.select(&selector).next()
    }
}

impl ItemNode for HtmlItem<'_> {
    fn text(&self, selector: &str) -> Option<String> {
        let el = self.first(selector)?;
        let raw: String = el.text().collect();
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    }

    fn attr(&self, selector: &str, name: &str) -> Option<String> {
        let value = self.first(selector)?.value().attr(name)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(selector, error = %e, "Invalid CSS selector");
            None
        }
    }
}
