use std::sync::LazyLock;

use regex::Regex;
use tenisdemasa_common::Location;

use super::diacritics::fold_diacritics;

/// Places that regularly host tournaments. Matched case-insensitively after
/// diacritic folding, in list order.
const KNOWN_PLACES: &[&str] = &[
    "Suceava", "Cicarlau", "București", "Focșani", "Vaslui",
    "Iași", "Voinești", "Miroslava", "Sântămăria", "Hunedoara",
    "Ditrău", "Craiova", "Arad", "Topoloveni", "Târgu Mureș", "Timișoara",
    "Ocna Sibiului", "Cluj", "Constanța", "Brașov", "Bacău", "Botoșani",
    "Bârlad", "Baia Mare", "Sibiu", "Oradea", "Galați", "Ploiești",
    "Pitești", "Piatra Neamț", "Buzău",
];

/// `<text> (<text>)`: city before the parenthesis, venue inside.
static RE_PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^()]+?)\s*\(([^()]+)\)").unwrap());

static RE_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]+)\)").unwrap());

/// Romanian county (județ) codes. Bucharest's single-letter `B` is left out,
/// it matches too much.
static RE_COUNTY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s,.\-])(AB|AR|AG|BC|BH|BN|BT|BV|BR|BZ|CS|CL|CJ|CT|CV|DB|DJ|GL|GR|GJ|HR|HD|IL|IS|IF|MM|MH|MS|NT|OT|PH|SM|SJ|SB|SV|TR|TM|TL|VS|VL|VN)(?:$|[\s,.\-)])",
    )
    .unwrap()
});

static RE_COUNTY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s,]*(?:jud\.?|judetul|judet)\s*$").unwrap());

/// One location heuristic. Rules are tried in order; the first that produces a
/// location wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRule {
    /// Substring match against [`KNOWN_PLACES`]. Yields a city only.
    KnownPlace,
    /// `<city> (<venue>)`.
    Parenthesized,
    /// A parenthetical naming a county code or ending in `jud.`. Yields a city only.
    CountyCode,
}

/// Order used for free text such as topic titles.
pub const LOCATION_RULES: [LocationRule; 3] = [
    LocationRule::KnownPlace,
    LocationRule::Parenthesized,
    LocationRule::CountyCode,
];

/// Order used for a dedicated location block, whose markup is already
/// `<city> (<venue>)`; the structural split goes first so the venue is kept.
pub const LOCATION_BLOCK_RULES: [LocationRule; 3] = [
    LocationRule::Parenthesized,
    LocationRule::KnownPlace,
    LocationRule::CountyCode,
];

impl LocationRule {
    pub fn apply(self, text: &str) -> Option<Location> {
        match self {
            Self::KnownPlace => known_place(text),
            Self::Parenthesized => parenthesized(text),
            Self::CountyCode => county_parenthetical(text),
        }
    }
}

/// Extract a location from free text using [`LOCATION_RULES`].
pub fn extract_location(text: &str) -> Location {
    extract_location_with(text, &LOCATION_RULES)
}

/// Extract a location trying `rules` in order. Total: unmatched text gives an
/// empty location.
pub fn extract_location_with(text: &str, rules: &[LocationRule]) -> Location {
    let text = text.trim();
    if text.is_empty() {
        return Location::default();
    }
    rules
        .iter()
        .find_map(|rule| rule.apply(text))
        .unwrap_or_default()
}

fn clean(segment: &str) -> Option<String> {
    let folded = fold_diacritics(segment);
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn known_place(text: &str) -> Option<Location> {
    let haystack = fold_diacritics(text).to_lowercase();
    KNOWN_PLACES.iter().find_map(|place| {
        let folded = fold_diacritics(place);
        haystack
            .contains(&folded.to_lowercase())
            .then(|| Location::new(Some(folded), None))
    })
}

fn parenthesized(text: &str) -> Option<Location> {
    let caps = RE_PARENTHESIZED.captures(text)?;
    let city = clean(caps.get(1)?.as_str())?;
    let venue = clean(caps.get(2)?.as_str());
    Some(Location::new(Some(city), venue))
}

fn county_parenthetical(text: &str) -> Option<Location> {
    let inner = RE_PARENTHETICAL.captures(text)?.get(1)?.as_str().trim();

    let stripped = if RE_COUNTY_SUFFIX.is_match(inner) {
        RE_COUNTY_SUFFIX.replace(inner, "").to_string()
    } else if let Some(code) = RE_COUNTY_CODE.captures(inner).and_then(|c| c.get(1)) {
        // Drop a trailing ", MM" but keep codes used inside a name.
        if inner[code.end()..].trim().is_empty() {
            inner[..code.start()].to_string()
        } else {
            inner.to_string()
        }
    } else {
        return None;
    };

    let city = clean(&stripped).or_else(|| clean(inner))?;
    Some(Location::new(Some(city), None))
}
