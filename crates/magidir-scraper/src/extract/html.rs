//! CSS-selector helpers shared by the site extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid int regex"));
static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid float regex"));

/// Parses a selector literal. Extractors call this from `LazyLock`
/// initializers, so each selector is parsed once per process.
pub(super) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Whitespace-joined text of the first match, or `None` if there is no
/// match or it is blank.
pub(super) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().and_then(element_text)
}

/// Text of every match, blanks skipped.
pub(super) fn all_text(scope: ElementRef<'_>, sel: &Selector) -> Vec<String> {
    scope.select(sel).filter_map(element_text).collect()
}

/// Attribute value of the first match.
pub(super) fn first_attr(scope: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub(super) fn exists(scope: ElementRef<'_>, sel: &Selector) -> bool {
    scope.select(sel).next().is_some()
}

fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// First run of digits in `text`, e.g. `"(42 reviews)"` → `42`.
pub(super) fn first_int(text: &str) -> Option<u64> {
    INT_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First decimal number in `text`, e.g. `"4.9 out of 5"` → `4.9`.
pub(super) fn first_float(text: &str) -> Option<f64> {
    FLOAT_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Splits `"City, State"` on commas into its first two trimmed parts.
pub(super) fn split_location(text: &str) -> Option<(String, String)> {
    let mut parts = text.split(',').map(str::trim);
    let city = parts.next().filter(|s| !s.is_empty())?;
    let state = parts.next().filter(|s| !s.is_empty())?;
    Some((city.to_owned(), state.to_owned()))
}

/// Resolves `href` against the page URL.
pub(super) fn resolve(base: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    let joined = base.join(href.trim()).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}
