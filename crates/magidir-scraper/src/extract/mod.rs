//! Per-site extractors: listing pages → [`BasicInfo`] cards plus the next
//! page link; profile pages → [`RawRecord`].

mod bark;
mod gigsalad;
mod html;
mod thebash;

use magidir_core::SourceKind;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::types::{BasicInfo, ListingPage, Page, RawRecord};

pub use bark::Bark;
pub use gigsalad::GigSalad;
pub use thebash::TheBash;

/// Contract every directory site implements. Implementations differ only in
/// markup selectors and in which optional detail fields the site exposes.
pub trait SourceExtractor: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Parses the cards on a listing page and the next page link, if any.
    fn parse_listing_page(&self, page: &Page) -> ListingPage;

    /// Layers the profile page's fields over `basic`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Extraction`] when the page has no content.
    fn parse_detail_page(&self, page: &Page, basic: BasicInfo)
        -> Result<RawRecord, ScraperError>;
}

/// Extractor for `kind`.
#[must_use]
pub fn extractor_for(kind: SourceKind) -> &'static dyn SourceExtractor {
    match kind {
        SourceKind::TheBash => &TheBash,
        SourceKind::Bark => &Bark,
        SourceKind::GigSalad => &GigSalad,
    }
}

/// Selectors for a listing card. Every site lays its cards out the same way.
/// Each site holds one in a `LazyLock` static.
pub(crate) struct ListingSelectors {
    pub card: Selector,
    /// Attribute on the card element carrying the site-native id.
    pub id_attr: &'static str,
    pub link: Selector,
    pub name: Selector,
    pub services: Selector,
    pub location: Selector,
    pub rating: Selector,
    pub reviews: Selector,
    pub next_page: Selector,
}

pub(crate) fn parse_listing(
    kind: SourceKind,
    selectors: &ListingSelectors,
    page: &Page,
) -> ListingPage {
    let document = Html::parse_document(&page.body);
    let root = document.root_element();

    let items = root
        .select(&selectors.card)
        .map(|card| parse_card(kind, selectors, card, &page.url))
        .collect();

    let next_page = html::first_attr(root, &selectors.next_page, "href")
        .and_then(|href| html::resolve(&page.url, &href));

    ListingPage { items, next_page }
}

fn parse_card(
    kind: SourceKind,
    selectors: &ListingSelectors,
    card: ElementRef<'_>,
    page_url: &str,
) -> Result<BasicInfo, ScraperError> {
    let fail = |reason: &str| ScraperError::extraction(kind.tag(), page_url, reason);

    let native_id = card
        .value()
        .attr(selectors.id_attr)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| fail(&format!("card has no {} attribute", selectors.id_attr)))?;
    let id = format!("{}_{native_id}", kind.id_prefix());

    let name = html::first_text(card, &selectors.name)
        .ok_or_else(|| fail(&format!("card {id} has no name")))?;

    let location_text = html::first_text(card, &selectors.location)
        .ok_or_else(|| fail(&format!("card {id} has no location")))?;
    let (city, state) = html::split_location(&location_text)
        .ok_or_else(|| fail(&format!("card {id} location {location_text:?} is not \"City, State\"")))?;

    let profile_url = html::first_attr(card, &selectors.link, "href")
        .and_then(|href| html::resolve(page_url, &href))
        .ok_or_else(|| fail(&format!("card {id} has no profile link")))?;

    let rating = html::first_text(card, &selectors.rating)
        .and_then(|t| html::first_float(&t))
        .unwrap_or(0.0);
    let reviews_count = html::first_text(card, &selectors.reviews)
        .and_then(|t| html::first_int(&t))
        .unwrap_or(0);

    Ok(BasicInfo {
        id,
        name,
        services: html::all_text(card, &selectors.services),
        city,
        state,
        rating,
        reviews_count,
        profile_url,
        source: kind,
    })
}

/// Parses a profile page for site-specific selection. An empty body means
/// the site served nothing usable.
pub(crate) fn profile_document(kind: SourceKind, page: &Page) -> Result<Html, ScraperError> {
    if page.body.trim().is_empty() {
        return Err(ScraperError::extraction(
            kind.tag(),
            &page.url,
            "profile page body is empty",
        ));
    }
    Ok(Html::parse_document(&page.body))
}
