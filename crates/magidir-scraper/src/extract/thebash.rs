//! The Bash (`thebash.com`) vendor directory.

use std::sync::LazyLock;

use magidir_core::SourceKind;
use scraper::Selector;
use serde_json::json;

use super::html::{all_text, exists, first_attr, first_text, selector};
use super::{parse_listing, profile_document, ListingSelectors, SourceExtractor};
use crate::error::ScraperError;
use crate::normalize::{extract_price, extract_years, now_iso};
use crate::types::{BasicInfo, ListingPage, Page, RawRecord};

static LISTING: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    card: selector(".vendor-card"),
    id_attr: "data-vendor-id",
    link: selector(".vendor-card__link"),
    name: selector(".vendor-card__name"),
    services: selector(".vendor-card__categories"),
    location: selector(".vendor-card__location"),
    rating: selector(".vendor-card__rating-score"),
    reviews: selector(".vendor-card__rating-count"),
    next_page: selector(".pagination__next"),
});

struct Profile {
    bio: Selector,
    experience: Selector,
    performance_types: Selector,
    travel_distance: Selector,
    insurance_badge: Selector,
    insurance_details: Selector,
    starting_price: Selector,
    price_range: Selector,
    phone: Selector,
    email: Selector,
    facebook: Selector,
    instagram: Selector,
    youtube: Selector,
}

static PROFILE: LazyLock<Profile> = LazyLock::new(|| Profile {
    bio: selector(".vendor-bio"),
    experience: selector(".vendor-experience"),
    performance_types: selector(".performance-types li"),
    travel_distance: selector(".travel-distance"),
    insurance_badge: selector(".insurance-badge"),
    insurance_details: selector(".insurance-details"),
    starting_price: selector(".starting-price"),
    price_range: selector(".price-range"),
    phone: selector(".contact-phone"),
    email: selector(".contact-email"),
    facebook: selector(".social-facebook"),
    instagram: selector(".social-instagram"),
    youtube: selector(".social-youtube"),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct TheBash;

impl SourceExtractor for TheBash {
    fn kind(&self) -> SourceKind {
        SourceKind::TheBash
    }

    fn parse_listing_page(&self, page: &Page) -> ListingPage {
        parse_listing(self.kind(), &LISTING, page)
    }

    fn parse_detail_page(
        &self,
        page: &Page,
        basic: BasicInfo,
    ) -> Result<RawRecord, ScraperError> {
        let document = profile_document(self.kind(), page)?;
        let root = document.root_element();
        let sel = &*PROFILE;
        let mut raw = basic.into_raw();

        raw.insert("description", json!(first_text(root, &sel.bio)));
        raw.insert(
            "experience_years",
            json!(first_text(root, &sel.experience).and_then(|t| extract_years(&t))),
        );
        raw.insert(
            "performance_types",
            json!(all_text(root, &sel.performance_types)),
        );
        raw.insert("travel_distance", json!(first_text(root, &sel.travel_distance)));
        raw.insert(
            "insurance",
            json!({
                "has_insurance": exists(root, &sel.insurance_badge),
                "details": first_text(root, &sel.insurance_details),
            }),
        );
        raw.insert(
            "pricing",
            json!({
                "starting_price": first_text(root, &sel.starting_price).and_then(|t| extract_price(&t)),
                "price_range": first_text(root, &sel.price_range),
            }),
        );
        raw.insert(
            "contact",
            json!({
                "phone": first_text(root, &sel.phone),
                "email": first_text(root, &sel.email),
                "website": page.url,
            }),
        );
        raw.insert(
            "social_media",
            json!({
                "facebook": first_attr(root, &sel.facebook, "href"),
                "instagram": first_attr(root, &sel.instagram, "href"),
                "youtube": first_attr(root, &sel.youtube, "href"),
            }),
        );
        raw.insert("last_updated", json!(now_iso()));

        Ok(raw)
    }
}
