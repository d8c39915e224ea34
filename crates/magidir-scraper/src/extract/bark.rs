//! Bark (`bark.com`) professional listings.

use std::sync::LazyLock;

use magidir_core::SourceKind;
use scraper::Selector;
use serde_json::json;

use super::html::{all_text, first_text, selector};
use super::{parse_listing, profile_document, ListingSelectors, SourceExtractor};
use crate::error::ScraperError;
use crate::normalize::now_iso;
use crate::types::{BasicInfo, ListingPage, Page, RawRecord};

static LISTING: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    card: selector(".professional-card"),
    id_attr: "data-pro-id",
    link: selector(".pro-profile-link"),
    name: selector(".pro-name"),
    services: selector(".pro-services li"),
    location: selector(".pro-location"),
    rating: selector(".pro-rating"),
    reviews: selector(".review-count"),
    next_page: selector(".pagination-next"),
});

struct Profile {
    description: Selector,
    badges: Selector,
    response_time: Selector,
    services_offered: Selector,
    availability_days: Selector,
    availability_hours: Selector,
    rate_type: Selector,
    rate_range: Selector,
}

static PROFILE: LazyLock<Profile> = LazyLock::new(|| Profile {
    description: selector(".pro-description"),
    badges: selector(".pro-badges span"),
    response_time: selector(".response-time"),
    services_offered: selector(".services-list li"),
    availability_days: selector(".availability-days li"),
    availability_hours: selector(".availability-hours"),
    rate_type: selector(".rate-type"),
    rate_range: selector(".rate-range"),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct Bark;

impl SourceExtractor for Bark {
    fn kind(&self) -> SourceKind {
        SourceKind::Bark
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

        raw.insert("description", json!(first_text(root, &sel.description)));
        raw.insert("badges", json!(all_text(root, &sel.badges)));
        raw.insert("response_time", json!(first_text(root, &sel.response_time)));
        raw.insert("services_offered", json!(all_text(root, &sel.services_offered)));
        raw.insert(
            "availability",
            json!({
                "days": all_text(root, &sel.availability_days),
                "hours": first_text(root, &sel.availability_hours),
            }),
        );
        // Bark quotes per job, so there is no starting price.
        raw.insert(
            "pricing",
            json!({
                "rate_type": first_text(root, &sel.rate_type),
                "rate_range": first_text(root, &sel.rate_range),
            }),
        );
        raw.insert("contact", json!({ "website": page.url }));
        raw.insert("last_updated", json!(now_iso()));

        Ok(raw)
    }
}
