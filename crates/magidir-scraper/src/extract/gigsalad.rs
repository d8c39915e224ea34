//! GigSalad (`gigsalad.com`) performer listings.

use std::sync::LazyLock;

use magidir_core::SourceKind;
use scraper::Selector;
use serde_json::{json, Value};

use super::html::{all_text, exists, first_text, selector};
use super::{parse_listing, profile_document, ListingSelectors, SourceExtractor};
use crate::error::ScraperError;
use crate::normalize::{extract_price, now_iso};
use crate::types::{BasicInfo, ListingPage, Page, RawRecord};

static LISTING: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    card: selector(".performer-card"),
    id_attr: "data-performer-id",
    link: selector(".performer-link"),
    name: selector(".performer-name"),
    services: selector(".performer-categories span"),
    location: selector(".performer-location"),
    rating: selector(".performer-rating"),
    reviews: selector(".review-count"),
    next_page: selector(".pagination__next"),
});

struct Profile {
    package: Selector,
    package_name: Selector,
    package_price: Selector,
    package_description: Selector,
    bio: Selector,
    performance_length: Selector,
    languages: Selector,
    payment_methods: Selector,
    cancellation_policy: Selector,
    insurance_verified: Selector,
    insurance_details: Selector,
    equipment_provides: Selector,
    equipment_needs: Selector,
    starting_price: Selector,
}

static PROFILE: LazyLock<Profile> = LazyLock::new(|| Profile {
    package: selector(".pricing-package"),
    package_name: selector(".package-name"),
    package_price: selector(".package-price"),
    package_description: selector(".package-description"),
    bio: selector(".bio-content"),
    performance_length: selector(".performance-length"),
    languages: selector(".languages li"),
    payment_methods: selector(".payment-methods li"),
    cancellation_policy: selector(".cancellation-policy"),
    insurance_verified: selector(".insurance-verified"),
    insurance_details: selector(".insurance-details"),
    equipment_provides: selector(".equipment-provides li"),
    equipment_needs: selector(".equipment-needs li"),
    starting_price: selector(".starting-price"),
});

#[derive(Debug, Clone, Copy, Default)]
pub struct GigSalad;

impl SourceExtractor for GigSalad {
    fn kind(&self) -> SourceKind {
        SourceKind::GigSalad
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

        let packages: Vec<Value> = root
            .select(&sel.package)
            .map(|package| {
                json!({
                    "name": first_text(package, &sel.package_name),
                    "price": first_text(package, &sel.package_price).and_then(|t| extract_price(&t)),
                    "description": first_text(package, &sel.package_description),
                })
            })
            .collect();

        raw.insert("description", json!(first_text(root, &sel.bio)));
        raw.insert(
            "performance_length",
            json!(first_text(root, &sel.performance_length)),
        );
        raw.insert("languages", json!(all_text(root, &sel.languages)));
        raw.insert("payment_methods", json!(all_text(root, &sel.payment_methods)));
        raw.insert(
            "cancellation_policy",
            json!(first_text(root, &sel.cancellation_policy)),
        );
        raw.insert(
            "insurance",
            json!({
                "has_insurance": exists(root, &sel.insurance_verified),
                "details": first_text(root, &sel.insurance_details),
            }),
        );
        raw.insert(
            "equipment",
            json!({
                "provides": all_text(root, &sel.equipment_provides),
                "needs": all_text(root, &sel.equipment_needs),
            }),
        );
        raw.insert(
            "pricing",
            json!({
                "starting_price": first_text(root, &sel.starting_price).and_then(|t| extract_price(&t)),
                "packages": packages,
            }),
        );
        // Phone and email sit behind the booking flow.
        raw.insert("contact", json!({ "website": page.url }));
        raw.insert("last_updated", json!(now_iso()));

        Ok(raw)
    }
}
