//! Fetched pages and the untyped records extractors produce from them.

use magidir_core::SourceKind;
use serde_json::{json, Map, Value};

use crate::error::ScraperError;

/// A fetched HTTP response, after pacing and retries.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL of the response, used to resolve relative links.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx page into [`ScraperError::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Status`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, ScraperError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScraperError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Summary fields scraped from one card on a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfo {
    /// Source prefix plus the site's own id, e.g. `"tb_48213"`.
    pub id: String,
    pub name: String,
    pub services: Vec<String>,
    pub city: String,
    pub state: String,
    pub rating: f64,
    pub reviews_count: u64,
    /// Absolute URL of the profile page.
    pub profile_url: String,
    pub source: SourceKind,
}

impl BasicInfo {
    /// Converts the summary into the base of a [`RawRecord`]; detail parsing
    /// layers site-specific fields on top.
    #[must_use]
    pub fn into_raw(self) -> RawRecord {
        let mut raw = RawRecord::new();
        raw.insert("id", json!(self.id));
        raw.insert("name", json!(self.name));
        raw.insert("services", json!(self.services));
        raw.insert(
            "location",
            json!({
                "city": self.city,
                "state": self.state,
                "coordinates": {"latitude": null, "longitude": null},
            }),
        );
        raw.insert("rating", json!(self.rating));
        raw.insert("reviews_count", json!(self.reviews_count));
        raw.insert("source", json!(self.source.tag()));
        raw
    }
}

/// Result of parsing one listing page.
///
/// Each card is parsed independently so one malformed card does not lose
/// the rest of the page.
#[derive(Debug)]
pub struct ListingPage {
    pub items: Vec<Result<BasicInfo, ScraperError>>,
    /// Absolute URL of the next listing page, if the page links one.
    pub next_page: Option<String>,
}

/// Field name to untyped value, as scraped from one profile. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_for_status_keeps_2xx_pages() {
        let page = Page {
            url: "https://www.bark.com/x".into(),
            status: 404,
            body: String::new(),
        };
        let err = page.error_for_status().unwrap_err();
        assert!(matches!(err, ScraperError::Status { status: 404, .. }));

        let ok = Page {
            url: "https://www.bark.com/y".into(),
            status: 204,
            body: String::new(),
        };
        assert_eq!(ok.error_for_status().unwrap().status, 204);
    }

    #[test]
    fn into_raw_nests_location_and_tags_source() {
        let raw = BasicInfo {
            id: "gs_5".into(),
            name: "Gil".into(),
            services: vec!["Magician".into()],
            city: "Reno".into(),
            state: "NV".into(),
            rating: 4.0,
            reviews_count: 3,
            profile_url: "https://www.gigsalad.com/gil".into(),
            source: SourceKind::GigSalad,
        }
        .into_raw();

        assert_eq!(raw.get("source").unwrap(), "gigsalad");
        assert_eq!(raw.get("location").unwrap()["city"], "Reno");
        assert!(raw.get("location").unwrap()["coordinates"]["latitude"].is_null());
        assert!(raw.get("profile_url").is_none());
    }
}
