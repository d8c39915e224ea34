//! Canonical listing records and the persisted dataset document.
//!
//! Every field except `id`, `name`, and `location` is optional and is left
//! out of the JSON entirely when absent. Site-specific fields that have no
//! slot in the common schema live in [`CanonicalRecord::details`] and are
//! flattened into the same JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "partial_coordinates"
    )]
    pub coordinates: Option<Coordinates>,
}

/// Accepts `{"latitude": null, "longitude": null}` and half-filled pairs,
/// which older datasets carry on every record. Only a complete pair is kept.
fn partial_coordinates<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Partial {
        #[serde(default)]
        latitude: Option<f64>,
        #[serde(default)]
        longitude: Option<f64>,
    }

    let partial = Option::<Partial>::deserialize(deserializer)?;
    Ok(partial.and_then(|p| {
        Some(Coordinates {
            latitude: p.latitude?,
            longitude: p.longitude?,
        })
    }))
}

fn fold_case(s: &str) -> String {
    s.trim().to_lowercase()
}

impl Location {
    /// Case-insensitive comparison against a city/state pair. Surrounding
    /// whitespace on either side is ignored. Case folding is Unicode-aware.
    #[must_use]
    pub fn matches(&self, city: &str, state: &str) -> bool {
        self.matches_folded(&fold_case(city), &fold_case(state))
    }

    fn matches_folded(&self, city: &str, state: &str) -> bool {
        fold_case(&self.city) == city && fold_case(&self.state) == state
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    /// Site-specific pricing fields (`rate_type`, `packages`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Pricing {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starting_price.is_none() && self.price_range.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// `(AAA) BBB-CCCC` when a US number is recoverable, raw text otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Contact {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none() && self.website.is_none()
    }
}

/// A validated listing, independent of the site it was scraped from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Source prefix plus site-native id, e.g. `"tb_48213"`.
    pub id: String,
    pub name: String,
    pub location: Location,
    /// Normalized categories. Unordered; see `normalize_services`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<u64>,
    /// ISO-8601 timestamp of the scrape that produced this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl CanonicalRecord {
    /// Record with only the mandatory fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            services: Vec::new(),
            specialties: Vec::new(),
            pricing: None,
            contact: None,
            rating: None,
            reviews_count: None,
            last_updated: None,
            source: None,
            details: BTreeMap::new(),
        }
    }
}

/// The persisted collection: `{"magicians": [...], "last_updated": ..., "total_count": N}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub magicians: Vec<CanonicalRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_count: usize,
}

impl Dataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.magicians.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.magicians.is_empty()
    }

    /// Records whose location matches `city`/`state`, in dataset order.
    pub fn in_city<'a>(
        &'a self,
        city: &str,
        state: &str,
    ) -> impl Iterator<Item = &'a CanonicalRecord> + 'a {
        let (city, state) = (fold_case(city), fold_case(state));
        self.magicians
            .iter()
            .filter(move |m| m.location.matches_folded(&city, &state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(city: &str, state: &str) -> Location {
        Location {
            city: city.to_string(),
            state: state.to_string(),
            coordinates: None,
        }
    }

    #[test]
    fn location_matches_ignores_case_and_padding() {
        let loc = location("San Diego", "CA");
        assert!(loc.matches("san diego", "ca"));
        assert!(loc.matches("  SAN DIEGO ", "Ca"));
        assert!(!loc.matches("San Jose", "CA"));
    }

    #[test]
    fn null_coordinates_deserialize_as_absent() {
        let loc: Location = serde_json::from_str(
            r#"{"city": "Austin", "state": "TX", "coordinates": {"latitude": null, "longitude": null}}"#,
        )
        .unwrap();
        assert!(loc.coordinates.is_none());

        let half: Location = serde_json::from_str(
            r#"{"city": "Austin", "state": "TX", "coordinates": {"latitude": 30.2}}"#,
        )
        .unwrap();
        assert!(half.coordinates.is_none());

        let full: Location = serde_json::from_str(
            r#"{"city": "Austin", "state": "TX", "coordinates": {"latitude": 30.2, "longitude": -97.7}}"#,
        )
        .unwrap();
        assert_eq!(
            full.coordinates,
            Some(Coordinates {
                latitude: 30.2,
                longitude: -97.7
            })
        );
    }

    #[test]
    fn absent_optional_fields_are_not_serialized() {
        let record = CanonicalRecord::new("tb_1", "Amazing Al", location("Austin", "TX"));
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3, "only id, name, location expected: {obj:?}");
        assert!(!obj.contains_key("pricing"));
        assert!(!obj.contains_key("services"));
    }

    #[test]
    fn details_round_trip_as_top_level_keys() {
        let mut record = CanonicalRecord::new("gs_7", "Zed", location("Reno", "NV"));
        record
            .details
            .insert("languages".to_string(), serde_json::json!(["English"]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["languages"][0], "English");

        let back: CanonicalRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn dataset_deserializes_missing_metadata() {
        let ds: Dataset = serde_json::from_str(r#"{"magicians": []}"#).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.total_count, 0);
        assert!(ds.last_updated.is_none());
    }

    #[test]
    fn in_city_filters_case_insensitively() {
        let ds = Dataset {
            magicians: vec![
                CanonicalRecord::new("tb_1", "A", location("Denver", "CO")),
                CanonicalRecord::new("tb_2", "B", location("Boulder", "CO")),
                CanonicalRecord::new("gs_3", "C", location("denver", "co")),
                CanonicalRecord::new("bark_4", "D", location("São Paulo", "SP")),
            ],
            last_updated: None,
            total_count: 4,
        };
        let ids: Vec<&str> = ds.in_city("DENVER", "CO").map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["tb_1", "gs_3"]);

        let ids: Vec<&str> = ds.in_city("SÃO PAULO", "sp").map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["bark_4"]);
    }
}
