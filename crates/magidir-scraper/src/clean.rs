//! Record cleaning stage: [`RawRecord`] → [`CanonicalRecord`].
//!
//! Applies the field normalizers from [`crate::normalize`] field by field.
//! A field that normalizes to nothing is dropped rather than stored as null.
//! Only a missing `id`, `name`, or `location` rejects the record.

use std::collections::{BTreeMap, HashSet};

use magidir_core::{CanonicalRecord, Contact, Coordinates, Location, PriceRange, Pricing};
use serde_json::{Map, Value};

use crate::error::ScraperError;
use crate::normalize::{
    clean_text, clean_value, extract_price, extract_price_range, normalize_phone,
    normalize_services, validate_date,
};
use crate::types::RawRecord;

/// Cleans and validates one scraped record.
///
/// # Errors
///
/// Returns [`ScraperError::Validation`] naming the first mandatory field
/// (`id`, `name`, `location`) that is absent after cleaning.
pub fn clean_record(raw: RawRecord) -> Result<CanonicalRecord, ScraperError> {
    let mut fields = raw.into_inner();

    let id = fields
        .remove("id")
        .as_ref()
        .and_then(clean_value)
        .ok_or(ScraperError::Validation {
            id: None,
            field: "id",
        })?;

    let name = fields
        .remove("name")
        .as_ref()
        .and_then(clean_value)
        .ok_or_else(|| ScraperError::Validation {
            id: Some(id.clone()),
            field: "name",
        })?;

    let location = fields
        .remove("location")
        .as_ref()
        .and_then(clean_location)
        .ok_or_else(|| ScraperError::Validation {
            id: Some(id.clone()),
            field: "location",
        })?;

    let mut record = CanonicalRecord::new(id, name, location);

    if let Some(services) = fields.remove("services") {
        let cleaned = clean_string_list(&services);
        record.services = normalize_services(&cleaned);
    }
    if let Some(specialties) = fields.remove("specialties") {
        let unique: HashSet<String> = clean_string_list(&specialties).into_iter().collect();
        record.specialties = unique.into_iter().collect();
    }
    record.pricing = fields.remove("pricing").as_ref().and_then(clean_pricing);
    record.contact = fields.remove("contact").as_ref().and_then(clean_contact);
    record.rating = fields
        .remove("rating")
        .as_ref()
        .and_then(as_f64)
        .filter(|r| r.is_finite() && *r >= 0.0);
    record.reviews_count = fields.remove("reviews_count").as_ref().and_then(as_u64);
    record.last_updated = fields.remove("last_updated").map(|v| validate_date(&v));
    record.source = fields.remove("source").as_ref().and_then(clean_value);

    record.details = fields
        .into_iter()
        .filter_map(|(k, v)| clean_json(v).map(|v| (k, v)))
        .collect::<BTreeMap<_, _>>();

    Ok(record)
}

fn clean_location(value: &Value) -> Option<Location> {
    let obj = value.as_object()?;
    let city = obj.get("city").and_then(clean_value)?;
    let state = obj.get("state").and_then(clean_value)?;
    let coordinates = obj.get("coordinates").and_then(|c| {
        let latitude = c.get("latitude").and_then(Value::as_f64)?;
        let longitude = c.get("longitude").and_then(Value::as_f64)?;
        Some(Coordinates {
            latitude,
            longitude,
        })
    });
    Some(Location {
        city,
        state,
        coordinates,
    })
}

fn clean_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(clean_value).collect(),
        other => clean_value(other).into_iter().collect(),
    }
}

fn clean_pricing(value: &Value) -> Option<Pricing> {
    let obj = value.as_object()?;
    let mut pricing = Pricing::default();

    for (key, v) in obj {
        match key.as_str() {
            "starting_price" => pricing.starting_price = price_of(v),
            "price_range" => pricing.price_range = price_range_of(v),
            _ => {
                if let Some(cleaned) = clean_json(v.clone()) {
                    pricing.extra.insert(key.clone(), cleaned);
                }
            }
        }
    }

    (!pricing.is_empty()).then_some(pricing)
}

fn price_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => extract_price(s),
        _ => None,
    }
}

fn price_range_of(value: &Value) -> Option<PriceRange> {
    let range = match value {
        Value::String(s) => {
            let prices = extract_price_range(s);
            PriceRange {
                min: prices.first().copied(),
                max: prices.get(1).copied(),
            }
        }
        Value::Object(obj) => PriceRange {
            min: obj.get("min").and_then(price_of),
            max: obj.get("max").and_then(price_of),
        },
        _ => return None,
    };
    (range.min.is_some() || range.max.is_some()).then_some(range)
}

fn clean_contact(value: &Value) -> Option<Contact> {
    let obj = value.as_object()?;
    let contact = Contact {
        phone: obj
            .get("phone")
            .and_then(clean_value)
            .and_then(|p| normalize_phone(&p)),
        email: obj.get("email").and_then(clean_value),
        website: obj.get("website").and_then(clean_value),
    };
    (!contact.is_empty()).then_some(contact)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Recursively cleans a site-specific value: strings go through
/// [`clean_text`], and nulls, blank strings, empty arrays, and empty
/// objects are dropped.
fn clean_json(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => clean_text(&s).map(Value::String),
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.into_iter().filter_map(clean_json).collect();
            (!cleaned.is_empty()).then_some(Value::Array(cleaned))
        }
        Value::Object(obj) => {
            let cleaned: Map<String, Value> = obj
                .into_iter()
                .filter_map(|(k, v)| clean_json(v).map(|v| (k, v)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other @ (Value::Bool(_) | Value::Number(_)) => Some(other),
    }
}

#[cfg(test)]
#[path = "clean_test.rs"]
mod tests;
