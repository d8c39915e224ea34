//! Field normalizers applied by the cleaning stage.
//!
//! Every function here is total: bad input yields `None` (or the input
//! unchanged, for phones) rather than an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d+(?:,\d{3})*(?:\.\d+)?)").expect("valid price regex")
});

static YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:years?|yrs?)\b").expect("valid years regex"));

/// Category dictionary for [`normalize_services`]. Checked in order; the
/// first key contained in the lower-cased entry wins.
const SERVICE_CATEGORIES: &[(&str, &str)] = &[
    ("close up", "Close-up Magic"),
    ("close-up", "Close-up Magic"),
    ("closeup", "Close-up Magic"),
    ("stage", "Stage Magic"),
    ("stage magic", "Stage Magic"),
    ("mentalism", "Mentalism"),
    ("mind reading", "Mentalism"),
    ("kids", "Children's Magic"),
    ("children", "Children's Magic"),
    ("birthday", "Children's Magic"),
    ("corporate", "Corporate Magic"),
    ("business", "Corporate Magic"),
];

/// Current time as an RFC 3339 / ISO-8601 string in UTC.
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Trims, decodes the `&nbsp;`/`&amp;` artifacts scrapers leave behind, and
/// collapses whitespace runs to one space. Returns `None` when nothing is left.
#[must_use]
pub fn clean_text(text: &str) -> Option<String> {
    let decoded = text
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .replace("&amp;", "&");
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// [`clean_text`] over an untyped scraped value. Numbers and booleans are
/// stringified; null, arrays, and objects yield `None`.
#[must_use]
pub fn clean_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => clean_text(&n.to_string()),
        Value::Bool(b) => clean_text(&b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Returns the first `$`-prefixed amount in `text`, e.g. `"$1,250.50 per event"` → `1250.5`.
#[must_use]
pub fn extract_price(text: &str) -> Option<f64> {
    PRICE_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

/// Every `$`-prefixed amount in `text`, in order of appearance.
#[must_use]
pub fn extract_price_range(text: &str) -> Vec<f64> {
    PRICE_RE
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

fn parse_amount(digits: &str) -> Option<f64> {
    digits.replace(',', "").parse::<f64>().ok()
}

/// Leading integer of a `"N years"`/`"N yrs"` phrase, case-insensitive.
#[must_use]
pub fn extract_years(text: &str) -> Option<u32> {
    YEARS_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Formats a US number as `(AAA) BBB-CCCC`.
///
/// Ten digits are formatted directly; eleven digits with a leading `1` drop
/// the country code first. Any other digit count returns `raw` unchanged.
/// Empty input yields `None`.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return Some(raw.to_owned()),
    };

    Some(format!(
        "({}) {}-{}",
        &local[..3],
        &local[3..6],
        &local[6..]
    ))
}

/// Maps free-form service names onto the category dictionary.
///
/// Entries matching no category are title-cased. Duplicates are removed
/// through a hash set, so the returned order is unspecified and may differ
/// between runs. Callers needing a stable order must sort.
#[must_use]
pub fn normalize_services<S: AsRef<str>>(services: &[S]) -> Vec<String> {
    let normalized: HashSet<String> = services
        .iter()
        .map(|s| {
            let lower = s.as_ref().to_lowercase();
            SERVICE_CATEGORIES
                .iter()
                .find(|(key, _)| lower.contains(key))
                .map_or_else(|| title_case(&lower), |(_, category)| (*category).to_owned())
        })
        .collect();
    normalized.into_iter().collect()
}

/// Upper-cases the first letter of every alphabetic run; apostrophes do not
/// start a new run, so `"children's"` becomes `"Children's"`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            if c != '\'' {
                at_word_start = true;
            }
        }
    }
    out
}

/// Returns `value` unchanged when it is an ISO-8601 date or datetime string;
/// otherwise the current time.
#[must_use]
pub fn validate_date(value: &Value) -> String {
    match value {
        Value::String(s) if is_iso_datetime(s) => s.clone(),
        _ => now_iso(),
    }
}

fn is_iso_datetime(s: &str) -> bool {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || is_date_and_hour(s)
}

/// `YYYY-MM-DDTHH` or `YYYY-MM-DD HH`. chrono will not build a datetime
/// without minutes, so the hour is checked by hand.
fn is_date_and_hour(s: &str) -> bool {
    let Some((date, hour)) = s.split_once(|c| c == 'T' || c == ' ') else {
        return false;
    };
    hour.len() == 2
        && hour.parse::<u8>().is_ok_and(|h| h < 24)
        && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
