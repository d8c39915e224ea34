use magidir_core::{CanonicalRecord, Dataset};

/// Records located in `city`, `state`, compared case-insensitively after
/// trimming, in dataset order.
#[must_use]
pub fn records_in_city<'a>(dataset: &'a Dataset, city: &str, state: &str) -> Vec<&'a CanonicalRecord> {
    dataset.in_city(city, state).collect()
}
