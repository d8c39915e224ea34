use magidir_core::Location;
use serde_json::json;
use tempfile::TempDir;

use super::*;

fn record(id: &str, name: &str) -> CanonicalRecord {
    CanonicalRecord::new(
        id,
        name,
        Location {
            city: "Austin".to_string(),
            state: "TX".to_string(),
            coordinates: None,
        },
    )
}

fn rated(id: &str, name: &str, rating: f64) -> CanonicalRecord {
    CanonicalRecord {
        rating: Some(rating),
        ..record(id, name)
    }
}

#[test]
fn load_missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = DatasetStore::load(dir.path().join("magicians.json")).unwrap();
    assert!(store.dataset().is_empty());
    assert_eq!(store.dataset().last_updated, None);
}

#[test]
fn load_rejects_malformed_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magicians.json");
    fs::write(&path, "{\"magicians\": 7}").unwrap();

    let err = DatasetStore::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got {err:?}");
}

#[test]
fn load_accepts_null_coordinates_from_older_datasets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magicians.json");
    fs::write(
        &path,
        r#"{"magicians":[{"id":"tb_1","name":"Amazing Al","location":{"city":"Austin","state":"TX","coordinates":{"latitude":null,"longitude":null}}}],"last_updated":"2024-01-15T10:00:00","total_count":1}"#,
    )
    .unwrap();

    let store = DatasetStore::load(&path).unwrap();
    assert_eq!(store.dataset().len(), 1);
    assert!(store.dataset().magicians[0].location.coordinates.is_none());
}

#[test]
fn upsert_same_id_twice_keeps_one_entry_with_latest_content() {
    let mut store = DatasetStore::with_dataset("unused.json", Dataset::default());

    assert_eq!(
        store.upsert(rated("tb_1", "Amazing Al", 4.0)),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.upsert(rated("tb_1", "Amazing Al", 4.8)),
        UpsertOutcome::Updated
    );

    assert_eq!(store.dataset().len(), 1);
    assert_eq!(store.dataset().magicians[0].rating, Some(4.8));
}

#[test]
fn upsert_replaces_in_place_and_appends_new_ids() {
    let mut store = DatasetStore::with_dataset("unused.json", Dataset::default());
    store.upsert(record("tb_1", "Zed"));
    store.upsert(record("gs_2", "Abe"));
    store.upsert(rated("tb_1", "Zed", 3.5));
    store.upsert(record("bark_3", "Moe"));

    let ids: Vec<&str> = store
        .dataset()
        .magicians
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["tb_1", "gs_2", "bark_3"]);
}

#[test]
fn same_name_on_two_sites_stays_two_entries() {
    let mut store = DatasetStore::with_dataset("unused.json", Dataset::default());
    store.upsert(record("tb_10", "Sammy Sleight"));
    store.upsert(record("gs_10", "Sammy Sleight"));
    assert_eq!(store.dataset().len(), 2);
}

#[test]
fn finalize_sorts_by_name_and_counts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("magicians.json");

    let orders = [
        ["tb_3", "gs_1", "bark_2", "tb_4"],
        ["tb_4", "bark_2", "tb_3", "gs_1"],
    ];
    let names = |id: &str| match id {
        "tb_3" => "Carla",
        "gs_1" => "Abe",
        "bark_2" => "Bea",
        _ => "Abe",
    };

    let mut results = Vec::new();
    for order in orders {
        let mut store = DatasetStore::with_dataset(&path, Dataset::default());
        for id in order {
            store.upsert(record(id, names(id)));
        }
        let dataset = store.finalize().unwrap();
        assert_eq!(dataset.total_count, 4);
        assert!(dataset.last_updated.is_some());
        results.push(
            dataset
                .magicians
                .iter()
                .map(|r| r.id.clone())
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(results[0], vec!["gs_1", "tb_4", "bark_2", "tb_3"]);
    assert_eq!(results[0], results[1]);
}

#[test]
fn finalize_writes_document_that_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magicians.json");

    let mut store = DatasetStore::load(&path).unwrap();
    let mut al = rated("tb_1", "Amazing Al", 4.9);
    al.details
        .insert("experience_years".to_string(), json!(18));
    store.upsert(al);
    store.upsert(record("gs_2", "Bea"));
    let written = store.finalize().unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["total_count"], 2);
    assert_eq!(raw["magicians"][0]["id"], "tb_1");
    assert_eq!(raw["magicians"][0]["experience_years"], 18);
    assert!(raw["last_updated"].is_string());
    assert!(!path.with_extension("json.tmp").exists());

    let reloaded = DatasetStore::load(&path).unwrap();
    assert_eq!(reloaded.dataset(), &written);
}

#[test]
fn nothing_is_written_before_finalize() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magicians.json");

    let mut store = DatasetStore::load(&path).unwrap();
    store.upsert(record("tb_1", "Amazing Al"));
    assert!(!path.exists());
    drop(store);
    assert!(!path.exists());
}

#[test]
fn second_run_updates_changed_record_and_adds_new_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magicians.json");

    let mut first = DatasetStore::load(&path).unwrap();
    first.upsert(rated("tb_1", "Amazing Al", 4.5));
    first.upsert(rated("gs_2", "Bea", 4.0));
    let before = first.finalize().unwrap();

    let mut second = DatasetStore::load(&path).unwrap();
    assert_eq!(second.upsert(rated("tb_1", "Amazing Al", 4.9)), UpsertOutcome::Updated);
    assert_eq!(second.upsert(rated("bark_3", "Cal", 5.0)), UpsertOutcome::Inserted);
    let after = second.finalize().unwrap();

    assert_eq!(after.total_count, before.total_count + 1);
    let al = after.magicians.iter().find(|r| r.id == "tb_1").unwrap();
    assert_eq!(al.rating, Some(4.9));
}
