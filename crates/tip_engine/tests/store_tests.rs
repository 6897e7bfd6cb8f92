use fixture_feed::{FixtureId, FixtureRecord};
use pretty_assertions::assert_eq;
use serde_json::json;
use tip_engine::{PublishedStore, SqlitePublishedStore, StoredSet};

fn record(id: u64, home: &str, away: &str) -> FixtureRecord {
    FixtureRecord::from_payload(json!({
        "fixture": { "id": id, "date": "2024-05-12T19:00:00+00:00", "status": { "short": "FT" } },
        "league":  { "country": "Spain" },
        "teams":   { "home": { "name": home }, "away": { "name": away } },
        "score":   { "fulltime": { "home": 2, "away": 1 } }
    }))
    .unwrap()
}

#[tokio::test]
async fn absent_empty_and_populated_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqlitePublishedStore::open(dir.path().join("published.db"), "live_matches").unwrap();

    assert_eq!(store.read().await.unwrap(), None);

    store.overwrite(&[]).await.unwrap();
    assert_eq!(store.read().await.unwrap(), Some(StoredSet::default()));

    let fixtures = vec![record(42, "Real Madrid CF", "FC Barcelona"), record(7, "Sevilla FC", "Real Betis")];
    store.overwrite(&fixtures).await.unwrap();
    assert_eq!(store.read().await.unwrap(), Some(StoredSet { fixtures, unreadable: 0 }));

    store.clear().await.unwrap();
    assert_eq!(store.read().await.unwrap(), None);
}

#[tokio::test]
async fn overwrite_survives_reopen_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("published.db");

    {
        let store = SqlitePublishedStore::open(&path, "live_matches").unwrap();
        store.overwrite(&[record(2, "B", "C"), record(1, "A", "D")]).await.unwrap();
    }

    let store = SqlitePublishedStore::open(&path, "live_matches").unwrap();
    let read = store.read().await.unwrap().unwrap();
    assert!(read.is_clean());
    let ids: Vec<FixtureId> = read.fixtures.iter().map(|f| f.id.clone()).collect();
    assert_eq!(ids, vec![FixtureId::Feed("2".into()), FixtureId::Feed("1".into())]);

    let row = store.read_row().await.unwrap().unwrap();
    assert_eq!(row.slot, "live_matches");
    assert!(!row.ts.is_empty());
    assert_eq!(row.payloads[0]["score"]["fulltime"]["home"], 2);
}

#[tokio::test]
async fn slots_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("published.db");
    let live = SqlitePublishedStore::open(&path, "live_matches").unwrap();
    let today = SqlitePublishedStore::open(&path, "today_matches").unwrap();

    live.overwrite(&[record(1, "A", "B")]).await.unwrap();
    today.clear().await.unwrap();

    assert_eq!(live.read().await.unwrap().map(|s| s.fixtures.len()), Some(1));
    assert_eq!(today.read().await.unwrap(), None);
}

#[tokio::test]
async fn unreadable_entries_are_counted_not_returned() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqlitePublishedStore::open(dir.path().join("published.db"), "live_matches").unwrap();

    let valid = record(42, "Real Madrid CF", "FC Barcelona");
    let junk = FixtureRecord { payload: json!({ "junk": true }), ..valid.clone() };
    store.overwrite(&[valid.clone(), junk]).await.unwrap();

    let read = store.read().await.unwrap().unwrap();
    assert_eq!(read.fixtures, vec![valid]);
    assert_eq!(read.unreadable, 1);
    assert!(!read.is_clean());
    assert_eq!(store.read_row().await.unwrap().unwrap().payloads.len(), 2);
}
