mod common;

use aoe2stats::config::VersionTable;
use aoe2stats::database::{MatchStore, MatchTable};
use aoe2stats::domain::MatchPage;
use aoe2stats::services::{IngestWindow, IngestionService};

use common::{QueuedSource, WorldSource, blob, settings, stored_rows};

const START: i64 = 1_633_046_400;

#[tokio::test]
async fn full_page_then_short_page_makes_two_requests() {
    let versions = VersionTable::default();
    let store = MatchStore::in_memory().unwrap();
    let first = MatchPage::from_blobs((0..1000).map(|i| blob(i, START + i)).collect());
    let second = MatchPage::from_blobs((1000..1400).map(|i| blob(i, START + i)).collect());
    let source = QueuedSource::new(vec![first, second]);
    let mut service = IngestionService::new(source, store.clone(), &versions, settings(1000));

    let summary = service
        .run(IngestWindow {
            start: START,
            end: None,
            now: START + 3600,
        })
        .await
        .unwrap();

    assert_eq!(service.source().requests, vec![START, START + 999]);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.ranked.matches, 1400);
    assert_eq!(store.count_rows(MatchTable::Ranked).unwrap(), 2800);
    assert_eq!(store.max_started(MatchTable::Ranked).unwrap(), Some(START + 1399));
}

#[tokio::test]
async fn overlapping_pages_do_not_duplicate_rows() {
    let versions = VersionTable::default();
    let store = MatchStore::in_memory().unwrap();
    // Every page repeats the last match of the previous one.
    let world: Vec<(i64, i64)> = (0..25).map(|i| (i, START + i * 60)).collect();
    let mut service = IngestionService::new(WorldSource::new(world), store.clone(), &versions, settings(10));

    let summary = service
        .run(IngestWindow {
            start: START,
            end: None,
            now: START + 3600,
        })
        .await
        .unwrap();

    assert_eq!(store.count_rows(MatchTable::Ranked).unwrap(), 50);
    assert_eq!(summary.ranked.matches, 25);
    assert!(summary.accepted > 25);
}

#[tokio::test]
async fn explicit_end_stops_scan_early() {
    let versions = VersionTable::default();
    let store = MatchStore::in_memory().unwrap();
    let world: Vec<(i64, i64)> = (0..100).map(|i| (i, START + i * 60)).collect();
    let mut service = IngestionService::new(WorldSource::new(world), store.clone(), &versions, settings(10));

    service
        .run(IngestWindow {
            start: START,
            end: Some(START + 1000),
            now: START + 100_000,
        })
        .await
        .unwrap();

    // Pages reach 540s, 1080s; the second one passes the end.
    assert_eq!(service.source().requests, vec![START, START + 540]);
    assert_eq!(store.max_started(MatchTable::Ranked).unwrap(), Some(START + 1080));
}

#[tokio::test]
async fn downtime_is_crossed_in_gap_sized_steps() {
    let versions = VersionTable::default();
    let store = MatchStore::in_memory().unwrap();
    let mut world: Vec<(i64, i64)> = (0..3).map(|i| (i, START + i * 60)).collect();
    // One hour of silence, then more matches.
    world.extend((3..6).map(|i| (i, START + 3600 + i * 60)));
    let mut service = IngestionService::new(WorldSource::new(world), store.clone(), &versions, settings(3));

    let summary = service
        .run(IngestWindow {
            start: START,
            end: None,
            now: START + 7200,
        })
        .await
        .unwrap();

    let requests = &service.source().requests;
    assert_eq!(requests[0], START);
    assert_eq!(requests[1], START + 120);
    // The gap after START + 120 is re-scanned and then stepped over by 1200s.
    assert!(requests.windows(2).all(|w| w[1] > w[0]));
    assert!(summary.forced >= 1);
    assert_eq!(store.count_rows(MatchTable::Ranked).unwrap(), 12);
}

#[tokio::test]
async fn catch_up_walks_back_then_resumes_forward() {
    let versions = VersionTable::default();
    let store = MatchStore::in_memory().unwrap();

    let origin = START;
    let world: Vec<(i64, i64)> = (0..600).map(|i| (i, origin - 36_000 + i * 120)).collect();
    // Everything before the origin is already stored.
    for (id, started) in world.iter().filter(|(_, started)| *started < origin) {
        store.insert_many(MatchTable::Ranked, &stored_rows(*id, *started)).unwrap();
    }
    let already_stored = store.count_rows(MatchTable::Ranked).unwrap();

    let mut service = IngestionService::new(WorldSource::new(world.clone()), store.clone(), &versions, settings(50));

    service
        .run(IngestWindow {
            start: origin,
            end: None,
            now: origin + 40_000,
        })
        .await
        .unwrap();

    let requests = &service.source().requests;
    assert_eq!(
        requests[..4],
        [origin, origin - 14_400, origin - 28_800, origin + 1],
        "one new page, two quiet pages, then forward from just past the origin"
    );
    assert!(requests[4..].windows(2).all(|w| w[1] > w[0]));
    assert_eq!(store.count_rows(MatchTable::Ranked).unwrap(), 600 * 2);
    assert!(already_stored < 600 * 2);
}
