use chrono::TimeZone;
use chrono::Utc;
use pretty_assertions::assert_eq;
use rewards_history::factory::Backend;
use rewards_history::factory::open_store;
use rewards_history::types::*;

fn backends() -> Vec<Backend> {
    #[cfg(feature = "sqlite")]
    {
        vec![Backend::Jsonl, Backend::Sqlite]
    }
    #[cfg(not(feature = "sqlite"))]
    {
        vec![Backend::Jsonl]
    }
}

fn sample_event(account: &str, variant: &str, success: bool, minute: u32) -> SearchEvent {
    SearchEvent {
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 8, minute, 0).unwrap(),
        account: account.to_string(),
        category: "both".to_string(),
        variant: variant.to_string(),
        success,
        points: Some(u64::from(minute) * 5),
    }
}

fn sample_run(account: &str, outcome: RunOutcome, summary: &str) -> RunEntry {
    RunEntry {
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        account: account.to_string(),
        category: "both".to_string(),
        outcome,
        summary: summary.to_string(),
        searches: 2,
        initial_points: Some(100),
        final_points: Some(110),
    }
}

#[test]
fn store_append_load_latest_import() {
    for be in backends() {
        let logs = tempfile::tempdir().unwrap();
        let store = open_store(logs.path(), Some(be)).unwrap();

        // empty
        assert!(store.load("a").unwrap().is_empty());
        assert!(store.latest_run_summary("a").unwrap().is_none());

        // append in completion order
        store
            .append_search(&sample_event("a", "desktop", true, 1))
            .unwrap();
        store
            .append_search(&sample_event("b", "desktop", true, 2))
            .unwrap();
        store
            .append_search(&sample_event("a", "mobile", false, 3))
            .unwrap();
        store
            .append_run(&sample_run("a", RunOutcome::Aborted, "mobile failed"))
            .unwrap();
        store
            .append_run(&sample_run("a", RunOutcome::Done, "all good"))
            .unwrap();

        // load is scoped and ordered
        let a = store.load("a").unwrap();
        assert_eq!(
            a.searches,
            vec![
                sample_event("a", "desktop", true, 1),
                sample_event("a", "mobile", false, 3)
            ]
        );
        assert_eq!(a.runs.len(), 2);
        assert_eq!(store.load("b").unwrap().searches.len(), 1);

        // latest
        let latest = store.latest_run_summary("a").unwrap().unwrap();
        assert_eq!(latest.summary, "all good");
        assert_eq!(latest.outcome, RunOutcome::Done);

        // import into fresh store
        let logs2 = tempfile::tempdir().unwrap();
        let store2 = open_store(logs2.path(), Some(be)).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(store2.import(&all).unwrap(), 5);
        assert_eq!(store2.load_all().unwrap(), all);
    }
}

#[test]
fn reopened_store_sees_committed_records() {
    for be in backends() {
        let logs = tempfile::tempdir().unwrap();
        {
            let store = open_store(logs.path(), Some(be)).unwrap();
            store
                .append_search(&sample_event("a", "desktop", true, 1))
                .unwrap();
        }
        let store = open_store(logs.path(), Some(be)).unwrap();
        assert_eq!(store.load("a").unwrap().searches.len(), 1);
    }
}

#[cfg(feature = "sqlite")]
#[test]
fn migrate_copies_jsonl_history_into_sqlite() {
    use rewards_history::migrate::migrate_jsonl_to_sqlite;
    use rewards_history::store::HistoryStore;
    use rewards_history::store::sqlite::SqliteHistoryStore;

    let logs = tempfile::tempdir().unwrap();
    let jsonl = open_store(logs.path(), Some(Backend::Jsonl)).unwrap();
    jsonl
        .append_search(&sample_event("a", "desktop", true, 1))
        .unwrap();
    jsonl
        .append_run(&sample_run("a", RunOutcome::Done, "ok"))
        .unwrap();

    let db = logs.path().join("history.db");
    assert_eq!(migrate_jsonl_to_sqlite(logs.path(), &db).unwrap(), 2);
    let sqlite = SqliteHistoryStore::new(&db);
    assert_eq!(sqlite.load("a").unwrap(), jsonl.load("a").unwrap());
}

#[cfg(feature = "sqlite")]
#[test]
fn migrating_twice_does_not_duplicate_searches() {
    use rewards_history::migrate::migrate_jsonl_to_sqlite;
    use rewards_history::store::HistoryStore;
    use rewards_history::store::sqlite::SqliteHistoryStore;

    let logs = tempfile::tempdir().unwrap();
    let jsonl = open_store(logs.path(), Some(Backend::Jsonl)).unwrap();
    for minute in 0..15 {
        jsonl
            .append_search(&sample_event("a", "desktop", true, minute))
            .unwrap();
    }
    jsonl
        .append_run(&sample_run("a", RunOutcome::Done, "ok"))
        .unwrap();

    let db = logs.path().join("history.db");
    assert_eq!(migrate_jsonl_to_sqlite(logs.path(), &db).unwrap(), 16);
    assert_eq!(migrate_jsonl_to_sqlite(logs.path(), &db).unwrap(), 0);

    let sqlite = SqliteHistoryStore::new(&db);
    let loaded = sqlite.load("a").unwrap();
    assert_eq!(loaded.searches.iter().filter(|e| e.success).count(), 15);
    assert_eq!(loaded.runs.len(), 1);
    assert_eq!(loaded, jsonl.load("a").unwrap());
}

#[test]
fn importing_the_same_history_twice_writes_nothing_new() {
    for be in backends() {
        let logs = tempfile::tempdir().unwrap();
        let store = open_store(logs.path(), Some(be)).unwrap();
        let history = History {
            runs: vec![sample_run("a", RunOutcome::Done, "ok")],
            searches: vec![
                sample_event("a", "desktop", true, 1),
                sample_event("a", "mobile", false, 2),
            ],
        };
        assert_eq!(store.import(&history).unwrap(), 3);
        assert_eq!(store.import(&history).unwrap(), 0);
        assert_eq!(store.load("a").unwrap(), history);
    }
}
