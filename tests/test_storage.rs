use std::fs;

use chrono::{TimeZone, Utc};
use letter_rain::config::{load_settings, save_settings, LetterColor, Paths, Settings};
use letter_rain::entities::GameMode;
use letter_rain::score::ScoreTracker;
use letter_rain::snapshot::{SaveRecord, SessionSnapshot};
use letter_rain::storage::*;

use tempfile::tempdir;

fn snapshot_with_score(points: u32) -> SessionSnapshot {
    let mut score = ScoreTracker::new();
    for _ in 0..points {
        score.add_hit();
    }
    let mut snap: SessionSnapshot = serde_json::from_str("{}").unwrap();
    snap.score_j1 = score;
    snap.speed = 2.0;
    snap.elapsed = 10.0 + points as f64;
    snap.fault_limit = Some(10);
    snap
}

// ── Save slots ────────────────────────────────────────────────────────────────

#[test]
fn missing_save_file_is_empty() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    assert!(store.load().is_empty());
}

#[test]
fn save_then_load_round_trip() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    let snap = snapshot_with_score(3);
    let ts = store.save(GameMode::SinglePlayer, &snap, None).unwrap();

    let records = store.load();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp, ts);
    assert_eq!(records[0].mode, GameMode::SinglePlayer);
    assert_eq!(records[0].state, snap);
}

#[test]
fn keeps_five_most_recent_first() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    let mut stamps = Vec::new();
    for i in 0..7 {
        stamps.push(store.save(GameMode::SinglePlayer, &snapshot_with_score(i), None).unwrap());
    }
    let records = store.load();
    assert_eq!(records.len(), MAX_SAVE_SLOTS);
    for pair in records.windows(2) {
        assert!(pair[0].timestamp > pair[1].timestamp);
    }
    assert_eq!(records[0].timestamp, stamps[6]);
    assert_eq!(records[0].state.score_j1.score(), 6);
    assert_eq!(records[4].state.score_j1.score(), 2);
}

#[test]
fn resave_updates_slot_in_place() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    let first = store.save(GameMode::SinglePlayer, &snapshot_with_score(1), None).unwrap();
    store.save(GameMode::Versus, &snapshot_with_score(2), None).unwrap();

    let updated = store
        .save(GameMode::SinglePlayer, &snapshot_with_score(5), Some(first))
        .unwrap();
    let records = store.load();
    assert_eq!(records.len(), 2);
    assert!(updated > first);
    assert_eq!(records[0].timestamp, updated);
    assert_eq!(records[0].state.score_j1.score(), 5);
    assert!(records.iter().all(|r| r.timestamp != first));
}

#[test]
fn unknown_replace_stamp_appends() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    store.save(GameMode::SinglePlayer, &snapshot_with_score(1), None).unwrap();
    let stale = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
    store
        .save(GameMode::SinglePlayer, &snapshot_with_score(2), Some(stale))
        .unwrap();
    assert_eq!(store.load().len(), 2);
}

#[test]
fn delete_by_timestamp() {
    let dir = tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("saves.json"));
    let a = store.save(GameMode::SinglePlayer, &snapshot_with_score(1), None).unwrap();
    let b = store.save(GameMode::Versus, &snapshot_with_score(2), None).unwrap();
    assert!(store.delete(a).unwrap());
    assert!(!store.delete(a).unwrap());
    let records = store.load();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp, b);
}

#[test]
fn corrupt_save_file_is_removed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saves.json");
    fs::write(&path, "{ not json").unwrap();
    let store = SaveStore::new(&path);
    assert!(store.load().is_empty());
    assert!(!path.exists());
    // And saving afterwards works from scratch.
    store.save(GameMode::SinglePlayer, &snapshot_with_score(1), None).unwrap();
    assert_eq!(store.load().len(), 1);
}

#[test]
fn bad_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saves.json");
    fs::write(
        &path,
        r#"[
            {"timestamp": "2024-05-01T10:00:00.250000", "mode": "arcane",
             "state": {"velocidad": 2.0, "tiempo_transcurrido": 3.0, "fallos_limit": 5,
                       "score_manager_j1": {"score": 4, "aciertos": 4}}},
            {"mode": "arcane"},
            42
        ]"#,
    )
    .unwrap();
    let records = SaveStore::new(&path).load();
    assert_eq!(records.len(), 1);
    let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        + chrono::Duration::milliseconds(250);
    assert_eq!(records[0].timestamp, expected);
    assert_eq!(records[0].state.score_j1.score(), 4);
}

#[test]
fn record_wire_format() {
    let record = SaveRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        mode: GameMode::Versus,
        state: snapshot_with_score(1),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["mode"], "versus");
    assert_eq!(json["state"]["velocidad"], 2.0);
    assert_eq!(json["state"]["fallos_limit"], 10);
    assert_eq!(json["state"]["score_manager_j1"]["aciertos"], 1);
    assert!(json["state"].get("score_manager_j2").is_none());
    assert!(json["timestamp"].as_str().unwrap().starts_with("2024-05-01T10:00:00"));
}

// ── High scores ───────────────────────────────────────────────────────────────

#[test]
fn high_score_table_caps_and_sorts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("highscores.json");
    let mut table = HighScoreTable::load(&path);
    assert!(table.entries().is_empty());

    for (name, score) in [("aaa", 10), ("BBB", 50), ("CCC", 30), ("DDD", 20), ("EEE", 40)] {
        assert!(table.qualifies(score));
        table.insert(name, score);
    }
    assert!(!table.qualifies(10)); // ties with the lowest do not displace it
    assert!(table.qualifies(11));
    assert_eq!(table.insert("FFF", 35), Some(2));
    table.save(&path).unwrap();

    let loaded = HighScoreTable::load(&path);
    let scores: Vec<u32> = loaded.entries().iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![50, 40, 35, 30, 20]);
    assert_eq!(loaded.entries()[0].name, "BBB");

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"nombre\""));
}

#[test]
fn zero_never_qualifies() {
    let table = HighScoreTable::default();
    assert!(!table.qualifies(0));
    assert!(table.qualifies(1));
}

#[test]
fn earlier_entry_keeps_tie() {
    let mut table = HighScoreTable::default();
    table.insert("OLD", 20);
    assert_eq!(table.insert("NEW", 20), Some(1));
    assert_eq!(table.entries()[0].name, "OLD");
}

#[test]
fn corrupt_high_scores_read_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("highscores.json");
    fs::write(&path, "[{\"nombre\": 3}]").unwrap();
    assert!(HighScoreTable::load(&path).entries().is_empty());
}

#[test]
fn initials_are_validated() {
    assert_eq!(normalize_initials("abc").as_deref(), Some("ABC"));
    assert_eq!(normalize_initials(" z ").as_deref(), Some("Z"));
    assert_eq!(normalize_initials(""), None);
    assert_eq!(normalize_initials("ABCD"), None);
    assert_eq!(normalize_initials("A1"), None);
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[test]
fn settings_round_trip_and_fallback() {
    let dir = tempdir().unwrap();
    let paths = Paths::in_dir(dir.path());
    assert_eq!(load_settings(&paths.settings), Settings::default());

    let settings = Settings {
        letter_color: LetterColor::Magenta,
        fault_limit: 15,
        ..Settings::default()
    };
    save_settings(&paths.settings, &settings).unwrap();
    assert_eq!(load_settings(&paths.settings), settings);

    fs::write(&paths.settings, "nonsense").unwrap();
    assert_eq!(load_settings(&paths.settings), Settings::default());
}
