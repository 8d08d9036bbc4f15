use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fake::faker::lorem::en::Word;
use fake::Fake;
use pretty_assertions::assert_eq;
use planner_core::models::{RepeatCount, Schedule, Timeslot};
use planner_core::repository::ScheduleRepository;
use planner_store::models::{StoredSchedule, StoredTimeslot};
use planner_store::repositories::schedule::{generate_file_name, load_all, load_file};
use planner_store::JsonScheduleStore;
use serde_test::{assert_ser_tokens, Token};
use tempfile::TempDir;

fn monday_nine() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn setup() -> (TempDir, JsonScheduleStore) {
    let dir = TempDir::new().unwrap();
    let store = JsonScheduleStore::open(dir.path()).unwrap();
    (dir, store)
}

fn write_raw(dir: &Path, file_name: &str, json: &str) {
    fs::write(dir.join(file_name), json).unwrap();
}

fn stored_timeslot_json(name: &str, repeat_count: i32) -> String {
    format!(
        r#"{{
            "name": {},
            "start_time": "2026-03-02T09:00:00Z",
            "end_time": "2026-03-02T09:15:00Z",
            "repeat": true,
            "repeat_interval_seconds": 604800,
            "repeat_count": {},
            "activated": false
        }}"#,
        name, repeat_count
    )
}

#[test_log::test]
fn test_save_and_load_round_trip() {
    let (_dir, store) = setup();

    let mut schedule = Schedule::new("Work", "Work.json");
    schedule.set_show(false);
    schedule.add_timeslot(
        Timeslot::with_end("Standup", monday_nine(), monday_nine() + Duration::minutes(15))
            .repeating(Duration::weeks(1), RepeatCount::Times(4)),
    );
    schedule.add_timeslot(Timeslot::new("Review", monday_nine() + Duration::days(2)));
    store.save(&schedule).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 1);

    let restored = loaded.values().next().unwrap();
    assert_eq!(restored.name(), "Work");
    assert_eq!(restored.file_name(), "Work.json");
    assert!(!restored.show());
    assert_eq!(
        StoredSchedule::from(restored),
        StoredSchedule::from(&schedule)
    );
    assert!(restored.timeslots().iter().all(|t| t.schedule_id() == Some(restored.id())));
}

#[test_log::test]
fn test_load_skips_bad_files_without_failing_batch() {
    let (dir, store) = setup();
    store.save(&Schedule::new("Good", "Good.json")).unwrap();

    write_raw(dir.path(), "garbage.json", "not json at all");
    write_raw(
        dir.path(),
        "nolist.json",
        r#"{"version": 1, "name": "No list", "file_name": "nolist.json", "show": true, "timeslots": null}"#,
    );
    write_raw(
        dir.path(),
        "unnamed.json",
        &format!(
            r#"{{"version": 1, "name": "Unnamed", "file_name": "unnamed.json", "show": true, "timeslots": [{}]}}"#,
            stored_timeslot_json("null", 2)
        ),
    );
    write_raw(
        dir.path(),
        "badcount.json",
        &format!(
            r#"{{"version": 1, "name": "Bad count", "file_name": "badcount.json", "show": true, "timeslots": [{}]}}"#,
            stored_timeslot_json("\"Standup\"", -2)
        ),
    );
    write_raw(
        dir.path(),
        "future.json",
        r#"{"version": 99, "name": "Future", "file_name": "future.json", "show": true, "timeslots": []}"#,
    );
    write_raw(dir.path(), "notes.txt", "ignored");

    let loaded = store.load_all().unwrap();

    let names: Vec<_> = loaded.values().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["Good".to_string()]);
}

#[test]
fn test_load_file_reports_reason() {
    let (dir, _store) = setup();
    write_raw(
        dir.path(),
        "future.json",
        r#"{"version": 2, "name": "Future", "file_name": "future.json", "show": true, "timeslots": []}"#,
    );

    let err = load_file(&dir.path().join("future.json"), Utc::now()).unwrap_err();
    assert!(err.to_string().contains("Unsupported schedule schema version 2"));
}

#[test]
fn test_missing_version_defaults_to_current() {
    let (dir, _store) = setup();
    write_raw(
        dir.path(),
        "Old.json",
        &format!(
            r#"{{"name": "Old", "file_name": "Old.json", "show": true, "timeslots": [{}]}}"#,
            stored_timeslot_json("\"Standup\"", -1)
        ),
    );

    let schedule = load_file(&dir.path().join("Old.json"), monday_nine()).unwrap();

    assert_eq!(schedule.timeslots().len(), 1);
    assert_eq!(schedule.timeslots()[0].repeat_count(), RepeatCount::Forever);
    assert_eq!(schedule.timeslots()[0].repeat_interval(), Duration::weeks(1));
}

#[test]
fn test_file_on_disk_wins_over_recorded_name() {
    let (dir, store) = setup();
    store.save(&Schedule::new("Work", "Work.json")).unwrap();
    fs::rename(dir.path().join("Work.json"), dir.path().join("Moved.json")).unwrap();

    let loaded = load_all(dir.path(), Utc::now()).unwrap();

    let schedule = loaded.values().next().unwrap();
    assert_eq!(schedule.name(), "Work");
    assert_eq!(schedule.file_name(), "Moved.json");
}

#[test]
fn test_generate_file_name_avoids_collisions() {
    let (dir, store) = setup();

    assert_eq!(store.generate_file_name("Work").unwrap(), "Work.json");

    write_raw(dir.path(), "Work.json", "{}");
    assert_eq!(store.generate_file_name("Work").unwrap(), "Work-0.json");

    write_raw(dir.path(), "Work-0.json", "{}");
    assert_eq!(generate_file_name(dir.path(), "Work"), "Work-1.json");

    assert_eq!(generate_file_name(dir.path(), "a/b"), "a_b.json");
}

#[test]
fn test_generated_names_are_available() {
    let (_dir, store) = setup();

    for _ in 0..5 {
        let name: String = Word().fake();
        let file_name = store.generate_file_name(&name).unwrap();

        assert!(store.is_file_name_available(&file_name));
        store.save(&Schedule::new(name, file_name.clone())).unwrap();
        assert!(!store.is_file_name_available(&file_name));
    }

    assert_eq!(store.load_all().unwrap().len(), 5);
}

#[test]
fn test_delete_removes_file() {
    let (dir, store) = setup();
    let schedule = Schedule::new("Work", "Work.json");
    store.save(&schedule).unwrap();
    assert!(dir.path().join("Work.json").exists());

    store.delete(&schedule).unwrap();
    assert!(!dir.path().join("Work.json").exists());

    // deleting again is not an error
    store.delete(&schedule).unwrap();
}

#[test]
fn test_open_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("data").join("schedules");

    let store = JsonScheduleStore::open(&nested).unwrap();

    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn test_stored_timeslot_serialization() {
    let stored = StoredTimeslot::from(
        &Timeslot::with_end("Standup", monday_nine(), monday_nine() + Duration::minutes(15))
            .repeating(Duration::days(1), RepeatCount::Forever),
    );

    assert_ser_tokens(
        &stored,
        &[
            Token::Struct {
                name: "StoredTimeslot",
                len: 7,
            },
            Token::Str("name"),
            Token::Some,
            Token::Str("Standup"),
            Token::Str("start_time"),
            Token::Str("2026-03-02T09:00:00Z"),
            Token::Str("end_time"),
            Token::Str("2026-03-02T09:15:00Z"),
            Token::Str("repeat"),
            Token::Bool(true),
            Token::Str("repeat_interval_seconds"),
            Token::I64(86400),
            Token::Str("repeat_count"),
            Token::I32(-1),
            Token::Str("activated"),
            Token::Bool(false),
            Token::StructEnd,
        ],
    );
}
