use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use serde_json::json;

use affseed_core::{EventLog, EventType};

fn temp_log_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("affseed_logs_{label}_{}", uuid::Uuid::new_v4()))
}

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

#[test]
fn log_keeps_events_per_type() {
    let log = EventLog::new(temp_log_dir("per_type"));
    log.log(EventType::ApiEvent, "test_event", "Test Event", "tests", json!({"data_test": "data"}));
    log.log(EventType::ApiEvent, "test_event", "Test Event", "tests", json!({"data_test": "data"}));
    log.log(EventType::Error, "test_error", "Test Error", "tests", json!(null));

    let events = log.events();
    assert_eq!(events[&EventType::ApiEvent].len(), 2);
    assert_eq!(events[&EventType::Error].len(), 1);
}

#[test]
fn log_returns_the_record_as_an_error_set() {
    let log = EventLog::new(temp_log_dir("returns"));
    let record = log.log(
        EventType::GeneratorEvent,
        "users_generated",
        "The user generator created 3 users.",
        "",
        json!({"users": [1, 2, 3]}),
    );

    assert_eq!(record.codes(), vec!["users_generated"]);
    assert_eq!(record.records()[0].context["users"], json!([1, 2, 3]));
}

#[test]
fn reset_events_clears_request_events() {
    let log = EventLog::new(temp_log_dir("reset"));
    log.log(EventType::ApiEvent, "test_event", "Test Event", "", json!(null));
    log.log(EventType::Error, "test_error", "Test Event", "", json!(null));

    log.reset_events();
    assert!(log.events().values().all(Vec::is_empty));
}

#[test]
fn flush_writes_events_to_log_files() {
    let log = EventLog::new(temp_log_dir("flush"));
    log.log(EventType::ApiEvent, "test_event", "Test Event", "", json!(null));
    log.log(EventType::Error, "test_error", "Test Event", "", json!(null));

    let written = log.flush().expect("flush events");
    let files = log.files().expect("list files");
    assert_eq!(written, files);
    assert_eq!(files.len(), 2);
    assert!(log.events().is_empty());

    let content = std::fs::read_to_string(&files[0]).expect("read log file");
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn failed_flush_keeps_events_queued() {
    let dir = temp_log_dir("blocked");
    std::fs::write(&dir, "not a directory").expect("create blocking file");
    let log = EventLog::new(&dir);
    log.log(EventType::ApiEvent, "first_event", "First", "", json!(null));
    log.log(EventType::ApiEvent, "second_event", "Second", "", json!(null));

    let err = log.flush().unwrap_err();
    assert!(err.has("log_io_failed"));
    assert_eq!(log.events()[&EventType::ApiEvent].len(), 2);

    std::fs::remove_file(&dir).expect("remove blocking file");
    let written = log.flush().expect("flush after recovery");
    assert_eq!(written.len(), 1);
    assert!(log.events().is_empty());
    let content = std::fs::read_to_string(&written[0]).expect("read log file");
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn file_creates_the_log_file_at_its_path() {
    let log = EventLog::new(temp_log_dir("file"));
    let date = day("2024-02-10");
    let path = log.file(EventType::ApiEvent, date).expect("create file");

    assert_eq!(path, log.path(EventType::ApiEvent, date));
    assert!(path.exists());
}

#[test]
fn clear_and_wipe_remove_files() {
    let log = EventLog::new(temp_log_dir("clear"));
    let date = day("2024-02-10");
    log.file(EventType::ApiEvent, date).expect("create api file");
    log.file(EventType::Error, date).expect("create error file");

    let cleared = log.clear(EventType::ApiEvent).expect("clear api files");
    assert_eq!(cleared, vec![log.path(EventType::ApiEvent, date)]);
    assert_eq!(log.files().expect("list"), vec![log.path(EventType::Error, date)]);

    log.wipe().expect("wipe");
    assert!(log.files().expect("list").is_empty());
}

#[test]
fn parse_file_accepts_names_and_paths() {
    let log = EventLog::new(temp_log_dir("parse"));
    let date = day("2024-05-01");
    let path = log.path(EventType::ApiEvent, date);

    let from_path = log.parse_file(&path).expect("parse path");
    let from_name = log
        .parse_file("affseed-api-event-log__2024-05-01.log")
        .expect("parse name");

    assert_eq!(from_path, from_name);
    assert_eq!(from_name.event_type, EventType::ApiEvent);
    assert_eq!(from_name.date, date);
    assert_eq!(from_name.path, path);
}

#[test]
fn parse_file_rejects_invalid_names() {
    let log = EventLog::new(temp_log_dir("parse_invalid"));

    let invalid_type = log.parse_file("invalid-type__2024-05-01.log").unwrap_err();
    assert!(invalid_type.has("log_file_invalid_type"));

    let not_a_log = log.parse_file("affseed-api-event-log__2024-05-01").unwrap_err();
    assert!(not_a_log.has("log_file_not_a_log"));

    let malformed = log.parse_file("invalid-type_and_such.log").unwrap_err();
    assert!(malformed.has("log_file_name_malformed"));
}

#[test]
fn purge_removes_only_files_older_than_the_cutoff() {
    let log = EventLog::new(temp_log_dir("purge"));
    let today = day("2024-06-15");
    let two_days = today.checked_sub_days(Days::new(2)).expect("date");
    let three_days = today.checked_sub_days(Days::new(3)).expect("date");
    let yesterday = today.checked_sub_days(Days::new(1)).expect("date");

    let mut expected = vec![
        log.file(EventType::Error, two_days).expect("file"),
        log.file(EventType::Error, three_days).expect("file"),
    ];
    log.file(EventType::Error, yesterday).expect("file");

    let mut purged = log.purge_at(1, today).expect("purge");
    expected.sort();
    purged.sort();
    assert_eq!(purged, expected);
    assert_eq!(log.files().expect("list"), vec![log.path(EventType::Error, yesterday)]);
}

#[test]
fn purge_rejects_negative_days() {
    let log = EventLog::new(temp_log_dir("purge_negative"));
    let result = log.purge(-1);
    assert!(matches!(result, Err(errors) if errors.has("invalid_purge_days")));
}
