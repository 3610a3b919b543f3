//! Structured event log.
//!
//! Events are mirrored to `tracing` as they happen, kept in memory per event
//! type for the current run, and flushed as JSON lines into one log file per
//! type and day. Old files are removed by [`EventLog::purge`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::error::{ErrorRecord, ErrorSet, Result};

const LOG_EXTENSION: &str = ".log";
const DATE_SEPARATOR: &str = "__";
const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Error,
    GeneratorEvent,
    ApiEvent,
}

impl EventType {
    pub const ALL: [EventType; 3] = [
        EventType::Error,
        EventType::GeneratorEvent,
        EventType::ApiEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "affseed_error",
            Self::GeneratorEvent => "affseed_generator_event",
            Self::ApiEvent => "affseed_api_event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    fn file_stem(self) -> &'static str {
        match self {
            Self::Error => "affseed-error-log",
            Self::GeneratorEvent => "affseed-generator-event-log",
            Self::ApiEvent => "affseed-api-event-log",
        }
    }

    fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_stem() == stem)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub event_type: EventType,
    pub code: String,
    pub message: String,
    pub source: String,
    pub context: Value,
    pub logged_at: DateTime<Utc>,
}

/// Parsed log file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileInfo {
    pub event_type: EventType,
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Run-scoped event recorder backed by a log directory.
#[derive(Debug)]
pub struct EventLog {
    dir: PathBuf,
    events: Mutex<BTreeMap<EventType, Vec<LogEvent>>>,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            events: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record an event and return it as an error-shaped value.
    ///
    /// The returned set is what failing operations hand back to their caller,
    /// so logging and returning a failure is a single expression.
    pub fn log(
        &self,
        event_type: EventType,
        code: &str,
        message: impl Into<String>,
        source: &str,
        context: Value,
    ) -> ErrorSet {
        let message = message.into();
        match event_type {
            EventType::Error => {
                error!(event_type = %event_type, code, source, context = %context, "{message}")
            }
            _ => info!(event_type = %event_type, code, source, context = %context, "{message}"),
        }

        let mut record = ErrorRecord::new(code, message.clone());
        record.context = context_map(&context);

        let event = LogEvent {
            event_type,
            code: code.to_string(),
            message,
            source: source.to_string(),
            context,
            logged_at: Utc::now(),
        };
        self.lock().entry(event_type).or_default().push(event);

        ErrorSet::from(record)
    }

    /// Events recorded since the last flush or reset.
    pub fn events(&self) -> BTreeMap<EventType, Vec<LogEvent>> {
        self.lock().clone()
    }

    pub fn reset_events(&self) {
        self.lock().clear();
    }

    /// Path of the log file for a type and day. The file may not exist.
    pub fn path(&self, event_type: EventType, date: NaiveDate) -> PathBuf {
        self.dir.join(format!(
            "{}{DATE_SEPARATOR}{}{LOG_EXTENSION}",
            event_type.file_stem(),
            date.format(FILE_DATE_FORMAT)
        ))
    }

    /// Path of the log file for a type and day, creating an empty file if needed.
    pub fn file(&self, event_type: EventType, date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|err| io_failure(&self.dir, err))?;
        let path = self.path(event_type, date);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_failure(&path, err))?;
        Ok(path)
    }

    /// Append pending events to their log files and clear them from memory.
    ///
    /// Events are dropped only once written; on failure the unwritten ones
    /// stay queued for the next flush.
    pub fn flush(&self) -> Result<Vec<PathBuf>> {
        let mut pending = self.lock();
        let mut written = BTreeSet::new();
        let mut failure = None;

        for (event_type, events) in pending.iter_mut() {
            let mut done = 0;
            let result = events.iter().try_for_each(|event| -> Result<()> {
                written.insert(self.append(*event_type, event)?);
                done += 1;
                Ok(())
            });
            events.drain(..done);
            if let Err(err) = result {
                failure = Some(err);
                break;
            }
        }
        pending.retain(|_, events| !events.is_empty());

        match failure {
            Some(err) => Err(err),
            None => Ok(written.into_iter().collect()),
        }
    }

    fn append(&self, event_type: EventType, event: &LogEvent) -> Result<PathBuf> {
        let path = self.file(event_type, event.logged_at.date_naive())?;
        let mut line = serde_json::to_vec(event).map_err(|err| {
            ErrorSet::from(
                ErrorRecord::new("log_encode_failed", err.to_string())
                    .with_context("code", &event.code),
            )
        })?;
        line.push(b'\n');
        OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(&line))
            .map_err(|err| io_failure(&path, err))?;
        Ok(path)
    }

    /// Log files currently on disk, sorted by path.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.log_files()?.into_iter().map(|info| info.path).collect())
    }

    /// Parse a log file name or path into its type and date.
    pub fn parse_file(&self, file: impl AsRef<Path>) -> Result<LogFileInfo> {
        let file = file.as_ref();
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(base) = name.strip_suffix(LOG_EXTENSION) else {
            return Err(ErrorSet::from(
                ErrorRecord::new("log_file_not_a_log", "The provided file is not a log file.")
                    .with_context("file", &name),
            ));
        };

        let malformed = || {
            ErrorSet::from(
                ErrorRecord::new(
                    "log_file_name_malformed",
                    "The log file name does not follow the <type>__<date>.log format.",
                )
                .with_context("file", &name),
            )
        };
        let (stem, date) = base.split_once(DATE_SEPARATOR).ok_or_else(malformed)?;
        let date = NaiveDate::parse_from_str(date, FILE_DATE_FORMAT).map_err(|_| malformed())?;

        let event_type = EventType::from_file_stem(stem).ok_or_else(|| {
            ErrorSet::from(
                ErrorRecord::new("log_file_invalid_type", "The log file type is not recognized.")
                    .with_context("file", &name)
                    .with_context("type", stem),
            )
        })?;

        Ok(LogFileInfo {
            event_type,
            date,
            path: self.path(event_type, date),
        })
    }

    /// Delete every log file of one type.
    pub fn clear(&self, event_type: EventType) -> Result<Vec<PathBuf>> {
        self.remove_where(|info| info.event_type == event_type)
    }

    /// Delete every log file.
    pub fn wipe(&self) -> Result<Vec<PathBuf>> {
        self.remove_where(|_| true)
    }

    /// Delete log files older than `days` days and return their paths.
    pub fn purge(&self, days: i64) -> Result<Vec<PathBuf>> {
        self.purge_at(days, Utc::now().date_naive())
    }

    /// Delete log files dated strictly before `today - days`.
    pub fn purge_at(&self, days: i64, today: NaiveDate) -> Result<Vec<PathBuf>> {
        if days < 0 {
            return Err(ErrorSet::from(
                ErrorRecord::new(
                    "invalid_purge_days",
                    "Logs can only be purged for a non-negative number of days.",
                )
                .with_context("days", days),
            ));
        }

        let cutoff = today
            .checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN);
        let purged = self.remove_where(|info| info.date < cutoff)?;
        info!(event = "logs_purged", days, removed = purged.len());
        Ok(purged)
    }

    fn remove_where(&self, predicate: impl Fn(&LogFileInfo) -> bool) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for info in self.log_files()? {
            if predicate(&info) {
                fs::remove_file(&info.path).map_err(|err| io_failure(&info.path, err))?;
                removed.push(info.path);
            }
        }
        Ok(removed)
    }

    fn log_files(&self) -> Result<Vec<LogFileInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|err| io_failure(&self.dir, err))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_failure(&self.dir, err))?;
            if let Ok(info) = self.parse_file(entry.path()) {
                files.push(info);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<EventType, Vec<LogEvent>>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn context_map(context: &Value) -> Map<String, Value> {
    match context {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other.clone());
            map
        }
    }
}

fn io_failure(path: &Path, err: std::io::Error) -> ErrorSet {
    ErrorSet::from(
        ErrorRecord::new("log_io_failed", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}
