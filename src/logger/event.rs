//! Request event log
//!
//! A best-effort record of notable request outcomes (storage failures in
//! particular). Handlers receive it as a capability; nothing it does can
//! fail a request.

use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use super::writer::open_log_file;
use crate::config::LoggingConfig;

/// Sink for per-request events
pub trait EventLog: Send + Sync {
    fn info(&self, method: &str, url: &str, message: &str);
    fn error(&self, method: &str, url: &str, message: &str);
}

/// Discards every event
pub struct NoopEventLog;

impl EventLog for NoopEventLog {
    fn info(&self, _method: &str, _url: &str, _message: &str) {}
    fn error(&self, _method: &str, _url: &str, _message: &str) {}
}

/// Appends `<iso-time> <method> <url> <message>` lines to an info and an
/// error file. A file that cannot be opened simply loses its events.
pub struct FileEventLog {
    info: Option<Mutex<File>>,
    error: Option<Mutex<File>>,
}

impl FileEventLog {
    pub fn new(info_path: &str, error_path: &str) -> Self {
        Self {
            info: open_log_file(info_path).ok().map(Mutex::new),
            error: open_log_file(error_path).ok().map(Mutex::new),
        }
    }

    fn append(target: Option<&Mutex<File>>, method: &str, url: &str, message: &str) {
        let Some(file) = target else {
            return;
        };
        let line = format_event(&chrono::Utc::now(), method, url, message);
        let mut f = file.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(f, "{line}");
    }
}

impl EventLog for FileEventLog {
    fn info(&self, method: &str, url: &str, message: &str) {
        Self::append(self.info.as_ref(), method, url, message);
    }

    fn error(&self, method: &str, url: &str, message: &str) {
        Self::append(self.error.as_ref(), method, url, message);
    }
}

/// Pick the event log described by the logging configuration
pub fn from_config(config: &LoggingConfig) -> Arc<dyn EventLog> {
    if config.event_log {
        Arc::new(FileEventLog::new(
            &config.event_info_file,
            &config.event_error_file,
        ))
    } else {
        Arc::new(NoopEventLog)
    }
}

fn format_event(
    time: &chrono::DateTime<chrono::Utc>,
    method: &str,
    url: &str,
    message: &str,
) -> String {
    format!(
        "{} {method} {url} {message}",
        time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    )
}
