//! Structured logging for the analytics client.
//!
//! Every record is one JSON line on stderr (and optionally appended to
//! `LOG_FILE`), so a caller piping the binary's stdout still gets clean JSON.
//!
//! Records carry:
//! 1. a level (`LOG_LEVEL`, default info)
//! 2. a domain used for filtering (`LOG_DOMAINS`, comma-separated or "all")
//! 3. a process-wide sequence number and an RFC3339 timestamp
//! 4. a `data` object with event-specific fields, secrets redacted

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Api,       // HTTP requests and responses
    Cache,     // Hits, misses, evictions
    Normalize, // Payload shape problems
    Insight,   // Generated commentary
    Report,    // Multi-endpoint aggregation
    System,    // Startup, configuration
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Api => "api",
            Domain::Cache => "cache",
            Domain::Normalize => "normalize",
            Domain::Insight => "insight",
            Domain::Report => "report",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sink
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static SINK: OnceLock<Sink> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct Sink {
    run_id: String,
    file: Option<Mutex<File>>,
}

fn sink() -> &'static Sink {
    SINK.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let file = std::env::var("LOG_FILE").ok().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("[log] failed to open {}: {}", path, err))
                .ok()
        });
        Sink {
            run_id,
            file: file.map(Mutex::new),
        }
    })
}

const REDACTED_KEYS: [&str; 5] = ["authorization", "Authorization", "token", "api_token", "bearer"];

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in REDACTED_KEYS {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Build the JSON record for an entry without emitting it.
pub fn render(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> Value {
    let mut data = sanitize_fields(fields);
    let msg = data.remove("msg").unwrap_or(Value::String(String::new()));

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(sink().run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }

    let line = render(level, domain, event, fields).to_string();
    if let Some(file) = &sink().file {
        if let Ok(mut f) = file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    }
    eprintln!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_request(method: &str, path: &str, status: u16, elapsed_ms: f64) {
    log(
        Level::Debug,
        Domain::Api,
        "request",
        obj(&[
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("status", json!(status)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_request_failed(method: &str, path: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Api,
        "request_failed",
        obj(&[
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("error", v_str(error)),
        ]),
    );
}

pub fn log_cache(event: &str, key: &str) {
    log(Level::Trace, Domain::Cache, event, obj(&[("key", v_str(key))]));
}

pub fn log_section_defaulted(section: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Report,
        "section_defaulted",
        obj(&[
            ("section", v_str(section)),
            ("error", v_str(error)),
            ("msg", v_str("endpoint failed, section rendered empty")),
        ]),
    );
}

pub fn log_insight(kind: &str, severity: &str, value: f64) {
    log(
        Level::Debug,
        Domain::Insight,
        "insight",
        obj(&[
            ("kind", v_str(kind)),
            ("severity", v_str(severity)),
            ("value", v_num(value)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("WARNING"), Some(Level::Warn));
        assert_eq!(Level::parse(" debug "), Some(Level::Debug));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_render_redacts_secrets() {
        let record = render(
            Level::Info,
            Domain::Api,
            "request",
            obj(&[("authorization", v_str("Bearer abc")), ("path", v_str("/x"))]),
        );
        assert_eq!(record["data"]["authorization"], "[REDACTED]");
        assert_eq!(record["data"]["path"], "/x");
        assert_eq!(record["lvl"], "INFO");
        assert_eq!(record["component"], "api");
    }

    #[test]
    fn test_render_lifts_msg() {
        let record = render(
            Level::Warn,
            Domain::Report,
            "section_defaulted",
            obj(&[("msg", v_str("hello")), ("section", v_str("countries"))]),
        );
        assert_eq!(record["msg"], "hello");
        assert!(record["data"].get("msg").is_none());
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
