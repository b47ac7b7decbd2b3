// crates/edge-contract-harness/src/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured JSON-line events for invocations and checks.
// Purpose: Record every tool call, retry, and contract outcome.
// Dependencies: edge-contract-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every invocation, retry, and check outcome is emitted as one
//! [`HarnessEvent`] through an [`EventSink`]. Sinks serialize events as JSON
//! lines; routing is chosen from `EDGE_CONTRACT_LOG` or the `[logging]`
//! config section. Recording never fails the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use edge_contract_config::LogSinkKind;
use edge_contract_config::LogTarget;
use edge_contract_config::LoggingConfig;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome label attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Operation started.
    Started,
    /// Operation succeeded.
    Ok,
    /// Operation failed.
    Failed,
    /// Operation is being retried.
    Retry,
}

/// Harness event payload.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Emitting component (`invoker`, `tofu`, `checks`, ...).
    pub component: &'static str,
    /// Outcome label.
    pub outcome: EventOutcome,
    /// Event-specific fields.
    pub fields: BTreeMap<String, Value>,
}

impl HarnessEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str, component: &'static str, outcome: EventOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            component,
            outcome,
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Returns a field value.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for harness events.
pub trait EventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// Append-only handle.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens (or creates) the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut guard) = self.file.lock()
        {
            let _ = writeln!(guard, "{payload}");
        }
    }
}

/// Sink that discards events.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns recorded events with the given identifier.
    #[must_use]
    pub fn named(&self, event: &str) -> Vec<HarnessEvent> {
        self.events().into_iter().filter(|entry| entry.event == event).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Shared sink handle.
pub type SharedSink = Arc<dyn EventSink>;

/// Builds the sink for an environment target.
///
/// # Errors
///
/// Returns an error when a file sink cannot be opened.
pub fn sink_for_target(target: &LogTarget) -> io::Result<SharedSink> {
    Ok(match target {
        LogTarget::Stderr => Arc::new(StderrEventSink),
        LogTarget::Off => Arc::new(NoopEventSink),
        LogTarget::File(path) => Arc::new(FileEventSink::new(path)?),
    })
}

/// Builds the sink for the `[logging]` config section.
///
/// # Errors
///
/// Returns an error when a file sink cannot be opened.
pub fn sink_for_config(config: &LoggingConfig) -> io::Result<SharedSink> {
    match (config.sink, config.path.as_deref()) {
        (LogSinkKind::File, Some(path)) => sink_for_target(&LogTarget::File(path.into())),
        (LogSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "logging.path is required"))
        }
        (LogSinkKind::Off, _) => sink_for_target(&LogTarget::Off),
        (LogSinkKind::Stderr, _) => sink_for_target(&LogTarget::Stderr),
    }
}

/// Resolves the sink, preferring the environment over config.
///
/// # Errors
///
/// Returns an error when a file sink cannot be opened.
pub fn resolve_sink(env: Option<&LogTarget>, config: &LoggingConfig) -> io::Result<SharedSink> {
    env.map_or_else(|| sink_for_config(config), sink_for_target)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
