//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests
//! - Deterministic contract tests for the ports layer
//! - Scripted generator behaviour (empty, failing, unavailable)

use build_metrics_ports::{
    Availability, BoxFuture, ConsistencyLevel, ConsolePort, EnvironmentPort, GeneratorContext,
    LogEvent, LogFields, LoggerPort, Point, PointGenerator, Precision, TargetEndpoint,
    TimeSeriesConnection, TimeSeriesStorePort, WriteBatch,
};
use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event; children share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded event names, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event.into_string())
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.unwrap_or_default());
            event.fields = Some(fields);
        }
        self.events.lock().unwrap().push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Console that keeps every line.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    /// Snapshot of the written lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ConsolePort for MemoryConsole {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_owned());
    }
}

/// Fixed set of environment variables.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvironment {
    vars: BTreeMap<String, String>,
}

impl MemoryEnvironment {
    /// Environment with the given variables.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
        }
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_owned(), value.to_owned());
        self
    }
}

impl EnvironmentPort for MemoryEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// One write accepted by `InMemoryStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    /// Target URL.
    pub url: String,
    /// Username used, if any.
    pub username: Option<String>,
    /// Database name.
    pub database: String,
    /// Retention policy.
    pub retention_policy: String,
    /// Consistency level.
    pub consistency: ConsistencyLevel,
    /// Batch precision.
    pub precision: Precision,
    /// Points written.
    pub points: Vec<Point>,
}

#[derive(Debug, Default)]
struct StoreState {
    writes: Vec<RecordedWrite>,
    connects: Vec<String>,
    unreachable: Vec<String>,
    rejecting: BTreeMap<String, ErrorEnvelope>,
}

/// Store that records writes; selected URLs fail to connect or reject writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Make `connect` fail for `url` with `store:transport`.
    #[must_use]
    pub fn unreachable(self, url: &str) -> Self {
        self.state.lock().unwrap().unreachable.push(url.to_owned());
        self
    }

    /// Make writes to `url` fail with `error`.
    #[must_use]
    pub fn rejecting(self, url: &str, error: ErrorEnvelope) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejecting
            .insert(url.to_owned(), error);
        self
    }

    /// Accepted writes, in order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    /// URLs passed to `connect`, in order.
    pub fn connects(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }
}

impl TimeSeriesStorePort for InMemoryStore {
    fn connect(&self, endpoint: &TargetEndpoint) -> Result<Box<dyn TimeSeriesConnection>> {
        let url = endpoint.url.to_string();
        let mut state = self.state.lock().unwrap();
        state.connects.push(url.clone());
        if state.unreachable.contains(&url) {
            return Err(ErrorEnvelope::unexpected(
                ErrorCode::new("store", "transport"),
                format!("connection refused: {url}"),
                ErrorClass::Retriable,
            ));
        }
        Ok(Box::new(InMemoryConnection {
            url,
            username: endpoint
                .credentials
                .as_ref()
                .map(|credentials| credentials.username.to_string()),
            state: Arc::clone(&self.state),
        }))
    }
}

struct InMemoryConnection {
    url: String,
    username: Option<String>,
    state: Arc<Mutex<StoreState>>,
}

impl TimeSeriesConnection for InMemoryConnection {
    fn write<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        batch: &'a WriteBatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.rejecting.get(&self.url) {
                return Err(error.clone());
            }
            state.writes.push(RecordedWrite {
                url: self.url.clone(),
                username: self.username.clone(),
                database: batch.database.to_string(),
                retention_policy: batch.retention_policy.to_string(),
                consistency: batch.consistency,
                precision: batch.precision,
                points: batch.points.to_vec(),
            });
            Ok(())
        })
    }
}

/// Generator returning fixed points; `has_data` is false when empty.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    name: String,
    points: Vec<Point>,
}

impl StaticGenerator {
    /// Generator named `name` producing `points`.
    pub fn new(name: &str, points: Vec<Point>) -> Self {
        Self {
            name: name.to_owned(),
            points,
        }
    }
}

impl PointGenerator for StaticGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        !self.points.is_empty()
    }

    fn generate(&self, _ctx: &GeneratorContext) -> Result<Vec<Point>> {
        Ok(self.points.clone())
    }
}

/// Generator that always has data and always fails.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    name: String,
    error: ErrorEnvelope,
}

impl FailingGenerator {
    /// Generator named `name` failing with `error`.
    pub fn new(name: &str, error: ErrorEnvelope) -> Self {
        Self {
            name: name.to_owned(),
            error,
        }
    }
}

impl PointGenerator for FailingGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        true
    }

    fn generate(&self, _ctx: &GeneratorContext) -> Result<Vec<Point>> {
        Err(self.error.clone())
    }
}

/// Generator whose probe reports a missing dependency; counts generate calls.
#[derive(Debug, Default)]
pub struct UnavailableGenerator {
    generate_calls: AtomicUsize,
}

impl UnavailableGenerator {
    /// Number of `generate` calls observed.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

impl PointGenerator for UnavailableGenerator {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn availability(&self) -> Availability {
        Availability::unavailable("dependency missing")
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        true
    }

    fn generate(&self, _ctx: &GeneratorContext) -> Result<Vec<Point>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}
