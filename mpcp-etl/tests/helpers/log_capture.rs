//! Records tracing events emitted by the ETL so tests can assert on warnings

use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// One event seen by [`LogCapture`]
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields as `name=value`
    pub fields: Vec<String>,
}

impl LogRecord {
    /// Message and fields on one line
    pub fn line(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

/// Layer that keeps every event in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything seen so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Records at `level` whose message or fields contain every pattern
    pub fn matching_at(&self, level: Level, patterns: &[&str]) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .filter(|r| {
                let line = r.line();
                patterns.iter().all(|p| line.contains(p))
            })
            .collect()
    }

    /// Assert at least one WARN record contains every pattern
    pub fn assert_warned(&self, patterns: &[&str]) {
        assert!(
            !self.matching_at(Level::WARN, patterns).is_empty(),
            "no WARN event contained {:?}; captured:\n{}",
            patterns,
            self.records()
                .iter()
                .map(|r| format!("{} {}", r.level, r.line()))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        use tracing::field::Visit;

        #[derive(Default)]
        struct FieldVisitor {
            message: String,
            fields: Vec<String>,
        }

        impl Visit for FieldVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                } else {
                    self.fields.push(format!("{}={}", field.name(), value));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                } else {
                    self.fields.push(format!("{}={:?}", field.name(), value));
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Install a global subscriber feeding a fresh capture
///
/// Only the first call per test binary installs the subscriber, so tests using
/// this must run `#[serial]` and `clear()` before acting.
pub fn init_test_logging() -> LogCapture {
    static CAPTURE: std::sync::OnceLock<LogCapture> = std::sync::OnceLock::new();

    CAPTURE
        .get_or_init(|| {
            let capture = LogCapture::new();
            let _ = tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new("mpcp_etl=debug"))
                .with(capture.clone())
                .try_init();
            capture
        })
        .clone()
}
