pub mod record;

use serde::{Deserialize, Serialize};

pub use record::{DataRecord, FlowRecord, HeadRecord, LogRecord};

/// Severity attached to a record when it is handed to an appender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Debug,
    Warn,
    Error,
    Trace,
}

/// Output channel a record is dispatched on. Each flow definition carries its
/// own appender list per channel, resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Head,
    Flows,
    Data,
    Error,
}

pub const CHANNEL_COUNT: usize = 4;

impl ChannelType {
    pub const ALL: [ChannelType; CHANNEL_COUNT] = [
        ChannelType::Head,
        ChannelType::Flows,
        ChannelType::Data,
        ChannelType::Error,
    ];

    pub fn idx(&self) -> usize {
        match self {
            ChannelType::Head => 0,
            ChannelType::Flows => 1,
            ChannelType::Data => 2,
            ChannelType::Error => 3,
        }
    }
}

/// Output sink boundary.
///
/// `append` must not block the matching engine: a sink owns its buffering and
/// queuing discipline, must preserve per-call ordering within itself, and
/// must not panic into the caller.
pub trait Appender: Send + Sync {
    fn append(&self, record: &LogRecord, level: Level);
}

/// Pure record formatter, applied by a sink before writing.
pub trait Layout: Send + Sync {
    fn format(&self, record: &LogRecord, level: Level) -> String;
}

/// Default layout: one JSON object per record.
#[derive(Debug, Default)]
pub struct JsonLayout;

impl Layout for JsonLayout {
    fn format(&self, record: &LogRecord, _level: Level) -> String {
        serde_json::to_string(record).unwrap_or_else(|e| format!("{{\"layout_err\":\"{}\"}}", e))
    }
}

/// Writes formatted records to stdout, error level to stderr.
pub struct ConsoleAppender {
    layout: Box<dyn Layout>,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            layout: Box::new(JsonLayout),
        }
    }

    pub fn with_layout(layout: Box<dyn Layout>) -> Self {
        Self { layout }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&self, record: &LogRecord, level: Level) {
        let line = self.layout.format(record, level);
        match level {
            Level::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}

/// Forwards records to the `tracing` ecosystem under the `stepflow` target.
pub struct TracingAppender {
    layout: Box<dyn Layout>,
}

impl TracingAppender {
    pub fn new() -> Self {
        Self {
            layout: Box::new(JsonLayout),
        }
    }

    pub fn with_layout(layout: Box<dyn Layout>) -> Self {
        Self { layout }
    }
}

impl Default for TracingAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for TracingAppender {
    fn append(&self, record: &LogRecord, level: Level) {
        let line = self.layout.format(record, level);
        match level {
            Level::Info => tracing::info!(target: "stepflow", "{line}"),
            Level::Debug => tracing::debug!(target: "stepflow", "{line}"),
            Level::Warn => tracing::warn!(target: "stepflow", "{line}"),
            Level::Error => tracing::error!(target: "stepflow", "{line}"),
            Level::Trace => tracing::trace!(target: "stepflow", "{line}"),
        }
    }
}
