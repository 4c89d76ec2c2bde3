//! Debug output emitted by the TLS backend while it processes a session.
//!
//! The backend reports events with the source location it was raised at, a
//! verbosity level and a message. A session forwards those events, unchanged,
//! to the configured [`DiagnosticsSink`] when the event's level is within the
//! configured threshold.
//!
//! TLS 后端在处理会话时发出的调试输出。
//!
//! 后端报告的事件包含其产生位置、详细级别和消息。当事件级别在阈值之内时，
//! 会话会将这些事件原样转发给已配置的 [`DiagnosticsSink`]。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Debug verbosity threshold, from silent to verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum DebugLevel {
    #[default]
    Off = 0,
    Error = 1,
    StateChange = 2,
    Info = 3,
    Verbose = 4,
}

impl From<u8> for DebugLevel {
    /// Levels above 4 are clamped to [`DebugLevel::Verbose`].
    fn from(level: u8) -> Self {
        match level {
            0 => DebugLevel::Off,
            1 => DebugLevel::Error,
            2 => DebugLevel::StateChange,
            3 => DebugLevel::Info,
            _ => DebugLevel::Verbose,
        }
    }
}

impl From<DebugLevel> for u8 {
    fn from(level: DebugLevel) -> Self {
        level as u8
    }
}

/// One debug event, as reported by the backend.
#[derive(Debug, Clone, Copy)]
pub struct DebugRecord<'a> {
    pub level: DebugLevel,
    pub file: &'a str,
    pub line: u32,
    pub message: fmt::Arguments<'a>,
}

/// Receives debug events from a session.
///
/// Sinks are shared between the session and the host and may be called from
/// whichever thread drives the session.
///
/// 接收来自会话的调试事件。
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, record: &DebugRecord<'_>);
}

/// Adapts a closure taking `(level, file, line, message)` into a sink.
pub struct FnSink<F>(pub F);

impl<F> DiagnosticsSink for FnSink<F>
where
    F: Fn(DebugLevel, &str, u32, &str) + Send + Sync,
{
    fn emit(&self, record: &DebugRecord<'_>) {
        let message = record.message.to_string();
        (self.0)(record.level, record.file, record.line, &message);
    }
}

/// Forwards backend debug events into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, record: &DebugRecord<'_>) {
        let (file, line, message) = (record.file, record.line, record.message);
        match record.level {
            DebugLevel::Off => {}
            DebugLevel::Error => {
                tracing::error!(target: "tls_session_driver::backend", file, line, "{message}")
            }
            DebugLevel::StateChange | DebugLevel::Info => {
                tracing::debug!(target: "tls_session_driver::backend", file, line, "{message}")
            }
            DebugLevel::Verbose => {
                tracing::trace!(target: "tls_session_driver::backend", file, line, "{message}")
            }
        }
    }
}

/// Verbosity threshold plus the sink events are forwarded to.
///
/// Without a sink nothing is emitted, whatever the level.
///
/// 详细级别阈值及事件转发的目标。没有目标时，无论级别如何都不会输出。
#[derive(Clone, Default)]
pub struct DebugConfig {
    level: DebugLevel,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl DebugConfig {
    pub fn new(level: DebugLevel, sink: Option<Arc<dyn DiagnosticsSink>>) -> Self {
        Self { level, sink }
    }

    pub fn level(&self) -> DebugLevel {
        self.level
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn enabled(&self, level: DebugLevel) -> bool {
        level != DebugLevel::Off && level <= self.level && self.sink.is_some()
    }

    /// Forwards an event if it passes the threshold.
    pub fn emit(&self, level: DebugLevel, file: &str, line: u32, message: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.emit(&DebugRecord {
                level,
                file,
                line,
                message,
            });
        }
    }
}

impl fmt::Debug for DebugConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugConfig")
            .field("level", &self.level)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
