//! Render `tracing` events into concise logfmt strings.
//!
//! Events in this workspace carry a snake_case event name as their message and
//! the details as fields, e.g. `debug!(command = %name, "grab_acquired")`. The
//! rendered message keeps both: `grab_acquired command="say_all"`.

use std::fmt::{self, Debug, Display, Write};

use tracing::{
    Event, Metadata,
    field::{Field, Visit},
};

/// Rendered fields extracted from a tracing Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity level (e.g., INFO, WARN) for the event.
    pub level: String,
    /// Event target (typically the module path).
    pub target: String,
    /// Event name or message, followed by `key=value` pairs.
    pub message: String,
}

impl Display for RenderedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5} {}: {}", self.level, self.target, self.message)
    }
}

/// Collects the message and the remaining fields of an event.
#[derive(Default)]
struct MsgVisitor {
    /// Captured `message` field, if present.
    msg: Option<String>,
    /// Accumulated non-message fields rendered as `key=value`.
    fields: String,
}

impl Visit for MsgVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg = Some(value.to_string());
        } else {
            let _ignored = write!(&mut self.fields, "{}=\"{}\" ", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.msg = Some(format!("{:?}", value));
        } else {
            let _ignored = write!(&mut self.fields, "{}={:?} ", field.name(), value);
        }
    }
}

/// Extract a concise triple (level, target, message) from a tracing Event.
///
/// The message comes first when present; the other fields follow as
/// `key=value` pairs. Display-formatted fields (`%x`) render unquoted.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta: &Metadata<'_> = event.metadata();
    let mut vis = MsgVisitor::default();
    event.record(&mut vis);
    let fields = vis.fields.trim_end();
    let message = match vis.msg {
        Some(m) if fields.is_empty() => m,
        Some(m) => format!("{m} {fields}"),
        None => fields.to_string(),
    };
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message,
    }
}
