//! Keep rendered tracing events in memory.
//!
//! Install [`CaptureLayer`] next to the usual fmt layer and keep a clone: the
//! clone sees every event at or above the layer's level, rendered with
//! [`render_event`]. The replay tool uses it to summarise warnings after a run.

use std::{mem, sync::Arc};

use parking_lot::Mutex;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::fmt::{RenderedLog, render_event};

/// Tracing layer that records rendered events. Clones share the record.
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    /// Most verbose level recorded.
    level: Level,
    /// Shared record.
    events: Arc<Mutex<Vec<RenderedLog>>>,
}

impl CaptureLayer {
    /// Record events at `level` or more severe.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            events: Arc::default(),
        }
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<RenderedLog> {
        self.events.lock().clone()
    }

    /// Drain the record.
    pub fn take(&self) -> Vec<RenderedLog> {
        mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events at exactly `level`.
    pub fn count_at(&self, level: Level) -> usize {
        let name = level.to_string();
        self.events.lock().iter().filter(|e| e.level == name).count()
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > self.level {
            return;
        }
        self.events.lock().push(render_event(event));
    }
}
