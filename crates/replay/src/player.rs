//! Drive a session through the event loop and write a transcript.

use std::{fmt, io::Write};

use command_registry::{CommandRegistry, ExecContext};
use dispatch::{Dispatcher, EventLoop, Presentation, RecordingPresenter, Verdict};
use grab::GrabBackend;
use overrides::OverrideMap;
use tokio::{sync::mpsc, time};
use tracing::debug;

use crate::{Error, Result, Session, Step};

/// Totals for a finished replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Inputs sent to the loop.
    pub inputs: usize,
    /// Inputs some command or learn mode handled.
    pub handled: usize,
    /// Bindings holding grabs at the end, as `(chord, command, handles)`.
    pub bindings: Vec<(String, String, usize)>,
    /// Grab and index problems found at the end; empty when consistent.
    pub problems: Vec<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} inputs, {} handled", self.inputs, self.handled)?;
        for (chord, command, handles) in &self.bindings {
            writeln!(f, "  {chord:<24} {command} ({handles} grabs)")?;
        }
        for p in &self.problems {
            writeln!(f, "  problem: {p}")?;
        }
        Ok(())
    }
}

/// Render a verdict for the transcript.
fn verdict_text(v: &Verdict) -> String {
    match v {
        Verdict::Duplicate => "duplicate".to_string(),
        Verdict::Unhandled => "unhandled".to_string(),
        Verdict::Intercepted => "intercepted".to_string(),
        Verdict::Queued(name) => format!("-> {name}"),
        Verdict::Control => "ok".to_string(),
        Verdict::ModifierToggled { keysym, on } => {
            format!("{keysym} toggled {}", if *on { "on" } else { "off" })
        }
    }
}

/// Label for a step in the transcript.
fn step_label(step: &Step) -> String {
    match step {
        Step::Press(c) => format!("press {c}"),
        Step::Release(c) => format!("release {c}"),
        Step::Tap(c) => format!("tap {c}"),
        Step::Wait(ms) => format!("wait {ms}ms"),
        Step::Braille(code) => format!("braille {code}"),
        Step::LearnMode => "learn mode".to_string(),
        Step::Layout(l) => format!("layout {l:?}"),
    }
}

/// Replay `session` against `backend`.
///
/// `extra` overrides are applied over the session's own. Every step is
/// written to `out` with its verdicts and anything presented. The clock is
/// tokio's, so under a paused runtime `Wait` steps cost no real time.
pub async fn play(
    session: &Session,
    backend: Box<dyn GrabBackend>,
    extra: Option<&OverrideMap>,
    out: &mut impl Write,
) -> Result<Summary> {
    let mut registry = CommandRegistry::with_layout(backend, session.layout);
    session.register(&mut registry)?;
    let mut overrides = session.override_map();
    if let Some(extra) = extra {
        for (name, specs) in extra {
            overrides.insert(name.clone(), specs.clone());
        }
    }
    registry.apply_user_overrides(&overrides);

    let presenter = RecordingPresenter::new();
    let mut dispatcher =
        Dispatcher::new(registry, session.dispatch.clone(), Box::new(presenter.clone()))?;
    dispatcher.set_context(ExecContext {
        app: session.app.clone(),
        title: String::new(),
    });

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(EventLoop::new(dispatcher, in_rx, out_tx).run());

    let mut summary = Summary::default();
    for step in &session.events {
        if let Step::Wait(ms) = step {
            time::sleep(time::Duration::from_millis(*ms)).await;
            writeln!(out, "{}", step_label(step))?;
            continue;
        }
        let mut verdicts = Vec::new();
        for input in step.inputs()? {
            in_tx.send(input).map_err(|_| dispatch::Error::ChannelClosed)?;
            let report = out_rx.recv().await.ok_or(dispatch::Error::ChannelClosed)?;
            summary.inputs += 1;
            if report.handled() {
                summary.handled += 1;
            }
            verdicts.push(verdict_text(&report.verdict));
        }
        writeln!(out, "{:<24} {}", step_label(step), verdicts.join(", "))?;
        for p in presenter.take() {
            match p {
                Presentation::Key(k) => writeln!(out, "    key: {k}")?,
                Presentation::Message(m) => writeln!(out, "    say: {m}")?,
            }
        }
    }
    drop(in_tx);

    let dispatcher = handle.await.map_err(|e| Error::Join(e.to_string()))??;
    let registry = dispatcher.registry();
    summary.bindings = registry.bindings_snapshot();
    summary.problems = registry.check_grab_accounting();
    summary.problems.extend(registry.check_index_consistency());
    debug!(inputs = summary.inputs, handled = summary.handled, "replay_finished");
    Ok(summary)
}
