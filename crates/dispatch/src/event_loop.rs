//! The single-threaded event loop.
//!
//! Inputs arrive on an unbounded channel. Each input is presented, the loop
//! yields once, and the consume phase runs on the next turn. One report per
//! input goes out on the report channel.
use command_registry::Layout;
use tokio::{
    select,
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Consumed, Dispatcher, Error, RawKeyEvent, Result, Verdict};

/// Something for the loop to process.
#[derive(Debug, Clone)]
pub enum LoopInput {
    /// A platform key event; the loop stamps it with its own clock.
    Key(RawKeyEvent),
    /// A braille display command code.
    Braille(i32),
    /// Enter learn mode.
    StartLearnMode,
    /// Switch keyboard layouts.
    Layout(Layout),
}

/// What happened to one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Present-phase verdict.
    pub verdict: Verdict,
    /// Consume-phase results from the following tick.
    pub consumed: Vec<Consumed>,
}

impl Report {
    /// True when some command, or an interception mode, handled the input.
    pub fn handled(&self) -> bool {
        self.consumed.iter().any(|c| c.handled)
    }
}

/// Drives a [`Dispatcher`] from a channel until cancelled or the input
/// channel closes.
pub struct EventLoop {
    /// The dispatcher; handed back when the loop ends.
    dispatcher: Dispatcher,
    /// Input channel.
    inputs: UnboundedReceiver<LoopInput>,
    /// Report channel.
    reports: UnboundedSender<Report>,
    /// Stops the loop.
    token: CancellationToken,
}

impl EventLoop {
    /// Loop over `inputs`, sending one report per input to `reports`.
    pub fn new(
        dispatcher: Dispatcher,
        inputs: UnboundedReceiver<LoopInput>,
        reports: UnboundedSender<Report>,
    ) -> Self {
        Self {
            dispatcher,
            inputs,
            reports,
            token: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run until cancelled or the input channel closes, then return the
    /// dispatcher. Fails if the report receiver goes away.
    pub async fn run(mut self) -> Result<Dispatcher> {
        let started = Instant::now();
        debug!("event_loop_started");
        loop {
            let input = select! {
                () = self.token.cancelled() => {
                    debug!("event_loop_cancelled");
                    break;
                }
                input = self.inputs.recv() => match input {
                    Some(i) => i,
                    None => {
                        debug!("event_loop_inputs_closed");
                        break;
                    }
                },
            };
            let verdict = self.present(input, started);
            // The consume phase runs on the loop's next turn.
            task::yield_now().await;
            let consumed = self.dispatcher.tick();
            if self.reports.send(Report { verdict, consumed }).is_err() {
                return Err(Error::ChannelClosed);
            }
        }
        Ok(self.dispatcher)
    }

    /// Present phase for one input.
    fn present(&mut self, input: LoopInput, started: Instant) -> Verdict {
        match input {
            LoopInput::Key(raw) => self
                .dispatcher
                .process_keyboard_event(&raw, started.elapsed()),
            LoopInput::Braille(code) => self.dispatcher.process_braille_event(code),
            LoopInput::StartLearnMode => {
                self.dispatcher.start_learn_mode();
                Verdict::Control
            }
            LoopInput::Layout(layout) => {
                self.dispatcher.registry_mut().set_keyboard_layout(layout);
                Verdict::Control
            }
        }
    }
}
