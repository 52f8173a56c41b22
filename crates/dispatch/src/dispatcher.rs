//! Two-phase dispatch.
//!
//! Every event is first presented: it is narrated, and an active interception
//! mode may claim it. Execution is deferred to [`Dispatcher::tick`], which the
//! event loop calls on its next turn. A claimed event still gets a consume
//! entry, which is an explicit no-op.
use std::{
    collections::{BTreeSet, VecDeque},
    time::{Duration, Instant},
};

use command_registry::{CommandBase, CommandRegistry, ExecContext, InputEvent};
use tracing::{debug, trace, warn};

use crate::{
    DispatchConfig, InputEventClassifier, Interceptor, KEY_PROC_WARN_MS, KeyboardEvent,
    LearnMode, Presenter, RawKeyEvent, Result,
};

/// What the present phase decided for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The input repeated the previous one and was dropped.
    Duplicate,
    /// No command is bound to the input; nothing is queued.
    Unhandled,
    /// An interception mode claimed the input.
    Intercepted,
    /// The named command is queued for the consume phase.
    Queued(String),
    /// A control input changed dispatcher state.
    Control,
    /// A command modifier was double-pressed; its toggle state is now `on`.
    ModifierToggled {
        /// Modifier key symbol.
        keysym: String,
        /// New toggle state.
        on: bool,
    },
}

/// Outcome of one consume-phase entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumed {
    /// Command that ran, or `None` for an intercepted input.
    pub command: Option<String>,
    /// Final "handled" verdict for the input.
    pub handled: bool,
}

/// Work queued by the present phase.
#[derive(Debug)]
enum Pending {
    /// Run a keyboard command.
    Key {
        /// Command name.
        command: String,
        /// Triggering event.
        event: KeyboardEvent,
    },
    /// Run a braille command.
    Braille {
        /// Command name.
        command: String,
        /// Triggering code.
        code: i32,
    },
    /// The input was claimed during presentation.
    Intercepted,
}

/// Owns the registry and drives the present and consume phases.
pub struct Dispatcher {
    /// Commands and grabs.
    registry: CommandRegistry,
    /// Event classification and history.
    classifier: InputEventClassifier,
    /// Dispatch settings.
    config: DispatchConfig,
    /// Narration sink.
    presenter: Box<dyn Presenter>,
    /// The interception mode.
    learn_mode: LearnMode,
    /// Context handed to handlers.
    context: ExecContext,
    /// Consume-phase work, in arrival order.
    pending: VecDeque<Pending>,
    /// Command modifiers whose toggle is on.
    toggled: BTreeSet<String>,
}

impl Dispatcher {
    /// Build a dispatcher and grab the configured command modifiers.
    pub fn new(
        mut registry: CommandRegistry,
        config: DispatchConfig,
        presenter: Box<dyn Presenter>,
    ) -> Result<Self> {
        let names: Vec<&str> = config.command_modifiers.iter().map(String::as_str).collect();
        registry.set_command_modifiers(&names)?;
        Ok(Self {
            classifier: InputEventClassifier::new(&config),
            registry,
            config,
            presenter,
            learn_mode: LearnMode::new(),
            context: ExecContext::default(),
            pending: VecDeque::new(),
            toggled: BTreeSet::new(),
        })
    }

    /// The registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The registry, mutably, for layout switches, overrides and rebinding.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Event history.
    pub fn classifier(&self) -> &InputEventClassifier {
        &self.classifier
    }

    /// Current settings.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Replace the command-modifier keys, regrabbing them.
    pub fn set_command_modifiers(&mut self, names: Vec<String>) -> Result<()> {
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.registry.set_command_modifiers(&refs)?;
        self.classifier.set_command_modifiers(&names);
        self.toggled.retain(|t| names.contains(t));
        self.config.command_modifiers = names;
        Ok(())
    }

    /// Set the focus context handed to handlers.
    pub fn set_context(&mut self, context: ExecContext) {
        self.context = context;
    }

    /// True while learn mode claims events.
    pub fn learn_mode_active(&self) -> bool {
        self.learn_mode.is_active()
    }

    /// Enter learn mode.
    pub fn start_learn_mode(&mut self) -> bool {
        self.learn_mode.start(&mut *self.presenter)
    }

    /// Leave learn mode.
    pub fn quit_learn_mode(&mut self) -> bool {
        self.learn_mode.quit(&mut *self.presenter)
    }

    /// Command modifiers whose toggle is on.
    pub fn toggled_modifiers(&self) -> Vec<&str> {
        self.toggled.iter().map(String::as_str).collect()
    }

    /// Number of consume entries waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Present phase for a keyboard event observed at `time`.
    pub fn process_keyboard_event(&mut self, raw: &RawKeyEvent, time: Duration) -> Verdict {
        let start = Instant::now();
        let Some(event) = self.classifier.classify(raw, time) else {
            return Verdict::Duplicate;
        };
        let verdict = self.present(event);
        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(KEY_PROC_WARN_MS) {
            warn!("Key processing took {:?} for {:?}", elapsed, verdict);
        }
        verdict
    }

    /// Narrate, offer to interception, and queue the command, if any.
    fn present(&mut self, event: KeyboardEvent) -> Verdict {
        if self.config.echo_keys {
            self.presenter.present_key(&event);
        }
        if event.toggles_modifier && !self.learn_mode.is_active() {
            let keysym = event.keysym().to_string();
            let on = !self.toggled.remove(&keysym);
            if on {
                self.toggled.insert(keysym.clone());
            }
            debug!(keysym = %keysym, on, "command_modifier_toggled");
            return Verdict::ModifierToggled { keysym, on };
        }
        let command = if event.is_pressed() {
            self.registry.get_command_for_event(&event.key, true)
        } else {
            None
        };
        if self.learn_mode.is_active()
            && self
                .learn_mode
                .intercept(&event, command, &mut *self.presenter)
        {
            trace!(event = %event.describe(), "event_intercepted");
            self.pending.push_back(Pending::Intercepted);
            return Verdict::Intercepted;
        }
        match command.map(|c| c.name().to_string()) {
            Some(name) => {
                trace!(event = %event.describe(), command = %name, "command_queued");
                self.pending.push_back(Pending::Key {
                    command: name.clone(),
                    event,
                });
                Verdict::Queued(name)
            }
            None => {
                trace!(event = %event.describe(), "event_unhandled");
                Verdict::Unhandled
            }
        }
    }

    /// Present phase for a braille display command.
    pub fn process_braille_event(&mut self, code: i32) -> Verdict {
        self.classifier.note_braille(code);
        let intercepting = self.learn_mode.is_active();
        let found = self
            .registry
            .get_command_for_braille_event(code, intercepting)
            .map(|b| b.name().to_string());
        match found {
            Some(name) => {
                trace!(code, command = %name, "braille_queued");
                self.pending.push_back(Pending::Braille {
                    command: name.clone(),
                    code,
                });
                Verdict::Queued(name)
            }
            None if intercepting => {
                self.pending.push_back(Pending::Intercepted);
                Verdict::Intercepted
            }
            None => {
                trace!(code, "braille_unhandled");
                Verdict::Unhandled
            }
        }
    }

    /// Consume phase: run everything queued since the last tick.
    pub fn tick(&mut self) -> Vec<Consumed> {
        let mut out = Vec::with_capacity(self.pending.len());
        while let Some(p) = self.pending.pop_front() {
            out.push(self.consume(p));
        }
        out
    }

    /// Run one queued entry.
    fn consume(&self, pending: Pending) -> Consumed {
        match pending {
            Pending::Intercepted => {
                trace!("consume_skipped");
                Consumed {
                    command: None,
                    handled: true,
                }
            }
            Pending::Key { command, event } => {
                let handled = self
                    .registry
                    .get_keyboard_command(&command)
                    .filter(|k| k.is_active())
                    .is_some_and(|k| k.execute(&self.context, &InputEvent::Key(event.key)));
                debug!(command = %command, handled, "command_consumed");
                Consumed {
                    command: Some(command),
                    handled,
                }
            }
            Pending::Braille { command, code } => {
                let handled = self
                    .registry
                    .get_braille_command(&command)
                    .is_some_and(|b| b.execute(&self.context, &InputEvent::Braille(code)));
                debug!(command = %command, handled, "command_consumed");
                Consumed {
                    command: Some(command),
                    handled,
                }
            }
        }
    }
}
