//! Session documents: the commands to register and the inputs to replay.
//!
//! ```ron
//! #![enable(implicit_some)]
//! (
//!     layout: desktop,
//!     commands: [
//!         (name: "say_all", group: "Speech", desktop: "KP_Add", laptop: "command+semicolon"),
//!     ],
//!     events: [Tap("KP_Add"), Wait(600), LearnMode, Tap("KP_Add"), Tap("Escape")],
//! )
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use command_registry::{
    BrailleCommand, CommandRegistry, ExecContext, InputEvent, KeyBinding, KeyboardCommand, Layout,
};
use dispatch::{DispatchConfig, LoopInput, RawKeyEvent};
use keysym::Chord;
use overrides::{BindingSpec, OverrideMap, SpecTuple};
use serde::Deserialize;
use tracing::info;

use crate::{Error, Result};

/// A replay session.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    /// Layout in force when the session starts.
    #[serde(default)]
    pub layout: Layout,
    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Focused application handed to handlers.
    #[serde(default = "default_app")]
    pub app: String,
    /// Keyboard commands, registered in order.
    #[serde(default)]
    pub commands: Vec<CommandDef>,
    /// Braille commands.
    #[serde(default)]
    pub braille: Vec<BrailleDef>,
    /// Persisted overrides applied after registration, in the on-disk tuple form.
    #[serde(default)]
    pub overrides: BTreeMap<String, Vec<SpecTuple>>,
    /// Inputs to replay.
    pub events: Vec<Step>,
}

/// Default focused application.
fn default_app() -> String {
    "replay".to_string()
}

/// Default click count.
fn default_clicks() -> u8 {
    1
}

/// Default for flags that start out on.
fn default_true() -> bool {
    true
}

/// A keyboard command definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDef {
    /// Unique name.
    pub name: String,
    /// Group label.
    pub group: String,
    /// Announced in learn mode.
    #[serde(default)]
    pub description: String,
    /// Desktop default chord, e.g. `"command+h"`.
    #[serde(default)]
    pub desktop: Option<String>,
    /// Laptop default chord.
    #[serde(default)]
    pub laptop: Option<String>,
    /// Click count for both defaults.
    #[serde(default = "default_clicks")]
    pub clicks: u8,
    /// Excluded from bulk group operations.
    #[serde(default)]
    pub group_toggle: bool,
    /// Durable enabled flag.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether learn mode announces the command.
    #[serde(default = "default_true")]
    pub learn_mode: bool,
}

/// A braille command definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrailleDef {
    /// Unique name.
    pub name: String,
    /// Group label.
    pub group: String,
    /// Announced in learn mode.
    #[serde(default)]
    pub description: String,
    /// Hardware command codes.
    pub codes: Vec<i32>,
    /// Runs while learn mode is active.
    #[serde(default)]
    pub during_intercept: bool,
}

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum Step {
    /// Press a chord, e.g. `Press("shift+h")`.
    Press(String),
    /// Release a chord.
    Release(String),
    /// Press then release.
    Tap(String),
    /// Let the clock run for this many milliseconds.
    Wait(u64),
    /// A braille display command code.
    Braille(i32),
    /// Enter learn mode.
    LearnMode,
    /// Switch keyboard layouts.
    Layout(Layout),
}

impl Step {
    /// Loop inputs for this step. `Wait` has none.
    pub fn inputs(&self) -> Result<Vec<LoopInput>> {
        Ok(match self {
            Self::Press(c) => vec![LoopInput::Key(raw(c, true)?)],
            Self::Release(c) => vec![LoopInput::Key(raw(c, false)?)],
            Self::Tap(c) => vec![
                LoopInput::Key(raw(c, true)?),
                LoopInput::Key(raw(c, false)?),
            ],
            Self::Wait(_) => Vec::new(),
            Self::Braille(code) => vec![LoopInput::Braille(*code)],
            Self::LearnMode => vec![LoopInput::StartLearnMode],
            Self::Layout(l) => vec![LoopInput::Layout(*l)],
        })
    }
}

/// Raw platform event for a chord spec.
fn raw(spec: &str, pressed: bool) -> Result<RawKeyEvent> {
    let chord = Chord::parse(spec).ok_or_else(|| Error::BadChord(spec.to_string()))?;
    let ev = if pressed {
        RawKeyEvent::press(&chord.keysym, chord.modifiers)
    } else {
        RawKeyEvent::release(&chord.keysym, chord.modifiers)
    };
    ev.ok_or_else(|| Error::BadChord(spec.to_string()))
}

impl Session {
    /// Parse a session from RON text.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| Error::Session {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load a session file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source, &path.display().to_string())
    }

    /// The session's overrides as an [`OverrideMap`].
    pub fn override_map(&self) -> OverrideMap {
        let mut map = OverrideMap::new();
        for (name, tuples) in &self.overrides {
            let specs = tuples
                .iter()
                .map(|(k, mask, mods, clicks)| BindingSpec::new(k.clone(), *mask, *mods, *clicks))
                .collect();
            map.insert(name.clone(), specs);
        }
        map
    }

    /// Register every command with `registry`.
    pub fn register(&self, registry: &mut CommandRegistry) -> Result<()> {
        for def in &self.commands {
            registry.add_command(def.build()?)?;
        }
        for def in &self.braille {
            let name = def.name.clone();
            registry.add_command(
                BrailleCommand::new(
                    &def.name,
                    &def.group,
                    &def.description,
                    def.codes.clone(),
                    executed(name),
                )
                .during_intercept(def.during_intercept),
            )?;
        }
        Ok(())
    }
}

impl CommandDef {
    /// Build the keyboard command.
    fn build(&self) -> Result<KeyboardCommand> {
        let binding = |spec: &Option<String>| -> Result<Option<KeyBinding>> {
            spec.as_deref()
                .map(|s| KeyBinding::parse(s, self.clicks).ok_or_else(|| Error::BadChord(s.to_string())))
                .transpose()
        };
        let mut cmd = KeyboardCommand::new(
            &self.name,
            &self.group,
            &self.description,
            executed(self.name.clone()),
        )
        .group_toggle(self.group_toggle)
        .enabled(self.enabled)
        .learn_mode(self.learn_mode);
        if let Some(b) = binding(&self.desktop)? {
            cmd = cmd.desktop(b);
        }
        if let Some(b) = binding(&self.laptop)? {
            cmd = cmd.laptop(b);
        }
        Ok(cmd)
    }
}

/// Handler that logs the execution and reports it handled.
fn executed(name: String) -> impl Fn(&ExecContext, &InputEvent) -> bool + Send + Sync + 'static {
    move |ctx: &ExecContext, event: &InputEvent| {
        info!(command = %name, app = %ctx.app, ?event, "command_executed");
        true
    }
}

#[cfg(test)]
mod tests {
    use grab::MockGrabBackend;

    use super::*;

    #[test]
    fn demo_session_parses_and_registers() {
        let s = Session::from_ron_str(include_str!("../../../demos/session.ron"), "demo").expect("parse");
        assert_eq!(s.layout, Layout::Desktop);
        assert!(!s.events.is_empty());
        let mut reg = CommandRegistry::new(Box::new(MockGrabBackend::new()));
        s.register(&mut reg).expect("register");
        assert_eq!(reg.len(), s.commands.len() + s.braille.len());
    }

    #[test]
    fn defaults_fill_in() {
        let s = Session::from_ron_str(
            r#"(commands: [(name: "a", group: "G", desktop: Some("command+h"), clicks: 2)], events: [Tap("h")])"#,
            "inline",
        )
        .expect("parse");
        assert_eq!(s.app, "replay");
        assert_eq!(s.dispatch.double_click_timeout_ms, 500);
        let cmd = s.commands[0].build().expect("build");
        let b = cmd.desktop_default().expect("desktop");
        assert_eq!(b.click_count(), 2);
        assert_eq!(b.keysym(), "h");
        assert!(cmd.laptop_default().is_none());
        assert_eq!(s.events[0].inputs().expect("inputs").len(), 2);
    }

    #[test]
    fn bad_input_is_reported() {
        let err = Session::from_ron_str("(events: [], bogus: 1)", "inline").expect_err("unknown field");
        assert!(err.to_string().starts_with("invalid session inline:"));

        let s = Session::from_ron_str(
            r#"(commands: [(name: "a", group: "G", desktop: Some("hyper+h"))], events: [Press("nokey")])"#,
            "inline",
        )
        .expect("parse");
        assert!(matches!(s.commands[0].build(), Err(Error::BadChord(_))));
        assert!(matches!(s.events[0].inputs(), Err(Error::BadChord(_))));
    }

    #[test]
    fn override_tuples_convert() {
        let s = Session::from_ron_str(
            r#"(overrides: {"a": [("q", 269, 256, 1)], "b": []}, events: [])"#,
            "inline",
        )
        .expect("parse");
        let map = s.override_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").map(<[BindingSpec]>::len), Some(1));
        assert!(map.get("b").is_some_and(<[BindingSpec]>::is_empty));
    }
}
