//! Command model: shared info, the keyboard and braille variants, and handlers.
use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{InputEvent, KeyBinding, Layout};

/// Context a handler runs in: the focused application and window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecContext {
    /// Focused application name.
    pub app: String,
    /// Focused window title.
    pub title: String,
}

/// Callback run when a command fires. Returns true when the event was handled.
pub trait CommandHandler: Send + Sync {
    /// Run the command for `event`.
    fn execute(&self, ctx: &ExecContext, event: &InputEvent) -> bool;
}

impl<F> CommandHandler for F
where
    F: Fn(&ExecContext, &InputEvent) -> bool + Send + Sync,
{
    fn execute(&self, ctx: &ExecContext, event: &InputEvent) -> bool {
        self(ctx, event)
    }
}

/// Fields shared by every command variant.
#[derive(Clone)]
pub struct CommandInfo {
    /// Unique name.
    name: String,
    /// Group shown to the user and used for bulk enable/suspend.
    group_label: String,
    /// Human-readable description, announced in learn mode.
    description: String,
    /// Durable user preference.
    enabled: bool,
    /// Transient system override.
    suspended: bool,
    /// Whether learn mode announces this command.
    learn_mode_enabled: bool,
    /// Callback.
    handler: Arc<dyn CommandHandler>,
}

impl fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInfo")
            .field("name", &self.name)
            .field("group_label", &self.group_label)
            .field("enabled", &self.enabled)
            .field("suspended", &self.suspended)
            .finish_non_exhaustive()
    }
}

impl CommandInfo {
    /// New enabled, unsuspended command info.
    pub fn new(
        name: impl Into<String>,
        group_label: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            group_label: group_label.into(),
            description: description.into(),
            enabled: true,
            suspended: false,
            learn_mode_enabled: true,
            handler: Arc::new(handler),
        }
    }
}

/// Accessors shared by all command variants.
pub trait CommandBase {
    /// Shared fields.
    fn info(&self) -> &CommandInfo;
    /// Shared fields, mutably.
    fn info_mut(&mut self) -> &mut CommandInfo;

    /// Unique name.
    fn name(&self) -> &str {
        &self.info().name
    }
    /// Group label.
    fn group_label(&self) -> &str {
        &self.info().group_label
    }
    /// Description.
    fn description(&self) -> &str {
        &self.info().description
    }
    /// User preference.
    fn is_enabled(&self) -> bool {
        self.info().enabled
    }
    /// Set the user preference.
    fn set_enabled(&mut self, enabled: bool) {
        self.info_mut().enabled = enabled;
    }
    /// System override.
    fn is_suspended(&self) -> bool {
        self.info().suspended
    }
    /// Set the system override.
    fn set_suspended(&mut self, suspended: bool) {
        self.info_mut().suspended = suspended;
    }
    /// Whether learn mode announces this command.
    fn learn_mode_enabled(&self) -> bool {
        self.info().learn_mode_enabled
    }
    /// Run the handler; true means the event was consumed.
    fn execute(&self, ctx: &ExecContext, event: &InputEvent) -> bool {
        let handled = self.info().handler.execute(ctx, event);
        trace!(command = self.name(), handled, "command_executed");
        handled
    }
}

/// A command triggered from the keyboard.
#[derive(Clone, Debug)]
pub struct KeyboardCommand {
    /// Shared fields.
    info: CommandInfo,
    /// Default for the desktop layout.
    desktop_default: Option<KeyBinding>,
    /// Default for the laptop layout.
    laptop_default: Option<KeyBinding>,
    /// Binding currently in force.
    pub(crate) active_binding: Option<KeyBinding>,
    /// Excluded from bulk group operations.
    is_group_toggle: bool,
}

impl KeyboardCommand {
    /// Unbound keyboard command.
    pub fn new(
        name: impl Into<String>,
        group_label: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            info: CommandInfo::new(name, group_label, description, handler),
            desktop_default: None,
            laptop_default: None,
            active_binding: None,
            is_group_toggle: false,
        }
    }

    /// Set the desktop default.
    pub fn desktop(mut self, binding: KeyBinding) -> Self {
        self.desktop_default = Some(binding.fresh());
        self
    }

    /// Set the laptop default.
    pub fn laptop(mut self, binding: KeyBinding) -> Self {
        self.laptop_default = Some(binding.fresh());
        self
    }

    /// Use `binding` as the default on both layouts.
    pub fn both(self, binding: KeyBinding) -> Self {
        let laptop = binding.fresh();
        self.desktop(binding).laptop(laptop)
    }

    /// Mark as a group toggle.
    pub fn group_toggle(mut self, toggle: bool) -> Self {
        self.is_group_toggle = toggle;
        self
    }

    /// Set the initial user preference.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.info.enabled = enabled;
        self
    }

    /// Set whether learn mode announces this command.
    pub fn learn_mode(mut self, enabled: bool) -> Self {
        self.info.learn_mode_enabled = enabled;
        self
    }

    /// Desktop default binding.
    pub fn desktop_default(&self) -> Option<&KeyBinding> {
        self.desktop_default.as_ref()
    }

    /// Laptop default binding.
    pub fn laptop_default(&self) -> Option<&KeyBinding> {
        self.laptop_default.as_ref()
    }

    /// Default binding for `layout`.
    pub fn default_for(&self, layout: Layout) -> Option<&KeyBinding> {
        match layout {
            Layout::Desktop => self.desktop_default.as_ref(),
            Layout::Laptop => self.laptop_default.as_ref(),
        }
    }

    /// Binding currently in force.
    pub fn active_binding(&self) -> Option<&KeyBinding> {
        self.active_binding.as_ref()
    }

    /// True for group toggles.
    pub fn is_group_toggle(&self) -> bool {
        self.is_group_toggle
    }

    /// Enabled, not suspended, and bound.
    pub fn is_active(&self) -> bool {
        self.info.enabled && !self.info.suspended && self.active_binding.is_some()
    }

    /// Holding a grab.
    pub fn is_grabbed(&self) -> bool {
        self.active_binding.as_ref().is_some_and(KeyBinding::has_grabs)
    }
}

impl CommandBase for KeyboardCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }
    fn info_mut(&mut self) -> &mut CommandInfo {
        &mut self.info
    }
}

/// A command triggered from a braille display.
#[derive(Clone, Debug)]
pub struct BrailleCommand {
    /// Shared fields.
    info: CommandInfo,
    /// Vendor command codes that trigger this command.
    hardware_codes: Vec<i32>,
    /// Still runs while an interception mode is active.
    runs_during_intercept_mode: bool,
}

impl BrailleCommand {
    /// Braille command for the given codes.
    pub fn new(
        name: impl Into<String>,
        group_label: impl Into<String>,
        description: impl Into<String>,
        hardware_codes: Vec<i32>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            info: CommandInfo::new(name, group_label, description, handler),
            hardware_codes,
            runs_during_intercept_mode: false,
        }
    }

    /// Allow this command to run while interception is active.
    pub fn during_intercept(mut self, runs: bool) -> Self {
        self.runs_during_intercept_mode = runs;
        self
    }

    /// Vendor command codes.
    pub fn hardware_codes(&self) -> &[i32] {
        &self.hardware_codes
    }

    /// True when this command runs during interception.
    pub fn runs_during_intercept_mode(&self) -> bool {
        self.runs_during_intercept_mode
    }

    /// Enabled and not suspended.
    pub fn is_active(&self) -> bool {
        self.info.enabled && !self.info.suspended
    }
}

impl CommandBase for BrailleCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }
    fn info_mut(&mut self) -> &mut CommandInfo {
        &mut self.info
    }
}

/// Any registered command.
#[derive(Clone, Debug)]
pub enum Command {
    /// Keyboard-triggered.
    Keyboard(KeyboardCommand),
    /// Braille-triggered.
    Braille(BrailleCommand),
}

impl Command {
    /// Keyboard variant, if this is one.
    pub fn as_keyboard(&self) -> Option<&KeyboardCommand> {
        match self {
            Self::Keyboard(k) => Some(k),
            Self::Braille(_) => None,
        }
    }

    /// Mutable keyboard variant, if this is one.
    pub fn as_keyboard_mut(&mut self) -> Option<&mut KeyboardCommand> {
        match self {
            Self::Keyboard(k) => Some(k),
            Self::Braille(_) => None,
        }
    }

    /// Braille variant, if this is one.
    pub fn as_braille(&self) -> Option<&BrailleCommand> {
        match self {
            Self::Braille(b) => Some(b),
            Self::Keyboard(_) => None,
        }
    }
}

impl CommandBase for Command {
    fn info(&self) -> &CommandInfo {
        match self {
            Self::Keyboard(k) => k.info(),
            Self::Braille(b) => b.info(),
        }
    }
    fn info_mut(&mut self) -> &mut CommandInfo {
        match self {
            Self::Keyboard(k) => k.info_mut(),
            Self::Braille(b) => b.info_mut(),
        }
    }
}

impl From<KeyboardCommand> for Command {
    fn from(k: KeyboardCommand) -> Self {
        Self::Keyboard(k)
    }
}

impl From<BrailleCommand> for Command {
    fn from(b: BrailleCommand) -> Self {
        Self::Braille(b)
    }
}
