//! Dispatch settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for event classification and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum gap between presses counted as one multi-click.
    /// Defaults to 500 ms.
    #[serde(default = "default_double_click_timeout_ms")]
    pub double_click_timeout_ms: u64,

    /// Keys that act as the command modifier.
    /// Defaults to `Insert` and `KP_Insert`.
    #[serde(default = "default_command_modifiers")]
    pub command_modifiers: Vec<String>,

    /// Narrate every key as it is pressed.
    #[serde(default = "default_echo_keys")]
    pub echo_keys: bool,
}

/// Serde default: the double-click window.
fn default_double_click_timeout_ms() -> u64 {
    500
}

/// Serde default: the two Insert keys.
fn default_command_modifiers() -> Vec<String> {
    vec!["Insert".to_string(), "KP_Insert".to_string()]
}

/// Serde default: key echo on.
fn default_echo_keys() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            double_click_timeout_ms: default_double_click_timeout_ms(),
            command_modifiers: default_command_modifiers(),
            echo_keys: default_echo_keys(),
        }
    }
}

impl DispatchConfig {
    /// The double-click window as a duration.
    pub fn double_click_timeout(&self) -> Duration {
        Duration::from_millis(self.double_click_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: DispatchConfig = ron::from_str("(echo_keys: false)").expect("parse");
        assert_eq!(cfg.double_click_timeout_ms, 500);
        assert_eq!(cfg.command_modifiers, vec!["Insert", "KP_Insert"]);
        assert!(!cfg.echo_keys);
        assert_eq!(cfg.double_click_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ron::from_str::<DispatchConfig>("(click_timeout: 3)").is_err());
    }
}
