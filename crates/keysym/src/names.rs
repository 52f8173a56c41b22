//! Predicates over key symbol names.

/// Arrow, Home and End keys, including their keypad forms.
pub fn is_navigation_key(name: &str) -> bool {
    matches!(
        name,
        "Left" | "Right" | "Up" | "Down" | "Home" | "End"
            | "KP_Left" | "KP_Right" | "KP_Up" | "KP_Down" | "KP_Home" | "KP_End"
    )
}

/// Keys that act on the focused widget rather than produce text.
pub fn is_action_key(name: &str) -> bool {
    matches!(
        name,
        "Return" | "KP_Enter" | "Escape" | "Tab" | "ISO_Left_Tab" | "BackSpace" | "Delete"
            | "KP_Delete" | "Page_Up" | "Page_Down" | "KP_Page_Up" | "KP_Page_Down"
    )
}

/// Modifier keys.
pub fn is_modifier_key(name: &str) -> bool {
    matches!(
        name,
        "Shift_L" | "Shift_R" | "Control_L" | "Control_R" | "Alt_L" | "Alt_R" | "Meta_L"
            | "Meta_R" | "Super_L" | "Super_R" | "ISO_Level3_Shift"
    )
}

/// `F1` through `F24`.
pub fn is_function_key(name: &str) -> bool {
    name.strip_prefix('F')
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=24).contains(&n))
}

/// Dead keys used to compose accented characters.
pub fn is_diacritical_key(name: &str) -> bool {
    name.starts_with("dead_")
}

/// Keys that toggle a locked state.
pub fn is_locking_key(name: &str) -> bool {
    matches!(name, "Caps_Lock" | "Shift_Lock" | "Num_Lock" | "Scroll_Lock")
}
