use command_registry::{
    CommandRegistry, ExecContext, InputEvent, KeyBinding, KeyboardCommand, Layout,
};
use grab::MockGrabBackend;
use keysym::{DEFAULT_MODIFIER_MASK, Modifiers};
use overrides::{BindingSpec, OverrideMap};
use proptest::prelude::*;

const CMD: u32 = Modifiers::COMMAND.bits();

const NAMES: [&str; 5] = ["a_next", "b_prev", "c_toggle", "d_say", "e_list"];

fn handled(_: &ExecContext, _: &InputEvent) -> bool {
    true
}

/// Five commands over two groups; desktop and laptop defaults never collide.
fn populated() -> (CommandRegistry, MockGrabBackend) {
    let mock = MockGrabBackend::new();
    let mut reg = CommandRegistry::new(Box::new(mock.clone()));
    let cmds = [
        KeyboardCommand::new("a_next", "Flat review", "Next item", handled)
            .desktop(KeyBinding::new("KP_Up", 0, 1))
            .laptop(KeyBinding::new("Up", CMD, 1)),
        KeyboardCommand::new("b_prev", "Flat review", "Previous item", handled)
            .desktop(KeyBinding::new("KP_Down", 0, 1))
            .laptop(KeyBinding::new("Down", CMD, 1)),
        KeyboardCommand::new("c_toggle", "Flat review", "Toggle flat review", handled)
            .both(KeyBinding::new("KP_Subtract", 0, 1))
            .group_toggle(true),
        KeyboardCommand::new("d_say", "Speech", "Say all", handled)
            .desktop(KeyBinding::new("KP_Add", 0, 1))
            .laptop(KeyBinding::new("semicolon", CMD, 1)),
        KeyboardCommand::new("e_list", "Speech", "List headings", handled)
            .both(KeyBinding::new("h", CMD, 2)),
    ];
    for c in cmds {
        reg.add_command(c).expect("add");
    }
    (reg, mock)
}

#[derive(Debug, Clone)]
enum Op {
    Layout(bool),
    GroupEnabled(bool, bool),
    GroupSuspended(bool, bool),
    CommandEnabled(usize, bool),
    Override(usize, u32, u8),
    Unbind(usize),
    Reset(usize),
    Reapply,
    Release(usize),
    Acquire(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Layout),
        (any::<bool>(), any::<bool>()).prop_map(|(g, on)| Op::GroupEnabled(g, on)),
        (any::<bool>(), any::<bool>()).prop_map(|(g, on)| Op::GroupSuspended(g, on)),
        (0..NAMES.len(), any::<bool>()).prop_map(|(i, on)| Op::CommandEnabled(i, on)),
        (0..NAMES.len(), prop_oneof![Just(0), Just(CMD)], 1u8..=2)
            .prop_map(|(i, m, c)| Op::Override(i, m, c)),
        (0..NAMES.len()).prop_map(Op::Unbind),
        (0..NAMES.len()).prop_map(Op::Reset),
        Just(Op::Reapply),
        (0..NAMES.len()).prop_map(Op::Release),
        (0..NAMES.len()).prop_map(Op::Acquire),
    ]
}

fn group(second: bool) -> &'static str {
    if second { "Speech" } else { "Flat review" }
}

/// Each command overrides onto its own letter, so overrides never collide.
fn override_spec(i: usize, modifiers: u32, clicks: u8) -> BindingSpec {
    let letter = ["q", "w", "r", "t", "y"][i];
    BindingSpec::new(letter, DEFAULT_MODIFIER_MASK, modifiers, u32::from(clicks))
}

fn apply(reg: &mut CommandRegistry, op: &Op) {
    match *op {
        Op::Layout(laptop) => {
            reg.set_keyboard_layout(if laptop { Layout::Laptop } else { Layout::Desktop });
        }
        Op::GroupEnabled(g, on) => reg.set_group_enabled(group(g), on),
        Op::GroupSuspended(g, on) => reg.set_group_suspended(group(g), on),
        Op::CommandEnabled(i, on) => reg.set_command_enabled(NAMES[i], on).expect("known"),
        Op::Override(i, m, c) => {
            let mut map = reg.overrides().clone();
            map.insert(NAMES[i], vec![override_spec(i, m, c)]);
            reg.apply_user_overrides(&map);
        }
        Op::Unbind(i) => reg.unbind(NAMES[i]).expect("known"),
        Op::Reset(i) => reg.reset_to_defaults(NAMES[i]).expect("known"),
        Op::Reapply => {
            let map = reg.overrides().clone();
            reg.apply_user_overrides(&map);
        }
        Op::Release(i) => {
            reg.remove_grabs_for_command(NAMES[i]);
        }
        Op::Acquire(i) => {
            reg.add_grabs_for_command(NAMES[i]);
        }
    }
}

/// Explicit grab control may leave a command deliberately out of step with
/// its active state, so the accounting check only runs on sequences without it.
fn explicit(op: &Op) -> bool {
    matches!(op, Op::Release(_) | Op::Acquire(_))
}

fn grabbed_commands(reg: &CommandRegistry) -> usize {
    reg.get_all_keyboard_commands()
        .into_iter()
        .filter(|k| k.is_grabbed())
        .count()
}

proptest! {
    #[test]
    fn invariants_hold_across_any_sequence(ops in proptest::collection::vec(op(), 1..24)) {
        let (mut reg, mock) = populated();
        let mut checked = true;
        for op in &ops {
            apply(&mut reg, op);
            checked &= !explicit(op);
            prop_assert!(reg.check_index_consistency().is_empty(), "index after {:?}", op);
            // Every live backend handle belongs to exactly one command.
            prop_assert_eq!(mock.live_handles().len(), grabbed_commands(&reg), "leak after {:?}", op);
            if checked {
                prop_assert!(reg.check_grab_accounting().is_empty(), "accounting after {:?}", op);
            }
        }
    }

    #[test]
    fn reapplying_overrides_is_silent(ops in proptest::collection::vec(op(), 0..12)) {
        let (mut reg, mock) = populated();
        for op in ops.iter().filter(|o| !explicit(o)) {
            apply(&mut reg, op);
        }
        let before = reg.bindings_snapshot();
        mock.clear_calls();
        let map = reg.overrides().clone();
        reg.apply_user_overrides(&map);
        prop_assert_eq!(mock.call_count(), 0);
        prop_assert_eq!(reg.bindings_snapshot(), before);
    }

    #[test]
    fn layout_round_trip_restores_bindings(ops in proptest::collection::vec(op(), 0..12)) {
        let (mut reg, _mock) = populated();
        for op in ops.iter().filter(|o| !explicit(o)) {
            apply(&mut reg, op);
        }
        let start = reg.layout();
        let other = match start {
            Layout::Desktop => Layout::Laptop,
            Layout::Laptop => Layout::Desktop,
        };
        let before = reg.bindings_snapshot();
        prop_assert!(reg.set_keyboard_layout(other));
        prop_assert!(reg.set_keyboard_layout(start));
        prop_assert_eq!(reg.bindings_snapshot(), before);
        prop_assert!(reg.check_grab_accounting().is_empty());
    }
}

#[test]
fn equal_identities_across_layouts_touch_nothing() {
    let mock = MockGrabBackend::new();
    let mut reg = CommandRegistry::new(Box::new(mock.clone()));
    reg.add_command(
        KeyboardCommand::new("toggle_x", "Default", "Toggle", handled)
            .desktop(KeyBinding::new("Insert", 0, 1))
            .laptop(KeyBinding::new("Insert", 0, 1)),
    )
    .expect("add");
    let handles = mock.live_handles();
    mock.clear_calls();

    assert!(reg.set_keyboard_layout(Layout::Laptop));
    assert_eq!(mock.call_count(), 0);
    assert_eq!(mock.live_handles(), handles);
    assert!(!reg.set_keyboard_layout(Layout::Laptop));

    // An override with the same identity as the default is also a no-op.
    let mut map = OverrideMap::new();
    map.insert("toggle_x", vec![BindingSpec::new("Insert", DEFAULT_MODIFIER_MASK, 0, 1)]);
    reg.apply_user_overrides(&map);
    assert_eq!(mock.call_count(), 0);
    assert_eq!(
        reg.get_keyboard_command("toggle_x")
            .expect("cmd")
            .active_binding()
            .expect("bound")
            .grab_handles(),
        &handles[..]
    );
}

#[test]
fn switching_layouts_only_touches_changed_keys() {
    let (mut reg, mock) = populated();
    mock.clear_calls();
    reg.set_keyboard_layout(Layout::Laptop);
    // a_next, b_prev and d_say move; c_toggle and e_list keep their grabs.
    assert_eq!(mock.release_count(), 3);
    assert_eq!(mock.acquire_count(), 3);
}
