use std::{sync::Arc, time::Duration};

use command_registry::{
    BrailleCommand, CommandRegistry, ExecContext, InputEvent, KeyBinding, KeyboardCommand, Layout,
};
use dispatch::{
    Consumed, DispatchConfig, Dispatcher, Error, EventLoop, LEARN_MODE_START, LEARN_MODE_STOP,
    LoopInput, RawKeyEvent, RecordingPresenter, Verdict,
};
use grab::MockGrabBackend;
use keysym::Modifiers;
use parking_lot::Mutex;
use tokio::{sync::mpsc, time};

const CMD: u32 = Modifiers::COMMAND.bits();

type Runs = Arc<Mutex<Vec<String>>>;

struct Fixture {
    dispatcher: Dispatcher,
    mock: MockGrabBackend,
    presenter: RecordingPresenter,
    runs: Runs,
}

fn recorder(
    runs: &Runs,
    name: &'static str,
) -> impl Fn(&ExecContext, &InputEvent) -> bool + Send + Sync + 'static {
    let runs = Arc::clone(runs);
    move |ctx: &ExecContext, _: &InputEvent| {
        runs.lock().push(format!("{name}@{}", ctx.app));
        true
    }
}

fn fixture() -> Fixture {
    let mock = MockGrabBackend::new();
    let runs: Runs = Arc::default();
    let mut reg = CommandRegistry::new(Box::new(mock.clone()));
    reg.add_command(
        KeyboardCommand::new("say_all", "Speech", "Speak everything", recorder(&runs, "say_all"))
            .desktop(KeyBinding::new("KP_Add", 0, 1))
            .laptop(KeyBinding::new("semicolon", CMD, 1)),
    )
    .expect("add");
    reg.add_command(
        KeyboardCommand::new("heading", "Nav", "Next heading", recorder(&runs, "heading"))
            .both(KeyBinding::new("h", 0, 1)),
    )
    .expect("add");
    reg.add_command(
        KeyboardCommand::new("heading_list", "Nav", "List headings", recorder(&runs, "heading_list"))
            .both(KeyBinding::new("h", 0, 2)),
    )
    .expect("add");
    reg.add_command(
        KeyboardCommand::new("time", "Default", "Present the time", recorder(&runs, "time"))
            .both(KeyBinding::new("t", CMD, 1))
            .learn_mode(false),
    )
    .expect("add");
    reg.add_command(BrailleCommand::new(
        "pan_left",
        "Braille",
        "Pan left",
        vec![11],
        recorder(&runs, "pan_left"),
    ))
    .expect("add");

    let presenter = RecordingPresenter::new();
    let mut dispatcher =
        Dispatcher::new(reg, DispatchConfig::default(), Box::new(presenter.clone())).expect("new");
    dispatcher.set_context(ExecContext {
        app: "gedit".into(),
        title: "notes.txt".into(),
    });
    Fixture {
        dispatcher,
        mock,
        presenter,
        runs,
    }
}

fn press(name: &str) -> RawKeyEvent {
    RawKeyEvent::press(name, 0).expect("key")
}

fn release(name: &str) -> RawKeyEvent {
    RawKeyEvent::release(name, 0).expect("key")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn execution_waits_for_the_next_tick() {
    let mut f = fixture();
    let v = f.dispatcher.process_keyboard_event(&press("KP_Add"), ms(0));
    assert_eq!(v, Verdict::Queued("say_all".into()));
    assert_eq!(f.dispatcher.pending(), 1);
    assert!(f.runs.lock().is_empty());

    let consumed = f.dispatcher.tick();
    assert_eq!(
        consumed,
        vec![Consumed {
            command: Some("say_all".into()),
            handled: true
        }]
    );
    assert_eq!(*f.runs.lock(), vec!["say_all@gedit".to_string()]);
    assert_eq!(f.dispatcher.pending(), 0);

    assert_eq!(f.dispatcher.process_keyboard_event(&release("KP_Add"), ms(10)), Verdict::Unhandled);
    assert!(f.dispatcher.tick().is_empty());
    assert_eq!(f.presenter.presentations().len(), 2);
}

#[test]
fn second_press_reaches_the_double_click_command() {
    let mut f = fixture();
    let d = &mut f.dispatcher;
    assert_eq!(d.process_keyboard_event(&press("h"), ms(0)), Verdict::Queued("heading".into()));
    d.process_keyboard_event(&release("h"), ms(10));
    assert_eq!(
        d.process_keyboard_event(&press("h"), ms(120)),
        Verdict::Queued("heading_list".into())
    );
    d.tick();
    assert_eq!(
        *f.runs.lock(),
        vec!["heading@gedit".to_string(), "heading_list@gedit".to_string()]
    );
}

#[test]
fn command_modifier_is_grabbed_and_applied() {
    let mut f = fixture();
    assert!(f.dispatcher.registry().is_modifier_grabbed("Insert"));
    assert!(f.dispatcher.registry().is_modifier_grabbed("KP_Insert"));
    assert!(f.mock.live_keysyms().contains(&"KP_Insert".to_string()));

    let d = &mut f.dispatcher;
    assert_eq!(d.process_keyboard_event(&press("Insert"), ms(0)), Verdict::Unhandled);
    assert_eq!(d.process_keyboard_event(&press("t"), ms(20)), Verdict::Queued("time".into()));
    d.process_keyboard_event(&release("t"), ms(30));
    d.process_keyboard_event(&release("Insert"), ms(40));
    // Without the modifier held, t is unbound.
    assert_eq!(d.process_keyboard_event(&press("t"), ms(900)), Verdict::Unhandled);
}

#[test]
fn double_press_toggles_the_modifier_once() {
    let mut f = fixture();
    let d = &mut f.dispatcher;
    d.process_keyboard_event(&press("Insert"), ms(0));
    d.process_keyboard_event(&release("Insert"), ms(10));
    assert_eq!(
        d.process_keyboard_event(&press("Insert"), ms(50)),
        Verdict::ModifierToggled {
            keysym: "Insert".into(),
            on: true
        }
    );
    d.process_keyboard_event(&release("Insert"), ms(60));
    assert_eq!(d.process_keyboard_event(&press("Insert"), ms(90)), Verdict::Unhandled);
    d.process_keyboard_event(&release("Insert"), ms(100));
    assert_eq!(d.toggled_modifiers(), vec!["Insert"]);

    d.process_keyboard_event(&press("Insert"), ms(2000));
    d.process_keyboard_event(&release("Insert"), ms(2010));
    assert_eq!(
        d.process_keyboard_event(&press("Insert"), ms(2050)),
        Verdict::ModifierToggled {
            keysym: "Insert".into(),
            on: false
        }
    );
    assert!(d.toggled_modifiers().is_empty());
}

#[test]
fn learn_mode_describes_instead_of_running() {
    let mut f = fixture();
    let d = &mut f.dispatcher;
    assert!(d.start_learn_mode());
    assert!(!d.start_learn_mode());

    assert_eq!(d.process_keyboard_event(&press("KP_Add"), ms(0)), Verdict::Intercepted);
    assert_eq!(
        d.tick(),
        vec![Consumed {
            command: None,
            handled: true
        }]
    );
    assert_eq!(d.process_keyboard_event(&release("KP_Add"), ms(10)), Verdict::Intercepted);
    d.process_keyboard_event(&press("Insert"), ms(100));
    // Bound, but not announced in learn mode.
    assert_eq!(d.process_keyboard_event(&press("t"), ms(120)), Verdict::Intercepted);
    // Braille commands that do not run during interception are claimed too.
    assert_eq!(d.process_braille_event(11), Verdict::Intercepted);
    d.tick();
    assert!(f.runs.lock().is_empty());

    assert_eq!(d.process_keyboard_event(&press("Escape"), ms(200)), Verdict::Intercepted);
    assert!(!d.learn_mode_active());
    assert_eq!(
        f.presenter.messages(),
        vec![
            LEARN_MODE_START.to_string(),
            "Speak everything".to_string(),
            LEARN_MODE_STOP.to_string()
        ]
    );

    d.process_keyboard_event(&release("Escape"), ms(210));
    d.process_keyboard_event(&release("t"), ms(220));
    d.process_keyboard_event(&release("Insert"), ms(230));
    assert_eq!(d.process_keyboard_event(&press("KP_Add"), ms(300)), Verdict::Queued("say_all".into()));
}

#[test]
fn braille_commands_use_both_phases() {
    let mut f = fixture();
    let d = &mut f.dispatcher;
    assert_eq!(d.process_braille_event(11), Verdict::Queued("pan_left".into()));
    assert!(d.classifier().last_event_was_braille());
    assert_eq!(d.process_braille_event(42), Verdict::Unhandled);
    assert_eq!(
        d.tick(),
        vec![Consumed {
            command: Some("pan_left".into()),
            handled: true
        }]
    );
    assert_eq!(*f.runs.lock(), vec!["pan_left@gedit".to_string()]);
}

#[test]
fn duplicates_are_dropped() {
    let mut f = fixture();
    let raw = press("KP_Add");
    assert_eq!(f.dispatcher.process_keyboard_event(&raw, ms(5)), Verdict::Queued("say_all".into()));
    assert_eq!(f.dispatcher.process_keyboard_event(&raw, ms(5)), Verdict::Duplicate);
    assert_eq!(f.dispatcher.tick().len(), 1);
}

#[test]
fn command_suspended_between_phases_does_not_run() {
    let mut f = fixture();
    f.dispatcher.process_keyboard_event(&press("KP_Add"), ms(0));
    f.dispatcher
        .registry_mut()
        .set_command_suspended("say_all", true)
        .expect("known");
    assert_eq!(
        f.dispatcher.tick(),
        vec![Consumed {
            command: Some("say_all".into()),
            handled: false
        }]
    );
    assert!(f.runs.lock().is_empty());
}

#[test]
fn unknown_command_modifier_fails_construction() {
    let reg = CommandRegistry::new(Box::new(MockGrabBackend::new()));
    let cfg = DispatchConfig {
        command_modifiers: vec!["NotAKey".into()],
        ..DispatchConfig::default()
    };
    match Dispatcher::new(reg, cfg, Box::new(RecordingPresenter::new())) {
        Err(Error::Registry(command_registry::Error::UnresolvableKeysym(name))) => {
            assert_eq!(name, "NotAKey");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test(start_paused = true)]
async fn event_loop_reports_each_input() {
    let f = fixture();
    let runs = f.runs.clone();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let event_loop = EventLoop::new(f.dispatcher, in_rx, out_tx);
    let token = event_loop.cancellation_token();
    let handle = tokio::spawn(event_loop.run());

    in_tx.send(LoopInput::Key(press("KP_Add"))).expect("send");
    let r = out_rx.recv().await.expect("report");
    assert_eq!(r.verdict, Verdict::Queued("say_all".into()));
    assert!(r.handled());

    in_tx.send(LoopInput::Key(press("h"))).expect("send");
    in_tx.send(LoopInput::Key(release("h"))).expect("send");
    time::sleep(ms(600)).await;
    in_tx.send(LoopInput::Key(press("h"))).expect("send");
    let verdicts = [
        out_rx.recv().await.expect("report").verdict,
        out_rx.recv().await.expect("report").verdict,
        out_rx.recv().await.expect("report").verdict,
    ];
    assert_eq!(verdicts[0], Verdict::Queued("heading".into()));
    assert_eq!(verdicts[1], Verdict::Unhandled);
    // The gap exceeded the double-click window.
    assert_eq!(verdicts[2], Verdict::Queued("heading".into()));

    in_tx.send(LoopInput::Layout(Layout::Laptop)).expect("send");
    assert_eq!(out_rx.recv().await.expect("report").verdict, Verdict::Control);

    token.cancel();
    let dispatcher = handle.await.expect("join").expect("run");
    assert_eq!(dispatcher.registry().layout(), Layout::Laptop);
    assert_eq!(runs.lock().len(), 3);
}

#[tokio::test]
async fn event_loop_stops_when_inputs_close_or_reports_drop() {
    let f = fixture();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    drop(in_tx);
    let dispatcher = EventLoop::new(f.dispatcher, in_rx, out_tx)
        .run()
        .await
        .expect("clean exit");

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    drop(out_rx);
    in_tx.send(LoopInput::Braille(11)).expect("send");
    let result = EventLoop::new(dispatcher, in_rx, out_tx).run().await;
    assert!(matches!(result, Err(Error::ChannelClosed)));
}
