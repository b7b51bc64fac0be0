//! End-to-end interpreter scenarios: JSON description in, ramp requests and
//! events out.

use blackbird::engine::{Action, Event, EventQueue, Halt, RampService, Registry, ResumeToken};
use blackbird::ir::{Node, Q16, Shape};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Ramp {
    instance: u8,
    target: f32,
    ms: f32,
    shape: Shape,
    resume: Option<ResumeToken>,
}

/// Ramp service that records every request.
#[derive(Default)]
struct Recorder(Vec<Ramp>);

impl RampService for Recorder {
    fn begin_ramp(&mut self, instance: u8, target: Q16, duration_ms: Q16, shape: Shape, resume: Option<ResumeToken>) {
        self.0.push(Ramp { instance, target: target.to_f32(), ms: duration_ms.to_f32(), shape, resume });
    }
}

impl Recorder {
    fn targets(&self) -> Vec<f32> {
        self.0.iter().map(|r| r.target).collect()
    }

    /// Token of the most recent timed ramp.
    fn pending(&self) -> ResumeToken {
        self.0.iter().rev().find_map(|r| r.resume).unwrap()
    }
}

struct Rig {
    registry: Registry,
    ramps: Recorder,
    events: EventQueue<Event>,
}

impl Rig {
    fn new() -> Self {
        Self { registry: Registry::new(), ramps: Recorder::default(), events: EventQueue::new() }
    }

    fn load(&mut self, index: usize, json: &str) {
        let desc: Node = serde_json::from_str(json).unwrap();
        self.registry.load_description(index, &desc).unwrap();
    }

    fn act(&mut self, index: usize, action: Action) -> Option<Halt> {
        let code = match action {
            Action::Release => 0,
            Action::Restart => 1,
            Action::Unlock => 2,
            Action::Other(code) => code,
        };
        self.registry.start_action(index, code, &mut self.ramps, &self.events).unwrap()
    }

    fn complete(&mut self) -> Option<Halt> {
        let token = self.ramps.pending();
        self.registry.resume(token, &mut self.ramps, &self.events).unwrap()
    }

    fn events(&self) -> Vec<Event> {
        std::iter::from_fn(|| self.events.dequeue()).collect()
    }
}

#[test]
fn two_stage_envelope_publishes_done_once() {
    let mut rig = Rig::new();
    rig.load(0, r#"[["T", 1.0, 0.5, "LN"], ["T", 0.0, 0.5, "LN"]]"#);

    assert_eq!(rig.act(0, Action::Restart), Some(Halt::Ramp));
    assert_eq!(rig.ramps.0.len(), 1);
    let first = &rig.ramps.0[0];
    assert_eq!((first.instance, first.target, first.ms, first.shape), (0, 1.0, 500.0, Shape::Linear));
    assert!(first.resume.is_some());
    assert!(rig.events().is_empty());

    assert_eq!(rig.complete(), Some(Halt::Ramp));
    let second = &rig.ramps.0[1];
    assert_eq!((second.instance, second.target, second.ms, second.shape), (0, 0.0, 500.0, Shape::Linear));

    assert_eq!(rig.complete(), Some(Halt::Done));
    assert_eq!(rig.events(), vec![Event::AslDone(0)]);
    assert_eq!(rig.ramps.0.len(), 2);
}

#[test]
fn false_conditional_skips_rest_of_branch_only() {
    let mut rig = Rig::new();
    rig.load(
        1,
        r#"[["T", 1, 0, "LN"],
            [["I", 0], ["T", 8, 0, "LN"], ["T", 9, 0, "LN"]],
            ["T", 2, 0, "LN"]]"#,
    );
    assert_eq!(rig.act(1, Action::Restart), Some(Halt::Done));
    assert_eq!(rig.ramps.targets(), vec![1.0, 2.0]);
    assert_eq!(rig.events(), vec![Event::AslDone(1)]);
}

#[test]
fn conditional_reads_host_variable() {
    let mut rig = Rig::new();
    let gate = rig.registry.allocate_dynamic(0).unwrap();
    rig.load(0, r#"[[["I", ["D", 0]], ["T", 5, 0, "LN"]], ["W"]]"#);

    rig.act(0, Action::Restart);
    assert!(rig.ramps.0.is_empty());

    rig.registry.set_dynamic(0, gate.get(), 1.0).unwrap();
    rig.act(0, Action::Restart);
    assert_eq!(rig.ramps.targets(), vec![5.0]);
}

#[test]
fn reentered_child_starts_from_the_top() {
    let mut rig = Rig::new();
    // lfo: the inner pair loops under the outer recur
    rig.load(2, r#"[[["T", 1, 0.1, "sine"], ["T", -1, 0.1, "sine"]], ["R"]]"#);
    rig.act(2, Action::Restart);
    for _ in 0..5 {
        assert_eq!(rig.complete(), Some(Halt::Ramp));
    }
    assert_eq!(rig.ramps.targets(), vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
    assert!(rig.ramps.0.iter().all(|r| r.shape == Shape::Sine));
    assert!(rig.events().is_empty());
}

#[test]
fn held_envelope_releases_on_action_zero() {
    let mut rig = Rig::new();
    // ar-style: attack then hold, release ramps down
    rig.load(0, r#"[["H"], ["T", 5, 0.01, "log"], ["W"], ["U"], ["T", 0, 0.2, "expo"]]"#);

    assert_eq!(rig.act(0, Action::Restart), Some(Halt::Ramp));
    assert_eq!(rig.complete(), Some(Halt::Wait));
    assert!(rig.registry.instance(0).unwrap().is_holding());

    assert_eq!(rig.act(0, Action::Release), Some(Halt::Ramp));
    assert!(!rig.registry.instance(0).unwrap().is_holding());
    assert_eq!(rig.ramps.0[1].shape, Shape::Expo);
    assert_eq!(rig.complete(), Some(Halt::Done));
    assert_eq!(rig.events(), vec![Event::AslDone(0)]);

    // nothing held any more
    assert_eq!(rig.act(0, Action::Release), None);
}

#[test]
fn release_during_attack_drops_stale_completion() {
    let mut rig = Rig::new();
    rig.load(0, r#"[["H"], ["T", 5, 1, "LN"], ["W"], ["U"], ["T", 0, 1, "LN"]]"#);
    rig.act(0, Action::Restart);
    let attack = rig.ramps.pending();

    rig.act(0, Action::Release);
    let stale = rig.registry.resume(attack, &mut rig.ramps, &rig.events).unwrap();
    assert_eq!(stale, None);
    assert_eq!(rig.ramps.targets(), vec![5.0, 0.0]);
}

#[test]
fn locked_instance_ignores_actions_until_unlocked() {
    let mut rig = Rig::new();
    rig.load(3, r#"[["L"], ["T", 3, 0, "now"], ["W"]]"#);
    assert_eq!(rig.act(3, Action::Restart), Some(Halt::Wait));
    assert!(rig.registry.instance(3).unwrap().is_locked());

    assert_eq!(rig.act(3, Action::Restart), None);
    assert_eq!(rig.act(3, Action::Release), None);
    assert_eq!(rig.act(3, Action::Other(9)), None);
    assert_eq!(rig.ramps.0.len(), 1);

    assert_eq!(rig.act(3, Action::Unlock), None);
    assert_eq!(rig.act(3, Action::Restart), Some(Halt::Wait));
    assert_eq!(rig.ramps.0.len(), 2);
}

#[test]
fn mutable_counter_steps_through_values() {
    let mut rig = Rig::new();
    rig.load(0, r#"[["T", ["%", ["+", ["M", 0], 1], 4], 0, "LN"], ["W"]]"#);
    for _ in 0..6 {
        rig.act(0, Action::Restart);
    }
    assert_eq!(rig.ramps.targets(), vec![1.0, 2.0, 3.0, 0.0, 1.0, 2.0]);
}

#[test]
fn named_mutable_is_visible_to_host() {
    let mut rig = Rig::new();
    let step = rig.registry.allocate_dynamic(1).unwrap();
    rig.registry.set_dynamic(1, step.get(), 0.5).unwrap();
    // ['#', ['+', ['N', 0], 0.5]] bumps slot 0 by half a volt per pass
    rig.load(1, r##"[["T", ["#", ["+", ["N", 0], 0.5]], 0, "LN"], ["W"]]"##);

    rig.act(1, Action::Restart);
    rig.act(1, Action::Restart);
    assert_eq!(rig.ramps.targets(), vec![1.0, 1.5]);
    assert_eq!(rig.registry.get_dynamic(1, step.get()), Ok(1.5));
}

#[test]
fn negative_modulo_wraps_positive() {
    let mut rig = Rig::new();
    rig.load(0, r#"[["T", ["%", -0.5, 1], 0, "LN"]]"#);
    rig.act(0, Action::Restart);
    assert_eq!(rig.ramps.targets(), vec![0.5]);
}

#[test]
fn malformed_description_leaves_instance_unloaded() {
    let mut rig = Rig::new();
    rig.load(0, r#"[["T", 1, 0, "LN"]]"#);

    let bad: Node = serde_json::from_str(r#"[["T", 1, 0, "LN"], ["Q"]]"#).unwrap();
    assert!(rig.registry.load_description(0, &bad).is_err());
    assert!(!rig.registry.instance(0).unwrap().is_loaded());
    assert!(rig.registry.start_action(0, 1, &mut rig.ramps, &rig.events).is_err());
    assert!(rig.ramps.0.is_empty());
    assert!(rig.events().is_empty());
}

#[test]
fn evaluation_fault_is_published() {
    let mut rig = Rig::new();
    rig.load(2, r#"[["T", ["/", 1, 0], 0, "LN"]]"#);
    assert_eq!(rig.act(2, Action::Restart), Some(Halt::Fault));
    assert_eq!(rig.events(), vec![Event::AslFault(2)]);
}

#[test]
fn every_loadable_description_halts() {
    let descriptions = [
        r#"[["T", 1, 0, "LN"]]"#,
        r#"[["W"]]"#,
        r#"[["H"], ["W"], ["U"]]"#,
        r#"[[["T", 1, 0.1, "s"]], ["R"]]"#,
        r#"[[[["T", 1, 0, "o"]]], ["T", 0, 0, "u"]]"#,
        r#"[["I", false], ["T", 1, 0, "r"]]"#,
        r#"[["L"], ["O"], ["T", ["~", 2], 0, "w"]]"#,
        r#"[["T", ["*", 2, ["-", 3, 1]], 0.25, "n"]]"#,
    ];
    for json in descriptions {
        let mut rig = Rig::new();
        rig.load(0, json);
        let halt = rig.act(0, Action::Restart);
        assert!(
            matches!(halt, Some(Halt::Ramp | Halt::Wait | Halt::Done)),
            "{json}: {halt:?}"
        );
    }
}

// Generated descriptions stay inside every pool: at most six sequences,
// fifteen stages and two operand slots per stage. Divisors are never zero
// and only the body loops, behind a timed ramp, so no run can fault.

fn number() -> impl Strategy<Value = Node> {
    (-8.0f32..8.0).prop_map(Node::from)
}

fn expr() -> impl Strategy<Value = Node> {
    prop_oneof![
        number(),
        any::<bool>().prop_map(Node::from),
        (prop::sample::select(vec!["+", "-", "*"]), number(), number())
            .prop_map(|(op, a, b)| Node::list([Node::from(op), a, b])),
        (prop::sample::select(vec!["/", "%"]), number(), 0.25f32..4.0)
            .prop_map(|(op, a, b)| Node::list([Node::from(op), a, Node::from(b)])),
        number().prop_map(|a| Node::list([Node::from("~"), a])),
        number().prop_map(|a| Node::list([Node::from("M"), a])),
    ]
}

fn stage() -> impl Strategy<Value = Node> {
    let shape = prop::sample::select(vec!["LN", "sine", "log", "expo", "now", "wait", "over", "under", "reb"]);
    let seconds = prop_oneof![Just(0.0f32), -1.0f32..0.0, 0.001f32..0.5];
    prop_oneof![
        3 => (expr(), seconds, shape)
            .prop_map(|(v, s, sh)| Node::list([Node::from("T"), v, Node::from(s), Node::from(sh)])),
        1 => expr().prop_map(|p| Node::list([Node::from("I"), p])),
        1 => prop::sample::select(vec!["H", "W", "U", "L", "O"]).prop_map(|c| Node::list([Node::from(c)])),
    ]
}

fn description() -> impl Strategy<Value = Node> {
    let item = prop_oneof![
        3 => stage(),
        1 => prop::collection::vec(stage(), 1..=2).prop_map(Node::list),
    ];
    (prop::collection::vec(item, 1..=4), any::<bool>()).prop_map(|(mut items, looping)| {
        if looping {
            let lead = Node::list([Node::from("T"), Node::from(1.0), Node::from(0.25), Node::from("sine")]);
            items.insert(0, lead);
            items.push(Node::list([Node::from("R")]));
        }
        Node::list(items)
    })
}

proptest! {
    #[test]
    fn generated_descriptions_halt_without_faulting(desc in description()) {
        let mut rig = Rig::new();
        prop_assert!(rig.registry.load_description(0, &desc).is_ok(), "{:?}", desc);

        let mut halt = rig.act(0, Action::Restart);
        for _ in 0..16 {
            prop_assert!(
                matches!(halt, Some(Halt::Ramp | Halt::Wait | Halt::Done)),
                "{:?}: {:?}", desc, halt
            );
            if halt != Some(Halt::Ramp) {
                break;
            }
            halt = rig.complete();
        }
        prop_assert!(!rig.events().contains(&Event::AslFault(0)));
    }
}
