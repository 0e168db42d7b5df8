//! End-to-end scenarios exercising the public API across topology,
//! signal evaluation, routing, and stepping together.

use rrsim_core::{
    find_route, format, place_train, run, step_train, update_all_signals, Colour, End, SimError,
    StepOutcome, Switch, Topology,
};

fn create(t: &mut Topology, names: &[&str]) {
    for n in names {
        t.create_segment(Some((*n).to_string())).unwrap();
    }
}

/// S1 — linear run: three segments end to end, no junctions.
#[test]
fn s1_linear_run() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();

    let route = find_route(&t, "tseg001", "tseg003").unwrap();
    assert!(route.demands.is_empty());

    t.create_train(Some("train1".into())).unwrap();
    place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();

    assert_eq!(step_train(&mut t, "train1").unwrap(), StepOutcome::Active);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg002");

    assert_eq!(step_train(&mut t, "train1").unwrap(), StepOutcome::Done);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg003");
}

/// S2 — junction, left fork: the default switch position reaches the
/// destination without a throw.
#[test]
fn s2_junction_left_fork() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003", "tseg004"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg004", End::A).unwrap();

    let junction_point = t.get_segment("tseg002").unwrap().end(End::B).binding().point.clone();
    let junction = t.get_point(&junction_point).unwrap();
    assert_eq!(junction.switch(), Switch::Left);
    assert_eq!(junction.slot(rrsim_core::Slot::S1).unwrap().segment, "tseg002");
    assert_eq!(junction.slot(rrsim_core::Slot::S2).unwrap().segment, "tseg003");
    assert_eq!(junction.slot(rrsim_core::Slot::S3).unwrap().segment, "tseg004");

    let route = find_route(&t, "tseg001", "tseg003").unwrap();
    assert_eq!(route.demands, std::collections::VecDeque::from([Switch::Left]));

    t.create_train(Some("train1".into())).unwrap();
    place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();

    step_train(&mut t, "train1").unwrap();
    let outcome = step_train(&mut t, "train1").unwrap();
    assert_eq!(outcome, StepOutcome::Done);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg003");
}

/// S3 — junction, right fork: reaching the branch requires a switch throw
/// before the move can happen, costing one extra tick.
#[test]
fn s3_junction_right_fork_requires_switch_throw() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003", "tseg004"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg004", End::A).unwrap();

    let route = find_route(&t, "tseg001", "tseg004").unwrap();
    assert_eq!(route.demands, std::collections::VecDeque::from([Switch::Right]));

    t.create_train(Some("train1".into())).unwrap();
    place_train(&mut t, "train1", "tseg001", "tseg004").unwrap();

    step_train(&mut t, "train1").unwrap(); // tseg001 -> tseg002

    let outcome = step_train(&mut t, "train1").unwrap(); // throws switch, doesn't move
    assert_eq!(outcome, StepOutcome::Active);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg002");
    let junction_point = t.get_segment("tseg002").unwrap().end(End::B).binding().point.clone();
    assert_eq!(t.get_point(&junction_point).unwrap().switch(), Switch::Right);

    let outcome = step_train(&mut t, "train1").unwrap();
    assert_eq!(outcome, StepOutcome::Done);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg004");
}

/// S4 — a red signal halts a train facing an oncoming one; removing the
/// oncoming train clears the signal and lets the moving train proceed.
#[test]
fn s4_red_signal_halts_train_until_oncoming_train_clears() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
    t.place_signal("tseg002", End::B).unwrap();

    t.create_train(Some("oncoming".into())).unwrap();
    place_train(&mut t, "oncoming", "tseg003", "tseg001").unwrap();
    assert_eq!(t.get_train("oncoming").unwrap().position().unwrap().heading, End::A);

    t.create_train(Some("mover".into())).unwrap();
    place_train(&mut t, "mover", "tseg001", "tseg003").unwrap();

    assert_eq!(step_train(&mut t, "mover").unwrap(), StepOutcome::Active);
    assert_eq!(t.get_train("mover").unwrap().position().unwrap().segment, "tseg002");

    assert!(t.get_segment("tseg002").unwrap().end(End::B).signal().unwrap().is_red());

    let outcome = step_train(&mut t, "mover").unwrap();
    assert_eq!(outcome, StepOutcome::Active);
    assert_eq!(t.get_train("mover").unwrap().position().unwrap().segment, "tseg002");

    t.remove_train("oncoming").unwrap();
    update_all_signals(&mut t);
    assert!(t.get_segment("tseg002").unwrap().end(End::B).signal().unwrap().colour() == Colour::Green);

    let outcome = step_train(&mut t, "mover").unwrap();
    assert_eq!(outcome, StepOutcome::Done);
    assert_eq!(t.get_train("mover").unwrap().position().unwrap().segment, "tseg003");
}

/// S5 — unreachable route across two disjoint pairs of segments.
#[test]
fn s5_unreachable_route() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003", "tseg004"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg003", End::B, "tseg004", End::A).unwrap();

    let err = find_route(&t, "tseg001", "tseg004").unwrap_err();
    assert!(matches!(err, SimError::Unreachable { .. }));
}

/// S6 — serialize/deserialize round trip preserves segments, bindings,
/// signal placements, and recomputed colours.
#[test]
fn s6_serialize_deserialize_round_trip() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003", "tseg004"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg004", End::A).unwrap();
    t.place_signal("tseg002", End::A).unwrap();
    t.place_signal("tseg002", End::B).unwrap();
    update_all_signals(&mut t);

    let before_names: Vec<String> = t.segments().map(|s| s.name().to_string()).collect();
    let before_a_colour = t.get_segment("tseg002").unwrap().end(End::A).signal().unwrap().colour();
    let before_b_colour = t.get_segment("tseg002").unwrap().end(End::B).signal().unwrap().colour();
    let text = format::serialize(&t);

    let mut restored = Topology::new();
    format::deserialize(&mut restored, &text).unwrap();

    let after_names: Vec<String> = restored.segments().map(|s| s.name().to_string()).collect();
    assert_eq!(before_names, after_names);
    assert_eq!(format::serialize(&restored), text);

    assert_eq!(
        restored.get_segment("tseg002").unwrap().end(End::A).signal().unwrap().colour(),
        before_a_colour
    );
    assert_eq!(
        restored.get_segment("tseg002").unwrap().end(End::B).signal().unwrap().colour(),
        before_b_colour
    );
}

/// `run` drives a multi-train network to completion within its safety cap.
#[test]
fn run_completes_a_multi_train_network() {
    let mut t = Topology::new();
    create(&mut t, &["tseg001", "tseg002", "tseg003"]);
    t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
    t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();

    t.create_train(Some("train1".into())).unwrap();
    place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();

    let ticks = run(&mut t, 100).unwrap();
    assert!(ticks <= 100);
    assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg003");
}
