//! Per-train step advance and the whole-simulation step/run loop.

use tracing::trace;

use crate::common::{End, Shape, Slot, Switch};
use crate::error::{Result, SimError};
use crate::evaluator::update_all_signals;
use crate::router::find_route;
use crate::topology::Topology;
use crate::train::Position;

/// How one train's step attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The train is at its destination or a terminator; nothing more to do.
    Done,
    /// The train is still travelling; it may or may not have moved this tick.
    Active,
}

/// Place `train` on `start`, heading away from the seed end, with a route
/// computed to `destination`. Placement never fails because the
/// destination is occupied; occupancy is only checked at step time.
pub fn place_train(topology: &mut Topology, train: &str, start: &str, destination: &str) -> Result<()> {
    let route = find_route(topology, start, destination)?;

    topology
        .get_segment(start)
        .ok_or_else(|| SimError::UnknownName {
            kind: "segment",
            name: start.to_string(),
        })?;

    {
        let t = topology
            .get_train_mut(train)
            .ok_or_else(|| SimError::UnknownName {
                kind: "train",
                name: train.to_string(),
            })?;
        t.set_position(Some(Position {
            segment: start.to_string(),
            heading: route.initial_heading,
        }));
        t.assign_route(destination, route.demands);
    }

    if let Some(seg) = topology.get_segment_mut(start) {
        seg.set_train(Some(train.to_string()));
    }

    update_all_signals(topology);
    Ok(())
}

/// Advance one train by one tick. Returns [`StepOutcome::Done`] once the
/// train has nothing left to do; on collision the train's position is
/// cleared and [`SimError::Collision`] is returned.
pub fn step_train(topology: &mut Topology, train: &str) -> Result<StepOutcome> {
    let (segment, heading, destination) = {
        let t = topology
            .get_train(train)
            .ok_or_else(|| SimError::UnknownName {
                kind: "train",
                name: train.to_string(),
            })?;
        let pos = match t.position() {
            Some(p) => p.clone(),
            None => return Ok(StepOutcome::Done),
        };
        (pos.segment, pos.heading, t.destination().map(|s| s.to_string()))
    };

    if destination.as_deref() == Some(segment.as_str()) {
        return Ok(StepOutcome::Done);
    }

    let binding = match topology.get_segment(&segment) {
        Some(seg) => seg.end(heading).binding().clone(),
        None => {
            return Err(SimError::UnknownName {
                kind: "segment",
                name: segment,
            })
        }
    };

    let has_red_signal = topology
        .get_segment(&segment)
        .map(|seg| seg.end(heading).signal().map(|s| s.is_red()).unwrap_or(false))
        .unwrap_or(false);
    if has_red_signal {
        trace!(train, segment = %segment, "waiting at red signal");
        return Ok(StepOutcome::Active);
    }

    let point = topology
        .get_point(&binding.point)
        .ok_or_else(|| SimError::UnknownName {
            kind: "point",
            name: binding.point.clone(),
        })?
        .clone();

    let outcome = match point.shape() {
        Shape::Empty | Shape::Terminator => Ok(StepOutcome::Done),
        Shape::Continuation => {
            let other_slot = match binding.slot {
                Slot::S1 => Slot::S2,
                Slot::S2 => Slot::S1,
                Slot::S3 => {
                    return Err(SimError::InvariantViolation(format!(
                        "continuation point {} has an occupied slot 3",
                        binding.point
                    )))
                }
            };
            advance_through(topology, train, &segment, point.slot(other_slot).cloned())
        }
        Shape::Junction => step_junction(topology, train, &segment, binding.slot, &point),
    }?;

    // A move that lands exactly on the destination reports done in the
    // same tick, rather than waiting for a wasted extra step to notice.
    if outcome == StepOutcome::Active {
        if let Some(t) = topology.get_train(train) {
            if t.has_arrived() {
                return Ok(StepOutcome::Done);
            }
        }
    }
    Ok(outcome)
}

fn step_junction(
    topology: &mut Topology,
    train: &str,
    segment: &str,
    slot: Slot,
    point: &crate::point::ConnectionPoint,
) -> Result<StepOutcome> {
    match slot {
        Slot::S1 => {
            let demand = {
                let t = topology.get_train(train).expect("train exists");
                t.route().next().copied()
            };

            if let Some(demand) = demand {
                if demand != point.switch() {
                    if let Some(p) = topology.get_point_mut(point.name()) {
                        p.set_switch(demand);
                    }
                    trace!(train, point = point.name(), ?demand, "threw switch at common arrival");
                    return Ok(StepOutcome::Active);
                }
            }

            let target_slot = match point.switch() {
                Switch::Left => Slot::S2,
                Switch::Right => Slot::S3,
                Switch::None => return Ok(StepOutcome::Active),
            };
            let target = point.slot(target_slot).cloned();
            let outcome = advance_through(topology, train, segment, target)?;
            if outcome == StepOutcome::Active {
                // A successful move away from a common-slot arrival
                // consumes the demand it satisfied.
                if let Some(t) = topology.get_train_mut(train) {
                    t.next_demand();
                }
            }
            Ok(outcome)
        }
        Slot::S2 | Slot::S3 => {
            let desired = if slot == Slot::S2 { Switch::Left } else { Switch::Right };
            if point.switch() != desired {
                let common_free = point
                    .slot(Slot::S1)
                    .map(|r| topology.get_segment(&r.segment).and_then(|s| s.train()).is_none())
                    .unwrap_or(false);
                // Throwing toward right must not interrupt a train already
                // committed to the common segment from slot 2.
                let blocked_by_slot_2 = slot == Slot::S3
                    && point
                        .slot(Slot::S2)
                        .map(|r| topology.get_segment(&r.segment).and_then(|s| s.train()).is_some())
                        .unwrap_or(false);
                if common_free && !blocked_by_slot_2 {
                    if let Some(p) = topology.get_point_mut(point.name()) {
                        p.set_switch(desired);
                    }
                    trace!(train, point = point.name(), ?desired, "threw switch toward common");
                }
                return Ok(StepOutcome::Active);
            }
            let target = point.slot(Slot::S1).cloned();
            advance_through(topology, train, segment, target)
        }
    }
}

fn advance_through(
    topology: &mut Topology,
    train: &str,
    from_segment: &str,
    target: Option<crate::common::SegmentEndRef>,
) -> Result<StepOutcome> {
    let target = match target {
        Some(t) => t,
        None => return Ok(StepOutcome::Done),
    };

    if let Some(occupant) = topology.get_segment(&target.segment).and_then(|s| s.train()) {
        let occupant = occupant.to_string();
        if let Some(t) = topology.get_train_mut(train) {
            t.set_position(None);
        }
        return Err(SimError::Collision {
            train: train.to_string(),
            other: occupant,
            segment: target.segment,
        });
    }

    if let Some(seg) = topology.get_segment_mut(from_segment) {
        seg.set_train(None);
    }
    if let Some(seg) = topology.get_segment_mut(&target.segment) {
        seg.set_train(Some(train.to_string()));
    }
    if let Some(t) = topology.get_train_mut(train) {
        t.set_position(Some(Position {
            segment: target.segment.clone(),
            heading: target.end.opposite(),
        }));
    }
    trace!(train, to = %target.segment, "advanced");
    Ok(StepOutcome::Active)
}

/// Step every train once, in store registration order, then recompute
/// every signal once. Returns whether every train reported [`StepOutcome::Done`].
///
/// A collision on one train does not stop the others from stepping this
/// tick — collision is fatal only to the offending train (§7) — but once
/// every train has had its turn, the first collision encountered (if any)
/// is surfaced as this call's error, after signals have already been
/// recomputed against the post-collision state.
pub fn step(topology: &mut Topology) -> Result<bool> {
    let names: Vec<String> = topology.trains().map(|t| t.name().to_string()).collect();
    let mut all_done = true;
    let mut first_collision = None;
    for name in names {
        match step_train(topology, &name) {
            Ok(StepOutcome::Done) => {}
            Ok(StepOutcome::Active) => all_done = false,
            Err(e) => {
                all_done = false;
                first_collision.get_or_insert(e);
            }
        }
    }
    update_all_signals(topology);
    match first_collision {
        Some(e) => Err(e),
        None => Ok(all_done),
    }
}

/// Step repeatedly until every train is done, or `safety_cap` ticks have
/// elapsed, whichever comes first. Returns the number of ticks run.
pub fn run(topology: &mut Topology, safety_cap: usize) -> Result<usize> {
    for tick in 0..safety_cap {
        if step(topology)? {
            return Ok(tick + 1);
        }
    }
    Ok(safety_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_network() -> Topology {
        let mut t = Topology::new();
        for n in ["tseg001", "tseg002", "tseg003"] {
            t.create_segment(Some(n.into())).unwrap();
        }
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
        t
    }

    fn junction_network() -> Topology {
        let mut t = Topology::new();
        for n in ["tseg001", "tseg002", "tseg003", "tseg004"] {
            t.create_segment(Some(n.into())).unwrap();
        }
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg004", End::A).unwrap();
        t
    }

    #[test]
    fn linear_run_reaches_destination_in_two_steps() {
        let mut t = linear_network();
        t.create_train(Some("train1".into())).unwrap();
        place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();

        assert_eq!(step_train(&mut t, "train1").unwrap(), StepOutcome::Active);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg002");

        assert_eq!(step_train(&mut t, "train1").unwrap(), StepOutcome::Done);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg003");
    }

    #[test]
    fn junction_left_fork_does_not_need_a_switch_throw() {
        let mut t = junction_network();
        t.create_train(Some("train1".into())).unwrap();
        place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();

        step_train(&mut t, "train1").unwrap(); // to tseg002
        let outcome = step_train(&mut t, "train1").unwrap(); // through junction, already left
        assert_eq!(outcome, StepOutcome::Done);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg003");
    }

    #[test]
    fn junction_right_fork_needs_one_tick_to_throw_switch() {
        let mut t = junction_network();
        t.create_train(Some("train1".into())).unwrap();
        place_train(&mut t, "train1", "tseg001", "tseg004").unwrap();

        step_train(&mut t, "train1").unwrap(); // to tseg002
        let outcome = step_train(&mut t, "train1").unwrap(); // throws switch, doesn't move
        assert_eq!(outcome, StepOutcome::Active);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg002");

        let outcome = step_train(&mut t, "train1").unwrap(); // now moves
        assert_eq!(outcome, StepOutcome::Done);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg004");
    }

    #[test]
    fn red_signal_holds_a_train_in_place() {
        let mut t = linear_network();
        t.get_segment_mut("tseg001").unwrap().place_signal(End::B).unwrap();
        t.create_train(Some("blocker".into())).unwrap();
        t.get_segment_mut("tseg002").unwrap().set_train(Some("blocker".into()));
        {
            let b = t.get_train_mut("blocker").unwrap();
            b.set_position(Some(Position {
                segment: "tseg002".into(),
                heading: End::B,
            }));
        }
        update_all_signals(&mut t);

        t.create_train(Some("train1".into())).unwrap();
        place_train(&mut t, "train1", "tseg001", "tseg003").unwrap();
        assert!(t
            .get_segment("tseg001")
            .unwrap()
            .end(End::B)
            .signal()
            .unwrap()
            .is_red());

        let outcome = step_train(&mut t, "train1").unwrap();
        assert_eq!(outcome, StepOutcome::Active);
        assert_eq!(t.get_train("train1").unwrap().position().unwrap().segment, "tseg001");
    }
}
