//! Signal evaluation: a pure function of topology and train state.

use std::collections::HashSet;

use tracing::debug;

use crate::common::{End, SegmentEndRef, Shape};
use crate::segment::Colour;
use crate::topology::Topology;

/// Recompute every placed signal's colour. Called after any mutation that
/// can change a signal's answer: placement, connection, switch toggle,
/// train placement, and every simulation step.
pub fn update_all_signals(topology: &mut Topology) {
    let segment_names: Vec<String> = topology.segments().map(|s| s.name().to_string()).collect();

    for name in &segment_names {
        for end in [End::A, End::B] {
            let has_signal = topology
                .get_segment(name)
                .map(|s| s.end(end).signal().is_some())
                .unwrap_or(false);
            if !has_signal {
                continue;
            }
            let colour = evaluate_signal(topology, name, end);
            if let Some(seg) = topology.get_segment_mut(name) {
                if let Some(signal) = seg.end_mut(end).signal_mut() {
                    signal.set_colour(colour);
                }
            }
        }
    }
    debug!("recomputed all signals");
}

fn evaluate_signal(topology: &Topology, segment: &str, end: End) -> Colour {
    let binding = match topology.get_segment(segment) {
        Some(seg) => seg.end(end).binding().clone(),
        None => return Colour::Red,
    };

    let point = match topology.get_point(&binding.point) {
        Some(p) => p,
        None => return Colour::Red,
    };

    let next = match point.next_through_slot(binding.slot) {
        Some(n) => n,
        None => return Colour::Red,
    };

    if topology
        .get_segment(&next.segment)
        .and_then(|s| s.train())
        .is_some()
    {
        return Colour::Red;
    }

    walk_corridor(topology, next)
}

/// Walk forward from `entry` (the segment immediately beyond the signal)
/// looking for an oncoming train before the next junction. `entry.end` is
/// the end by which the walk enters that segment.
fn walk_corridor(topology: &Topology, entry: SegmentEndRef) -> Colour {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = entry;

    loop {
        if visited.contains(&current.segment) {
            // Looped back without hitting a junction: treat as clear.
            return Colour::Green;
        }
        visited.insert(current.segment.clone());

        let segment = match topology.get_segment(&current.segment) {
            Some(s) => s,
            None => return Colour::Green,
        };

        if let Some(train_name) = segment.train() {
            if let Some(train) = topology.get_train(train_name) {
                if let Some(pos) = train.position() {
                    if pos.segment == current.segment && pos.heading == current.end {
                        return Colour::Red;
                    }
                }
            }
        }

        let far_end = current.end.opposite();
        let far_binding = segment.end(far_end).binding().clone();
        let far_point = match topology.get_point(&far_binding.point) {
            Some(p) => p,
            None => return Colour::Green,
        };

        if far_point.shape() == Shape::Junction {
            return Colour::Green;
        }

        match far_point.next_through_slot(far_binding.slot) {
            Some(next) => current = next,
            None => return Colour::Green,
        }
    }
}
