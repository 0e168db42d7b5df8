//! The persisted text format: one `track: ` line per segment.
//!
//! `serialize`/`deserialize` only produce and consume `String`s; file
//! access is the caller's job.

use indexmap::IndexMap;

use crate::common::{End, PointBinding, SegmentEndRef, Slot, Switch};
use crate::error::{Result, SimError};
use crate::evaluator::update_all_signals;
use crate::point::ConnectionPoint;
use crate::segment::Segment;
use crate::topology::Topology;

const PREFIX: &str = "track: ";

/// Serialize every segment, in insertion order, as one `track: ` line.
pub fn serialize(topology: &Topology) -> String {
    let mut out = String::new();
    for segment in topology.segments() {
        let binding_a = segment.end(End::A).binding();
        let binding_b = segment.end(End::B).binding();
        out.push_str(PREFIX);
        out.push_str(&format!(
            "{},1,{},{},{},{},sigA:{},sigB:{}\n",
            segment.name(),
            binding_a.point,
            slot_wire(binding_a.slot),
            binding_b.point,
            slot_wire(binding_b.slot),
            yn(segment.end(End::A).signal().is_some()),
            yn(segment.end(End::B).signal().is_some()),
        ));
    }
    out
}

fn slot_wire(slot: Slot) -> u8 {
    slot.index() as u8
}

fn yn(b: bool) -> &'static str {
    if b {
        "Y"
    } else {
        "N"
    }
}

struct ParsedLine {
    segment: String,
    point_a: String,
    slot_a: Slot,
    point_b: String,
    slot_b: Slot,
    sig_a: bool,
    sig_b: bool,
}

fn parse_line(line: &str) -> Result<ParsedLine> {
    let rest = line
        .strip_prefix(PREFIX)
        .ok_or_else(|| SimError::FormatError(format!("missing '{PREFIX}' prefix: {line}")))?;

    let fields: Vec<&str> = rest.split(',').collect();
    if fields.len() != 8 {
        return Err(SimError::FormatError(format!(
            "expected 8 comma-separated fields, got {}: {line}",
            fields.len()
        )));
    }

    let segment = fields[0].to_string();
    let _weight = fields[1];
    let point_a = fields[2].to_string();
    let slot_a = parse_slot(fields[3])?;
    let point_b = fields[4].to_string();
    let slot_b = parse_slot(fields[5])?;
    let sig_a = parse_flag(fields[6], "sigA")?;
    let sig_b = parse_flag(fields[7], "sigB")?;

    Ok(ParsedLine {
        segment,
        point_a,
        slot_a,
        point_b,
        slot_b,
        sig_a,
        sig_b,
    })
}

fn parse_slot(field: &str) -> Result<Slot> {
    let ix: usize = field
        .parse()
        .map_err(|_| SimError::FormatError(format!("invalid slot index: {field}")))?;
    Slot::from_index(ix).ok_or(SimError::InvalidSlot(ix))
}

fn parse_flag(field: &str, expected_prefix: &str) -> Result<bool> {
    let value = field
        .strip_prefix(expected_prefix)
        .and_then(|v| v.strip_prefix(':'))
        .ok_or_else(|| SimError::FormatError(format!("expected {expected_prefix}:Y|N, got {field}")))?;
    match value {
        "Y" => Ok(true),
        "N" => Ok(false),
        other => Err(SimError::FormatError(format!(
            "expected Y or N for {expected_prefix}, got {other}"
        ))),
    }
}

/// Reset `topology` and rebuild it from a serialized string. Fails with
/// [`SimError::FormatError`] on any ambiguous line; blank lines are
/// skipped. A point name bound to a different segment end by an earlier
/// line in the same input is rejected as a double bind.
pub fn deserialize(topology: &mut Topology, text: &str) -> Result<()> {
    topology.reset();

    // Track which (point, slot) a point name has already bound, so a
    // later line can't silently rebind it to something else.
    let mut point_bindings: IndexMap<String, IndexMap<Slot, SegmentEndRef>> = IndexMap::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = parse_line(line)?;
        build_segment(topology, &mut point_bindings, parsed)?;
    }

    update_all_signals(topology);
    Ok(())
}

fn build_segment(
    topology: &mut Topology,
    point_bindings: &mut IndexMap<String, IndexMap<Slot, SegmentEndRef>>,
    parsed: ParsedLine,
) -> Result<()> {
    check_and_record_binding(
        point_bindings,
        &parsed.point_a,
        parsed.slot_a,
        SegmentEndRef {
            segment: parsed.segment.clone(),
            end: End::A,
        },
    )?;
    check_and_record_binding(
        point_bindings,
        &parsed.point_b,
        parsed.slot_b,
        SegmentEndRef {
            segment: parsed.segment.clone(),
            end: End::B,
        },
    )?;

    let segment = Segment::new(
        parsed.segment.clone(),
        PointBinding {
            point: parsed.point_a.clone(),
            slot: parsed.slot_a,
        },
        PointBinding {
            point: parsed.point_b.clone(),
            slot: parsed.slot_b,
        },
    );
    topology.insert_loaded_segment(segment)?;

    bind_point_slot(topology, &parsed.point_a, parsed.slot_a, parsed.segment.clone(), End::A)?;
    bind_point_slot(topology, &parsed.point_b, parsed.slot_b, parsed.segment.clone(), End::B)?;

    if parsed.sig_a {
        topology
            .get_segment_mut(&parsed.segment)
            .expect("just inserted")
            .place_signal(End::A)?;
    }
    if parsed.sig_b {
        topology
            .get_segment_mut(&parsed.segment)
            .expect("just inserted")
            .place_signal(End::B)?;
    }

    Ok(())
}

fn check_and_record_binding(
    point_bindings: &mut IndexMap<String, IndexMap<Slot, SegmentEndRef>>,
    point: &str,
    slot: Slot,
    end_ref: SegmentEndRef,
) -> Result<()> {
    let slots = point_bindings.entry(point.to_string()).or_default();
    match slots.get(&slot) {
        Some(existing) if existing != &end_ref => {
            return Err(SimError::FormatError(format!(
                "point {point} slot {slot:?} already bound to {}.{:?}, cannot rebind to {}.{:?}",
                existing.segment, existing.end, end_ref.segment, end_ref.end
            )))
        }
        Some(_) => {}
        None => {
            slots.insert(slot, end_ref);
        }
    }
    Ok(())
}

fn bind_point_slot(
    topology: &mut Topology,
    point_name: &str,
    slot: Slot,
    segment: String,
    end: End,
) -> Result<()> {
    topology.insert_loaded_point(ConnectionPoint::new(point_name));
    let point = topology
        .get_point_mut(point_name)
        .expect("just ensured present");
    point.set_slot(
        slot,
        Some(SegmentEndRef {
            segment,
            end,
        }),
    );
    if slot == Slot::S3 && point.switch() == Switch::None {
        point.set_switch(Switch::Left);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junction_network() -> Topology {
        let mut t = Topology::new();
        for n in ["tseg001", "tseg002", "tseg003", "tseg004"] {
            t.create_segment(Some(n.into())).unwrap();
        }
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg004", End::A).unwrap();
        t.get_segment_mut("tseg002").unwrap().place_signal(End::A).unwrap();
        t.get_segment_mut("tseg002").unwrap().place_signal(End::B).unwrap();
        t
    }

    #[test]
    fn round_trip_preserves_segments_and_signals() {
        let original = junction_network();
        let text = serialize(&original);

        let mut restored = Topology::new();
        deserialize(&mut restored, &text).unwrap();

        let original_names: Vec<_> = original.segments().map(|s| s.name().to_string()).collect();
        let restored_names: Vec<_> = restored.segments().map(|s| s.name().to_string()).collect();
        assert_eq!(original_names, restored_names);

        assert!(restored.get_segment("tseg002").unwrap().end(End::A).signal().is_some());
        assert!(restored.get_segment("tseg002").unwrap().end(End::B).signal().is_some());

        assert_eq!(serialize(&restored), text);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let original = junction_network();
        let mut text = serialize(&original);
        text = format!("\n{}\n\n{}", text, "");
        let mut restored = Topology::new();
        deserialize(&mut restored, &text).unwrap();
        assert_eq!(restored.segments().count(), 4);
    }

    #[test]
    fn missing_prefix_is_a_format_error() {
        let mut t = Topology::new();
        let err = deserialize(&mut t, "tseg001,1,node001,0,node002,0,sigA:N,sigB:N").unwrap_err();
        assert!(matches!(err, SimError::FormatError(_)));
    }

    #[test]
    fn double_bind_of_a_slot_to_a_different_end_is_a_format_error() {
        let mut t = Topology::new();
        let text = "track: tseg001,1,node001,0,node002,0,sigA:N,sigB:N\n\
                     track: tseg002,1,node001,0,node003,0,sigA:N,sigB:N\n";
        let err = deserialize(&mut t, text).unwrap_err();
        assert!(matches!(err, SimError::FormatError(_)));
    }
}
