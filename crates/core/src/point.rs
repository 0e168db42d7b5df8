//! Connection-point state machine.
//!
//! A point's shape (empty / terminator / continuation / junction) is never
//! stored — it is always derived from which slots are occupied, per the
//! design note that shape is a view, not a field.

use crate::common::{End, SegmentEndRef, Shape, Slot, Switch};
use crate::error::{Result, SimError};

/// A connection point: up to three slots, each optionally bound to one end
/// of one segment, plus the junction switch state (meaningless until slot 3
/// fills).
#[derive(Debug, Clone)]
pub struct ConnectionPoint {
    name: String,
    slots: [Option<SegmentEndRef>; 3],
    switch: Switch,
}

impl ConnectionPoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: [None, None, None],
            switch: Switch::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn switch(&self) -> Switch {
        self.switch
    }

    /// The derived shape: empty / terminator / continuation / junction,
    /// based on which slots are occupied.
    pub fn shape(&self) -> Shape {
        if self.slots[Slot::S3.index()].is_some() {
            Shape::Junction
        } else if self.slots[Slot::S2.index()].is_some() {
            Shape::Continuation
        } else if self.slots[Slot::S1.index()].is_some() {
            Shape::Terminator
        } else {
            Shape::Empty
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&SegmentEndRef> {
        self.slots[slot.index()].as_ref()
    }

    pub(crate) fn set_slot(&mut self, slot: Slot, binding: Option<SegmentEndRef>) {
        self.slots[slot.index()] = binding;
    }

    pub(crate) fn set_switch(&mut self, switch: Switch) {
        self.switch = switch;
    }

    /// Bind slot 1 of a freshly created, empty point. Used only when a
    /// segment is first created (both its terminator points start empty).
    pub(crate) fn make_terminator(&mut self, track: SegmentEndRef) -> Result<()> {
        if self.shape() != Shape::Empty {
            return Err(SimError::InvariantViolation(format!(
                "make_terminator called on non-empty point {}",
                self.name
            )));
        }
        self.slots[Slot::S1.index()] = Some(track);
        Ok(())
    }

    /// Promote a terminator to a continuation by filling slot 2.
    pub(crate) fn make_continuation(&mut self, track: SegmentEndRef) -> Result<()> {
        if self.shape() != Shape::Terminator {
            return Err(SimError::InvariantViolation(format!(
                "make_continuation called on non-terminator point {}",
                self.name
            )));
        }
        self.slots[Slot::S2.index()] = Some(track);
        Ok(())
    }

    /// Promote a continuation to a junction by filling slot 3. The switch
    /// state initialises to `Left`. Does not perform the slot 1/2 transpose
    /// (the caller — [`crate::topology::Topology::connect_segments`] — must
    /// do that first if the common edge currently sits in slot 2).
    pub(crate) fn make_junction(&mut self, track: SegmentEndRef) -> Result<()> {
        if self.shape() != Shape::Continuation {
            return Err(SimError::InvariantViolation(format!(
                "make_junction called on non-continuation point {}",
                self.name
            )));
        }
        self.slots[Slot::S3.index()] = Some(track);
        self.switch = Switch::Left;
        Ok(())
    }

    /// The traversal primitive: from entry `slot`, what segment-end would a
    /// train or signal walk cross to next? `None` means dead end (terminator,
    /// not-yet-switched junction, or the fork the switch doesn't connect).
    pub fn next_through_slot(&self, slot: Slot) -> Option<SegmentEndRef> {
        match self.shape() {
            Shape::Empty | Shape::Terminator => None,
            Shape::Continuation => match slot {
                Slot::S1 => self.slots[Slot::S2.index()].clone(),
                Slot::S2 => self.slots[Slot::S1.index()].clone(),
                Slot::S3 => None,
            },
            Shape::Junction => match self.switch {
                Switch::Left => match slot {
                    Slot::S1 => self.slots[Slot::S2.index()].clone(),
                    Slot::S2 => self.slots[Slot::S1.index()].clone(),
                    Slot::S3 => None,
                },
                Switch::Right => match slot {
                    Slot::S1 => self.slots[Slot::S3.index()].clone(),
                    Slot::S3 => self.slots[Slot::S1.index()].clone(),
                    Slot::S2 => None,
                },
                Switch::None => None,
            },
        }
    }

    /// Every occupied slot as (slot, binding) pairs, lowest slot first.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (Slot, &SegmentEndRef)> {
        [Slot::S1, Slot::S2, Slot::S3]
            .into_iter()
            .filter_map(|s| self.slot(s).map(|b| (s, b)))
    }
}
