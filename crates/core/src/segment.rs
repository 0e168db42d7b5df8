//! Track segments: the edges of the network graph.

use crate::common::{End, PointBinding};
use crate::error::{Result, SimError};

/// A signal's colour. Never set directly by the user — only
/// [`crate::evaluator::update_all_signals`] assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Green,
}

/// A signal placed on one end of one segment.
#[derive(Debug, Clone, Copy)]
pub struct Signal {
    colour: Colour,
}

impl Signal {
    fn new() -> Self {
        // Signals start red, matching the source's RRsignal constructor.
        Self { colour: Colour::Red }
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn is_red(&self) -> bool {
        self.colour == Colour::Red
    }

    pub(crate) fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
    }
}

/// One side of a segment: its binding into a connection point's slot, and
/// an optional signal.
#[derive(Debug, Clone)]
pub struct SegmentEnd {
    binding: PointBinding,
    signal: Option<Signal>,
}

impl SegmentEnd {
    fn new(binding: PointBinding) -> Self {
        Self {
            binding,
            signal: None,
        }
    }

    pub fn binding(&self) -> &PointBinding {
        &self.binding
    }

    pub(crate) fn set_binding(&mut self, binding: PointBinding) {
        self.binding = binding;
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    pub(crate) fn signal_mut(&mut self) -> Option<&mut Signal> {
        self.signal.as_mut()
    }
}

/// A unit-length track segment with two ends, A and B.
#[derive(Debug, Clone)]
pub struct Segment {
    name: String,
    ends: [SegmentEnd; 2],
    train: Option<String>,
}

impl Segment {
    pub(crate) fn new(name: impl Into<String>, binding_a: PointBinding, binding_b: PointBinding) -> Self {
        Self {
            name: name.into(),
            ends: [SegmentEnd::new(binding_a), SegmentEnd::new(binding_b)],
            train: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn end(&self, end: End) -> &SegmentEnd {
        &self.ends[end_index(end)]
    }

    pub(crate) fn end_mut(&mut self, end: End) -> &mut SegmentEnd {
        &mut self.ends[end_index(end)]
    }

    pub fn train(&self) -> Option<&str> {
        self.train.as_deref()
    }

    pub(crate) fn set_train(&mut self, train: Option<String>) {
        self.train = train;
    }

    /// Place a signal on `end`. Fails if one is already there.
    pub fn place_signal(&mut self, end: End) -> Result<()> {
        let segment_name = self.name.clone();
        let slot = self.end_mut(end);
        if slot.signal.is_some() {
            return Err(SimError::SignalAlreadyExists {
                segment: segment_name,
                end,
            });
        }
        slot.signal = Some(Signal::new());
        Ok(())
    }
}

fn end_index(end: End) -> usize {
    match end {
        End::A => 0,
        End::B => 1,
    }
}
