//! Core data model and algorithms for a discrete-step railroad
//! traffic-signaling simulator: the track graph, signal evaluation,
//! breadth-first routing, and the per-tick train stepper.
//!
//! This crate performs no I/O beyond in-memory string formatting —
//! `format::serialize`/`format::deserialize` hand plain `String`s back and
//! forth, leaving file access to the caller.

pub mod common;
pub mod error;
pub mod evaluator;
pub mod format;
pub mod point;
pub mod router;
pub mod segment;
pub mod stepper;
pub mod topology;
pub mod train;

pub use common::{Demand, End, PointBinding, SegmentEndRef, Shape, Slot, Switch};
pub use error::{Result, SimError};
pub use evaluator::update_all_signals;
pub use point::ConnectionPoint;
pub use router::{find_route, Route};
pub use segment::{Colour, Segment, SegmentEnd, Signal};
pub use stepper::{place_train, run, step, step_train, StepOutcome};
pub use topology::Topology;
pub use train::{Position, Train};
