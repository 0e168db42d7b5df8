use thiserror::Error;

/// Errors produced by the topology store and the algorithms that sit on top
/// of it (signal evaluation, routing, stepping) and by the persisted format
/// codec.
///
/// [`SimError::InvariantViolation`] signals a bug in this crate rather than
/// bad caller input; every other variant is a recoverable user-facing error
/// that leaves the topology untouched.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("name already in use: {0}")]
    NameCollision(String),

    #[error("no such {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("segment {segment} end {end:?} is already connected")]
    EndpointOccupied { segment: String, end: crate::common::End },

    #[error("segment {segment} end {end:?} already carries a signal")]
    SignalAlreadyExists { segment: String, end: crate::common::End },

    #[error("cannot connect segment {segment} to itself")]
    SelfJunction { segment: String },

    #[error("point {point} already has all three slots filled")]
    PointFull { point: String },

    #[error("invalid slot index: {0}")]
    InvalidSlot(usize),

    #[error("invalid end designator: {0}")]
    InvalidEnd(String),

    #[error("train {train} is already on segment {segment}")]
    TrainAlreadyOnSegment { train: String, segment: String },

    #[error("train {train} collided with train {other} on segment {segment}")]
    Collision {
        train: String,
        other: String,
        segment: String,
    },

    #[error("no route from {start} to {end}")]
    Unreachable { start: String, end: String },

    #[error("format error: {0}")]
    FormatError(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
