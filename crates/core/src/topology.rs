//! The topology store: sole owner of every segment, point, and train.

use indexmap::IndexMap;
use tracing::debug;

use crate::common::{End, PointBinding, SegmentEndRef, Slot, Switch};
use crate::error::{Result, SimError};
use crate::point::ConnectionPoint;
use crate::segment::Segment;
use crate::train::Train;

/// Owns every segment, point, and train by name. Every cross-reference
/// inside the network is a `String` name looked back up through one of
/// these three maps rather than a pointer, so the whole graph can be reset
/// atomically without leaving a dangling reference anywhere.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    segments: IndexMap<String, Segment>,
    points: IndexMap<String, ConnectionPoint>,
    trains: IndexMap<String, Train>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    pub(crate) fn get_segment_mut(&mut self, name: &str) -> Option<&mut Segment> {
        self.segments.get_mut(name)
    }

    pub fn get_point(&self, name: &str) -> Option<&ConnectionPoint> {
        self.points.get(name)
    }

    pub(crate) fn get_point_mut(&mut self, name: &str) -> Option<&mut ConnectionPoint> {
        self.points.get_mut(name)
    }

    pub fn get_train(&self, name: &str) -> Option<&Train> {
        self.trains.get(name)
    }

    pub(crate) fn get_train_mut(&mut self, name: &str) -> Option<&mut Train> {
        self.trains.get_mut(name)
    }

    /// Segments in insertion order, used for listing and serialization.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn points(&self) -> impl Iterator<Item = &ConnectionPoint> {
        self.points.values()
    }

    pub fn trains(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    /// Every point currently in junction shape, in insertion order.
    pub fn all_junctions(&self) -> Vec<&ConnectionPoint> {
        self.points
            .values()
            .filter(|p| p.shape() == crate::common::Shape::Junction)
            .collect()
    }

    /// Drop every segment, point, and train. Every outstanding name-based
    /// reference becomes stale at once.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.points.clear();
        self.trains.clear();
        debug!("topology reset");
    }

    fn lowest_free_name(&self, prefix: &str, exists: impl Fn(&str) -> bool) -> String {
        let mut ix = 1usize;
        loop {
            let candidate = format!("{prefix}{ix:03}");
            if !exists(&candidate) {
                return candidate;
            }
            ix += 1;
        }
    }

    fn lowest_free_train_name(&self) -> String {
        let mut ix = 1usize;
        loop {
            let candidate = format!("train{ix}");
            if !self.trains.contains_key(&candidate) {
                return candidate;
            }
            ix += 1;
        }
    }

    fn resolve_segment_name(&self, name: Option<String>) -> Result<String> {
        match name {
            Some(n) => {
                if self.segments.contains_key(&n) {
                    Err(SimError::NameCollision(n))
                } else {
                    Ok(n)
                }
            }
            None => Ok(self.lowest_free_name("tseg", |n| self.segments.contains_key(n))),
        }
    }

    fn resolve_point_name(&self, name: Option<String>) -> Result<String> {
        match name {
            Some(n) => {
                if self.points.contains_key(&n) {
                    Err(SimError::NameCollision(n))
                } else {
                    Ok(n)
                }
            }
            None => Ok(self.lowest_free_name("node", |n| self.points.contains_key(n))),
        }
    }

    fn resolve_train_name(&self, name: Option<String>) -> Result<String> {
        match name {
            Some(n) => {
                if self.trains.contains_key(&n) {
                    Err(SimError::NameCollision(n))
                } else {
                    Ok(n)
                }
            }
            None => Ok(self.lowest_free_train_name()),
        }
    }

    /// Create a new segment with two fresh terminator points.
    pub fn create_segment(&mut self, name: Option<String>) -> Result<&Segment> {
        let seg_name = self.resolve_segment_name(name)?;
        let point_a_name = self.resolve_point_name(None)?;
        let point_b_name = self.resolve_point_name(None)?;

        let mut point_a = ConnectionPoint::new(point_a_name.clone());
        let mut point_b = ConnectionPoint::new(point_b_name.clone());
        point_a.make_terminator(SegmentEndRef {
            segment: seg_name.clone(),
            end: End::A,
        })?;
        point_b.make_terminator(SegmentEndRef {
            segment: seg_name.clone(),
            end: End::B,
        })?;

        let segment = Segment::new(
            seg_name.clone(),
            PointBinding {
                point: point_a_name.clone(),
                slot: Slot::S1,
            },
            PointBinding {
                point: point_b_name.clone(),
                slot: Slot::S1,
            },
        );

        self.points.insert(point_a_name, point_a);
        self.points.insert(point_b_name, point_b);
        self.segments.insert(seg_name.clone(), segment);
        debug!(segment = %seg_name, "created segment");
        Ok(self.segments.get(&seg_name).expect("just inserted"))
    }

    pub fn create_train(&mut self, name: Option<String>) -> Result<&Train> {
        let train_name = self.resolve_train_name(name)?;
        self.trains.insert(train_name.clone(), Train::new(train_name.clone()));
        debug!(train = %train_name, "created train");
        Ok(self.trains.get(&train_name).expect("just inserted"))
    }

    /// Connect segment `a` at `end_a` to segment `b` at `end_b`. See the
    /// module-level design notes on connection-point promotion for the
    /// full case analysis.
    pub fn connect_segments(
        &mut self,
        a: &str,
        end_a: End,
        b: &str,
        end_b: End,
    ) -> Result<()> {
        if a == b && end_a == end_b {
            return Err(SimError::SelfJunction {
                segment: a.to_string(),
            });
        }

        let binding_a = self
            .segments
            .get(a)
            .ok_or_else(|| SimError::UnknownName {
                kind: "segment",
                name: a.to_string(),
            })?
            .end(end_a)
            .binding()
            .clone();
        let binding_b = self
            .segments
            .get(b)
            .ok_or_else(|| SimError::UnknownName {
                kind: "segment",
                name: b.to_string(),
            })?
            .end(end_b)
            .binding()
            .clone();

        let point_p_name = binding_a.point.clone();
        let point_q_name = binding_b.point.clone();

        let q = self
            .points
            .get(&point_q_name)
            .ok_or_else(|| SimError::UnknownName {
                kind: "point",
                name: point_q_name.clone(),
            })?;
        if q.shape() != crate::common::Shape::Terminator {
            return Err(SimError::EndpointOccupied {
                segment: b.to_string(),
                end: end_b,
            });
        }

        let p = self
            .points
            .get(&point_p_name)
            .ok_or_else(|| SimError::UnknownName {
                kind: "point",
                name: point_p_name.clone(),
            })?;

        let new_ref = SegmentEndRef {
            segment: b.to_string(),
            end: end_b,
        };

        match p.shape() {
            crate::common::Shape::Terminator => {
                let p = self.points.get_mut(&point_p_name).expect("checked above");
                p.make_continuation(new_ref)?;
                self.rebind_segment_end(b, end_b, &point_p_name, Slot::S2);
                self.discard_point(&point_q_name);
            }
            crate::common::Shape::Continuation => {
                let common = p
                    .slot(Slot::S1)
                    .cloned()
                    .expect("continuation always has slot 1 bound");
                if common.segment == b {
                    return Err(SimError::SelfJunction {
                        segment: a.to_string(),
                    });
                }
                let left = p
                    .slot(Slot::S2)
                    .cloned()
                    .expect("continuation always has slot 2 bound");
                if left.segment == b {
                    return Err(SimError::SelfJunction {
                        segment: a.to_string(),
                    });
                }

                let p = self.points.get_mut(&point_p_name).expect("checked above");
                // If the common edge is currently in slot 2, transpose so
                // slot 1 stays the common before promoting to junction.
                if binding_a.slot == Slot::S2 {
                    p.set_slot(Slot::S1, Some(left.clone()));
                    p.set_slot(Slot::S2, Some(common.clone()));
                    self.rebind_segment_end(&left.segment, left.end, &point_p_name, Slot::S1);
                    self.rebind_segment_end(&common.segment, common.end, &point_p_name, Slot::S2);
                }
                let p = self.points.get_mut(&point_p_name).expect("checked above");
                p.make_junction(new_ref)?;
                self.rebind_segment_end(b, end_b, &point_p_name, Slot::S3);
                self.discard_point(&point_q_name);
            }
            crate::common::Shape::Junction => {
                return Err(SimError::PointFull {
                    point: point_p_name,
                });
            }
            crate::common::Shape::Empty => {
                return Err(SimError::InvariantViolation(format!(
                    "point {point_p_name} bound to a segment end is empty"
                )));
            }
        }

        debug!(a, ?end_a, b, ?end_b, "connected segments");
        Ok(())
    }

    /// Place a signal on `(segment, end)`. The only public way to mutate a
    /// segment end once it exists — callers never reach `Segment` directly.
    pub fn place_signal(&mut self, segment: &str, end: End) -> Result<()> {
        let seg = self
            .segments
            .get_mut(segment)
            .ok_or_else(|| SimError::UnknownName {
                kind: "segment",
                name: segment.to_string(),
            })?;
        seg.place_signal(end)
    }

    /// Throw `point`'s switch to `switch`. The only public way to mutate a
    /// junction's switch state; harmless (and overwritten on the next
    /// promotion) if called before the point is actually a junction.
    pub fn set_switch(&mut self, point: &str, switch: Switch) -> Result<()> {
        let p = self
            .points
            .get_mut(point)
            .ok_or_else(|| SimError::UnknownName {
                kind: "point",
                name: point.to_string(),
            })?;
        p.set_switch(switch);
        Ok(())
    }

    /// Remove `train` from the network: clears its occupied segment (if
    /// any) and drops it from the train map entirely. Not part of the
    /// source's menu surface, but needed to model a train being taken out
    /// of service without a whole-network reset.
    pub fn remove_train(&mut self, name: &str) -> Result<()> {
        let train = self
            .trains
            .get(name)
            .ok_or_else(|| SimError::UnknownName {
                kind: "train",
                name: name.to_string(),
            })?;
        if let Some(pos) = train.position() {
            let segment = pos.segment.clone();
            if let Some(seg) = self.segments.get_mut(&segment) {
                if seg.train() == Some(name) {
                    seg.set_train(None);
                }
            }
        }
        self.trains.shift_remove(name);
        Ok(())
    }

    fn rebind_segment_end(&mut self, segment: &str, end: End, point: &str, slot: Slot) {
        if let Some(seg) = self.segments.get_mut(segment) {
            seg.end_mut(end).set_binding(PointBinding {
                point: point.to_string(),
                slot,
            });
        }
    }

    /// Q is superseded by P once A connects to B; Q never held any other
    /// reference so it can simply be dropped from the map.
    fn discard_point(&mut self, name: &str) {
        self.points.shift_remove(name);
    }

    /// Insert a segment built directly from a persisted line. Used only by
    /// [`crate::format::deserialize`], which reconstructs bindings itself
    /// instead of going through [`Topology::create_segment`].
    pub(crate) fn insert_loaded_segment(&mut self, segment: Segment) -> Result<()> {
        let name = segment.name().to_string();
        if self.segments.contains_key(&name) {
            return Err(SimError::NameCollision(name));
        }
        self.segments.insert(name, segment);
        Ok(())
    }

    /// Insert a fresh, empty point by name if one with that name doesn't
    /// already exist. Used only by [`crate::format::deserialize`].
    pub(crate) fn insert_loaded_point(&mut self, point: ConnectionPoint) {
        self.points.entry(point.name().to_string()).or_insert(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_segment_allocates_two_terminator_points() {
        let mut t = Topology::new();
        let seg = t.create_segment(None).unwrap();
        let seg_name = seg.name().to_string();
        let binding_a = seg.end(End::A).binding().clone();
        let binding_b = seg.end(End::B).binding().clone();

        assert_eq!(t.get_point(&binding_a.point).unwrap().shape(), crate::common::Shape::Terminator);
        assert_eq!(t.get_point(&binding_b.point).unwrap().shape(), crate::common::Shape::Terminator);
        assert_eq!(seg_name, "tseg001");
    }

    #[test]
    fn name_generation_picks_lowest_free_index() {
        let mut t = Topology::new();
        t.create_segment(None).unwrap();
        t.create_segment(None).unwrap();
        let third = t.create_segment(Some("tseg099".into())).unwrap().name().to_string();
        assert_eq!(third, "tseg099");
        let fourth = t.create_segment(None).unwrap().name().to_string();
        assert_eq!(fourth, "tseg003");
    }

    #[test]
    fn connect_promotes_terminator_to_continuation() {
        let mut t = Topology::new();
        t.create_segment(Some("tseg001".into())).unwrap();
        t.create_segment(Some("tseg002".into())).unwrap();
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();

        let p_name = t.get_segment("tseg001").unwrap().end(End::B).binding().point.clone();
        let p = t.get_point(&p_name).unwrap();
        assert_eq!(p.shape(), crate::common::Shape::Continuation);
        assert_eq!(
            t.get_segment("tseg002").unwrap().end(End::A).binding().point,
            p_name
        );
    }

    #[test]
    fn connect_promotes_continuation_to_junction() {
        let mut t = Topology::new();
        for n in ["tseg001", "tseg002", "tseg003"] {
            t.create_segment(Some(n.into())).unwrap();
        }
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
        t.connect_segments("tseg002", End::B, "tseg003", End::A).unwrap();

        let p_name = t.get_segment("tseg002").unwrap().end(End::B).binding().point.clone();
        let p = t.get_point(&p_name).unwrap();
        assert_eq!(p.shape(), crate::common::Shape::Junction);
        assert_eq!(p.switch(), Switch::Left);
        assert_eq!(p.slot(Slot::S1).unwrap().segment, "tseg002");
    }

    #[test]
    fn connecting_occupied_endpoint_fails() {
        let mut t = Topology::new();
        for n in ["tseg001", "tseg002", "tseg003"] {
            t.create_segment(Some(n.into())).unwrap();
        }
        t.connect_segments("tseg001", End::B, "tseg002", End::A).unwrap();
        let err = t.connect_segments("tseg003", End::A, "tseg002", End::A).unwrap_err();
        assert!(matches!(err, SimError::EndpointOccupied { .. }));
    }

    #[test]
    fn place_signal_then_reject_duplicate() {
        let mut t = Topology::new();
        t.create_segment(Some("tseg001".into())).unwrap();
        t.place_signal("tseg001", End::A).unwrap();
        assert!(t.place_signal("tseg001", End::A).is_err());
    }

    #[test]
    fn set_switch_on_unknown_point_fails() {
        let mut t = Topology::new();
        let err = t.set_switch("node999", Switch::Left).unwrap_err();
        assert!(matches!(err, SimError::UnknownName { .. }));
    }

    #[test]
    fn reset_clears_everything() {
        let mut t = Topology::new();
        t.create_segment(None).unwrap();
        t.create_train(None).unwrap();
        t.reset();
        assert_eq!(t.segments().count(), 0);
        assert_eq!(t.points().count(), 0);
        assert_eq!(t.trains().count(), 0);
    }
}
