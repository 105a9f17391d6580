//! Contact manifold types

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Transform, Vec2};

/// Pack two feature indices into a contact id
#[inline]
pub fn make_id(a: usize, b: usize) -> u16 {
    debug_assert!(a <= usize::from(u8::MAX) && b <= usize::from(u8::MAX));
    ((a as u16 & 0xFF) << 8) | (b as u16 & 0xFF)
}

/// A contact point between two shapes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManifoldPoint {
    /// Location of the contact point in world space
    pub point: Vec2,
    /// Location of the contact point relative to shape A's origin in world space
    pub anchor_a: Vec2,
    /// Location of the contact point relative to shape B's origin in world space
    pub anchor_b: Vec2,
    /// The separation of the contact point, negative if penetrating
    pub separation: f32,
    /// The impulse along the manifold normal vector
    pub normal_impulse: f32,
    /// The friction impulse
    pub tangent_impulse: f32,
    /// The maximum normal impulse applied during sub-stepping
    pub max_normal_impulse: f32,
    /// Relative normal velocity pre-solve
    pub normal_velocity: f32,
    /// Uniquely identifies a contact point between two shapes
    pub id: u16,
    /// Did this contact point exist the previous step?
    pub persisted: bool,
}

/// Contact points and normal shared by two touching shapes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifold {
    /// The unit normal vector in world space, points from shape A to shape B
    pub normal: Vec2,
    /// Angular impulse applied for rolling resistance
    pub rolling_impulse: f32,
    /// The manifold points, up to two are possible in 2D
    pub points: [ManifoldPoint; 2],
    /// The number of contact points, will be 0, 1, or 2
    pub point_count: usize,
}

impl Manifold {
    /// The live contact points
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// No contact points
    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Append a point in A's local frame. Anchors are finished by [`Self::into_world`].
    pub(crate) fn push_local(&mut self, anchor: Vec2, separation: f32, id: u16) {
        debug_assert!(self.point_count < 2);
        self.points[self.point_count] = ManifoldPoint {
            anchor_a: anchor,
            separation,
            id,
            ..ManifoldPoint::default()
        };
        self.point_count += 1;
    }

    /// Move a manifold built in A's local frame into world space.
    ///
    /// `origin` is the offset of the frame the points were built in, relative to
    /// A's origin; routines that shift A to improve precision pass that shift.
    pub(crate) fn into_world(mut self, xf_a: &Transform, origin: Vec2, xf_b: &Transform) -> Self {
        self.normal = xf_a.q.rotate(self.normal);
        for mp in &mut self.points[..self.point_count] {
            // Anchor points relative to shape origin in world space
            mp.anchor_a = xf_a.q.rotate(mp.anchor_a + origin);
            mp.anchor_b = mp.anchor_a + (xf_a.p - xf_b.p);
            mp.point = xf_a.p + mp.anchor_a;
        }
        self
    }

    /// The same contact seen from shape B: reversed normal, swapped anchors and ids
    pub fn flipped(&self) -> Self {
        let mut m = *self;
        m.normal = -self.normal;
        for mp in &mut m.points[..m.point_count] {
            std::mem::swap(&mut mp.anchor_a, &mut mp.anchor_b);
            mp.id = mp.id.rotate_left(8);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;

    #[test]
    fn test_make_id_packs_bytes() {
        assert_eq!(make_id(0, 0), 0);
        assert_eq!(make_id(1, 2), 0x0102);
        assert_eq!(make_id(7, 0), 0x0700);
    }

    #[test]
    fn test_into_world_anchors() {
        let mut m = Manifold {
            normal: vec2(1.0, 0.0),
            ..Manifold::default()
        };
        m.push_local(vec2(1.0, 0.0), -0.1, make_id(0, 1));

        let xf_a = Transform::from_position(vec2(2.0, 3.0));
        let xf_b = Transform::from_position(vec2(4.0, 3.0));
        let m = m.into_world(&xf_a, vec2(0.5, 0.0), &xf_b);

        let mp = m.points()[0];
        assert_eq!(mp.anchor_a, vec2(1.5, 0.0));
        assert_eq!(mp.point, vec2(3.5, 3.0));
        assert_eq!(mp.anchor_b, vec2(-0.5, 0.0));
    }

    #[test]
    fn test_flipped_swaps_sides() {
        let mut m = Manifold {
            normal: vec2(0.0, 1.0),
            ..Manifold::default()
        };
        m.push_local(vec2(1.0, 2.0), 0.0, make_id(3, 4));
        m.points[0].anchor_b = vec2(5.0, 6.0);

        let f = m.flipped();
        assert_eq!(f.normal, vec2(0.0, -1.0));
        assert_eq!(f.points[0].anchor_a, vec2(5.0, 6.0));
        assert_eq!(f.points[0].anchor_b, vec2(1.0, 2.0));
        assert_eq!(f.points[0].id, make_id(4, 3));
        assert_eq!(f.flipped(), m);
    }
}
