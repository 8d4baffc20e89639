use glam::DVec3;

/// Axis-aligned bounding box in medium space. Grounded on the teacher's
/// `Bounds` type (`bvh.rs`); here it's the cuboid medium's bounds and the
/// majorant grid's domain, not a BVH node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Aabb { min, max }
    }

    pub fn diagonal(&self) -> DVec3 {
        self.max - self.min
    }

    /// Position of a world-space point in unit-cube coordinates relative to
    /// this box (0 at `min`, 1 at `max` along each axis).
    pub fn offset(&self, p: DVec3) -> DVec3 {
        (p - self.min) / self.diagonal()
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Intersects a ray with this box, clamped to `[0, t_max]`. Returns the
    /// entry/exit parameters along the ray, or `None` if they don't overlap.
    pub fn ray_intersect(&self, origin: DVec3, dir: DVec3, t_max: f64) -> Option<(f64, f64)> {
        let t_lo = (self.min - origin) / dir;
        let t_hi = (self.max - origin) / dir;
        let t_near = t_lo.min(t_hi);
        let t_far = t_lo.max(t_hi);
        let t0 = t_near.max_element().max(0.0);
        let t1 = t_far.min_element().min(t_max);
        (t0 <= t1).then_some((t0, t1))
    }
}
