use serde::{Deserialize, Serialize};

/// Spatial extent of the substrate grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of cells along x.
    pub width: usize,
    /// Number of cells along y.
    pub height: usize,
}

impl Shape {
    #[must_use]
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Cells per component plane.
    #[must_use]
    pub const fn cells(&self) -> usize {
        self.width * self.height
    }

    #[inline(always)]
    #[must_use]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Cell index reached from `(x, y)` by `(dx, dy)` on the torus.
    #[inline(always)]
    #[must_use]
    pub fn wrapped_index(&self, x: usize, y: usize, dx: i32, dy: i32) -> usize {
        let w = self.width as i64;
        let h = self.height as i64;
        let nx = (x as i64 + dx as i64).rem_euclid(w) as usize;
        let ny = (y as i64 + dy as i64).rem_euclid(h) as usize;
        self.index(nx, ny)
    }

    /// Inverse of [`Shape::index`].
    #[inline(always)]
    #[must_use]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }
}

/// Closed value range `[lo, hi]` a channel's contents are clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lims {
    pub lo: f32,
    pub hi: f32,
}

impl Default for Lims {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Lims {
    pub const UNBOUNDED: Lims = Lims {
        lo: f32::NEG_INFINITY,
        hi: f32::INFINITY,
    };

    #[must_use]
    pub const fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.lo.is_nan() && !self.hi.is_nan() && self.lo <= self.hi
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lo == f32::NEG_INFINITY && self.hi == f32::INFINITY
    }

    #[inline(always)]
    #[must_use]
    pub fn clamp(&self, v: f32) -> f32 {
        v.max(self.lo).min(self.hi)
    }

    #[must_use]
    pub fn contains(&self, v: f32) -> bool {
        v >= self.lo && v <= self.hi
    }
}

impl From<(f32, f32)> for Lims {
    fn from((lo, hi): (f32, f32)) -> Self {
        Self::new(lo, hi)
    }
}

impl From<[f32; 2]> for Lims {
    fn from([lo, hi]: [f32; 2]) -> Self {
        Self::new(lo, hi)
    }
}

/// Logical element type of a channel.
///
/// Every channel is stored as `f32` in the shared backing store; integer
/// types quantise on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DType {
    #[default]
    F32,
    I32,
    U8,
}

impl DType {
    #[inline(always)]
    #[must_use]
    pub fn quantize(&self, v: f32) -> f32 {
        match self {
            DType::F32 => v,
            DType::I32 => v.trunc(),
            DType::U8 => v.trunc().clamp(0.0, 255.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_index_wraps_both_axes() {
        let shape = Shape::new(4, 3);
        assert_eq!(shape.wrapped_index(0, 0, -1, 0), shape.index(3, 0));
        assert_eq!(shape.wrapped_index(3, 2, 1, 1), shape.index(0, 0));
        assert_eq!(shape.wrapped_index(1, 1, 0, -4), shape.index(1, 0));
    }

    #[test]
    fn test_lims_default_is_unbounded() {
        let lims = Lims::default();
        assert!(lims.is_unbounded());
        assert_eq!(lims.clamp(1e30), 1e30);
    }

    #[test]
    fn test_lims_clamp() {
        let lims = Lims::new(-1.0, 10.0);
        assert_eq!(lims.clamp(12.0), 10.0);
        assert_eq!(lims.clamp(-3.0), -1.0);
        assert_eq!(lims.clamp(2.5), 2.5);
        assert!(!Lims::new(2.0, 1.0).is_valid());
    }

    #[test]
    fn test_dtype_quantize() {
        assert_eq!(DType::I32.quantize(2.7), 2.0);
        assert_eq!(DType::U8.quantize(300.0), 255.0);
        assert_eq!(DType::F32.quantize(0.25), 0.25);
    }
}
