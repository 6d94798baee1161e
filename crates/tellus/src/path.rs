//! Quadtree patch paths.
//!
//! A patch's place in its face's quadtree is its path: the sequence of
//! quadrant digits walked from the root. Digits pack 2 bits each into a
//! `u64`, so paths are `Copy`, hashable and cheap to pass around, and the
//! face region they denote is recomputed on demand.

use std::fmt;

use glam::DVec3;
use tellus_patch::{Face, UvRect, cube_to_sphere};

/// Path of one quadtree cell: face, depth and packed quadrant digits.
///
/// Quadrant digits are `0..4`, bit `0` selecting +U and bit `1` selecting
/// +V within the parent's rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchPath {
    face: Face,
    depth: u32,
    bits: u64,
}

impl PatchPath {
    /// Deepest representable path: 2 bits per digit in a `u64`, one level
    /// held back so `child` can always be asserted against the limit.
    pub const MAX_DEPTH: u32 = 31;

    /// The root path of a face (the whole face).
    #[must_use]
    pub fn root(face: Face) -> Self {
        Self {
            face,
            depth: 0,
            bits: 0,
        }
    }

    /// The face this path belongs to.
    #[must_use]
    pub fn face(self) -> Face {
        self.face
    }

    /// Depth below the root; the root is 0.
    #[must_use]
    pub fn depth(self) -> u32 {
        self.depth
    }

    /// Path of the `quadrant`-th child.
    ///
    /// # Panics
    ///
    /// Panics when `quadrant >= 4` or the path is already at
    /// [`MAX_DEPTH`](Self::MAX_DEPTH); both are caller bugs.
    #[must_use]
    pub fn child(self, quadrant: u8) -> Self {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        assert!(
            self.depth < Self::MAX_DEPTH,
            "path already at maximum depth {}",
            Self::MAX_DEPTH
        );
        Self {
            face: self.face,
            depth: self.depth + 1,
            bits: self.bits | u64::from(quadrant) << (2 * self.depth),
        }
    }

    /// Path of the parent cell, or `None` at the root.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        if self.depth == 0 {
            return None;
        }
        let depth = self.depth - 1;
        Some(Self {
            face: self.face,
            depth,
            bits: self.bits & !(0b11 << (2 * depth)),
        })
    }

    /// The quadrant this cell occupies in its parent, or `None` at the
    /// root.
    #[must_use]
    pub fn quadrant(self) -> Option<u8> {
        if self.depth == 0 {
            return None;
        }
        Some((self.bits >> (2 * (self.depth - 1)) & 0b11) as u8)
    }

    /// The face region this path denotes, in `[-1, 1]²` face coordinates.
    #[must_use]
    pub fn uv_rect(self) -> UvRect {
        let mut rect = UvRect::FULL;
        for level in 0..self.depth {
            let digit = self.bits >> (2 * level) & 0b11;
            rect.half *= 0.5;
            rect.center_u += if digit & 0b01 == 0 { -rect.half } else { rect.half };
            rect.center_v += if digit & 0b10 == 0 { -rect.half } else { rect.half };
        }
        rect
    }

    /// Unit direction from the planet center through the cell's center.
    #[must_use]
    pub fn center_direction(self) -> DVec3 {
        let rect = self.uv_rect();
        cube_to_sphere(self.face.direction(rect.center_u, rect.center_v))
    }

    /// Side length of the cell in meters, on a planet of the given radius.
    /// Halves with each level of depth.
    #[must_use]
    pub fn side_length(self, radius: f64) -> f64 {
        2.0 * radius / f64::from(1u32 << self.depth.min(31))
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:", self.face)?;
        if self.depth == 0 {
            return write!(f, "root");
        }
        for level in 0..self.depth {
            let digit = self.bits >> (2 * level) & 0b11;
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}
