//! Element records shared by the final mesh and the edit mesh.

use bitflags::bitflags;

use crate::core::{Error, Result};
use crate::core::types::{Vec2, Vec3};

bitflags! {
    /// Per-element state flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElemFlags: u16 {
        const HIDDEN = 1 << 0;
        const SELECT = 1 << 1;
        /// Faces only: smooth shading.
        const SMOOTH = 1 << 2;
        /// Edges only: UV seam.
        const SEAM = 1 << 3;
        /// Edges only: splits smooth normals.
        const SHARP = 1 << 4;
        /// Edges only: not used by any face.
        const LOOSE = 1 << 5;
    }
}

/// Marker for "no original element" in origindex layers.
pub const ORIGINDEX_NONE: i32 = -1;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVert {
    pub co: Vec3,
    pub flag: ElemFlags,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshEdge {
    pub v: [u32; 2],
    pub flag: ElemFlags,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshPoly {
    pub loopstart: u32,
    pub totloop: u32,
    pub mat_nr: u16,
    pub flag: ElemFlags,
}

impl MeshPoly {
    /// Loop indices of this polygon.
    pub fn loops(&self) -> std::ops::Range<usize> {
        self.loopstart as usize..(self.loopstart + self.totloop) as usize
    }
}

/// Face corner: vertex and the edge leading to the next corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshLoop {
    pub v: u32,
    pub e: u32,
}

/// Triangle of a triangulated polygon, as loop indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopTri {
    pub tri: [u32; 3],
    pub poly: u32,
}

/// Per-loop UV coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

/// Mapping from evaluated elements back to the original mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrigIndex {
    pub vert: Vec<i32>,
    pub edge: Vec<i32>,
    pub poly: Vec<i32>,
}

impl OrigIndex {
    /// Identity mapping for a mesh with the given counts.
    pub fn identity(vert_len: usize, edge_len: usize, poly_len: usize) -> Self {
        Self {
            vert: (0..vert_len as i32).collect(),
            edge: (0..edge_len as i32).collect(),
            poly: (0..poly_len as i32).collect(),
        }
    }
}

/// Number of triangles produced by triangulating `poly_len` polygons with `loop_len` corners.
pub fn poly_to_tri_count(poly_len: usize, loop_len: usize) -> usize {
    loop_len.saturating_sub(2 * poly_len)
}

/// Check that polygon loop spans `(start, len)` cover every loop exactly once.
pub fn check_loop_spans(spans: impl Iterator<Item = (u32, u32)>, loop_len: usize) -> Result<()> {
    let mut used = vec![false; loop_len];
    for (i, (start, len)) in spans.enumerate() {
        let (start, len) = (start as usize, len as usize);
        if len < 3 || start + len > loop_len {
            return Err(Error::InvalidMesh(format!("polygon {} has invalid loop range", i)));
        }
        for l in start..start + len {
            if std::mem::replace(&mut used[l], true) {
                return Err(Error::InvalidMesh(format!("loop {} is shared by polygon {}", l, i)));
            }
        }
    }
    if let Some(l) = used.iter().position(|&u| !u) {
        return Err(Error::InvalidMesh(format!("loop {} belongs to no polygon", l)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly_to_tri_count() {
        // Two quads
        assert_eq!(poly_to_tri_count(2, 8), 4);
        // One triangle
        assert_eq!(poly_to_tri_count(1, 3), 1);
        assert_eq!(poly_to_tri_count(0, 0), 0);
    }

    #[test]
    fn test_loop_spans_cover_loops() {
        assert!(check_loop_spans([(0, 4), (4, 3)].into_iter(), 7).is_ok());
        // Out of order is fine as long as every loop is covered once
        assert!(check_loop_spans([(3, 4), (0, 3)].into_iter(), 7).is_ok());
        // Orphaned tail
        assert!(check_loop_spans([(0, 4)].into_iter(), 8).is_err());
        // Overlap
        assert!(check_loop_spans([(0, 4), (2, 4)].into_iter(), 6).is_err());
        assert!(check_loop_spans([(0, 2)].into_iter(), 2).is_err());
    }

    #[test]
    fn test_poly_loops_range() {
        let poly = MeshPoly { loopstart: 4, totloop: 3, ..Default::default() };
        assert_eq!(poly.loops(), 4..7);
    }

    #[test]
    fn test_origindex_identity() {
        let orig = OrigIndex::identity(3, 2, 1);
        assert_eq!(orig.vert, vec![0, 1, 2]);
        assert_eq!(orig.edge, vec![0, 1]);
        assert_eq!(orig.poly, vec![0]);
    }
}
