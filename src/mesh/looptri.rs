//! Polygon triangulation into loop triangles

use super::elements::{LoopTri, MeshPoly, poly_to_tri_count};

/// Fan-triangulate polygons given as `(loopstart, totloop)` spans.
///
/// Triangles of one polygon are contiguous and polygons keep their order,
/// so the output length is always `loop_len - 2 * poly_len`.
pub fn triangulate_spans(spans: impl Iterator<Item = (u32, u32)>, tri_len_hint: usize) -> Vec<LoopTri> {
    let mut tris = Vec::with_capacity(tri_len_hint);
    for (poly, (start, len)) in spans.enumerate() {
        for i in 1..len.saturating_sub(1) {
            tris.push(LoopTri {
                tri: [start, start + i, start + i + 1],
                poly: poly as u32,
            });
        }
    }
    tris
}

/// Triangulate the polygons of a final mesh.
pub fn triangulate_polys(polys: &[MeshPoly], loop_len: usize) -> Vec<LoopTri> {
    triangulate_spans(
        polys.iter().map(|p| (p.loopstart, p.totloop)),
        poly_to_tri_count(polys.len(), loop_len),
    )
}
