//! Index buffers and their builder

use std::sync::Arc;

use crate::core::{Error, Result};
use super::memory::{GpuAllocation, GpuMemory};

/// Primitive restart marker.
pub const RESTART_INDEX: u32 = u32::MAX;

/// Primitive type of an index buffer or batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimType {
    Points,
    Lines,
    Tris,
}

impl PrimType {
    /// Indices per primitive
    pub fn verts_per_prim(self) -> usize {
        match self {
            PrimType::Points => 1,
            PrimType::Lines => 2,
            PrimType::Tris => 3,
        }
    }
}

/// Fixed-size builder; every primitive starts out as a restart.
#[derive(Clone, Debug)]
pub struct IndexBufBuilder {
    prim: PrimType,
    vertex_len: u32,
    indices: Vec<u32>,
}

impl IndexBufBuilder {
    /// # Arguments
    /// * `prim` - Primitive type
    /// * `prim_len` - Number of primitives
    /// * `vertex_len` - Length of the vertex buffers the indices point into
    pub fn new(prim: PrimType, prim_len: usize, vertex_len: usize) -> Self {
        Self {
            prim,
            vertex_len: vertex_len as u32,
            indices: vec![RESTART_INDEX; prim_len * prim.verts_per_prim()],
        }
    }

    pub fn prim(&self) -> PrimType {
        self.prim
    }

    pub fn prim_len(&self) -> usize {
        self.indices.len() / self.prim.verts_per_prim()
    }

    pub fn set_tri_verts(&mut self, tri: usize, v1: u32, v2: u32, v3: u32) {
        debug_assert_eq!(self.prim, PrimType::Tris);
        debug_assert!(v1.max(v2).max(v3) < self.vertex_len);
        self.indices[tri * 3..tri * 3 + 3].copy_from_slice(&[v1, v2, v3]);
    }

    pub fn set_tri_restart(&mut self, tri: usize) {
        self.indices[tri * 3..tri * 3 + 3].fill(RESTART_INDEX);
    }

    pub fn set_line_verts(&mut self, line: usize, v1: u32, v2: u32) {
        debug_assert_eq!(self.prim, PrimType::Lines);
        debug_assert!(v1.max(v2) < self.vertex_len);
        self.indices[line * 2..line * 2 + 2].copy_from_slice(&[v1, v2]);
    }

    pub fn set_line_restart(&mut self, line: usize) {
        self.indices[line * 2..line * 2 + 2].fill(RESTART_INDEX);
    }

    pub fn set_point_vert(&mut self, point: usize, v: u32) {
        debug_assert_eq!(self.prim, PrimType::Points);
        debug_assert!(v < self.vertex_len);
        self.indices[point] = v;
    }

    pub fn set_point_restart(&mut self, point: usize) {
        self.indices[point] = RESTART_INDEX;
    }

    /// Write a whole primitive given as a slice of `verts_per_prim` indices.
    pub fn set_prim(&mut self, prim: usize, verts: &[u32]) {
        let n = self.prim.verts_per_prim();
        self.indices[prim * n..prim * n + n].copy_from_slice(verts);
    }

    /// Finalize into an index buffer, reserving its memory.
    pub fn build(self, name: &'static str, memory: &Arc<GpuMemory>) -> Result<IndexBuf> {
        let allocation = memory.allocate(name, self.indices.len() * std::mem::size_of::<u32>())?;
        let (min_index, max_index) = self
            .indices
            .iter()
            .filter(|&&i| i != RESTART_INDEX)
            .fold((u32::MAX, 0), |(lo, hi), &i| (lo.min(i), hi.max(i)));
        let len = self.indices.len();
        Ok(IndexBuf {
            prim: self.prim,
            data: Arc::new(IndexData { indices: self.indices, allocation }),
            start: 0,
            len,
            min_index: if min_index == u32::MAX { 0 } else { min_index },
            max_index,
        })
    }
}

#[derive(Debug)]
struct IndexData {
    indices: Vec<u32>,
    // Held for its drop
    #[allow(dead_code)]
    allocation: GpuAllocation,
}

/// Built index buffer or a sub-range view into one.
///
/// Sub-ranges share the parent's storage; the memory is released when the
/// last view is dropped.
#[derive(Clone, Debug)]
pub struct IndexBuf {
    prim: PrimType,
    data: Arc<IndexData>,
    start: usize,
    len: usize,
    min_index: u32,
    max_index: u32,
}

impl IndexBuf {
    /// View `len` indices of `parent` starting at index `start`.
    pub fn subrange(parent: &IndexBuf, start: usize, len: usize) -> Result<IndexBuf> {
        if start + len > parent.len {
            return Err(Error::Format(format!(
                "index sub-range {}..{} exceeds parent length {}",
                start,
                start + len,
                parent.len
            )));
        }
        Ok(IndexBuf {
            prim: parent.prim,
            data: Arc::clone(&parent.data),
            start: parent.start + start,
            len,
            min_index: parent.min_index,
            max_index: parent.max_index,
        })
    }

    pub fn prim(&self) -> PrimType {
        self.prim
    }

    pub fn indices(&self) -> &[u32] {
        &self.data.indices[self.start..self.start + self.len]
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn prim_len(&self) -> usize {
        self.len / self.prim.verts_per_prim()
    }

    /// Primitives that are not restarts
    pub fn visible_prim_len(&self) -> usize {
        self.indices()
            .chunks(self.prim.verts_per_prim())
            .filter(|p| p.iter().all(|&i| i != RESTART_INDEX))
            .count()
    }

    pub fn index_range(&self) -> (u32, u32) {
        (self.min_index, self.max_index)
    }

    /// True when this buffer views another buffer's storage
    pub fn is_subrange(&self) -> bool {
        self.start != 0 || self.len != self.data.indices.len()
    }

    /// Whether both handles refer to the same storage
    pub fn shares_storage(&self, other: &IndexBuf) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_starts_restarted() {
        let memory = GpuMemory::unlimited();
        let builder = IndexBufBuilder::new(PrimType::Tris, 2, 6);
        let ibo = builder.build("tris", &memory).unwrap();
        assert_eq!(ibo.len(), 6);
        assert_eq!(ibo.visible_prim_len(), 0);
        assert!(ibo.indices().iter().all(|&i| i == RESTART_INDEX));
    }

    #[test]
    fn test_build_index_range() {
        let memory = GpuMemory::unlimited();
        let mut builder = IndexBufBuilder::new(PrimType::Lines, 3, 10);
        builder.set_line_verts(0, 2, 3);
        builder.set_line_verts(2, 8, 9);
        let ibo = builder.build("lines", &memory).unwrap();
        assert_eq!(ibo.index_range(), (2, 9));
        assert_eq!(ibo.visible_prim_len(), 2);
        assert_eq!(memory.used(), 24);
    }

    #[test]
    fn test_subrange_shares_storage() {
        let memory = GpuMemory::unlimited();
        let mut builder = IndexBufBuilder::new(PrimType::Lines, 4, 8);
        for i in 0..4 {
            builder.set_line_verts(i, i as u32 * 2, i as u32 * 2 + 1);
        }
        let lines = builder.build("lines", &memory).unwrap();
        let loose = IndexBuf::subrange(&lines, 4, 4).unwrap();
        assert!(loose.is_subrange());
        assert!(loose.shares_storage(&lines));
        assert_eq!(loose.indices(), &[4, 5, 6, 7]);
        assert_eq!(loose.prim_len(), 2);
        assert!(IndexBuf::subrange(&lines, 6, 4).is_err());

        drop(lines);
        // Storage stays alive through the view
        assert_eq!(memory.used(), 32);
        drop(loose);
        assert_eq!(memory.used(), 0);
    }

    #[test]
    fn test_points() {
        let memory = GpuMemory::unlimited();
        let mut builder = IndexBufBuilder::new(PrimType::Points, 3, 3);
        builder.set_point_vert(0, 2);
        builder.set_point_restart(1);
        builder.set_prim(2, &[1]);
        let ibo = builder.build("points", &memory).unwrap();
        assert_eq!(ibo.indices(), &[2, RESTART_INDEX, 1]);
    }
}
