//! Resolved draw batches

use super::indexbuf::{IndexBuf, PrimType};
use super::vertbuf::VertBuf;

/// Draw call view returned by the cache.
///
/// An empty handle (no vertex buffers) means the batch was never built.
#[derive(Clone, Debug)]
pub struct BatchHandle<'a> {
    pub prim: PrimType,
    pub vertex_buffers: Vec<&'a VertBuf>,
    pub index: Option<IndexBuf>,
}

impl<'a> BatchHandle<'a> {
    pub fn empty(prim: PrimType) -> Self {
        Self { prim, vertex_buffers: Vec::new(), index: None }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_buffers.is_empty()
    }

    /// Vertices reachable by a non-indexed draw (shortest bound buffer)
    pub fn vertex_len(&self) -> usize {
        self.vertex_buffers.iter().map(|v| v.len()).min().unwrap_or(0)
    }

    /// Number of vertices the draw call emits
    pub fn draw_len(&self) -> usize {
        match &self.index {
            Some(ibo) => ibo.len(),
            None => self.vertex_len(),
        }
    }

    /// Primitives the draw call emits, restarts excluded
    pub fn primitive_count(&self) -> usize {
        match &self.index {
            Some(ibo) => ibo.visible_prim_len(),
            None => self.vertex_len() / self.prim.verts_per_prim(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{CompType, GpuMemory, IndexBufBuilder, VertFormat};

    #[test]
    fn test_empty_handle() {
        let handle = BatchHandle::empty(PrimType::Tris);
        assert!(handle.is_empty());
        assert_eq!(handle.draw_len(), 0);
        assert_eq!(handle.primitive_count(), 0);
    }

    #[test]
    fn test_indexed_handle() {
        let memory = GpuMemory::unlimited();
        let format = VertFormat::new().attr("pos", CompType::F32, 3);
        let vbo = VertBuf::allocate("pos", format, 4, &memory).unwrap();
        let mut builder = IndexBufBuilder::new(PrimType::Tris, 2, 4);
        builder.set_tri_verts(0, 0, 1, 2);
        let handle = BatchHandle {
            prim: PrimType::Tris,
            vertex_buffers: vec![&vbo],
            index: Some(builder.build("tris", &memory).unwrap()),
        };
        assert_eq!(handle.vertex_len(), 4);
        assert_eq!(handle.draw_len(), 6);
        assert_eq!(handle.primitive_count(), 1);
    }
}
