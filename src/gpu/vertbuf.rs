//! Vertex buffers

use std::sync::Arc;

use bytemuck::Pod;

use crate::core::{Error, Result};
use super::format::VertFormat;
use super::memory::{GpuAllocation, GpuMemory};

/// Vertex buffer with CPU-side storage.
///
/// Storage is word-aligned so any `Pod` vertex type with an alignment of
/// at most 4 can be viewed over it.
#[derive(Debug)]
pub struct VertBuf {
    format: VertFormat,
    vertex_len: usize,
    data: Vec<u32>,
    allocation: GpuAllocation,
    uploaded: bool,
}

impl VertBuf {
    /// Allocate a zeroed buffer for `vertex_len` vertices.
    pub fn allocate(
        name: &'static str,
        format: VertFormat,
        vertex_len: usize,
        memory: &Arc<GpuMemory>,
    ) -> Result<Self> {
        if format.attr_len() == 0 {
            return Err(Error::Format(format!("{}: vertex format has no attributes", name)));
        }
        let bytes = format.stride() * vertex_len;
        let allocation = memory.allocate(name, bytes)?;
        Ok(Self {
            format,
            vertex_len,
            data: vec![0; bytes / 4],
            allocation,
            uploaded: false,
        })
    }

    pub fn format(&self) -> &VertFormat {
        &self.format
    }

    pub fn len(&self) -> usize {
        self.vertex_len
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_len == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * 4
    }

    /// Typed view with one `T` per vertex.
    pub fn data<T: Pod>(&self) -> Result<&[T]> {
        self.check_vertex_type::<T>()?;
        bytemuck::try_cast_slice(self.data.as_slice()).map_err(|e| Error::Format(e.to_string()))
    }

    /// Mutable typed view with one `T` per vertex.
    pub fn data_mut<T: Pod>(&mut self) -> Result<&mut [T]> {
        self.check_vertex_type::<T>()?;
        self.uploaded = false;
        bytemuck::try_cast_slice_mut(self.data.as_mut_slice()).map_err(|e| Error::Format(e.to_string()))
    }

    /// Mutable flat view over the components of all vertices.
    pub fn components_mut<T: Pod>(&mut self) -> Result<&mut [T]> {
        let size = std::mem::size_of::<T>();
        if size == 0 || self.format.stride() % size != 0 {
            return Err(Error::Format(format!(
                "component size {} does not divide stride {}",
                size,
                self.format.stride()
            )));
        }
        self.uploaded = false;
        bytemuck::try_cast_slice_mut(self.data.as_mut_slice()).map_err(|e| Error::Format(e.to_string()))
    }

    fn check_vertex_type<T>(&self) -> Result<()> {
        if std::mem::size_of::<T>() != self.format.stride() {
            return Err(Error::Format(format!(
                "vertex type is {} bytes, format stride is {}",
                std::mem::size_of::<T>(),
                self.format.stride()
            )));
        }
        Ok(())
    }

    /// Shrink to `vertex_len` vertices, returning the freed memory to the budget.
    pub fn trim(&mut self, vertex_len: usize) {
        if vertex_len < self.vertex_len {
            self.vertex_len = vertex_len;
            self.data.truncate(self.format.stride() * vertex_len / 4);
            self.data.shrink_to_fit();
            self.allocation.shrink(self.size_bytes());
        }
    }

    /// Mark the contents as sent to the device.
    pub fn upload(&mut self) {
        self.uploaded = true;
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::format::CompType;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct PosVert {
        pos: [f32; 3],
        flag: u32,
    }

    fn format() -> VertFormat {
        VertFormat::new().attr("pos", CompType::F32, 3).attr("flag", CompType::U32, 1)
    }

    #[test]
    fn test_typed_write() {
        let memory = GpuMemory::unlimited();
        let mut vbo = VertBuf::allocate("pos", format(), 3, &memory).unwrap();
        assert_eq!(memory.used(), 48);
        {
            let data = vbo.data_mut::<PosVert>().unwrap();
            data[2] = PosVert { pos: [1.0, 2.0, 3.0], flag: 7 };
        }
        vbo.upload();
        assert!(vbo.is_uploaded());
        assert_eq!(vbo.data::<PosVert>().unwrap()[2].flag, 7);
        assert_eq!(vbo.data::<PosVert>().unwrap()[0], PosVert::default());
    }

    #[test]
    fn test_wrong_vertex_type() {
        let memory = GpuMemory::unlimited();
        let mut vbo = VertBuf::allocate("pos", format(), 3, &memory).unwrap();
        assert!(matches!(vbo.data_mut::<[f32; 2]>(), Err(Error::Format(_))));
        assert_eq!(vbo.components_mut::<f32>().unwrap().len(), 12);
    }

    #[test]
    fn test_trim_releases_memory() {
        let memory = GpuMemory::unlimited();
        let mut vbo = VertBuf::allocate("pos", format(), 10, &memory).unwrap();
        vbo.trim(4);
        assert_eq!(vbo.len(), 4);
        assert_eq!(memory.used(), 64);
        drop(vbo);
        assert_eq!(memory.used(), 0);
    }

    #[test]
    fn test_allocation_failure() {
        let memory = GpuMemory::new(16);
        assert!(matches!(
            VertBuf::allocate("pos", format(), 2, &memory),
            Err(Error::Allocation { .. })
        ));
    }
}
