//! Buffer extractors
//!
//! One module per buffer family. Vertex buffers indexed by loop use the
//! layout: face loops first, then two slots per loose edge, then one per
//! loose vertex (see [`MeshRenderData::ledge_loop`] and
//! [`MeshRenderData::lvert_loop`]).

pub mod edit_data;
pub mod edituv;
pub mod fdots;
pub mod index_vbos;
pub mod lines;
pub mod lnor;
pub mod points;
pub mod pos_nor;
pub mod stretch_area;
pub mod tris;
pub mod uv;

use bytemuck::Pod;

use crate::cache::BufferSlot;
use crate::core::{Error, Result};
use crate::gpu::{IndexBufBuilder, VertBuf, VertFormat};
use super::extractor::ExtractContext;
use super::render_data::MeshRenderData;
use super::scratch::SlotRuns;

/// Vertex count of loop-indexed buffers including loose geometry
pub(crate) fn loop_vertex_len(mr: &MeshRenderData) -> usize {
    mr.loop_len + mr.loop_loose_len
}

/// Allocate a vertex buffer into `slot`; on failure the slot is left untouched.
pub(crate) fn alloc_vbo(
    slot: &mut BufferSlot,
    name: &'static str,
    format: VertFormat,
    vertex_len: usize,
    ctx: &ExtractContext,
) -> Result<()> {
    let vbo = VertBuf::allocate(name, format, vertex_len, &ctx.memory)?;
    *slot = BufferSlot::Vert(vbo);
    Ok(())
}

pub(crate) fn vbo_mut<'s>(slot: &'s mut BufferSlot, name: &str) -> Result<&'s mut VertBuf> {
    slot.as_vert_mut()
        .ok_or_else(|| Error::Task(format!("{}: vertex buffer was not allocated", name)))
}

/// Scatter per-vertex writes into the buffer and upload it.
pub(crate) fn finish_vbo<T: Pod>(slot: &mut BufferSlot, name: &str, writes: &SlotRuns<T>) -> Result<()> {
    let vbo = vbo_mut(slot, name)?;
    writes.scatter_into(vbo.data_mut::<T>()?);
    vbo.upload();
    Ok(())
}

/// Build an index buffer from recorded primitives.
///
/// Primitives without a write stay restarts.
pub(crate) fn finish_ibo<const N: usize>(
    slot: &mut BufferSlot,
    name: &'static str,
    mut builder: IndexBufBuilder,
    prims: &SlotRuns<[u32; N]>,
    ctx: &ExtractContext,
) -> Result<()> {
    let prim_len = builder.prim_len();
    prims.for_each(|i, verts| {
        if i < prim_len {
            builder.set_prim(i, &verts);
        }
    });
    *slot = BufferSlot::Index(builder.build(name, &ctx.memory)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::cache::{BufferSlot, CacheVariant};
    use crate::config::RunFlags;
    use crate::extract::extractor::{DynExtract, ExtractContext, ExtractorRunData};
    use crate::extract::render_data::MeshRenderData;
    use crate::extract::runner::{RunMode, run_extractors};
    use crate::extract::stats::ExtractStats;
    use crate::extract::types::{DataFlags, IterDomain};
    use crate::gpu::GpuMemory;
    use crate::mesh::{CustomDataMask, MeshData};

    /// Render data for `data` with everything `extractor` needs computed.
    pub fn render_data<'a>(data: &'a MeshData, flags: &RunFlags, extractors: &[&'static dyn DynExtract]) -> MeshRenderData<'a> {
        let mut mr = MeshRenderData::new(data, flags, CacheVariant::Final, CustomDataMask::empty()).unwrap();
        let is_mesh = mr.extract_type.is_mesh();
        let mut needs = DataFlags::empty();
        let mut domains = IterDomain::empty();
        for e in extractors {
            needs |= e.info().data_flags;
            domains |= e.info().iter_types(is_mesh);
        }
        mr.update(needs, domains);
        mr
    }

    /// Run one extractor into a fresh slot.
    pub fn extract(extractor: &'static dyn DynExtract, mr: &MeshRenderData, mode: RunMode) -> BufferSlot {
        let ctx = ExtractContext::new(GpuMemory::unlimited());
        extract_with(extractor, mr, &ctx, mode)
    }

    pub fn extract_with(
        extractor: &'static dyn DynExtract,
        mr: &MeshRenderData,
        ctx: &ExtractContext,
        mode: RunMode,
    ) -> BufferSlot {
        let mut slot = BufferSlot::Requested;
        let stats = ExtractStats::default();
        let mut runs = [ExtractorRunData::new(extractor, &mut slot)];
        run_extractors(mr, ctx, &mut runs, mode, &stats).unwrap();
        slot
    }

    /// Run single-threaded on `data` with object-mode flags.
    pub fn extract_simple(extractor: &'static dyn DynExtract, data: &MeshData) -> BufferSlot {
        let flags = RunFlags::object_mode();
        let mr = render_data(data, &flags, &[extractor]);
        extract(extractor, &mr, RunMode::single_threaded())
    }
}
