//! Edge lines and the loose-edge sub-range
//!
//! `Lines` holds one line per edge, indexed by edge, followed by one line per
//! loose edge pointing at the loose-edge vertex slots. The loose edge's own
//! edge-indexed line is a restart so it is not drawn twice. `LinesLoose` is a
//! view of that trailing section.

use crate::cache::{BufferSlot, BufferType, IboType};
use crate::core::{Error, Result};
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::{DataFlags, IterDomain};
use crate::gpu::{IndexBuf, IndexBufBuilder, PrimType, RESTART_INDEX};
use crate::mesh::{BMesh, BmEdge, BmFace, Mesh, MeshEdge, MeshPoly};
use super::{finish_ibo, loop_vertex_len};

const RESTART_LINE: [u32; 2] = [RESTART_INDEX; 2];

pub struct LinesExtract;

pub static LINES: LinesExtract = LinesExtract;

impl LinesExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<[u32; 2]>) {
        let loops = mr.poly_loops(p);
        for l in loops.clone() {
            let next = if l + 1 == loops.end { loops.start } else { l + 1 };
            let e = mr.loop_edge(l) as usize;
            let line = if mr.edge_hidden(e) { RESTART_LINE } else { [l as u32, next as u32] };
            task.set(e, line);
        }
    }

    fn ledge(&self, mr: &MeshRenderData, index: usize, task: &mut SlotRuns<[u32; 2]>) {
        let e = mr.loose_edges[index] as usize;
        let line = if mr.edge_hidden(e) {
            RESTART_LINE
        } else {
            let l = mr.ledge_loop(index) as u32;
            [l, l + 1]
        };
        task.set(mr.edge_len + index, line);
        task.set(e, RESTART_LINE);
    }
}

impl MeshExtract for LinesExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 2]>;

    fn name(&self) -> &'static str {
        "lines"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::Lines)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY | IterDomain::LEDGE
    }

    fn use_threading(&self) -> bool {
        false
    }

    fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
        Ok(())
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<[u32; 2]> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<[u32; 2]>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<[u32; 2]>) {
        self.poly(mr, index, task);
    }

    fn iter_ledge_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _edge: &MeshEdge, index: usize, _data: &(), task: &mut SlotRuns<[u32; 2]>) {
        self.ledge(mr, index, task);
    }

    fn iter_ledge_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _edge: &BmEdge, index: usize, _data: &(), task: &mut SlotRuns<[u32; 2]>) {
        self.ledge(mr, index, task);
    }

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[u32; 2]>) -> Result<()> {
        let prim_len = mr.edge_len + mr.loose_edges.len();
        let builder = IndexBufBuilder::new(PrimType::Lines, prim_len, loop_vertex_len(mr));
        finish_ibo(slot, "lines", builder, &task, ctx)
    }
}

/// Sub-range of `Lines` covering the loose edges.
pub struct LinesLooseExtract;

pub static LINES_LOOSE: LinesLooseExtract = LinesLooseExtract;

/// View the loose-edge section of a filled `Lines` buffer.
pub fn loose_lines_subrange(mr: &MeshRenderData, lines: &IndexBuf) -> Result<IndexBuf> {
    IndexBuf::subrange(lines, mr.edge_len * 2, mr.loose_edges.len() * 2)
}

impl MeshExtract for LinesLooseExtract {
    type Data = ();
    type TaskData = ();

    fn name(&self) -> &'static str {
        "lines_loose"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::LinesLoose)
    }

    fn data_flags(&self) -> DataFlags {
        DataFlags::LOOSE_GEOM
    }

    fn use_threading(&self) -> bool {
        false
    }

    fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
        Ok(())
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) {}

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), _task: ()) -> Result<()> {
        let lines = ctx
            .superset
            .as_ref()
            .ok_or_else(|| Error::Task("lines_loose: lines buffer is not available".to_string()))?;
        *slot = BufferSlot::Index(loose_lines_subrange(mr, lines)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::extract::extractors::test_util;
    use crate::extract::runner::RunMode;
    use crate::gpu::GpuMemory;
    use crate::mesh::{ElemFlags, MeshData, primitives};

    #[test]
    fn test_face_edges_then_loose() {
        let mut mesh = primitives::triangles(1);
        primitives::add_loose(&mut mesh, 2, 0);
        let data = MeshData::new(mesh);
        let slot = test_util::extract_simple(&LINES, &data);
        let ibo = slot.as_index().unwrap();
        // 3 face edges + 2 loose edges, then 2 trailing loose lines
        assert_eq!(ibo.prim_len(), 7);
        assert_eq!(&ibo.indices()[..6], &[0, 1, 1, 2, 2, 0]);
        assert_eq!(&ibo.indices()[6..10], &[RESTART_INDEX; 4]);
        assert_eq!(&ibo.indices()[10..14], &[3, 4, 5, 6]);
    }

    #[test]
    fn test_hidden_edges_restart() {
        let mut mesh = primitives::triangles(1);
        mesh.edges[1].flag.insert(ElemFlags::HIDDEN);
        let data = MeshData::new(mesh);
        let flags = RunFlags { use_hide: true, ..RunFlags::object_mode() };
        let mr = test_util::render_data(&data, &flags, &[&LINES]);
        let slot = test_util::extract(&LINES, &mr, RunMode::single_threaded());
        assert_eq!(slot.as_index().unwrap().visible_prim_len(), 2);
    }

    #[test]
    fn test_loose_subrange_shares_lines() {
        let mut mesh = primitives::triangles(2);
        primitives::add_loose(&mut mesh, 3, 0);
        let data = MeshData::new(mesh);
        let flags = RunFlags::object_mode();
        let mr = test_util::render_data(&data, &flags, &[&LINES, &LINES_LOOSE]);
        let lines_slot = test_util::extract(&LINES, &mr, RunMode::single_threaded());
        let lines = lines_slot.as_index().unwrap();

        let mut ctx = ExtractContext::new(GpuMemory::unlimited());
        ctx.superset = Some(lines.clone());
        let slot = test_util::extract_with(&LINES_LOOSE, &mr, &ctx, RunMode::single_threaded());
        let loose = slot.as_index().unwrap();
        assert!(loose.shares_storage(lines));
        assert_eq!(loose.prim_len(), 3);
        assert_eq!(loose.indices(), &[6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_loose_without_superset_fails() {
        let data = MeshData::new(primitives::triangles(1));
        let flags = RunFlags::object_mode();
        let mr = test_util::render_data(&data, &flags, &[&LINES_LOOSE]);
        let ctx = ExtractContext::new(GpuMemory::unlimited());
        let mut slot = BufferSlot::Requested;
        assert!(LINES_LOOSE.finish(&mr, &ctx, &mut slot, (), ()).is_err());
        assert!(slot.is_requested());
    }
}
