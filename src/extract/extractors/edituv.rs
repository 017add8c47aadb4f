//! UV editor triangles and edges
//!
//! Both index into the loop-indexed `Uv` and `EditData` buffers. Hidden faces
//! are restarts so the layout stays aligned with the triangulation and loops.

use crate::cache::{BufferSlot, BufferType, IboType};
use crate::core::Result;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::{DataFlags, IterDomain};
use crate::gpu::{IndexBufBuilder, PrimType, RESTART_INDEX};
use crate::mesh::{BMesh, BmFace, LoopTri, Mesh, MeshPoly};
use super::finish_ibo;

pub struct EdituvTrisExtract;

pub static EDITUV_TRIS: EdituvTrisExtract = EdituvTrisExtract;

impl EdituvTrisExtract {
    fn tri(&self, mr: &MeshRenderData, tri: &LoopTri, index: usize, task: &mut SlotRuns<[u32; 3]>) {
        let verts = if mr.poly_hidden(tri.poly as usize) { [RESTART_INDEX; 3] } else { tri.tri };
        task.set(index, verts);
    }
}

impl MeshExtract for EdituvTrisExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 3]>;

    fn name(&self) -> &'static str {
        "edituv_tris"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::EdituvTris)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::LOOPTRI
    }

    fn data_flags(&self) -> DataFlags {
        DataFlags::LOOPTRI
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
        Ok(())
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<[u32; 3]> {
        SlotRuns::new()
    }

    fn iter_looptri_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, tri: &LoopTri, index: usize, _data: &(), task: &mut SlotRuns<[u32; 3]>) {
        self.tri(mr, tri, index, task);
    }

    fn iter_looptri_bm(&self, mr: &MeshRenderData, _bm: &BMesh, tri: &LoopTri, index: usize, _data: &(), task: &mut SlotRuns<[u32; 3]>) {
        self.tri(mr, tri, index, task);
    }

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[u32; 3]>) -> Result<()> {
        let builder = IndexBufBuilder::new(PrimType::Tris, mr.tri_len, mr.loop_len);
        finish_ibo(slot, "edituv_tris", builder, &task, ctx)
    }
}

pub struct EdituvLinesExtract;

pub static EDITUV_LINES: EdituvLinesExtract = EdituvLinesExtract;

impl EdituvLinesExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<[u32; 2]>) {
        let hidden = mr.poly_hidden(p);
        let loops = mr.poly_loops(p);
        for l in loops.clone() {
            let next = if l + 1 == loops.end { loops.start } else { l + 1 };
            let line = if hidden { [RESTART_INDEX; 2] } else { [l as u32, next as u32] };
            task.set(l, line);
        }
    }
}

impl MeshExtract for EdituvLinesExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 2]>;

    fn name(&self) -> &'static str {
        "edituv_lines"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::EdituvLines)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY
    }

    fn use_threading(&self) -> bool {
        true
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

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[u32; 2]>) -> Result<()> {
        let builder = IndexBufBuilder::new(PrimType::Lines, mr.loop_len, mr.loop_len);
        finish_ibo(slot, "edituv_lines", builder, &task, ctx)
    }
}
