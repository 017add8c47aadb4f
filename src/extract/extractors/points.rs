//! One point per vertex, pointing at a loop slot that uses it

use crate::cache::{BufferSlot, BufferType, IboType};
use crate::core::Result;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::IterDomain;
use crate::gpu::{IndexBufBuilder, PrimType, RESTART_INDEX};
use crate::mesh::{BMesh, BmEdge, BmFace, BmVert, Mesh, MeshEdge, MeshPoly, MeshVert};
use super::{finish_ibo, loop_vertex_len};

pub struct PointsExtract;

pub static POINTS: PointsExtract = PointsExtract;

impl PointsExtract {
    fn vert(&self, mr: &MeshRenderData, v: usize, l: usize, task: &mut SlotRuns<[u32; 1]>) {
        let point = if mr.vert_hidden(v) { RESTART_INDEX } else { l as u32 };
        task.set(v, [point]);
    }

    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<[u32; 1]>) {
        for l in mr.poly_loops(p) {
            self.vert(mr, mr.loop_vert(l) as usize, l, task);
        }
    }

    fn ledge(&self, mr: &MeshRenderData, verts: [u32; 2], index: usize, task: &mut SlotRuns<[u32; 1]>) {
        let l = mr.ledge_loop(index);
        self.vert(mr, verts[0] as usize, l, task);
        self.vert(mr, verts[1] as usize, l + 1, task);
    }

    fn lvert(&self, mr: &MeshRenderData, index: usize, task: &mut SlotRuns<[u32; 1]>) {
        self.vert(mr, mr.loose_verts[index] as usize, mr.lvert_loop(index), task);
    }
}

impl MeshExtract for PointsExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 1]>;

    fn name(&self) -> &'static str {
        "points"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::Points)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY | IterDomain::LEDGE | IterDomain::LVERT
    }

    fn use_threading(&self) -> bool {
        false
    }

    fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
        Ok(())
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<[u32; 1]> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.poly(mr, index, task);
    }

    fn iter_ledge_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, edge: &MeshEdge, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_ledge_bm(&self, mr: &MeshRenderData, _bm: &BMesh, edge: &BmEdge, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_lvert_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _vert: &MeshVert, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.lvert(mr, index, task);
    }

    fn iter_lvert_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _vert: &BmVert, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.lvert(mr, index, task);
    }

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[u32; 1]>) -> Result<()> {
        let builder = IndexBufBuilder::new(PrimType::Points, mr.vert_len, loop_vertex_len(mr));
        finish_ibo(slot, "points", builder, &task, ctx)
    }
}
