//! Face dots: one point per face at its center

use crate::cache::{BufferSlot, BufferType, IboType, VboType};
use crate::core::Result;
use crate::core::types::Vec3;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::IterDomain;
use crate::gpu::{CompType, IndexBufBuilder, PrimType, RESTART_INDEX, VertFormat};
use crate::mesh::{BMesh, BmFace, Mesh, MeshPoly};
use super::{alloc_vbo, finish_ibo, finish_vbo};

/// Average of the corner positions of face `p`
pub fn face_center(mr: &MeshRenderData, p: usize) -> Vec3 {
    let loops = mr.poly_loops(p);
    let count = loops.len().max(1) as f32;
    loops.map(|l| mr.vert_co(mr.loop_vert(l) as usize)).sum::<Vec3>() / count
}

pub struct FdotsPosExtract;

pub static FDOTS_POS: FdotsPosExtract = FdotsPosExtract;

impl MeshExtract for FdotsPosExtract {
    type Data = ();
    type TaskData = SlotRuns<[f32; 3]>;

    fn name(&self) -> &'static str {
        "fdots_pos"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::FdotsPos)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        let format = VertFormat::new().attr("pos", CompType::F32, 3);
        alloc_vbo(slot, "fdots_pos", format, mr.poly_len, ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<[f32; 3]> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<[f32; 3]>) {
        task.set(index, face_center(mr, index).to_array());
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<[f32; 3]>) {
        task.set(index, face_center(mr, index).to_array());
    }

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[f32; 3]>) -> Result<()> {
        finish_vbo(slot, "fdots_pos", &task)
    }
}

/// Point per visible face into `FdotsPos`.
pub struct FdotsExtract;

pub static FDOTS: FdotsExtract = FdotsExtract;

impl FdotsExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<[u32; 1]>) {
        let point = if mr.poly_hidden(p) { RESTART_INDEX } else { p as u32 };
        task.set(p, [point]);
    }
}

impl MeshExtract for FdotsExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 1]>;

    fn name(&self) -> &'static str {
        "fdots"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::Fdots)
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

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<[u32; 1]> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<[u32; 1]>) {
        self.poly(mr, index, task);
    }

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<[u32; 1]>) -> Result<()> {
        let builder = IndexBufBuilder::new(PrimType::Points, mr.poly_len, mr.poly_len);
        finish_ibo(slot, "fdots", builder, &task, ctx)
    }
}
