//! Shading normals per loop

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::core::types::Vec3;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::{DataFlags, IterDomain};
use crate::gpu::{CompType, PackedNormal, ShortNormal, VertFormat};
use crate::mesh::{BMesh, BmFace, ElemFlags, Mesh, MeshPoly};
use super::{alloc_vbo, finish_vbo};

pub trait LoopNormal: Pod + Send + Sync + 'static {
    fn format() -> VertFormat;
    fn new(nor: Vec3, w: i32) -> Self;
}

impl LoopNormal for PackedNormal {
    fn format() -> VertFormat {
        VertFormat::new().attr("nor", CompType::I10, 4)
    }

    fn new(nor: Vec3, w: i32) -> Self {
        PackedNormal::new(nor, w)
    }
}

impl LoopNormal for ShortNormal {
    fn format() -> VertFormat {
        VertFormat::new().attr("nor", CompType::I16, 4)
    }

    fn new(nor: Vec3, w: i32) -> Self {
        ShortNormal::new(nor, w as i16)
    }
}

/// Fills `Lnor`: split normals when available, otherwise the vertex normal
/// for smooth faces and the face normal for flat ones.
pub struct LnorExtract<N> {
    name: &'static str,
    _normal: PhantomData<fn() -> N>,
}

impl<N> LnorExtract<N> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _normal: PhantomData }
    }
}

pub static LNOR: LnorExtract<PackedNormal> = LnorExtract::new("lnor");
pub static LNOR_HQ: LnorExtract<ShortNormal> = LnorExtract::new("lnor_hq");

impl<N: LoopNormal> LnorExtract<N> {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<N>) {
        let flag = mr.poly_flag(p);
        let w = if mr.poly_hidden(p) {
            -1
        } else if flag.contains(ElemFlags::SELECT) {
            1
        } else {
            0
        };
        let use_loop_normals = mr.computed.contains(DataFlags::LOOP_NOR);
        let smooth = flag.contains(ElemFlags::SMOOTH);
        for l in mr.poly_loops(p) {
            let nor = if use_loop_normals {
                mr.loop_normals[l]
            } else if smooth {
                mr.vert_normals[mr.loop_vert(l) as usize]
            } else {
                mr.poly_normals[p]
            };
            task.set(l, N::new(nor, w));
        }
    }
}

impl<N: LoopNormal> MeshExtract for LnorExtract<N> {
    type Data = ();
    type TaskData = SlotRuns<N>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::Lnor)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY
    }

    fn data_flags(&self) -> DataFlags {
        DataFlags::POLY_NOR | DataFlags::VERT_NOR | DataFlags::LOOP_NOR
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        alloc_vbo(slot, self.name, N::format(), mr.loop_len, ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<N> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<N>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<N>) {
        self.poly(mr, index, task);
    }

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<N>) -> Result<()> {
        finish_vbo(slot, self.name, &task)
    }
}
