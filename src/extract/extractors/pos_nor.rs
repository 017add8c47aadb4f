//! Positions and vertex normals per loop

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::core::types::Vec3;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::{DataFlags, IterDomain};
use crate::gpu::{CompType, PackedNormal, ShortNormal, VertFormat};
use crate::mesh::{BMesh, BmEdge, BmFace, BmVert, ElemFlags, Mesh, MeshEdge, MeshPoly, MeshVert};
use super::{alloc_vbo, finish_vbo, loop_vertex_len};

/// Position and 10-10-10-2 normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PosNorLoop {
    pub pos: [f32; 3],
    pub nor: PackedNormal,
}

/// Position and 16-bit normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PosNorHqLoop {
    pub pos: [f32; 3],
    pub nor: ShortNormal,
}

/// Vertex layout written by [`PosNorExtract`].
pub trait PosNorVertex: Pod + Send + Sync + 'static {
    fn format() -> VertFormat;
    fn new(pos: Vec3, nor: Vec3, w: i32) -> Self;
}

impl PosNorVertex for PosNorLoop {
    fn format() -> VertFormat {
        VertFormat::new().attr("pos", CompType::F32, 3).attr("nor", CompType::I10, 4)
    }

    fn new(pos: Vec3, nor: Vec3, w: i32) -> Self {
        Self { pos: pos.to_array(), nor: PackedNormal::new(nor, w) }
    }
}

impl PosNorVertex for PosNorHqLoop {
    fn format() -> VertFormat {
        VertFormat::new().attr("pos", CompType::F32, 3).attr("nor", CompType::I16, 4)
    }

    fn new(pos: Vec3, nor: Vec3, w: i32) -> Self {
        Self { pos: pos.to_array(), nor: ShortNormal::new(nor, w as i16) }
    }
}

/// Fills `PosNor`. The normal `w` is -1 for hidden vertices and, outside the
/// edit mesh, 1 for selected ones.
pub struct PosNorExtract<V> {
    name: &'static str,
    _vertex: PhantomData<fn() -> V>,
}

impl<V> PosNorExtract<V> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _vertex: PhantomData }
    }
}

pub static POS_NOR: PosNorExtract<PosNorLoop> = PosNorExtract::new("pos_nor");
pub static POS_NOR_HQ: PosNorExtract<PosNorHqLoop> = PosNorExtract::new("pos_nor_hq");

impl<V: PosNorVertex> PosNorExtract<V> {
    fn vertex(&self, mr: &MeshRenderData, v: usize, face_hidden: bool) -> V {
        // Edit-mode selection lives in EditData; only paint selection is packed here
        let w = if face_hidden || mr.vert_hidden(v) {
            -1
        } else if mr.use_final_mesh && mr.vert_flag(v).contains(ElemFlags::SELECT) {
            1
        } else {
            0
        };
        let nor = mr.vert_normals.get(v).copied().unwrap_or(Vec3::Z);
        V::new(mr.vert_co(v), nor, w)
    }

    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<V>) {
        let hidden = mr.poly_hidden(p);
        for l in mr.poly_loops(p) {
            task.set(l, self.vertex(mr, mr.loop_vert(l) as usize, hidden));
        }
    }

    fn ledge(&self, mr: &MeshRenderData, verts: [u32; 2], index: usize, task: &mut SlotRuns<V>) {
        let l = mr.ledge_loop(index);
        task.set(l, self.vertex(mr, verts[0] as usize, false));
        task.set(l + 1, self.vertex(mr, verts[1] as usize, false));
    }

    fn lvert(&self, mr: &MeshRenderData, index: usize, task: &mut SlotRuns<V>) {
        let v = mr.loose_verts[index] as usize;
        task.set(mr.lvert_loop(index), self.vertex(mr, v, false));
    }
}

impl<V: PosNorVertex> MeshExtract for PosNorExtract<V> {
    type Data = ();
    type TaskData = SlotRuns<V>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::PosNor)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY | IterDomain::LEDGE | IterDomain::LVERT
    }

    fn data_flags(&self) -> DataFlags {
        DataFlags::VERT_NOR
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        alloc_vbo(slot, self.name, V::format(), loop_vertex_len(mr), ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<V> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.poly(mr, index, task);
    }

    fn iter_ledge_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, edge: &MeshEdge, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_ledge_bm(&self, mr: &MeshRenderData, _bm: &BMesh, edge: &BmEdge, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_lvert_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _vert: &MeshVert, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.lvert(mr, index, task);
    }

    fn iter_lvert_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _vert: &BmVert, index: usize, _data: &(), task: &mut SlotRuns<V>) {
        self.lvert(mr, index, task);
    }

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<V>) -> Result<()> {
        finish_vbo(slot, self.name, &task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::extract::extractors::test_util;
    use crate::extract::runner::RunMode;
    use crate::mesh::{MeshData, primitives};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<PosNorLoop>(), PosNorLoop::format().stride());
        assert_eq!(std::mem::size_of::<PosNorHqLoop>(), PosNorHqLoop::format().stride());
    }

    #[test]
    fn test_loops_and_loose_geometry() {
        let mut mesh = primitives::triangles(2);
        primitives::add_loose(&mut mesh, 1, 1);
        mesh.verts[1].flag.insert(ElemFlags::SELECT);
        let data = MeshData::new(mesh);
        let slot = test_util::extract_simple(&POS_NOR, &data);
        let vbo = slot.as_vert().unwrap();
        // 6 loops + 2 loose edge ends + 1 loose vertex
        assert_eq!(vbo.len(), 9);
        assert!(vbo.is_uploaded());

        let verts = vbo.data::<PosNorLoop>().unwrap();
        assert_eq!(verts[0].pos, [0.0, 0.0, 0.0]);
        assert_eq!(verts[1].nor.w(), 1);
        assert_eq!(verts[0].nor.w(), 0);
        assert!((verts[0].nor.normal() - Vec3::Z).length() < 0.01);
        // loose edge ends then the loose vertex
        assert_eq!(verts[6].pos, [0.0, 0.0, 10.0]);
        assert_eq!(verts[7].pos, [1.0, 0.0, 10.0]);
        assert_eq!(verts[8].pos, [0.0, 0.0, -10.0]);
    }

    #[test]
    fn test_hidden_faces_flagged() {
        let mut mesh = primitives::triangles(2);
        mesh.polys[1].flag.insert(ElemFlags::HIDDEN);
        let data = MeshData::new(mesh);
        let flags = RunFlags { use_hide: true, ..RunFlags::object_mode() };
        let mr = test_util::render_data(&data, &flags, &[&POS_NOR]);
        let slot = test_util::extract(&POS_NOR, &mr, RunMode::single_threaded());
        let verts = slot.as_vert().unwrap().data::<PosNorLoop>().unwrap();
        assert_eq!(verts[0].nor.w(), 0);
        assert_eq!(verts[3].nor.w(), -1);
    }

    #[test]
    fn test_edit_mesh_ignores_selection() {
        let mut data = MeshData::new(primitives::triangles(2));
        data.begin_edit();
        if let Some(edit) = data.edit.as_mut() {
            edit.bm.select_vert(1, true);
            edit.bm.hide_face(1, true);
        }
        let flags = RunFlags::edit_mode();
        let mr = test_util::render_data(&data, &flags, &[&POS_NOR]);
        let slot = test_util::extract(&POS_NOR, &mr, RunMode::single_threaded());
        let verts = slot.as_vert().unwrap().data::<PosNorLoop>().unwrap();
        assert_eq!(verts[1].nor.w(), 0);
        assert_eq!(verts[3].nor.w(), -1);
    }

    #[test]
    fn test_threaded_matches_single_threaded() {
        let mut mesh = primitives::grid(16, 16);
        primitives::add_loose(&mut mesh, 5, 3);
        let data = MeshData::new(mesh);
        let flags = RunFlags::object_mode();
        let mr = test_util::render_data(&data, &flags, &[&POS_NOR_HQ]);
        let a = test_util::extract(&POS_NOR_HQ, &mr, RunMode::single_threaded());
        let b = test_util::extract(&POS_NOR_HQ, &mr, RunMode::threaded(7));
        assert_eq!(
            a.as_vert().unwrap().data::<PosNorHqLoop>().unwrap(),
            b.as_vert().unwrap().data::<PosNorHqLoop>().unwrap()
        );
    }
}
