//! Edit-mode selection and marking flags per loop

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::IterDomain;
use crate::gpu::{CompType, VertFormat};
use crate::mesh::{BMesh, BmEdge, BmFace, BmVert, ElemFlags, Mesh, MeshEdge, MeshPoly, MeshVert};
use super::{alloc_vbo, finish_vbo, loop_vertex_len};

bitflags! {
    /// Face bits of [`EditLoopData::v_flag`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FaceFlag: u8 {
        const ACTIVE = 1 << 0;
        const SELECTED = 1 << 1;
    }
}

bitflags! {
    /// Edge and vertex bits of [`EditLoopData::e_flag`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EdgeVertFlag: u8 {
        const EDGE_ACTIVE = 1 << 0;
        const EDGE_SELECTED = 1 << 1;
        const EDGE_SEAM = 1 << 2;
        const EDGE_SHARP = 1 << 3;
        const VERT_ACTIVE = 1 << 4;
        const VERT_SELECTED = 1 << 5;
    }
}

/// Bits cleared when the object is not the one being edited.
const SELECTION_BITS: EdgeVertFlag = EdgeVertFlag::EDGE_ACTIVE
    .union(EdgeVertFlag::EDGE_SELECTED)
    .union(EdgeVertFlag::VERT_ACTIVE)
    .union(EdgeVertFlag::VERT_SELECTED);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct EditLoopData {
    pub v_flag: u8,
    pub e_flag: u8,
    pub crease: u8,
    pub bweight: u8,
}

impl EditLoopData {
    pub fn face(&self) -> FaceFlag {
        FaceFlag::from_bits_truncate(self.v_flag)
    }

    pub fn edge_vert(&self) -> EdgeVertFlag {
        EdgeVertFlag::from_bits_truncate(self.e_flag)
    }
}

pub struct EditDataExtract;

pub static EDIT_DATA: EditDataExtract = EditDataExtract;

fn face_flag(mr: &MeshRenderData, p: usize) -> FaceFlag {
    let mut flag = FaceFlag::empty();
    if !mr.is_mode_active {
        return flag;
    }
    if mr.active_elems().2 == Some(p as u32) {
        flag |= FaceFlag::ACTIVE;
    }
    if mr.poly_flag(p).contains(ElemFlags::SELECT) {
        flag |= FaceFlag::SELECTED;
    }
    flag
}

fn edge_flag(mr: &MeshRenderData, e: usize) -> EdgeVertFlag {
    let elem = mr.edge_flag(e);
    let mut flag = EdgeVertFlag::empty();
    flag.set(EdgeVertFlag::EDGE_ACTIVE, mr.active_elems().1 == Some(e as u32));
    flag.set(EdgeVertFlag::EDGE_SELECTED, elem.contains(ElemFlags::SELECT));
    flag.set(EdgeVertFlag::EDGE_SEAM, elem.contains(ElemFlags::SEAM));
    flag.set(EdgeVertFlag::EDGE_SHARP, elem.contains(ElemFlags::SHARP));
    flag
}

fn vert_flag(mr: &MeshRenderData, v: usize) -> EdgeVertFlag {
    let mut flag = EdgeVertFlag::empty();
    flag.set(EdgeVertFlag::VERT_ACTIVE, mr.active_elems().0 == Some(v as u32));
    flag.set(EdgeVertFlag::VERT_SELECTED, mr.vert_flag(v).contains(ElemFlags::SELECT));
    flag
}

fn loop_data(mr: &MeshRenderData, face: FaceFlag, mut edge_vert: EdgeVertFlag) -> EditLoopData {
    if !mr.is_mode_active {
        edge_vert -= SELECTION_BITS;
    }
    EditLoopData { v_flag: face.bits(), e_flag: edge_vert.bits(), crease: 0, bweight: 0 }
}

impl EditDataExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<EditLoopData>) {
        let face = face_flag(mr, p);
        for l in mr.poly_loops(p) {
            let flags = edge_flag(mr, mr.loop_edge(l) as usize) | vert_flag(mr, mr.loop_vert(l) as usize);
            task.set(l, loop_data(mr, face, flags));
        }
    }

    fn ledge(&self, mr: &MeshRenderData, e: usize, verts: [u32; 2], index: usize, task: &mut SlotRuns<EditLoopData>) {
        let edge = edge_flag(mr, e);
        let l = mr.ledge_loop(index);
        for (i, v) in verts.into_iter().enumerate() {
            let flags = edge | vert_flag(mr, v as usize);
            task.set(l + i, loop_data(mr, FaceFlag::empty(), flags));
        }
    }

    fn lvert(&self, mr: &MeshRenderData, index: usize, task: &mut SlotRuns<EditLoopData>) {
        let v = mr.loose_verts[index] as usize;
        task.set(mr.lvert_loop(index), loop_data(mr, FaceFlag::empty(), vert_flag(mr, v)));
    }
}

impl MeshExtract for EditDataExtract {
    type Data = ();
    type TaskData = SlotRuns<EditLoopData>;

    fn name(&self) -> &'static str {
        "edit_data"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::EditData)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY | IterDomain::LEDGE | IterDomain::LVERT
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        let format = VertFormat::new().attr("data", CompType::U8, 4);
        alloc_vbo(slot, "edit_data", format, loop_vertex_len(mr), ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<EditLoopData> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.poly(mr, index, task);
    }

    fn iter_ledge_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, edge: &MeshEdge, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.ledge(mr, mr.loose_edges[index] as usize, edge.v, index, task);
    }

    fn iter_ledge_bm(&self, mr: &MeshRenderData, _bm: &BMesh, edge: &BmEdge, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.ledge(mr, mr.loose_edges[index] as usize, edge.v, index, task);
    }

    fn iter_lvert_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _vert: &MeshVert, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.lvert(mr, index, task);
    }

    fn iter_lvert_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _vert: &BmVert, index: usize, _data: &(), task: &mut SlotRuns<EditLoopData>) {
        self.lvert(mr, index, task);
    }

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<EditLoopData>) -> Result<()> {
        finish_vbo(slot, "edit_data", &task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::extract::extractors::test_util;
    use crate::extract::runner::RunMode;
    use crate::mesh::{MeshData, primitives};

    fn edit_data(data: &MeshData, flags: &RunFlags) -> Vec<EditLoopData> {
        let mr = test_util::render_data(data, flags, &[&EDIT_DATA]);
        let slot = test_util::extract(&EDIT_DATA, &mr, RunMode::single_threaded());
        slot.as_vert().unwrap().data::<EditLoopData>().unwrap().to_vec()
    }

    #[test]
    fn test_edit_mesh_flags() {
        let mut data = MeshData::new(primitives::grid(2, 1));
        data.begin_edit();
        {
            let bm = &mut data.edit.as_mut().unwrap().bm;
            bm.faces[1].flag.insert(ElemFlags::SELECT);
            bm.act_face = Some(1);
            bm.edges[0].flag.insert(ElemFlags::SEAM);
            bm.select_vert(0, true);
            bm.act_vert = Some(0);
        }
        let out = edit_data(&data, &RunFlags::edit_mode());
        assert_eq!(out.len(), 8);
        assert_eq!(out[0].face(), FaceFlag::empty());
        assert_eq!(out[4].face(), FaceFlag::ACTIVE | FaceFlag::SELECTED);
        // loop 0 sits on vertex 0 and the first edge
        let ev = out[0].edge_vert();
        assert!(ev.contains(EdgeVertFlag::VERT_ACTIVE | EdgeVertFlag::VERT_SELECTED));
        assert!(ev.contains(EdgeVertFlag::EDGE_SEAM));
    }

    #[test]
    fn test_inactive_mode_clears_selection() {
        let mut data = MeshData::new(primitives::grid(1, 1));
        data.begin_edit();
        {
            let bm = &mut data.edit.as_mut().unwrap().bm;
            bm.faces[0].flag.insert(ElemFlags::SELECT);
            bm.edges[0].flag.insert(ElemFlags::SEAM | ElemFlags::SELECT);
        }
        let flags = RunFlags { is_mode_active: false, ..RunFlags::edit_mode() };
        let out = edit_data(&data, &flags);
        assert_eq!(out[0].face(), FaceFlag::empty());
        assert_eq!(out[0].edge_vert(), EdgeVertFlag::EDGE_SEAM);
    }

    #[test]
    fn test_loose_slots_written() {
        let mut mesh = primitives::triangles(1);
        primitives::add_loose(&mut mesh, 1, 1);
        let last = mesh.verts.len() - 1;
        mesh.verts[last].flag.insert(ElemFlags::SELECT);
        let data = MeshData::new(mesh);
        let flags = RunFlags { is_mode_active: true, ..RunFlags::object_mode() };
        let out = edit_data(&data, &flags);
        assert_eq!(out.len(), 6);
        assert_eq!(out[5].edge_vert(), EdgeVertFlag::VERT_SELECTED);
    }
}
