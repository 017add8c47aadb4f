//! Surface triangles
//!
//! `tris` sorts visible triangles by material so each material draws a
//! contiguous range. Single-material meshes use `tris_single_mat`, which
//! keeps triangulation order and runs threaded.

use crate::cache::{BufferSlot, BufferType, IboType};
use crate::core::{Error, Result};
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::{SlotRuns, TaskMerge};
use crate::extract::types::{DataFlags, IterDomain};
use crate::gpu::{IndexBufBuilder, PrimType, RESTART_INDEX};
use crate::mesh::{BMesh, LoopTri, Mesh};
use super::{finish_ibo, loop_vertex_len};

/// Visible triangles bucketed per material.
#[derive(Clone, Debug, Default)]
pub struct MatTris(pub Vec<Vec<[u32; 3]>>);

impl TaskMerge for MatTris {
    fn merge(&mut self, other: Self) {
        if self.0.len() < other.0.len() {
            self.0.resize_with(other.0.len(), Vec::new);
        }
        for (dst, src) in self.0.iter_mut().zip(other.0) {
            dst.extend(src);
        }
    }
}

pub struct TrisExtract;

pub static TRIS: TrisExtract = TrisExtract;

impl TrisExtract {
    fn tri(&self, mr: &MeshRenderData, tri: &LoopTri, task: &mut MatTris) {
        let p = tri.poly as usize;
        if mr.poly_hidden(p) {
            return;
        }
        let mat = (mr.poly_mat(p) as usize).min(mr.mat_len - 1);
        task.0[mat].push(tri.tri);
    }
}

impl MeshExtract for TrisExtract {
    type Data = ();
    type TaskData = MatTris;

    fn name(&self) -> &'static str {
        "tris"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::Tris)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::LOOPTRI
    }

    fn data_flags(&self) -> DataFlags {
        DataFlags::LOOPTRI | DataFlags::MAT_OFFSETS
    }

    fn use_threading(&self) -> bool {
        false
    }

    fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
        Ok(())
    }

    fn task_data(&self, mr: &MeshRenderData, _data: &()) -> MatTris {
        MatTris(vec![Vec::new(); mr.mat_len])
    }

    fn iter_looptri_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, tri: &LoopTri, _index: usize, _data: &(), task: &mut MatTris) {
        self.tri(mr, tri, task);
    }

    fn iter_looptri_bm(&self, mr: &MeshRenderData, _bm: &BMesh, tri: &LoopTri, _index: usize, _data: &(), task: &mut MatTris) {
        self.tri(mr, tri, task);
    }

    fn finish(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: MatTris) -> Result<()> {
        let tri_len: usize = task.0.iter().map(Vec::len).sum();
        if tri_len != mr.visible_tri_len {
            return Err(Error::Task(format!(
                "tris: {} visible triangles, material ranges expect {}",
                tri_len, mr.visible_tri_len
            )));
        }
        let mut builder = IndexBufBuilder::new(PrimType::Tris, tri_len, loop_vertex_len(mr));
        for (i, tri) in task.0.iter().flatten().enumerate() {
            builder.set_tri_verts(i, tri[0], tri[1], tri[2]);
        }
        *slot = BufferSlot::Index(builder.build("tris", &ctx.memory)?);
        Ok(())
    }
}

pub struct TrisSingleMatExtract;

pub static TRIS_SINGLE_MAT: TrisSingleMatExtract = TrisSingleMatExtract;

impl TrisSingleMatExtract {
    fn tri(&self, mr: &MeshRenderData, tri: &LoopTri, index: usize, task: &mut SlotRuns<[u32; 3]>) {
        let verts = if mr.poly_hidden(tri.poly as usize) { [RESTART_INDEX; 3] } else { tri.tri };
        task.set(index, verts);
    }
}

impl MeshExtract for TrisSingleMatExtract {
    type Data = ();
    type TaskData = SlotRuns<[u32; 3]>;

    fn name(&self) -> &'static str {
        "tris_single_mat"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Ibo(IboType::Tris)
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
        let builder = IndexBufBuilder::new(PrimType::Tris, mr.tri_len, loop_vertex_len(mr));
        finish_ibo(slot, "tris", builder, &task, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::extract::extractors::test_util;
    use crate::extract::runner::RunMode;
    use crate::mesh::{ElemFlags, MeshData, primitives};

    #[test]
    fn test_material_order() {
        let mut mesh = primitives::grid(3, 1);
        mesh.set_material([0, 2], 1);
        let data = MeshData::new(mesh);
        let slot = test_util::extract_simple(&TRIS, &data);
        let ibo = slot.as_index().unwrap();
        assert_eq!(ibo.prim_len(), 6);
        // material 0 (face 1) first, then material 1 (faces 0 and 2)
        assert_eq!(&ibo.indices()[..6], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(&ibo.indices()[6..9], &[0, 1, 2]);
    }

    #[test]
    fn test_hidden_triangles_dropped() {
        let mut mesh = primitives::triangles(4);
        mesh.set_material([1], 1);
        mesh.polys[2].flag.insert(ElemFlags::HIDDEN);
        let data = MeshData::new(mesh);
        let flags = RunFlags { use_hide: true, ..RunFlags::object_mode() };
        let mr = test_util::render_data(&data, &flags, &[&TRIS]);
        assert_eq!(mr.visible_tri_len, 3);
        let slot = test_util::extract(&TRIS, &mr, RunMode::single_threaded());
        assert_eq!(slot.as_index().unwrap().prim_len(), 3);
    }

    #[test]
    fn test_single_mat_keeps_order_with_restarts() {
        let mut mesh = primitives::triangles(20);
        mesh.polys[5].flag.insert(ElemFlags::HIDDEN);
        let data = MeshData::new(mesh);
        let flags = RunFlags { use_hide: true, ..RunFlags::object_mode() };
        let mr = test_util::render_data(&data, &flags, &[&TRIS_SINGLE_MAT]);
        let slot = test_util::extract(&TRIS_SINGLE_MAT, &mr, RunMode::threaded(3));
        let ibo = slot.as_index().unwrap();
        assert_eq!(ibo.prim_len(), 20);
        assert_eq!(ibo.visible_prim_len(), 19);
        assert_eq!(&ibo.indices()[..3], &[0, 1, 2]);
        assert_eq!(&ibo.indices()[15..18], &[RESTART_INDEX; 3]);
        assert_eq!(&ibo.indices()[57..60], &[57, 58, 59]);
    }

    #[test]
    fn test_merge_per_material() {
        let mut a = MatTris(vec![vec![[0, 1, 2]], vec![]]);
        a.merge(MatTris(vec![vec![[3, 4, 5]], vec![[6, 7, 8]]]));
        assert_eq!(a.0, vec![vec![[0, 1, 2], [3, 4, 5]], vec![[6, 7, 8]]]);
    }
}
