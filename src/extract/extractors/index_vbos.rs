//! Original element indices per loop, used for selection drawing

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::SlotRuns;
use crate::extract::types::IterDomain;
use crate::gpu::{CompType, VertFormat};
use crate::mesh::{BMesh, BmEdge, BmFace, BmVert, Mesh, MeshEdge, MeshPoly, MeshVert, OrigIndex};
use super::{alloc_vbo, finish_vbo, loop_vertex_len};

/// Which element index is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    Poly,
    Edge,
    Vert,
}

pub struct IndexVboExtract {
    kind: IndexKind,
}

pub static POLY_IDX: IndexVboExtract = IndexVboExtract { kind: IndexKind::Poly };
pub static EDGE_IDX: IndexVboExtract = IndexVboExtract { kind: IndexKind::Edge };
pub static VERT_IDX: IndexVboExtract = IndexVboExtract { kind: IndexKind::Vert };

fn poly_layer(o: &OrigIndex) -> &[i32] {
    &o.poly
}

fn edge_layer(o: &OrigIndex) -> &[i32] {
    &o.edge
}

fn vert_layer(o: &OrigIndex) -> &[i32] {
    &o.vert
}

impl IndexVboExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut SlotRuns<u32>) {
        for l in mr.poly_loops(p) {
            let index = match self.kind {
                IndexKind::Poly => mr.orig_index(poly_layer, p),
                IndexKind::Edge => mr.orig_index(edge_layer, mr.loop_edge(l) as usize),
                IndexKind::Vert => mr.orig_index(vert_layer, mr.loop_vert(l) as usize),
            };
            task.set(l, index);
        }
    }

    fn ledge(&self, mr: &MeshRenderData, verts: [u32; 2], index: usize, task: &mut SlotRuns<u32>) {
        let l = mr.ledge_loop(index);
        match self.kind {
            IndexKind::Edge => {
                let e = mr.orig_index(edge_layer, mr.loose_edges[index] as usize);
                task.set(l, e);
                task.set(l + 1, e);
            }
            IndexKind::Vert => {
                task.set(l, mr.orig_index(vert_layer, verts[0] as usize));
                task.set(l + 1, mr.orig_index(vert_layer, verts[1] as usize));
            }
            IndexKind::Poly => {}
        }
    }

    fn lvert(&self, mr: &MeshRenderData, index: usize, task: &mut SlotRuns<u32>) {
        let v = mr.loose_verts[index] as usize;
        task.set(mr.lvert_loop(index), mr.orig_index(vert_layer, v));
    }
}

impl MeshExtract for IndexVboExtract {
    type Data = ();
    type TaskData = SlotRuns<u32>;

    fn name(&self) -> &'static str {
        match self.kind {
            IndexKind::Poly => "poly_idx",
            IndexKind::Edge => "edge_idx",
            IndexKind::Vert => "vert_idx",
        }
    }

    fn buffer(&self) -> BufferType {
        match self.kind {
            IndexKind::Poly => BufferType::Vbo(VboType::PolyIdx),
            IndexKind::Edge => BufferType::Vbo(VboType::EdgeIdx),
            IndexKind::Vert => BufferType::Vbo(VboType::VertIdx),
        }
    }

    fn iter_mesh(&self) -> IterDomain {
        match self.kind {
            IndexKind::Poly => IterDomain::POLY,
            IndexKind::Edge => IterDomain::POLY | IterDomain::LEDGE,
            IndexKind::Vert => IterDomain::POLY | IterDomain::LEDGE | IterDomain::LVERT,
        }
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        let format = VertFormat::new().attr("index", CompType::U32, 1);
        alloc_vbo(slot, self.name(), format, loop_vertex_len(mr), ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<u32> {
        SlotRuns::new()
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.poly(mr, index, task);
    }

    fn iter_ledge_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, edge: &MeshEdge, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_ledge_bm(&self, mr: &MeshRenderData, _bm: &BMesh, edge: &BmEdge, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.ledge(mr, edge.v, index, task);
    }

    fn iter_lvert_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _vert: &MeshVert, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.lvert(mr, index, task);
    }

    fn iter_lvert_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _vert: &BmVert, index: usize, _data: &(), task: &mut SlotRuns<u32>) {
        self.lvert(mr, index, task);
    }

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: SlotRuns<u32>) -> Result<()> {
        finish_vbo(slot, self.name(), &task)
    }
}
