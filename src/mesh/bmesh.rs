//! Edit-mode mesh representation
//!
//! `BMesh` keeps per-element normals and adjacency counts up to date so the
//! extraction pass can read them without recomputation. `EditMesh` bundles
//! it with the optional evaluated cage and final meshes produced for drawing.

use crate::core::{Error, Result};
use crate::core::types::{Vec2, Vec3};
use super::elements::{ElemFlags, LoopTri, UvLayer, check_loop_spans, poly_to_tri_count};
use super::looptri::triangulate_spans;
use super::mesh::Mesh;
use super::normals::newell_normal;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BmVert {
    pub co: Vec3,
    pub no: Vec3,
    pub flag: ElemFlags,
    /// Number of edges using this vertex
    pub edge_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BmEdge {
    pub v: [u32; 2],
    pub flag: ElemFlags,
    /// Number of faces using this edge
    pub face_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BmFace {
    pub loop_start: u32,
    pub len: u32,
    pub mat_nr: u16,
    pub flag: ElemFlags,
    pub no: Vec3,
}

impl BmFace {
    pub fn loops(&self) -> std::ops::Range<usize> {
        self.loop_start as usize..(self.loop_start + self.len) as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BmLoop {
    pub v: u32,
    pub e: u32,
    pub f: u32,
}

/// Edit mesh with cached normals and triangulation.
#[derive(Clone, Debug, Default)]
pub struct BMesh {
    pub verts: Vec<BmVert>,
    pub edges: Vec<BmEdge>,
    pub faces: Vec<BmFace>,
    pub loops: Vec<BmLoop>,
    /// Triangulation, kept valid while editing
    pub looptris: Vec<LoopTri>,
    pub act_vert: Option<u32>,
    pub act_edge: Option<u32>,
    pub act_face: Option<u32>,
    pub uv_layers: Vec<UvLayer>,
    pub active_uv: usize,
    pub mat_len: u16,
}

impl BMesh {
    /// Convert a final mesh into an edit mesh, computing normals and triangulation.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut bm = BMesh {
            verts: mesh
                .verts
                .iter()
                .map(|v| BmVert { co: v.co, no: Vec3::ZERO, flag: v.flag, edge_count: 0 })
                .collect(),
            edges: mesh
                .edges
                .iter()
                .map(|e| BmEdge { v: e.v, flag: e.flag - ElemFlags::LOOSE, face_count: 0 })
                .collect(),
            faces: mesh
                .polys
                .iter()
                .map(|p| BmFace {
                    loop_start: p.loopstart,
                    len: p.totloop,
                    mat_nr: p.mat_nr,
                    flag: p.flag,
                    no: Vec3::Z,
                })
                .collect(),
            loops: Vec::with_capacity(mesh.loops.len()),
            looptris: Vec::new(),
            act_vert: None,
            act_edge: None,
            act_face: None,
            uv_layers: mesh.uv_layers.clone(),
            active_uv: mesh.active_uv,
            mat_len: mesh.mat_len,
        };
        for (f, poly) in mesh.polys.iter().enumerate() {
            bm.faces[f].loop_start = bm.loops.len() as u32;
            for l in poly.loops() {
                let ml = mesh.loops[l];
                bm.loops.push(BmLoop { v: ml.v, e: ml.e, f: f as u32 });
            }
        }
        bm.update_counts();
        bm.update_normals();
        bm.update_looptris();
        bm
    }

    /// Recount edge and face usage of verts and edges.
    pub fn update_counts(&mut self) {
        for v in &mut self.verts {
            v.edge_count = 0;
        }
        for e in &mut self.edges {
            e.face_count = 0;
        }
        for e in &self.edges {
            for &v in &e.v {
                if let Some(vert) = self.verts.get_mut(v as usize) {
                    vert.edge_count += 1;
                }
            }
        }
        for l in &self.loops {
            if let Some(edge) = self.edges.get_mut(l.e as usize) {
                edge.face_count += 1;
            }
        }
    }

    /// Recompute face and vertex normals.
    pub fn update_normals(&mut self) {
        for face in &mut self.faces {
            let loops = &self.loops;
            let verts = &self.verts;
            face.no = newell_normal(face.loops().map(|l| verts[loops[l].v as usize].co));
        }
        let mut sums = vec![Vec3::ZERO; self.verts.len()];
        for l in &self.loops {
            sums[l.v as usize] += self.faces[l.f as usize].no;
        }
        for (v, sum) in self.verts.iter_mut().zip(sums) {
            v.no = sum.try_normalize().or_else(|| v.co.try_normalize()).unwrap_or(Vec3::Z);
        }
    }

    /// Recompute the triangulation.
    pub fn update_looptris(&mut self) {
        self.looptris = triangulate_spans(
            self.faces.iter().map(|f| (f.loop_start, f.len)),
            poly_to_tri_count(self.faces.len(), self.loops.len()),
        );
    }

    /// Check element references, face loop spans and that the triangulation
    /// matches the faces.
    pub fn validate(&self) -> Result<()> {
        let (vert_len, edge_len, face_len) = (self.verts.len(), self.edges.len(), self.faces.len());
        if let Some(e) = self.edges.iter().position(|e| e.v.iter().any(|&v| v as usize >= vert_len)) {
            return Err(Error::InvalidMesh(format!("edit mesh edge {} references missing vertex", e)));
        }
        if let Some(l) = self
            .loops
            .iter()
            .position(|l| l.v as usize >= vert_len || l.e as usize >= edge_len || l.f as usize >= face_len)
        {
            return Err(Error::InvalidMesh(format!("edit mesh loop {} out of range", l)));
        }
        check_loop_spans(self.faces.iter().map(|f| (f.loop_start, f.len)), self.loops.len())?;
        for (f, face) in self.faces.iter().enumerate() {
            if face.loops().any(|l| self.loops[l].f as usize != f) {
                return Err(Error::InvalidMesh(format!("edit mesh face {} owns loops of another face", f)));
            }
        }
        let tri_len = poly_to_tri_count(face_len, self.loops.len());
        let stale = self.looptris.len() != tri_len
            || self.looptris.iter().any(|t| {
                t.poly as usize >= face_len || t.tri.iter().any(|&l| l as usize >= self.loops.len())
            });
        if stale {
            return Err(Error::InvalidMesh(format!(
                "edit mesh triangulation is stale: {} triangles for {} expected",
                self.looptris.len(),
                tri_len
            )));
        }
        Ok(())
    }

    /// Select or deselect a vertex.
    pub fn select_vert(&mut self, v: usize, select: bool) {
        if let Some(vert) = self.verts.get_mut(v) {
            vert.flag.set(ElemFlags::SELECT, select);
        }
    }

    /// Hide a face.
    pub fn hide_face(&mut self, f: usize, hide: bool) {
        if let Some(face) = self.faces.get_mut(f) {
            face.flag.set(ElemFlags::HIDDEN, hide);
        }
    }

    /// UV coordinate of a loop in the active layer.
    pub fn loop_uv(&self, l: usize) -> Option<Vec2> {
        self.uv_layers.get(self.active_uv).and_then(|layer| layer.uvs.get(l).copied())
    }

    pub fn render_mat_len(&self) -> usize {
        (self.mat_len as usize).max(1)
    }
}

/// Edit-mode state of a mesh object.
#[derive(Clone, Debug, Default)]
pub struct EditMesh {
    pub bm: BMesh,
    /// Evaluated mesh shown as the editing cage
    pub mesh_eval_cage: Option<Mesh>,
    /// Fully evaluated mesh
    pub mesh_eval_final: Option<Mesh>,
}

impl EditMesh {
    pub fn new(bm: BMesh) -> Self {
        Self { bm, mesh_eval_cage: None, mesh_eval_final: None }
    }
}

/// Mesh object the batch cache is built for.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub mesh: Mesh,
    pub edit: Option<EditMesh>,
}

impl MeshData {
    pub fn new(mesh: Mesh) -> Self {
        Self { mesh, edit: None }
    }

    /// Enter edit mode by building a BMesh from the current mesh.
    pub fn begin_edit(&mut self) {
        self.edit = Some(EditMesh::new(BMesh::from_mesh(&self.mesh)));
    }

    pub fn end_edit(&mut self) {
        self.edit = None;
    }

    pub fn is_editmode(&self) -> bool {
        self.edit.is_some()
    }
}
