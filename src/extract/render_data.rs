//! Per-pass read-only view of the mesh being extracted
//!
//! `MeshRenderData` is created by the upstream task of an extraction
//! sub-graph. It picks the representation to read from (BMesh, mapped or
//! plain evaluated mesh), then computes only the derived arrays the
//! scheduled extractors asked for.

use std::ops::Range;

use crate::cache::CacheVariant;
use crate::config::RunFlags;
use crate::core::Result;
use crate::core::types::Vec3;
use crate::mesh::{
    BMesh, CustomDataMask, ElemFlags, LoopTri, Mesh, MeshData, ORIGINDEX_NONE, OrigIndex,
    poly_to_tri_count,
};
use crate::mesh::{looptri, normals};
use super::types::{DataFlags, Domain, ExtractType, IterDomain};

/// Mesh representation being read.
#[derive(Clone, Copy, Debug)]
pub enum RenderSource<'a> {
    Mesh(&'a Mesh),
    BMesh(&'a BMesh),
}

/// Read-only render view of one mesh for one extraction pass.
#[derive(Debug)]
pub struct MeshRenderData<'a> {
    pub extract_type: ExtractType,
    source: RenderSource<'a>,
    pub vert_len: usize,
    pub edge_len: usize,
    pub poly_len: usize,
    pub loop_len: usize,
    pub tri_len: usize,
    pub mat_len: usize,
    /// Loose vertices (no edge), as vertex indices
    pub loose_verts: Vec<u32>,
    /// Loose edges (no face), as edge indices
    pub loose_edges: Vec<u32>,
    /// Extra vertex slots for loose geometry: two per edge, one per vertex
    pub loop_loose_len: usize,
    mesh_looptris: Vec<LoopTri>,
    pub poly_normals: Vec<Vec3>,
    pub vert_normals: Vec<Vec3>,
    pub loop_normals: Vec<Vec3>,
    /// Triangle ranges per material over visible triangles sorted by material
    pub mat_tri_ranges: Vec<Range<u32>>,
    pub visible_tri_len: usize,
    /// Derived arrays available
    pub computed: DataFlags,
    pub use_hide: bool,
    pub use_final_mesh: bool,
    pub is_mode_active: bool,
    pub cd_used: CustomDataMask,
    pub origindex: Option<&'a OrigIndex>,
}

/// Representation and extract type for one variant of `data`.
pub fn extract_source<'a>(
    data: &'a MeshData,
    flags: &RunFlags,
    variant: CacheVariant,
) -> (ExtractType, RenderSource<'a>) {
    let mesh_source = |mesh: &'a Mesh| {
        let mapped = flags.is_paint_mode && mesh.origindex.is_some() && !mesh.is_original;
        let extract_type = if mapped { ExtractType::Mapped } else { ExtractType::Mesh };
        (extract_type, RenderSource::Mesh(mesh))
    };

    let edit = match (&data.edit, flags.is_editmode) {
        (Some(edit), true) => edit,
        _ => return mesh_source(&data.mesh),
    };
    let bm_source = (ExtractType::BMesh, RenderSource::BMesh(&edit.bm));
    match variant {
        CacheVariant::Final => match &edit.mesh_eval_final {
            Some(mesh) if flags.do_final_mesh => (ExtractType::Mesh, RenderSource::Mesh(mesh)),
            _ => bm_source,
        },
        CacheVariant::Cage => match &edit.mesh_eval_cage {
            Some(mesh) if mesh.origindex.is_some() => (ExtractType::Mapped, RenderSource::Mesh(mesh)),
            _ => bm_source,
        },
        CacheVariant::UvCage => bm_source,
    }
}

impl<'a> MeshRenderData<'a> {
    /// Create the view with counts only; derived data comes from [`update`](Self::update).
    pub fn new(
        data: &'a MeshData,
        flags: &RunFlags,
        variant: CacheVariant,
        cd_used: CustomDataMask,
    ) -> Result<Self> {
        let (extract_type, source) = extract_source(data, flags, variant);
        let (vert_len, edge_len, poly_len, loop_len, mat_len, origindex) = match source {
            RenderSource::Mesh(mesh) => {
                mesh.validate()?;
                let origindex = if extract_type == ExtractType::Mapped { mesh.origindex.as_ref() } else { None };
                (mesh.vert_len(), mesh.edge_len(), mesh.poly_len(), mesh.loop_len(), mesh.render_mat_len(), origindex)
            }
            RenderSource::BMesh(bm) => {
                bm.validate()?;
                (bm.verts.len(), bm.edges.len(), bm.faces.len(), bm.loops.len(), bm.render_mat_len(), None)
            }
        };

        Ok(Self {
            extract_type,
            source,
            vert_len,
            edge_len,
            poly_len,
            loop_len,
            tri_len: poly_to_tri_count(poly_len, loop_len),
            mat_len,
            loose_verts: Vec::new(),
            loose_edges: Vec::new(),
            loop_loose_len: 0,
            mesh_looptris: Vec::new(),
            poly_normals: Vec::new(),
            vert_normals: Vec::new(),
            loop_normals: Vec::new(),
            mat_tri_ranges: Vec::new(),
            visible_tri_len: 0,
            computed: DataFlags::empty(),
            use_hide: flags.use_hide,
            use_final_mesh: extract_type != ExtractType::BMesh,
            is_mode_active: flags.is_mode_active,
            cd_used,
            origindex,
        })
    }

    /// Compute the derived arrays in `needs` (plus their prerequisites).
    pub fn update(&mut self, needs: DataFlags, domains: IterDomain) {
        let mut needs = needs;
        if domains.intersects(IterDomain::LEDGE | IterDomain::LVERT) {
            needs |= DataFlags::LOOSE_GEOM;
        }
        if domains.contains(IterDomain::LOOPTRI) || needs.contains(DataFlags::MAT_OFFSETS) {
            needs |= DataFlags::LOOPTRI;
        }
        if needs.intersects(DataFlags::VERT_NOR | DataFlags::LOOP_NOR) {
            needs |= DataFlags::POLY_NOR;
        }

        if needs.contains(DataFlags::LOOSE_GEOM) {
            self.update_loose_geom();
        }
        if needs.contains(DataFlags::LOOPTRI) {
            self.update_looptris();
        }
        if needs.intersects(DataFlags::POLY_NOR | DataFlags::VERT_NOR | DataFlags::LOOP_NOR) {
            self.update_normals(needs);
        }
        if needs.contains(DataFlags::MAT_OFFSETS) {
            self.update_mat_offsets();
        }
        log::trace!("render data {:?}: computed {:?}", self.extract_type, self.computed);
    }

    fn update_loose_geom(&mut self) {
        if self.computed.contains(DataFlags::LOOSE_GEOM) {
            return;
        }
        match self.source {
            RenderSource::Mesh(mesh) => {
                let mut vert_used = vec![false; mesh.verts.len()];
                for (e, edge) in mesh.edges.iter().enumerate() {
                    vert_used[edge.v[0] as usize] = true;
                    vert_used[edge.v[1] as usize] = true;
                    if edge.flag.contains(ElemFlags::LOOSE) {
                        self.loose_edges.push(e as u32);
                    }
                }
                self.loose_verts = (0..mesh.verts.len() as u32).filter(|&v| !vert_used[v as usize]).collect();
            }
            RenderSource::BMesh(bm) => {
                self.loose_edges = (0..bm.edges.len() as u32)
                    .filter(|&e| bm.edges[e as usize].face_count == 0)
                    .collect();
                self.loose_verts = (0..bm.verts.len() as u32)
                    .filter(|&v| bm.verts[v as usize].edge_count == 0)
                    .collect();
            }
        }
        self.loop_loose_len = self.loose_verts.len() + 2 * self.loose_edges.len();
        self.computed |= DataFlags::LOOSE_GEOM;
    }

    fn update_looptris(&mut self) {
        if self.computed.contains(DataFlags::LOOPTRI) {
            return;
        }
        if let RenderSource::Mesh(mesh) = self.source {
            self.mesh_looptris = looptri::triangulate_polys(&mesh.polys, mesh.loops.len());
        }
        // The looptri domain is scanned over the triangulation actually built
        self.tri_len = self.looptris().len();
        self.computed |= DataFlags::LOOPTRI;
    }

    fn update_normals(&mut self, needs: DataFlags) {
        match self.source {
            RenderSource::Mesh(mesh) => {
                if !self.computed.contains(DataFlags::POLY_NOR) {
                    self.poly_normals = normals::poly_normals(mesh);
                    self.computed |= DataFlags::POLY_NOR;
                }
                if needs.contains(DataFlags::VERT_NOR) && !self.computed.contains(DataFlags::VERT_NOR) {
                    self.vert_normals = normals::vert_normals(mesh, &self.poly_normals);
                    self.computed |= DataFlags::VERT_NOR;
                }
                // Loop normals only differ from face/vertex normals with auto-smooth
                if needs.contains(DataFlags::LOOP_NOR) && mesh.auto_smooth && !self.computed.contains(DataFlags::LOOP_NOR) {
                    self.loop_normals = normals::loop_normals(mesh, &self.poly_normals);
                    self.computed |= DataFlags::LOOP_NOR;
                }
            }
            RenderSource::BMesh(bm) => {
                if !self.computed.contains(DataFlags::POLY_NOR) {
                    self.poly_normals = bm.faces.iter().map(|f| f.no).collect();
                    self.computed |= DataFlags::POLY_NOR;
                }
                if needs.contains(DataFlags::VERT_NOR) && !self.computed.contains(DataFlags::VERT_NOR) {
                    self.vert_normals = bm.verts.iter().map(|v| v.no).collect();
                    self.computed |= DataFlags::VERT_NOR;
                }
            }
        }
    }

    fn update_mat_offsets(&mut self) {
        if self.computed.contains(DataFlags::MAT_OFFSETS) {
            return;
        }
        let mat_last = self.mat_len - 1;
        let mut counts = vec![0u32; self.mat_len];
        for tri in self.looptris() {
            if !self.poly_hidden(tri.poly as usize) {
                counts[(self.poly_mat(tri.poly as usize) as usize).min(mat_last)] += 1;
            }
        }
        let mut start = 0;
        self.mat_tri_ranges = counts
            .iter()
            .map(|&count| {
                let range = start..start + count;
                start += count;
                range
            })
            .collect();
        self.visible_tri_len = start as usize;
        self.computed |= DataFlags::MAT_OFFSETS;
    }

    pub fn source(&self) -> RenderSource<'a> {
        self.source
    }

    /// Triangulation of the source; empty until computed
    pub fn looptris(&self) -> &[LoopTri] {
        match self.source {
            RenderSource::Mesh(_) => &self.mesh_looptris,
            RenderSource::BMesh(bm) => &bm.looptris,
        }
    }

    /// Number of elements scanned for `domain`
    pub fn domain_len(&self, domain: Domain) -> usize {
        match domain {
            Domain::Looptri => self.tri_len,
            Domain::Poly => self.poly_len,
            Domain::Ledge => self.loose_edges.len(),
            Domain::Lvert => self.loose_verts.len(),
        }
    }

    /// Vertex slot of the first end of loose edge `ledge`
    pub fn ledge_loop(&self, ledge: usize) -> usize {
        self.loop_len + ledge * 2
    }

    /// Vertex slot of loose vertex `lvert`
    pub fn lvert_loop(&self, lvert: usize) -> usize {
        self.loop_len + self.loose_edges.len() * 2 + lvert
    }

    /// Hidden polygons are skipped when `use_hide` is set; mapped polygons
    /// without an original are always hidden.
    pub fn poly_hidden(&self, p: usize) -> bool {
        if let Some(orig) = self.origindex {
            if orig.poly.get(p).is_some_and(|&o| o == ORIGINDEX_NONE) {
                return true;
            }
        }
        if !self.use_hide {
            return false;
        }
        match self.source {
            RenderSource::Mesh(mesh) => mesh.polys[p].flag.contains(ElemFlags::HIDDEN),
            RenderSource::BMesh(bm) => bm.faces[p].flag.contains(ElemFlags::HIDDEN),
        }
    }

    pub fn edge_hidden(&self, e: usize) -> bool {
        if let Some(orig) = self.origindex {
            if orig.edge.get(e).is_some_and(|&o| o == ORIGINDEX_NONE) {
                return true;
            }
        }
        if !self.use_hide {
            return false;
        }
        match self.source {
            RenderSource::Mesh(mesh) => mesh.edges[e].flag.contains(ElemFlags::HIDDEN),
            RenderSource::BMesh(bm) => bm.edges[e].flag.contains(ElemFlags::HIDDEN),
        }
    }

    pub fn vert_hidden(&self, v: usize) -> bool {
        if let Some(orig) = self.origindex {
            if orig.vert.get(v).is_some_and(|&o| o == ORIGINDEX_NONE) {
                return true;
            }
        }
        if !self.use_hide {
            return false;
        }
        match self.source {
            RenderSource::Mesh(mesh) => mesh.verts[v].flag.contains(ElemFlags::HIDDEN),
            RenderSource::BMesh(bm) => bm.verts[v].flag.contains(ElemFlags::HIDDEN),
        }
    }

    pub fn poly_mat(&self, p: usize) -> u16 {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.polys[p].mat_nr,
            RenderSource::BMesh(bm) => bm.faces[p].mat_nr,
        }
    }

    /// Loop range of polygon `p`
    pub fn poly_loops(&self, p: usize) -> Range<usize> {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.polys[p].loops(),
            RenderSource::BMesh(bm) => bm.faces[p].loops(),
        }
    }

    /// Vertex of loop `l`
    pub fn loop_vert(&self, l: usize) -> u32 {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.loops[l].v,
            RenderSource::BMesh(bm) => bm.loops[l].v,
        }
    }

    /// Edge of loop `l`
    pub fn loop_edge(&self, l: usize) -> u32 {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.loops[l].e,
            RenderSource::BMesh(bm) => bm.loops[l].e,
        }
    }

    pub fn edge_verts(&self, e: usize) -> [u32; 2] {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.edges[e].v,
            RenderSource::BMesh(bm) => bm.edges[e].v,
        }
    }

    pub fn poly_flag(&self, p: usize) -> ElemFlags {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.polys[p].flag,
            RenderSource::BMesh(bm) => bm.faces[p].flag,
        }
    }

    pub fn edge_flag(&self, e: usize) -> ElemFlags {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.edges[e].flag,
            RenderSource::BMesh(bm) => bm.edges[e].flag,
        }
    }

    pub fn vert_flag(&self, v: usize) -> ElemFlags {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.verts[v].flag,
            RenderSource::BMesh(bm) => bm.verts[v].flag,
        }
    }

    /// Active vertex, edge and face of the edit mesh
    pub fn active_elems(&self) -> (Option<u32>, Option<u32>, Option<u32>) {
        match self.source {
            RenderSource::Mesh(_) => (None, None, None),
            RenderSource::BMesh(bm) => (bm.act_vert, bm.act_edge, bm.act_face),
        }
    }

    pub fn vert_co(&self, v: usize) -> Vec3 {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.verts[v].co,
            RenderSource::BMesh(bm) => bm.verts[v].co,
        }
    }

    /// UV layers of the source
    pub fn uv_layers(&self) -> &'a [crate::mesh::UvLayer] {
        match self.source {
            RenderSource::Mesh(mesh) => &mesh.uv_layers,
            RenderSource::BMesh(bm) => &bm.uv_layers,
        }
    }

    pub fn active_uv(&self) -> usize {
        match self.source {
            RenderSource::Mesh(mesh) => mesh.active_uv,
            RenderSource::BMesh(bm) => bm.active_uv,
        }
    }

    /// Original index of element `i` in `layer`, or `i` itself when unmapped
    pub fn orig_index(&self, layer: fn(&OrigIndex) -> &[i32], i: usize) -> u32 {
        match self.origindex {
            Some(orig) => layer(orig).get(i).and_then(|&o| u32::try_from(o).ok()).unwrap_or(u32::MAX),
            None => i as u32,
        }
    }
}
