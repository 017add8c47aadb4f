//! Final (evaluated) mesh stored as flat element arrays.

use std::collections::HashMap;

use crate::core::{Error, Result};
use crate::core::types::{Vec2, Vec3};
use super::elements::{ElemFlags, MeshEdge, MeshLoop, MeshPoly, MeshVert, OrigIndex, UvLayer, check_loop_spans};

/// Evaluated mesh: vertices, edges, polygons and face corners (loops).
#[derive(Clone, Debug)]
pub struct Mesh {
    pub verts: Vec<MeshVert>,
    pub edges: Vec<MeshEdge>,
    pub polys: Vec<MeshPoly>,
    pub loops: Vec<MeshLoop>,
    /// Material slot count (0 behaves like 1)
    pub mat_len: u16,
    /// Per-loop UV layers
    pub uv_layers: Vec<UvLayer>,
    /// Index of the active UV layer
    pub active_uv: usize,
    /// Split smooth normals at sharp edges and angles above `smooth_angle`
    pub auto_smooth: bool,
    /// Split angle in radians (only with `auto_smooth`)
    pub smooth_angle: f32,
    /// Mapping back to the original mesh, present on evaluated meshes
    pub origindex: Option<OrigIndex>,
    /// False when the mesh is the product of a modifier stack
    pub is_original: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            verts: Vec::new(),
            edges: Vec::new(),
            polys: Vec::new(),
            loops: Vec::new(),
            mat_len: 1,
            uv_layers: Vec::new(),
            active_uv: 0,
            auto_smooth: false,
            smooth_angle: std::f32::consts::PI,
            origindex: None,
            is_original: true,
        }
    }
}

impl Mesh {
    /// Build a mesh from positions and polygon vertex lists.
    ///
    /// Edges are deduplicated across faces; every face corner gets one loop
    /// whose edge leads to the next corner.
    pub fn from_polygons(positions: &[Vec3], faces: &[Vec<u32>]) -> Result<Self> {
        let mut mesh = Mesh {
            verts: positions
                .iter()
                .map(|&co| MeshVert { co, flag: ElemFlags::empty() })
                .collect(),
            ..Default::default()
        };

        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();
        for face in faces {
            if face.len() < 3 {
                return Err(Error::InvalidMesh(format!(
                    "polygon with {} corners", face.len()
                )));
            }
            let loopstart = mesh.loops.len() as u32;
            for (i, &v) in face.iter().enumerate() {
                let v_next = face[(i + 1) % face.len()];
                if v as usize >= positions.len() || v_next as usize >= positions.len() {
                    return Err(Error::InvalidMesh(format!("vertex index {} out of range", v.max(v_next))));
                }
                let key = (v.min(v_next), v.max(v_next));
                let e = *edge_map.entry(key).or_insert_with(|| {
                    mesh.edges.push(MeshEdge { v: [key.0, key.1], flag: ElemFlags::empty() });
                    (mesh.edges.len() - 1) as u32
                });
                mesh.loops.push(MeshLoop { v, e });
            }
            mesh.polys.push(MeshPoly {
                loopstart,
                totloop: face.len() as u32,
                mat_nr: 0,
                flag: ElemFlags::empty(),
            });
        }

        mesh.update_loose_flags();
        Ok(mesh)
    }

    /// Add a vertex not connected to anything. Returns its index.
    pub fn add_loose_vert(&mut self, co: Vec3) -> u32 {
        self.verts.push(MeshVert { co, flag: ElemFlags::empty() });
        (self.verts.len() - 1) as u32
    }

    /// Add an edge not used by any face. Returns its index.
    pub fn add_loose_edge(&mut self, v1: u32, v2: u32) -> u32 {
        self.edges.push(MeshEdge { v: [v1, v2], flag: ElemFlags::LOOSE });
        (self.edges.len() - 1) as u32
    }

    /// Add a UV layer; `uvs` must hold one coordinate per loop.
    pub fn add_uv_layer(&mut self, name: &str, uvs: Vec<Vec2>) -> Result<()> {
        if uvs.len() != self.loops.len() {
            return Err(Error::InvalidMesh(format!(
                "uv layer '{}' has {} entries, mesh has {} loops",
                name, uvs.len(), self.loops.len()
            )));
        }
        self.uv_layers.push(UvLayer { name: name.to_string(), uvs });
        Ok(())
    }

    /// Recompute the `LOOSE` flag of every edge from loop usage.
    pub fn update_loose_flags(&mut self) {
        for edge in &mut self.edges {
            edge.flag.insert(ElemFlags::LOOSE);
        }
        for ml in &self.loops {
            if let Some(edge) = self.edges.get_mut(ml.e as usize) {
                edge.flag.remove(ElemFlags::LOOSE);
            }
        }
    }

    /// Assign a material index to every polygon in `polys`.
    pub fn set_material(&mut self, polys: impl IntoIterator<Item = usize>, mat_nr: u16) {
        for p in polys {
            if let Some(poly) = self.polys.get_mut(p) {
                poly.mat_nr = mat_nr;
            }
        }
        self.mat_len = self.mat_len.max(mat_nr + 1);
    }

    /// Material count used for drawing (at least one).
    pub fn render_mat_len(&self) -> usize {
        (self.mat_len as usize).max(1)
    }

    /// Check that every index stored in the mesh is in range and that the
    /// polygons partition the loops.
    pub fn validate(&self) -> Result<()> {
        let vert_len = self.verts.len() as u32;
        let edge_len = self.edges.len() as u32;

        if let Some(edge) = self.edges.iter().find(|e| e.v[0] >= vert_len || e.v[1] >= vert_len) {
            return Err(Error::InvalidMesh(format!("edge {:?} references missing vertex", edge.v)));
        }
        if let Some(ml) = self.loops.iter().find(|l| l.v >= vert_len || l.e >= edge_len) {
            return Err(Error::InvalidMesh(format!("loop {:?} out of range", ml)));
        }
        check_loop_spans(self.polys.iter().map(|p| (p.loopstart, p.totloop)), self.loops.len())?;
        for layer in &self.uv_layers {
            if layer.uvs.len() != self.loops.len() {
                return Err(Error::InvalidMesh(format!("uv layer '{}' size mismatch", layer.name)));
            }
        }
        if let Some(orig) = &self.origindex {
            if orig.vert.len() != self.verts.len()
                || orig.edge.len() != self.edges.len()
                || orig.poly.len() != self.polys.len()
            {
                return Err(Error::InvalidMesh("origindex layer size mismatch".to_string()));
            }
        }
        Ok(())
    }

    pub fn vert_len(&self) -> usize {
        self.verts.len()
    }

    pub fn edge_len(&self) -> usize {
        self.edges.len()
    }

    pub fn poly_len(&self) -> usize {
        self.polys.len()
    }

    pub fn loop_len(&self) -> usize {
        self.loops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::from_polygons(&positions, &[vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_from_polygons_counts() {
        let mesh = quad();
        assert_eq!(mesh.vert_len(), 4);
        assert_eq!(mesh.edge_len(), 4);
        assert_eq!(mesh.poly_len(), 1);
        assert_eq!(mesh.loop_len(), 4);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_shared_edges_deduplicated() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_polygons(&positions, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap();
        // 3 + 3 edges with the diagonal shared
        assert_eq!(mesh.edge_len(), 5);
        assert!(mesh.edges.iter().all(|e| !e.flag.contains(ElemFlags::LOOSE)));
    }

    #[test]
    fn test_loop_edges_lead_to_next_corner() {
        let mesh = quad();
        for poly in &mesh.polys {
            for l in poly.loops() {
                let next = if l + 1 == poly.loops().end { poly.loops().start } else { l + 1 };
                let edge = mesh.edges[mesh.loops[l].e as usize];
                let (a, b) = (mesh.loops[l].v, mesh.loops[next].v);
                assert!(edge.v == [a.min(b), a.max(b)]);
            }
        }
    }

    #[test]
    fn test_loose_geometry() {
        let mut mesh = quad();
        let v = mesh.add_loose_vert(Vec3::new(5.0, 5.0, 5.0));
        let e = mesh.add_loose_edge(0, v);
        assert!(mesh.edges[e as usize].flag.contains(ElemFlags::LOOSE));
        mesh.update_loose_flags();
        assert!(mesh.edges[e as usize].flag.contains(ElemFlags::LOOSE));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let positions = [Vec3::ZERO, Vec3::X];
        assert!(Mesh::from_polygons(&positions, &[vec![0, 1]]).is_err());
    }

    #[test]
    fn test_orphaned_loops_rejected() {
        let mut mesh = crate::mesh::primitives::grid(2, 1);
        assert!(mesh.validate().is_ok());
        mesh.polys.pop();
        assert!(matches!(mesh.validate(), Err(Error::InvalidMesh(_))));
    }

    #[test]
    fn test_out_of_range_vertex_rejected() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(Mesh::from_polygons(&positions, &[vec![0, 1, 7]]).is_err());
    }

    #[test]
    fn test_uv_layer_size_checked() {
        let mut mesh = quad();
        assert!(mesh.add_uv_layer("UVMap", vec![Vec2::ZERO; 3]).is_err());
        assert!(mesh.add_uv_layer("UVMap", vec![Vec2::ZERO; 4]).is_ok());
        assert_eq!(mesh.uv_layers.len(), 1);
    }

    #[test]
    fn test_set_material_grows_mat_len() {
        let mut mesh = quad();
        assert_eq!(mesh.render_mat_len(), 1);
        mesh.set_material([0], 2);
        assert_eq!(mesh.polys[0].mat_nr, 2);
        assert_eq!(mesh.render_mat_len(), 3);
    }
}
