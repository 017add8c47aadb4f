//! Mesh data model consumed by the extraction pipeline
//!
//! Two representations exist: the flat evaluated [`Mesh`] and the edit-mode
//! [`BMesh`]. Both expose the same element kinds (vertices, edges, polygons
//! and loops) and the derived data the extractors read.

pub mod elements;
pub mod mesh;
pub mod bmesh;
pub mod looptri;
pub mod normals;
pub mod custom_data;
pub mod primitives;

pub use elements::{
    ElemFlags, LoopTri, MeshEdge, MeshLoop, MeshPoly, MeshVert, ORIGINDEX_NONE, OrigIndex, UvLayer,
    check_loop_spans, poly_to_tri_count,
};
pub use mesh::Mesh;
pub use bmesh::{BMesh, BmEdge, BmFace, BmLoop, BmVert, EditMesh, MeshData};
pub use custom_data::{AtomicCustomDataMask, CustomDataMask, MAX_UV_LAYERS};
