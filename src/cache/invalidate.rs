//! Cache invalidation policy
//!
//! A cache is either uninitialised, valid for a set of structural keys, or
//! dirty. Validation compares the keys of the mesh about to be drawn with the
//! ones the buffers were built for; any mismatch (or a full dirty tag) clears
//! the whole cache. Partial dirty tags discard only the buffers an edit can
//! affect, together with every batch reading them.

use crate::config::RunFlags;
use crate::mesh::MeshData;
use super::buffers::{BufferType, IboType, VboType};

/// Lifecycle of a batch cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheState {
    /// Never validated
    #[default]
    Uninitialized,
    /// Buffers match the keys
    Valid,
    /// Must be cleared before the next build
    Dirty,
}

/// Kind of edit reported to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirtyReason {
    /// Anything may have changed; the cache is rebuilt from scratch
    All,
    /// Edit-mode selection or active element
    Select,
    /// Hidden state of vertices, edges or faces
    Hide,
    /// Paint-mode face/vertex masking (packed in the normal attribute)
    SelectPaint,
    /// Materials, smoothing or custom-data layers
    Shading,
    /// UV coordinates or UV selection
    UvEdit,
}

impl DirtyReason {
    /// Buffers discarded by a partial tag; empty for [`DirtyReason::All`].
    pub fn discarded_buffers(self) -> &'static [BufferType] {
        match self {
            DirtyReason::All => &[],
            DirtyReason::Select => &[
                BufferType::Vbo(VboType::EditData),
                BufferType::Vbo(VboType::FdotsPos),
                BufferType::Ibo(IboType::Fdots),
            ],
            DirtyReason::Hide => &[
                BufferType::Vbo(VboType::PosNor),
                BufferType::Vbo(VboType::Lnor),
                BufferType::Ibo(IboType::Tris),
                BufferType::Ibo(IboType::Lines),
                BufferType::Ibo(IboType::Points),
                BufferType::Ibo(IboType::Fdots),
                BufferType::Ibo(IboType::EdituvTris),
                BufferType::Ibo(IboType::EdituvLines),
            ],
            DirtyReason::SelectPaint => &[
                BufferType::Vbo(VboType::PosNor),
                BufferType::Vbo(VboType::Lnor),
            ],
            DirtyReason::Shading => &[
                BufferType::Vbo(VboType::Lnor),
                BufferType::Vbo(VboType::Uv),
                BufferType::Ibo(IboType::Tris),
            ],
            DirtyReason::UvEdit => &[
                BufferType::Vbo(VboType::Uv),
                BufferType::Vbo(VboType::StretchArea),
                BufferType::Ibo(IboType::EdituvTris),
                BufferType::Ibo(IboType::EdituvLines),
            ],
        }
    }
}

/// Structural keys a cache is valid for.
///
/// Counts are read from the representation being drawn: the BMesh in edit
/// mode, the mesh otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheKeys {
    pub vert_len: usize,
    pub edge_len: usize,
    pub poly_len: usize,
    pub mat_len: usize,
    pub is_editmode: bool,
}

impl CacheKeys {
    pub fn from_data(data: &MeshData, flags: &RunFlags) -> Self {
        match (&data.edit, flags.is_editmode) {
            (Some(edit), true) => Self {
                vert_len: edit.bm.verts.len(),
                edge_len: edit.bm.edges.len(),
                poly_len: edit.bm.faces.len(),
                mat_len: edit.bm.render_mat_len(),
                is_editmode: true,
            },
            _ => Self {
                vert_len: data.mesh.vert_len(),
                edge_len: data.mesh.edge_len(),
                poly_len: data.mesh.poly_len(),
                mat_len: data.mesh.render_mat_len(),
                is_editmode: false,
            },
        }
    }
}

/// Whether a cache in `state` built for `cached` can serve `current`.
pub fn is_valid(state: CacheState, cached: &CacheKeys, current: &CacheKeys) -> bool {
    state == CacheState::Valid && cached == current
}
