//! Batch identities and the buffer dependency table

use bitflags::bitflags;

use crate::config::RunFlags;
use crate::gpu::PrimType;
use crate::mesh::MeshData;
use super::buffers::{BufferType, IboType, VboType};

/// Buffer set a batch reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheVariant {
    /// Final evaluated mesh
    Final,
    /// Editing cage
    Cage,
    /// UV editing cage
    UvCage,
}

impl CacheVariant {
    pub const ALL: [CacheVariant; 3] = [CacheVariant::Final, CacheVariant::Cage, CacheVariant::UvCage];

    /// Variant whose buffers actually serve a request for `self`.
    ///
    /// Outside edit mode everything is drawn from the final mesh. The cage
    /// only needs its own buffers when the final mesh is drawn from a separate
    /// evaluated mesh; the UV cage only when requested.
    pub fn resolve(self, data: &MeshData, flags: &RunFlags) -> CacheVariant {
        let edit = match (&data.edit, flags.is_editmode) {
            (Some(edit), true) => edit,
            _ => return CacheVariant::Final,
        };
        match self {
            CacheVariant::Final => CacheVariant::Final,
            CacheVariant::Cage => {
                if flags.do_final_mesh && edit.mesh_eval_final.is_some() {
                    CacheVariant::Cage
                } else {
                    CacheVariant::Final
                }
            }
            CacheVariant::UvCage => {
                if flags.do_uv_cage {
                    CacheVariant::UvCage
                } else {
                    CacheVariant::Final
                }
            }
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Named draw batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchId {
    Surface,
    AllVerts,
    AllEdges,
    LooseEdges,
    EditTriangles,
    EditVertices,
    EditEdges,
    EditFacedots,
    EditSelectionFaces,
    EditSelectionEdges,
    EditSelectionVerts,
    EdituvFaces,
    EdituvFacesStretchArea,
    EdituvEdges,
    /// One batch per material sharing the `Tris` buffer
    SurfacePerMat,
}

impl BatchId {
    pub const COUNT: usize = 15;
    pub const ALL: [BatchId; Self::COUNT] = [
        BatchId::Surface,
        BatchId::AllVerts,
        BatchId::AllEdges,
        BatchId::LooseEdges,
        BatchId::EditTriangles,
        BatchId::EditVertices,
        BatchId::EditEdges,
        BatchId::EditFacedots,
        BatchId::EditSelectionFaces,
        BatchId::EditSelectionEdges,
        BatchId::EditSelectionVerts,
        BatchId::EdituvFaces,
        BatchId::EdituvFacesStretchArea,
        BatchId::EdituvEdges,
        BatchId::SurfacePerMat,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> BatchFlags {
        BatchFlags::from_bits_truncate(1 << self.index())
    }

    pub fn desc(self) -> &'static BatchDesc {
        &BATCHES[self.index()]
    }
}

bitflags! {
    /// Set of batches, one bit per [`BatchId`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BatchFlags: u32 {
        const SURFACE = 1 << 0;
        const ALL_VERTS = 1 << 1;
        const ALL_EDGES = 1 << 2;
        const LOOSE_EDGES = 1 << 3;
        const EDIT_TRIANGLES = 1 << 4;
        const EDIT_VERTICES = 1 << 5;
        const EDIT_EDGES = 1 << 6;
        const EDIT_FACEDOTS = 1 << 7;
        const EDIT_SELECTION_FACES = 1 << 8;
        const EDIT_SELECTION_EDGES = 1 << 9;
        const EDIT_SELECTION_VERTS = 1 << 10;
        const EDITUV_FACES = 1 << 11;
        const EDITUV_FACES_STRETCH_AREA = 1 << 12;
        const EDITUV_EDGES = 1 << 13;
        const SURFACE_PER_MAT = 1 << 14;
    }
}

impl BatchFlags {
    /// Batch ids in the set, in id order
    pub fn ids(self) -> impl Iterator<Item = BatchId> {
        BatchId::ALL.into_iter().filter(move |id| self.contains(id.flag()))
    }
}

/// Static description of a batch.
#[derive(Debug)]
pub struct BatchDesc {
    pub id: BatchId,
    pub prim: PrimType,
    pub variant: CacheVariant,
    pub vbos: &'static [VboType],
    pub ibo: Option<IboType>,
}

impl BatchDesc {
    /// Every buffer the batch reads
    pub fn buffers(&self) -> impl Iterator<Item = BufferType> + '_ {
        self.vbos
            .iter()
            .map(|&t| BufferType::Vbo(t))
            .chain(self.ibo.map(BufferType::Ibo))
    }
}

pub static BATCHES: [BatchDesc; BatchId::COUNT] = [
    BatchDesc {
        id: BatchId::Surface,
        prim: PrimType::Tris,
        variant: CacheVariant::Final,
        vbos: &[VboType::PosNor, VboType::Lnor],
        ibo: Some(IboType::Tris),
    },
    BatchDesc {
        id: BatchId::AllVerts,
        prim: PrimType::Points,
        variant: CacheVariant::Final,
        vbos: &[VboType::PosNor],
        ibo: None,
    },
    BatchDesc {
        id: BatchId::AllEdges,
        prim: PrimType::Lines,
        variant: CacheVariant::Final,
        vbos: &[VboType::PosNor],
        ibo: Some(IboType::Lines),
    },
    BatchDesc {
        id: BatchId::LooseEdges,
        prim: PrimType::Lines,
        variant: CacheVariant::Final,
        vbos: &[VboType::PosNor],
        ibo: Some(IboType::LinesLoose),
    },
    BatchDesc {
        id: BatchId::EditTriangles,
        prim: PrimType::Tris,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::EditData],
        ibo: Some(IboType::Tris),
    },
    BatchDesc {
        id: BatchId::EditVertices,
        prim: PrimType::Points,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::EditData],
        ibo: Some(IboType::Points),
    },
    BatchDesc {
        id: BatchId::EditEdges,
        prim: PrimType::Lines,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::EditData],
        ibo: Some(IboType::Lines),
    },
    BatchDesc {
        id: BatchId::EditFacedots,
        prim: PrimType::Points,
        variant: CacheVariant::Cage,
        vbos: &[VboType::FdotsPos],
        ibo: Some(IboType::Fdots),
    },
    BatchDesc {
        id: BatchId::EditSelectionFaces,
        prim: PrimType::Tris,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::PolyIdx],
        ibo: Some(IboType::Tris),
    },
    BatchDesc {
        id: BatchId::EditSelectionEdges,
        prim: PrimType::Lines,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::EdgeIdx],
        ibo: Some(IboType::Lines),
    },
    BatchDesc {
        id: BatchId::EditSelectionVerts,
        prim: PrimType::Points,
        variant: CacheVariant::Cage,
        vbos: &[VboType::PosNor, VboType::VertIdx],
        ibo: Some(IboType::Points),
    },
    BatchDesc {
        id: BatchId::EdituvFaces,
        prim: PrimType::Tris,
        variant: CacheVariant::UvCage,
        vbos: &[VboType::Uv, VboType::EditData],
        ibo: Some(IboType::EdituvTris),
    },
    BatchDesc {
        id: BatchId::EdituvFacesStretchArea,
        prim: PrimType::Tris,
        variant: CacheVariant::UvCage,
        vbos: &[VboType::Uv, VboType::EditData, VboType::StretchArea],
        ibo: Some(IboType::EdituvTris),
    },
    BatchDesc {
        id: BatchId::EdituvEdges,
        prim: PrimType::Lines,
        variant: CacheVariant::UvCage,
        vbos: &[VboType::Uv, VboType::EditData],
        ibo: Some(IboType::EdituvLines),
    },
    BatchDesc {
        id: BatchId::SurfacePerMat,
        prim: PrimType::Tris,
        variant: CacheVariant::Final,
        vbos: &[VboType::PosNor, VboType::Lnor, VboType::Uv],
        ibo: Some(IboType::Tris),
    },
];

/// Every batch that reads `buffer`.
pub fn batches_that_use_buffer(buffer: BufferType) -> BatchFlags {
    match buffer {
        BufferType::Vbo(VboType::PosNor) => {
            BatchFlags::SURFACE
                | BatchFlags::ALL_VERTS
                | BatchFlags::ALL_EDGES
                | BatchFlags::LOOSE_EDGES
                | BatchFlags::EDIT_TRIANGLES
                | BatchFlags::EDIT_VERTICES
                | BatchFlags::EDIT_EDGES
                | BatchFlags::EDIT_SELECTION_FACES
                | BatchFlags::EDIT_SELECTION_EDGES
                | BatchFlags::EDIT_SELECTION_VERTS
                | BatchFlags::SURFACE_PER_MAT
        }
        BufferType::Vbo(VboType::Lnor) => BatchFlags::SURFACE | BatchFlags::SURFACE_PER_MAT,
        BufferType::Vbo(VboType::Uv) => {
            BatchFlags::EDITUV_FACES
                | BatchFlags::EDITUV_FACES_STRETCH_AREA
                | BatchFlags::EDITUV_EDGES
                | BatchFlags::SURFACE_PER_MAT
        }
        BufferType::Vbo(VboType::EditData) => {
            BatchFlags::EDIT_TRIANGLES
                | BatchFlags::EDIT_VERTICES
                | BatchFlags::EDIT_EDGES
                | BatchFlags::EDITUV_FACES
                | BatchFlags::EDITUV_FACES_STRETCH_AREA
                | BatchFlags::EDITUV_EDGES
        }
        BufferType::Vbo(VboType::StretchArea) => BatchFlags::EDITUV_FACES_STRETCH_AREA,
        BufferType::Vbo(VboType::PolyIdx) => BatchFlags::EDIT_SELECTION_FACES,
        BufferType::Vbo(VboType::EdgeIdx) => BatchFlags::EDIT_SELECTION_EDGES,
        BufferType::Vbo(VboType::VertIdx) => BatchFlags::EDIT_SELECTION_VERTS,
        BufferType::Vbo(VboType::FdotsPos) => BatchFlags::EDIT_FACEDOTS,
        BufferType::Ibo(IboType::Tris) => {
            BatchFlags::SURFACE
                | BatchFlags::EDIT_TRIANGLES
                | BatchFlags::EDIT_SELECTION_FACES
                | BatchFlags::SURFACE_PER_MAT
        }
        BufferType::Ibo(IboType::Lines) => {
            BatchFlags::ALL_EDGES | BatchFlags::EDIT_EDGES | BatchFlags::EDIT_SELECTION_EDGES
        }
        BufferType::Ibo(IboType::LinesLoose) => BatchFlags::LOOSE_EDGES,
        BufferType::Ibo(IboType::Points) => BatchFlags::EDIT_VERTICES | BatchFlags::EDIT_SELECTION_VERTS,
        BufferType::Ibo(IboType::Fdots) => BatchFlags::EDIT_FACEDOTS,
        BufferType::Ibo(IboType::EdituvTris) => {
            BatchFlags::EDITUV_FACES | BatchFlags::EDITUV_FACES_STRETCH_AREA
        }
        BufferType::Ibo(IboType::EdituvLines) => BatchFlags::EDITUV_EDGES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshData, primitives};

    #[test]
    fn test_table_order_matches_ids() {
        for id in BatchId::ALL {
            assert_eq!(id.desc().id, id);
        }
    }

    #[test]
    fn test_flag_constants_match_ids() {
        assert_eq!(BatchId::Surface.flag(), BatchFlags::SURFACE);
        assert_eq!(BatchId::EditFacedots.flag(), BatchFlags::EDIT_FACEDOTS);
        assert_eq!(BatchId::SurfacePerMat.flag(), BatchFlags::SURFACE_PER_MAT);
        assert_eq!(BatchFlags::all().ids().count(), BatchId::COUNT);
    }

    #[test]
    fn test_dependency_table_matches_descriptors() {
        for buffer in BufferType::all() {
            let expected = BATCHES
                .iter()
                .filter(|desc| desc.buffers().any(|b| b == buffer))
                .fold(BatchFlags::empty(), |acc, desc| acc | desc.id.flag());
            assert_eq!(batches_that_use_buffer(buffer), expected, "{}", buffer.name());
        }
    }

    #[test]
    fn test_every_buffer_has_a_consumer() {
        for buffer in BufferType::all() {
            assert!(!batches_that_use_buffer(buffer).is_empty(), "{}", buffer.name());
        }
    }

    #[test]
    fn test_variant_resolution() {
        let mut data = MeshData::new(primitives::cube());
        let object = RunFlags::object_mode();
        assert_eq!(CacheVariant::Cage.resolve(&data, &object), CacheVariant::Final);
        assert_eq!(CacheVariant::UvCage.resolve(&data, &object), CacheVariant::Final);

        data.begin_edit();
        let mut edit = RunFlags::edit_mode();
        assert_eq!(CacheVariant::Cage.resolve(&data, &edit), CacheVariant::Final);
        edit.do_uv_cage = true;
        assert_eq!(CacheVariant::UvCage.resolve(&data, &edit), CacheVariant::UvCage);

        if let Some(em) = data.edit.as_mut() {
            em.mesh_eval_final = Some(primitives::cube());
        }
        edit.do_final_mesh = true;
        assert_eq!(CacheVariant::Cage.resolve(&data, &edit), CacheVariant::Cage);
    }
}
