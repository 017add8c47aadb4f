//! Buffer identities and per-variant buffer slots

use std::ops::Range;

use crate::gpu::{IndexBuf, VertBuf};

/// Vertex buffers a cache variant can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VboType {
    PosNor,
    Lnor,
    Uv,
    EditData,
    StretchArea,
    PolyIdx,
    EdgeIdx,
    VertIdx,
    FdotsPos,
}

impl VboType {
    pub const COUNT: usize = 9;
    pub const ALL: [VboType; Self::COUNT] = [
        VboType::PosNor,
        VboType::Lnor,
        VboType::Uv,
        VboType::EditData,
        VboType::StretchArea,
        VboType::PolyIdx,
        VboType::EdgeIdx,
        VboType::VertIdx,
        VboType::FdotsPos,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Index buffers a cache variant can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IboType {
    Tris,
    Lines,
    /// Sub-range of `Lines`
    LinesLoose,
    Points,
    Fdots,
    EdituvTris,
    EdituvLines,
}

impl IboType {
    pub const COUNT: usize = 7;
    pub const ALL: [IboType; Self::COUNT] = [
        IboType::Tris,
        IboType::Lines,
        IboType::LinesLoose,
        IboType::Points,
        IboType::Fdots,
        IboType::EdituvTris,
        IboType::EdituvLines,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Buffer this one is a sub-range of
    pub fn superset(self) -> Option<IboType> {
        match self {
            IboType::LinesLoose => Some(IboType::Lines),
            _ => None,
        }
    }
}

/// Any output buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferType {
    Vbo(VboType),
    Ibo(IboType),
}

impl BufferType {
    pub const COUNT: usize = VboType::COUNT + IboType::COUNT;

    pub fn all() -> impl Iterator<Item = BufferType> {
        VboType::ALL
            .into_iter()
            .map(BufferType::Vbo)
            .chain(IboType::ALL.into_iter().map(BufferType::Ibo))
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferType::Vbo(VboType::PosNor) => "vbo.pos_nor",
            BufferType::Vbo(VboType::Lnor) => "vbo.lnor",
            BufferType::Vbo(VboType::Uv) => "vbo.uv",
            BufferType::Vbo(VboType::EditData) => "vbo.edit_data",
            BufferType::Vbo(VboType::StretchArea) => "vbo.stretch_area",
            BufferType::Vbo(VboType::PolyIdx) => "vbo.poly_idx",
            BufferType::Vbo(VboType::EdgeIdx) => "vbo.edge_idx",
            BufferType::Vbo(VboType::VertIdx) => "vbo.vert_idx",
            BufferType::Vbo(VboType::FdotsPos) => "vbo.fdots_pos",
            BufferType::Ibo(IboType::Tris) => "ibo.tris",
            BufferType::Ibo(IboType::Lines) => "ibo.lines",
            BufferType::Ibo(IboType::LinesLoose) => "ibo.lines_loose",
            BufferType::Ibo(IboType::Points) => "ibo.points",
            BufferType::Ibo(IboType::Fdots) => "ibo.fdots",
            BufferType::Ibo(IboType::EdituvTris) => "ibo.edituv_tris",
            BufferType::Ibo(IboType::EdituvLines) => "ibo.edituv_lines",
        }
    }
}

/// State of one output buffer.
#[derive(Debug, Default)]
pub enum BufferSlot {
    /// Not requested, or discarded
    #[default]
    Empty,
    /// Scheduled for extraction in the current build
    Requested,
    Vert(VertBuf),
    Index(IndexBuf),
}

impl BufferSlot {
    pub fn is_filled(&self) -> bool {
        matches!(self, BufferSlot::Vert(_) | BufferSlot::Index(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BufferSlot::Empty)
    }

    pub fn is_requested(&self) -> bool {
        matches!(self, BufferSlot::Requested)
    }

    pub fn as_vert(&self) -> Option<&VertBuf> {
        match self {
            BufferSlot::Vert(vbo) => Some(vbo),
            _ => None,
        }
    }

    pub fn as_vert_mut(&mut self) -> Option<&mut VertBuf> {
        match self {
            BufferSlot::Vert(vbo) => Some(vbo),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<&IndexBuf> {
        match self {
            BufferSlot::Index(ibo) => Some(ibo),
            _ => None,
        }
    }

    /// Drop the contents, releasing their memory.
    pub fn discard(&mut self) {
        *self = BufferSlot::Empty;
    }
}

/// All buffer slots of one cache variant.
#[derive(Debug)]
pub struct MeshBufferList {
    vbo: [BufferSlot; VboType::COUNT],
    ibo: [BufferSlot; IboType::COUNT],
}

impl Default for MeshBufferList {
    fn default() -> Self {
        Self {
            vbo: std::array::from_fn(|_| BufferSlot::Empty),
            ibo: std::array::from_fn(|_| BufferSlot::Empty),
        }
    }
}

impl MeshBufferList {
    pub fn slot(&self, buffer: BufferType) -> &BufferSlot {
        match buffer {
            BufferType::Vbo(t) => &self.vbo[t.index()],
            BufferType::Ibo(t) => &self.ibo[t.index()],
        }
    }

    pub fn slot_mut(&mut self, buffer: BufferType) -> &mut BufferSlot {
        match buffer {
            BufferType::Vbo(t) => &mut self.vbo[t.index()],
            BufferType::Ibo(t) => &mut self.ibo[t.index()],
        }
    }

    pub fn vbo(&self, t: VboType) -> Option<&VertBuf> {
        self.vbo[t.index()].as_vert()
    }

    pub fn ibo(&self, t: IboType) -> Option<&IndexBuf> {
        self.ibo[t.index()].as_index()
    }

    /// Borrow several distinct slots mutably at once, in buffer order.
    pub fn slots_mut(&mut self, wanted: &[BufferType]) -> Vec<(BufferType, &mut BufferSlot)> {
        let vbos = self
            .vbo
            .iter_mut()
            .zip(VboType::ALL)
            .map(|(slot, t)| (BufferType::Vbo(t), slot));
        let ibos = self
            .ibo
            .iter_mut()
            .zip(IboType::ALL)
            .map(|(slot, t)| (BufferType::Ibo(t), slot));
        vbos.chain(ibos).filter(|(t, _)| wanted.contains(t)).collect()
    }

    /// Buffers currently holding data
    pub fn filled(&self) -> impl Iterator<Item = BufferType> + '_ {
        BufferType::all().filter(|&t| self.slot(t).is_filled())
    }

    pub fn discard(&mut self, buffer: BufferType) {
        self.slot_mut(buffer).discard();
    }

    pub fn discard_all(&mut self) {
        for slot in self.vbo.iter_mut().chain(self.ibo.iter_mut()) {
            slot.discard();
        }
    }

    /// Reset slots left `Requested` by a failed build.
    pub fn clear_requested(&mut self) -> usize {
        let mut cleared = 0;
        for slot in self.vbo.iter_mut().chain(self.ibo.iter_mut()) {
            if slot.is_requested() {
                slot.discard();
                cleared += 1;
            }
        }
        cleared
    }
}

/// Loose geometry of the extracted representation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LooseGeom {
    pub verts: Vec<u32>,
    pub edges: Vec<u32>,
}

/// Buffers and derived summaries of one cache variant.
#[derive(Debug, Default)]
pub struct MeshBufferCache {
    pub buffers: MeshBufferList,
    pub summary: BufferSummary,
}

/// Data derived during extraction and kept for drawing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferSummary {
    pub loose: LooseGeom,
    /// Triangle range (in triangles) of each material inside the `Tris` buffer
    pub mat_tri_ranges: Vec<Range<u32>>,
    /// No loose edges to draw as wire
    pub no_loose_wire: bool,
}

impl MeshBufferCache {
    /// Discard every buffer and summary.
    pub fn clear(&mut self) {
        self.buffers.discard_all();
        self.summary = BufferSummary::default();
    }
}
