//! Extractor registry
//!
//! Immutable table mapping every buffer to the extractor that fills it, plus
//! the override variants picked per mesh (high-quality normals, single
//! material triangles).

use crate::cache::{BufferType, IboType, VboType};
use super::extractor::DynExtract;
use super::extractors::edit_data::EDIT_DATA;
use super::extractors::edituv::{EDITUV_LINES, EDITUV_TRIS};
use super::extractors::fdots::{FDOTS, FDOTS_POS};
use super::extractors::index_vbos::{EDGE_IDX, POLY_IDX, VERT_IDX};
use super::extractors::lines::{LINES, LINES_LOOSE};
use super::extractors::lnor::{LNOR, LNOR_HQ};
use super::extractors::points::POINTS;
use super::extractors::pos_nor::{POS_NOR, POS_NOR_HQ};
use super::extractors::stretch_area::STRETCH_AREA;
use super::extractors::tris::{TRIS, TRIS_SINGLE_MAT};
use super::extractors::uv::UV;

/// Every extractor, base variants first.
pub static ALL_EXTRACTORS: [&'static dyn DynExtract; 19] = [
    &POS_NOR,
    &LNOR,
    &UV,
    &EDIT_DATA,
    &STRETCH_AREA,
    &POLY_IDX,
    &EDGE_IDX,
    &VERT_IDX,
    &FDOTS_POS,
    &TRIS,
    &LINES,
    &LINES_LOOSE,
    &POINTS,
    &FDOTS,
    &EDITUV_TRIS,
    &EDITUV_LINES,
    &POS_NOR_HQ,
    &LNOR_HQ,
    &TRIS_SINGLE_MAT,
];

/// Per-mesh choice between an extractor and its override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractorOverrides {
    pub use_hq_normals: bool,
    /// The mesh renders with at most one material
    pub single_mat: bool,
}

/// Extractor that fills `buffer` without overrides.
pub fn base_extractor(buffer: BufferType) -> &'static dyn DynExtract {
    match buffer {
        BufferType::Vbo(VboType::PosNor) => &POS_NOR,
        BufferType::Vbo(VboType::Lnor) => &LNOR,
        BufferType::Vbo(VboType::Uv) => &UV,
        BufferType::Vbo(VboType::EditData) => &EDIT_DATA,
        BufferType::Vbo(VboType::StretchArea) => &STRETCH_AREA,
        BufferType::Vbo(VboType::PolyIdx) => &POLY_IDX,
        BufferType::Vbo(VboType::EdgeIdx) => &EDGE_IDX,
        BufferType::Vbo(VboType::VertIdx) => &VERT_IDX,
        BufferType::Vbo(VboType::FdotsPos) => &FDOTS_POS,
        BufferType::Ibo(IboType::Tris) => &TRIS,
        BufferType::Ibo(IboType::Lines) => &LINES,
        BufferType::Ibo(IboType::LinesLoose) => &LINES_LOOSE,
        BufferType::Ibo(IboType::Points) => &POINTS,
        BufferType::Ibo(IboType::Fdots) => &FDOTS,
        BufferType::Ibo(IboType::EdituvTris) => &EDITUV_TRIS,
        BufferType::Ibo(IboType::EdituvLines) => &EDITUV_LINES,
    }
}

/// Extractor that fills `buffer` for a mesh with the given overrides.
pub fn extractor_for(buffer: BufferType, overrides: ExtractorOverrides) -> &'static dyn DynExtract {
    match buffer {
        BufferType::Vbo(VboType::PosNor) if overrides.use_hq_normals => &POS_NOR_HQ,
        BufferType::Vbo(VboType::Lnor) if overrides.use_hq_normals => &LNOR_HQ,
        BufferType::Ibo(IboType::Tris) if overrides.single_mat => &TRIS_SINGLE_MAT,
        _ => base_extractor(buffer),
    }
}

/// Sum of the per-task scratch sizes of `extractors`.
pub fn data_size_total(extractors: &[&'static dyn DynExtract]) -> usize {
    extractors.iter().map(|e| e.info().data_size).sum()
}
