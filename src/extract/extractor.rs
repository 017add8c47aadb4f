//! Extractor contract
//!
//! An extractor fills exactly one output buffer. It is described by a typed
//! [`MeshExtract`] implementation and used by the runner through the
//! type-erased [`DynExtract`] view, which every `MeshExtract` gets for free.

use std::ops::Range;
use std::sync::Arc;

use crate::cache::{BufferSlot, BufferType};
use crate::core::{Error, Result};
use crate::gpu::{GpuMemory, IndexBuf};
use crate::mesh::{BMesh, BmEdge, BmFace, BmVert, LoopTri, Mesh, MeshEdge, MeshPoly, MeshVert};
use super::render_data::{MeshRenderData, RenderSource};
use super::scratch::{ExtractData, TaskMerge, TaskSlot};
use super::types::{DataFlags, Domain, IterDomain};

/// Static description of an extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractInfo {
    pub name: &'static str,
    /// The one buffer this extractor writes
    pub buffer: BufferType,
    /// Domains with callbacks for the evaluated mesh
    pub iter_mesh: IterDomain,
    /// Domains with callbacks for the BMesh
    pub iter_bm: IterDomain,
    /// Derived arrays read by the callbacks
    pub data_flags: DataFlags,
    /// Callbacks may run concurrently on disjoint ranges
    pub use_threading: bool,
    /// Size of the per-task accumulator
    pub data_size: usize,
}

impl ExtractInfo {
    /// Domains used for the given representation
    pub fn iter_types(&self, is_mesh: bool) -> IterDomain {
        if is_mesh { self.iter_mesh } else { self.iter_bm }
    }
}

/// Resources available to `init` and `finish`.
#[derive(Clone, Debug)]
pub struct ExtractContext {
    pub memory: Arc<GpuMemory>,
    /// Filled buffer a sub-range buffer views into
    pub superset: Option<IndexBuf>,
}

impl ExtractContext {
    pub fn new(memory: Arc<GpuMemory>) -> Self {
        Self { memory, superset: None }
    }
}

/// Typed extractor.
///
/// `Data` is produced once by `init` and shared read-only by every range
/// task. `TaskData` is the per-task accumulator; tasks are merged with
/// [`MeshExtract::task_reduce`] (by default [`TaskMerge::merge`]) before
/// `finish` consumes both.
#[allow(unused_variables)]
pub trait MeshExtract: Send + Sync + 'static {
    type Data: Send + Sync + 'static;
    type TaskData: TaskMerge;

    fn name(&self) -> &'static str;
    fn buffer(&self) -> BufferType;
    fn iter_mesh(&self) -> IterDomain {
        IterDomain::empty()
    }
    fn iter_bm(&self) -> IterDomain {
        self.iter_mesh()
    }
    fn data_flags(&self) -> DataFlags {
        DataFlags::empty()
    }
    fn use_threading(&self) -> bool;

    /// Size the output buffer and prepare shared data.
    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<Self::Data>;

    /// Fresh accumulator for one range task.
    fn task_data(&self, mr: &MeshRenderData, data: &Self::Data) -> Self::TaskData;

    fn iter_looptri_mesh(&self, mr: &MeshRenderData, mesh: &Mesh, tri: &LoopTri, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    fn iter_looptri_bm(&self, mr: &MeshRenderData, bm: &BMesh, tri: &LoopTri, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    fn iter_poly_mesh(&self, mr: &MeshRenderData, mesh: &Mesh, poly: &MeshPoly, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    fn iter_poly_bm(&self, mr: &MeshRenderData, bm: &BMesh, face: &BmFace, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    /// `index` is the position in the loose-edge list
    fn iter_ledge_mesh(&self, mr: &MeshRenderData, mesh: &Mesh, edge: &MeshEdge, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    fn iter_ledge_bm(&self, mr: &MeshRenderData, bm: &BMesh, edge: &BmEdge, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    /// `index` is the position in the loose-vertex list
    fn iter_lvert_mesh(&self, mr: &MeshRenderData, mesh: &Mesh, vert: &MeshVert, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}
    fn iter_lvert_bm(&self, mr: &MeshRenderData, bm: &BMesh, vert: &BmVert, index: usize, data: &Self::Data, task: &mut Self::TaskData) {}

    fn task_reduce(&self, dst: &mut Self::TaskData, src: Self::TaskData) {
        dst.merge(src);
    }

    /// Write the accumulated result into the buffer.
    fn finish(
        &self,
        mr: &MeshRenderData,
        ctx: &ExtractContext,
        slot: &mut BufferSlot,
        data: Self::Data,
        task: Self::TaskData,
    ) -> Result<()>;
}

/// Object-safe view of an extractor used by the runner and the registry.
pub trait DynExtract: Send + Sync {
    fn info(&self) -> ExtractInfo;
    fn init_erased(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<ExtractData>;
    fn task_data_erased(&self, mr: &MeshRenderData, data: &ExtractData) -> TaskSlot;
    /// Run the callbacks of `domain` over `range`.
    fn iter_range(&self, domain: Domain, mr: &MeshRenderData, range: Range<usize>, data: &ExtractData, task: &mut TaskSlot);
    fn reduce_erased(&self, dst: &mut TaskSlot, src: TaskSlot);
    fn finish_erased(
        &self,
        mr: &MeshRenderData,
        ctx: &ExtractContext,
        slot: &mut BufferSlot,
        data: ExtractData,
        task: TaskSlot,
    ) -> Result<()>;
}

fn scratch_mismatch(name: &str) -> Error {
    Error::Task(format!("{}: scratch type mismatch", name))
}

impl<E: MeshExtract> DynExtract for E {
    fn info(&self) -> ExtractInfo {
        ExtractInfo {
            name: self.name(),
            buffer: self.buffer(),
            iter_mesh: self.iter_mesh(),
            iter_bm: self.iter_bm(),
            data_flags: self.data_flags(),
            use_threading: self.use_threading(),
            data_size: std::mem::size_of::<E::TaskData>(),
        }
    }

    fn init_erased(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<ExtractData> {
        Ok(Box::new(self.init(mr, ctx, slot)?))
    }

    fn task_data_erased(&self, mr: &MeshRenderData, data: &ExtractData) -> TaskSlot {
        match data.downcast_ref::<E::Data>() {
            Some(data) => Box::new(self.task_data(mr, data)),
            None => {
                debug_assert!(false, "{}: init data type mismatch", self.name());
                Box::new(())
            }
        }
    }

    fn iter_range(&self, domain: Domain, mr: &MeshRenderData, range: Range<usize>, data: &ExtractData, task: &mut TaskSlot) {
        let (Some(data), Some(task)) = (data.downcast_ref::<E::Data>(), task.downcast_mut::<E::TaskData>()) else {
            debug_assert!(false, "{}: scratch type mismatch", self.name());
            return;
        };
        match (domain, mr.source()) {
            (Domain::Looptri, RenderSource::Mesh(mesh)) => {
                let tris = mr.looptris();
                for i in range {
                    self.iter_looptri_mesh(mr, mesh, &tris[i], i, data, task);
                }
            }
            (Domain::Looptri, RenderSource::BMesh(bm)) => {
                for i in range {
                    self.iter_looptri_bm(mr, bm, &bm.looptris[i], i, data, task);
                }
            }
            (Domain::Poly, RenderSource::Mesh(mesh)) => {
                for i in range {
                    self.iter_poly_mesh(mr, mesh, &mesh.polys[i], i, data, task);
                }
            }
            (Domain::Poly, RenderSource::BMesh(bm)) => {
                for i in range {
                    self.iter_poly_bm(mr, bm, &bm.faces[i], i, data, task);
                }
            }
            (Domain::Ledge, RenderSource::Mesh(mesh)) => {
                for i in range {
                    let e = mr.loose_edges[i] as usize;
                    self.iter_ledge_mesh(mr, mesh, &mesh.edges[e], i, data, task);
                }
            }
            (Domain::Ledge, RenderSource::BMesh(bm)) => {
                for i in range {
                    let e = mr.loose_edges[i] as usize;
                    self.iter_ledge_bm(mr, bm, &bm.edges[e], i, data, task);
                }
            }
            (Domain::Lvert, RenderSource::Mesh(mesh)) => {
                for i in range {
                    let v = mr.loose_verts[i] as usize;
                    self.iter_lvert_mesh(mr, mesh, &mesh.verts[v], i, data, task);
                }
            }
            (Domain::Lvert, RenderSource::BMesh(bm)) => {
                for i in range {
                    let v = mr.loose_verts[i] as usize;
                    self.iter_lvert_bm(mr, bm, &bm.verts[v], i, data, task);
                }
            }
        }
    }

    fn reduce_erased(&self, dst: &mut TaskSlot, src: TaskSlot) {
        match (dst.downcast_mut::<E::TaskData>(), src.downcast::<E::TaskData>()) {
            (Some(dst), Ok(src)) => self.task_reduce(dst, *src),
            _ => debug_assert!(false, "{}: scratch type mismatch", self.name()),
        }
    }

    fn finish_erased(
        &self,
        mr: &MeshRenderData,
        ctx: &ExtractContext,
        slot: &mut BufferSlot,
        data: ExtractData,
        task: TaskSlot,
    ) -> Result<()> {
        let data = data.downcast::<E::Data>().map_err(|_| scratch_mismatch(self.name()))?;
        let task = task.downcast::<E::TaskData>().map_err(|_| scratch_mismatch(self.name()))?;
        self.finish(mr, ctx, slot, *data, *task)
    }
}

/// Extractor paired with the slot it fills for one run.
pub struct ExtractorRunData<'s> {
    pub extractor: &'static dyn DynExtract,
    pub slot: &'s mut BufferSlot,
}

impl<'s> ExtractorRunData<'s> {
    pub fn new(extractor: &'static dyn DynExtract, slot: &'s mut BufferSlot) -> Self {
        Self { extractor, slot }
    }
}

impl std::fmt::Debug for ExtractorRunData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRunData")
            .field("extractor", &self.extractor.info().name)
            .field("slot_filled", &self.slot.is_filled())
            .finish()
    }
}

/// Whether `extractor` has callbacks in `domain` for the given representation.
pub fn participates(extractor: &dyn DynExtract, domain: Domain, is_mesh: bool) -> bool {
    extractor.info().iter_types(is_mesh).contains(domain.flag())
}
