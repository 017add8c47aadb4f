//! Extraction sub-graph of one cache variant
//!
//! For every slot marked `Requested` the registry supplies an extractor. The
//! sub-graph added to the caller's [`TaskGraph`] is:
//!
//! ```text
//!   render_data ──┬── <single-threaded extractor> ──┬── summary
//!                 ├── <single-threaded extractor> ──┤
//!                 └── parallel (threaded group)  ───┘
//! ```
//!
//! `render_data` builds the [`MeshRenderData`] with only the derived arrays
//! the worklist needs; it is dropped with the last closure holding it. A
//! sub-range buffer runs after the node filling its superset.

use std::sync::{Arc, OnceLock};

use crate::cache::{BufferSlot, BufferType, CacheVariant, IboType, LooseGeom, MeshBufferCache};
use crate::config::RunFlags;
use crate::core::{Error, Result};
use crate::gpu::{GpuMemory, IndexBuf};
use crate::mesh::{CustomDataMask, MeshData};
use super::extractor::{DynExtract, ExtractContext, ExtractorRunData};
use super::graph::{NodeId, TaskGraph};
use super::registry::{ExtractorOverrides, extractor_for};
use super::render_data::{MeshRenderData, RenderSource, extract_source};
use super::runner::{RunMode, run_extractors};
use super::stats::ExtractStats;
use super::types::{DataFlags, IterDomain};

/// Inputs of one variant's extraction.
#[derive(Clone, Debug)]
pub struct ExtractJob<'g> {
    pub data: &'g MeshData,
    pub flags: RunFlags,
    pub variant: CacheVariant,
    /// Custom-data layers the buffers are built with
    pub cd_used: CustomDataMask,
    pub memory: Arc<GpuMemory>,
    pub stats: &'g ExtractStats,
    pub min_range_per_thread: usize,
    pub use_hq_normals: bool,
}

type RenderCell<'g> = Arc<OnceLock<MeshRenderData<'g>>>;

fn prepared<'c, 'g>(cell: &'c RenderCell<'g>) -> Result<&'c MeshRenderData<'g>> {
    cell.get()
        .ok_or_else(|| Error::Task("render data was not prepared".to_string()))
}

/// Range mode for a threaded group scanning `element_len` elements.
///
/// Below `min_range_per_thread` elements the group runs on one thread.
pub fn run_mode_for(element_len: usize, min_range_per_thread: usize) -> RunMode {
    if element_len < min_range_per_thread {
        RunMode::single_threaded()
    } else {
        RunMode::threaded(min_range_per_thread)
    }
}

/// Overrides for the representation `job` extracts from.
pub fn overrides_for(job: &ExtractJob) -> ExtractorOverrides {
    let mat_len = match extract_source(job.data, &job.flags, job.variant).1 {
        RenderSource::Mesh(mesh) => mesh.render_mat_len(),
        RenderSource::BMesh(bm) => bm.render_mat_len(),
    };
    ExtractorOverrides { use_hq_normals: job.use_hq_normals, single_mat: mat_len <= 1 }
}

/// Mark the superset of every requested sub-range buffer when it is not filled.
fn pull_in_supersets(cache: &mut MeshBufferCache) {
    for ibo in IboType::ALL {
        let Some(superset) = ibo.superset() else { continue };
        if !cache.buffers.slot(BufferType::Ibo(ibo)).is_requested() {
            continue;
        }
        let slot = cache.buffers.slot_mut(BufferType::Ibo(superset));
        if slot.is_empty() {
            log::debug!("{} pulls in {}", BufferType::Ibo(ibo).name(), BufferType::Ibo(superset).name());
            *slot = BufferSlot::Requested;
        }
    }
}

/// Add the extraction sub-graph for every `Requested` slot of `cache`.
///
/// The root is pushed; the caller runs the graph. Returns the scheduled
/// buffers, empty when nothing was requested.
pub fn extract_mesh_buffers<'g>(
    graph: &mut TaskGraph<'g>,
    job: ExtractJob<'g>,
    cache: &'g mut MeshBufferCache,
) -> Result<Vec<BufferType>> {
    pull_in_supersets(cache);
    let worklist: Vec<BufferType> = BufferType::all()
        .filter(|&t| cache.buffers.slot(t).is_requested())
        .collect();
    if worklist.is_empty() {
        return Ok(worklist);
    }

    let overrides = overrides_for(&job);
    let is_mesh = extract_source(job.data, &job.flags, job.variant).0.is_mesh();
    let mut needs = DataFlags::LOOSE_GEOM;
    let mut domains = IterDomain::empty();
    let mut threaded_domains = IterDomain::empty();
    for &buffer in &worklist {
        let info = extractor_for(buffer, overrides).info();
        needs |= info.data_flags;
        domains |= info.iter_types(is_mesh);
        if info.use_threading {
            threaded_domains |= info.iter_types(is_mesh);
        }
    }

    // Filled supersets are shared with their sub-range up front
    let supersets: Vec<(IboType, Arc<OnceLock<IndexBuf>>)> = IboType::ALL
        .into_iter()
        .filter(|&sub| worklist.contains(&BufferType::Ibo(sub)))
        .filter_map(IboType::superset)
        .map(|t| {
            let cell = Arc::new(OnceLock::new());
            if let Some(ibo) = cache.buffers.ibo(t) {
                let _ = cell.set(ibo.clone());
            }
            (t, cell)
        })
        .collect();
    let superset_cell = |t: IboType| supersets.iter().find(|(s, _)| *s == t).map(|(_, c)| Arc::clone(c));

    log::debug!(
        "extract {:?}: {} buffers, needs {:?}, domains {:?}",
        job.variant,
        worklist.len(),
        needs,
        domains
    );

    let cell: RenderCell<'g> = Arc::new(OnceLock::new());
    let MeshBufferCache { buffers, summary } = cache;

    let upstream = {
        let cell = Arc::clone(&cell);
        let job = job.clone();
        graph.node_create(
            format!("render_data.{:?}", job.variant),
            Box::new(move || {
                let mut mr = MeshRenderData::new(job.data, &job.flags, job.variant, job.cd_used)?;
                mr.update(needs, domains);
                let _ = cell.set(mr);
                Ok(())
            }),
        )
    };

    let mut extraction_nodes: Vec<NodeId> = Vec::new();
    let mut superset_nodes: Vec<(IboType, NodeId)> = Vec::new();
    let mut threaded: Vec<(&'static dyn DynExtract, &'g mut BufferSlot)> = Vec::new();

    for (buffer, slot) in buffers.slots_mut(&worklist) {
        let extractor = extractor_for(buffer, overrides);
        if extractor.info().use_threading {
            threaded.push((extractor, slot));
            continue;
        }

        let sub_superset = match buffer {
            BufferType::Ibo(t) => t.superset(),
            BufferType::Vbo(_) => None,
        };
        let read_cell = sub_superset.and_then(superset_cell);
        let write_cell = match buffer {
            BufferType::Ibo(t) => superset_cell(t),
            BufferType::Vbo(_) => None,
        };

        let cell = Arc::clone(&cell);
        let memory = Arc::clone(&job.memory);
        let stats = job.stats;
        let node = graph.node_create(
            extractor.info().name,
            Box::new(move || {
                let mr = prepared(&cell)?;
                let mut ctx = ExtractContext::new(memory);
                ctx.superset = read_cell.as_ref().and_then(|c| c.get().cloned());
                let mut runs = [ExtractorRunData::new(extractor, &mut *slot)];
                run_extractors(mr, &ctx, &mut runs, RunMode::single_threaded(), stats)?;
                if let (Some(out), Some(ibo)) = (write_cell, slot.as_index()) {
                    let _ = out.set(ibo.clone());
                }
                Ok(())
            }),
        );
        graph.edge_create(upstream, node);
        if let Some(superset) = sub_superset {
            if let Some(&(_, from)) = superset_nodes.iter().find(|(t, _)| *t == superset) {
                graph.edge_create(from, node);
            }
        }
        if let BufferType::Ibo(t) = buffer {
            superset_nodes.push((t, node));
        }
        extraction_nodes.push(node);
    }

    if !threaded.is_empty() {
        let cell = Arc::clone(&cell);
        let memory = Arc::clone(&job.memory);
        let stats = job.stats;
        let min_range = job.min_range_per_thread;
        let names: Vec<&'static str> = threaded.iter().map(|(e, _)| e.info().name).collect();
        log::debug!("parallel group: {:?}", names);
        let node = graph.node_create(
            "parallel",
            Box::new(move || {
                let mr = prepared(&cell)?;
                let element_len: usize = threaded_domains.domains().map(|d| mr.domain_len(d)).sum();
                let mode = run_mode_for(element_len, min_range);
                log::trace!("parallel group over {} elements: {:?}", element_len, mode);
                let ctx = ExtractContext::new(memory);
                let mut runs: Vec<ExtractorRunData> = threaded
                    .into_iter()
                    .map(|(extractor, slot)| ExtractorRunData::new(extractor, slot))
                    .collect();
                run_extractors(mr, &ctx, &mut runs, mode, stats)
            }),
        );
        graph.edge_create(upstream, node);
        extraction_nodes.push(node);
    }

    let tris_scheduled = worklist.contains(&BufferType::Ibo(IboType::Tris));
    let barrier = {
        let cell = Arc::clone(&cell);
        graph.node_create(
            format!("summary.{:?}", job.variant),
            Box::new(move || {
                let mr = prepared(&cell)?;
                summary.loose = LooseGeom { verts: mr.loose_verts.clone(), edges: mr.loose_edges.clone() };
                summary.no_loose_wire = mr.loose_edges.is_empty();
                if mr.computed.contains(DataFlags::MAT_OFFSETS) {
                    summary.mat_tri_ranges = mr.mat_tri_ranges.clone();
                } else if tris_scheduled {
                    summary.mat_tri_ranges.clear();
                }
                Ok(())
            }),
        )
    };
    for node in extraction_nodes {
        graph.edge_create(node, barrier);
    }

    graph.push_work(upstream);
    Ok(worklist)
}
