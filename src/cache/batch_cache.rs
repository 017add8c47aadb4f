//! Per-mesh batch cache
//!
//! Owns the buffers of the three cache variants, the requested/ready batch
//! sets, and the keys the buffers are valid for. Drawing code requests
//! batches (from any thread), then one owner builds everything requested in
//! a single extraction pass:
//!
//! ```ignore
//! cache.request(BatchId::Surface);
//! cache.build_requested(&data, flags)?;
//! let surface = cache.batch(BatchId::Surface);
//! ```
//!
//! Several caches can share one task graph through
//! [`MeshBatchCache::create_requested`] and [`MeshBatchCache::finish_requested`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::{CacheConfig, RunFlags};
use crate::core::Result;
use crate::extract::graph::TaskGraph;
use crate::extract::scheduler::{ExtractJob, extract_mesh_buffers};
use crate::extract::stats::{BuildReport, ExtractStats};
use crate::gpu::{BatchHandle, GpuMemory, IndexBuf};
use crate::mesh::{AtomicCustomDataMask, CustomDataMask, MeshData};
use super::batch::{BatchFlags, BatchId, CacheVariant, batches_that_use_buffer};
use super::buffers::{BufferSlot, BufferType, IboType, MeshBufferCache, VboType};
use super::invalidate::{CacheKeys, CacheState, DirtyReason, is_valid};

/// Batch set updated with atomic OR / AND.
#[derive(Debug, Default)]
pub struct AtomicBatchFlags(AtomicU32);

impl AtomicBatchFlags {
    pub fn load(&self) -> BatchFlags {
        BatchFlags::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    pub fn insert(&self, flags: BatchFlags) {
        self.0.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub fn remove(&self, flags: BatchFlags) {
        self.0.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Replace the set, returning the previous one.
    pub fn take(&self) -> BatchFlags {
        BatchFlags::from_bits_truncate(self.0.swap(0, Ordering::AcqRel))
    }
}

/// Build started by [`MeshBatchCache::create_requested`].
#[derive(Debug, Default)]
#[must_use = "pass to finish_requested once the task graph has run"]
pub struct PendingBuild {
    to_build: BatchFlags,
    scheduled: usize,
}

impl PendingBuild {
    pub fn to_build(&self) -> BatchFlags {
        self.to_build
    }

    pub fn is_noop(&self) -> bool {
        self.to_build.is_empty()
    }
}

/// Draw cache of one mesh object.
#[derive(Debug)]
pub struct MeshBatchCache {
    variants: [MeshBufferCache; 3],
    batch_requested: AtomicBatchFlags,
    batch_ready: AtomicBatchFlags,
    /// Variant each batch was last built from
    batch_variant: [CacheVariant; BatchId::COUNT],
    cd_used: CustomDataMask,
    cd_needed: AtomicCustomDataMask,
    keys: CacheKeys,
    state: CacheState,
    config: CacheConfig,
    memory: Arc<GpuMemory>,
    stats: ExtractStats,
}

impl MeshBatchCache {
    pub fn new(config: CacheConfig, memory: Arc<GpuMemory>) -> Self {
        Self {
            variants: Default::default(),
            batch_requested: AtomicBatchFlags::default(),
            batch_ready: AtomicBatchFlags::default(),
            batch_variant: [CacheVariant::Final; BatchId::COUNT],
            cd_used: CustomDataMask::empty(),
            cd_needed: AtomicCustomDataMask::default(),
            keys: CacheKeys::default(),
            state: CacheState::Uninitialized,
            config,
            memory,
            stats: ExtractStats::default(),
        }
    }

    /// Ask for `id` to be built by the next build. Builds nothing.
    pub fn request(&self, id: BatchId) {
        self.batch_requested.insert(id.flag());
    }

    /// Request the per-material surfaces with the given custom-data layers.
    pub fn request_surface_per_mat(&self, cd_needed: CustomDataMask) {
        self.cd_needed.merge(cd_needed);
        self.request(BatchId::SurfacePerMat);
    }

    pub fn requested(&self) -> BatchFlags {
        self.batch_requested.load()
    }

    pub fn ready(&self) -> BatchFlags {
        self.batch_ready.load()
    }

    pub fn is_ready(&self, id: BatchId) -> bool {
        self.ready().contains(id.flag())
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub fn cd_used(&self) -> CustomDataMask {
        self.cd_used
    }

    pub fn stats(&self) -> &ExtractStats {
        &self.stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Buffers of one variant
    pub fn buffers(&self, variant: CacheVariant) -> &MeshBufferCache {
        &self.variants[variant.index()]
    }

    /// Bring the cache in line with `data` before a build.
    ///
    /// Returns true when the cache was cleared.
    pub fn validate(&mut self, data: &MeshData, flags: &RunFlags) -> bool {
        let keys = CacheKeys::from_data(data, flags);
        let mut cleared = false;
        if !is_valid(self.state, &self.keys, &keys) {
            if self.state != CacheState::Uninitialized {
                log::debug!("mesh cache invalidated ({:?}): {:?} -> {:?}", self.state, self.keys, keys);
            }
            self.clear();
            self.keys = keys;
            self.state = CacheState::Valid;
            cleared = true;
        }

        let needed = self.cd_needed.swap(CustomDataMask::empty());
        if !self.cd_used.contains(needed) {
            log::debug!("custom data layers {:?} not built, discarding uv", needed.difference(self.cd_used));
            self.discard_buffer(BufferType::Vbo(VboType::Uv));
            self.cd_used |= needed;
        }
        cleared
    }

    /// Report an edit of the mesh.
    pub fn tag_dirty(&mut self, reason: DirtyReason) {
        match reason {
            DirtyReason::All => {
                if self.state == CacheState::Valid {
                    self.state = CacheState::Dirty;
                }
                self.batch_ready.take();
            }
            _ => {
                for &buffer in reason.discarded_buffers() {
                    self.discard_buffer(buffer);
                }
                if reason == DirtyReason::Shading {
                    self.cd_used = CustomDataMask::empty();
                }
            }
        }
        log::trace!("tag dirty {:?}: ready {:?}", reason, self.ready());
    }

    /// Drop `buffer` (and sub-ranges of it) in every variant, with the batches reading it.
    pub fn discard_buffer(&mut self, buffer: BufferType) {
        let mut discarded = vec![buffer];
        if let BufferType::Ibo(ibo) = buffer {
            discarded.extend(
                IboType::ALL
                    .into_iter()
                    .filter(|t| t.superset() == Some(ibo))
                    .map(BufferType::Ibo),
            );
        }
        for buffer in discarded {
            for mbc in &mut self.variants {
                mbc.buffers.discard(buffer);
            }
            self.batch_ready.remove(batches_that_use_buffer(buffer));
        }
    }

    /// Discard every buffer and batch; requests are kept.
    pub fn clear(&mut self) {
        for mbc in &mut self.variants {
            mbc.clear();
        }
        self.batch_ready.take();
        self.cd_used = CustomDataMask::empty();
    }

    /// Schedule extraction of every requested batch into `graph`.
    ///
    /// The graph must run before [`finish_requested`](Self::finish_requested)
    /// is called with the returned build.
    pub fn create_requested<'g>(
        &'g mut self,
        graph: &mut TaskGraph<'g>,
        data: &'g MeshData,
        flags: RunFlags,
    ) -> Result<PendingBuild> {
        self.validate(data, &flags);

        let to_build = self.requested() & !self.ready();
        if to_build.is_empty() {
            return Ok(PendingBuild::default());
        }
        self.batch_requested.take();
        self.stats.reset();
        log::debug!("building batches {:?}", to_build);

        for id in to_build.ids() {
            let desc = id.desc();
            let variant = desc.variant.resolve(data, &flags);
            self.batch_variant[id.index()] = variant;
            let buffers = &mut self.variants[variant.index()].buffers;
            for buffer in desc.buffers() {
                let slot = buffers.slot_mut(buffer);
                if slot.is_empty() {
                    *slot = BufferSlot::Requested;
                }
            }
        }

        let Self { variants, config, memory, stats, cd_used, .. } = self;
        let stats: &'g ExtractStats = stats;
        let mut scheduled = 0;
        for (variant, mbc) in CacheVariant::ALL.into_iter().zip(variants.iter_mut()) {
            let job = ExtractJob {
                data,
                flags,
                variant,
                cd_used: *cd_used,
                memory: Arc::clone(memory),
                stats,
                min_range_per_thread: config.min_range_per_thread,
                use_hq_normals: config.use_hq_normals,
            };
            scheduled += extract_mesh_buffers(graph, job, mbc)?.len();
        }
        Ok(PendingBuild { to_build, scheduled })
    }

    /// Complete a build after its graph ran.
    ///
    /// A batch becomes ready when every buffer it reads is filled, so a
    /// failed graph leaves only the affected batches unbuilt. Slots left
    /// `Requested` are reset; they are scheduled again once re-requested.
    pub fn finish_requested(&mut self, pending: PendingBuild) -> BuildReport {
        if pending.is_noop() {
            return BuildReport::default();
        }
        let leftover: usize = self.variants.iter_mut().map(|mbc| mbc.buffers.clear_requested()).sum();

        let mut ready = BatchFlags::empty();
        for id in pending.to_build.ids() {
            let buffers = &self.variants[self.batch_variant[id.index()].index()].buffers;
            if id.desc().buffers().all(|b| buffers.slot(b).is_filled()) {
                ready |= id.flag();
            }
        }
        self.batch_ready.insert(ready);

        if ready != pending.to_build {
            log::warn!(
                "batches not built: {:?} ({} buffers left unfilled)",
                pending.to_build.difference(ready),
                leftover
            );
        }
        BuildReport {
            batches_built: ready.bits().count_ones() as usize,
            buffers_extracted: pending.scheduled - leftover.min(pending.scheduled),
            stats: self.stats.snapshot(),
        }
    }

    /// Build every requested batch and wait for it.
    pub fn build_requested(&mut self, data: &MeshData, flags: RunFlags) -> Result<BuildReport> {
        let mut graph = TaskGraph::new();
        let pending = self.create_requested(&mut graph, data, flags)?;
        let result = graph.work_and_wait();
        let report = self.finish_requested(pending);
        result.map(|()| report)
    }

    /// Resolved batch; empty when not built.
    pub fn batch(&self, id: BatchId) -> BatchHandle<'_> {
        let desc = id.desc();
        if !self.is_ready(id) {
            return BatchHandle::empty(desc.prim);
        }
        let buffers = &self.variants[self.batch_variant[id.index()].index()].buffers;
        BatchHandle {
            prim: desc.prim,
            vertex_buffers: desc.vbos.iter().filter_map(|&t| buffers.vbo(t)).collect(),
            index: desc.ibo.and_then(|t| buffers.ibo(t)).cloned(),
        }
    }

    /// One surface per material, each drawing its sub-range of the triangles.
    ///
    /// Single-material meshes get one surface over the whole buffer.
    pub fn surface_per_mat(&self) -> Result<Vec<BatchHandle<'_>>> {
        let base = self.batch(BatchId::SurfacePerMat);
        let Some(tris) = base.index.clone() else {
            return Ok(Vec::new());
        };
        let variant = self.batch_variant[BatchId::SurfacePerMat.index()];
        let ranges = &self.variants[variant.index()].summary.mat_tri_ranges;
        if ranges.is_empty() {
            return Ok(vec![base]);
        }
        ranges
            .iter()
            .map(|range| {
                let index = IndexBuf::subrange(&tris, range.start as usize * 3, range.len() * 3)?;
                Ok(BatchHandle { index: Some(index), ..base.clone() })
            })
            .collect()
    }
}

/// Build the requested batches of several meshes in one task graph.
///
/// Every cache is finished even when the graph fails; the first error is
/// returned afterwards.
pub fn build_requested_all(
    caches: &mut [MeshBatchCache],
    meshes: &[MeshData],
    flags: RunFlags,
) -> Result<Vec<BuildReport>> {
    let mut graph = TaskGraph::new();
    let mut pending = Vec::with_capacity(caches.len());
    for (cache, data) in caches.iter_mut().zip(meshes) {
        pending.push(cache.create_requested(&mut graph, data, flags)?);
    }
    log::debug!("{} meshes, {} task nodes", pending.len(), graph.len());
    let result = graph.work_and_wait();
    let reports = caches
        .iter_mut()
        .zip(pending)
        .map(|(cache, p)| cache.finish_requested(p))
        .collect();
    result.map(|()| reports)
}
