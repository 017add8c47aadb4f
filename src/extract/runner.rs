//! Parallel range runner
//!
//! Runs a group of extractors over the iteration domains in fixed order
//! (triangles, polygons, loose edges, loose vertices). `init` runs for every
//! extractor before the first scan and `finish` after the last one, both
//! sequentially on the calling thread. When threaded, a domain is split into
//! chunks that each accumulate into their own scratch block; blocks are
//! reduced in chunk order.

use std::time::Instant;

use rayon::prelude::*;

use crate::core::{Error, Result};
use super::extractor::{DynExtract, ExtractContext, ExtractorRunData, participates};
use super::render_data::MeshRenderData;
use super::scratch::{ExtractData, ScratchBlock};
use super::stats::ExtractStats;
use super::types::Domain;

/// How a run scans its domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunMode {
    pub use_threading: bool,
    /// Elements per parallel chunk
    pub chunk_len: usize,
}

impl RunMode {
    pub fn single_threaded() -> Self {
        Self { use_threading: false, chunk_len: usize::MAX }
    }

    pub fn threaded(chunk_len: usize) -> Self {
        Self { use_threading: true, chunk_len: chunk_len.max(1) }
    }
}

/// Indices of the runs that take part in `domain`.
pub fn filter_into(runs: &[&'static dyn DynExtract], domain: Domain, is_mesh: bool) -> Vec<usize> {
    runs.iter()
        .enumerate()
        .filter(|(_, e)| participates(**e, domain, is_mesh))
        .map(|(i, _)| i)
        .collect()
}

/// Run every extractor in `runs` over the render data.
pub fn run_extractors(
    mr: &MeshRenderData,
    ctx: &ExtractContext,
    runs: &mut [ExtractorRunData],
    mode: RunMode,
    stats: &ExtractStats,
) -> Result<()> {
    let start = Instant::now();
    let extractors: Vec<&'static dyn DynExtract> = runs.iter().map(|r| r.extractor).collect();

    let mut datas: Vec<ExtractData> = Vec::with_capacity(runs.len());
    for run in runs.iter_mut() {
        datas.push(run.extractor.init_erased(mr, ctx, run.slot)?);
        stats.record_init(run.extractor.info().name);
    }

    let mut scratch = ScratchBlock::with_len(runs.len());
    for (i, extractor) in extractors.iter().enumerate() {
        scratch.insert(i, extractor.task_data_erased(mr, &datas[i]));
    }

    let is_mesh = mr.extract_type.is_mesh();
    for domain in Domain::ORDER {
        let active = filter_into(&extractors, domain, is_mesh);
        let len = mr.domain_len(domain);
        if active.is_empty() || len == 0 {
            continue;
        }

        if mode.use_threading && len > mode.chunk_len {
            let chunk_count = len.div_ceil(mode.chunk_len);
            let fresh = || {
                let mut block = ScratchBlock::with_len(extractors.len());
                for &i in &active {
                    block.insert(i, extractors[i].task_data_erased(mr, &datas[i]));
                }
                block
            };
            let merged = (0..chunk_count)
                .into_par_iter()
                .map(|chunk| {
                    let range = chunk * mode.chunk_len..((chunk + 1) * mode.chunk_len).min(len);
                    let mut block = fresh();
                    for &i in &active {
                        if let Some(task) = block.get_mut(i) {
                            extractors[i].iter_range(domain, mr, range.clone(), &datas[i], task);
                        }
                    }
                    block
                })
                .reduce(&fresh, |mut dst, mut src| {
                    reduce_block(&extractors, &active, &mut dst, &mut src);
                    dst
                });
            let mut merged = merged;
            reduce_block(&extractors, &active, &mut scratch, &mut merged);
        } else {
            for &i in &active {
                if let Some(task) = scratch.get_mut(i) {
                    extractors[i].iter_range(domain, mr, 0..len, &datas[i], task);
                }
            }
        }
        stats.record_elements(domain, len * active.len());
    }

    for (i, (run, data)) in runs.iter_mut().zip(datas).enumerate() {
        let task = scratch
            .take(i)
            .ok_or_else(|| Error::Task(format!("{}: missing scratch", run.extractor.info().name)))?;
        run.extractor.finish_erased(mr, ctx, run.slot, data, task)?;
        stats.record_finish();
    }

    stats.record_run(mode.use_threading);
    log::trace!(
        "ran {} extractors ({}) in {:.2}ms",
        runs.len(),
        if mode.use_threading { "threaded" } else { "single-threaded" },
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn reduce_block(
    extractors: &[&'static dyn DynExtract],
    active: &[usize],
    dst: &mut ScratchBlock,
    src: &mut ScratchBlock,
) {
    for &i in active {
        if let (Some(d), Some(s)) = (dst.get_mut(i), src.take(i)) {
            extractors[i].reduce_erased(d, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::{BufferSlot, BufferType, VboType};
    use crate::config::RunFlags;
    use crate::cache::CacheVariant;
    use crate::extract::extractor::MeshExtract;
    use crate::extract::scratch::SlotRuns;
    use crate::extract::types::{DataFlags, IterDomain};
    use crate::gpu::GpuMemory;
    use crate::mesh::{CustomDataMask, LoopTri, Mesh, MeshData, MeshEdge, MeshPoly, MeshVert, primitives};

    /// Records callback counts per domain and the element indices it saw.
    struct Counting {
        domains: IterDomain,
        threaded: bool,
        calls: [AtomicUsize; 4],
        inits: AtomicUsize,
        finishes: AtomicUsize,
        seen: std::sync::Mutex<Vec<usize>>,
    }

    impl Counting {
        fn new(domains: IterDomain, threaded: bool) -> Self {
            Self {
                domains,
                threaded,
                calls: Default::default(),
                inits: AtomicUsize::new(0),
                finishes: AtomicUsize::new(0),
                seen: Default::default(),
            }
        }
        fn count(&self, d: Domain) -> usize {
            self.calls[d.index()].load(Ordering::SeqCst)
        }
    }

    impl MeshExtract for Counting {
        type Data = ();
        type TaskData = SlotRuns<u32>;

        fn name(&self) -> &'static str {
            "counting"
        }
        fn buffer(&self) -> BufferType {
            BufferType::Vbo(VboType::PolyIdx)
        }
        fn iter_mesh(&self) -> IterDomain {
            self.domains
        }
        fn data_flags(&self) -> DataFlags {
            DataFlags::LOOPTRI
        }
        fn use_threading(&self) -> bool {
            self.threaded
        }
        fn init(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot) -> Result<()> {
            assert_eq!(self.finishes.load(Ordering::SeqCst), 0);
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> SlotRuns<u32> {
            SlotRuns::new()
        }
        fn iter_looptri_mesh(&self, _mr: &MeshRenderData, _m: &Mesh, _t: &LoopTri, i: usize, _d: &(), task: &mut SlotRuns<u32>) {
            assert_eq!(self.inits.load(Ordering::SeqCst), 1);
            self.calls[0].fetch_add(1, Ordering::SeqCst);
            task.set(i, i as u32);
        }
        fn iter_poly_mesh(&self, _mr: &MeshRenderData, _m: &Mesh, _p: &MeshPoly, _i: usize, _d: &(), _t: &mut SlotRuns<u32>) {
            self.calls[1].fetch_add(1, Ordering::SeqCst);
        }
        fn iter_ledge_mesh(&self, _mr: &MeshRenderData, _m: &Mesh, _e: &MeshEdge, _i: usize, _d: &(), _t: &mut SlotRuns<u32>) {
            self.calls[2].fetch_add(1, Ordering::SeqCst);
        }
        fn iter_lvert_mesh(&self, _mr: &MeshRenderData, _m: &Mesh, _v: &MeshVert, _i: usize, _d: &(), _t: &mut SlotRuns<u32>) {
            self.calls[3].fetch_add(1, Ordering::SeqCst);
        }
        fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, _slot: &mut BufferSlot, _d: (), task: SlotRuns<u32>) -> Result<()> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            let mut seen = vec![u32::MAX; task.len()];
            task.scatter_into(&mut seen);
            *self.seen.lock().unwrap() = seen.into_iter().map(|v| v as usize).collect();
            Ok(())
        }
    }

    fn leak(c: Counting) -> &'static Counting {
        Box::leak(Box::new(c))
    }

    fn loose_mesh() -> MeshData {
        // 10 triangles, 3 loose edges, 2 loose verts
        let mut mesh = primitives::triangles(10);
        primitives::add_loose(&mut mesh, 3, 2);
        MeshData::new(mesh)
    }

    fn render_data(data: &MeshData) -> MeshRenderData<'_> {
        let mut mr = MeshRenderData::new(data, &RunFlags::object_mode(), CacheVariant::Final, CustomDataMask::empty()).unwrap();
        mr.update(DataFlags::LOOPTRI, IterDomain::all());
        mr
    }

    fn run(extractors: &[&'static Counting], mr: &MeshRenderData, mode: RunMode) {
        let ctx = ExtractContext::new(GpuMemory::unlimited());
        let stats = ExtractStats::default();
        let mut slots: Vec<BufferSlot> = extractors.iter().map(|_| BufferSlot::Empty).collect();
        let mut runs: Vec<ExtractorRunData> = extractors
            .iter()
            .zip(slots.iter_mut())
            .map(|(&e, slot)| ExtractorRunData::new(e, slot))
            .collect();
        run_extractors(mr, &ctx, &mut runs, mode, &stats).unwrap();
    }

    #[test]
    fn test_domain_partition_counts() {
        let data = loose_mesh();
        let mr = render_data(&data);
        let all = leak(Counting::new(IterDomain::all(), false));
        let tris_only = leak(Counting::new(IterDomain::LOOPTRI, false));
        let loose_only = leak(Counting::new(IterDomain::LEDGE | IterDomain::LVERT, false));
        run(&[all, tris_only, loose_only], &mr, RunMode::single_threaded());

        assert_eq!(all.count(Domain::Looptri), 10);
        assert_eq!(all.count(Domain::Poly), 10);
        assert_eq!(all.count(Domain::Ledge), 3);
        assert_eq!(all.count(Domain::Lvert), 2);

        assert_eq!(tris_only.count(Domain::Looptri), 10);
        assert_eq!(tris_only.count(Domain::Poly), 0);
        assert_eq!(tris_only.count(Domain::Ledge), 0);

        assert_eq!(loose_only.count(Domain::Looptri), 0);
        assert_eq!(loose_only.count(Domain::Ledge), 3);
        assert_eq!(loose_only.count(Domain::Lvert), 2);

        for e in [all, tris_only, loose_only] {
            assert_eq!(e.inits.load(Ordering::SeqCst), 1);
            assert_eq!(e.finishes.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_threaded_chunks_reduce_in_order() {
        let mut mesh = primitives::triangles(100);
        primitives::add_loose(&mut mesh, 7, 0);
        let data = MeshData::new(mesh);
        let mr = render_data(&data);
        let e = leak(Counting::new(IterDomain::LOOPTRI | IterDomain::LEDGE, true));
        run(&[e], &mr, RunMode::threaded(8));

        assert_eq!(e.count(Domain::Looptri), 100);
        assert_eq!(e.count(Domain::Ledge), 7);
        let seen = e.seen.lock().unwrap();
        assert_eq!(*seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_filter_into() {
        let poly = leak(Counting::new(IterDomain::POLY, true));
        let tri = leak(Counting::new(IterDomain::LOOPTRI, true));
        let list: Vec<&'static dyn DynExtract> = vec![poly, tri];
        assert_eq!(filter_into(&list, Domain::Poly, true), vec![0]);
        assert_eq!(filter_into(&list, Domain::Looptri, true), vec![1]);
        assert!(filter_into(&list, Domain::Lvert, true).is_empty());
    }

    #[test]
    fn test_empty_mesh_runs_init_and_finish() {
        let data = MeshData::new(Mesh::default());
        let mr = render_data(&data);
        let e = leak(Counting::new(IterDomain::all(), true));
        run(&[e], &mr, RunMode::threaded(4));
        assert_eq!(e.inits.load(Ordering::SeqCst), 1);
        assert_eq!(e.finishes.load(Ordering::SeqCst), 1);
        assert_eq!(e.count(Domain::Poly), 0);
    }
}
