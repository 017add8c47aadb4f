use criterion::{criterion_group, criterion_main, Criterion, black_box};

use meshcache::cache::{BatchId, DirtyReason, MeshBatchCache};
use meshcache::config::{CacheConfig, RunFlags};
use meshcache::gpu::GpuMemory;
use meshcache::mesh::{MeshData, primitives};

fn rebuild(cache: &mut MeshBatchCache, data: &MeshData, flags: RunFlags, batches: &[BatchId]) {
    cache.tag_dirty(DirtyReason::All);
    for &id in batches {
        cache.request(id);
    }
    let report = cache.build_requested(data, flags).unwrap();
    black_box(report.buffers_extracted);
}

fn bench_surface_64(c: &mut Criterion) {
    let data = MeshData::new(primitives::grid(64, 64));
    let mut cache = MeshBatchCache::new(CacheConfig::default(), GpuMemory::unlimited());

    c.bench_function("surface_grid_64", |b| {
        b.iter(|| rebuild(&mut cache, black_box(&data), RunFlags::object_mode(), &[BatchId::Surface]));
    });
}

fn bench_surface_256_threaded(c: &mut Criterion) {
    let data = MeshData::new(primitives::grid(256, 256));
    let config = CacheConfig { min_range_per_thread: 4096, ..CacheConfig::default() };
    let mut cache = MeshBatchCache::new(config, GpuMemory::unlimited());

    c.bench_function("surface_grid_256_threaded", |b| {
        b.iter(|| rebuild(&mut cache, black_box(&data), RunFlags::object_mode(), &[BatchId::Surface, BatchId::AllEdges]));
    });
}

fn bench_surface_256_single(c: &mut Criterion) {
    let data = MeshData::new(primitives::grid(256, 256));
    let config = CacheConfig { min_range_per_thread: usize::MAX, ..CacheConfig::default() };
    let mut cache = MeshBatchCache::new(config, GpuMemory::unlimited());

    c.bench_function("surface_grid_256_single", |b| {
        b.iter(|| rebuild(&mut cache, black_box(&data), RunFlags::object_mode(), &[BatchId::Surface, BatchId::AllEdges]));
    });
}

fn bench_edit_mode_all_batches(c: &mut Criterion) {
    let mut mesh = primitives::grid(128, 128);
    primitives::add_loose(&mut mesh, 64, 64);
    let mut data = MeshData::new(mesh);
    data.begin_edit();
    let flags = RunFlags { do_uv_cage: true, ..RunFlags::edit_mode() };
    let mut cache = MeshBatchCache::new(CacheConfig::default(), GpuMemory::unlimited());

    c.bench_function("edit_mode_all_batches_128", |b| {
        b.iter(|| rebuild(&mut cache, black_box(&data), flags, &BatchId::ALL));
    });
}

fn bench_select_retag(c: &mut Criterion) {
    let mut data = MeshData::new(primitives::grid(128, 128));
    data.begin_edit();
    let flags = RunFlags::edit_mode();
    let mut cache = MeshBatchCache::new(CacheConfig::default(), GpuMemory::unlimited());
    cache.request(BatchId::EditTriangles);
    cache.request(BatchId::EditFacedots);
    cache.build_requested(&data, flags).unwrap();

    c.bench_function("select_retag_128", |b| {
        b.iter(|| {
            cache.tag_dirty(DirtyReason::Select);
            cache.request(BatchId::EditTriangles);
            cache.request(BatchId::EditFacedots);
            black_box(cache.build_requested(&data, flags).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_surface_64,
    bench_surface_256_threaded,
    bench_surface_256_single,
    bench_edit_mode_all_batches,
    bench_select_retag,
);
criterion_main!(benches);
