//! Extraction driver: builds the draw cache of a procedural grid and reports timings.
//!
//! Usage: cargo run --release --bin extract_mesh -- [OPTIONS]
//!
//! Options:
//!   --size <N>        Grid resolution, N x N quads (default: 256)
//!   --loose <N>       Loose edges and loose vertices to add (default: 0)
//!   --threads <N>     Worker threads (default: from config, else rayon default)
//!   --chunk <N>       Minimum elements per thread (default: from config)
//!   --config <PATH>   Load a CacheConfig JSON file
//!   --save-config <PATH>  Write the effective config and exit
//!   --edit            Extract from the edit-mode representation
//!   --hq              Use high-quality normals
//!   --repeat <N>      Rebuild N times after tagging the cache dirty (default: 3)

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use meshcache::cache::{BatchId, DirtyReason, MeshBatchCache};
use meshcache::config::{CacheConfig, RunFlags};
use meshcache::core::Result;
use meshcache::extract::Domain;
use meshcache::gpu::GpuMemory;
use meshcache::mesh::{MeshData, primitives};

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let mut config = match parse_str_arg(args, "--config") {
        Some(path) => CacheConfig::load(&PathBuf::from(path))?,
        None => CacheConfig::default(),
    };
    if let Some(threads) = parse_usize_arg(args, "--threads") {
        config.num_threads = threads;
    }
    if let Some(chunk) = parse_usize_arg(args, "--chunk") {
        config.min_range_per_thread = chunk;
    }
    if args.iter().any(|a| a == "--hq") {
        config.use_hq_normals = true;
    }
    config.validate()?;

    if let Some(path) = parse_str_arg(args, "--save-config") {
        config.save(&PathBuf::from(&path))?;
        println!("Config written to {}", path);
        return Ok(());
    }

    let size = parse_u32_arg(args, "--size").unwrap_or(256);
    let loose = parse_u32_arg(args, "--loose").unwrap_or(0);
    let repeat = parse_usize_arg(args, "--repeat").unwrap_or(3);
    let edit = args.iter().any(|a| a == "--edit");

    if config.num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()
            .map_err(|e| meshcache::core::Error::Config(e.to_string()))?;
    }

    let mut mesh = primitives::grid(size, size);
    primitives::add_loose(&mut mesh, loose, loose);
    let mut data = MeshData::new(mesh);
    let flags = if edit {
        data.begin_edit();
        RunFlags { do_uv_cage: true, ..RunFlags::edit_mode() }
    } else {
        RunFlags::object_mode()
    };

    println!("=== Meshcache Extraction ===");
    println!("Grid:    {} x {} quads, {} loose", size, size, loose);
    println!("Mode:    {}", if edit { "edit" } else { "object" });
    println!("Threads: {}", rayon::current_num_threads());
    println!("Chunk:   {}", config.min_range_per_thread);
    println!();

    let memory = GpuMemory::new(config.gpu_budget_bytes);
    let mut cache = MeshBatchCache::new(config, memory.clone());
    let batches: &[BatchId] = if edit {
        &BatchId::ALL
    } else {
        &[BatchId::Surface, BatchId::AllEdges, BatchId::LooseEdges, BatchId::AllVerts]
    };

    for pass in 0..=repeat {
        if pass > 0 {
            cache.tag_dirty(DirtyReason::All);
        }
        for &id in batches {
            cache.request(id);
        }
        let start = Instant::now();
        let report = cache.build_requested(&data, flags)?;
        let elapsed = start.elapsed();

        let stats = &report.stats;
        println!(
            "pass {}: {} batches, {} buffers in {:.2}ms ({} threaded / {} single runs)",
            pass,
            report.batches_built,
            report.buffers_extracted,
            elapsed.as_secs_f64() * 1000.0,
            stats.threaded_runs,
            stats.single_threaded_runs,
        );
        for domain in Domain::ORDER {
            let calls = stats.element_calls[domain.index()];
            if calls > 0 {
                log::debug!("  {:<8} {} callbacks", domain.name(), calls);
            }
        }
    }

    println!();
    println!("GPU memory: {:.2} MB in use, {:.2} MB peak",
        memory.used() as f64 / (1024.0 * 1024.0),
        memory.peak() as f64 / (1024.0 * 1024.0),
    );
    let surface = cache.batch(BatchId::Surface);
    println!("Surface: {} vertices, {} triangles", surface.vertex_len(), surface.primitive_count());
    Ok(())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
