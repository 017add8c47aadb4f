//! Meshcache - mesh draw-cache extraction
//!
//! Converts mesh geometry into the vertex and index buffers a renderer draws
//! from, caching them per object and rebuilding only what was requested and
//! invalidated.

pub mod core;
pub mod config;
pub mod mesh;
pub mod gpu;
pub mod cache;
pub mod extract;

pub use config::{CacheConfig, RunFlags};
pub use cache::{BatchId, CacheVariant, DirtyReason, MeshBatchCache, build_requested_all};
pub use mesh::{Mesh, MeshData};
