//! Per-mesh draw cache: buffer slots, batch table and invalidation

pub mod buffers;
pub mod batch;
pub mod invalidate;
pub mod batch_cache;

pub use buffers::{
    BufferSlot, BufferSummary, BufferType, IboType, LooseGeom,
    MeshBufferCache, MeshBufferList, VboType,
};
pub use batch::{BATCHES, BatchDesc, BatchFlags, BatchId, CacheVariant, batches_that_use_buffer};
pub use invalidate::{CacheKeys, CacheState, DirtyReason, is_valid};
pub use batch_cache::{AtomicBatchFlags, MeshBatchCache, PendingBuild, build_requested_all};
