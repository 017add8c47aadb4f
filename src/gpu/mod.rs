//! GPU resource layer
//!
//! CPU-side stand-ins for vertex buffers, index buffers and batches with the
//! allocate / fill / upload / discard contract of a real device. Memory is
//! accounted against a shared budget so exhaustion surfaces as an error.

pub mod memory;
pub mod format;
pub mod vertbuf;
pub mod indexbuf;
pub mod batch;

pub use memory::{GpuAllocation, GpuMemory};
pub use format::{CompType, PackedNormal, ShortNormal, VertAttr, VertFormat};
pub use vertbuf::VertBuf;
pub use indexbuf::{IndexBuf, IndexBufBuilder, PrimType, RESTART_INDEX};
pub use batch::BatchHandle;
