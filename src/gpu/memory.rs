//! GPU memory budget
//!
//! Every vertex and index buffer reserves its size here before it is
//! filled. Reservations are released when the owning buffer is dropped,
//! which is how buffers are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{Error, Result};

/// Byte budget shared by all buffers of all caches.
#[derive(Debug)]
pub struct GpuMemory {
    /// Maximum bytes (usize::MAX when unlimited)
    budget_bytes: usize,
    used_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

impl GpuMemory {
    /// Create a budget
    ///
    /// # Arguments
    /// * `budget_bytes` - Maximum bytes, 0 for unlimited
    pub fn new(budget_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            budget_bytes: if budget_bytes == 0 { usize::MAX } else { budget_bytes },
            used_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
        })
    }

    pub fn unlimited() -> Arc<Self> {
        Self::new(0)
    }

    /// Reserve `bytes` for the buffer `name`.
    ///
    /// Fails with [`Error::Allocation`] when the budget would be exceeded.
    pub fn allocate(self: &Arc<Self>, name: &'static str, bytes: usize) -> Result<GpuAllocation> {
        let mut used = self.used_bytes.load(Ordering::Relaxed);
        loop {
            let available = self.budget_bytes.saturating_sub(used);
            if bytes > available {
                log::warn!("GPU budget exhausted for {}: {} bytes requested, {} available", name, bytes, available);
                return Err(Error::Allocation { buffer: name, requested: bytes, available });
            }
            match self.used_bytes.compare_exchange_weak(
                used,
                used + bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => used = current,
            }
        }
        self.peak_bytes.fetch_max(used + bytes, Ordering::Relaxed);
        Ok(GpuAllocation { memory: Arc::clone(self), bytes })
    }

    /// Bytes currently reserved
    pub fn used(&self) -> usize {
        self.used_bytes.load(Ordering::Acquire)
    }

    /// Highest reservation seen
    pub fn peak(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Bytes still available
    pub fn available(&self) -> usize {
        self.budget_bytes.saturating_sub(self.used())
    }

    pub fn is_unlimited(&self) -> bool {
        self.budget_bytes == usize::MAX
    }
}

/// Reservation released on drop.
#[derive(Debug)]
pub struct GpuAllocation {
    memory: Arc<GpuMemory>,
    bytes: usize,
}

impl GpuAllocation {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Give back the tail of the reservation after the buffer was trimmed.
    pub fn shrink(&mut self, bytes: usize) {
        if bytes < self.bytes {
            self.memory.used_bytes.fetch_sub(self.bytes - bytes, Ordering::AcqRel);
            self.bytes = bytes;
        }
    }
}

impl Drop for GpuAllocation {
    fn drop(&mut self) {
        self.memory.used_bytes.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_released_on_drop() {
        let memory = GpuMemory::new(1000);
        {
            let a = memory.allocate("a", 400).unwrap();
            assert_eq!(a.bytes(), 400);
            assert_eq!(memory.used(), 400);
        }
        assert_eq!(memory.used(), 0);
        assert_eq!(memory.peak(), 400);
    }

    #[test]
    fn test_over_budget_fails() {
        let memory = GpuMemory::new(100);
        let _a = memory.allocate("a", 60).unwrap();
        match memory.allocate("b", 50) {
            Err(Error::Allocation { buffer, requested, available }) => {
                assert_eq!(buffer, "b");
                assert_eq!(requested, 50);
                assert_eq!(available, 40);
            }
            other => panic!("expected allocation error, got {:?}", other),
        }
        assert_eq!(memory.used(), 60);
    }

    #[test]
    fn test_shrink() {
        let memory = GpuMemory::new(100);
        let mut a = memory.allocate("a", 80).unwrap();
        a.shrink(30);
        assert_eq!(memory.used(), 30);
        assert_eq!(memory.available(), 70);
    }

    #[test]
    fn test_unlimited() {
        let memory = GpuMemory::unlimited();
        assert!(memory.is_unlimited());
        let _a = memory.allocate("a", 1 << 30).unwrap();
    }
}
