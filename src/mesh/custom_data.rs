//! Custom-data layer masks
//!
//! Tracks which optional per-loop layers (UV maps) are baked into the
//! buffers and which ones the draw engines currently need.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

/// Maximum number of UV layers tracked by the mask.
pub const MAX_UV_LAYERS: usize = 8;

bitflags! {
    /// Set of custom-data layers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CustomDataMask: u32 {
        const UV_0 = 1 << 0;
        const UV_1 = 1 << 1;
        const UV_2 = 1 << 2;
        const UV_3 = 1 << 3;
        const UV_4 = 1 << 4;
        const UV_5 = 1 << 5;
        const UV_6 = 1 << 6;
        const UV_7 = 1 << 7;
    }
}

impl CustomDataMask {
    /// Mask for UV layer `index`; layers past the limit map to nothing.
    pub fn uv(index: usize) -> Self {
        if index < MAX_UV_LAYERS {
            Self::from_bits_truncate(1 << index)
        } else {
            Self::empty()
        }
    }

    /// Indices of the UV layers in the mask, in ascending order.
    pub fn uv_layers(self) -> impl Iterator<Item = usize> {
        (0..MAX_UV_LAYERS).filter(move |&i| self.contains(Self::uv(i)))
    }
}

/// Mask shared between requesting threads.
#[derive(Debug, Default)]
pub struct AtomicCustomDataMask(AtomicU32);

impl AtomicCustomDataMask {
    pub fn load(&self) -> CustomDataMask {
        CustomDataMask::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    /// Add layers to the mask.
    pub fn merge(&self, mask: CustomDataMask) {
        self.0.fetch_or(mask.bits(), Ordering::AcqRel);
    }

    /// Replace the mask, returning the previous value.
    pub fn swap(&self, mask: CustomDataMask) -> CustomDataMask {
        CustomDataMask::from_bits_truncate(self.0.swap(mask.bits(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_mask_bits() {
        assert_eq!(CustomDataMask::uv(0), CustomDataMask::UV_0);
        assert_eq!(CustomDataMask::uv(3), CustomDataMask::UV_3);
        assert!(CustomDataMask::uv(MAX_UV_LAYERS).is_empty());
    }

    #[test]
    fn test_uv_layers_iter() {
        let mask = CustomDataMask::UV_0 | CustomDataMask::UV_2;
        assert_eq!(mask.uv_layers().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_atomic_merge() {
        let mask = AtomicCustomDataMask::default();
        mask.merge(CustomDataMask::UV_1);
        mask.merge(CustomDataMask::UV_1);
        mask.merge(CustomDataMask::UV_0);
        assert_eq!(mask.load(), CustomDataMask::UV_0 | CustomDataMask::UV_1);
        assert_eq!(mask.swap(CustomDataMask::empty()), CustomDataMask::UV_0 | CustomDataMask::UV_1);
        assert!(mask.load().is_empty());
    }
}
