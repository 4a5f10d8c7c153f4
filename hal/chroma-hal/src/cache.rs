//! Data cache maintenance abstractions
//!
//! Cores with a data cache (Cortex-M7) need explicit maintenance around
//! every transfer a DMA master performs on cacheable memory.

use crate::memory::MemoryRegion;

/// Cache line size of the Cortex-M7 L1 data cache
pub const CACHE_LINE_SIZE: usize = 32;

/// Data cache maintenance by address
///
/// All operations act on whole cache lines. Callers pass regions already
/// aligned to [`DataCache::line_size`].
pub trait DataCache {
    /// Check if the data cache is enabled
    fn is_enabled(&self) -> bool;

    /// Size of one cache line in bytes
    fn line_size(&self) -> usize {
        CACHE_LINE_SIZE
    }

    /// Write dirty lines of `region` back to memory
    fn clean(&mut self, region: MemoryRegion);

    /// Write dirty lines of `region` back, then drop them from the cache
    fn clean_invalidate(&mut self, region: MemoryRegion);

    /// Drop lines of `region` from the cache without writing them back
    ///
    /// Any CPU writes to the region that were not cleaned are lost, so
    /// only pass lines that a DMA master wrote in full.
    fn invalidate(&mut self, region: MemoryRegion);
}

/// Cache implementation for cores without a data cache (Cortex-M4, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl DataCache for NoCache {
    fn is_enabled(&self) -> bool {
        false
    }

    fn clean(&mut self, _region: MemoryRegion) {}

    fn clean_invalidate(&mut self, _region: MemoryRegion) {}

    fn invalidate(&mut self, _region: MemoryRegion) {}
}
