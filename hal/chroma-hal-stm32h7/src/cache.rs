//! Cortex-M7 L1 data cache maintenance
//!
//! Wraps the SCB cache maintenance operations of the `cortex-m` crate.

use chroma_hal::cache::DataCache;
use chroma_hal::memory::MemoryRegion;
use cortex_m::peripheral::SCB;

/// Data cache of the Cortex-M7 core
pub struct CortexM7Cache {
    scb: SCB,
}

impl CortexM7Cache {
    /// Take ownership of the system control block for cache maintenance
    pub fn new(scb: SCB) -> Self {
        Self { scb }
    }

    /// Give the system control block back
    pub fn release(self) -> SCB {
        self.scb
    }
}

impl DataCache for CortexM7Cache {
    fn is_enabled(&self) -> bool {
        SCB::dcache_enabled()
    }

    fn clean(&mut self, region: MemoryRegion) {
        self.scb.clean_dcache_by_address(region.base, region.len);
    }

    fn clean_invalidate(&mut self, region: MemoryRegion) {
        self.scb
            .clean_invalidate_dcache_by_address(region.base, region.len);
    }

    fn invalidate(&mut self, region: MemoryRegion) {
        // SAFETY: callers only invalidate lines that lie entirely inside a
        // DMA output; partly covered lines go through `clean_invalidate`.
        unsafe {
            self.scb
                .invalidate_dcache_by_address(region.base, region.len);
        }
    }
}
