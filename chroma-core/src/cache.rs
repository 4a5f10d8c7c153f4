//! Cache coherency around blit transfers
//!
//! The blit engine is a bus master that bypasses the CPU data cache. Before
//! a transfer, lines the engine reads are cleaned so it sees the CPU's
//! writes, and lines it writes are cleaned and invalidated so no dirty line
//! is evicted over its output. After the transfer the output lines are
//! invalidated once more, dropping anything speculatively refetched while
//! the engine ran. Lines the output only partly covers are cleaned as well,
//! since the CPU may have written their other bytes meanwhile.

use chroma_hal::{DataCache, MemoryRegion, Transfer};

/// Wraps a [`DataCache`] with the maintenance sequence for one transfer
#[derive(Debug)]
pub struct CacheGuard<C> {
    cache: C,
}

impl<C: DataCache> CacheGuard<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Release the wrapped cache
    pub fn release(self) -> C {
        self.cache
    }

    /// Maintenance before the engine starts `transfer`
    pub fn before(&mut self, transfer: &Transfer) {
        if !self.cache.is_enabled() {
            return;
        }
        let output = transfer.output_region();
        for input in transfer.input_regions().into_iter().flatten() {
            // Inputs that alias the output are covered below
            if input != output {
                self.maintain(input, C::clean);
            }
        }
        self.maintain(output, C::clean_invalidate);
    }

    /// Maintenance after `transfer` finished
    pub fn after(&mut self, transfer: &Transfer) {
        if !self.cache.is_enabled() {
            return;
        }
        let output = transfer.output_region();
        if output.is_empty() {
            return;
        }
        let line = self.cache.line_size();
        let outer = output.align_outward(line);
        let inner = output.align_inward(line);
        if inner.is_empty() {
            self.cache.clean_invalidate(outer);
            return;
        }

        if outer.base < inner.base {
            self.cache
                .clean_invalidate(MemoryRegion::new(outer.base, inner.base - outer.base));
        }
        self.cache.invalidate(inner);
        if inner.end() < outer.end() {
            self.cache
                .clean_invalidate(MemoryRegion::new(inner.end(), outer.end() - inner.end()));
        }
    }

    fn maintain(&mut self, region: MemoryRegion, op: fn(&mut C, MemoryRegion)) {
        if region.is_empty() {
            return;
        }
        let line = self.cache.line_size();
        op(&mut self.cache, region.align_outward(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CacheOp, RecordingCache};
    use chroma_hal::{LayerConfig, OutputConfig};

    #[test]
    fn test_copy_maintenance() {
        let mut guard = CacheGuard::new(RecordingCache::enabled());
        let transfer = Transfer::copy(
            LayerConfig::rgb565(0x1004),
            OutputConfig::rgb565(0x2000).with_line_offset(90),
            10,
            2,
        );

        guard.before(&transfer);
        guard.after(&transfer);

        let cache = guard.release();
        assert_eq!(
            cache.ops.as_slice(),
            &[
                // 40 source bytes at 0x1004 round out to two lines
                CacheOp::Clean(MemoryRegion::new(0x1000, 64)),
                // (100 + 10) pixels of output round out to 224 bytes
                CacheOp::CleanInvalidate(MemoryRegion::new(0x2000, 224)),
                // The last line is only partly written
                CacheOp::Invalidate(MemoryRegion::new(0x2000, 192)),
                CacheOp::CleanInvalidate(MemoryRegion::new(0x20C0, 32)),
            ]
        );
    }

    #[test]
    fn test_partial_output_lines_are_cleaned_after() {
        let mut guard = CacheGuard::new(RecordingCache::enabled());
        // 4 pixels at 0x2004 write 0x2004..0x200C of one line
        let small = Transfer::fill(0, OutputConfig::rgb565(0x2004), 4, 1);
        guard.after(&small);

        // 0x2010..0x2050 leaves one whole line between two partial ones
        let spanning = Transfer::fill(0, OutputConfig::rgb565(0x2010), 32, 1);
        guard.after(&spanning);

        let cache = guard.release();
        assert_eq!(
            cache.ops.as_slice(),
            &[
                CacheOp::CleanInvalidate(MemoryRegion::new(0x2000, 32)),
                CacheOp::CleanInvalidate(MemoryRegion::new(0x2000, 32)),
                CacheOp::Invalidate(MemoryRegion::new(0x2020, 32)),
                CacheOp::CleanInvalidate(MemoryRegion::new(0x2040, 32)),
            ]
        );
    }

    #[test]
    fn test_aligned_output_is_invalidated_after() {
        let mut guard = CacheGuard::new(RecordingCache::enabled());
        let transfer = Transfer::fill(0, OutputConfig::rgb565(0x2000), 16, 2);

        guard.after(&transfer);

        let cache = guard.release();
        assert_eq!(
            cache.ops.as_slice(),
            &[CacheOp::Invalidate(MemoryRegion::new(0x2000, 64))]
        );
    }

    #[test]
    fn test_blend_background_aliases_output() {
        let mut guard = CacheGuard::new(RecordingCache::enabled());
        let transfer = Transfer::blend(
            LayerConfig::rgb565(0x1000),
            LayerConfig::rgb565(0x3000),
            OutputConfig::rgb565(0x3000),
            16,
            1,
        );

        guard.before(&transfer);

        let cache = guard.release();
        assert_eq!(
            cache.ops.as_slice(),
            &[
                CacheOp::Clean(MemoryRegion::new(0x1000, 32)),
                CacheOp::CleanInvalidate(MemoryRegion::new(0x3000, 32)),
            ]
        );
    }

    #[test]
    fn test_disabled_cache_untouched() {
        let mut guard = CacheGuard::new(RecordingCache::disabled());
        let transfer = Transfer::fill(0, OutputConfig::rgb565(0x2000), 8, 8);

        guard.before(&transfer);
        guard.after(&transfer);

        assert!(guard.release().ops.is_empty());
    }
}
