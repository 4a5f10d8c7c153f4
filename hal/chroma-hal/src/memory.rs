//! External memory abstractions
//!
//! Frame buffers live in external SDRAM. The controller bring-up itself is
//! chip specific; the core only needs the mapped window and a `begin` call.

/// A contiguous range of the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryRegion {
    /// First byte address
    pub base: usize,
    /// Length in bytes
    pub len: usize,
}

impl MemoryRegion {
    /// Create a region from base address and length
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// One past the last byte address
    pub const fn end(&self) -> usize {
        self.base + self.len
    }

    /// Check if the region has zero length
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if `address` lies inside the region
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }

    /// Check if `other` lies entirely inside this region
    pub const fn contains_region(&self, other: &MemoryRegion) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }

    /// Grow the region outward so both ends sit on an `align` boundary
    ///
    /// `align` must be a power of two.
    pub const fn align_outward(&self, align: usize) -> Self {
        let mask = align - 1;
        let base = self.base & !mask;
        let end = (self.end() + mask) & !mask;
        Self {
            base,
            len: end - base,
        }
    }

    /// Shrink the region inward to the `align` boundaries it fully covers
    ///
    /// The result is empty when no aligned block lies inside. `align` must
    /// be a power of two.
    pub const fn align_inward(&self, align: usize) -> Self {
        let mask = align - 1;
        let base = (self.base + mask) & !mask;
        let end = self.end() & !mask;
        if end <= base {
            return Self { base, len: 0 };
        }
        Self {
            base,
            len: end - base,
        }
    }
}

/// External memory controller
///
/// Implemented by the SDRAM (FMC) driver of the board.
pub trait ExternalMemory {
    /// Error type for bring-up failures
    type Error;

    /// The address window the controller maps the external memory at
    fn region(&self) -> MemoryRegion;

    /// Configure the controller and make the memory usable
    ///
    /// `reserved_end` is the first address after the frame buffers, if any.
    /// Implementations that manage a heap in external memory start it there.
    fn begin(&mut self, reserved_end: Option<usize>) -> Result<(), Self::Error>;
}
