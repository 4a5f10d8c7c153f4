//! Frame buffer allocation
//!
//! Frame buffers are carved once from the start of the external memory
//! window and never freed. Each buffer starts on a cache line boundary so
//! cache maintenance on one buffer never touches its neighbour.

use chroma_hal::cache::CACHE_LINE_SIZE;
use chroma_hal::MemoryRegion;
use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pixel::BYTES_PER_PIXEL;

/// Most buffers a set holds
pub const MAX_BUFFERS: usize = 2;

/// Number of frame buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Buffering {
    /// One buffer, scanned out while drawn
    Single,
    /// Two buffers, drawn and scanned out alternately
    #[default]
    Double,
}

impl Buffering {
    /// Number of buffers
    pub const fn count(self) -> usize {
        match self {
            Buffering::Single => 1,
            Buffering::Double => 2,
        }
    }
}

/// Errors from frame buffer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// Width or height is zero
    ZeroSize,
    /// The buffers do not fit the memory window
    OutOfMemory,
}

/// One RGB565 frame in external memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameBuffer {
    /// Address of pixel (0, 0)
    pub address: usize,
    /// Visible width in pixels
    pub width: u16,
    /// Visible height in pixels
    pub height: u16,
    /// Distance between line starts in pixels
    pub stride: u16,
}

impl FrameBuffer {
    /// Address of pixel `(x, y)`
    pub const fn pixel_address(&self, x: u16, y: u16) -> usize {
        self.address + (y as usize * self.stride as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Size of the frame in bytes
    pub const fn size_bytes(&self) -> usize {
        self.stride as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Memory covered by the frame
    pub const fn region(&self) -> MemoryRegion {
        MemoryRegion::new(self.address, self.size_bytes())
    }
}

/// Carves frame buffers from an external memory window
#[derive(Debug, Clone, Copy)]
pub struct FrameBufferAllocator {
    region: MemoryRegion,
}

impl FrameBufferAllocator {
    /// Allocator over the given memory window
    pub const fn new(region: MemoryRegion) -> Self {
        Self { region }
    }

    /// Reserve one or two `width` x `height` frames
    ///
    /// Consumes the allocator: buffers are reserved once per boot.
    pub fn allocate(
        self,
        width: u16,
        height: u16,
        buffering: Buffering,
    ) -> Result<FrameBufferSet, AllocError> {
        if width == 0 || height == 0 {
            return Err(AllocError::ZeroSize);
        }

        let base = align_up(self.region.base, CACHE_LINE_SIZE).ok_or(AllocError::OutOfMemory)?;
        let frame_bytes = width as usize * height as usize * BYTES_PER_PIXEL;
        let slot = align_up(frame_bytes, CACHE_LINE_SIZE).ok_or(AllocError::OutOfMemory)?;
        let total = slot
            .checked_mul(buffering.count())
            .ok_or(AllocError::OutOfMemory)?;
        let end = base.checked_add(total).ok_or(AllocError::OutOfMemory)?;
        if end > self.region.end() {
            return Err(AllocError::OutOfMemory);
        }

        let mut buffers = Vec::new();
        for i in 0..buffering.count() {
            let buffer = FrameBuffer {
                address: base + i * slot,
                width,
                height,
                stride: width,
            };
            buffers.push(buffer).map_err(|_| AllocError::OutOfMemory)?;
        }

        info!(
            "frame buffers: {}x{} x{} at {=usize:#x}..{=usize:#x}",
            width,
            height,
            buffering.count(),
            base,
            end
        );

        Ok(FrameBufferSet {
            buffers,
            next: 0,
            region: MemoryRegion::new(base, total),
        })
    }
}

fn align_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? & !(align - 1))
}

/// The allocated frame buffers with a rotating next-buffer accessor
#[derive(Debug, Clone)]
pub struct FrameBufferSet {
    buffers: Vec<FrameBuffer, MAX_BUFFERS>,
    next: usize,
    region: MemoryRegion,
}

impl FrameBufferSet {
    /// Return the next buffer in rotation and advance
    ///
    /// With double buffering consecutive calls alternate between the two
    /// buffers; with single buffering every call returns the same one.
    pub fn next_buffer(&mut self) -> FrameBuffer {
        let buffer = self.buffers[self.next];
        self.next = (self.next + 1) % self.buffers.len();
        buffer
    }

    /// All buffers in allocation order
    pub fn buffers(&self) -> &[FrameBuffer] {
        &self.buffers
    }

    /// Number of buffers
    pub fn buffering(&self) -> Buffering {
        if self.buffers.len() == 1 {
            Buffering::Single
        } else {
            Buffering::Double
        }
    }

    /// Memory reserved for all buffers
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    /// First address after the last buffer
    pub fn end(&self) -> usize {
        self.region.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDRAM: MemoryRegion = MemoryRegion::new(0xC000_0000, 8 * 1024 * 1024);

    #[test]
    fn test_double_buffers_rotate() {
        let mut set = FrameBufferAllocator::new(SDRAM)
            .allocate(720, 480, Buffering::Double)
            .unwrap();

        let first = set.next_buffer();
        let second = set.next_buffer();
        assert_ne!(first.address, second.address);
        assert!(SDRAM.contains_region(&first.region()));
        assert!(SDRAM.contains_region(&second.region()));
        assert!(set.region().contains_region(&second.region()));

        // Third call wraps to the first buffer
        assert_eq!(set.next_buffer(), first);
        assert_eq!(set.end(), SDRAM.base + 2 * 720 * 480 * 2);
    }

    #[test]
    fn test_single_buffer() {
        let mut set = FrameBufferAllocator::new(SDRAM)
            .allocate(480, 800, Buffering::Single)
            .unwrap();
        assert_eq!(set.buffering(), Buffering::Single);
        assert_eq!(set.next_buffer(), set.next_buffer());
        assert_eq!(set.buffers().len(), 1);
    }

    #[test]
    fn test_alignment() {
        // Unaligned window base, odd frame size
        let window = MemoryRegion::new(0xC000_0004, 1024 * 1024);
        let set = FrameBufferAllocator::new(window)
            .allocate(101, 7, Buffering::Double)
            .unwrap();
        for buffer in set.buffers() {
            assert_eq!(buffer.address % CACHE_LINE_SIZE, 0);
            assert!(window.contains_region(&buffer.region()));
        }
        assert_eq!(set.buffers()[0].address, 0xC000_0020);
    }

    #[test]
    fn test_pixel_address() {
        let buffer = FrameBuffer {
            address: 0x1000,
            width: 100,
            height: 50,
            stride: 100,
        };
        assert_eq!(buffer.pixel_address(0, 0), 0x1000);
        assert_eq!(buffer.pixel_address(3, 2), 0x1000 + (2 * 100 + 3) * 2);
        assert_eq!(buffer.region().len, 100 * 50 * 2);
    }

    #[test]
    fn test_allocation_errors() {
        let small = MemoryRegion::new(0xC000_0000, 720 * 480 * 2);
        assert!(FrameBufferAllocator::new(small)
            .allocate(720, 480, Buffering::Single)
            .is_ok());
        assert_eq!(
            FrameBufferAllocator::new(small)
                .allocate(720, 480, Buffering::Double)
                .unwrap_err(),
            AllocError::OutOfMemory
        );
        assert_eq!(
            FrameBufferAllocator::new(SDRAM)
                .allocate(0, 480, Buffering::Double)
                .unwrap_err(),
            AllocError::ZeroSize
        );
    }
}
