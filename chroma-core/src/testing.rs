//! Host mocks shared by the unit tests
//!
//! [`SoftBlitter`] executes transfers on host memory through the raw
//! addresses in the transfer, the way the engine does on the bus.

#![allow(unsafe_code)]

extern crate std;

use std::vec;
use std::vec::Vec;

use chroma_hal::{
    BlitEngine, BlitMode, CheckedTransfer, DataCache, ExternalMemory, MemoryRegion, Transfer,
    TransferStatus,
};
use embedded_hal::delay::DelayNs;

use crate::edid::DisplayDescriptor;
use crate::legacy::{LegacyDriverRecord, LegacyGraphicsLibrary};
use crate::pixel::Rgb565;
use crate::timing::{DisplayMode, InterfaceLimits};
use crate::traits::{
    DisplayInterface, DriverRecord, FlushReady, GraphicsLibrary, LibraryVersion, LinkId, ScanOut,
    Transceiver,
};

/// Error returned by every mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Software blit engine
#[derive(Debug, Default)]
pub struct SoftBlitter {
    /// Never leave `Busy`
    pub stalled: bool,
    /// Reject every start
    pub fail_start: bool,
    /// Report the error flag after start
    pub error_flag: bool,
    /// Every started transfer
    pub transfers: Vec<Transfer>,
}

impl SoftBlitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlitEngine for SoftBlitter {
    type Error = MockError;

    fn start(&mut self, transfer: &CheckedTransfer) -> Result<(), MockError> {
        if self.fail_start {
            return Err(MockError);
        }
        let transfer = *transfer.get();
        self.transfers.push(transfer);
        if !self.stalled && !self.error_flag {
            execute(&transfer);
        }
        Ok(())
    }

    fn status(&mut self) -> TransferStatus {
        if self.error_flag {
            TransferStatus::Error
        } else if self.stalled {
            TransferStatus::Busy
        } else {
            TransferStatus::Complete
        }
    }
}

fn execute(t: &Transfer) {
    let ppl = t.pixels_per_line as usize;
    let at = |base: usize, offset: u16, line: usize, px: usize| {
        base + (line * (ppl + offset as usize) + px) * 2
    };

    for line in 0..t.lines as usize {
        for px in 0..ppl {
            let out = at(t.output.address, t.output.line_offset, line, px);
            let value = match t.mode {
                BlitMode::RegisterToMemory => t.color as u16,
                BlitMode::MemoryToMemory => {
                    let Some(fg) = t.foreground else { return };
                    read(at(fg.address, fg.line_offset, line, px))
                }
                BlitMode::MemoryToMemoryBlend => {
                    let (Some(fg), Some(bg)) = (t.foreground, t.background) else {
                        return;
                    };
                    let top = read(at(fg.address, fg.line_offset, line, px));
                    let bottom = read(at(bg.address, bg.line_offset, line, px));
                    mix(Rgb565(top), Rgb565(bottom), fg.alpha).0
                }
            };
            write(out, value);
        }
    }
}

fn read(address: usize) -> u16 {
    // SAFETY: tests only build transfers over live, aligned host buffers
    unsafe { (address as *const u16).read() }
}

fn write(address: usize, value: u16) {
    // SAFETY: as above
    unsafe { (address as *mut u16).write(value) }
}

/// Engine blend: channels expanded to 8 bits, mixed, truncated back
pub fn mix(top: Rgb565, bottom: Rgb565, alpha: u8) -> Rgb565 {
    let expand5 = |c: u8| (c << 3) | (c >> 2);
    let expand6 = |c: u8| (c << 2) | (c >> 4);
    let a = alpha as u32;
    let blend = |t: u8, b: u8| ((t as u32 * a + b as u32 * (255 - a)) / 255) as u8;
    Rgb565::from_rgb888(
        blend(expand5(top.r()), expand5(bottom.r())),
        blend(expand6(top.g()), expand6(bottom.g())),
        blend(expand5(top.b()), expand5(bottom.b())),
    )
}

/// Host memory standing in for SDRAM
pub struct HostMemory {
    pixels: Vec<Rgb565>,
}

impl HostMemory {
    /// At least `bytes` of usable memory plus room for alignment
    pub fn new(bytes: usize) -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; bytes / 2 + 32],
        }
    }

    pub fn region(&self) -> MemoryRegion {
        MemoryRegion::new(self.pixels.as_ptr() as usize, self.pixels.len() * 2)
    }
}

/// Copy `count` pixels out of host memory at `address`
pub fn read_pixels(address: usize, count: usize) -> Vec<Rgb565> {
    (0..count).map(|i| Rgb565(read(address + i * 2))).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Clean(MemoryRegion),
    CleanInvalidate(MemoryRegion),
    Invalidate(MemoryRegion),
}

/// Data cache that records maintenance requests
#[derive(Debug, Default)]
pub struct RecordingCache {
    pub enabled: bool,
    pub ops: Vec<CacheOp>,
}

impl RecordingCache {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ops: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

impl DataCache for RecordingCache {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn clean(&mut self, region: MemoryRegion) {
        self.ops.push(CacheOp::Clean(region));
    }

    fn clean_invalidate(&mut self, region: MemoryRegion) {
        self.ops.push(CacheOp::CleanInvalidate(region));
    }

    fn invalidate(&mut self, region: MemoryRegion) {
        self.ops.push(CacheOp::Invalidate(region));
    }
}

/// Delay that only accumulates the requested time
#[derive(Debug, Default)]
pub struct NoopDelay {
    pub elapsed_ns: u64,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

/// Scripted bridge transceiver
#[derive(Debug, Default)]
pub struct MockTransceiver {
    /// Number of init calls that fail before one succeeds
    pub init_failures: u8,
    pub init_calls: u8,
    /// Hot-plug is seen on this poll (`None`: never)
    pub hotplug_on_poll: Option<u32>,
    pub polls: u32,
    pub descriptor: DisplayDescriptor,
    pub fail_descriptor: bool,
    pub fail_link: bool,
    /// Mode the link was started with
    pub started: Option<DisplayMode>,
}

impl MockTransceiver {
    /// Transceiver with a display connected from the first poll
    pub fn connected(descriptor: DisplayDescriptor) -> Self {
        Self {
            hotplug_on_poll: Some(1),
            descriptor,
            ..Self::default()
        }
    }
}

impl Transceiver for MockTransceiver {
    type Error = MockError;

    fn init(&mut self, _link: LinkId) -> Result<(), MockError> {
        self.init_calls += 1;
        if self.init_calls <= self.init_failures {
            Err(MockError)
        } else {
            Ok(())
        }
    }

    fn hotplug_detected(&mut self, _link: LinkId) -> Result<bool, MockError> {
        self.polls += 1;
        Ok(self.hotplug_on_poll.is_some_and(|n| self.polls >= n))
    }

    fn read_descriptor(&mut self, _link: LinkId) -> Result<DisplayDescriptor, MockError> {
        if self.fail_descriptor {
            return Err(MockError);
        }
        Ok(self.descriptor.clone())
    }

    fn start_link(
        &mut self,
        _link: LinkId,
        _descriptor: &DisplayDescriptor,
        mode: &DisplayMode,
    ) -> Result<(), MockError> {
        if self.fail_link {
            return Err(MockError);
        }
        self.started = Some(*mode);
        Ok(())
    }
}

/// Serial display interface that records the programmed mode
#[derive(Debug, Default)]
pub struct MockInterface {
    pub limits: InterfaceLimits,
    pub configured: Option<DisplayMode>,
    pub fail: bool,
}

impl DisplayInterface for MockInterface {
    type Error = MockError;

    fn limits(&self) -> InterfaceLimits {
        self.limits
    }

    fn configure(&mut self, mode: &DisplayMode) -> Result<(), MockError> {
        if self.fail {
            return Err(MockError);
        }
        self.configured = Some(*mode);
        Ok(())
    }
}

/// Scan-out layer recording every buffer it was pointed at
#[derive(Debug, Default)]
pub struct MockScanOut {
    pub shown: Vec<usize>,
    pub fail: bool,
}

impl MockScanOut {
    /// Address currently scanned out
    pub fn current(&self) -> Option<usize> {
        self.shown.last().copied()
    }
}

impl ScanOut for MockScanOut {
    type Error = MockError;

    fn set_framebuffer(&mut self, address: usize) -> Result<(), MockError> {
        if self.fail {
            return Err(MockError);
        }
        self.shown.push(address);
        Ok(())
    }
}

/// External memory over a host buffer
pub struct MockMemory {
    pub host: HostMemory,
    pub reserved_end: Option<Option<usize>>,
    pub fail: bool,
}

impl MockMemory {
    pub fn new(bytes: usize) -> Self {
        Self {
            host: HostMemory::new(bytes),
            reserved_end: None,
            fail: false,
        }
    }
}

impl ExternalMemory for MockMemory {
    type Error = MockError;

    fn region(&self) -> MemoryRegion {
        self.host.region()
    }

    fn begin(&mut self, reserved_end: Option<usize>) -> Result<(), MockError> {
        if self.fail {
            return Err(MockError);
        }
        self.reserved_end = Some(reserved_end);
        Ok(())
    }
}

/// Graphics library recording registrations
#[derive(Debug)]
pub struct MockLibrary {
    pub version: LibraryVersion,
    pub registered: Vec<DriverRecord>,
    pub reject: bool,
}

impl MockLibrary {
    pub fn new(major: u8, minor: u8) -> Self {
        Self {
            version: LibraryVersion::new(major, minor),
            registered: Vec::new(),
            reject: false,
        }
    }
}

impl GraphicsLibrary for MockLibrary {
    type Error = MockError;

    fn version(&self) -> LibraryVersion {
        self.version
    }

    fn register_display(&mut self, record: &DriverRecord) -> Result<(), MockError> {
        if self.reject {
            return Err(MockError);
        }
        self.registered.push(*record);
        Ok(())
    }
}

/// Older-major graphics library recording registrations
#[derive(Debug)]
pub struct MockLegacyLibrary {
    pub version: LibraryVersion,
    pub registered: Vec<LegacyDriverRecord>,
}

impl MockLegacyLibrary {
    pub fn new(minor: u8) -> Self {
        Self {
            version: LibraryVersion::new(7, minor),
            registered: Vec::new(),
        }
    }
}

impl LegacyGraphicsLibrary for MockLegacyLibrary {
    type Error = MockError;

    fn version(&self) -> LibraryVersion {
        self.version
    }

    fn register_driver(&mut self, record: &LegacyDriverRecord) -> Result<(), MockError> {
        self.registered.push(*record);
        Ok(())
    }
}

/// Counts flush-ready signals
#[derive(Debug, Default)]
pub struct ReadyCounter {
    pub count: usize,
}

impl FlushReady for ReadyCounter {
    fn flush_ready(&mut self) {
        self.count += 1;
    }
}
