//! Display driver
//!
//! [`DisplayDriver`] is the single object the graphics library talks to
//! after bring-up. It owns the blit adapter and the frame buffers, builds
//! the [`DriverRecord`] for registration and serves the accelerator
//! callbacks.
//!
//! # Buffer rotation
//!
//! At construction the next-buffer accessor is called twice: the first
//! buffer is scanned out (front), the second is drawn into. With double
//! buffering the library redraws whole frames; after the last flush of a
//! frame the [`ScanOut`] layer is pointed at the draw buffer, which becomes
//! the front buffer, and the next buffer in rotation becomes the draw
//! buffer. If the layer refuses the switch, the buffers keep their roles.
//! With single buffering both are the same buffer and nothing rotates.

use chroma_hal::{BlitEngine, DataCache};
use embedded_hal::delay::DelayNs;

use crate::blit::{BlitAdapter, TransferOutcome, TransferStats};
use crate::config::Orientation;
use crate::framebuffer::{Buffering, FrameBuffer, FrameBufferSet};
use crate::pixel::{Area, Rgb565};
use crate::timing::DisplayMode;
use crate::traits::{
    Callbacks, DirtyRegion, DisplayCallbacks, DriverRecord, FlushReady, GraphicsLibrary,
    LibraryVersion, Rotation, ScanOut,
};

/// Errors from driver registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationError<E> {
    /// The driver is already registered with a library
    AlreadyRegistered,
    /// The library rejected the driver
    Library(E),
}

/// The registered display driver
pub struct DisplayDriver<E, C, D, S> {
    adapter: BlitAdapter<E, C, D>,
    buffers: FrameBufferSet,
    scanout: S,
    front: FrameBuffer,
    draw: FrameBuffer,
    mode: DisplayMode,
    orientation: Orientation,
    draw_buffer_pixels: usize,
    frames: u32,
    registered: bool,
}

impl<E, C, D, S> DisplayDriver<E, C, D, S>
where
    E: BlitEngine,
    C: DataCache,
    D: DelayNs,
    S: ScanOut,
{
    /// Build the driver over allocated frame buffers
    ///
    /// The library's draw buffer holds `1 / draw_buffer_divisor` of a frame.
    pub fn new(
        adapter: BlitAdapter<E, C, D>,
        mut buffers: FrameBufferSet,
        scanout: S,
        mode: DisplayMode,
        orientation: Orientation,
        draw_buffer_divisor: u8,
    ) -> Self {
        let front = buffers.next_buffer();
        let draw = buffers.next_buffer();
        let frame_pixels = mode.hactive as usize * mode.vactive as usize;

        Self {
            adapter,
            buffers,
            scanout,
            front,
            draw,
            mode,
            orientation,
            draw_buffer_pixels: frame_pixels / draw_buffer_divisor.max(1) as usize,
            frames: 0,
            registered: false,
        }
    }

    /// Point the scan-out layer at the front buffer
    pub fn start_scanout(&mut self) -> Result<(), S::Error> {
        self.scanout.set_framebuffer(self.front.address)?;
        debug!("scanning out {=usize:#x}", self.front.address);
        Ok(())
    }

    /// Negotiated display mode
    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    /// Buffer being scanned out
    pub fn front_buffer(&self) -> &FrameBuffer {
        &self.front
    }

    /// Buffer flushes are written to
    pub fn draw_buffer(&self) -> &FrameBuffer {
        &self.draw
    }

    /// Size of the library's draw buffer in pixels
    pub fn draw_buffer_pixels(&self) -> usize {
        self.draw_buffer_pixels
    }

    /// Completed frames (last flush of a frame seen)
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Transfer counters
    pub fn stats(&self) -> TransferStats {
        self.adapter.stats()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn scan_out(&self) -> &S {
        &self.scanout
    }

    /// Registration record for a library `version`
    ///
    /// `framebuffer` is the buffer scanned out when the record is built.
    pub fn record(&self, version: LibraryVersion) -> DriverRecord {
        let landscape = self.orientation == Orientation::Landscape;
        DriverRecord {
            hor_res: self.mode.hactive,
            ver_res: self.mode.vactive,
            rotation: if landscape { Rotation::Deg90 } else { Rotation::None },
            sw_rotate: landscape,
            full_refresh: self.buffers.buffering() == Buffering::Double,
            draw_buffer_pixels: self.draw_buffer_pixels,
            framebuffer: self.front.address,
            callbacks: Callbacks::for_version(version),
        }
    }

    /// Register with `library`; a driver registers once
    pub fn register<L: GraphicsLibrary>(
        &mut self,
        library: &mut L,
    ) -> Result<DriverRecord, RegistrationError<L::Error>> {
        if self.registered {
            warn!("display driver already registered");
            return Err(RegistrationError::AlreadyRegistered);
        }

        let version = library.version();
        let record = self.record(version);
        library
            .register_display(&record)
            .map_err(RegistrationError::Library)?;
        self.registered = true;

        info!(
            "registered {}x{} with library {}.{} (fill: {}, blend: {})",
            record.hor_res,
            record.ver_res,
            version.major,
            version.minor,
            record.callbacks.fill,
            record.callbacks.blend
        );
        Ok(record)
    }

    /// Copy a dirty region into the draw buffer and signal `ready`
    ///
    /// `ready` is signalled whatever the transfer outcome.
    pub fn flush_region(&mut self, region: &DirtyRegion<'_>, ready: &mut dyn FlushReady) -> TransferOutcome {
        let outcome = self.adapter.copy_to(&self.draw, &region.area, region.pixels);

        if region.last_in_frame {
            self.frames = self.frames.wrapping_add(1);
            if self.buffers.buffering() == Buffering::Double {
                self.present();
            }
        }

        ready.flush_ready();
        outcome
    }

    /// Scan out the draw buffer and move drawing to the next one
    fn present(&mut self) {
        if self.scanout.set_framebuffer(self.draw.address).is_err() {
            warn!("scan-out switch to {=usize:#x} failed", self.draw.address);
            return;
        }
        self.front = self.draw;
        self.draw = self.buffers.next_buffer();
    }

    /// Fill `area` of a `dest_width` wide buffer with `color`
    pub fn fill_area(&mut self, dest: &mut [Rgb565], dest_width: u16, area: &Area, color: Rgb565) -> TransferOutcome {
        self.adapter.fill(dest, dest_width, area, color)
    }

    /// Blend a run of `src` pixels over `dest`
    pub fn blend_run(&mut self, dest: &mut [Rgb565], src: &[Rgb565], length: usize, opacity: u8) -> TransferOutcome {
        self.adapter.blend(dest, src, length, opacity)
    }
}

impl<E, C, D, S> DisplayCallbacks for DisplayDriver<E, C, D, S>
where
    E: BlitEngine,
    C: DataCache,
    D: DelayNs,
    S: ScanOut,
{
    fn flush(&mut self, region: &DirtyRegion<'_>, ready: &mut dyn FlushReady) {
        self.flush_region(region, ready);
    }

    fn fill(&mut self, dest: &mut [Rgb565], dest_width: u16, area: &Area, color: Rgb565) {
        self.fill_area(dest, dest_width, area, color);
    }

    fn blend(&mut self, dest: &mut [Rgb565], src: &[Rgb565], length: usize, opacity: u8) {
        self.blend_run(dest, src, length, opacity);
    }
}
