//! Graphics library contract
//!
//! The retained-mode graphics library owns the render loop. The core hands
//! it a [`DriverRecord`] once, then the library calls back into a
//! [`DisplayCallbacks`] implementation for every dirty region.
//!
//! Older library majors register displays with a different record shape;
//! see [`crate::legacy`] for the translation.

use crate::pixel::{Area, Rgb565};

/// Graphics library version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LibraryVersion {
    pub major: u8,
    pub minor: u8,
}

impl LibraryVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// Display rotation applied by the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

/// Accelerator callbacks the library binds
///
/// Flush is always bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Callbacks {
    /// Hardware fill bound
    pub fill: bool,
    /// Hardware blend bound
    pub blend: bool,
}

impl Callbacks {
    /// Callbacks a library version can bind
    ///
    /// - 7.x: fill and blend
    /// - 8.0: fill only
    /// - 8.1 and later: neither (the library draws through its own GPU layer)
    pub fn for_version(version: LibraryVersion) -> Self {
        match (version.major, version.minor) {
            (0..=7, _) => Self {
                fill: true,
                blend: true,
            },
            (8, 0) => Self {
                fill: true,
                blend: false,
            },
            _ => Self {
                fill: false,
                blend: false,
            },
        }
    }
}

/// Display driver registration record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverRecord {
    /// Horizontal resolution in pixels
    pub hor_res: u16,
    /// Vertical resolution in pixels
    pub ver_res: u16,
    /// Rotation the library applies
    pub rotation: Rotation,
    /// Rotate in software while rendering
    pub sw_rotate: bool,
    /// Redraw whole frames (double-buffered scan-out)
    pub full_refresh: bool,
    /// Size of the library's draw buffer in pixels
    pub draw_buffer_pixels: usize,
    /// Address of the frame buffer being scanned out
    pub framebuffer: usize,
    /// Bound accelerator callbacks
    pub callbacks: Callbacks,
}

/// Dirty region handed to a flush
#[derive(Debug, Clone, Copy)]
pub struct DirtyRegion<'a> {
    /// Screen area to update
    pub area: Area,
    /// Rendered pixels, `area.width() * area.height()` in row-major order
    pub pixels: &'a [Rgb565],
    /// This is the last flush of the current frame
    pub last_in_frame: bool,
}

/// Flush completion signal back to the library
pub trait FlushReady {
    /// The flushed pixel buffer may be reused
    fn flush_ready(&mut self);
}

/// Accelerator callbacks invoked from the library's render loop
pub trait DisplayCallbacks {
    /// Copy a dirty region to the frame buffer, then signal `ready`
    fn flush(&mut self, region: &DirtyRegion<'_>, ready: &mut dyn FlushReady);

    /// Fill `area` of a buffer `dest_width` pixels wide with `color`
    fn fill(&mut self, dest: &mut [Rgb565], dest_width: u16, area: &Area, color: Rgb565);

    /// Blend `length` pixels of `src` over `dest` at `opacity`
    fn blend(&mut self, dest: &mut [Rgb565], src: &[Rgb565], length: usize, opacity: u8);
}

/// Graphics library registration surface
pub trait GraphicsLibrary {
    /// Error type for rejected registrations
    type Error;

    /// Version of the library
    fn version(&self) -> LibraryVersion;

    /// Register a display driver
    fn register_display(&mut self, record: &DriverRecord) -> Result<(), Self::Error>;
}
