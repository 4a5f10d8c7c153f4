//! Registration with 7.x graphics libraries
//!
//! The 7.x display driver object carries the draw buffer and the two
//! accelerator hooks, but no rotation or full-refresh settings. The core
//! always builds a [`DriverRecord`]; [`Legacy`] wraps a 7.x library so it
//! accepts one, translating through [`translate`].

use crate::traits::{DriverRecord, GraphicsLibrary, LibraryVersion};

/// Display driver record in the 7.x shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LegacyDriverRecord {
    pub hor_res: u16,
    pub ver_res: u16,
    /// Size of the draw buffer in pixels
    pub draw_buffer_pixels: usize,
    /// Frame buffer being scanned out
    pub framebuffer: usize,
    /// `gpu_fill_cb` bound
    pub gpu_fill: bool,
    /// `gpu_blend_cb` bound
    pub gpu_blend: bool,
}

/// A 7.x graphics library
pub trait LegacyGraphicsLibrary {
    type Error;

    fn version(&self) -> LibraryVersion;

    fn register_driver(&mut self, record: &LegacyDriverRecord) -> Result<(), Self::Error>;
}

/// Convert the internal record into the 7.x shape
///
/// Rotation, software rotation and full refresh have no 7.x equivalent and
/// are dropped.
pub fn translate(record: &DriverRecord) -> LegacyDriverRecord {
    LegacyDriverRecord {
        hor_res: record.hor_res,
        ver_res: record.ver_res,
        draw_buffer_pixels: record.draw_buffer_pixels,
        framebuffer: record.framebuffer,
        gpu_fill: record.callbacks.fill,
        gpu_blend: record.callbacks.blend,
    }
}

/// Adapts a [`LegacyGraphicsLibrary`] to [`GraphicsLibrary`]
#[derive(Debug)]
pub struct Legacy<L>(L);

impl<L: LegacyGraphicsLibrary> Legacy<L> {
    pub fn new(library: L) -> Self {
        Self(library)
    }

    pub fn into_inner(self) -> L {
        self.0
    }
}

impl<L: LegacyGraphicsLibrary> GraphicsLibrary for Legacy<L> {
    type Error = L::Error;

    fn version(&self) -> LibraryVersion {
        self.0.version()
    }

    fn register_display(&mut self, record: &DriverRecord) -> Result<(), Self::Error> {
        self.0.register_driver(&translate(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLegacyLibrary;
    use crate::traits::{Callbacks, Rotation};

    #[test]
    fn test_translate() {
        let record = DriverRecord {
            hor_res: 480,
            ver_res: 800,
            rotation: Rotation::Deg90,
            sw_rotate: true,
            full_refresh: true,
            draw_buffer_pixels: 64_000,
            framebuffer: 0xC000_0000,
            callbacks: Callbacks::for_version(LibraryVersion::new(7, 11)),
        };

        let legacy = translate(&record);
        assert_eq!(legacy.hor_res, 480);
        assert_eq!(legacy.ver_res, 800);
        assert_eq!(legacy.draw_buffer_pixels, 64_000);
        assert_eq!(legacy.framebuffer, 0xC000_0000);
        assert!(legacy.gpu_fill);
        assert!(legacy.gpu_blend);
    }

    #[test]
    fn test_adapter_forwards() {
        let mut library = Legacy::new(MockLegacyLibrary::new(11));
        assert_eq!(library.version(), LibraryVersion::new(7, 11));

        let record = DriverRecord {
            hor_res: 720,
            ver_res: 480,
            rotation: Rotation::None,
            sw_rotate: false,
            full_refresh: false,
            draw_buffer_pixels: 57_600,
            framebuffer: 0xC000_0000,
            callbacks: Callbacks::for_version(library.version()),
        };
        library.register_display(&record).unwrap();

        let inner = library.into_inner();
        assert_eq!(inner.registered.len(), 1);
        assert_eq!(inner.registered[0], translate(&record));
    }
}
