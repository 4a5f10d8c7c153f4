//! Pixel and area types
//!
//! The whole pipeline runs in a single pixel format: 16-bit RGB565.
//! Areas use inclusive corner coordinates, as the graphics library
//! reports dirty rectangles.

use embedded_graphics_core::pixelcolor::raw::RawU16;
use embedded_graphics_core::pixelcolor::{self, IntoStorage};
use embedded_graphics_core::primitives::Rectangle;

/// Size of one pixel in bytes
pub const BYTES_PER_PIXEL: usize = core::mem::size_of::<Rgb565>();

/// 16-bit 5-6-5 packed color, laid out exactly as the engine reads it
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);

    /// Pack 5-bit red, 6-bit green and 5-bit blue channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self((((r & 0x1F) as u16) << 11) | (((g & 0x3F) as u16) << 5) | (b & 0x1F) as u16)
    }

    /// Truncate 8-bit channels to RGB565
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        Self::new(r >> 3, g >> 2, b >> 3)
    }

    /// 5-bit red channel
    pub const fn r(self) -> u8 {
        (self.0 >> 11) as u8 & 0x1F
    }

    /// 6-bit green channel
    pub const fn g(self) -> u8 {
        (self.0 >> 5) as u8 & 0x3F
    }

    /// 5-bit blue channel
    pub const fn b(self) -> u8 {
        self.0 as u8 & 0x1F
    }
}

impl From<pixelcolor::Rgb565> for Rgb565 {
    fn from(color: pixelcolor::Rgb565) -> Self {
        Self(color.into_storage())
    }
}

impl From<Rgb565> for pixelcolor::Rgb565 {
    fn from(color: Rgb565) -> Self {
        RawU16::new(color.0).into()
    }
}

/// Rectangle with inclusive corners `(x1, y1)` and `(x2, y2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Area {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

/// Errors converting foreign rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AreaError {
    /// A corner does not fit the 16-bit coordinate range
    OutOfRange,
}

impl Area {
    /// Create an area from inclusive corners
    pub const fn new(x1: i16, y1: i16, x2: i16, y2: i16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Area covering `width` x `height` pixels from the origin
    ///
    /// Sizes past the coordinate range are clamped to it.
    pub const fn of_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, last_index(width), last_index(height))
    }

    /// Width in pixels (zero or negative when empty)
    pub const fn width(&self) -> i32 {
        self.x2 as i32 - self.x1 as i32 + 1
    }

    /// Height in pixels (zero or negative when empty)
    pub const fn height(&self) -> i32 {
        self.y2 as i32 - self.y1 as i32 + 1
    }

    /// Check if the area covers no pixel
    pub const fn is_empty(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// Number of pixels covered
    pub fn pixel_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width() as usize * self.height() as usize
        }
    }

    /// Overlap of two areas, if any
    pub fn intersect(&self, other: &Area) -> Option<Area> {
        let area = Area::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        (!area.is_empty()).then_some(area)
    }

    /// Check if `other` lies entirely inside this area
    pub fn contains(&self, other: &Area) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }
}

impl TryFrom<Rectangle> for Area {
    type Error = AreaError;

    fn try_from(rect: Rectangle) -> Result<Self, Self::Error> {
        let coord = |v: i64| i16::try_from(v).map_err(|_| AreaError::OutOfRange);
        let x1 = rect.top_left.x as i64;
        let y1 = rect.top_left.y as i64;
        Ok(Area::new(
            coord(x1)?,
            coord(y1)?,
            coord(x1 + rect.size.width as i64 - 1)?,
            coord(y1 + rect.size.height as i64 - 1)?,
        ))
    }
}

/// Last coordinate of a run of `n` pixels starting at zero
const fn last_index(n: u16) -> i16 {
    if n > i16::MAX as u16 {
        i16::MAX
    } else {
        n as i16 - 1
    }
}
