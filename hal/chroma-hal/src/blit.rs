//! 2D blit engine abstractions
//!
//! Describes one engine operation as a typed [`Transfer`]: the mode, the
//! output layer and the input layers it reads. A transfer must pass
//! [`Transfer::validate`] before an engine accepts it, which keeps register
//! layout concerns inside the chip crate.
//!
//! # Modes
//!
//! - Memory to memory: copy the foreground layer to the output
//! - Memory to memory with blending: mix foreground over background
//! - Register to memory: paint the output with a constant color

use crate::memory::MemoryRegion;

/// Largest pixels-per-line value the engine accepts (14-bit field)
pub const MAX_PIXELS_PER_LINE: u16 = 0x3FFF;

/// Largest line count the engine accepts (16-bit field)
pub const MAX_LINES: u16 = 0xFFFF;

/// Largest line offset in pixels (14-bit field)
pub const MAX_LINE_OFFSET: u16 = 0x3FFF;

/// Pixel color formats understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorFormat {
    /// 32-bit ARGB
    Argb8888,
    /// 24-bit RGB
    Rgb888,
    /// 16-bit 5-6-5 packed RGB
    Rgb565,
}

impl ColorFormat {
    /// Size of one pixel in bytes
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorFormat::Argb8888 => 4,
            ColorFormat::Rgb888 => 3,
            ColorFormat::Rgb565 => 2,
        }
    }
}

/// How the engine derives a layer's alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlphaMode {
    /// Keep the alpha of the pixel data
    NoModify,
    /// Replace it with the layer's constant alpha
    Replace,
    /// Multiply it with the layer's constant alpha
    Multiply,
}

/// Engine operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlitMode {
    /// Copy the foreground layer to the output
    MemoryToMemory,
    /// Blend the foreground layer over the background layer
    MemoryToMemoryBlend,
    /// Fill the output with a constant color
    RegisterToMemory,
}

/// Input layer configuration (foreground or background)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerConfig {
    /// Address of the first pixel
    pub address: usize,
    /// Pixel format of the layer
    pub format: ColorFormat,
    /// Pixels skipped at the end of each line
    pub line_offset: u16,
    /// Alpha derivation
    pub alpha_mode: AlphaMode,
    /// Constant alpha used by `Replace` and `Multiply`
    pub alpha: u8,
    /// Invert the alpha channel
    pub alpha_inverted: bool,
    /// Swap red and blue channels
    pub red_blue_swap: bool,
}

impl LayerConfig {
    /// Opaque RGB565 layer with no line offset
    pub const fn rgb565(address: usize) -> Self {
        Self {
            address,
            format: ColorFormat::Rgb565,
            line_offset: 0,
            alpha_mode: AlphaMode::NoModify,
            alpha: 0xFF,
            alpha_inverted: false,
            red_blue_swap: false,
        }
    }

    /// Set the line offset in pixels
    pub const fn with_line_offset(mut self, line_offset: u16) -> Self {
        self.line_offset = line_offset;
        self
    }

    /// Set alpha derivation and constant alpha
    pub const fn with_alpha(mut self, mode: AlphaMode, alpha: u8) -> Self {
        self.alpha_mode = mode;
        self.alpha = alpha;
        self
    }
}

/// Output layer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputConfig {
    /// Address of the first output pixel
    pub address: usize,
    /// Pixel format written
    pub format: ColorFormat,
    /// Pixels skipped at the end of each line
    pub line_offset: u16,
    /// Invert the alpha channel
    pub alpha_inverted: bool,
    /// Swap red and blue channels
    pub red_blue_swap: bool,
}

impl OutputConfig {
    /// RGB565 output, regular alpha, no channel swap
    pub const fn rgb565(address: usize) -> Self {
        Self {
            address,
            format: ColorFormat::Rgb565,
            line_offset: 0,
            alpha_inverted: false,
            red_blue_swap: false,
        }
    }

    /// Set the line offset in pixels
    pub const fn with_line_offset(mut self, line_offset: u16) -> Self {
        self.line_offset = line_offset;
        self
    }
}

/// Errors from transfer validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// Zero pixels per line or zero lines
    EmptyArea,
    /// Pixels per line exceed [`MAX_PIXELS_PER_LINE`]
    LineTooLong,
    /// Line offset exceeds [`MAX_LINE_OFFSET`]
    OffsetTooLarge,
    /// The mode needs a layer that is not configured
    MissingLayer,
    /// A layer is configured that the mode does not read
    UnexpectedLayer,
    /// Address not aligned to the pixel size
    Misaligned,
    /// Copy between different pixel formats
    FormatMismatch,
}

/// One engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    /// Operating mode
    pub mode: BlitMode,
    /// Output layer
    pub output: OutputConfig,
    /// Foreground layer (copy source, blend top)
    pub foreground: Option<LayerConfig>,
    /// Background layer (blend bottom)
    pub background: Option<LayerConfig>,
    /// Fill color in the output format (register-to-memory only)
    pub color: u32,
    /// Width of the area in pixels
    pub pixels_per_line: u16,
    /// Height of the area in lines
    pub lines: u16,
}

impl Transfer {
    /// Copy `source` to `output`
    pub const fn copy(
        source: LayerConfig,
        output: OutputConfig,
        pixels_per_line: u16,
        lines: u16,
    ) -> Self {
        Self {
            mode: BlitMode::MemoryToMemory,
            output,
            foreground: Some(source),
            background: None,
            color: 0,
            pixels_per_line,
            lines,
        }
    }

    /// Paint `output` with `color` (given in the output format)
    pub const fn fill(color: u32, output: OutputConfig, pixels_per_line: u16, lines: u16) -> Self {
        Self {
            mode: BlitMode::RegisterToMemory,
            output,
            foreground: None,
            background: None,
            color,
            pixels_per_line,
            lines,
        }
    }

    /// Blend `foreground` over `background` into `output`
    pub const fn blend(
        foreground: LayerConfig,
        background: LayerConfig,
        output: OutputConfig,
        pixels_per_line: u16,
        lines: u16,
    ) -> Self {
        Self {
            mode: BlitMode::MemoryToMemoryBlend,
            output,
            foreground: Some(foreground),
            background: Some(background),
            color: 0,
            pixels_per_line,
            lines,
        }
    }

    /// Check the transfer against the engine's limits
    ///
    /// Returns a [`CheckedTransfer`] that engines accept.
    pub fn validate(self) -> Result<CheckedTransfer, TransferError> {
        if self.pixels_per_line == 0 || self.lines == 0 {
            return Err(TransferError::EmptyArea);
        }
        if self.pixels_per_line > MAX_PIXELS_PER_LINE {
            return Err(TransferError::LineTooLong);
        }
        if self.output.line_offset > MAX_LINE_OFFSET {
            return Err(TransferError::OffsetTooLarge);
        }
        if self.output.address % self.output.format.bytes_per_pixel() != 0 {
            return Err(TransferError::Misaligned);
        }

        match self.mode {
            BlitMode::MemoryToMemory => {
                let fg = self.foreground.ok_or(TransferError::MissingLayer)?;
                if self.background.is_some() {
                    return Err(TransferError::UnexpectedLayer);
                }
                if fg.format != self.output.format {
                    return Err(TransferError::FormatMismatch);
                }
                check_layer(&fg)?;
            }
            BlitMode::MemoryToMemoryBlend => {
                let fg = self.foreground.ok_or(TransferError::MissingLayer)?;
                let bg = self.background.ok_or(TransferError::MissingLayer)?;
                check_layer(&fg)?;
                check_layer(&bg)?;
            }
            BlitMode::RegisterToMemory => {
                if self.foreground.is_some() || self.background.is_some() {
                    return Err(TransferError::UnexpectedLayer);
                }
            }
        }

        Ok(CheckedTransfer(self))
    }

    /// Memory the engine writes
    pub fn output_region(&self) -> MemoryRegion {
        footprint(
            self.output.address,
            self.output.format,
            self.output.line_offset,
            self.pixels_per_line,
            self.lines,
        )
    }

    /// Memory the engine reads (foreground, background)
    pub fn input_regions(&self) -> [Option<MemoryRegion>; 2] {
        let region = |layer: &LayerConfig| {
            footprint(
                layer.address,
                layer.format,
                layer.line_offset,
                self.pixels_per_line,
                self.lines,
            )
        };
        [
            self.foreground.as_ref().map(region),
            self.background.as_ref().map(region),
        ]
    }
}

fn check_layer(layer: &LayerConfig) -> Result<(), TransferError> {
    if layer.line_offset > MAX_LINE_OFFSET {
        return Err(TransferError::OffsetTooLarge);
    }
    if layer.address % layer.format.bytes_per_pixel() != 0 {
        return Err(TransferError::Misaligned);
    }
    Ok(())
}

/// Bytes touched by `lines` lines of `pixels_per_line` pixels with a stride gap
///
/// The gap after the last line is not part of the footprint.
pub fn footprint(
    address: usize,
    format: ColorFormat,
    line_offset: u16,
    pixels_per_line: u16,
    lines: u16,
) -> MemoryRegion {
    if pixels_per_line == 0 || lines == 0 {
        return MemoryRegion::new(address, 0);
    }
    let stride = pixels_per_line as usize + line_offset as usize;
    let pixels = (lines as usize - 1) * stride + pixels_per_line as usize;
    MemoryRegion::new(address, pixels * format.bytes_per_pixel())
}

/// A transfer that passed [`Transfer::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CheckedTransfer(Transfer);

impl CheckedTransfer {
    /// The validated transfer
    pub fn get(&self) -> &Transfer {
        &self.0
    }
}

/// Engine progress as seen by a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// Transfer still running
    Busy,
    /// Transfer complete flag set
    Complete,
    /// Transfer or configuration error flag set
    Error,
}

/// 2D blit engine
///
/// One transfer at a time. The caller starts a transfer, then polls
/// [`BlitEngine::status`] until it leaves `Busy`. There is no abort.
pub trait BlitEngine {
    /// Error type for start failures
    type Error;

    /// Program the engine registers for `transfer` and start it
    fn start(&mut self, transfer: &CheckedTransfer) -> Result<(), Self::Error>;

    /// Read the engine status, acknowledging completion flags
    fn status(&mut self) -> TransferStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_validation() {
        let transfer = Transfer::copy(
            LayerConfig::rgb565(0x1000),
            OutputConfig::rgb565(0x2000).with_line_offset(700),
            20,
            10,
        );
        assert!(transfer.validate().is_ok());

        let empty = Transfer::copy(LayerConfig::rgb565(0x1000), OutputConfig::rgb565(0x2000), 0, 10);
        assert_eq!(empty.validate(), Err(TransferError::EmptyArea));

        let long = Transfer::copy(
            LayerConfig::rgb565(0x1000),
            OutputConfig::rgb565(0x2000),
            MAX_PIXELS_PER_LINE + 1,
            1,
        );
        assert_eq!(long.validate(), Err(TransferError::LineTooLong));
    }

    #[test]
    fn test_misaligned_addresses() {
        let transfer = Transfer::copy(LayerConfig::rgb565(0x1001), OutputConfig::rgb565(0x2000), 4, 4);
        assert_eq!(transfer.validate(), Err(TransferError::Misaligned));

        let transfer = Transfer::fill(0, OutputConfig::rgb565(0x2003), 4, 4);
        assert_eq!(transfer.validate(), Err(TransferError::Misaligned));
    }

    #[test]
    fn test_layer_requirements() {
        let mut transfer = Transfer::fill(0xF800, OutputConfig::rgb565(0x2000), 4, 4);
        assert!(transfer.validate().is_ok());

        transfer.foreground = Some(LayerConfig::rgb565(0x1000));
        assert_eq!(transfer.validate(), Err(TransferError::UnexpectedLayer));

        let mut blend = Transfer::blend(
            LayerConfig::rgb565(0x1000).with_alpha(AlphaMode::Replace, 0x80),
            LayerConfig::rgb565(0x2000),
            OutputConfig::rgb565(0x2000),
            16,
            1,
        );
        assert!(blend.validate().is_ok());

        blend.background = None;
        assert_eq!(blend.validate(), Err(TransferError::MissingLayer));
    }

    #[test]
    fn test_copy_rejects_format_conversion() {
        let mut source = LayerConfig::rgb565(0x1000);
        source.format = ColorFormat::Argb8888;
        let transfer = Transfer::copy(source, OutputConfig::rgb565(0x2000), 4, 4);
        assert_eq!(transfer.validate(), Err(TransferError::FormatMismatch));
    }

    #[test]
    fn test_footprint() {
        // 10x3 area inside a 100 pixel wide RGB565 buffer
        let region = footprint(0x1000, ColorFormat::Rgb565, 90, 10, 3);
        assert_eq!(region.base, 0x1000);
        assert_eq!(region.len, (2 * 100 + 10) * 2);

        let single_line = footprint(0x1000, ColorFormat::Rgb565, 0, 64, 1);
        assert_eq!(single_line.len, 128);

        assert!(footprint(0x1000, ColorFormat::Rgb565, 0, 0, 4).is_empty());
    }

    #[test]
    fn test_transfer_regions() {
        let transfer = Transfer::blend(
            LayerConfig::rgb565(0x1000),
            LayerConfig::rgb565(0x3000),
            OutputConfig::rgb565(0x3000),
            8,
            1,
        );
        let [fg, bg] = transfer.input_regions();
        assert_eq!(fg, Some(MemoryRegion::new(0x1000, 16)));
        assert_eq!(bg, Some(MemoryRegion::new(0x3000, 16)));
        assert_eq!(transfer.output_region(), MemoryRegion::new(0x3000, 16));

        let fill = Transfer::fill(0, OutputConfig::rgb565(0x2000), 8, 2);
        assert_eq!(fill.input_regions(), [None, None]);
    }
}
