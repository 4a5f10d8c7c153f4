//! Display descriptor (EDID base block)
//!
//! The bridge driver reads the 128-byte EDID base block from the sink.
//! [`DisplayDescriptor::parse`] extracts what mode selection needs:
//! identity, detailed timings, and standard timings.
//!
//! # Base block layout
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0      | 8    | Header `00 FF FF FF FF FF FF 00` |
//! | 8      | 2    | Manufacturer PNP id (big-endian, 3 x 5 bits) |
//! | 10     | 2    | Product code (little-endian) |
//! | 12     | 4    | Serial number (little-endian) |
//! | 18     | 2    | EDID version, revision |
//! | 38     | 16   | Standard timings (8 x 2 bytes) |
//! | 54     | 72   | Descriptors (4 x 18 bytes) |
//! | 127    | 1    | Checksum (all bytes sum to 0 mod 256) |

use heapless::{String, Vec};

use crate::timing::{DisplayMode, SyncPolarity};

/// Size of the EDID base block
pub const EDID_BLOCK_SIZE: usize = 128;

/// Maximum detailed timings in a base block
pub const MAX_DETAILED_TIMINGS: usize = 4;

/// Maximum advertised timings (detailed + standard)
pub const MAX_TIMINGS: usize = 12;

/// Maximum monitor name length
pub const MAX_NAME_LEN: usize = 13;

const HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
const STANDARD_TIMINGS: usize = 38;
const DESCRIPTORS: usize = 54;
const DESCRIPTOR_LEN: usize = 18;
const TAG_MONITOR_NAME: u8 = 0xFC;

/// Errors from descriptor parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdidError {
    /// Fixed header pattern missing
    InvalidHeader,
    /// Block checksum mismatch
    ChecksumMismatch,
}

/// A resolution and refresh rate the display advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupportedTiming {
    pub hactive: u16,
    pub vactive: u16,
    pub refresh_hz: u32,
}

impl From<&DisplayMode> for SupportedTiming {
    fn from(mode: &DisplayMode) -> Self {
        Self {
            hactive: mode.hactive,
            vactive: mode.vactive,
            refresh_hz: mode.refresh_hz(),
        }
    }
}

/// Parsed display descriptor
///
/// Timings are kept in advertisement order; the first one is the
/// display's preferred timing when the descriptor came from EDID.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayDescriptor {
    /// Three-letter PNP manufacturer id
    pub manufacturer: [u8; 3],
    /// Vendor product code
    pub product_code: u16,
    /// Serial number
    pub serial: u32,
    /// EDID version and revision
    pub version: (u8, u8),
    /// Monitor name, if advertised
    pub name: String<MAX_NAME_LEN>,
    /// Detailed timing descriptors
    pub detailed: Vec<DisplayMode, MAX_DETAILED_TIMINGS>,
    /// All advertised timings, preferred first
    pub timings: Vec<SupportedTiming, MAX_TIMINGS>,
}

impl DisplayDescriptor {
    /// Descriptor advertising the given timings, without identity data
    pub fn with_timings(timings: &[SupportedTiming]) -> Self {
        let mut descriptor = Self::default();
        for timing in timings.iter().take(MAX_TIMINGS) {
            let _ = descriptor.timings.push(*timing);
        }
        descriptor
    }

    /// Parse an EDID base block
    pub fn parse(block: &[u8; EDID_BLOCK_SIZE]) -> Result<Self, EdidError> {
        if block[..8] != HEADER {
            return Err(EdidError::InvalidHeader);
        }
        let sum = block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != 0 {
            return Err(EdidError::ChecksumMismatch);
        }

        let pnp = u16::from_be_bytes([block[8], block[9]]);
        let letter = |shift: u16| b'A' - 1 + ((pnp >> shift) & 0x1F) as u8;

        let mut descriptor = Self {
            manufacturer: [letter(10), letter(5), letter(0)],
            product_code: u16::from_le_bytes([block[10], block[11]]),
            serial: u32::from_le_bytes([block[12], block[13], block[14], block[15]]),
            version: (block[18], block[19]),
            ..Self::default()
        };

        for chunk in block[DESCRIPTORS..DESCRIPTORS + 4 * DESCRIPTOR_LEN].chunks_exact(DESCRIPTOR_LEN) {
            if chunk[0] != 0 || chunk[1] != 0 {
                let mode = parse_detailed_timing(chunk);
                let _ = descriptor.timings.push(SupportedTiming::from(&mode));
                let _ = descriptor.detailed.push(mode);
            } else if chunk[3] == TAG_MONITOR_NAME {
                descriptor.name = parse_text(&chunk[5..]);
            }
        }

        for pair in block[STANDARD_TIMINGS..DESCRIPTORS].chunks_exact(2) {
            if let Some(timing) = parse_standard_timing(pair[0], pair[1], descriptor.version) {
                let _ = descriptor.timings.push(timing);
            }
        }

        Ok(descriptor)
    }

    /// Check if the display advertises a mode's resolution and refresh rate
    pub fn supports(&self, mode: &DisplayMode) -> bool {
        let wanted = SupportedTiming::from(mode);
        self.timings.iter().any(|t| {
            t.hactive == wanted.hactive
                && t.vactive == wanted.vactive
                && t.refresh_hz.abs_diff(wanted.refresh_hz) <= 1
        })
    }

    /// The first advertised timing
    pub fn preferred(&self) -> Option<&SupportedTiming> {
        self.timings.first()
    }
}

fn parse_detailed_timing(d: &[u8]) -> DisplayMode {
    let pixel_clock_khz = u16::from_le_bytes([d[0], d[1]]) as u32 * 10;
    let hactive = d[2] as u16 | ((d[4] as u16 & 0xF0) << 4);
    let hblank = d[3] as u16 | ((d[4] as u16 & 0x0F) << 8);
    let vactive = d[5] as u16 | ((d[7] as u16 & 0xF0) << 4);
    let vblank = d[6] as u16 | ((d[7] as u16 & 0x0F) << 8);
    let hfront_porch = d[8] as u16 | ((d[11] as u16 & 0xC0) << 2);
    let hsync_len = d[9] as u16 | ((d[11] as u16 & 0x30) << 4);
    let vfront_porch = (d[10] as u16 >> 4) | ((d[11] as u16 & 0x0C) << 2);
    let vsync_len = (d[10] as u16 & 0x0F) | ((d[11] as u16 & 0x03) << 4);

    // Digital separate sync carries explicit polarities in bits 2 and 1
    let flags = d[17];
    let (hsync_polarity, vsync_polarity) = if flags & 0x18 == 0x18 {
        (polarity(flags & 0x02 != 0), polarity(flags & 0x04 != 0))
    } else {
        (SyncPolarity::Negative, SyncPolarity::Negative)
    };

    DisplayMode {
        pixel_clock_khz,
        hactive,
        hfront_porch,
        hsync_len,
        hback_porch: hblank.saturating_sub(hfront_porch + hsync_len),
        vactive,
        vfront_porch,
        vsync_len,
        vback_porch: vblank.saturating_sub(vfront_porch + vsync_len),
        hsync_polarity,
        vsync_polarity,
    }
}

fn polarity(positive: bool) -> SyncPolarity {
    if positive {
        SyncPolarity::Positive
    } else {
        SyncPolarity::Negative
    }
}

fn parse_standard_timing(b0: u8, b1: u8, version: (u8, u8)) -> Option<SupportedTiming> {
    if (b0 == 0x01 && b1 == 0x01) || b0 == 0x00 {
        return None;
    }
    let hactive = (b0 as u16 + 31) * 8;
    let vactive = match b1 >> 6 {
        // 16:10, but 1:1 before EDID 1.3
        0 if version < (1, 3) => hactive,
        0 => hactive * 10 / 16,
        1 => hactive * 3 / 4,
        2 => hactive * 4 / 5,
        _ => hactive * 9 / 16,
    };
    Some(SupportedTiming {
        hactive,
        vactive,
        refresh_hz: (b1 & 0x3F) as u32 + 60,
    })
}

fn parse_text(bytes: &[u8]) -> String<MAX_NAME_LEN> {
    let mut text = String::new();
    for &b in bytes.iter().take_while(|&&b| b != 0x0A) {
        if b.is_ascii_graphic() || b == b' ' {
            let _ = text.push(b as char);
        }
    }
    while text.ends_with(' ') {
        text.pop();
    }
    text
}
