//! Display timing modes
//!
//! A [`DisplayMode`] carries the full video timing the serial display
//! interface is programmed with. Known modes live in a static
//! [`TimingTable`] keyed by [`ModeId`].
//!
//! # Line layout
//!
//! ```text
//! |<- sync ->|<- back porch ->|<------ active ------>|<- front porch ->|
//! |<------------------------------ total ------------------------------>|
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowest refresh rate accepted for a mode (Hz)
pub const MIN_REFRESH_HZ: u32 = 24;

/// Highest refresh rate accepted for a mode (Hz)
pub const MAX_REFRESH_HZ: u32 = 120;

/// Sync pulse polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncPolarity {
    /// Active-high pulse
    Positive,
    /// Active-low pulse
    Negative,
}

/// Limits of the interface a mode is programmed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceLimits {
    /// Highest pixel clock in kHz
    pub max_pixel_clock_khz: u32,
    /// Largest total line length in pixels
    pub max_htotal: u32,
    /// Largest total frame height in lines
    pub max_vtotal: u32,
}

impl Default for InterfaceLimits {
    fn default() -> Self {
        // LTDC timing registers: 12-bit horizontal, 11-bit vertical accumulators
        Self {
            max_pixel_clock_khz: 150_000,
            max_htotal: 4096,
            max_vtotal: 2048,
        }
    }
}

/// Errors from mode validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeError {
    /// A timing field is zero
    ZeroField,
    /// Active + porches + sync exceed the interface's line or frame period
    TotalTooLarge,
    /// Pixel clock above the interface limit
    PixelClockTooHigh,
    /// Resulting refresh rate outside the supported range
    RefreshOutOfRange,
}

/// Full video timing of one display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMode {
    /// Pixel clock in kHz
    pub pixel_clock_khz: u32,
    /// Visible pixels per line
    pub hactive: u16,
    /// Pixels between active area and sync pulse
    pub hfront_porch: u16,
    /// Horizontal sync pulse width
    pub hsync_len: u16,
    /// Pixels between sync pulse and active area
    pub hback_porch: u16,
    /// Visible lines per frame
    pub vactive: u16,
    /// Lines between active area and sync pulse
    pub vfront_porch: u16,
    /// Vertical sync pulse width
    pub vsync_len: u16,
    /// Lines between sync pulse and active area
    pub vback_porch: u16,
    /// Horizontal sync polarity
    pub hsync_polarity: SyncPolarity,
    /// Vertical sync polarity
    pub vsync_polarity: SyncPolarity,
}

impl DisplayMode {
    /// Total line length in pixel clocks
    pub const fn htotal(&self) -> u32 {
        self.hactive as u32 + self.hfront_porch as u32 + self.hsync_len as u32 + self.hback_porch as u32
    }

    /// Total frame height in lines
    pub const fn vtotal(&self) -> u32 {
        self.vactive as u32 + self.vfront_porch as u32 + self.vsync_len as u32 + self.vback_porch as u32
    }

    /// Refresh rate in millihertz
    pub const fn refresh_mhz(&self) -> u32 {
        let frame = self.htotal() as u64 * self.vtotal() as u64;
        if frame == 0 {
            return 0;
        }
        (self.pixel_clock_khz as u64 * 1_000_000 / frame) as u32
    }

    /// Refresh rate rounded to whole hertz
    pub const fn refresh_hz(&self) -> u32 {
        (self.refresh_mhz() + 500) / 1000
    }

    /// Check the mode against the default interface limits
    pub fn validate(&self) -> Result<(), ModeError> {
        self.validate_against(&InterfaceLimits::default())
    }

    /// Check the mode against the limits of a specific interface
    pub fn validate_against(&self, limits: &InterfaceLimits) -> Result<(), ModeError> {
        let fields = [
            self.hactive,
            self.hfront_porch,
            self.hsync_len,
            self.hback_porch,
            self.vactive,
            self.vfront_porch,
            self.vsync_len,
            self.vback_porch,
        ];
        if self.pixel_clock_khz == 0 || fields.contains(&0) {
            return Err(ModeError::ZeroField);
        }
        if self.htotal() > limits.max_htotal || self.vtotal() > limits.max_vtotal {
            return Err(ModeError::TotalTooLarge);
        }
        if self.pixel_clock_khz > limits.max_pixel_clock_khz {
            return Err(ModeError::PixelClockTooHigh);
        }
        let refresh = self.refresh_hz();
        if !(MIN_REFRESH_HZ..=MAX_REFRESH_HZ).contains(&refresh) {
            return Err(ModeError::RefreshOutOfRange);
        }
        Ok(())
    }
}

/// Identifier of a known timing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModeId {
    /// 480x800 portrait DSI panel (GIGA display shield)
    #[cfg_attr(feature = "serde", serde(rename = "480x800@60"))]
    Mode480x800At60,
    /// VGA
    #[cfg_attr(feature = "serde", serde(rename = "640x480@60"))]
    Mode640x480At60,
    /// CEA-861 480p
    #[cfg_attr(feature = "serde", serde(rename = "720x480@60"))]
    Mode720x480At60,
    /// SVGA
    #[cfg_attr(feature = "serde", serde(rename = "800x600@60"))]
    Mode800x600At60,
    /// XGA
    #[cfg_attr(feature = "serde", serde(rename = "1024x768@60"))]
    Mode1024x768At60,
    /// CEA-861 720p
    #[cfg_attr(feature = "serde", serde(rename = "1280x720@60"))]
    Mode1280x720At60,
}

/// One row of a timing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingEntry {
    pub id: ModeId,
    pub mode: DisplayMode,
}

/// Static lookup of known modes
#[derive(Debug, Clone, Copy)]
pub struct TimingTable<'a> {
    entries: &'a [TimingEntry],
}

impl<'a> TimingTable<'a> {
    /// Wrap a list of entries
    pub const fn new(entries: &'a [TimingEntry]) -> Self {
        Self { entries }
    }

    /// Look up a mode by identifier
    pub fn get(&self, id: ModeId) -> Option<&'a DisplayMode> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.mode)
    }

    /// Find the first entry with the given resolution and refresh rate
    pub fn find(&self, hactive: u16, vactive: u16, refresh_hz: u32) -> Option<&'a TimingEntry> {
        self.entries.iter().find(|e| {
            e.mode.hactive == hactive
                && e.mode.vactive == vactive
                && e.mode.refresh_hz().abs_diff(refresh_hz) <= 1
        })
    }

    /// All entries in table order
    pub fn entries(&self) -> &'a [TimingEntry] {
        self.entries
    }
}

impl Default for TimingTable<'static> {
    fn default() -> Self {
        Self::new(KNOWN_MODES)
    }
}

const fn mode(
    pixel_clock_khz: u32,
    h: [u16; 4],
    v: [u16; 4],
    hsync_polarity: SyncPolarity,
    vsync_polarity: SyncPolarity,
) -> DisplayMode {
    // h / v: active, front porch, sync, back porch
    DisplayMode {
        pixel_clock_khz,
        hactive: h[0],
        hfront_porch: h[1],
        hsync_len: h[2],
        hback_porch: h[3],
        vactive: v[0],
        vfront_porch: v[1],
        vsync_len: v[2],
        vback_porch: v[3],
        hsync_polarity,
        vsync_polarity,
    }
}

use SyncPolarity::{Negative, Positive};

/// Modes supported out of the box
pub static KNOWN_MODES: &[TimingEntry] = &[
    TimingEntry {
        id: ModeId::Mode480x800At60,
        mode: mode(28_000, [480, 16, 8, 20], [800, 40, 10, 40], Negative, Negative),
    },
    TimingEntry {
        id: ModeId::Mode640x480At60,
        mode: mode(25_175, [640, 16, 96, 48], [480, 10, 2, 33], Negative, Negative),
    },
    TimingEntry {
        id: ModeId::Mode720x480At60,
        mode: mode(27_000, [720, 16, 62, 60], [480, 9, 6, 30], Negative, Negative),
    },
    TimingEntry {
        id: ModeId::Mode800x600At60,
        mode: mode(40_000, [800, 40, 128, 88], [600, 1, 4, 23], Positive, Positive),
    },
    TimingEntry {
        id: ModeId::Mode1024x768At60,
        mode: mode(65_000, [1024, 24, 136, 160], [768, 3, 6, 29], Negative, Negative),
    },
    TimingEntry {
        id: ModeId::Mode1280x720At60,
        mode: mode(74_250, [1280, 110, 40, 220], [720, 5, 5, 20], Positive, Positive),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_modes_are_valid() {
        for entry in KNOWN_MODES {
            assert_eq!(entry.mode.validate(), Ok(()), "{:?}", entry.id);
            assert_eq!(entry.mode.refresh_hz(), 60, "{:?}", entry.id);
        }
    }

    #[test]
    fn test_totals() {
        let table = TimingTable::default();
        let mode = table.get(ModeId::Mode720x480At60).unwrap();
        assert_eq!(mode.htotal(), 858);
        assert_eq!(mode.vtotal(), 525);
        // 27 MHz / (858 * 525) = 59.94 Hz
        assert_eq!(mode.refresh_mhz(), 59_940);
    }

    #[test]
    fn test_zero_field_rejected() {
        let mut mode = *TimingTable::default().get(ModeId::Mode640x480At60).unwrap();
        mode.hsync_len = 0;
        assert_eq!(mode.validate(), Err(ModeError::ZeroField));
    }

    #[test]
    fn test_interface_limits() {
        let mode = *TimingTable::default().get(ModeId::Mode1280x720At60).unwrap();
        let small = InterfaceLimits {
            max_pixel_clock_khz: 50_000,
            ..InterfaceLimits::default()
        };
        assert_eq!(mode.validate_against(&small), Err(ModeError::PixelClockTooHigh));

        let short = InterfaceLimits {
            max_htotal: 1280,
            ..InterfaceLimits::default()
        };
        assert_eq!(mode.validate_against(&short), Err(ModeError::TotalTooLarge));
    }

    #[test]
    fn test_refresh_range() {
        let mut mode = *TimingTable::default().get(ModeId::Mode640x480At60).unwrap();
        mode.pixel_clock_khz = 5_000; // ~12 Hz
        assert_eq!(mode.validate(), Err(ModeError::RefreshOutOfRange));
    }

    #[test]
    fn test_find_by_resolution() {
        let table = TimingTable::default();
        assert_eq!(
            table.find(720, 480, 60).map(|e| e.id),
            Some(ModeId::Mode720x480At60)
        );
        assert_eq!(
            table.find(720, 480, 59).map(|e| e.id),
            Some(ModeId::Mode720x480At60)
        );
        assert!(table.find(720, 480, 75).is_none());
        assert!(table.find(1920, 1080, 60).is_none());
    }
}
