//! Video configuration
//!
//! Everything the bring-up sequence needs that is a board or product
//! choice rather than a hardware fact. Deserializable from the firmware's
//! TOML config when the `serde` feature is enabled:
//!
//! ```toml
//! link = 0
//! mode = { fixed = "720x480@60" }
//! buffering = "double"
//! orientation = "native"
//! hotplug_timeout_ms = 5000
//! transfer_timeout_ms = 1000
//! init_policy = { retry = { attempts = 3, backoff_ms = 200 } }
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::framebuffer::Buffering;
use crate::timing::ModeId;

/// Default bounded wait for a display to appear
pub const DEFAULT_HOTPLUG_TIMEOUT_MS: u32 = 5000;

/// Default interval between hot-plug polls
pub const DEFAULT_HOTPLUG_POLL_INTERVAL_MS: u32 = 10;

/// Default bounded wait for one blit transfer
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u32 = 1000;

/// Default draw buffer size as a fraction of a frame (1/6)
pub const DEFAULT_DRAW_BUFFER_DIVISOR: u8 = 6;

/// How the timing mode is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModeSelection {
    /// Use this table mode; the display must advertise it
    Fixed(ModeId),
    /// Use the first table mode the display advertises, preferred first
    Auto,
}

/// What to do when the bridge fails to initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InitPolicy {
    /// Report the first failure
    FailFast,
    /// Try `attempts` times in total, waiting `backoff_ms` between tries
    Retry { attempts: u8, backoff_ms: u32 },
}

impl InitPolicy {
    /// Total number of init attempts
    pub fn attempts(&self) -> u8 {
        match self {
            InitPolicy::FailFast => 1,
            InitPolicy::Retry { attempts, .. } => *attempts,
        }
    }

    /// Wait between attempts
    pub fn backoff_ms(&self) -> u32 {
        match self {
            InitPolicy::FailFast => 0,
            InitPolicy::Retry { backoff_ms, .. } => *backoff_ms,
        }
    }
}

/// Physical mounting of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation {
    /// Render in the panel's native orientation
    #[default]
    Native,
    /// Render rotated by 90 degrees in software
    Landscape,
}

/// Errors from configuration validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A timeout or poll interval is zero
    ZeroTimeout,
    /// Draw buffer divisor is zero
    ZeroDivisor,
    /// Retry policy without attempts
    NoAttempts,
}

/// Video subsystem configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VideoConfig {
    /// Bridge output to use
    pub link: u8,
    /// Timing mode selection
    pub mode: ModeSelection,
    /// Number of frame buffers
    pub buffering: Buffering,
    /// Panel orientation
    pub orientation: Orientation,
    /// Bounded wait for hot-plug detect
    pub hotplug_timeout_ms: u32,
    /// Interval between hot-plug polls
    pub hotplug_poll_interval_ms: u32,
    /// Bounded wait for each blit transfer
    pub transfer_timeout_ms: u32,
    /// Bridge init failure handling
    pub init_policy: InitPolicy,
    /// Draw buffer holds 1/`draw_buffer_divisor` of a frame
    pub draw_buffer_divisor: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            link: 0,
            mode: ModeSelection::Fixed(ModeId::Mode720x480At60),
            buffering: Buffering::Double,
            orientation: Orientation::Native,
            hotplug_timeout_ms: DEFAULT_HOTPLUG_TIMEOUT_MS,
            hotplug_poll_interval_ms: DEFAULT_HOTPLUG_POLL_INTERVAL_MS,
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
            init_policy: InitPolicy::FailFast,
            draw_buffer_divisor: DEFAULT_DRAW_BUFFER_DIVISOR,
        }
    }
}

impl VideoConfig {
    /// Check the configuration for values the bring-up cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hotplug_timeout_ms == 0
            || self.hotplug_poll_interval_ms == 0
            || self.transfer_timeout_ms == 0
        {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.draw_buffer_divisor == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        if self.init_policy.attempts() == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}
