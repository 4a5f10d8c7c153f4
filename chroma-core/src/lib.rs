//! Board-agnostic video core
//!
//! Brings an external display up and accelerates a retained-mode graphics
//! library with a 2D blit engine:
//!
//! - Display negotiation through a bridge transceiver, or a fixed panel mode
//! - EDID parsing and a static timing table
//! - Frame buffer allocation in external memory, scan-out switching on
//!   completed frames
//! - Blit adapter (copy, fill, blend) with cache maintenance and bounded waits
//! - Driver registration for current and 7.x library API shapes
//! - Configuration type definitions
//!
//! Hardware is reached only through the `chroma-hal` traits and the device
//! traits in [`traits`].

#![no_std]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod blit;
pub mod bringup;
pub mod cache;
pub mod config;
pub mod driver;
pub mod edid;
pub mod framebuffer;
pub mod legacy;
pub mod negotiate;
pub mod pixel;
pub mod timing;
pub mod traits;

#[cfg(test)]
mod testing;

pub use blit::{BlitAdapter, BlitError, TransferOutcome, TransferStats};
pub use bringup::{bring_up, InitError};
pub use config::VideoConfig;
pub use driver::{DisplayDriver, RegistrationError};
pub use negotiate::{DirectPanel, DisplayLink, NegotiationError, Negotiator};
pub use pixel::{Area, Rgb565};
pub use timing::{DisplayMode, ModeId, TimingTable};
