//! Chroma Hardware Abstraction Layer
//!
//! This crate defines the peripheral traits the video core drives. Chip
//! specific crates (STM32H7, ...) implement them, so the same bring-up and
//! acceleration logic runs on any part with a 2D blit engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  chroma-core (negotiation, blit, ...)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  chroma-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  chroma-hal-  │
//!             │    stm32h7    │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`blit::BlitEngine`] - 2D copy/fill/blend engine (DMA2D)
//! - [`cache::DataCache`] - Data cache maintenance by address
//! - [`memory::ExternalMemory`] - External SDRAM bring-up

#![no_std]
#![deny(unsafe_code)]

pub mod blit;
pub mod cache;
pub mod memory;

// Re-export key traits at crate root for convenience
pub use blit::{
    AlphaMode, BlitEngine, BlitMode, CheckedTransfer, ColorFormat, LayerConfig, OutputConfig,
    Transfer, TransferError, TransferStatus,
};
pub use cache::{DataCache, NoCache};
pub use memory::{ExternalMemory, MemoryRegion};
