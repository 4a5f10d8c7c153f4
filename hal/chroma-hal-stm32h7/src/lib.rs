//! STM32H7-specific HAL for the Chroma video core
//!
//! This crate implements the `chroma-hal` traits for STM32H7 parts with a
//! Cortex-M7 core, such as the STM32H747 on Portenta H7 and GIGA R1 boards:
//!
//! - [`dma2d::Dma2d`] - Chrom-ART accelerator (DMA2D) as a `BlitEngine`,
//!   programmed through the `stm32-metapac` register block
//! - [`cache::CortexM7Cache`] - L1 data cache maintenance as a `DataCache`
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting support

#![no_std]

pub mod cache;
pub mod dma2d;

pub use cache::CortexM7Cache;
pub use dma2d::{Dma2d, Dma2dError, RegisterSet};
