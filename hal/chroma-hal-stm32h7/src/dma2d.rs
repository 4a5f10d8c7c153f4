//! Chrom-ART accelerator (DMA2D) driver
//!
//! The DMA2D is a dedicated DMA master for 2D pixel operations. This driver
//! turns a validated [`Transfer`] into register values in a single place,
//! [`RegisterSet::from_transfer`], then writes them through the
//! `stm32-metapac` register block.
//!
//! # Register programming order
//!
//! 1. Clear all interrupt flags (IFCR)
//! 2. Output layer: OPFCCR, OCOLR, OMAR, OOR, NLR
//! 3. Foreground layer: FGPFCCR, FGMAR, FGOR
//! 4. Background layer: BGPFCCR, BGMAR, BGOR
//! 5. CR with the mode, then START

use chroma_hal::blit::{
    AlphaMode, BlitEngine, BlitMode, CheckedTransfer, ColorFormat, LayerConfig, Transfer,
    TransferStatus,
};
use stm32_metapac::dma2d::regs::{Bgpfccr, Cr, Fgpfccr, Nlr, Ocolr, Opfccr};
use stm32_metapac::dma2d::vals::*;
use stm32_metapac::dma2d::Dma2d as Registers;

/// Errors from starting a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dma2dError {
    /// A transfer is still running
    Busy,
    /// Address does not fit the 32-bit bus
    AddressOutOfRange,
}

/// Register values for one transfer
///
/// Layer registers stay zero when the transfer has no such layer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RegisterSet {
    pub cr: Cr,
    pub opfccr: Opfccr,
    pub ocolr: u32,
    pub omar: u32,
    pub oor: u16,
    pub nlr: Nlr,
    pub fgpfccr: Fgpfccr,
    pub fgmar: u32,
    pub fgor: u16,
    pub bgpfccr: Bgpfccr,
    pub bgmar: u32,
    pub bgor: u16,
}

impl RegisterSet {
    /// Encode a validated transfer
    ///
    /// CR is returned without START; [`Dma2d`] sets it last.
    pub fn from_transfer(transfer: &CheckedTransfer) -> Result<Self, Dma2dError> {
        let t: &Transfer = transfer.get();

        let mut cr = Cr(0);
        cr.set_mode(match t.mode {
            BlitMode::MemoryToMemory => Mode::MEMORYTOMEMORY,
            BlitMode::MemoryToMemoryBlend => Mode::MEMORYTOMEMORYPFCBLENDING,
            BlitMode::RegisterToMemory => Mode::REGISTERTOMEMORY,
        });

        let mut opfccr = Opfccr(0);
        opfccr.set_cm(match t.output.format {
            ColorFormat::Argb8888 => OpfccrCm::ARGB8888,
            ColorFormat::Rgb888 => OpfccrCm::RGB888,
            ColorFormat::Rgb565 => OpfccrCm::RGB565,
        });
        opfccr.set_ai(if t.output.alpha_inverted {
            OpfccrAi::INVERTEDALPHA
        } else {
            OpfccrAi::REGULARALPHA
        });
        opfccr.set_rbs(if t.output.red_blue_swap {
            OpfccrRbs::SWAP
        } else {
            OpfccrRbs::REGULAR
        });

        let mut nlr = Nlr(0);
        nlr.set_pl(t.pixels_per_line);
        nlr.set_nl(t.lines);

        let mut regs = Self {
            cr,
            opfccr,
            ocolr: t.color,
            omar: bus_address(t.output.address)?,
            oor: t.output.line_offset,
            nlr,
            fgpfccr: Fgpfccr(0),
            fgmar: 0,
            fgor: 0,
            bgpfccr: Bgpfccr(0),
            bgmar: 0,
            bgor: 0,
        };

        if let Some(fg) = &t.foreground {
            regs.fgpfccr = foreground_pfccr(fg);
            regs.fgmar = bus_address(fg.address)?;
            regs.fgor = fg.line_offset;
        }
        if let Some(bg) = &t.background {
            regs.bgpfccr = background_pfccr(bg);
            regs.bgmar = bus_address(bg.address)?;
            regs.bgor = bg.line_offset;
        }

        Ok(regs)
    }
}

fn bus_address(address: usize) -> Result<u32, Dma2dError> {
    u32::try_from(address).map_err(|_| Dma2dError::AddressOutOfRange)
}

fn foreground_pfccr(layer: &LayerConfig) -> Fgpfccr {
    let mut w = Fgpfccr(0);
    w.set_cm(match layer.format {
        ColorFormat::Argb8888 => FgpfccrCm::ARGB8888,
        ColorFormat::Rgb888 => FgpfccrCm::RGB888,
        ColorFormat::Rgb565 => FgpfccrCm::RGB565,
    });
    w.set_am(match layer.alpha_mode {
        AlphaMode::NoModify => FgpfccrAm::NOMODIFY,
        AlphaMode::Replace => FgpfccrAm::REPLACE,
        AlphaMode::Multiply => FgpfccrAm::MULTIPLY,
    });
    w.set_ai(if layer.alpha_inverted {
        FgpfccrAi::INVERTEDALPHA
    } else {
        FgpfccrAi::REGULARALPHA
    });
    w.set_rbs(if layer.red_blue_swap {
        FgpfccrRbs::SWAP
    } else {
        FgpfccrRbs::REGULAR
    });
    w.set_alpha(layer.alpha);
    w
}

fn background_pfccr(layer: &LayerConfig) -> Bgpfccr {
    let mut w = Bgpfccr(0);
    w.set_cm(match layer.format {
        ColorFormat::Argb8888 => BgpfccrCm::ARGB8888,
        ColorFormat::Rgb888 => BgpfccrCm::RGB888,
        ColorFormat::Rgb565 => BgpfccrCm::RGB565,
    });
    w.set_am(match layer.alpha_mode {
        AlphaMode::NoModify => BgpfccrAm::NOMODIFY,
        AlphaMode::Replace => BgpfccrAm::REPLACE,
        AlphaMode::Multiply => BgpfccrAm::MULTIPLY,
    });
    w.set_ai(if layer.alpha_inverted {
        BgpfccrAi::INVERTEDALPHA
    } else {
        BgpfccrAi::REGULARALPHA
    });
    w.set_rbs(if layer.red_blue_swap {
        BgpfccrRbs::SWAP
    } else {
        BgpfccrRbs::REGULAR
    });
    w.set_alpha(layer.alpha);
    w
}

/// DMA2D peripheral
pub struct Dma2d {
    regs: Registers,
}

impl Dma2d {
    /// Create a driver over `regs`, normally `stm32_metapac::DMA2D`
    ///
    /// Enables the peripheral clock. No other code may use the DMA2D while
    /// the driver exists.
    pub fn new(regs: Registers) -> Self {
        stm32_metapac::RCC.ahb3enr().modify(|w| w.set_dma2den(true));
        Self { regs }
    }

    /// Give the register block back
    pub fn release(self) -> Registers {
        self.regs
    }

    fn is_running(&self) -> bool {
        self.regs.cr().read().start() == CrStart::START
    }

    fn clear_flags(&mut self) {
        self.regs.ifcr().write(|w| {
            w.set_caecif(Caecif::CLEAR);
            w.set_cceif(Cceif::CLEAR);
            w.set_cctcif(Cctcif::CLEAR);
            w.set_ctcif(Ctcif::CLEAR);
            w.set_cteif(Cteif::CLEAR);
            w.set_ctwif(Ctwif::CLEAR);
        });
    }
}

impl BlitEngine for Dma2d {
    type Error = Dma2dError;

    fn start(&mut self, transfer: &CheckedTransfer) -> Result<(), Self::Error> {
        if self.is_running() {
            return Err(Dma2dError::Busy);
        }
        let set = RegisterSet::from_transfer(transfer)?;

        // Stale flags would end the new transfer early
        self.clear_flags();

        self.regs.opfccr().write_value(set.opfccr);
        self.regs.ocolr().write_value(Ocolr(set.ocolr));
        self.regs.omar().write(|w| w.set_ma(set.omar));
        self.regs.oor().write(|w| w.set_lo(set.oor));
        self.regs.nlr().write_value(set.nlr);

        if transfer.get().foreground.is_some() {
            self.regs.fgpfccr().write_value(set.fgpfccr);
            self.regs.fgmar().write(|w| w.set_ma(set.fgmar));
            self.regs.fgor().write(|w| w.set_lo(set.fgor));
        }
        if transfer.get().background.is_some() {
            self.regs.bgpfccr().write_value(set.bgpfccr);
            self.regs.bgmar().write(|w| w.set_ma(set.bgmar));
            self.regs.bgor().write(|w| w.set_lo(set.bgor));
        }

        self.regs.cr().write_value(set.cr);
        self.regs.cr().modify(|w| w.set_start(CrStart::START));
        Ok(())
    }

    fn status(&mut self) -> TransferStatus {
        let status = self.regs.isr().read();
        if status.teif() || status.ceif() || status.caeif() {
            self.clear_flags();
            return TransferStatus::Error;
        }
        if status.tcif() {
            self.regs.ifcr().write(|w| w.set_ctcif(Ctcif::CLEAR));
            return TransferStatus::Complete;
        }
        if self.is_running() {
            TransferStatus::Busy
        } else {
            TransferStatus::Complete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_hal::blit::{OutputConfig, Transfer};

    #[test]
    fn test_copy_encoding() {
        let transfer = Transfer::copy(
            LayerConfig::rgb565(0xC000_0000),
            OutputConfig::rgb565(0xC010_0000).with_line_offset(700),
            20,
            10,
        )
        .validate()
        .unwrap();

        let regs = RegisterSet::from_transfer(&transfer).unwrap();
        assert_eq!(regs.cr.0, 0); // M2M, START not set yet
        assert_eq!(regs.opfccr.0, 0b010); // RGB565, no AI/RBS
        assert_eq!(regs.omar, 0xC010_0000);
        assert_eq!(regs.oor, 700);
        assert_eq!(regs.nlr.0, (20 << 16) | 10);
        assert_eq!(regs.fgmar, 0xC000_0000);
        // RGB565 input, no alpha modification, alpha 0xFF
        assert_eq!(regs.fgpfccr.0, 0b0010 | (0xFF << 24));
        assert_eq!(regs.bgpfccr.0, 0);
    }

    #[test]
    fn test_fill_encoding() {
        let transfer = Transfer::fill(0xF800, OutputConfig::rgb565(0xC000_0000).with_line_offset(780), 20, 5)
            .validate()
            .unwrap();

        let regs = RegisterSet::from_transfer(&transfer).unwrap();
        assert_eq!(regs.cr.0, 0b011 << 16);
        assert_eq!(regs.ocolr, 0xF800);
        assert_eq!(regs.oor, 780);
        assert_eq!(regs.fgmar, 0);
    }

    #[test]
    fn test_blend_encoding() {
        let transfer = Transfer::blend(
            LayerConfig::rgb565(0x2400_0000).with_alpha(AlphaMode::Replace, 0x80),
            LayerConfig::rgb565(0x2400_1000),
            OutputConfig::rgb565(0x2400_1000),
            64,
            1,
        )
        .validate()
        .unwrap();

        let regs = RegisterSet::from_transfer(&transfer).unwrap();
        assert_eq!(regs.cr.0, 0b010 << 16);
        assert_eq!(regs.fgpfccr.0, 0b0010 | (0b01 << 16) | (0x80 << 24));
        assert_eq!(regs.bgpfccr.0, 0b0010 | (0xFF << 24));
        assert_eq!(regs.bgmar, 0x2400_1000);
        assert_eq!(regs.omar, 0x2400_1000);
        assert_eq!(regs.nlr.0, (64 << 16) | 1);
    }

    #[test]
    fn test_channel_flags() {
        let mut output = OutputConfig::rgb565(0x2400_0000);
        output.alpha_inverted = true;
        output.red_blue_swap = true;
        let transfer = Transfer::fill(0, output, 1, 1).validate().unwrap();

        let regs = RegisterSet::from_transfer(&transfer).unwrap();
        assert_eq!(regs.opfccr.0, 0b010 | (1 << 20) | (1 << 21));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_address_out_of_range() {
        let transfer = Transfer::fill(0, OutputConfig::rgb565(0x1_0000_0000), 1, 1)
            .validate()
            .unwrap();
        assert!(matches!(
            RegisterSet::from_transfer(&transfer),
            Err(Dma2dError::AddressOutOfRange)
        ));
    }
}
