//! Blit engine adapter
//!
//! Turns the graphics library's three accelerator calls into engine
//! transfers:
//!
//! - **copy**: dirty region pixels into the frame buffer (memory to memory)
//! - **fill**: a rectangle of a buffer with one color (register to memory)
//! - **blend**: a run of pixels over a destination run (memory to memory
//!   with blending, foreground alpha replaced by the opacity)
//!
//! Every transfer is bracketed by cache maintenance and waited for with a
//! bounded poll. The result is a [`TransferOutcome`]; transfer problems
//! never propagate further than this module.

use core::sync::atomic::{compiler_fence, Ordering};

use chroma_hal::blit::MAX_PIXELS_PER_LINE;
use chroma_hal::{
    AlphaMode, BlitEngine, DataCache, LayerConfig, OutputConfig, Transfer, TransferError,
    TransferStatus,
};
use embedded_hal::delay::DelayNs;

use crate::cache::CacheGuard;
use crate::config::DEFAULT_TRANSFER_TIMEOUT_MS;
use crate::framebuffer::FrameBuffer;
use crate::pixel::{Area, Rgb565, BYTES_PER_PIXEL};

/// Interval between engine status polls
const POLL_INTERVAL_US: u32 = 10;

/// Errors that fail a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlitError {
    /// The transfer does not fit the engine's limits
    Config(TransferError),
    /// The engine refused to start
    Start,
    /// The engine raised an error flag
    Engine,
    /// A pixel buffer is shorter than the area or run it should cover
    SourceTooShort,
    /// Destination width is zero
    InvalidStride,
}

impl From<TransferError> for BlitError {
    fn from(e: TransferError) -> Self {
        BlitError::Config(e)
    }
}

/// How a transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferOutcome {
    /// The engine reported completion (or there was nothing to transfer)
    Completed,
    /// The bounded wait expired first
    TimedOut,
    /// The transfer could not run or the engine reported an error
    Failed(BlitError),
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed)
    }
}

/// Transfer counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStats {
    pub completed: u32,
    pub timed_out: u32,
    pub failed: u32,
}

impl TransferStats {
    fn record(&mut self, outcome: TransferOutcome) {
        let counter = match outcome {
            TransferOutcome::Completed => &mut self.completed,
            TransferOutcome::TimedOut => &mut self.timed_out,
            TransferOutcome::Failed(_) => &mut self.failed,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// Blit engine adapter
pub struct BlitAdapter<E, C, D> {
    engine: E,
    cache: CacheGuard<C>,
    delay: D,
    timeout_us: u32,
    stats: TransferStats,
}

impl<E, C, D> BlitAdapter<E, C, D>
where
    E: BlitEngine,
    C: DataCache,
    D: DelayNs,
{
    /// Adapter with the default transfer timeout
    pub fn new(engine: E, cache: C, delay: D) -> Self {
        Self {
            engine,
            cache: CacheGuard::new(cache),
            delay,
            timeout_us: DEFAULT_TRANSFER_TIMEOUT_MS * 1000,
            stats: TransferStats::default(),
        }
    }

    /// Set the bounded wait per transfer
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_us = timeout_ms.saturating_mul(1000);
        self
    }

    /// Transfer counters since construction
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Release the engine, cache and delay
    pub fn release(self) -> (E, C, D) {
        (self.engine, self.cache.release(), self.delay)
    }

    /// Copy the pixels of `area` into `target`
    ///
    /// `pixels` holds the whole area row by row. Parts of the area outside
    /// the frame buffer are clipped.
    pub fn copy_to(&mut self, target: &FrameBuffer, area: &Area, pixels: &[Rgb565]) -> TransferOutcome {
        if pixels.len() < area.pixel_count() {
            return self.fail(BlitError::SourceTooShort);
        }
        let Some(clipped) = area.intersect(&bounds(target.width as usize, target.height as usize))
        else {
            return TransferOutcome::Completed;
        };

        let width = clipped.width() as usize;
        let skip = (clipped.y1 as i32 - area.y1 as i32) as usize * area.width() as usize
            + (clipped.x1 as i32 - area.x1 as i32) as usize;
        let source = LayerConfig::rgb565(pixels.as_ptr() as usize + skip * BYTES_PER_PIXEL)
            .with_line_offset(line_offset(area.width() as usize, width));
        let output = OutputConfig::rgb565(target.pixel_address(clipped.x1 as u16, clipped.y1 as u16))
            .with_line_offset(line_offset(target.stride as usize, width));

        self.run(Transfer::copy(
            source,
            output,
            dimension(width),
            dimension(clipped.height() as usize),
        ))
    }

    /// Fill `area` of `dest`, a buffer `dest_width` pixels wide, with `color`
    pub fn fill(&mut self, dest: &mut [Rgb565], dest_width: u16, area: &Area, color: Rgb565) -> TransferOutcome {
        if dest_width == 0 {
            return self.fail(BlitError::InvalidStride);
        }
        let stride = dest_width as usize;
        let Some(clipped) = area.intersect(&bounds(stride, dest.len() / stride)) else {
            return TransferOutcome::Completed;
        };

        let width = clipped.width() as usize;
        let first = clipped.y1 as usize * stride + clipped.x1 as usize;
        let output = OutputConfig::rgb565(dest.as_mut_ptr() as usize + first * BYTES_PER_PIXEL)
            .with_line_offset(line_offset(stride, width));

        self.run(Transfer::fill(
            color.0 as u32,
            output,
            dimension(width),
            dimension(clipped.height() as usize),
        ))
    }

    /// Blend `length` pixels of `src` over `dest` at `opacity`
    ///
    /// Runs longer than one engine line are split.
    pub fn blend(&mut self, dest: &mut [Rgb565], src: &[Rgb565], length: usize, opacity: u8) -> TransferOutcome {
        if dest.len() < length || src.len() < length {
            return self.fail(BlitError::SourceTooShort);
        }

        let dest_base = dest.as_mut_ptr() as usize;
        let src_base = src.as_ptr() as usize;
        let chunk = MAX_PIXELS_PER_LINE as usize;

        let mut done = 0;
        while done < length {
            let count = (length - done).min(chunk);
            let offset = done * BYTES_PER_PIXEL;
            let foreground =
                LayerConfig::rgb565(src_base + offset).with_alpha(AlphaMode::Replace, opacity);
            let background = LayerConfig::rgb565(dest_base + offset);
            let output = OutputConfig::rgb565(dest_base + offset);

            let outcome = self.run(Transfer::blend(foreground, background, output, dimension(count), 1));
            if !outcome.is_completed() {
                return outcome;
            }
            done += count;
        }
        TransferOutcome::Completed
    }

    fn run(&mut self, transfer: Transfer) -> TransferOutcome {
        let checked = match transfer.validate() {
            Ok(checked) => checked,
            Err(e) => return self.fail(e.into()),
        };

        self.cache.before(&transfer);
        compiler_fence(Ordering::SeqCst);

        if self.engine.start(&checked).is_err() {
            return self.fail(BlitError::Start);
        }
        let outcome = self.wait();

        compiler_fence(Ordering::SeqCst);
        self.cache.after(&transfer);

        match outcome {
            TransferOutcome::Completed => {}
            TransferOutcome::TimedOut => warn!("blit timed out after {} us", self.timeout_us),
            TransferOutcome::Failed(e) => warn!("blit failed: {:?}", e),
        }
        self.stats.record(outcome);
        outcome
    }

    /// Number of delayed polls the timeout allows
    fn poll_budget(&self) -> u32 {
        self.timeout_us.div_ceil(POLL_INTERVAL_US)
    }

    fn wait(&mut self) -> TransferOutcome {
        for _ in 0..self.poll_budget() {
            match self.engine.status() {
                TransferStatus::Complete => return TransferOutcome::Completed,
                TransferStatus::Error => return TransferOutcome::Failed(BlitError::Engine),
                TransferStatus::Busy => self.delay.delay_us(POLL_INTERVAL_US),
            }
        }
        // One last look at the deadline
        match self.engine.status() {
            TransferStatus::Complete => TransferOutcome::Completed,
            TransferStatus::Error => TransferOutcome::Failed(BlitError::Engine),
            TransferStatus::Busy => TransferOutcome::TimedOut,
        }
    }

    fn fail(&mut self, error: BlitError) -> TransferOutcome {
        warn!("blit rejected: {:?}", error);
        let outcome = TransferOutcome::Failed(error);
        self.stats.record(outcome);
        outcome
    }
}

/// Area covering a `width` x `height` buffer
fn bounds(width: usize, height: usize) -> Area {
    let last = |n: usize| (n.min(i16::MAX as usize + 1) as i32 - 1) as i16;
    Area::new(0, 0, last(width), last(height))
}

/// Pixels skipped at the end of each line; oversized values fail validation
fn line_offset(stride: usize, width: usize) -> u16 {
    u16::try_from(stride - width).unwrap_or(u16::MAX)
}

/// Line length or count; oversized values fail validation
fn dimension(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
