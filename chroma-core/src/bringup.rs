//! Video bring-up sequence
//!
//! Runs once at boot and either returns a registered [`DisplayDriver`] or
//! the first error. Nothing here halts: the caller decides what a failed
//! bring-up means for the rest of the firmware.
//!
//! 1. Validate the configuration
//! 2. Establish the display link (bridge negotiation or direct panel)
//! 3. Allocate frame buffers for the negotiated resolution
//! 4. Start external memory, reserving the frame buffers
//! 5. Build the driver and point the scan-out layer at its front buffer
//! 6. Register the driver with the graphics library

use chroma_hal::{BlitEngine, DataCache, ExternalMemory};
use embedded_hal::delay::DelayNs;

use crate::blit::BlitAdapter;
use crate::config::{ConfigError, VideoConfig};
use crate::driver::{DisplayDriver, RegistrationError};
use crate::framebuffer::{AllocError, FrameBufferAllocator};
use crate::negotiate::DisplayLink;
use crate::traits::{GraphicsLibrary, ScanOut};

/// Errors from bring-up
///
/// `L` is the display link error, `M` the external memory error, `S` the
/// scan-out layer error and `G` the graphics library error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<L, M, S, G> {
    /// Invalid configuration
    Config(ConfigError),
    /// Display negotiation or panel configuration failed
    Link(L),
    /// Frame buffers do not fit external memory
    Alloc(AllocError),
    /// External memory failed to start
    Memory(M),
    /// The scan-out layer refused the front buffer
    ScanOut(S),
    /// Registration with the graphics library failed
    Registration(RegistrationError<G>),
}

impl<L, M, S, G> From<ConfigError> for InitError<L, M, S, G> {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

impl<L, M, S, G> From<AllocError> for InitError<L, M, S, G> {
    fn from(e: AllocError) -> Self {
        InitError::Alloc(e)
    }
}

impl<L, M, S, G> From<RegistrationError<G>> for InitError<L, M, S, G> {
    fn from(e: RegistrationError<G>) -> Self {
        InitError::Registration(e)
    }
}

/// [`InitError`] for a link `K`, memory `M`, scan-out `S` and library `G`
pub type BringUpError<K, M, S, G> = InitError<
    <K as DisplayLink>::Error,
    <M as ExternalMemory>::Error,
    <S as ScanOut>::Error,
    <G as GraphicsLibrary>::Error,
>;

/// Bring the video subsystem up
#[allow(clippy::too_many_arguments)]
pub fn bring_up<K, M, E, C, D, S, G>(
    config: &VideoConfig,
    link: &mut K,
    memory: &mut M,
    engine: E,
    cache: C,
    delay: D,
    scanout: S,
    library: &mut G,
) -> Result<DisplayDriver<E, C, D, S>, BringUpError<K, M, S, G>>
where
    K: DisplayLink,
    M: ExternalMemory,
    E: BlitEngine,
    C: DataCache,
    D: DelayNs,
    S: ScanOut,
    G: GraphicsLibrary,
{
    config.validate()?;

    let mode = link.establish().map_err(BringUpError::<K, M, S, G>::Link)?;

    let buffers = FrameBufferAllocator::new(memory.region()).allocate(
        mode.hactive,
        mode.vactive,
        config.buffering,
    )?;
    memory
        .begin(Some(buffers.end()))
        .map_err(BringUpError::<K, M, S, G>::Memory)?;

    let adapter = BlitAdapter::new(engine, cache, delay).with_timeout(config.transfer_timeout_ms);
    let mut driver = DisplayDriver::new(
        adapter,
        buffers,
        scanout,
        mode,
        config.orientation,
        config.draw_buffer_divisor,
    );
    driver
        .start_scanout()
        .map_err(BringUpError::<K, M, S, G>::ScanOut)?;
    driver.register(library)?;

    info!("video up: {}x{}", mode.hactive, mode.vactive);
    Ok(driver)
}
