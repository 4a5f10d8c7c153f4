//! Display negotiation
//!
//! Brings the display link up and decides the timing mode.
//!
//! # Bridge path
//!
//! 1. Initialize the transceiver, retrying per [`InitPolicy`]
//! 2. Poll hot-plug detect until a display appears or the wait expires
//! 3. Read the display's descriptor
//! 4. Select a mode from the [`TimingTable`] the descriptor advertises
//! 5. Program the serial display interface with it
//! 6. Start the transceiver's output link
//!
//! # Direct panel path
//!
//! Boards with a panel wired straight to the serial interface skip the
//! bridge: [`configure_panel`] programs a fixed table mode.

use embedded_hal::delay::DelayNs;

use crate::config::{InitPolicy, ModeSelection, VideoConfig};
use crate::edid::DisplayDescriptor;
use crate::timing::{DisplayMode, ModeError, ModeId, TimingTable};
use crate::traits::{DisplayInterface, LinkId, Transceiver};

/// Errors from negotiation
///
/// `T` is the transceiver error, `I` the serial display interface error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NegotiationError<T, I> {
    /// The bridge failed to initialize on every attempt
    FatalInit(T),
    /// Reading hot-plug detect failed
    Hotplug(T),
    /// No display appeared within the bounded wait
    NoDisplay,
    /// Reading the descriptor failed
    Descriptor(T),
    /// The descriptor matches no usable timing table entry
    UnsupportedMode,
    /// The selected mode does not fit the interface
    InvalidMode(ModeError),
    /// Programming the serial display interface failed
    Interface(I),
    /// Starting the output link failed
    Link(T),
}

impl<T, I> From<ModeError> for NegotiationError<T, I> {
    fn from(e: ModeError) -> Self {
        NegotiationError::InvalidMode(e)
    }
}

/// Errors from the bridge path for a transceiver `T` and interface `I`
pub type BridgeError<T, I> = NegotiationError<<T as Transceiver>::Error, <I as DisplayInterface>::Error>;

/// Errors from the direct panel path, which has no transceiver
pub type PanelError<I> = NegotiationError<(), <I as DisplayInterface>::Error>;

/// Parameters of one negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NegotiationConfig {
    pub link: LinkId,
    pub selection: ModeSelection,
    pub hotplug_timeout_ms: u32,
    pub hotplug_poll_interval_ms: u32,
    pub init_policy: InitPolicy,
}

impl From<&VideoConfig> for NegotiationConfig {
    fn from(config: &VideoConfig) -> Self {
        Self {
            link: LinkId(config.link),
            selection: config.mode,
            hotplug_timeout_ms: config.hotplug_timeout_ms,
            hotplug_poll_interval_ms: config.hotplug_poll_interval_ms,
            init_policy: config.init_policy,
        }
    }
}

/// Something that can bring a display up and report its mode
pub trait DisplayLink {
    type Error;

    /// Establish the link; the returned mode is final for this boot
    fn establish(&mut self) -> Result<DisplayMode, Self::Error>;
}

/// Negotiates a display behind a bridge transceiver
pub struct Negotiator<'a, T, I, D> {
    transceiver: T,
    interface: I,
    delay: D,
    table: TimingTable<'a>,
    config: NegotiationConfig,
    descriptor: Option<DisplayDescriptor>,
}

impl<'a, T, I, D> Negotiator<'a, T, I, D>
where
    T: Transceiver,
    I: DisplayInterface,
    D: DelayNs,
{
    pub fn new(
        transceiver: T,
        interface: I,
        delay: D,
        table: TimingTable<'a>,
        config: NegotiationConfig,
    ) -> Self {
        Self {
            transceiver,
            interface,
            delay,
            table,
            config,
            descriptor: None,
        }
    }

    /// Descriptor of the connected display, once read
    pub fn descriptor(&self) -> Option<&DisplayDescriptor> {
        self.descriptor.as_ref()
    }

    /// Release the transceiver, interface and delay
    pub fn release(self) -> (T, I, D) {
        (self.transceiver, self.interface, self.delay)
    }

    /// Run the full negotiation
    pub fn negotiate(&mut self) -> Result<DisplayMode, BridgeError<T, I>> {
        let link = self.config.link;

        self.init_bridge()?;
        self.wait_for_display()?;

        let descriptor = self
            .transceiver
            .read_descriptor(link)
            .map_err(BridgeError::<T, I>::Descriptor)?;
        info!(
            "display {=[u8]:a} product {=u16:#x}, {} timings",
            &descriptor.manufacturer[..],
            descriptor.product_code,
            descriptor.timings.len()
        );

        let Some(mode) = select_mode(&self.table, &descriptor, self.config.selection) else {
            warn!("no table mode advertised by the display");
            return Err(NegotiationError::UnsupportedMode);
        };
        mode.validate_against(&self.interface.limits())?;
        info!(
            "selected {}x{} @ {} mHz",
            mode.hactive,
            mode.vactive,
            mode.refresh_mhz()
        );

        self.interface
            .configure(&mode)
            .map_err(BridgeError::<T, I>::Interface)?;
        self.transceiver
            .start_link(link, &descriptor, &mode)
            .map_err(BridgeError::<T, I>::Link)?;

        self.descriptor = Some(descriptor);
        Ok(mode)
    }

    fn init_bridge(&mut self) -> Result<(), BridgeError<T, I>> {
        let policy = self.config.init_policy;
        let attempts = policy.attempts().max(1);
        let mut attempt = 1;
        loop {
            match self.transceiver.init(self.config.link) {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => {
                    warn!("bridge init failed after {} attempts", attempt);
                    return Err(NegotiationError::FatalInit(e));
                }
                Err(_) => {
                    debug!("bridge init attempt {} failed, retrying", attempt);
                    self.delay.delay_ms(policy.backoff_ms());
                    attempt += 1;
                }
            }
        }
    }

    fn wait_for_display(&mut self) -> Result<(), BridgeError<T, I>> {
        let timeout = self.config.hotplug_timeout_ms;
        let interval = self.config.hotplug_poll_interval_ms.max(1);
        let mut waited: u32 = 0;
        loop {
            let present = self
                .transceiver
                .hotplug_detected(self.config.link)
                .map_err(BridgeError::<T, I>::Hotplug)?;
            if present {
                debug!("hot-plug detected after {} ms", waited);
                return Ok(());
            }
            if waited >= timeout {
                warn!("no display after {} ms", waited);
                return Err(NegotiationError::NoDisplay);
            }
            // The last wait stops at the timeout
            let step = interval.min(timeout - waited);
            self.delay.delay_ms(step);
            waited = waited.saturating_add(step);
        }
    }
}

impl<T, I, D> DisplayLink for Negotiator<'_, T, I, D>
where
    T: Transceiver,
    I: DisplayInterface,
    D: DelayNs,
{
    type Error = BridgeError<T, I>;

    fn establish(&mut self) -> Result<DisplayMode, Self::Error> {
        self.negotiate()
    }
}

/// Pick the table mode to use for `descriptor`
///
/// A fixed selection must be advertised by the display. Automatic selection
/// walks the advertised timings in order (preferred first) and takes the
/// first one the table knows.
pub fn select_mode(
    table: &TimingTable<'_>,
    descriptor: &DisplayDescriptor,
    selection: ModeSelection,
) -> Option<DisplayMode> {
    match selection {
        ModeSelection::Fixed(id) => table
            .get(id)
            .filter(|mode| descriptor.supports(mode))
            .copied(),
        ModeSelection::Auto => descriptor
            .timings
            .iter()
            .find_map(|t| table.find(t.hactive, t.vactive, t.refresh_hz))
            .map(|entry| entry.mode),
    }
}

/// Program a fixed table mode straight into the serial display interface
pub fn configure_panel<I: DisplayInterface>(
    interface: &mut I,
    table: &TimingTable<'_>,
    id: ModeId,
) -> Result<DisplayMode, PanelError<I>> {
    let Some(mode) = table.get(id).copied() else {
        return Err(NegotiationError::UnsupportedMode);
    };
    mode.validate_against(&interface.limits())?;
    interface
        .configure(&mode)
        .map_err(PanelError::<I>::Interface)?;
    info!("panel configured {}x{}", mode.hactive, mode.vactive);
    Ok(mode)
}

/// A panel without a bridge, driven at a fixed mode
pub struct DirectPanel<'a, I> {
    interface: I,
    table: TimingTable<'a>,
    mode: ModeId,
}

impl<'a, I: DisplayInterface> DirectPanel<'a, I> {
    pub fn new(interface: I, table: TimingTable<'a>, mode: ModeId) -> Self {
        Self {
            interface,
            table,
            mode,
        }
    }

    pub fn release(self) -> I {
        self.interface
    }
}

impl<I: DisplayInterface> DisplayLink for DirectPanel<'_, I> {
    type Error = PanelError<I>;

    fn establish(&mut self) -> Result<DisplayMode, Self::Error> {
        configure_panel(&mut self.interface, &self.table, self.mode)
    }
}
