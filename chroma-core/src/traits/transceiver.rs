//! Bridge transceiver trait
//!
//! The transceiver converts the serial display interface to the external
//! connector (DisplayPort/HDMI) and talks to the attached sink.

use crate::edid::DisplayDescriptor;
use crate::timing::DisplayMode;

/// Identifies one bridge output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkId(pub u8);

/// Bridge transceiver driver
pub trait Transceiver {
    /// Error type for bridge operations
    type Error;

    /// Power up and initialize the bridge chip
    fn init(&mut self, link: LinkId) -> Result<(), Self::Error>;

    /// Sample the hot-plug-detect state
    ///
    /// Must not block; the caller bounds the wait.
    fn hotplug_detected(&mut self, link: LinkId) -> Result<bool, Self::Error>;

    /// Read and parse the sink's descriptor
    fn read_descriptor(&mut self, link: LinkId) -> Result<DisplayDescriptor, Self::Error>;

    /// Start the output link with the selected mode
    fn start_link(
        &mut self,
        link: LinkId,
        descriptor: &DisplayDescriptor,
        mode: &DisplayMode,
    ) -> Result<(), Self::Error>;
}
