//! Serial display interface (MIPI-DSI host) trait

use crate::timing::{DisplayMode, InterfaceLimits};

/// Serial display interface
///
/// Programs the link between the MCU and the bridge (or panel) with the
/// timing of the selected mode. The pixel format is fixed to RGB565.
pub trait DisplayInterface {
    /// Error type for configuration failures
    type Error;

    /// Timing limits of this interface
    fn limits(&self) -> InterfaceLimits {
        InterfaceLimits::default()
    }

    /// Program the interface with `mode` and start the pixel clock
    fn configure(&mut self, mode: &DisplayMode) -> Result<(), Self::Error>;
}
