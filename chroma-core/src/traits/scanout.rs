//! Scan-out layer trait

/// Display controller layer reading a frame buffer out to the link
///
/// On the STM32H7 this is an LTDC layer feeding the DSI host. The driver
/// points it at a new buffer after every completed frame.
pub trait ScanOut {
    /// Error type for layer updates
    type Error;

    /// Scan out the buffer at `address` from the next vertical blank on
    fn set_framebuffer(&mut self, address: usize) -> Result<(), Self::Error>;
}
