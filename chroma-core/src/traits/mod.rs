//! Device traits
//!
//! These traits define the interface between the video core and the
//! external collaborators it drives: the bridge transceiver, the serial
//! display interface, the scan-out layer and the graphics library.

pub mod interface;
pub mod library;
pub mod scanout;
pub mod transceiver;

pub use interface::DisplayInterface;
pub use library::{
    Callbacks, DirtyRegion, DisplayCallbacks, DriverRecord, FlushReady, GraphicsLibrary, LibraryVersion,
    Rotation,
};
pub use scanout::ScanOut;
pub use transceiver::{LinkId, Transceiver};
