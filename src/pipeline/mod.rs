pub mod cell;
pub mod driver;
pub mod resize;

pub use cell::{FrameCell, StopFlag};
pub use driver::{Driver, DriverState};
