pub mod sink;

pub use sink::{DisplaySink, DisplaySinkHandle};
