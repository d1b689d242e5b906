pub mod bus;
pub mod bus_builder;
pub mod event;
pub mod playback;

pub use bus::*;
pub use bus_builder::*;
pub use event::*;
pub use playback::*;
