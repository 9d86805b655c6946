//! Memory-mapped devices and their drivers.
//!
//! Each device owns a lock around its registers; everything the cycle or an
//! external producer observes goes through that lock. Drivers are installed
//! in the MMIO table during machine construction and configured in a second
//! pass once their addresses are known.

pub mod display;
pub mod keyboard;

pub use display::{Display, DisplayDriver};
pub use keyboard::Keyboard;
