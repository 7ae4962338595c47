//! ODROID-SHOW Panel Hardware Library
//!
//! Drives the ODROID-SHOW character/graphics display over a serial link
//! using its VT100-derived escape-sequence protocol. Commands are encoded
//! as escape sequences, optionally batched, and transmitted with pacing to
//! match the device's receive rate. Button reports from the device are
//! decoded by a background poll task.

pub mod color;
pub mod error;
pub mod orientation;
pub mod screen;

pub use color::{Color, ColorMode};
pub use error::{Error, Result};
pub use orientation::Orientation;
pub use screen::{ButtonEvent, ButtonId, ScreenContext};

/// Display dimensions in pixels.
pub const SCREEN_WIDTH: u16 = 240;
pub const SCREEN_HEIGHT: u16 = 320;

/// Serial link speed the firmware expects.
pub const BAUD_RATE: u32 = 500_000;

/// Rotation codes understood by the firmware. Even codes select vertical
/// orientation, odd codes horizontal.
pub const ROTATION_NORTH: u8 = 0;
pub const ROTATION_EAST: u8 = 1;
pub const ROTATION_SOUTH: u8 = 2;
pub const ROTATION_WEST: u8 = 3;
