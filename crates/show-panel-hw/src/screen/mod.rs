//! Screen control: protocol encoding, command buffering with paced
//! transmission, and button event polling.

mod buttons;
mod context;
pub mod protocol;

pub use buttons::{ButtonEvent, ButtonId, POLL_INTERVAL};
pub use context::ScreenContext;
