//! Button report decoding and callback dispatch.
//!
//! The firmware reports button activity as fixed two-byte frames: byte 0
//! names the button, byte 1 the event kind. Frames shorter than two bytes
//! and frames with unmapped byte values are dropped without error.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

/// Idle time between report reads.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The three hardware buttons on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Button0,
    Button1,
    Button2,
}

impl ButtonId {
    /// Maps the first report byte to a button, if it names one.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'0' => Some(ButtonId::Button0),
            b'1' => Some(ButtonId::Button1),
            b'2' => Some(ButtonId::Button2),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            ButtonId::Button0 => 0,
            ButtonId::Button1 => 1,
            ButtonId::Button2 => 2,
        }
    }
}

/// Button event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

impl ButtonEvent {
    /// Maps the second report byte to an event kind, if it names one.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'd' => Some(ButtonEvent::Pressed),
            b'u' => Some(ButtonEvent::Released),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            ButtonEvent::Pressed => 0,
            ButtonEvent::Released => 1,
        }
    }
}

pub(crate) type Callback = Box<dyn Fn() + Send + Sync>;

/// One optional handler per (button, event) slot. The last registration
/// for a slot wins.
#[derive(Default)]
pub(crate) struct CallbackTable {
    slots: [[Option<Callback>; 2]; 3],
}

impl CallbackTable {
    pub fn set(&mut self, button: ButtonId, event: ButtonEvent, callback: Callback) {
        self.slots[button.index()][event.index()] = Some(callback);
    }

    fn get(&self, button: ButtonId, event: ButtonEvent) -> Option<&Callback> {
        self.slots[button.index()][event.index()].as_ref()
    }
}

/// Poll loop body. Reads two-byte reports until the transport fails, with
/// a fixed idle interval between reads. Each iteration reads fresh; a
/// short read carries no state into the next one.
pub(crate) async fn poll_buttons<R>(mut reader: R, callbacks: Arc<Mutex<CallbackTable>>)
where
    R: AsyncRead + Unpin,
{
    debug!("button poll task started");
    let mut report = [0u8; 2];
    loop {
        match reader.read(&mut report).await {
            Ok(2) => dispatch(&report, &callbacks),
            Ok(n) => trace!("short button report ({} bytes), dropped", n),
            Err(e) => {
                warn!("button poll read failed: {}", e);
                return;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn dispatch(report: &[u8; 2], callbacks: &Mutex<CallbackTable>) {
    let (Some(button), Some(event)) = (
        ButtonId::from_byte(report[0]),
        ButtonEvent::from_byte(report[1]),
    ) else {
        trace!("unmapped button report: {:02X?}", report);
        return;
    };

    let table = callbacks.lock().unwrap();
    if let Some(callback) = table.get(button, event) {
        debug!("dispatching {:?} {:?}", button, event);
        callback();
    }
}
