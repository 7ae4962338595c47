//! Escape-sequence encoding for the display protocol.
//!
//! Protocol structure:
//! - Prefix byte: 0x1B (ESC)
//! - ASCII-encoded decimal parameters
//! - Single terminating letter selecting the operation family
//!   (`r` rotation, `s` text size, `m` color, `q` backlight,
//!   `H` cursor position, `x` pixel draw, `i` image draw)
//!
//! Everything here is pure encoding. Sequences are produced as owned byte
//! strings and never touch the transport.

use crate::color::{Color, ColorMode};
use crate::orientation::Orientation;

/// Escape prefix byte.
pub const ESC: u8 = 0x1B;

/// Longest text run the serial link accepts in a single write.
pub const MAX_TEXT_CHUNK: usize = 20;

pub const NEW_LINE: &[u8] = b"\n";
pub const CARRIAGE_RETURN: &[u8] = b"\r";
pub const CURSOR_DOWN: &[u8] = b"\x1bD";
pub const CURSOR_DOWN_COLUMN_ONE: &[u8] = b"\x1bE";
pub const CURSOR_UP: &[u8] = b"\x1bM";
pub const RESET_LCD: &[u8] = b"\x1bc";
pub const ERASE_SCREEN: &[u8] = b"\x1b[2J";
pub const SAVE_CURSOR: &[u8] = b"\x1b[s";
pub const RESTORE_CURSOR: &[u8] = b"\x1b[u";
pub const CURSOR_HOME: &[u8] = b"\x1b[H";

/// Direction letters for parameterized cursor moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowDirection {
    Up,
    Down,
    Right,
    Left,
}

impl ArrowDirection {
    fn terminator(&self) -> char {
        match self {
            ArrowDirection::Up => 'A',
            ArrowDirection::Down => 'B',
            ArrowDirection::Right => 'C',
            ArrowDirection::Left => 'D',
        }
    }
}

/// Encodes a cursor move of `count` cells in the given direction.
pub fn arrow(direction: ArrowDirection, count: u32) -> Vec<u8> {
    format!("\x1b[{}{}", count, direction.terminator()).into_bytes()
}

/// Encodes an absolute cursor position.
pub fn cursor_position(row: u32, col: u32) -> Vec<u8> {
    format!("\x1b[{};{}H", row, col).into_bytes()
}

/// Encodes a backlight brightness command on the raw 0-255 PWM scale.
pub fn backlight_pwm(pwm: u8) -> Vec<u8> {
    format!("\x1b[{}q", pwm).into_bytes()
}

/// Converts a 0-100 percentage to the raw 0-255 backlight scale.
pub fn percent_to_pwm(percent: u8) -> u8 {
    (f64::from(percent) * 2.55).round() as u8
}

/// Encodes a foreground or background color command.
pub fn color(mode: ColorMode, color: Color) -> Vec<u8> {
    format!("\x1b[{}{}m", mode as u8, color.code()).into_bytes()
}

/// Encodes a rotation command.
pub fn rotation(code: u8) -> Vec<u8> {
    format!("\x1b[{}r", code).into_bytes()
}

/// Encodes a text size command.
pub fn text_size(size: u32) -> Vec<u8> {
    format!("\x1b[{}s", size).into_bytes()
}

/// Encodes a single pixel draw.
pub fn draw_dot(x: u32, y: u32) -> Vec<u8> {
    format!("\x1b[{};{}x", x, y).into_bytes()
}

/// Encodes an image draw header. The firmware framebuffer has a fixed
/// axis, so the width/height pair is swapped when the panel is
/// horizontal. The raw pixel payload follows as a separate write.
pub fn image_header(
    orientation: Orientation,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let (w, h) = match orientation {
        Orientation::Vertical => (width, height),
        Orientation::Horizontal => (height, width),
    };
    format!("\x1b[{};{},{};{}i", offset_x, offset_y, w, h).into_bytes()
}

/// Splits text into runs the serial link can take in one write. Chunks
/// are exactly `MAX_TEXT_CHUNK` characters except possibly the last.
pub fn chunk_text(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(MAX_TEXT_CHUNK)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
