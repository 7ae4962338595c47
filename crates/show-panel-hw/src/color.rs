//! ANSI color table for the display protocol.

use crate::{Error, Result};
use std::str::FromStr;

/// Symbolic colors with their protocol codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

/// Whether a color sequence targets the text or its background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorMode {
    Foreground = 3,
    Background = 4,
}

impl Color {
    /// Returns the numeric code embedded in the color escape sequence.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),
            _ => Err(Error::InvalidColor(s.to_string())),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => write!(f, "black"),
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Yellow => write!(f, "yellow"),
            Color::Blue => write!(f, "blue"),
            Color::Magenta => write!(f, "magenta"),
            Color::Cyan => write!(f, "cyan"),
            Color::White => write!(f, "white"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Color::Black.code(), 0);
        assert_eq!(Color::Red.code(), 1);
        assert_eq!(Color::White.code(), 7);
        assert_eq!(ColorMode::Foreground as u8, 3);
        assert_eq!(ColorMode::Background as u8, 4);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("red".parse::<Color>().unwrap(), Color::Red);
        assert_eq!("WHITE".parse::<Color>().unwrap(), Color::White);
        assert!(matches!(
            "chartreuse".parse::<Color>(),
            Err(Error::InvalidColor(_))
        ));
    }
}
