//! Display orientation support.
//!
//! Orientation is a side effect of the rotation command: even rotation
//! codes put the panel in vertical orientation, odd codes in horizontal.
//! Character cell geometry (columns and rows) follows the orientation and
//! the current text size.

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Display orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Landscape text layout, the power-on default.
    #[default]
    Horizontal,
    /// Portrait text layout.
    Vertical,
}

impl Orientation {
    /// Returns the orientation implied by a rotation code. The parity
    /// rule is a firmware contract.
    pub fn from_rotation(code: u8) -> Self {
        if code % 2 == 0 {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    /// Character columns available at the given text size.
    pub fn columns(&self, text_size: u32) -> u32 {
        match self {
            Orientation::Horizontal => u32::from(SCREEN_HEIGHT) / (text_size * 6),
            Orientation::Vertical => u32::from(SCREEN_WIDTH) / (text_size * 6),
        }
    }

    /// Character rows available at the given text size.
    pub fn rows(&self, text_size: u32) -> u32 {
        match self {
            Orientation::Horizontal => u32::from(SCREEN_WIDTH) / (text_size * 8),
            Orientation::Vertical => u32::from(SCREEN_HEIGHT) / (text_size * 8),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_parity() {
        assert_eq!(Orientation::from_rotation(0), Orientation::Vertical);
        assert_eq!(Orientation::from_rotation(1), Orientation::Horizontal);
        assert_eq!(Orientation::from_rotation(2), Orientation::Vertical);
        assert_eq!(Orientation::from_rotation(3), Orientation::Horizontal);
        assert_eq!(Orientation::from_rotation(42), Orientation::Vertical);
    }

    #[test]
    fn test_geometry() {
        // 320 / (2 * 6) = 26 columns, 240 / (2 * 8) = 15 rows
        assert_eq!(Orientation::Horizontal.columns(2), 26);
        assert_eq!(Orientation::Horizontal.rows(2), 15);
        // 240 / (2 * 6) = 20 columns, 320 / (2 * 8) = 20 rows
        assert_eq!(Orientation::Vertical.columns(2), 20);
        assert_eq!(Orientation::Vertical.rows(2), 20);
    }

    #[test]
    fn test_geometry_scales_with_text_size() {
        assert_eq!(Orientation::Horizontal.columns(1), 53);
        assert_eq!(Orientation::Horizontal.columns(4), 13);
    }
}
