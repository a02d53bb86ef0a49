//! Core Types für DMX-Steuerung
//!
//! Datenstrukturen ohne Hardware-Dependencies

use rgb::RGB8;

/// Anzahl der Kanäle in einem DMX-Universe
pub const CHANNEL_COUNT: usize = 512;

/// Frame-Größe: Start-Code + 512 Kanäle
pub const UNIVERSE_SIZE: usize = CHANNEL_COUNT + 1;

/// Höchste gültige Kanal-Adresse (1-basiert)
pub const MAX_ADDRESS: u16 = CHANNEL_COUNT as u16;

/// Start-Code für normale Dimmer-Daten (immer Byte 0 im Frame)
pub const START_CODE: u8 = 0x00;

/// Ein kompletter DMX-Frame (Index 0 = Start-Code)
pub type Frame = [u8; UNIVERSE_SIZE];

/// RGBW-Farbe für Fixtures mit optionalem Weiß-Kanal
///
/// Fixtures ohne W-Kanal ignorieren `w` beim Schreiben.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Rgbw {
    pub const BLACK: Self = Self::new(0, 0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0, 0);
    pub const BLUE: Self = Self::new(0, 0, 255, 0);
    /// Volle Helligkeit auf allen vier Kanälen
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Kanalwerte in der Reihenfolge R, G, B, W
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.w]
    }

    pub const fn is_dark(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0 && self.w == 0
    }
}

impl From<RGB8> for Rgbw {
    fn from(color: RGB8) -> Self {
        Self::new(color.r, color.g, color.b, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgbw_from_rgb8_leaves_white_dark() {
        let color = Rgbw::from(RGB8 { r: 1, g: 2, b: 3 });
        assert_eq!(color, Rgbw::new(1, 2, 3, 0));
    }

    #[test]
    fn test_rgbw_to_array_order() {
        assert_eq!(Rgbw::new(10, 20, 30, 40).to_array(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_rgbw_is_dark() {
        assert!(Rgbw::BLACK.is_dark());
        assert!(!Rgbw::new(0, 0, 0, 1).is_dark());
    }
}
