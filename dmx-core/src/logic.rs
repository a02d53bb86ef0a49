//! Pure Business Logic Functions
//!
//! Farbmathematik ohne Hardware-Dependencies (testbar!)

use rgb::RGB8;

use crate::types::Rgbw;

/// Anzahl Farben in der Standard-Palette
pub const PALETTE_SIZE: u8 = 7;

/// Schritte der kontinuierlichen Farbton-Rampe
pub const HUE_RAMP_STEPS: u8 = 100;

/// Standard-Palette: Rot, Grün, Blau, Gelb, Magenta, Cyan, Weiß
pub const PALETTE: [Rgbw; PALETTE_SIZE as usize] = [
    Rgbw::RED,
    Rgbw::GREEN,
    Rgbw::BLUE,
    Rgbw::new(255, 255, 0, 0),
    Rgbw::new(255, 0, 255, 0),
    Rgbw::new(0, 255, 255, 0),
    Rgbw::WHITE,
];

/// HSV → RGB mit dem Standard-Sektor-Algorithmus
///
/// - `hue` in Umdrehungen (0.0..1.0, Werte außerhalb werden gewrappt)
/// - `saturation`, `value` in 0.0..=1.0 (werden geclampt)
///
/// Sechs 60°-Sektoren mit `p = v(1-s)`, `q = v(1-fs)`, `t = v(1-(1-f)s)`.
///
/// # Beispiele
///
/// ```
/// # use rgb::RGB8;
/// # use dmx_core::hsv_to_rgb;
/// assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), RGB8 { r: 255, g: 0, b: 0 });
/// ```
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> RGB8 {
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);

    if s <= 0.0 {
        let grey = unit_to_u8(v);
        return RGB8 {
            r: grey,
            g: grey,
            b: grey,
        };
    }

    let h = wrap_turns(hue) * 6.0;
    // h >= 0, Abschneiden entspricht floor()
    let sector = (h as u8).min(5);
    let f = h - sector as f32;

    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    RGB8 {
        r: unit_to_u8(r),
        g: unit_to_u8(g),
        b: unit_to_u8(b),
    }
}

/// 8-Bit Variante: Farbton 0..=255 entspricht 0..1 Umdrehung
pub fn hsv8_to_rgb(hue: u8, saturation: u8, value: u8) -> RGB8 {
    hsv_to_rgb(
        hue as f32 / 256.0,
        saturation as f32 / 255.0,
        value as f32 / 255.0,
    )
}

/// Palettenfarbe für einen (beliebigen) Index
pub fn palette_color(index: u8) -> Rgbw {
    PALETTE[(index % PALETTE_SIZE) as usize]
}

/// Farbe auf der 100-stufigen Farbton-Rampe
pub fn ramp_color(step: u8) -> Rgbw {
    let step = step % HUE_RAMP_STEPS;
    hsv_to_rgb(step as f32 / HUE_RAMP_STEPS as f32, 1.0, 1.0).into()
}

fn wrap_turns(hue: f32) -> f32 {
    if hue.is_nan() {
        return 0.0;
    }
    let frac = hue - (hue as i32) as f32;
    let frac = if frac < 0.0 { frac + 1.0 } else { frac };
    if frac >= 1.0 { 0.0 } else { frac }
}

fn unit_to_u8(x: f32) -> u8 {
    (x * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: RGB8, b: RGB8) -> bool {
        a.r.abs_diff(b.r) <= 1 && a.g.abs_diff(b.g) <= 1 && a.b.abs_diff(b.b) <= 1
    }

    #[test]
    fn test_hsv_primary_colors() {
        assert!(close(hsv_to_rgb(0.0, 1.0, 1.0), RGB8 { r: 255, g: 0, b: 0 }));
        assert!(close(
            hsv_to_rgb(1.0 / 3.0, 1.0, 1.0),
            RGB8 { r: 0, g: 255, b: 0 }
        ));
        assert!(close(
            hsv_to_rgb(2.0 / 3.0, 1.0, 1.0),
            RGB8 { r: 0, g: 0, b: 255 }
        ));
    }

    #[test]
    fn test_hsv_sector_boundaries() {
        let expected = [
            RGB8 { r: 255, g: 0, b: 0 },
            RGB8 { r: 255, g: 255, b: 0 },
            RGB8 { r: 0, g: 255, b: 0 },
            RGB8 { r: 0, g: 255, b: 255 },
            RGB8 { r: 0, g: 0, b: 255 },
            RGB8 { r: 255, g: 0, b: 255 },
        ];
        for (i, color) in expected.iter().enumerate() {
            let rgb = hsv_to_rgb(i as f32 / 6.0, 1.0, 1.0);
            assert!(close(rgb, *color), "sector {} gave {:?}", i, rgb);
        }
    }

    #[test]
    fn test_hsv_full_turn_wraps_to_red() {
        assert!(close(hsv_to_rgb(1.0, 1.0, 1.0), RGB8 { r: 255, g: 0, b: 0 }));
        assert!(close(hsv_to_rgb(-1.0 / 3.0, 1.0, 1.0), hsv_to_rgb(2.0 / 3.0, 1.0, 1.0)));
    }

    #[test]
    fn test_hsv_zero_saturation_is_grey() {
        assert_eq!(hsv_to_rgb(0.42, 0.0, 0.5), RGB8 { r: 128, g: 128, b: 128 });
    }

    #[test]
    fn test_hsv8_matches_float_variant() {
        assert_eq!(hsv8_to_rgb(0, 255, 255), RGB8 { r: 255, g: 0, b: 0 });
        assert!(close(hsv8_to_rgb(128, 255, 255), hsv_to_rgb(0.5, 1.0, 1.0)));
        assert_eq!(hsv8_to_rgb(77, 255, 0), RGB8 { r: 0, g: 0, b: 0 });
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), Rgbw::RED);
        assert_eq!(palette_color(6), Rgbw::WHITE);
        assert_eq!(palette_color(7), Rgbw::RED);
    }

    #[test]
    fn test_ramp_starts_red() {
        assert_eq!(ramp_color(0), Rgbw::new(255, 0, 0, 0));
        assert_eq!(ramp_color(100), ramp_color(0));
    }
}
