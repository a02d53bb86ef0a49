//! Fixture Color API - logische Farben → Universe-Schreibzugriffe

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::fixtures::{Fixture, FixtureRegistry};
use crate::logic::{HUE_RAMP_STEPS, PALETTE_SIZE, hsv_to_rgb, hsv8_to_rgb, palette_color, ramp_color};
use crate::traits::DmxError;
use crate::types::Rgbw;
use crate::universe::{Channels, UniverseBuffer};

/// Quelle der Farben für `cycle_colors()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleMode {
    /// Feste 7-Farben-Palette
    Palette,
    /// Kontinuierliche Farbton-Rampe mit 100 Schritten
    HueRamp,
}

impl CycleMode {
    pub const fn steps(self) -> u8 {
        match self {
            CycleMode::Palette => PALETTE_SIZE,
            CycleMode::HueRamp => HUE_RAMP_STEPS,
        }
    }

    pub fn color(self, index: u8) -> Rgbw {
        match self {
            CycleMode::Palette => palette_color(index),
            CycleMode::HueRamp => ramp_color(index),
        }
    }
}

/// Schreibt die Farbrollen eines Fixtures in einen gesperrten Frame
///
/// `w` wird nur geschrieben wenn das Fixture einen Weiß-Kanal hat.
pub fn paint_fixture(channels: &mut Channels<'_>, fixture: &Fixture, color: Rgbw) {
    let roles = &fixture.channels;
    // Rollen sind beim Konfigurieren auf 1..=512 geprüft
    let _ = channels.set(roles.red, color.r);
    let _ = channels.set(roles.green, color.g);
    let _ = channels.set(roles.blue, color.b);
    if let Some(white) = roles.white {
        let _ = channels.set(white, color.w);
    }
}

/// Setzt die Farbe eines konfigurierten Fixtures
///
/// Ungültiger Index ist ein No-Op (`Err(UnknownFixture)`), der Frame
/// bleibt unverändert.
pub fn set_fixture_color<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    fixtures: &FixtureRegistry,
    index: usize,
    color: Rgbw,
) -> Result<(), DmxError> {
    let fixture = fixtures.get(index).ok_or(DmxError::UnknownFixture)?;
    universe.modify(|channels| paint_fixture(channels, fixture, color))
}

/// Schreibt R, G, B, W auf vier aufeinanderfolgende Kanäle ab `base`
///
/// Unabhängig von der Fixture-Tabelle (Ad-hoc-Adressierung).
pub fn set_manual_color<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    base: u16,
    color: Rgbw,
) -> Result<usize, DmxError> {
    universe.set_range(base, &color.to_array())
}

/// HSV-Farbe (Farbton in Umdrehungen) für ein Fixture
pub fn set_fixture_color_hsv<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    fixtures: &FixtureRegistry,
    index: usize,
    hue: f32,
    saturation: f32,
    value: f32,
) -> Result<(), DmxError> {
    let rgb = hsv_to_rgb(hue, saturation, value);
    set_fixture_color(universe, fixtures, index, rgb.into())
}

/// HSV-Farbe mit 8-Bit Komponenten für ein Fixture
pub fn set_fixture_color_hsv8<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    fixtures: &FixtureRegistry,
    index: usize,
    hue: u8,
    saturation: u8,
    value: u8,
) -> Result<(), DmxError> {
    let rgb = hsv8_to_rgb(hue, saturation, value);
    set_fixture_color(universe, fixtures, index, rgb.into())
}

/// Färbt zwei Fixtures aus einer rotierenden Farbfolge
///
/// Fixture `a` bekommt die Farbe bei `*index`, Fixture `b` die um `offset`
/// verschobene. Danach wird `*index` modulo 7 (Palette) bzw. 100 (Rampe)
/// weitergezählt. Der Zähler gehört dem Aufrufer.
pub fn cycle_colors<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    fixtures: &FixtureRegistry,
    a: usize,
    b: usize,
    mode: CycleMode,
    index: &mut u8,
    offset: u8,
) -> Result<(), DmxError> {
    let steps = mode.steps();
    let current = *index % steps;
    let shifted = ((current as u16 + offset as u16) % steps as u16) as u8;

    let result_a = set_fixture_color(universe, fixtures, a, mode.color(current));
    let result_b = set_fixture_color(universe, fixtures, b, mode.color(shifted));

    *index = (current + 1) % steps;
    result_a.and(result_b)
}
