//! Fixture Registry - Zuordnung Fixture → Kanalbereich und Farbrollen

use core::fmt::Write;

use heapless::{String, Vec};

use crate::types::MAX_ADDRESS;

/// Maximale Anzahl Fixtures pro Registry
pub const MAX_FIXTURES: usize = 32;

/// Maximale Länge eines Fixture-Namens (Bytes)
pub const MAX_NAME_LEN: usize = 16;

/// Maximale Kanäle pro Fixture
pub const MAX_CHANNELS_PER_FIXTURE: u8 = 16;

pub type FixtureName = String<MAX_NAME_LEN>;

/// Fehler-Typ für Konfigurations-Operationen
///
/// Wird geloggt, die Operation ist dann ein No-Op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    NoFixtures,
    TooManyFixtures,
    InvalidChannelCount,
    InvalidIndex,
    AddressOutOfRange,
}

/// Kanal-Zuordnung der Farbrollen (absolute DMX-Adressen 1..=512)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorChannels {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub white: Option<u16>,
}

/// Ein logisches Fixture im Universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: u8,
    pub name: FixtureName,
    pub base_address: u16,
    pub channels: ColorChannels,
}

impl Fixture {
    /// Standard-Layout: Rollen R, G, B, (W) hintereinander ab `base_address`
    fn with_default_layout(id: u8, base_address: u16, channels_per_fixture: u8) -> Self {
        let mut name = FixtureName::new();
        // "Fixture 32" passt immer in 16 Bytes
        let _ = write!(name, "Fixture {}", id as u16 + 1);

        Self {
            id,
            name,
            base_address,
            channels: ColorChannels {
                red: base_address,
                green: base_address + 1,
                blue: base_address + 2,
                white: (channels_per_fixture >= 4).then_some(base_address + 3),
            },
        }
    }
}

/// Besitzt alle Fixture-Deskriptoren
///
/// Color API und Pattern Engine lesen nur; Änderungen laufen über
/// `configure()` (kompletter Reset) oder `set_fixture()` (ein Slot).
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    fixtures: Vec<Fixture, MAX_FIXTURES>,
    channels_per_fixture: u8,
}

impl FixtureRegistry {
    pub const fn new() -> Self {
        Self {
            fixtures: Vec::new(),
            channels_per_fixture: 0,
        }
    }

    /// Verwirft die alte Tabelle und legt `count` Slots neu an
    ///
    /// Die Slots bekommen ein zusammenhängendes Standard-Layout ab Kanal 1.
    /// Bei Fehlern bleibt die bestehende Tabelle unverändert.
    pub fn configure(&mut self, count: usize, channels_per_fixture: u8) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::NoFixtures);
        }
        if !(3..=MAX_CHANNELS_PER_FIXTURE).contains(&channels_per_fixture) {
            return Err(ConfigError::InvalidChannelCount);
        }
        if count > MAX_FIXTURES || count * channels_per_fixture as usize > MAX_ADDRESS as usize {
            return Err(ConfigError::TooManyFixtures);
        }

        self.fixtures.clear();
        for i in 0..count {
            let base = (i * channels_per_fixture as usize + 1) as u16;
            let fixture = Fixture::with_default_layout(i as u8, base, channels_per_fixture);
            // Kapazität oben geprüft
            let _ = self.fixtures.push(fixture);
        }
        self.channels_per_fixture = channels_per_fixture;
        Ok(())
    }

    /// Schreibt einen Deskriptor; ungültiger Index ist ein No-Op
    ///
    /// Die Farbrollen dürfen beliebig sortiert sein, müssen aber innerhalb
    /// von `channels_per_fixture` Kanälen ab `base_address` liegen.
    #[allow(clippy::too_many_arguments)]
    pub fn set_fixture(
        &mut self,
        index: usize,
        name: &str,
        base_address: u16,
        red: u16,
        green: u16,
        blue: u16,
        white: Option<u16>,
    ) -> Result<(), ConfigError> {
        let span = self.channels_per_fixture as u32;
        let fixture = self
            .fixtures
            .get_mut(index)
            .ok_or(ConfigError::InvalidIndex)?;

        if base_address == 0 || base_address as u32 + span - 1 > MAX_ADDRESS as u32 {
            return Err(ConfigError::AddressOutOfRange);
        }
        // Jede Rolle liegt im eigenen Block [base, base + span - 1]
        let last = base_address + (span as u16 - 1);
        let roles = [Some(red), Some(green), Some(blue), white];
        if roles
            .iter()
            .flatten()
            .any(|&ch| ch < base_address || ch > last)
        {
            return Err(ConfigError::AddressOutOfRange);
        }

        fixture.name = truncated_name(name);
        fixture.base_address = base_address;
        fixture.channels = ColorChannels {
            red,
            green,
            blue,
            white,
        };
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Fixture> {
        self.fixtures.get(index)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn channels_per_fixture(&self) -> u8 {
        self.channels_per_fixture
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }
}

/// Kürzt auf `MAX_NAME_LEN` Bytes ohne ein UTF-8 Zeichen zu zerschneiden
fn truncated_name(name: &str) -> FixtureName {
    let mut out = FixtureName::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(feature = "defmt")]
impl defmt::Format for Fixture {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Fixture {{ id: {}, name: {}, base: {}, roles: {} }}",
            self.id,
            self.name.as_str(),
            self.base_address,
            self.channels
        )
    }
}
