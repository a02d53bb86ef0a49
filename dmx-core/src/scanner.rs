//! Diagnostic Scanner - manuelle Adress-Suche für unbekannte Verkabelung
//!
//! Ein Probe-Farbwechsel (Rot → Grün → Blau) wandert über die Adressen
//! `start..=end` in Schritten von `step`. Ein Referenz-Fixture bleibt rot
//! als Anker. Der Scanner endet nie von selbst, nur per Operator-Stop.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::color::paint_fixture;
use crate::fixtures::{ConfigError, FixtureRegistry};
use crate::traits::DmxError;
use crate::types::Rgbw;
use crate::universe::{UniverseBuffer, is_valid_address};

/// Probe-Farben in Reihenfolge
pub const PROBE_COLORS: [Rgbw; 3] = [Rgbw::RED, Rgbw::GREEN, Rgbw::BLUE];

/// Standard-Verweildauer pro Farbe
pub const DEFAULT_SCAN_INTERVAL_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanConfig {
    pub start: u16,
    pub end: u16,
    pub step: u16,
    /// Fixture-Index, der als Anker rot leuchtet
    pub anchor: Option<usize>,
    pub interval_ms: u32,
}

/// Was gerade angezeigt wird (für das Operator-Log)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanStep {
    pub address: u16,
    pub color: Rgbw,
}

#[derive(Debug, Default)]
pub struct AddressScanner {
    config: Option<ScanConfig>,
    address: u16,
    color_index: u8,
    last_step_ms: Option<u64>,
}

impl AddressScanner {
    pub const fn new() -> Self {
        Self {
            config: None,
            address: 0,
            color_index: 0,
            last_step_ms: None,
        }
    }

    /// Startet den Scan bei `config.start`; ungültige Bereiche sind ein No-Op
    pub fn start(&mut self, config: ScanConfig) -> Result<(), ConfigError> {
        if !is_valid_address(config.start) || !is_valid_address(config.end) {
            return Err(ConfigError::AddressOutOfRange);
        }
        if config.end < config.start || config.step == 0 {
            return Err(ConfigError::AddressOutOfRange);
        }
        self.config = Some(config);
        self.address = config.start;
        self.color_index = 0;
        self.last_step_ms = None;
        Ok(())
    }

    pub fn stop(&mut self) {
        *self = Self::new();
    }

    pub fn is_active(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&ScanConfig> {
        self.config.as_ref()
    }

    /// Zeigt den nächsten Probe-Schritt falls das Intervall abgelaufen ist
    ///
    /// Der Frame wird komplett dunkel geschaltet, damit nur Probe und Anker
    /// leuchten. Gibt `Ok(None)` zurück wenn inaktiv oder noch nicht fällig.
    pub fn step<R: RawMutex>(
        &mut self,
        now_ms: u64,
        universe: &UniverseBuffer<R>,
        fixtures: &FixtureRegistry,
    ) -> Result<Option<ScanStep>, DmxError> {
        let Some(config) = self.config else {
            return Ok(None);
        };
        if let Some(last) = self.last_step_ms {
            if now_ms.saturating_sub(last) < config.interval_ms as u64 {
                return Ok(None);
            }
        }

        let address = self.address;
        let color = PROBE_COLORS[self.color_index as usize];
        let anchor = config.anchor.and_then(|index| fixtures.get(index));

        universe.modify(|channels| {
            channels.fill(0);
            let _ = channels.set_range(address, &color.to_array());
            if let Some(fixture) = anchor {
                paint_fixture(channels, fixture, Rgbw::RED);
            }
        })?;

        self.last_step_ms = Some(now_ms);
        self.color_index += 1;
        if self.color_index as usize == PROBE_COLORS.len() {
            self.color_index = 0;
            self.address = match address.checked_add(config.step) {
                Some(next) if next <= config.end => next,
                _ => config.start,
            };
        }

        Ok(Some(ScanStep { address, color }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn config(start: u16, end: u16, step: u16) -> ScanConfig {
        ScanConfig {
            start,
            end,
            step,
            anchor: None,
            interval_ms: 0,
        }
    }

    #[test]
    fn test_inactive_scanner_does_nothing() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let mut scanner = AddressScanner::new();
        assert_eq!(scanner.step(0, &universe, &FixtureRegistry::new()), Ok(None));
    }

    #[test]
    fn test_probe_cycles_colors_then_moves() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let fixtures = FixtureRegistry::new();
        let mut scanner = AddressScanner::new();
        scanner.start(config(1, 9, 4)).unwrap();

        let steps: [ScanStep; 4] = core::array::from_fn(|t| {
            scanner.step(t as u64, &universe, &fixtures).unwrap().unwrap()
        });

        assert_eq!(steps[0], ScanStep { address: 1, color: Rgbw::RED });
        assert_eq!(steps[1].color, Rgbw::GREEN);
        assert_eq!(steps[2].color, Rgbw::BLUE);
        assert_eq!(steps[3], ScanStep { address: 5, color: Rgbw::RED });

        // Vorherige Probe ist dunkel
        assert_eq!(universe.get_channel(3), 0);
        assert_eq!(universe.get_channel(5), 255);
    }

    #[test]
    fn test_scan_wraps_to_start() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let fixtures = FixtureRegistry::new();
        let mut scanner = AddressScanner::new();
        scanner.start(config(10, 12, 2)).unwrap();

        let mut last = None;
        for t in 0..7 {
            last = scanner.step(t, &universe, &fixtures).unwrap();
        }
        // 3 Farben @10, 3 Farben @12, dann wieder 10
        assert_eq!(last, Some(ScanStep { address: 10, color: Rgbw::RED }));
    }

    #[test]
    fn test_anchor_fixture_stays_red() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let mut fixtures = FixtureRegistry::new();
        fixtures.configure(4, 4).unwrap();
        let mut scanner = AddressScanner::new();
        scanner
            .start(ScanConfig {
                anchor: Some(3),
                ..config(1, 5, 4)
            })
            .unwrap();

        scanner.step(0, &universe, &fixtures).unwrap();
        scanner.step(1, &universe, &fixtures).unwrap();
        assert_eq!(universe.get_channel(13), 255);
        assert_eq!(universe.get_channel(14), 0);
        assert_eq!(universe.get_channel(2), 255); // Probe grün auf Adresse 1
    }

    #[test]
    fn test_interval_gates_steps() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let fixtures = FixtureRegistry::new();
        let mut scanner = AddressScanner::new();
        scanner
            .start(ScanConfig {
                interval_ms: 500,
                ..config(1, 512, 1)
            })
            .unwrap();

        assert!(scanner.step(0, &universe, &fixtures).unwrap().is_some());
        assert!(scanner.step(499, &universe, &fixtures).unwrap().is_none());
        assert!(scanner.step(500, &universe, &fixtures).unwrap().is_some());
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut scanner = AddressScanner::new();
        assert!(scanner.start(config(0, 10, 1)).is_err());
        assert!(scanner.start(config(10, 5, 1)).is_err());
        assert!(scanner.start(config(1, 513, 1)).is_err());
        assert!(scanner.start(config(1, 10, 0)).is_err());
        assert!(!scanner.is_active());
    }
}
