//! DMX Controller - verbindet Kommandos, Muster, Scanner und Transmitter
//!
//! Der Controller besitzt alles außer dem Universe Buffer, der als
//! gemeinsam genutzte Referenz hereinkommt. Er wird von genau einem Task
//! getrieben: `handle_downlink()`/`apply()` für Kommandos, `poll()` für den
//! periodischen Tick. Beide bekommen die aktuelle Zeit vom Aufrufer.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::color::{set_fixture_color, set_fixture_color_hsv8, set_manual_color};
use crate::fixtures::FixtureRegistry;
use crate::pattern::{PatternEngine, PatternKind, PatternOptions, TickOutcome};
use crate::protocol::{CommandError, DmxCommand, parse_command};
use crate::scanner::{AddressScanner, ScanStep};
use crate::traits::{DmxError, DmxPort};
use crate::transmitter::{DmxTransmitter, FrameStatus};
use crate::types::Rgbw;
use crate::universe::UniverseBuffer;

/// Mindestabstand zwischen zwei Refresh-Frames
pub const DEFAULT_FRAME_INTERVAL_MS: u32 = 25;

/// Einziger Downlink-Port, der Kommandos trägt
pub const DEFAULT_DOWNLINK_PORT: u8 = 1;

/// Was ein erfolgreich angewendetes Kommando bewirkt hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    /// Universe geändert, Frame sofort gesendet
    Sent(FrameStatus),
    PatternStarted(PatternKind),
    /// Muster und Scanner gestoppt
    Stopped,
    Configured,
    ScanStarted,
    /// Persistieren ist async und Sache des Aufrufers
    SaveRequested,
}

/// Ergebnis eines `poll()`-Durchlaufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    pub scan: Option<ScanStep>,
    pub pattern: TickOutcome,
    /// `None` wenn in diesem Durchlauf kein Frame fällig war
    pub frame: Option<Result<FrameStatus, DmxError>>,
}

pub struct DmxController<'a, R: RawMutex, P: DmxPort, D: DelayNs> {
    universe: &'a UniverseBuffer<R>,
    fixtures: FixtureRegistry,
    pattern: PatternEngine,
    scanner: AddressScanner,
    transmitter: DmxTransmitter<P, D>,
    frame_interval_ms: u32,
    last_frame_ms: Option<u64>,
    downlink_port: u8,
}

impl<'a, R: RawMutex, P: DmxPort, D: DelayNs> DmxController<'a, R, P, D> {
    pub fn new(
        universe: &'a UniverseBuffer<R>,
        fixtures: FixtureRegistry,
        transmitter: DmxTransmitter<P, D>,
    ) -> Self {
        Self {
            universe,
            fixtures,
            pattern: PatternEngine::new(),
            scanner: AddressScanner::new(),
            transmitter,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            last_frame_ms: None,
            downlink_port: DEFAULT_DOWNLINK_PORT,
        }
    }

    pub fn with_frame_interval(mut self, interval_ms: u32) -> Self {
        self.frame_interval_ms = interval_ms;
        self
    }

    pub fn with_downlink_port(mut self, port: u8) -> Self {
        self.downlink_port = port;
        self
    }

    pub fn universe(&self) -> &'a UniverseBuffer<R> {
        self.universe
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub fn fixtures_mut(&mut self) -> &mut FixtureRegistry {
        &mut self.fixtures
    }

    pub fn pattern(&self) -> &PatternEngine {
        &self.pattern
    }

    pub fn scanner(&self) -> &AddressScanner {
        &self.scanner
    }

    pub fn transmitter(&self) -> &DmxTransmitter<P, D> {
        &self.transmitter
    }

    pub fn transmitter_mut(&mut self) -> &mut DmxTransmitter<P, D> {
        &mut self.transmitter
    }

    /// Wendet ein validiertes Kommando an
    ///
    /// Schreibende Kommandos senden direkt danach einen Frame, damit die
    /// Änderung nicht erst beim nächsten Refresh sichtbar wird.
    pub fn apply(&mut self, command: DmxCommand, now_ms: u64) -> Result<CommandOutcome, CommandError> {
        match command {
            DmxCommand::Set { addr, values } => {
                self.universe.set_range(addr, &values)?;
                self.send(now_ms)
            }
            DmxCommand::Clear => {
                self.universe.clear()?;
                self.send(now_ms)
            }
            DmxCommand::StartPattern {
                kind,
                speed_ms,
                cycles,
                stagger,
                color,
            } => {
                self.scanner.stop();
                self.pattern.set_options(PatternOptions {
                    staggered: stagger,
                    strobe_color: color.unwrap_or(Rgbw::WHITE),
                });
                self.pattern.start(kind, speed_ms, cycles, now_ms);
                Ok(CommandOutcome::PatternStarted(self.pattern.kind()))
            }
            DmxCommand::Stop => {
                self.pattern.stop();
                self.scanner.stop();
                Ok(CommandOutcome::Stopped)
            }
            DmxCommand::Color { fixture, color } => {
                set_fixture_color(self.universe, &self.fixtures, fixture, color)?;
                self.send(now_ms)
            }
            DmxCommand::Manual { addr, color } => {
                set_manual_color(self.universe, addr, color)?;
                self.send(now_ms)
            }
            DmxCommand::Hsv {
                fixture,
                hue,
                saturation,
                value,
            } => {
                set_fixture_color_hsv8(
                    self.universe,
                    &self.fixtures,
                    fixture,
                    hue,
                    saturation,
                    value,
                )?;
                self.send(now_ms)
            }
            DmxCommand::Configure { fixtures, channels } => {
                self.fixtures.configure(fixtures, channels)?;
                Ok(CommandOutcome::Configured)
            }
            DmxCommand::Fixture {
                index,
                name,
                addr,
                red,
                green,
                blue,
                white,
            } => {
                self.fixtures
                    .set_fixture(index, &name, addr, red, green, blue, white)?;
                Ok(CommandOutcome::Configured)
            }
            DmxCommand::Scan(config) => {
                self.scanner.start(config)?;
                self.pattern.stop();
                Ok(CommandOutcome::ScanStarted)
            }
            DmxCommand::Save => Ok(CommandOutcome::SaveRequested),
        }
    }

    /// Parst und wendet ein Downlink-Payload an
    ///
    /// Einziger Port-Filter der Firmware: Payloads auf fremden Ports werden
    /// mit `IgnoredPort` verworfen, ohne geparst zu werden.
    pub fn handle_downlink(
        &mut self,
        port: u8,
        payload: &[u8],
        now_ms: u64,
    ) -> Result<CommandOutcome, CommandError> {
        if port != self.downlink_port {
            return Err(CommandError::IgnoredPort(port));
        }
        let command = parse_command(payload)?;
        self.apply(command, now_ms)
    }

    /// Periodischer Tick: Scanner → Muster → Refresh
    ///
    /// Ein Refresh-Frame geht raus, wenn weder Muster noch Kommando in den
    /// letzten `frame_interval_ms` gesendet haben.
    pub fn poll(&mut self, now_ms: u64) -> PollOutcome {
        let scan = if self.scanner.is_active() {
            // Busy: Schritt beim nächsten Poll nachholen
            self.scanner
                .step(now_ms, self.universe, &self.fixtures)
                .ok()
                .flatten()
        } else {
            None
        };

        let (pattern, mut frame) =
            self.pattern
                .tick(now_ms, self.universe, &self.fixtures, &mut self.transmitter);

        if frame.is_none() && self.refresh_due(now_ms) {
            frame = Some(self.transmitter.transmit(self.universe));
        }
        if frame.is_some() {
            self.last_frame_ms = Some(now_ms);
        }

        PollOutcome {
            scan,
            pattern,
            frame,
        }
    }

    fn refresh_due(&self, now_ms: u64) -> bool {
        match self.last_frame_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.frame_interval_ms as u64,
            None => true,
        }
    }

    fn send(&mut self, now_ms: u64) -> Result<CommandOutcome, CommandError> {
        let status = self.transmitter.transmit(self.universe)?;
        self.last_frame_ms = Some(now_ms);
        Ok(CommandOutcome::Sent(status))
    }
}
