//! Pattern Engine - kleine State Machine für autonome Farbmuster
//!
//! `None` ist der Ruhezustand. `start()` wechselt in ein Muster, `tick()`
//! rendert zeitgesteuert in den Universe Buffer und sendet danach einen
//! Frame. `stop()` oder ein erschöpftes Zyklus-Budget führen zurück nach
//! `None`.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::color::paint_fixture;
use crate::fixtures::FixtureRegistry;
use crate::logic::hsv8_to_rgb;
use crate::traits::{DmxError, DmxPort};
use crate::transmitter::{DmxTransmitter, FrameStatus};
use crate::types::{CHANNEL_COUNT, Rgbw};
use crate::universe::{Channels, UniverseBuffer};

/// Kanäle pro Gruppe wenn keine Fixtures konfiguriert sind
pub const RAW_GROUP_SIZE: usize = 4;

/// Anzahl 4-Kanal-Gruppen im Universe
pub const RAW_GROUP_COUNT: usize = CHANNEL_COUNT / RAW_GROUP_SIZE;

/// Schrittweite der Fade-Rampe (255 ist ein Vielfaches davon)
pub const FADE_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternKind {
    #[default]
    None,
    ColorFade,
    Rainbow,
    Strobe,
    Chase,
    Alternate,
}

impl PatternKind {
    pub const fn name(self) -> &'static str {
        match self {
            PatternKind::None => "none",
            PatternKind::ColorFade => "colorfade",
            PatternKind::Rainbow => "rainbow",
            PatternKind::Strobe => "strobe",
            PatternKind::Chase => "chase",
            PatternKind::Alternate => "alternate",
        }
    }
}

/// Persistente Zähler der einzelnen Generatoren
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternCounters {
    pub fade: u8,
    pub fade_rising: bool,
    pub hue: u8,
    pub strobe_on: bool,
    pub chase_position: usize,
    pub alternate_parity: bool,
}

impl PatternCounters {
    pub const fn new() -> Self {
        Self {
            fade: 0,
            fade_rising: true,
            hue: 0,
            strobe_on: false,
            chase_position: 0,
            alternate_parity: false,
        }
    }
}

impl Default for PatternCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternState {
    pub kind: PatternKind,
    pub start_time_ms: u64,
    pub last_tick_ms: u64,
    pub tick_interval_ms: u32,
    pub cycles_completed: u32,
    /// 0 = unbegrenzt
    pub max_cycles: u32,
    pub counters: PatternCounters,
}

/// Einstellungen die über `start()` hinweg erhalten bleiben
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternOptions {
    /// Rainbow: Farbton pro Fixture versetzen (Lauflicht-Regenbogen)
    pub staggered: bool,
    /// Strobe: Farbe im "an"-Zustand
    pub strobe_color: Rgbw,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            staggered: false,
            strobe_color: Rgbw::WHITE,
        }
    }
}

/// Ergebnis eines Ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Kein Muster aktiv
    Idle,
    /// Intervall noch nicht abgelaufen
    Waiting,
    /// Universe war gesperrt, nächster Versuch beim nächsten Tick
    Skipped,
    /// Muster gerendert; `finished` wenn das Zyklus-Budget erschöpft ist
    Rendered { finished: bool },
}

/// Ziel-Gruppen eines Musters: konfigurierte Fixtures oder rohe 4-Kanal-Blöcke
enum Targets<'a> {
    Fixtures(&'a FixtureRegistry),
    Raw,
}

impl<'a> Targets<'a> {
    fn for_registry(fixtures: &'a FixtureRegistry) -> Self {
        if fixtures.is_empty() {
            Targets::Raw
        } else {
            Targets::Fixtures(fixtures)
        }
    }

    fn count(&self) -> usize {
        match self {
            Targets::Fixtures(fixtures) => fixtures.len(),
            Targets::Raw => RAW_GROUP_COUNT,
        }
    }

    fn paint(&self, channels: &mut Channels<'_>, group: usize, color: Rgbw) {
        match self {
            Targets::Fixtures(fixtures) => {
                if let Some(fixture) = fixtures.get(group) {
                    paint_fixture(channels, fixture, color);
                }
            }
            Targets::Raw => paint_raw_group(channels, group, color),
        }
    }
}

fn paint_raw_group(channels: &mut Channels<'_>, group: usize, color: Rgbw) {
    let base = (group * RAW_GROUP_SIZE + 1) as u16;
    let _ = channels.set_range(base, &color.to_array());
}

#[derive(Debug, Default)]
pub struct PatternEngine {
    state: PatternState,
    options: PatternOptions,
}

impl PatternEngine {
    pub const fn new() -> Self {
        Self {
            state: PatternState {
                kind: PatternKind::None,
                start_time_ms: 0,
                last_tick_ms: 0,
                tick_interval_ms: 0,
                cycles_completed: 0,
                max_cycles: 0,
                counters: PatternCounters::new(),
            },
            options: PatternOptions {
                staggered: false,
                strobe_color: Rgbw::WHITE,
            },
        }
    }

    pub fn state(&self) -> &PatternState {
        &self.state
    }

    pub fn kind(&self) -> PatternKind {
        self.state.kind
    }

    pub fn is_running(&self) -> bool {
        self.state.kind != PatternKind::None
    }

    pub fn options(&self) -> &PatternOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PatternOptions) {
        self.options = options;
    }

    /// Startet ein Muster; Zähler werden zurückgesetzt
    ///
    /// Der erste Tick rendert frühestens `tick_interval_ms` nach `now_ms`.
    pub fn start(&mut self, kind: PatternKind, tick_interval_ms: u32, max_cycles: u32, now_ms: u64) {
        if kind == PatternKind::None {
            self.stop();
            return;
        }
        self.state = PatternState {
            kind,
            start_time_ms: now_ms,
            last_tick_ms: now_ms,
            tick_interval_ms,
            cycles_completed: 0,
            max_cycles,
            counters: PatternCounters::new(),
        };
    }

    /// Beliebiger Zustand → `None`, Zähler gelöscht
    pub fn stop(&mut self) {
        self.state = PatternState::default();
    }

    /// Rendert das aktive Muster falls das Intervall abgelaufen ist
    ///
    /// Hält den Universe-Lock nur während der Schreibzugriffe. Sendet
    /// selbst nicht; siehe [`PatternEngine::tick`].
    pub fn advance<R: RawMutex>(
        &mut self,
        now_ms: u64,
        universe: &UniverseBuffer<R>,
        fixtures: &FixtureRegistry,
    ) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Idle;
        }
        if now_ms.saturating_sub(self.state.last_tick_ms) < self.state.tick_interval_ms as u64 {
            return TickOutcome::Waiting;
        }

        let kind = self.state.kind;
        let options = self.options;
        let counters = &mut self.state.counters;
        let targets = Targets::for_registry(fixtures);

        let rendered = universe.modify(|channels| match kind {
            PatternKind::None => {}
            PatternKind::ColorFade => render_color_fade(channels, counters),
            PatternKind::Rainbow => render_rainbow(channels, &targets, counters, options.staggered),
            PatternKind::Strobe => render_strobe(channels, &targets, counters, options.strobe_color),
            PatternKind::Chase => render_chase(channels, &targets, counters),
            PatternKind::Alternate => render_alternate(channels, &targets, counters),
        });
        if rendered.is_err() {
            return TickOutcome::Skipped;
        }

        self.state.last_tick_ms = now_ms;
        self.state.cycles_completed = self.state.cycles_completed.saturating_add(1);

        let finished =
            self.state.max_cycles > 0 && self.state.cycles_completed >= self.state.max_cycles;
        if finished {
            self.stop();
        }
        TickOutcome::Rendered { finished }
    }

    /// `advance()` plus Frame-Versand nach jedem gerenderten Schritt
    ///
    /// Der Transmit läuft erst nachdem der Universe-Lock freigegeben ist.
    pub fn tick<R: RawMutex, P: DmxPort, D: DelayNs>(
        &mut self,
        now_ms: u64,
        universe: &UniverseBuffer<R>,
        fixtures: &FixtureRegistry,
        transmitter: &mut DmxTransmitter<P, D>,
    ) -> (TickOutcome, Option<Result<FrameStatus, DmxError>>) {
        let outcome = self.advance(now_ms, universe, fixtures);
        let frame = match outcome {
            TickOutcome::Rendered { .. } => Some(transmitter.transmit(universe)),
            _ => None,
        };
        (outcome, frame)
    }
}

/// Ping-Pong 0 → 255 → 0 als (fade, 255-fade, 0, 0) auf allen 4-Kanal-Gruppen
fn render_color_fade(channels: &mut Channels<'_>, counters: &mut PatternCounters) {
    let fade = counters.fade;
    let color = Rgbw::new(fade, 255 - fade, 0, 0);
    for group in 0..RAW_GROUP_COUNT {
        paint_raw_group(channels, group, color);
    }

    if counters.fade_rising {
        counters.fade = fade.saturating_add(FADE_STEP);
        if counters.fade == u8::MAX {
            counters.fade_rising = false;
        }
    } else {
        counters.fade = fade.saturating_sub(FADE_STEP);
        if counters.fade == 0 {
            counters.fade_rising = true;
        }
    }
}

fn render_rainbow(
    channels: &mut Channels<'_>,
    targets: &Targets<'_>,
    counters: &mut PatternCounters,
    staggered: bool,
) {
    let count = targets.count();
    for group in 0..count {
        let offset = if staggered {
            (group * 256 / count) as u8
        } else {
            0
        };
        let hue = counters.hue.wrapping_add(offset);
        targets.paint(channels, group, hsv8_to_rgb(hue, 255, 255).into());
    }
    counters.hue = counters.hue.wrapping_add(1);
}

fn render_strobe(
    channels: &mut Channels<'_>,
    targets: &Targets<'_>,
    counters: &mut PatternCounters,
    on_color: Rgbw,
) {
    counters.strobe_on = !counters.strobe_on;
    let color = if counters.strobe_on {
        on_color
    } else {
        Rgbw::BLACK
    };
    for group in 0..targets.count() {
        targets.paint(channels, group, color);
    }
}

fn render_chase(channels: &mut Channels<'_>, targets: &Targets<'_>, counters: &mut PatternCounters) {
    let count = targets.count();
    let lit = counters.chase_position % count;
    for group in 0..count {
        let color = if group == lit { Rgbw::WHITE } else { Rgbw::BLACK };
        targets.paint(channels, group, color);
    }
    counters.chase_position = (lit + 1) % count;
}

fn render_alternate(
    channels: &mut Channels<'_>,
    targets: &Targets<'_>,
    counters: &mut PatternCounters,
) {
    let parity = counters.alternate_parity as usize;
    for group in 0..targets.count() {
        let color = if group % 2 == parity {
            Rgbw::WHITE
        } else {
            Rgbw::BLACK
        };
        targets.paint(channels, group, color);
    }
    counters.alternate_parity = !counters.alternate_parity;
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn setup(count: usize) -> (UniverseBuffer<NoopRawMutex>, FixtureRegistry) {
        let mut fixtures = FixtureRegistry::new();
        if count > 0 {
            fixtures.configure(count, 4).unwrap();
        }
        (UniverseBuffer::new(), fixtures)
    }

    #[test]
    fn test_idle_engine_does_not_touch_buffer() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        assert_eq!(engine.advance(1_000, &universe, &fixtures), TickOutcome::Idle);
        assert!(universe.channel_data().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_tick_is_rate_limited() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::Chase, 100, 0, 0);

        assert_eq!(engine.advance(99, &universe, &fixtures), TickOutcome::Waiting);
        assert_eq!(
            engine.advance(100, &universe, &fixtures),
            TickOutcome::Rendered { finished: false }
        );
        assert_eq!(engine.advance(150, &universe, &fixtures), TickOutcome::Waiting);
    }

    #[test]
    fn test_max_cycles_auto_stop() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::Strobe, 100, 3, 0);

        for t in [100, 200] {
            assert_eq!(
                engine.advance(t, &universe, &fixtures),
                TickOutcome::Rendered { finished: false }
            );
        }
        assert_eq!(
            engine.advance(300, &universe, &fixtures),
            TickOutcome::Rendered { finished: true }
        );
        assert_eq!(engine.kind(), PatternKind::None);
        assert_eq!(engine.state().cycles_completed, 0);

        let before = universe.snapshot().unwrap();
        assert_eq!(engine.advance(400, &universe, &fixtures), TickOutcome::Idle);
        assert_eq!(universe.snapshot().unwrap(), before);
    }

    #[test]
    fn test_color_fade_ping_pong() {
        let (universe, fixtures) = setup(0);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::ColorFade, 0, 0, 0);

        engine.advance(0, &universe, &fixtures);
        assert_eq!(universe.get_channel(1), 0);
        assert_eq!(universe.get_channel(2), 255);

        // 51 Schritte bis 255, dann wieder abwärts
        for t in 1..=51 {
            engine.advance(t, &universe, &fixtures);
        }
        assert_eq!(universe.get_channel(1), 255);
        assert_eq!(universe.get_channel(510), 0);
        assert!(!engine.state().counters.fade_rising);

        engine.advance(52, &universe, &fixtures);
        assert_eq!(universe.get_channel(509), 250);
        assert_eq!(universe.get_channel(510), 5);
    }

    #[test]
    fn test_rainbow_staggered_offsets_hue() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        engine.set_options(PatternOptions {
            staggered: true,
            ..PatternOptions::default()
        });
        engine.start(PatternKind::Rainbow, 0, 0, 0);
        engine.advance(0, &universe, &fixtures);

        // Fixture 0: Hue 0 = Rot, Fixture 1: Hue 128 ≈ Cyan
        assert_eq!(universe.get_channel(1), 255);
        assert_eq!(universe.get_channel(2), 0);
        assert!(universe.get_channel(5) < 10);
        assert!(universe.get_channel(6) > 240);
        assert_eq!(engine.state().counters.hue, 1);
    }

    #[test]
    fn test_strobe_toggles_and_uses_color() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        engine.set_options(PatternOptions {
            strobe_color: Rgbw::new(1, 2, 3, 4),
            ..PatternOptions::default()
        });
        engine.start(PatternKind::Strobe, 0, 0, 0);

        engine.advance(0, &universe, &fixtures);
        assert_eq!(universe.get_channel(8), 4);
        engine.advance(1, &universe, &fixtures);
        assert_eq!(universe.get_channel(8), 0);
    }

    #[test]
    fn test_chase_moves_single_lit_group() {
        let (universe, fixtures) = setup(3);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::Chase, 0, 0, 0);

        for (t, lit_base) in [(0u64, 1u16), (1, 5), (2, 9), (3, 1)] {
            engine.advance(t, &universe, &fixtures);
            for base in [1u16, 5, 9] {
                let expected = if base == lit_base { 255 } else { 0 };
                assert_eq!(universe.get_channel(base), expected, "t={} base={}", t, base);
            }
        }
    }

    #[test]
    fn test_alternate_flips_parity() {
        let (universe, fixtures) = setup(4);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::Alternate, 0, 0, 0);

        engine.advance(0, &universe, &fixtures);
        assert_eq!(universe.get_channel(1), 255);
        assert_eq!(universe.get_channel(5), 0);
        assert_eq!(universe.get_channel(9), 255);

        engine.advance(1, &universe, &fixtures);
        assert_eq!(universe.get_channel(1), 0);
        assert_eq!(universe.get_channel(5), 255);
        assert_eq!(universe.get_channel(13), 255);
    }

    #[test]
    fn test_start_resets_counters() {
        let (universe, fixtures) = setup(2);
        let mut engine = PatternEngine::new();
        engine.start(PatternKind::Rainbow, 0, 0, 0);
        engine.advance(0, &universe, &fixtures);
        engine.advance(1, &universe, &fixtures);
        assert_eq!(engine.state().counters.hue, 2);

        engine.start(PatternKind::Rainbow, 10, 5, 100);
        assert_eq!(engine.state().counters, PatternCounters::new());
        assert_eq!(engine.state().start_time_ms, 100);
        assert_eq!(engine.state().cycles_completed, 0);
    }
}
