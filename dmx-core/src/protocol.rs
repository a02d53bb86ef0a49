//! Downlink-Protokoll - JSON-Kommandos vom Funk-Transport
//!
//! Jedes Payload ist ein JSON-Objekt mit einem `cmd`-Feld, z.B.
//! `{"cmd":"set","addr":1,"values":[255,0,0]}` oder
//! `{"cmd":"rainbow","speed":40,"stagger":true}`.
//!
//! Hinweis: serde-json-core kennt keine getaggten Enums mit Feldern, daher
//! wird zuerst in ein flaches `RawCommand` geparst und dann validiert.

use heapless::Vec;
use serde::Deserialize;

use crate::fixtures::{ConfigError, FixtureName};
use crate::pattern::PatternKind;
use crate::scanner::{DEFAULT_SCAN_INTERVAL_MS, ScanConfig};
use crate::traits::DmxError;
use crate::types::Rgbw;

/// Maximale Anzahl Werte in einem `set`-Kommando; weitere werden verworfen
pub const MAX_SET_VALUES: usize = 32;

/// Obergrenze beim Parsen von `values`
///
/// Mehr Werte passen nicht in ein 222-Byte Downlink-Payload.
const MAX_RAW_SET_VALUES: usize = 128;

/// Standard-Tick-Intervall für Muster ohne `speed`
pub const DEFAULT_PATTERN_SPEED_MS: u32 = 50;

/// Fehler beim Verarbeiten eines Downlink-Kommandos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// JSON ungültig, Pflichtfeld fehlt oder Wert außerhalb des Bereichs
    Malformed,
    UnknownCommand,
    /// Payload kam auf einem Port an, der keine Kommandos trägt
    IgnoredPort(u8),
    Config(ConfigError),
    Dmx(DmxError),
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl From<DmxError> for CommandError {
    fn from(e: DmxError) -> Self {
        CommandError::Dmx(e)
    }
}

/// Validiertes Kommando
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxCommand {
    Set {
        addr: u16,
        values: Vec<u8, MAX_SET_VALUES>,
    },
    Clear,
    StartPattern {
        kind: PatternKind,
        speed_ms: u32,
        cycles: u32,
        stagger: bool,
        color: Option<Rgbw>,
    },
    Stop,
    Color {
        fixture: usize,
        color: Rgbw,
    },
    Manual {
        addr: u16,
        color: Rgbw,
    },
    Hsv {
        fixture: usize,
        hue: u8,
        saturation: u8,
        value: u8,
    },
    Configure {
        fixtures: usize,
        channels: u8,
    },
    Fixture {
        index: usize,
        name: FixtureName,
        addr: u16,
        red: u16,
        green: u16,
        blue: u16,
        white: Option<u16>,
    },
    Scan(ScanConfig),
    Save,
}

/// Flache JSON-Repräsentation aller Kommandos
#[derive(Debug, Deserialize)]
struct RawCommand<'a> {
    cmd: &'a str,
    #[serde(default)]
    addr: Option<u16>,
    #[serde(default)]
    values: Option<Vec<u8, MAX_RAW_SET_VALUES>>,
    #[serde(default)]
    speed: Option<u32>,
    #[serde(default)]
    cycles: Option<u32>,
    #[serde(default)]
    stagger: Option<bool>,
    #[serde(default)]
    fixture: Option<u8>,
    #[serde(default)]
    index: Option<u8>,
    #[serde(default, borrow)]
    name: Option<&'a str>,
    #[serde(default)]
    r: Option<u16>,
    #[serde(default)]
    g: Option<u16>,
    #[serde(default)]
    b: Option<u16>,
    #[serde(default)]
    w: Option<u16>,
    #[serde(default)]
    h: Option<u8>,
    #[serde(default)]
    s: Option<u8>,
    #[serde(default)]
    v: Option<u8>,
    #[serde(default)]
    fixtures: Option<u8>,
    #[serde(default)]
    channels: Option<u8>,
    #[serde(default)]
    start: Option<u16>,
    #[serde(default)]
    end: Option<u16>,
    #[serde(default)]
    step: Option<u16>,
    #[serde(default)]
    anchor: Option<u8>,
}

impl RawCommand<'_> {
    /// Farbe aus r/g/b/w; fehlende Komponenten sind 0, Werte > 255 ungültig
    fn color(&self) -> Result<Rgbw, CommandError> {
        Ok(Rgbw::new(
            color_component(self.r)?,
            color_component(self.g)?,
            color_component(self.b)?,
            color_component(self.w)?,
        ))
    }

    fn has_color(&self) -> bool {
        self.r.is_some() || self.g.is_some() || self.b.is_some() || self.w.is_some()
    }

    fn pattern(&self, kind: PatternKind) -> Result<DmxCommand, CommandError> {
        let color = if self.has_color() {
            Some(self.color()?)
        } else {
            None
        };
        Ok(DmxCommand::StartPattern {
            kind,
            speed_ms: self.speed.unwrap_or(DEFAULT_PATTERN_SPEED_MS),
            cycles: self.cycles.unwrap_or(0),
            stagger: self.stagger.unwrap_or(false),
            color,
        })
    }
}

fn color_component(value: Option<u16>) -> Result<u8, CommandError> {
    u8::try_from(value.unwrap_or(0)).map_err(|_| CommandError::Malformed)
}

/// Übernimmt höchstens `MAX_SET_VALUES` Werte, der Rest wird verworfen
fn clamped_values(values: &[u8]) -> Result<Vec<u8, MAX_SET_VALUES>, CommandError> {
    let len = values.len().min(MAX_SET_VALUES);
    Vec::from_slice(&values[..len]).map_err(|_| CommandError::Malformed)
}

fn required<T>(value: Option<T>) -> Result<T, CommandError> {
    value.ok_or(CommandError::Malformed)
}

/// Parst ein Downlink-Payload in ein validiertes Kommando
pub fn parse_command(payload: &[u8]) -> Result<DmxCommand, CommandError> {
    let (raw, _) = serde_json_core::from_slice::<RawCommand<'_>>(payload)
        .map_err(|_| CommandError::Malformed)?;

    match raw.cmd {
        "set" => Ok(DmxCommand::Set {
            addr: required(raw.addr)?,
            values: clamped_values(required(raw.values.as_ref())?)?,
        }),
        "clear" => Ok(DmxCommand::Clear),
        "colorfade" => raw.pattern(PatternKind::ColorFade),
        "rainbow" => raw.pattern(PatternKind::Rainbow),
        "strobe" => raw.pattern(PatternKind::Strobe),
        "chase" => raw.pattern(PatternKind::Chase),
        "alternate" => raw.pattern(PatternKind::Alternate),
        "stop" => Ok(DmxCommand::Stop),
        "color" => Ok(DmxCommand::Color {
            fixture: required(raw.fixture)? as usize,
            color: raw.color()?,
        }),
        "manual" => Ok(DmxCommand::Manual {
            addr: required(raw.addr)?,
            color: raw.color()?,
        }),
        "hsv" => Ok(DmxCommand::Hsv {
            fixture: required(raw.fixture)? as usize,
            hue: required(raw.h)?,
            saturation: raw.s.unwrap_or(255),
            value: raw.v.unwrap_or(255),
        }),
        "config" => Ok(DmxCommand::Configure {
            fixtures: required(raw.fixtures)? as usize,
            channels: required(raw.channels)?,
        }),
        "fixture" => {
            let mut name = FixtureName::new();
            for c in raw.name.unwrap_or("").chars() {
                if name.push(c).is_err() {
                    break;
                }
            }
            Ok(DmxCommand::Fixture {
                index: required(raw.index)? as usize,
                name,
                addr: required(raw.addr)?,
                red: required(raw.r)?,
                green: required(raw.g)?,
                blue: required(raw.b)?,
                white: raw.w,
            })
        }
        "scan" => Ok(DmxCommand::Scan(ScanConfig {
            start: raw.start.unwrap_or(1),
            end: raw.end.unwrap_or(crate::types::MAX_ADDRESS),
            step: raw.step.unwrap_or(1),
            anchor: raw.anchor.map(|a| a as usize),
            interval_ms: raw.speed.unwrap_or(DEFAULT_SCAN_INTERVAL_MS),
        })),
        "save" => Ok(DmxCommand::Save),
        _ => Err(CommandError::UnknownCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let cmd = parse_command(br#"{"cmd":"set","addr":500,"values":[1,2,3,4]}"#).unwrap();
        match cmd {
            DmxCommand::Set { addr, values } => {
                assert_eq!(addr, 500);
                assert_eq!(values.as_slice(), &[1, 2, 3, 4]);
            }
            _ => panic!("Expected Set variant"),
        }
    }

    #[test]
    fn test_parse_pattern_defaults() {
        let cmd = parse_command(br#"{"cmd":"strobe"}"#).unwrap();
        assert_eq!(
            cmd,
            DmxCommand::StartPattern {
                kind: PatternKind::Strobe,
                speed_ms: DEFAULT_PATTERN_SPEED_MS,
                cycles: 0,
                stagger: false,
                color: None,
            }
        );
    }

    #[test]
    fn test_parse_rainbow_with_options() {
        let cmd = parse_command(br#"{"cmd":"rainbow","speed":20,"cycles":10,"stagger":true}"#)
            .unwrap();
        assert_eq!(
            cmd,
            DmxCommand::StartPattern {
                kind: PatternKind::Rainbow,
                speed_ms: 20,
                cycles: 10,
                stagger: true,
                color: None,
            }
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_command(br#"{"cmd":"disco"}"#),
            Err(CommandError::UnknownCommand)
        );
    }

    #[test]
    fn test_parse_malformed_payloads() {
        assert_eq!(parse_command(b"not json"), Err(CommandError::Malformed));
        assert_eq!(parse_command(br#"{"addr":1}"#), Err(CommandError::Malformed));
        assert_eq!(
            parse_command(br#"{"cmd":"set","addr":1}"#),
            Err(CommandError::Malformed)
        );
        assert_eq!(
            parse_command(br#"{"cmd":"set","addr":1,"values":[256]}"#),
            Err(CommandError::Malformed)
        );
        assert_eq!(
            parse_command(br#"{"cmd":"color","fixture":0,"r":300}"#),
            Err(CommandError::Malformed)
        );
    }

    #[test]
    fn test_parse_too_many_values_keeps_first_32() {
        let payload = br#"{"cmd":"set","addr":1,"values":[0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32,33]}"#;
        match parse_command(payload).unwrap() {
            DmxCommand::Set { addr, values } => {
                assert_eq!(addr, 1);
                assert_eq!(values.len(), MAX_SET_VALUES);
                assert_eq!(values[0], 0);
                assert_eq!(values[31], 31);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_fixture_descriptor() {
        let cmd = parse_command(
            br#"{"cmd":"fixture","index":1,"name":"Spot","addr":9,"r":9,"g":10,"b":11,"w":12}"#,
        )
        .unwrap();
        match cmd {
            DmxCommand::Fixture {
                index,
                name,
                addr,
                white,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(name.as_str(), "Spot");
                assert_eq!(addr, 9);
                assert_eq!(white, Some(12));
            }
            _ => panic!("Expected Fixture variant"),
        }
    }

    #[test]
    fn test_parse_scan_defaults() {
        let cmd = parse_command(br#"{"cmd":"scan","start":1,"end":64,"step":4,"anchor":0}"#)
            .unwrap();
        assert_eq!(
            cmd,
            DmxCommand::Scan(ScanConfig {
                start: 1,
                end: 64,
                step: 4,
                anchor: Some(0),
                interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            })
        );
    }
}
