//! DMX Core - plattformunabhängige Lichtsteuerung
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Leitung, Speicher und Funk-Transport kommen über Traits herein.

#![no_std]

pub mod color;
pub mod controller;
pub mod fixtures;
pub mod logic;
pub mod pattern;
pub mod persistence;
pub mod protocol;
pub mod scanner;
pub mod traits;
pub mod transmitter;
pub mod types;
pub mod universe;

// Re-exports für einfachen Zugriff
pub use color::{CycleMode, cycle_colors, set_fixture_color, set_manual_color};
pub use controller::{CommandOutcome, DmxController, PollOutcome};
pub use fixtures::{ConfigError, Fixture, FixtureRegistry};
pub use logic::{hsv_to_rgb, hsv8_to_rgb};
pub use pattern::{PatternEngine, PatternKind, TickOutcome};
pub use persistence::{PersistenceBridge, fill_default};
pub use protocol::{CommandError, DmxCommand, parse_command};
pub use scanner::{AddressScanner, ScanConfig, ScanStep};
pub use traits::{DmxError, DmxPort, DownlinkHandler, KeyValueStore, StoreError};
pub use transmitter::{DmxTransmitter, FrameStatus};
pub use types::{Frame, Rgbw, UNIVERSE_SIZE};
pub use universe::UniverseBuffer;
