// Library-Root: Wiederverwendbare Logik und Module
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von dmx-core
pub use dmx_core::{
    CommandError, CommandOutcome, DmxController, DmxError, DownlinkHandler, FixtureRegistry,
    UniverseBuffer,
};

use defmt::warn;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::Vec;

use crate::config::{DOWNLINK_PAYLOAD_SIZE, DOWNLINK_QUEUE_DEPTH};

// ============================================================================
// Gemeinsamer Zustand
// ============================================================================

/// Universe Buffer mit Critical-Section-Lock (auch aus Interrupts lesbar)
pub type Universe = UniverseBuffer<CriticalSectionRawMutex>;

/// Der eine DMX-Frame der Firmware
pub static UNIVERSE: Universe = UniverseBuffer::new();

// ============================================================================
// Downlink-Frames vom Funk-Transport
// ============================================================================

/// Ein empfangenes Downlink-Payload mit seinem Port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownlinkFrame {
    pub port: u8,
    pub payload: Vec<u8, DOWNLINK_PAYLOAD_SIZE>,
}

impl defmt::Format for DownlinkFrame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "port {} ({} bytes)", self.port, self.payload.len());
    }
}

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Statt:  Sender<'static, NoopRawMutex, DownlinkFrame, 4>
// Nutze:  DownlinkSender

/// Channel für rohe Downlinks (Transport/Button → DMX Task)
pub type DownlinkChannel = Channel<NoopRawMutex, DownlinkFrame, DOWNLINK_QUEUE_DEPTH>;

/// Sender für rohe Downlinks; das Einzige, was der Transport kennen muss
pub type DownlinkSender = Sender<'static, NoopRawMutex, DownlinkFrame, DOWNLINK_QUEUE_DEPTH>;

/// Receiver für rohe Downlinks (DMX Task empfängt)
pub type DownlinkReceiver = Receiver<'static, NoopRawMutex, DownlinkFrame, DOWNLINK_QUEUE_DEPTH>;

// ============================================================================
// DownlinkHandler für den Funk-Transport
// ============================================================================

/// Reicht Downlinks nicht-blockierend in den [`DownlinkChannel`] weiter
///
/// Der Transport ruft `on_downlink()` aus seinem eigenen Kontext auf und
/// darf dabei nicht warten. Ist die Queue voll, wird das Payload verworfen.
pub struct ChannelDownlink {
    sender: DownlinkSender,
}

impl ChannelDownlink {
    pub fn new(sender: DownlinkSender) -> Self {
        Self { sender }
    }
}

impl DownlinkHandler for ChannelDownlink {
    fn on_downlink(&mut self, port: u8, payload: &[u8]) {
        let Ok(payload) = Vec::from_slice(payload) else {
            warn!(
                "Downlink: payload too large ({} bytes), dropped",
                payload.len()
            );
            return;
        };
        if self.sender.try_send(DownlinkFrame { port, payload }).is_err() {
            warn!("Downlink: queue full, dropped frame on port {}", port);
        }
    }
}
