//! DMX-512 Transmitter - Break + 513-Byte Frame über eine serielle Leitung
//!
//! Ohne dedizierte Break-Hardware wird der Break per Baudraten-Trick erzeugt:
//! ein 0x00-Byte bei ca. 1/3 der Datenrate hält die Leitung lange genug low.
//!
//! Timing bei 83 333 Baud:
//!
//! BREAK:             Start-Bit + 8 Null-Bits = 9 × 12 µs ≈ 108 µs (min. 92 µs)
//! MARK-AFTER-BREAK:  2 Stop-Bits             = 2 × 12 µs ≈  24 µs (min. 12 µs)

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::traits::{DmxError, DmxPort};
use crate::types::{Frame, START_CODE, UNIVERSE_SIZE};
use crate::universe::UniverseBuffer;

/// DMX-Datenrate (8N2)
pub const DMX_BAUD: u32 = 250_000;

/// Baudrate für das Break-Byte (≈ DMX_BAUD / 3)
pub const BREAK_BAUD: u32 = 83_333;

/// Pause nach jedem Frame bevor der nächste gesendet werden darf
pub const INTER_FRAME_GAP_US: u32 = 3_000;

/// Abweichungen bis zu diesem Wert pro Kanal gelten als Rauschen
pub const CHANGE_TOLERANCE: u8 = 5;

/// Ergebnis eines `transmit()`-Aufrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameStatus {
    /// Frame wurde gesendet; `changed` nur für Logging
    Sent { changed: bool },
    /// Leitung nicht initialisiert, Fehler wurde bereits gemeldet
    Inactive,
}

/// Besitzt Leitung, Delay und den zuletzt gesendeten Frame
///
/// Der Snapshot ist ein Feld der Instanz, so dass sich mehrere
/// Transmitter (z.B. in Tests) nicht gegenseitig beeinflussen.
pub struct DmxTransmitter<P: DmxPort, D: DelayNs> {
    port: Option<P>,
    delay: D,
    last_sent: Frame,
    init_error_reported: bool,
    frames_sent: u32,
}

impl<P: DmxPort, D: DelayNs> DmxTransmitter<P, D> {
    /// `port` ist `None` wenn die UART-Initialisierung fehlgeschlagen ist
    pub fn new(port: Option<P>, delay: D) -> Self {
        Self {
            port,
            delay,
            last_sent: [0; UNIVERSE_SIZE],
            init_error_reported: false,
            frames_sent: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.port.is_some()
    }

    /// Setzt eine neu initialisierte Leitung ein
    pub fn reinit(&mut self, port: P) {
        self.port = Some(port);
        self.init_error_reported = false;
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn last_sent(&self) -> &Frame {
        &self.last_sent
    }

    /// Sendet den aktuellen Universe-Inhalt als einen DMX-Frame
    ///
    /// Der Universe-Lock wird nur für die Kopie gehalten, nicht während
    /// der blockierenden Übertragung.
    ///
    /// # Fehlerbehandlung
    /// - Ohne Leitung: einmalig `Err(NotInitialized)`, danach `Ok(Inactive)`
    /// - Lock belegt: `Err(Busy)`, der Frame wird übersprungen
    pub fn transmit<R: RawMutex>(
        &mut self,
        universe: &UniverseBuffer<R>,
    ) -> Result<FrameStatus, DmxError> {
        let Some(port) = self.port.as_mut() else {
            if self.init_error_reported {
                return Ok(FrameStatus::Inactive);
            }
            self.init_error_reported = true;
            return Err(DmxError::NotInitialized);
        };

        let frame = universe.snapshot()?;
        send_frame(port, &mut self.delay, &frame)?;

        let changed = frame_changed(&self.last_sent, &frame, CHANGE_TOLERANCE);
        self.last_sent = frame;
        self.frames_sent = self.frames_sent.wrapping_add(1);
        Ok(FrameStatus::Sent { changed })
    }
}

/// Break, Mark-after-Break, 513 Bytes, Inter-Frame-Gap
fn send_frame<P: DmxPort, D: DelayNs>(
    port: &mut P,
    delay: &mut D,
    frame: &Frame,
) -> Result<(), DmxError> {
    debug_assert_eq!(frame[0], START_CODE);

    port.set_transmit(true)?;

    port.set_baudrate(BREAK_BAUD)?;
    port.write_all(&[0x00])?;
    port.flush()?;

    port.set_baudrate(DMX_BAUD)?;
    port.write_all(frame)?;
    port.flush()?;

    delay.delay_us(INTER_FRAME_GAP_US);
    Ok(())
}

/// `true` wenn mindestens ein Kanal um mehr als `tolerance` abweicht
pub fn frame_changed(previous: &Frame, current: &Frame, tolerance: u8) -> bool {
    previous
        .iter()
        .zip(current.iter())
        .any(|(a, b)| a.abs_diff(*b) > tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_changed_ignores_noise() {
        let a = [0u8; UNIVERSE_SIZE];
        let mut b = a;
        b[10] = CHANGE_TOLERANCE;
        assert!(!frame_changed(&a, &b, CHANGE_TOLERANCE));
        b[11] = CHANGE_TOLERANCE + 1;
        assert!(frame_changed(&a, &b, CHANGE_TOLERANCE));
    }

    #[test]
    fn test_break_baud_is_roughly_a_third() {
        assert!(BREAK_BAUD * 3 <= DMX_BAUD);
        assert!(BREAK_BAUD * 3 >= DMX_BAUD - 3);
    }
}
