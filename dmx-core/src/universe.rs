//! Universe Buffer - der 513-Byte DMX-Frame hinter einem Lock
//!
//! Einzige Quelle der Wahrheit für den Ausgabezustand. Jede öffentliche
//! Methode nimmt den Lock nur für die Dauer des Aufrufs.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::traits::DmxError;
use crate::types::{CHANNEL_COUNT, Frame, MAX_ADDRESS, START_CODE, UNIVERSE_SIZE};

/// Lock-geschützter DMX-Frame
///
/// `R` ist der Raw-Mutex: `CriticalSectionRawMutex` auf dem ESP32,
/// `NoopRawMutex` in Single-Thread-Tests.
pub struct UniverseBuffer<R: RawMutex> {
    frame: Mutex<R, RefCell<Frame>>,
}

impl<R: RawMutex> UniverseBuffer<R> {
    /// Erstellt einen dunklen Frame (alle Bytes 0, Start-Code 0)
    pub const fn new() -> Self {
        Self {
            frame: Mutex::new(RefCell::new([0; UNIVERSE_SIZE])),
        }
    }

    /// Führt `f` mit exklusivem Zugriff auf die Kanäle aus
    ///
    /// Ist der Frame bereits ausgeliehen (reentranter Aufruf), wird nicht
    /// gewartet sondern `DmxError::Busy` zurückgegeben.
    pub fn modify<T>(&self, f: impl FnOnce(&mut Channels<'_>) -> T) -> Result<T, DmxError> {
        self.frame.lock(|cell| {
            let mut frame = cell.try_borrow_mut().map_err(|_| DmxError::Busy)?;
            Ok(f(&mut Channels { frame: &mut frame }))
        })
    }

    /// Setzt alle Kanäle und den Start-Code auf 0
    pub fn clear(&self) -> Result<(), DmxError> {
        self.frame.lock(|cell| {
            let mut frame = cell.try_borrow_mut().map_err(|_| DmxError::Busy)?;
            frame.fill(0);
            frame[0] = START_CODE;
            Ok(())
        })
    }

    pub fn set_channel(&self, index: u16, value: u8) -> Result<(), DmxError> {
        self.modify(|channels| channels.set(index, value))?
    }

    /// Liest einen Kanal; 0 für ungültige Adressen oder belegten Lock
    pub fn get_channel(&self, index: u16) -> u8 {
        self.modify(|channels| channels.get(index)).unwrap_or(0)
    }

    /// Schreibt `values` ab `start`; gibt die Anzahl geschriebener Werte zurück
    pub fn set_range(&self, start: u16, values: &[u8]) -> Result<usize, DmxError> {
        self.modify(|channels| channels.set_range(start, values))?
    }

    /// Kopie des kompletten Frames (Start-Code garantiert 0)
    pub fn snapshot(&self) -> Result<Frame, DmxError> {
        self.frame.lock(|cell| {
            let frame = cell.try_borrow().map_err(|_| DmxError::Busy)?;
            let mut copy = *frame;
            copy[0] = START_CODE;
            Ok(copy)
        })
    }

    /// Kopie der 512 Kanalwerte ohne Start-Code (Persistenz-Layout)
    pub fn channel_data(&self) -> Result<[u8; CHANNEL_COUNT], DmxError> {
        let frame = self.snapshot()?;
        let mut data = [0u8; CHANNEL_COUNT];
        data.copy_from_slice(&frame[1..]);
        Ok(data)
    }
}

impl<R: RawMutex> Default for UniverseBuffer<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Schreib-Ansicht auf die Kanäle 1..=512 eines gesperrten Frames
///
/// Index 0 (Start-Code) ist über diese Ansicht nicht erreichbar.
pub struct Channels<'a> {
    frame: &'a mut Frame,
}

impl Channels<'_> {
    pub fn set(&mut self, index: u16, value: u8) -> Result<(), DmxError> {
        if !is_valid_address(index) {
            return Err(DmxError::OutOfRange);
        }
        self.frame[index as usize] = value;
        Ok(())
    }

    pub fn get(&self, index: u16) -> u8 {
        if is_valid_address(index) {
            self.frame[index as usize]
        } else {
            0
        }
    }

    /// Werte jenseits von Kanal 512 werden verworfen (kein Wrap-Around)
    pub fn set_range(&mut self, start: u16, values: &[u8]) -> Result<usize, DmxError> {
        if !is_valid_address(start) {
            return Err(DmxError::OutOfRange);
        }
        let start = start as usize;
        let len = values.len().min(UNIVERSE_SIZE - start);
        self.frame[start..start + len].copy_from_slice(&values[..len]);
        Ok(len)
    }

    /// Setzt alle 512 Kanäle auf denselben Wert
    pub fn fill(&mut self, value: u8) {
        self.frame[1..].fill(value);
    }
}

pub const fn is_valid_address(index: u16) -> bool {
    index >= 1 && index <= MAX_ADDRESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_set_and_get_channel() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        universe.set_channel(1, 42).unwrap();
        universe.set_channel(512, 7).unwrap();
        assert_eq!(universe.get_channel(1), 42);
        assert_eq!(universe.get_channel(512), 7);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        assert_eq!(universe.set_channel(0, 99), Err(DmxError::OutOfRange));
        assert_eq!(universe.set_channel(513, 99), Err(DmxError::OutOfRange));
        assert_eq!(universe.get_channel(0), 0);
        assert_eq!(universe.get_channel(513), 0);
        assert_eq!(universe.snapshot().unwrap(), [0u8; UNIVERSE_SIZE]);
    }

    #[test]
    fn test_set_range_drops_overflow() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let written = universe.set_range(510, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(written, 3);
        assert_eq!(universe.get_channel(510), 1);
        assert_eq!(universe.get_channel(512), 3);
        // Kein Wrap-Around auf Kanal 1 oder den Start-Code
        assert_eq!(universe.get_channel(1), 0);
        assert_eq!(universe.snapshot().unwrap()[0], START_CODE);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        universe.set_range(1, &[255; 16]).unwrap();
        universe.clear().unwrap();
        let once = universe.snapshot().unwrap();
        universe.clear().unwrap();
        assert_eq!(universe.snapshot().unwrap(), once);
        assert_eq!(once, [0u8; UNIVERSE_SIZE]);
    }

    #[test]
    fn test_reentrant_access_reports_busy() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        let inner = universe.modify(|_| universe.set_channel(1, 1)).unwrap();
        assert_eq!(inner, Err(DmxError::Busy));
        assert_eq!(universe.get_channel(1), 0);
    }

    #[test]
    fn test_channel_data_excludes_start_code() {
        let universe = UniverseBuffer::<NoopRawMutex>::new();
        universe.set_channel(1, 11).unwrap();
        universe.set_channel(512, 22).unwrap();
        let data = universe.channel_data().unwrap();
        assert_eq!(data[0], 11);
        assert_eq!(data[511], 22);
    }
}
