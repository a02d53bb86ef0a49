// Flash-basierter Key/Value Store für die Persistence Bridge
//
// esp-storage liefert blockierenden NorFlash-Zugriff, BlockingAsync macht
// daraus die async-Variante, die sequential-storage für seine
// wear-leveled Map erwartet.

use core::ops::Range;

use dmx_core::{KeyValueStore, StoreError};
use embassy_embedded_hal::adapter::BlockingAsync;
use esp_storage::FlashStorage;
use heapless::String;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use crate::config::{STORE_DATA_BUFFER_SIZE, STORE_FLASH_SIZE, STORE_FLASH_START, STORE_KEY_SIZE};

/// Flash-Bereich der Map
pub const STORE_RANGE: Range<u32> = STORE_FLASH_START..(STORE_FLASH_START + STORE_FLASH_SIZE);

/// Schlüssel in der Map: `"<namespace>/<key>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey(String<STORE_KEY_SIZE>);

impl StoreKey {
    pub fn new(namespace: &str, key: &str) -> Result<Self, StoreError> {
        let mut full = String::new();
        for part in [namespace, "/", key] {
            full.push_str(part).map_err(|_| StoreError::BufferTooSmall)?;
        }
        Ok(Self(full))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Längen-Präfix (1 Byte) + UTF-8 Bytes
impl Key for StoreKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let bytes = self.0.as_bytes();
        if buffer.len() < bytes.len() + 1 {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[0] = bytes.len() as u8;
        buffer[1..=bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len() + 1)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        let (&len, rest) = buffer
            .split_first()
            .ok_or(SerializationError::BufferTooSmall)?;
        let bytes = rest
            .get(..len as usize)
            .ok_or(SerializationError::BufferTooSmall)?;
        let text = core::str::from_utf8(bytes).map_err(|_| SerializationError::InvalidFormat)?;

        let mut key = String::new();
        key.push_str(text)
            .map_err(|_| SerializationError::InvalidFormat)?;
        Ok((Self(key), len as usize + 1))
    }
}

/// KeyValueStore über die interne Flash des ESP32-C6
///
/// Besitzt die Flash exklusiv; nur der DMX Task greift darauf zu.
pub struct FlashKeyValueStore<'d> {
    flash: BlockingAsync<FlashStorage<'d>>,
    range: Range<u32>,
    buffer: [u8; STORE_DATA_BUFFER_SIZE],
}

impl<'d> FlashKeyValueStore<'d> {
    pub fn new(flash: FlashStorage<'d>) -> Self {
        Self {
            flash: BlockingAsync::new(flash),
            range: STORE_RANGE,
            buffer: [0; STORE_DATA_BUFFER_SIZE],
        }
    }
}

impl KeyValueStore for FlashKeyValueStore<'_> {
    async fn read(
        &mut self,
        namespace: &str,
        key: &str,
        buffer: &mut [u8],
    ) -> Result<usize, StoreError> {
        let key = StoreKey::new(namespace, key)?;

        let result = map::fetch_item::<StoreKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &key,
        )
        .await;

        match result {
            // Leerer Eintrag = gelöscht (siehe remove)
            Ok(Some(data)) if data.is_empty() => Err(StoreError::NotFound),
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(StoreError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(StoreError::NotFound),
            Err(_) => Err(StoreError::Storage),
        }
    }

    async fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let key = StoreKey::new(namespace, key)?;

        map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &key,
            &data,
        )
        .await
        .map_err(|_| StoreError::Storage)
    }

    /// Überschreibt den Eintrag mit einem leeren Wert
    ///
    /// `map::remove_item` bräuchte MultiwriteNorFlash, das der
    /// BlockingAsync-Adapter nicht anbietet.
    async fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        self.write(namespace, key, &[]).await
    }
}
