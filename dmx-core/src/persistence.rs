//! Persistence Bridge - Universe und Fixture-Tabelle im Key/Value-Store
//!
//! Layout im Namespace:
//! - `num_fixtures`  u32 LE
//! - `chan_per_fix`  u32 LE
//! - `dmx_data`      512 Bytes (Kanäle 1..=512, nie der Start-Code)
//! - `fixture_tbl`   `num_fixtures` × [`FIXTURE_RECORD_SIZE`] Bytes
//!
//! Fehler werden als `bool` gemeldet; der Aufrufer fällt auf den
//! Standard-Zustand zurück.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::color::paint_fixture;
use crate::fixtures::{FixtureRegistry, MAX_FIXTURES, MAX_NAME_LEN};
use crate::traits::{DmxError, KeyValueStore};
use crate::types::{CHANNEL_COUNT, Rgbw};
use crate::universe::UniverseBuffer;

pub const DEFAULT_NAMESPACE: &str = "dmx";

pub const KEY_NUM_FIXTURES: &str = "num_fixtures";
pub const KEY_CHAN_PER_FIX: &str = "chan_per_fix";
pub const KEY_DMX_DATA: &str = "dmx_data";
pub const KEY_FIXTURE_TABLE: &str = "fixture_tbl";

/// Name (16) + Basis (2) + R, G, B, W (je 2, W = 0 für "keiner")
pub const FIXTURE_RECORD_SIZE: usize = MAX_NAME_LEN + 2 + 4 * 2;

const FIXTURE_TABLE_SIZE: usize = MAX_FIXTURES * FIXTURE_RECORD_SIZE;

/// Standard-Zustand wenn nichts geladen werden konnte: alle Fixtures voll weiß
///
/// Ohne Fixtures wird der Frame dunkel geschaltet.
pub fn fill_default<R: RawMutex>(
    universe: &UniverseBuffer<R>,
    fixtures: &FixtureRegistry,
) -> Result<(), DmxError> {
    universe.modify(|channels| {
        channels.fill(0);
        for fixture in fixtures.iter() {
            paint_fixture(channels, fixture, Rgbw::WHITE);
        }
    })
}

pub struct PersistenceBridge<S: KeyValueStore> {
    store: S,
    namespace: &'static str,
}

impl<S: KeyValueStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, namespace: &'static str) -> Self {
        Self { store, namespace }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Speichert Konfiguration, Kanaldaten und Fixture-Tabelle
    pub async fn save<R: RawMutex>(
        &mut self,
        universe: &UniverseBuffer<R>,
        fixtures: &FixtureRegistry,
    ) -> bool {
        let Ok(data) = universe.channel_data() else {
            return false;
        };

        let mut table = [0u8; FIXTURE_TABLE_SIZE];
        let table_len = encode_fixture_table(fixtures, &mut table);

        self.store_u32(KEY_NUM_FIXTURES, fixtures.len() as u32).await
            && self
                .store_u32(KEY_CHAN_PER_FIX, fixtures.channels_per_fixture() as u32)
                .await
            && self.store_blob(KEY_DMX_DATA, &data).await
            && self.store_blob(KEY_FIXTURE_TABLE, &table[..table_len]).await
    }

    /// Lädt die Kanaldaten, falls die gespeicherte Konfiguration passt
    ///
    /// Bei Lesefehler oder abweichender Fixture-Anzahl bzw. Kanäle pro
    /// Fixture wird stattdessen [`fill_default`] angewendet und `false`
    /// zurückgegeben.
    pub async fn load<R: RawMutex>(
        &mut self,
        universe: &UniverseBuffer<R>,
        fixtures: &FixtureRegistry,
    ) -> bool {
        let mut data = [0u8; CHANNEL_COUNT];
        let loaded = self.stored_schema_matches(fixtures).await
            && self.load_blob(KEY_DMX_DATA, &mut data).await
            && universe.set_range(1, &data).is_ok();

        if !loaded {
            let _ = fill_default(universe, fixtures);
        }
        loaded
    }

    /// Übernimmt gespeicherte Fixture-Deskriptoren in die aktuelle Tabelle
    ///
    /// Nur wenn Anzahl und Kanäle pro Fixture mit der aktuellen
    /// Konfiguration übereinstimmen; sonst bleibt `fixtures` unverändert.
    pub async fn load_fixture_table(&mut self, fixtures: &mut FixtureRegistry) -> bool {
        if !self.stored_schema_matches(fixtures).await {
            return false;
        }
        let len = fixtures.len() * FIXTURE_RECORD_SIZE;
        let mut table = [0u8; FIXTURE_TABLE_SIZE];
        if !self.load_blob(KEY_FIXTURE_TABLE, &mut table[..len]).await {
            return false;
        }

        // Erst alles dekodieren, dann anwenden: keine halb übernommene Tabelle
        let mut staged = fixtures.clone();
        for (index, record) in table[..len].chunks_exact(FIXTURE_RECORD_SIZE).enumerate() {
            let (name, base, red, green, blue, white) = decode_fixture_record(record);
            if staged
                .set_fixture(index, name, base, red, green, blue, white)
                .is_err()
            {
                return false;
            }
        }
        *fixtures = staged;
        true
    }

    /// Speichert einen beliebigen Binär-Blob im Namespace
    pub async fn store_blob(&mut self, key: &str, data: &[u8]) -> bool {
        self.store.write(self.namespace, key, data).await.is_ok()
    }

    /// Liest einen Blob; erfolgreich nur wenn genau `buffer.len()` Bytes kamen
    pub async fn load_blob(&mut self, key: &str, buffer: &mut [u8]) -> bool {
        let expected = buffer.len();
        matches!(
            self.store.read(self.namespace, key, buffer).await,
            Ok(len) if len == expected
        )
    }

    pub async fn remove_blob(&mut self, key: &str) -> bool {
        self.store.remove(self.namespace, key).await.is_ok()
    }

    async fn store_u32(&mut self, key: &str, value: u32) -> bool {
        self.store_blob(key, &value.to_le_bytes()).await
    }

    async fn load_u32(&mut self, key: &str) -> Option<u32> {
        let mut bytes = [0u8; 4];
        self.load_blob(key, &mut bytes)
            .await
            .then(|| u32::from_le_bytes(bytes))
    }

    async fn stored_schema_matches(&mut self, fixtures: &FixtureRegistry) -> bool {
        let count = self.load_u32(KEY_NUM_FIXTURES).await;
        let per_fixture = self.load_u32(KEY_CHAN_PER_FIX).await;
        count == Some(fixtures.len() as u32)
            && per_fixture == Some(fixtures.channels_per_fixture() as u32)
    }
}

fn encode_fixture_table(fixtures: &FixtureRegistry, out: &mut [u8; FIXTURE_TABLE_SIZE]) -> usize {
    for (fixture, record) in fixtures.iter().zip(out.chunks_exact_mut(FIXTURE_RECORD_SIZE)) {
        let name = fixture.name.as_bytes();
        record[..name.len()].copy_from_slice(name);

        let roles = &fixture.channels;
        let words = [
            fixture.base_address,
            roles.red,
            roles.green,
            roles.blue,
            roles.white.unwrap_or(0),
        ];
        for (word, slot) in words.iter().zip(record[MAX_NAME_LEN..].chunks_exact_mut(2)) {
            slot.copy_from_slice(&word.to_le_bytes());
        }
    }
    fixtures.len() * FIXTURE_RECORD_SIZE
}

fn decode_fixture_record(record: &[u8]) -> (&str, u16, u16, u16, u16, Option<u16>) {
    let name_bytes = &record[..MAX_NAME_LEN];
    let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
    let name = core::str::from_utf8(&name_bytes[..name_len]).unwrap_or("");

    let word = |i: usize| {
        let at = MAX_NAME_LEN + i * 2;
        u16::from_le_bytes([record[at], record[at + 1]])
    };
    let white = word(4);
    (
        name,
        word(0),
        word(1),
        word(2),
        word(3),
        (white != 0).then_some(white),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_record_roundtrip() {
        let mut fixtures = FixtureRegistry::new();
        fixtures.configure(2, 4).unwrap();
        fixtures
            .set_fixture(1, "Wash", 20, 22, 21, 20, None)
            .unwrap();

        let mut table = [0u8; FIXTURE_TABLE_SIZE];
        let len = encode_fixture_table(&fixtures, &mut table);
        assert_eq!(len, 2 * FIXTURE_RECORD_SIZE);

        let record = &table[FIXTURE_RECORD_SIZE..len];
        assert_eq!(
            decode_fixture_record(record),
            ("Wash", 20, 22, 21, 20, None)
        );
        let first = decode_fixture_record(&table[..FIXTURE_RECORD_SIZE]);
        assert_eq!(first, ("Fixture 1", 1, 1, 2, 3, Some(4)));
    }
}
