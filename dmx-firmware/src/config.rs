// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

// ============================================================================
// DMX-Leitung (UART1 → RS485-Treiber)
// ============================================================================

/// GPIO-Pin für UART1 TX (zum DI-Eingang des RS485-Treibers)
pub const DMX_TX_GPIO_PIN: u8 = 5;

/// GPIO-Pin für DE/RE des RS485-Treibers (High = Senden)
pub const DMX_DIRECTION_GPIO_PIN: u8 = 4;

/// Mindestabstand zwischen zwei Refresh-Frames in Millisekunden
/// 25 ms ≈ 40 Hz, deutlich über der Flacker-Grenze üblicher Fixtures
pub const FRAME_INTERVAL_MS: u32 = dmx_core::controller::DEFAULT_FRAME_INTERVAL_MS;

/// Poll-Intervall des DMX-Tasks in Millisekunden
/// Kürzer als FRAME_INTERVAL_MS, damit Muster-Ticks nicht verspätet rendern
pub const POLL_INTERVAL_MS: u64 = 5;

// ============================================================================
// Fixture-Konfiguration (Standard beim Booten)
// ============================================================================

/// Anzahl Fixtures, wenn nichts anderes konfiguriert ist
pub const DEFAULT_FIXTURE_COUNT: usize = 4;

/// Kanäle pro Fixture (R, G, B, W)
pub const DEFAULT_CHANNELS_PER_FIXTURE: u8 = 4;

// ============================================================================
// Downlink-Konfiguration
// ============================================================================

/// Einziger Port, auf dem der Funk-Transport Kommandos liefert
pub const DOWNLINK_PORT: u8 = dmx_core::controller::DEFAULT_DOWNLINK_PORT;

/// Maximale Payload-Größe eines Downlinks in Bytes
/// Ein `set` mit 32 Werten passt mit Reserve hinein
pub const DOWNLINK_PAYLOAD_SIZE: usize = 222;

/// Queue-Tiefe für empfangene Downlinks (Transport/Button → DMX Task)
pub const DOWNLINK_QUEUE_DEPTH: usize = 4;

// ============================================================================
// Button (lokaler Test-Auslöser)
// ============================================================================

/// GPIO-Pin des BOOT-Buttons auf dem ESP32-C6 DevKit
pub const BUTTON_GPIO_PIN: u8 = 9;

/// Entprell-Zeit nach einem Tastendruck in Millisekunden
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// ============================================================================
// Persistenz (Flash Key/Value Store)
// ============================================================================

/// Namespace aller DMX-Schlüssel im Store
pub const STORE_NAMESPACE: &str = dmx_core::persistence::DEFAULT_NAMESPACE;

/// Start der `nvs`-Partition in der Standard-Partitionstabelle
pub const STORE_FLASH_START: u32 = 0x9000;

/// Größe der Partition: 6 Sektoren à 4 KB
pub const STORE_FLASH_SIZE: u32 = 0x6000;

/// Arbeits-Buffer für sequential-storage (größter Wert + Schlüssel)
/// Muss größer sein als die Fixture-Tabelle (32 × 26 Bytes)
pub const STORE_DATA_BUFFER_SIZE: usize = 1024;

/// Maximale Länge von "<namespace>/<key>"
pub const STORE_KEY_SIZE: usize = 32;
