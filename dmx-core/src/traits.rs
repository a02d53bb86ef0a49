//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware- und Service-Zugriff
//! ohne konkrete Implementierung.

/// Fehler-Typ für Universe- und Transmitter-Operationen
///
/// Keiner dieser Fehler ist fatal: der Aufrufer darf ihn ignorieren,
/// die laufende Lichtsteuerung wird nie angehalten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxError {
    /// Kanal-Adresse außerhalb von 1..=512
    OutOfRange,
    /// Fixture-Index nicht konfiguriert
    UnknownFixture,
    /// Universe-Lock gerade belegt, Operation übersprungen
    Busy,
    /// Serielle Leitung wurde nie erfolgreich initialisiert
    NotInitialized,
    /// Schreiben auf die Leitung fehlgeschlagen
    WriteFailed,
    /// Baudrate/UART-Konfiguration fehlgeschlagen
    ConfigFailed,
}

/// Fehler-Typ für den Key/Value-Store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    NotFound,
    BufferTooSmall,
    Storage,
}

/// Trait für die DMX-Leitung (UART + Richtungs-Pin des RS485-Treibers)
///
/// # Implementierungen
/// - **Production:** UartDmxPort (ESP32 UART1 + DE/RE GPIO)
/// - **Testing:** MockPort (zeichnet Baudraten und Bytes auf)
pub trait DmxPort {
    /// Schaltet den Treiber auf Senden (`true`) oder Empfangen (`false`)
    fn set_transmit(&mut self, enabled: bool) -> Result<(), DmxError>;

    /// Stellt die Baudrate um (Break-Trick und Datenrate)
    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), DmxError>;

    /// Schreibt alle Bytes in den Sende-Puffer
    fn write_all(&mut self, data: &[u8]) -> Result<(), DmxError>;

    /// Blockiert bis alle Bytes physikalisch gesendet wurden
    fn flush(&mut self) -> Result<(), DmxError>;
}

/// Trait für den externen Key/Value-Speicher (NVS/Flash)
///
/// Der Core legt nur fest *was* gespeichert wird, nicht *wie*.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Liest einen Wert in `buffer` und gibt die Länge zurück
    async fn read(
        &mut self,
        namespace: &str,
        key: &str,
        buffer: &mut [u8],
    ) -> Result<usize, StoreError>;

    async fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError>;

    async fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError>;
}

/// Empfänger für Downlink-Kommandos vom Funk-Transport
///
/// Der Transport kennt nur diese Fähigkeit, nicht den Controller selbst.
pub trait DownlinkHandler {
    /// Wird für jedes empfangene Payload auf `port` aufgerufen
    fn on_downlink(&mut self, port: u8, payload: &[u8]);
}
