// DMX-Leitung über UART1 und einen RS485-Treiber
//
// Der Treiber (z.B. MAX485) braucht neben TX einen Richtungs-Pin (DE/RE).
// DMX-Controller senden nur, der Pin bleibt nach dem ersten Frame High.

use dmx_core::{DmxError, DmxPort};
use dmx_core::transmitter::DMX_BAUD;
use esp_hal::Blocking;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{GPIO4, GPIO5, UART1};
use esp_hal::uart::{Config, DataBits, Parity, StopBits, Uart};

/// UART-Grundkonfiguration für DMX: 250 kBaud, 8N2
pub fn dmx_uart_config(baudrate: u32) -> Config {
    Config::default()
        .with_baudrate(baudrate)
        .with_data_bits(DataBits::_8)
        .with_parity(Parity::None)
        .with_stop_bits(StopBits::_2)
}

/// Real Hardware DMX Port
///
/// Kapselt die blockierende UART und den DE/RE-Pin. Die Baudrate wird pro
/// Frame zweimal umgestellt (Break-Byte, dann Daten).
pub struct UartDmxPort<'a> {
    uart: Uart<'a, Blocking>,
    direction: Output<'a>,
    config: Config,
}

impl<'a> UartDmxPort<'a> {
    /// Initialisiert UART1 (TX = GPIO5) und den Richtungs-Pin (GPIO4)
    ///
    /// # Fehlerbehandlung
    /// Gibt `DmxError::ConfigFailed` zurück wenn die UART-Konfiguration
    /// abgelehnt wird; der Aufrufer läuft dann ohne Leitung weiter.
    pub fn new(
        uart: UART1<'a>,
        tx: GPIO5<'a>,
        direction: GPIO4<'a>,
    ) -> Result<Self, DmxError> {
        let config = dmx_uart_config(DMX_BAUD);
        let uart = Uart::new(uart, config)
            .map_err(|_| DmxError::ConfigFailed)?
            .with_tx(tx);

        // Low = Empfangen, bis der erste Frame rausgeht
        let direction = Output::new(direction, Level::Low, OutputConfig::default());

        Ok(Self {
            uart,
            direction,
            config,
        })
    }
}

impl DmxPort for UartDmxPort<'_> {
    fn set_transmit(&mut self, enabled: bool) -> Result<(), DmxError> {
        self.direction.set_level(if enabled { Level::High } else { Level::Low });
        Ok(())
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), DmxError> {
        self.config = self.config.with_baudrate(baudrate);
        self.uart
            .apply_config(&self.config)
            .map_err(|_| DmxError::ConfigFailed)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), DmxError> {
        // write() füllt nur den FIFO, daher in Schleife bis alles drin ist
        let mut remaining = data;
        while !remaining.is_empty() {
            let written = self
                .uart
                .write(remaining)
                .map_err(|_| DmxError::WriteFailed)?;
            remaining = &remaining[written..];
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DmxError> {
        self.uart.flush().map_err(|_| DmxError::WriteFailed)
    }
}
