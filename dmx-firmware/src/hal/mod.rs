// Hardware Abstraction Layer (HAL) Module
//
// Konkrete Implementierungen der dmx-core Traits für den ESP32-C6.
// Mocks für Host-Tests liegen in dmx-tests.

pub mod flash_store;
pub mod uart_port;

pub use flash_store::{FlashKeyValueStore, StoreKey};
pub use uart_port::UartDmxPort;
