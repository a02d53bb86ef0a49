// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;

// defmt Logging
use defmt::{error, info};

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use esp_dmx_steuerung::config::{DMX_DIRECTION_GPIO_PIN, DMX_TX_GPIO_PIN};
use esp_dmx_steuerung::hal::{FlashKeyValueStore, UartDmxPort};
use esp_dmx_steuerung::tasks::{button_task, dmx_output_task};
use esp_dmx_steuerung::{ChannelDownlink, DownlinkChannel};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, startet Embassy Runtime und spawnt Tasks.
/// Danach schläft main() - alle Arbeit läuft in Tasks.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // DMX-Leitung: UART1 + RS485-Richtungs-Pin
    // Fehlschlag ist nicht fatal, der Transmitter meldet ihn einmal und läuft leer
    let port = match UartDmxPort::new(peripherals.UART1, peripherals.GPIO5, peripherals.GPIO4) {
        Ok(port) => {
            info!(
                "DMX: UART1 ready (TX GPIO{}, DE GPIO{})",
                DMX_TX_GPIO_PIN, DMX_DIRECTION_GPIO_PIN
            );
            Some(port)
        }
        Err(e) => {
            error!("DMX: UART1 init failed: {}", e);
            None
        }
    };

    // Persistenz über die interne Flash
    let store = FlashKeyValueStore::new(FlashStorage::new(peripherals.FLASH));

    // Downlink-Channel erstellen (Transport/Button → DMX Task)
    static DOWNLINK_CHANNEL: static_cell::StaticCell<DownlinkChannel> =
        static_cell::StaticCell::new();
    let downlink_channel = DOWNLINK_CHANNEL.init(DownlinkChannel::new());

    // Spawn DMX Task (besitzt Leitung, Store und Controller, filtert Ports)
    spawner
        .spawn(dmx_output_task(port, store, downlink_channel.receiver()))
        .unwrap();

    // Spawn Button Task (Demo-Sequenz über denselben Downlink-Pfad)
    // Ein Funk-Transport bekäme ebenfalls einen ChannelDownlink
    spawner
        .spawn(button_task(
            peripherals.GPIO9,
            ChannelDownlink::new(downlink_channel.sender()),
        ))
        .unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
