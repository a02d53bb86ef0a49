// Button Task - BOOT-Button als lokaler Test-Auslöser
//
// Jeder Druck schickt das nächste Demo-Kommando durch denselben
// Downlink-Pfad wie der Funk-Transport.

use defmt::info;
use dmx_core::DownlinkHandler;
use embassy_time::{Duration, Timer};
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::peripherals::GPIO9;

use crate::ChannelDownlink;
use crate::config::{BUTTON_DEBOUNCE_MS, BUTTON_GPIO_PIN, DOWNLINK_PORT};

/// Demo-Sequenz, endet mit Stop + Clear
pub const DEMO_SEQUENCE: [&[u8]; 6] = [
    br#"{"cmd":"rainbow","speed":60,"stagger":true}"#,
    br#"{"cmd":"chase","speed":250}"#,
    br#"{"cmd":"strobe","speed":100,"cycles":20}"#,
    br#"{"cmd":"colorfade","speed":40}"#,
    br#"{"cmd":"stop"}"#,
    br#"{"cmd":"clear"}"#,
];

/// Sendet Demo-Schritt `step` und gibt den nächsten Index zurück
pub fn inject_demo_step<H: DownlinkHandler>(handler: &mut H, step: usize) -> usize {
    let step = step % DEMO_SEQUENCE.len();
    handler.on_downlink(DOWNLINK_PORT, DEMO_SEQUENCE[step]);
    (step + 1) % DEMO_SEQUENCE.len()
}

/// Button Task - Embassy Task für parallele Ausführung
///
/// # Parameter
/// - `gpio9`: BOOT-Button (active low, interner Pull-up)
/// - `downlink`: Handler, der in den Downlink-Channel schreibt
#[embassy_executor::task]
pub async fn button_task(gpio9: GPIO9<'static>, mut downlink: ChannelDownlink) {
    let mut button = Input::new(gpio9, InputConfig::default().with_pull(Pull::Up));
    let mut step = 0;
    info!("Button: GPIO{} ready, {} demo steps", BUTTON_GPIO_PIN, DEMO_SEQUENCE.len());

    loop {
        button.wait_for_falling_edge().await;
        info!("Button: pressed, demo step {}", step);
        step = inject_demo_step(&mut downlink, step);

        // Entprellen, dann auf Loslassen warten
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        button.wait_for_high().await;
    }
}
