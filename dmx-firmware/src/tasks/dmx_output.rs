// DMX Output Task - treibt Controller, Muster und Transmitter
use defmt::{debug, error, info, warn};
use dmx_core::pattern::TickOutcome;
use dmx_core::{
    CommandError, CommandOutcome, DmxController, DmxError, DmxPort, DmxTransmitter,
    FixtureRegistry, FrameStatus, KeyValueStore, PersistenceBridge, PollOutcome,
};
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;

use crate::config::{
    DEFAULT_CHANNELS_PER_FIXTURE, DEFAULT_FIXTURE_COUNT, DOWNLINK_PORT, FRAME_INTERVAL_MS,
    POLL_INTERVAL_MS, STORE_NAMESPACE,
};
use crate::hal::{FlashKeyValueStore, UartDmxPort};
use crate::{DownlinkFrame, DownlinkReceiver, UNIVERSE};

/// Stellt Fixture-Tabelle und Kanaldaten aus dem Store wieder her
///
/// Ohne passenden Stand leuchten alle Fixtures voll weiß.
pub async fn restore_state<R: RawMutex, P: DmxPort, D: DelayNs, S: KeyValueStore>(
    controller: &mut DmxController<'_, R, P, D>,
    persistence: &mut PersistenceBridge<S>,
) {
    if persistence
        .load_fixture_table(controller.fixtures_mut())
        .await
    {
        info!("Store: fixture table restored");
    }

    let universe = controller.universe();
    if persistence.load(universe, controller.fixtures()).await {
        info!("Store: DMX data restored");
    } else {
        warn!("Store: no matching saved state, using default (all white)");
    }
}

/// DMX Output Logic - Testbare Business Logic ohne Hardware-Abhängigkeit
///
/// - Stellt beim Start den gespeicherten Zustand wieder her
/// - Wartet per `select` auf Downlinks (Transport/Button) oder den Poll-Takt
/// - Filtert Port und parst Payloads über `handle_downlink()`
/// - Ruft danach `poll()` auf: Scanner, Muster, Refresh-Frames
/// - Persistiert auf `save`
///
/// # Trait-basierte Abstraktion
/// Leitung (`DmxPort`), Delay und Store sind generisch, damit dieselbe
/// Schleife mit Mocks laufen kann.
pub async fn dmx_output_logic<R: RawMutex, P: DmxPort, D: DelayNs, S: KeyValueStore>(
    mut controller: DmxController<'_, R, P, D>,
    mut persistence: PersistenceBridge<S>,
    downlink_receiver: DownlinkReceiver,
) -> ! {
    restore_state(&mut controller, &mut persistence).await;

    loop {
        // Auf Downlink ODER Poll-Takt warten, je nachdem was zuerst kommt
        match select(
            downlink_receiver.receive(),
            Timer::after(Duration::from_millis(POLL_INTERVAL_MS)),
        )
        .await
        {
            Either::First(frame) => {
                handle_frame(&mut controller, &mut persistence, &frame).await;

                // Restliche wartende Downlinks übernehmen (non-blocking)
                while let Ok(frame) = downlink_receiver.try_receive() {
                    handle_frame(&mut controller, &mut persistence, &frame).await;
                }
            }
            Either::Second(()) => {}
        }

        log_poll(&controller.poll(Instant::now().as_millis()));
    }
}

/// Wendet einen Downlink mit der aktuellen Zeit an
async fn handle_frame<R: RawMutex, P: DmxPort, D: DelayNs, S: KeyValueStore>(
    controller: &mut DmxController<'_, R, P, D>,
    persistence: &mut PersistenceBridge<S>,
    frame: &DownlinkFrame,
) {
    let now_ms = Instant::now().as_millis();
    match controller.handle_downlink(frame.port, &frame.payload, now_ms) {
        Ok(CommandOutcome::SaveRequested) => {
            let universe = controller.universe();
            if persistence.save(universe, controller.fixtures()).await {
                info!("Store: state saved");
            } else {
                error!("Store: failed to save state");
            }
        }
        Ok(outcome) => info!("Downlink: {} applied: {}", frame, outcome),
        Err(CommandError::IgnoredPort(port)) => {
            warn!("Downlink: ignoring payload on port {}", port)
        }
        Err(e) => warn!("Downlink: rejected {}: {}", frame, e),
    }
}

fn log_poll(outcome: &PollOutcome) {
    if let Some(step) = outcome.scan {
        info!("Scan: address {} showing {}", step.address, step.color);
    }

    match outcome.pattern {
        TickOutcome::Rendered { finished: true } => info!("DMX: pattern finished"),
        TickOutcome::Skipped => debug!("DMX: universe busy, pattern tick skipped"),
        _ => {}
    }

    match outcome.frame {
        Some(Ok(FrameStatus::Sent { changed: true })) => debug!("DMX: frame changed"),
        Some(Err(DmxError::NotInitialized)) => {
            error!("DMX: serial port not initialized, output disabled")
        }
        Some(Err(DmxError::Busy)) => debug!("DMX: universe busy, frame skipped"),
        Some(Err(e)) => warn!("DMX: frame failed: {}", e),
        _ => {}
    }
}

/// DMX Output Task - Embassy Task für parallele Ausführung
///
/// Baut Fixture-Tabelle, Transmitter und Controller auf und ruft dann die
/// testbare `dmx_output_logic()` auf.
///
/// # Parameter
/// - `port`: initialisierte DMX-Leitung, `None` wenn die UART-Init fehlschlug
/// - `store`: Flash Key/Value Store für die Persistenz
/// - `downlink_receiver`: Channel Receiver für rohe Downlinks
#[embassy_executor::task]
pub async fn dmx_output_task(
    port: Option<UartDmxPort<'static>>,
    store: FlashKeyValueStore<'static>,
    downlink_receiver: DownlinkReceiver,
) {
    let mut fixtures = FixtureRegistry::new();
    if let Err(e) = fixtures.configure(DEFAULT_FIXTURE_COUNT, DEFAULT_CHANNELS_PER_FIXTURE) {
        error!("DMX: default fixture layout rejected: {}", e);
    }
    info!(
        "DMX: {} fixtures x {} channels",
        fixtures.len(),
        fixtures.channels_per_fixture()
    );

    let transmitter = DmxTransmitter::new(port, Delay);
    let controller = DmxController::new(&UNIVERSE, fixtures, transmitter)
        .with_frame_interval(FRAME_INTERVAL_MS)
        .with_downlink_port(DOWNLINK_PORT);
    let persistence = PersistenceBridge::with_namespace(store, STORE_NAMESPACE);

    dmx_output_logic(controller, persistence, downlink_receiver).await
}
