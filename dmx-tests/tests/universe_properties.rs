//! Property Tests für Universe Buffer und Command-Parser
//!
//! Prüfen die Bereichs-Invarianten über zufällige Adressen und Werte.

use dmx_core::types::{MAX_ADDRESS, START_CODE};
use dmx_core::{DmxError, UNIVERSE_SIZE, UniverseBuffer, parse_command};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use proptest::prelude::*;

type TestUniverse = UniverseBuffer<NoopRawMutex>;

fn invalid_address() -> impl Strategy<Value = u16> {
    prop_oneof![Just(0u16), (MAX_ADDRESS + 1)..=u16::MAX]
}

proptest! {
    #[test]
    fn set_then_get_returns_value(index in 1u16..=MAX_ADDRESS, value in any::<u8>()) {
        let universe = TestUniverse::new();
        universe.set_channel(index, value).unwrap();
        prop_assert_eq!(universe.get_channel(index), value);
        prop_assert_eq!(universe.snapshot().unwrap()[0], START_CODE);
    }

    #[test]
    fn invalid_address_leaves_frame_untouched(
        seed in proptest::collection::vec(any::<u8>(), 1..=32),
        index in invalid_address(),
        value in any::<u8>(),
    ) {
        let universe = TestUniverse::new();
        universe.set_range(1, &seed).unwrap();
        let before = universe.snapshot().unwrap();

        prop_assert_eq!(universe.set_channel(index, value), Err(DmxError::OutOfRange));
        prop_assert_eq!(universe.set_range(index, &[value]), Err(DmxError::OutOfRange));
        prop_assert_eq!(universe.get_channel(index), 0);
        prop_assert_eq!(universe.snapshot().unwrap(), before);
    }

    #[test]
    fn set_range_writes_only_inside_window(
        start in 1u16..=MAX_ADDRESS,
        values in proptest::collection::vec(1u8..=255, 0..64),
    ) {
        let universe = TestUniverse::new();
        let written = universe.set_range(start, &values).unwrap();
        let expected = values.len().min(UNIVERSE_SIZE - start as usize);
        prop_assert_eq!(written, expected);

        let frame = universe.snapshot().unwrap();
        prop_assert_eq!(frame[0], START_CODE);
        for (index, byte) in frame.iter().enumerate().skip(1) {
            let offset = index as isize - start as isize;
            if offset >= 0 && (offset as usize) < written {
                prop_assert_eq!(*byte, values[offset as usize]);
            } else {
                prop_assert_eq!(*byte, 0);
            }
        }
    }

    #[test]
    fn clear_is_idempotent(values in proptest::collection::vec(any::<u8>(), 0..=512)) {
        let universe = TestUniverse::new();
        universe.set_range(1, &values).unwrap();
        universe.clear().unwrap();
        let once = universe.snapshot().unwrap();
        universe.clear().unwrap();
        prop_assert_eq!(universe.snapshot().unwrap(), once);
        prop_assert!(once.iter().all(|&b| b == 0));
    }

    #[test]
    fn parser_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_command(&payload);
    }

    #[test]
    fn set_command_stays_in_universe(addr in 0u32..1024, value in any::<u8>()) {
        let payload = format!(r#"{{"cmd":"set","addr":{addr},"values":[{value},{value}]}}"#);
        let universe = TestUniverse::new();
        if let Ok(dmx_core::DmxCommand::Set { addr, values }) = parse_command(payload.as_bytes()) {
            match universe.set_range(addr, &values) {
                Ok(written) => prop_assert!(addr as usize + written <= UNIVERSE_SIZE),
                Err(e) => prop_assert_eq!(e, DmxError::OutOfRange),
            }
        }
        prop_assert_eq!(universe.snapshot().unwrap()[0], START_CODE);
    }
}
