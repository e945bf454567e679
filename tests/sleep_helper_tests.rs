mod common;

use common::{flight_config, pet_gaps, NVM_SIZE};
use cubesat_fsw::error::HardwareError;
use cubesat_fsw::nvm::NvmStore;
use cubesat_fsw::platform::mock::{MockBoard, MockEvent};
use cubesat_fsw::platform::Clock;
use cubesat_fsw::retry::RetryPolicy;
use cubesat_fsw::satellite::Satellite;
use cubesat_fsw::sleep::{SleepHelper, SleepPlan, MAX_SLEEP_CHUNK};
use cubesat_fsw::watchdog::{Watchdog, PET_PULSE};
use proptest::prelude::*;
use std::time::Duration;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn helper(board: &MockBoard) -> SleepHelper {
    let watchdog = Watchdog::new(
        Box::new(board.pin()),
        Box::new(board.delay()),
        RetryPolicy::default(),
    )
    .unwrap();
    let helper = SleepHelper::new(watchdog, Box::new(board.alarm()), &flight_config());
    board.clear_events();
    helper
}

#[cfg(test)]
mod watchdog_tests {
    use super::*;

    #[test]
    fn test_init_drives_line_low() {
        let board = MockBoard::new();
        let _watchdog = Watchdog::new(
            Box::new(board.pin()),
            Box::new(board.delay()),
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(board.events(), vec![MockEvent::PinLow]);
    }

    #[test]
    fn test_pet_is_a_ten_millisecond_pulse() {
        let board = MockBoard::new();
        let mut watchdog = Watchdog::new(
            Box::new(board.pin()),
            Box::new(board.delay()),
            RetryPolicy::default(),
        )
        .unwrap();
        board.clear_events();

        watchdog.pet();
        assert_eq!(
            board.events(),
            vec![MockEvent::PinHigh, MockEvent::Delay(PET_PULSE), MockEvent::PinLow]
        );
        assert_eq!(board.clock().now(), PET_PULSE);
    }

    #[test]
    fn test_init_retries_with_backoff() {
        let board = MockBoard::new();
        let pin = board.pin();
        pin.fail_next(2);

        let watchdog = Watchdog::new(
            Box::new(pin),
            Box::new(board.delay()),
            RetryPolicy::default(),
        );
        assert!(watchdog.is_ok());
        assert_eq!(board.delays(), vec![secs(1), secs(2)]);
    }

    #[test]
    fn test_init_fails_after_ceiling() {
        let board = MockBoard::new();
        let pin = board.pin();
        pin.fail_next(3);

        let err = Watchdog::new(
            Box::new(pin),
            Box::new(board.delay()),
            RetryPolicy::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            HardwareError::InitFailed {
                device: "watchdog",
                attempts: 3
            }
        );
        assert_eq!(board.delays(), vec![secs(1), secs(2)]);
    }

    #[test]
    fn test_pet_survives_pin_fault() {
        let board = MockBoard::new();
        let pin = board.pin();
        let mut watchdog = Watchdog::new(
            Box::new(pin.clone()),
            Box::new(board.delay()),
            RetryPolicy::default(),
        )
        .unwrap();
        board.clear_events();

        pin.fail_next(1);
        watchdog.pet();
        assert_eq!(
            board.events(),
            vec![MockEvent::Delay(PET_PULSE), MockEvent::PinLow]
        );
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[test]
    fn test_success_needs_no_delay() {
        let board = MockBoard::new();
        let mut delay = board.delay();
        let result: Result<u8, _> = RetryPolicy::default().run(&mut delay, |attempt| {
            Ok::<_, ()>(attempt)
        });
        assert_eq!(result, Ok(1));
        assert!(board.delays().is_empty());
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let board = MockBoard::new();
        let mut delay = board.delay();
        let result: Result<(), _> =
            RetryPolicy::default().run(&mut delay, |attempt| Err::<(), _>(attempt));

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, 3);
        assert_eq!(board.delays(), vec![secs(1), secs(2)]);
    }

    #[test]
    fn test_non_retryable_error_stops_immediately() {
        let board = MockBoard::new();
        let mut delay = board.delay();
        let result: Result<(), _> = RetryPolicy::default().run_while(
            &mut delay,
            |_| Err::<(), _>("fatal"),
            |_| false,
        );

        assert_eq!(result.unwrap_err().attempts, 1);
        assert!(board.delays().is_empty());
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
    }
}

#[cfg(test)]
mod sleep_tests {
    use super::*;

    #[test]
    fn test_safe_sleep_clamps_to_ceiling() {
        let board = MockBoard::new();
        let mut helper = helper(&board);
        assert_eq!(helper.longest_allowable_sleep(), secs(30));

        helper.safe_sleep(secs(40));

        assert_eq!(board.sleeps(), vec![secs(15), secs(15)]);
        assert_eq!(board.pulses(), 3);
        assert_eq!(board.clock().now(), secs(30) + PET_PULSE * 3);
    }

    #[test]
    fn test_safe_sleep_pets_before_first_chunk() {
        let board = MockBoard::new();
        let mut helper = helper(&board);

        helper.safe_sleep(secs(20));

        let events = board.events();
        assert_eq!(
            &events[..4],
            &[
                MockEvent::PinHigh,
                MockEvent::Delay(PET_PULSE),
                MockEvent::PinLow,
                MockEvent::Sleep(secs(15)),
            ]
        );
        assert_eq!(board.sleeps(), vec![secs(15), secs(5)]);
        assert_eq!(events.last(), Some(&MockEvent::PinLow));
    }

    #[test]
    fn test_safe_sleep_zero_only_pets() {
        let board = MockBoard::new();
        let mut helper = helper(&board);

        helper.safe_sleep(Duration::ZERO);

        assert!(board.sleeps().is_empty());
        assert_eq!(board.pulses(), 1);
    }

    #[test]
    fn test_short_hibernate_sets_softboot() {
        let board = MockBoard::new();
        let config = flight_config();
        let mut satellite = Satellite::new(
            NvmStore::in_memory(NVM_SIZE).unwrap(),
            Box::new(board.clock()),
            &config,
        )
        .unwrap();
        let mut helper = helper(&board);

        assert!(helper.short_hibernate(&mut satellite));

        assert!(satellite.softboot());
        assert_eq!(board.sleeps(), vec![secs(15), secs(15)]);
        assert_eq!(board.pulses(), 4);
    }

    #[test]
    fn test_long_hibernate_respects_raised_ceiling() {
        let board = MockBoard::new();
        let config = flight_config();
        let mut satellite = Satellite::new(
            NvmStore::in_memory(NVM_SIZE).unwrap(),
            Box::new(board.clock()),
            &config,
        )
        .unwrap();
        let mut helper = helper(&board);
        helper.set_longest_allowable_sleep(secs(3600));

        assert!(helper.long_hibernate(&mut satellite));

        let sleeps = board.sleeps();
        assert_eq!(sleeps.len(), 40);
        assert_eq!(sleeps.iter().sum::<Duration>(), secs(600));
        assert!(satellite.softboot());
        assert!(pet_gaps(&board.events())
            .iter()
            .all(|gap| *gap <= MAX_SLEEP_CHUNK + PET_PULSE));
    }

    #[test]
    fn test_sleep_plan_chunks() {
        let chunks: Vec<Duration> = SleepPlan::new(secs(100), secs(40)).collect();
        assert_eq!(chunks, vec![secs(15), secs(15), secs(10)]);
    }
}

proptest! {
    #[test]
    fn prop_sleep_plan_never_exceeds_ceiling(requested in 0u64..100_000, ceiling in 1u64..86_400) {
        let plan = SleepPlan::new(secs(requested), secs(ceiling));
        prop_assert_eq!(plan.remaining(), secs(requested.min(ceiling)));

        let chunks: Vec<Duration> = plan.collect();
        prop_assert!(chunks.iter().all(|c| *c > Duration::ZERO && *c <= MAX_SLEEP_CHUNK));
        prop_assert_eq!(chunks.iter().sum::<Duration>(), secs(requested.min(ceiling)));
    }
}
