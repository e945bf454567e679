//! Watchdog-safe sleep
//!
//! A sleep request is turned into a [`SleepPlan`]: a remaining-time counter
//! clamped to the configured ceiling that hands out waits of at most
//! [`MAX_SLEEP_CHUNK`]. [`SleepHelper`] drives the plan against an
//! [`AlarmSleep`] and pets the watchdog before the first chunk and after
//! every chunk, so the hardware countdown never sees a gap longer than one
//! chunk.

use crate::config::Config;
use crate::platform::AlarmSleep;
use crate::satellite::Satellite;
use crate::watchdog::Watchdog;
use core::time::Duration;
use tracing::{debug, warn};

pub const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(15);
pub const SHORT_HIBERNATE: Duration = Duration::from_secs(120);
pub const LONG_HIBERNATE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    remaining: Duration,
}

impl SleepPlan {
    pub fn new(requested: Duration, ceiling: Duration) -> Self {
        Self {
            remaining: requested.min(ceiling),
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining.is_zero()
    }
}

impl Iterator for SleepPlan {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.is_done() {
            return None;
        }
        let chunk = self.remaining.min(MAX_SLEEP_CHUNK);
        self.remaining -= chunk;
        Some(chunk)
    }
}

pub struct SleepHelper {
    watchdog: Watchdog,
    alarm: Box<dyn AlarmSleep>,
    longest_allowable_sleep: Duration,
}

impl core::fmt::Debug for SleepHelper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SleepHelper")
            .field("watchdog", &self.watchdog)
            .field("longest_allowable_sleep", &self.longest_allowable_sleep)
            .finish_non_exhaustive()
    }
}

impl SleepHelper {
    pub fn new(watchdog: Watchdog, alarm: Box<dyn AlarmSleep>, config: &Config) -> Self {
        Self {
            watchdog,
            alarm,
            longest_allowable_sleep: Duration::from_secs(config.longest_allowable_sleep_time),
        }
    }

    pub fn longest_allowable_sleep(&self) -> Duration {
        self.longest_allowable_sleep
    }

    pub fn set_longest_allowable_sleep(&mut self, ceiling: Duration) {
        self.longest_allowable_sleep = ceiling;
    }

    pub fn watchdog_mut(&mut self) -> &mut Watchdog {
        &mut self.watchdog
    }

    /// Sleep for `duration`, clamped to the configured ceiling.
    pub fn safe_sleep(&mut self, duration: Duration) {
        let plan = SleepPlan::new(duration, self.longest_allowable_sleep);
        debug!(
            requested_s = duration.as_secs_f64(),
            planned_s = plan.remaining().as_secs_f64(),
            "Setting Safe Sleep Mode"
        );

        self.watchdog.pet();
        for chunk in plan {
            self.alarm.light_sleep(chunk);
            self.watchdog.pet();
        }
    }

    fn hibernate(&mut self, satellite: &mut Satellite, duration: Duration) -> bool {
        self.watchdog.pet();
        satellite.set_softboot(true);
        self.safe_sleep(duration);
        true
    }

    pub fn short_hibernate(&mut self, satellite: &mut Satellite) -> bool {
        warn!("Short Hibernation Coming UP");
        self.hibernate(satellite, SHORT_HIBERNATE)
    }

    pub fn long_hibernate(&mut self, satellite: &mut Satellite) -> bool {
        warn!("LONG Hibernation Coming UP");
        self.hibernate(satellite, LONG_HIBERNATE)
    }
}
