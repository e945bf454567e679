use crate::error::HardwareError;
use crate::platform::{Delay, OutputPin};
use crate::retry::RetryPolicy;
use core::time::Duration;
use tracing::{debug, error, warn};

/// How long the pet line is held high.
pub const PET_PULSE: Duration = Duration::from_millis(10);

/// External hardware watchdog driven by a single output line.
pub struct Watchdog {
    pin: Box<dyn OutputPin>,
    delay: Box<dyn Delay>,
}

impl core::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Watchdog").finish_non_exhaustive()
    }
}

impl Watchdog {
    /// Claim the pet line and drive it low.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitFailed` when the line cannot be driven
    /// within the retry ceiling.
    pub fn new(
        mut pin: Box<dyn OutputPin>,
        mut delay: Box<dyn Delay>,
        retry: RetryPolicy,
    ) -> Result<Self, HardwareError> {
        debug!("Initializing watchdog");

        retry
            .run(delay.as_mut(), |_| pin.set_low())
            .map_err(|e| {
                error!(attempts = e.attempts, "watchdog pin failed to initialize");
                HardwareError::InitFailed {
                    device: "watchdog",
                    attempts: e.attempts,
                }
            })?;

        Ok(Self { pin, delay })
    }

    /// Pulse the line to restart the hardware countdown.
    ///
    /// Blocks for [`PET_PULSE`].
    pub fn pet(&mut self) {
        debug!("Petting watchdog");
        if self.pin.set_high().is_err() {
            warn!("watchdog line could not be driven high");
        }
        self.delay.delay(PET_PULSE);
        if self.pin.set_low().is_err() {
            warn!("watchdog line could not be driven low");
        }
    }
}
