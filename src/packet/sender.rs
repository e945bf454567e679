use super::{PacketManager, ACK, MAX_PACKET_SIZE};
use crate::config::RadioConfig;
use crate::error::RadioError;
use crate::platform::{Delay, FrameBuffer, Modulation, Radio};
use crate::retry::RetryPolicy;
use core::time::Duration;
use tracing::{debug, error, info, warn};

/// Retrying transmitter over the radio.
pub struct PacketSender {
    radio: Box<dyn Radio>,
    delay: Box<dyn Delay>,
    manager: PacketManager,
    retry: RetryPolicy,
    send_delay: Duration,
    license: String,
}

impl core::fmt::Debug for PacketSender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacketSender")
            .field("manager", &self.manager)
            .field("retry", &self.retry)
            .field("send_delay", &self.send_delay)
            .finish_non_exhaustive()
    }
}

/// One transmission, gated on the station license.
fn transmit(radio: &mut dyn Radio, license: &str, data: &[u8]) -> Result<(), RadioError> {
    if license.is_empty() {
        warn!("radio license is empty, refusing to transmit");
        return Err(RadioError::NotLicensed);
    }
    if data.len() > MAX_PACKET_SIZE {
        return Err(RadioError::PayloadTooLarge(data.len()));
    }
    radio.send(data)
}

impl PacketSender {
    pub fn new(radio: Box<dyn Radio>, delay: Box<dyn Delay>, config: &RadioConfig) -> Self {
        Self {
            radio,
            delay,
            manager: PacketManager::new(config.max_packet_size),
            retry: config.retry,
            send_delay: Duration::from_millis(config.send_delay_ms),
            license: config.license.clone(),
        }
    }

    pub fn manager(&self) -> &PacketManager {
        &self.manager
    }

    pub fn set_license(&mut self, license: &str) {
        self.license = license.to_string();
    }

    /// Fragment `payload` and send every packet in order.
    ///
    /// Each packet is retried under the configured policy. Returns `false`
    /// as soon as one packet exhausts its attempts; the rest are not sent.
    pub fn send(&mut self, payload: &[u8]) -> bool {
        let fragments = self.manager.fragment(payload);
        let total = fragments.len();
        debug!(bytes = payload.len(), packets = total, "sending payload");

        for packet in fragments {
            let radio = self.radio.as_mut();
            let license = self.license.as_str();
            let outcome = self.retry.run_while(
                self.delay.as_mut(),
                |attempt| {
                    debug!(packet = packet.index, attempt, "transmitting packet");
                    transmit(radio, license, packet.bytes)
                },
                RadioError::is_transient,
            );

            if let Err(e) = outcome {
                error!(
                    packet = packet.index,
                    total,
                    attempts = e.attempts,
                    error = %e.last_error,
                    "packet send failed, giving up"
                );
                return false;
            }

            if total > 1 && !packet.is_last() {
                self.delay.delay(self.send_delay);
            }
        }

        true
    }

    pub fn send_text(&mut self, text: &str) -> bool {
        self.send(text.as_bytes())
    }

    pub fn send_ack(&mut self) -> bool {
        info!("sending acknowledgement");
        self.send(ACK)
    }

    /// Single transmission without retry or fragmentation.
    ///
    /// # Errors
    ///
    /// Returns the radio failure unchanged.
    pub fn send_once(&mut self, data: &[u8]) -> Result<(), RadioError> {
        transmit(self.radio.as_mut(), &self.license, data)
    }

    pub fn receive(&mut self) -> Option<FrameBuffer> {
        self.radio.receive()
    }

    pub fn radio_temperature(&mut self) -> Option<f32> {
        self.radio.temperature()
    }

    pub fn modulation(&self) -> Modulation {
        self.radio.modulation()
    }
}
