//! Deterministic hardware doubles for testing
//!
//! All doubles created from one [`MockBoard`] share a simulated clock and an
//! event timeline. Handles are cheap clones over the same state, so a test can
//! move one clone into the component under test and inspect another.
//!
//! ```
//! use cubesat_fsw::platform::mock::{MockBoard, MockEvent};
//! use cubesat_fsw::platform::{AlarmSleep, Clock};
//! use core::time::Duration;
//!
//! let board = MockBoard::new();
//! let mut alarm = board.alarm();
//! alarm.light_sleep(Duration::from_secs(15));
//! assert_eq!(board.clock().now(), Duration::from_secs(15));
//! assert_eq!(board.events(), vec![MockEvent::Sleep(Duration::from_secs(15))]);
//! ```

use super::{
    AlarmSleep, Clock, Delay, FrameBuffer, Modulation, OutputPin, PowerMonitor, Radio,
    SystemControl, TemperatureSensor,
};
use crate::error::{HardwareError, RadioError};
use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::collections::VecDeque;
use std::rc::Rc;

/// One observable hardware interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    PinHigh,
    PinLow,
    Delay(Duration),
    Sleep(Duration),
    Sent(Vec<u8>),
}

/// Panic payload raised by [`MockSystem::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceReset;

/// Panic payload raised by [`MockSystem::deep_sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepSleep;

type Timeline = Rc<RefCell<Vec<MockEvent>>>;

/// Factory for doubles that share time and a timeline.
#[derive(Debug, Clone, Default)]
pub struct MockBoard {
    clock: MockClock,
    timeline: Timeline,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> MockClock {
        self.clock.clone()
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            clock: self.clock.clone(),
            timeline: Rc::clone(&self.timeline),
        }
    }

    pub fn alarm(&self) -> MockAlarm {
        MockAlarm {
            clock: self.clock.clone(),
            timeline: Rc::clone(&self.timeline),
        }
    }

    pub fn pin(&self) -> MockPin {
        MockPin {
            failures_remaining: Rc::new(Cell::new(0)),
            timeline: Rc::clone(&self.timeline),
        }
    }

    pub fn radio(&self) -> MockRadio {
        MockRadio {
            state: Rc::new(RefCell::new(MockRadioState {
                inbox: VecDeque::new(),
                send_results: VecDeque::new(),
                attempts: 0,
                temperature: Some(24.5),
                modulation: Modulation::LoRa,
            })),
            timeline: Rc::clone(&self.timeline),
        }
    }

    pub fn system(&self) -> MockSystem {
        MockSystem::default()
    }

    /// Power monitor reading a healthy 7.4 V bus charging at 0.5 A.
    pub fn power_monitor(&self) -> MockPowerMonitor {
        MockPowerMonitor::new(Some(7.4), Some(0.5))
    }

    /// Snapshot of every interaction so far, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.timeline.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.timeline.borrow_mut().clear();
    }

    /// Number of complete high-then-low pulses on any pin.
    pub fn pulses(&self) -> usize {
        self.timeline
            .borrow()
            .windows(3)
            .filter(|w| {
                matches!(
                    w,
                    [MockEvent::PinHigh, MockEvent::Delay(_), MockEvent::PinLow]
                )
            })
            .count()
    }

    /// Payloads handed to any radio, in transmission order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.timeline
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Sent(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Durations passed to any delay, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.timeline
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Delay(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    /// Durations passed to any alarm sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.timeline
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Sleep(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<Duration>>,
}

impl MockClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Delay that only advances simulated time.
#[derive(Debug, Clone)]
pub struct MockDelay {
    clock: MockClock,
    timeline: Timeline,
}

impl Delay for MockDelay {
    fn delay(&mut self, duration: Duration) {
        self.clock.advance(duration);
        self.timeline.borrow_mut().push(MockEvent::Delay(duration));
    }
}

#[derive(Debug, Clone)]
pub struct MockAlarm {
    clock: MockClock,
    timeline: Timeline,
}

impl AlarmSleep for MockAlarm {
    fn light_sleep(&mut self, duration: Duration) {
        self.clock.advance(duration);
        self.timeline.borrow_mut().push(MockEvent::Sleep(duration));
    }
}

#[derive(Debug, Clone)]
pub struct MockPin {
    failures_remaining: Rc<Cell<u32>>,
    timeline: Timeline,
}

impl MockPin {
    /// Make the next `count` pin operations fail.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.set(count);
    }

    fn check(&self) -> Result<(), HardwareError> {
        let remaining = self.failures_remaining.get();
        if remaining > 0 {
            self.failures_remaining.set(remaining - 1);
            return Err(HardwareError::Pin);
        }
        Ok(())
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.check()?;
        self.timeline.borrow_mut().push(MockEvent::PinHigh);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.check()?;
        self.timeline.borrow_mut().push(MockEvent::PinLow);
        Ok(())
    }
}

#[derive(Debug)]
struct MockRadioState {
    inbox: VecDeque<FrameBuffer>,
    send_results: VecDeque<Result<(), RadioError>>,
    attempts: u32,
    temperature: Option<f32>,
    modulation: Modulation,
}

/// Radio with a scripted inbox and scripted send outcomes.
///
/// Sends succeed unless an outcome was queued with [`MockRadio::script_send`].
/// Only successful sends are recorded on the timeline.
#[derive(Debug, Clone)]
pub struct MockRadio {
    state: Rc<RefCell<MockRadioState>>,
    timeline: Timeline,
}

impl MockRadio {
    /// Queue an inbound frame. Frames longer than the radio buffer are truncated.
    pub fn push_inbound(&self, frame: &[u8]) {
        let mut buffer = FrameBuffer::new();
        let take = frame.len().min(buffer.capacity());
        let _ = buffer.extend_from_slice(&frame[..take]);
        self.state.borrow_mut().inbox.push_back(buffer);
    }

    pub fn script_send(&self, result: Result<(), RadioError>) {
        self.state.borrow_mut().send_results.push_back(result);
    }

    /// Total send attempts, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.state.borrow().attempts
    }

    pub fn set_temperature(&self, temperature: Option<f32>) {
        self.state.borrow_mut().temperature = temperature;
    }

    pub fn set_modulation(&self, modulation: Modulation) {
        self.state.borrow_mut().modulation = modulation;
    }

    pub fn pending_inbound(&self) -> usize {
        self.state.borrow().inbox.len()
    }
}

impl Radio for MockRadio {
    fn send(&mut self, data: &[u8]) -> Result<(), RadioError> {
        let result = {
            let mut state = self.state.borrow_mut();
            state.attempts += 1;
            state.send_results.pop_front().unwrap_or(Ok(()))
        };
        if result.is_ok() {
            self.timeline
                .borrow_mut()
                .push(MockEvent::Sent(data.to_vec()));
        }
        result
    }

    fn receive(&mut self) -> Option<FrameBuffer> {
        self.state.borrow_mut().inbox.pop_front()
    }

    fn temperature(&mut self) -> Option<f32> {
        self.state.borrow().temperature
    }

    fn modulation(&self) -> Modulation {
        self.state.borrow().modulation
    }
}

#[derive(Debug, Clone)]
pub struct MockTemperature {
    value: Rc<Cell<Option<f32>>>,
}

impl MockTemperature {
    pub fn new(value: Option<f32>) -> Self {
        Self {
            value: Rc::new(Cell::new(value)),
        }
    }

    pub fn set(&self, value: Option<f32>) {
        self.value.set(value);
    }
}

impl TemperatureSensor for MockTemperature {
    fn temperature(&mut self) -> Option<f32> {
        self.value.get()
    }
}

#[derive(Debug, Clone, Copy)]
struct PowerReadings {
    bus_voltage: Option<f32>,
    current: Option<f32>,
}

/// Power monitor with settable readings and a shared read counter.
#[derive(Debug, Clone)]
pub struct MockPowerMonitor {
    readings: Rc<Cell<PowerReadings>>,
    reads: Rc<Cell<u32>>,
}

impl MockPowerMonitor {
    pub fn new(bus_voltage: Option<f32>, current: Option<f32>) -> Self {
        Self {
            readings: Rc::new(Cell::new(PowerReadings {
                bus_voltage,
                current,
            })),
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn set_bus_voltage(&self, bus_voltage: Option<f32>) {
        let mut readings = self.readings.get();
        readings.bus_voltage = bus_voltage;
        self.readings.set(readings);
    }

    pub fn set_current(&self, current: Option<f32>) {
        let mut readings = self.readings.get();
        readings.current = current;
        self.readings.set(readings);
    }

    /// Total readings taken, all channels.
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    fn read(&self, pick: impl FnOnce(PowerReadings) -> Option<f32>) -> Option<f32> {
        self.reads.set(self.reads.get() + 1);
        pick(self.readings.get())
    }
}

impl PowerMonitor for MockPowerMonitor {
    fn bus_voltage(&mut self) -> Option<f32> {
        self.read(|r| r.bus_voltage)
    }

    fn shunt_voltage(&mut self) -> Option<f32> {
        self.read(|r| r.current.map(|amps| amps * 0.1))
    }

    fn current(&mut self) -> Option<f32> {
        self.read(|r| r.current)
    }
}

/// System control that unwinds instead of resetting.
#[derive(Debug, Clone, Default)]
pub struct MockSystem {
    resets: Rc<Cell<u32>>,
    deep_sleeps: Rc<Cell<u32>>,
}

impl MockSystem {
    pub fn resets(&self) -> u32 {
        self.resets.get()
    }

    pub fn deep_sleeps(&self) -> u32 {
        self.deep_sleeps.get()
    }
}

impl SystemControl for MockSystem {
    fn reset(&mut self) -> ! {
        self.resets.set(self.resets.get() + 1);
        std::panic::panic_any(DeviceReset)
    }

    fn deep_sleep(&mut self) -> ! {
        self.deep_sleeps.set(self.deep_sleeps.get() + 1);
        std::panic::panic_any(DeepSleep)
    }
}
