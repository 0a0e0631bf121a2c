//! Host simulation of the generator peripherals.
//!
//! Lets the engine, timebase and status reporter run on the host: the
//! timer only records what it was told, and the tick "interrupt" is the
//! caller invoking the handler while the timer is armed
//! (see [`DualToneGenerator::run`](crate::generator::DualToneGenerator::run)).

use core::cell::Cell;

use super::{Channel, HalError, TickOutputs, TimerHal};
use crate::engine::CHANNELS;
use crate::timebase::TimebaseConfig;

/// Simulated timer peripheral.
#[derive(Debug, Default)]
pub struct SimTimer {
    config: Option<TimebaseConfig>,
    armed: bool,
    enable_calls: u32,
    disable_calls: u32,
    fail_next: Option<HalError>,
}

impl SimTimer {
    /// Create a disarmed, unconfigured timer.
    pub const fn new() -> Self {
        Self {
            config: None,
            armed: false,
            enable_calls: 0,
            disable_calls: 0,
            fail_next: None,
        }
    }

    /// Make the next HAL call fail with `error`.
    pub fn fail_next(&mut self, error: HalError) {
        self.fail_next = Some(error);
    }

    /// Last programmed configuration
    pub fn config(&self) -> Option<&TimebaseConfig> {
        self.config.as_ref()
    }

    /// True while the tick interrupt is armed
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of enable calls that reached the peripheral
    pub fn enable_calls(&self) -> u32 {
        self.enable_calls
    }

    /// Number of disable calls that reached the peripheral
    pub fn disable_calls(&self) -> u32 {
        self.disable_calls
    }

    fn check(&mut self) -> Result<(), HalError> {
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl TimerHal for SimTimer {
    fn configure_timebase(&mut self, config: &TimebaseConfig) -> Result<(), HalError> {
        self.check()?;
        self.config = Some(*config);
        Ok(())
    }

    fn enable_timebase_interrupt(&mut self) -> Result<(), HalError> {
        self.check()?;
        self.enable_calls += 1;
        self.armed = true;
        Ok(())
    }

    fn disable_timebase_interrupt(&mut self) -> Result<(), HalError> {
        self.check()?;
        self.disable_calls += 1;
        self.armed = false;
        Ok(())
    }
}

/// Simulated PWM outputs and timebase counter.
///
/// The counter reads alternate between handler entry and exit:
/// entry returns the configured interrupt latency, exit returns latency
/// plus handler cost, wrapped at the period like the real reload.
#[derive(Debug)]
pub struct SimOutputs {
    duty: [u8; CHANNELS],
    writes: [u32; CHANNELS],
    period: u32,
    latency: u32,
    cost: u32,
    reads: Cell<u32>,
    timing_high: bool,
    timing_pulses: u32,
    writes_outside_pulse: u32,
}

impl SimOutputs {
    /// Outputs for a timebase reloading every `period` counts.
    pub const fn new(period: u32) -> Self {
        Self {
            duty: [crate::waveform::MID_SCALE; CHANNELS],
            writes: [0; CHANNELS],
            period,
            latency: 1,
            cost: 1,
            reads: Cell::new(0),
            timing_high: false,
            timing_pulses: 0,
            writes_outside_pulse: 0,
        }
    }

    /// Counter value seen at handler entry.
    pub fn set_latency(&mut self, counts: u32) {
        self.latency = counts;
    }

    /// Counts elapsed between the handler's two counter reads.
    pub fn set_handler_cost(&mut self, counts: u32) {
        self.cost = counts;
    }

    /// Last duty written to `channel`
    pub fn output(&self, channel: Channel) -> u8 {
        self.duty[channel.index()]
    }

    /// Number of duty writes to `channel`
    pub fn writes(&self, channel: Channel) -> u32 {
        self.writes[channel.index()]
    }

    /// Level of the handler timing pin
    pub fn timing_high(&self) -> bool {
        self.timing_high
    }

    /// Completed high pulses on the timing pin
    pub fn timing_pulses(&self) -> u32 {
        self.timing_pulses
    }

    /// Duty writes made while the timing pin was low
    pub fn writes_outside_pulse(&self) -> u32 {
        self.writes_outside_pulse
    }
}

impl TickOutputs for SimOutputs {
    fn set_channel_output(&mut self, channel: Channel, sample: u8) {
        self.duty[channel.index()] = sample;
        self.writes[channel.index()] = self.writes[channel.index()].wrapping_add(1);
        if !self.timing_high {
            self.writes_outside_pulse += 1;
        }
    }

    fn tick_begin(&mut self) {
        self.timing_high = true;
    }

    fn tick_end(&mut self) {
        if self.timing_high {
            self.timing_pulses += 1;
        }
        self.timing_high = false;
    }

    fn timebase_counter(&self) -> u32 {
        let n = self.reads.get();
        self.reads.set(n.wrapping_add(1));
        let count = if n & 1 == 0 {
            self.latency
        } else {
            self.latency.wrapping_add(self.cost)
        };
        if self.period == 0 {
            count
        } else {
            count % self.period
        }
    }
}
