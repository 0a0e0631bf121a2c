//! DDS engine: the tick handler.
//!
//! Runs once per timebase tick. Per channel:
//!
//! ```text
//! phase  += increment            (wrapping, mod 2^32)
//! index   = phase >> 24          (top 8 bits)
//! sample  = waveform[index]
//! output  <- sample              (PWM duty target)
//! ```
//!
//! then publishes the tick count and the start/stop counter timestamps.
//!
//! # Rules
//!
//! - Constant time: two channels, one table lookup each
//! - No allocation, no blocking, no logging, no division
//! - Cannot fail; all arithmetic is wrapping or bounded by construction
//!
//! The engine owns the accumulators and increments. On hardware it is
//! moved into the interrupt handler, so nothing else can reach them.

use crate::diagnostics::TickDiagnostics;
use crate::fault::{FaultCode, FaultState};
use crate::hal::{Channel, TickOutputs};
use crate::waveform::{table_index, Waveform};

/// Number of output channels
pub const CHANNELS: usize = Channel::ALL.len();

/// One channel's phase accumulator and tuning word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseAccumulator {
    /// Current phase (32-bit fixed point, top 8 bits = table index)
    phase: u32,
    /// Phase increment per tick (determines frequency)
    increment: u32,
}

impl PhaseAccumulator {
    /// Accumulator at phase 0.
    pub const fn new(increment: u32) -> Self {
        Self { phase: 0, increment }
    }

    /// Step one tick and return the new phase.
    #[inline(always)]
    pub fn advance(&mut self) -> u32 {
        self.phase = self.phase.wrapping_add(self.increment);
        self.phase
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Tuning word
    #[inline]
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// Table index for the current phase
    #[inline]
    pub fn index(&self) -> u8 {
        table_index(self.phase)
    }
}

/// Two-channel DDS engine.
pub struct DdsEngine<'a> {
    channels: [PhaseAccumulator; CHANNELS],
    waveform: &'a Waveform,
    /// Timebase counts per tick (counter reload value)
    period: u32,
    diag: &'a TickDiagnostics,
    fault: &'a FaultState,
}

impl<'a> DdsEngine<'a> {
    /// Create an engine with both accumulators at phase 0.
    ///
    /// # Arguments
    /// * `waveform` - Table shared by both channels
    /// * `increments` - Tuning words for channel A and B
    /// * `period` - Timebase counts per tick, for overrun detection
    /// * `diag` - Diagnostics block the handler publishes to
    /// * `fault` - Fault state raised on a missed deadline
    pub fn new(
        waveform: &'a Waveform,
        increments: [u32; CHANNELS],
        period: u32,
        diag: &'a TickDiagnostics,
        fault: &'a FaultState,
    ) -> Self {
        Self {
            channels: [
                PhaseAccumulator::new(increments[Channel::A.index()]),
                PhaseAccumulator::new(increments[Channel::B.index()]),
            ],
            waveform,
            period,
            diag,
            fault,
        }
    }

    /// Run one tick: advance both channels and drive the outputs.
    ///
    /// # Timing
    ///
    /// Constant time. Must finish well within one timebase period;
    /// a handler still running at the next reload is counted as an
    /// overrun and raises [`FaultCode::DeadlineOverrun`].
    ///
    /// Only one reload can be seen: the counter reads cannot tell a
    /// handler that ran `d` counts from one that ran `d + period`. A
    /// handler longer than a full period whose exit read lands at or
    /// above its entry read is not flagged, and its duration is recorded
    /// modulo `period`.
    #[inline]
    pub fn tick<O: TickOutputs>(&mut self, outputs: &mut O) {
        outputs.tick_begin();
        let start = outputs.timebase_counter();

        for channel in Channel::ALL {
            let phase = self.channels[channel.index()].advance();
            outputs.set_channel_output(channel, self.waveform.at_phase(phase));
        }

        let stop = outputs.timebase_counter();

        // The counter reloads every period; stop below start means the
        // reload, and with it the next tick, happened during this handler.
        let overrun = stop < start;
        let elapsed = if overrun {
            self.period.wrapping_sub(start).wrapping_add(stop)
        } else {
            stop - start
        };
        if overrun {
            self.fault.set(FaultCode::DeadlineOverrun, elapsed);
        }

        self.diag.record(start, stop, elapsed, overrun);
        outputs.tick_end();
    }

    /// Current phase of `channel`
    #[inline]
    pub fn phase(&self, channel: Channel) -> u32 {
        self.channels[channel.index()].phase()
    }

    /// Tuning word of `channel`
    #[inline]
    pub fn increment(&self, channel: Channel) -> u32 {
        self.channels[channel.index()].increment()
    }

    /// Table index of `channel` at its current phase
    #[inline]
    pub fn index(&self, channel: Channel) -> u8 {
        self.channels[channel.index()].index()
    }

    /// Sample `channel` is currently outputting
    #[inline]
    pub fn sample(&self, channel: Channel) -> u8 {
        self.waveform.sample(self.index(channel))
    }

    /// Accumulator state of `channel`
    #[inline]
    pub fn accumulator(&self, channel: Channel) -> &PhaseAccumulator {
        &self.channels[channel.index()]
    }

    /// Replace the tuning word of `channel`, keeping its phase.
    ///
    /// The timebase interrupt must be disarmed while this runs: the
    /// handler owns the engine and a retune racing a tick would apply
    /// half-written state.
    pub fn set_increment(&mut self, channel: Channel, increment: u32) {
        self.channels[channel.index()].increment = increment;
    }

    /// Reset both accumulators to phase 0.
    pub fn reset(&mut self) {
        for acc in &mut self.channels {
            acc.phase = 0;
        }
    }

    /// Timebase counts per tick
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimOutputs;
    use crate::waveform::SINE;

    const INC_700: u32 = 48_103_300;
    const INC_1900: u32 = 130_566_100;

    #[test]
    fn test_accumulator_wraps() {
        let mut acc = PhaseAccumulator::new(0x8000_0000);
        assert_eq!(acc.advance(), 0x8000_0000);
        assert_eq!(acc.advance(), 0);
        assert_eq!(acc.advance(), 0x8000_0000);
    }

    #[test]
    fn test_single_tick_drives_both_channels() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let mut outputs = SimOutputs::new(640);
        let mut engine = DdsEngine::new(&SINE, [INC_700, INC_1900], 640, &diag, &fault);

        engine.tick(&mut outputs);

        assert_eq!(engine.phase(Channel::A), INC_700);
        assert_eq!(engine.index(Channel::A), 2);
        assert_eq!(outputs.output(Channel::A), SINE.sample(2));
        assert_eq!(engine.index(Channel::B), 7);
        assert_eq!(outputs.output(Channel::B), SINE.sample(7));
        assert_eq!(diag.ticks(), 1);
        assert!(!fault.is_active());
    }

    #[test]
    fn test_overrun_detected_on_counter_reload() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        // Handler entered late (count 600) and takes 60 counts: wraps past 640
        let mut outputs = SimOutputs::new(640);
        outputs.set_latency(600);
        outputs.set_handler_cost(60);
        let mut engine = DdsEngine::new(&SINE, [INC_700, INC_1900], 640, &diag, &fault);

        engine.tick(&mut outputs);

        assert_eq!(diag.timestamps().start, 600);
        assert_eq!(diag.timestamps().stop, 20);
        assert_eq!(diag.overruns(), 1);
        assert_eq!(diag.worst_case(), 60);
        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::DeadlineOverrun);
        assert_eq!(fault.data(), 60);
    }

    #[test]
    fn test_set_increment_keeps_phase() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let mut outputs = SimOutputs::new(640);
        let mut engine = DdsEngine::new(&SINE, [INC_700, INC_1900], 640, &diag, &fault);

        engine.tick(&mut outputs);
        engine.set_increment(Channel::A, 1);
        assert_eq!(engine.phase(Channel::A), INC_700);

        engine.tick(&mut outputs);
        assert_eq!(engine.phase(Channel::A), INC_700 + 1);

        engine.reset();
        assert_eq!(engine.phase(Channel::A), 0);
        assert_eq!(engine.phase(Channel::B), 0);
    }

    #[test]
    fn test_handler_longer_than_period_aliases() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        // Entry at 10, exit 300 counts later on a 256-count period: the exit
        // read (54) is above the entry read, so the extra reload is invisible
        let mut outputs = SimOutputs::new(256);
        outputs.set_latency(10);
        outputs.set_handler_cost(300);
        let mut engine = DdsEngine::new(&SINE, [INC_700, INC_1900], 256, &diag, &fault);

        engine.tick(&mut outputs);

        assert_eq!(diag.timestamps().stop, 54);
        assert_eq!(diag.overruns(), 0);
        assert_eq!(diag.worst_case(), 300 % 256);
        assert!(!fault.is_active());
    }

    #[test]
    fn test_timing_pin_brackets_output_writes() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let mut outputs = SimOutputs::new(640);
        let mut engine = DdsEngine::new(&SINE, [INC_700, INC_1900], 640, &diag, &fault);

        for _ in 0..5 {
            engine.tick(&mut outputs);
        }

        assert_eq!(outputs.timing_pulses(), 5);
        assert!(!outputs.timing_high());
        assert_eq!(outputs.writes_outside_pulse(), 0);
        assert_eq!(outputs.writes(Channel::A), 5);
    }
}
