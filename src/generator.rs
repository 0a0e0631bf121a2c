//! Generator startup and host-side driver.
//!
//! Startup order:
//!
//! 1. Validate [`DdsConfig`], derive both tuning words
//! 2. Disarm, then solve and program the timebase
//! 3. Reject an achieved tick rate outside the configured tolerance
//! 4. Build the engine with both accumulators at phase 0
//! 5. Arm the timebase (caller, after the tick handler is installed)
//!
//! Every failure happens before step 5, so a misconfigured generator never
//! produces a tone.

use crate::config::DdsConfig;
use crate::diagnostics::TickDiagnostics;
use crate::engine::{DdsEngine, CHANNELS};
use crate::error::StartupError;
use crate::fault::FaultState;
use crate::hal::{Channel, TickOutputs, TimerHal};
use crate::logging::LogStream;
use crate::timebase::{Timebase, TimebaseConfig};
use crate::tuning::Tuning;
use crate::waveform::Waveform;

/// Everything derived from the configuration at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupPlan {
    pub config: DdsConfig,
    pub tuning: Tuning,
    pub increments: [u32; CHANNELS],
    pub timebase: TimebaseConfig,
}

impl StartupPlan {
    /// Build the tick handler for this plan.
    pub fn engine<'a>(
        &self,
        waveform: &'a Waveform,
        diag: &'a TickDiagnostics,
        fault: &'a FaultState,
    ) -> DdsEngine<'a> {
        DdsEngine::new(waveform, self.increments, self.timebase.period, diag, fault)
    }

    /// Frequency `channel` actually produces, in millihertz.
    pub fn realized_millihz(&self, channel: Channel) -> u64 {
        self.tuning.realized_millihz(self.increments[channel.index()])
    }

    /// Log the startup parameters.
    pub fn log<const N: usize>(&self, now_us: i64, stream: &LogStream<N>) {
        let tb = &self.timebase;
        let achieved = tb.achieved_millihz();
        crate::dds_info!(
            stream,
            now_us,
            "timebase {} Hz: clock {} Hz / {} / {} = {}.{:03} Hz",
            tb.requested_hz,
            tb.clock_hz,
            tb.prescaler,
            tb.period,
            achieved / 1000,
            achieved % 1000
        );
        for channel in Channel::ALL {
            let realized = self.realized_millihz(channel);
            crate::dds_info!(
                stream,
                now_us,
                "tone {}: {} Hz, increment {}, realized {}.{:03} Hz",
                channel.as_str(),
                self.config.frequency(channel),
                self.increments[channel.index()],
                realized / 1000,
                realized % 1000
            );
        }
    }
}

/// Validate `config` and program `timebase`, leaving it disarmed.
///
/// `clock_hz` is the timer's source clock.
pub fn prepare<T: TimerHal>(
    config: &DdsConfig,
    timebase: &mut Timebase<T>,
    clock_hz: u32,
) -> Result<StartupPlan, StartupError> {
    let tuning = config.validate()?;
    let increments = config.increments()?;

    timebase.disable()?;
    let tb = timebase.configure(clock_hz, config.tick_rate_hz)?;
    tb.check_tolerance(config.rate_tolerance_ppm)?;

    Ok(StartupPlan {
        config: *config,
        tuning,
        increments,
        timebase: tb,
    })
}

/// Generator that owns its timer, engine and outputs.
///
/// Used where the tick handler can be called directly (host simulation,
/// tests). On hardware the engine is moved into the interrupt instead;
/// see `main.rs`.
pub struct DualToneGenerator<'a, T: TimerHal, O: TickOutputs> {
    timebase: Timebase<T>,
    engine: DdsEngine<'a>,
    outputs: O,
    plan: StartupPlan,
}

impl<'a, T: TimerHal, O: TickOutputs> DualToneGenerator<'a, T, O> {
    /// Run startup steps 1-4. The timebase is left disarmed.
    pub fn new(
        config: &DdsConfig,
        mut timebase: Timebase<T>,
        clock_hz: u32,
        outputs: O,
        waveform: &'a Waveform,
        diag: &'a TickDiagnostics,
        fault: &'a FaultState,
    ) -> Result<Self, StartupError> {
        let plan = prepare(config, &mut timebase, clock_hz)?;
        let engine = plan.engine(waveform, diag, fault);
        Ok(Self {
            timebase,
            engine,
            outputs,
            plan,
        })
    }

    /// Arm the tick.
    pub fn enable(&mut self) -> Result<(), StartupError> {
        self.timebase.enable()?;
        Ok(())
    }

    /// Disarm the tick. Accumulators hold their phase.
    pub fn disable(&mut self) -> Result<(), StartupError> {
        self.timebase.disable()?;
        Ok(())
    }

    /// Tick interrupt entry. Does nothing while the timebase is disarmed.
    #[inline]
    pub fn on_tick(&mut self) -> bool {
        if !self.timebase.is_enabled() {
            return false;
        }
        self.engine.tick(&mut self.outputs);
        true
    }

    /// Deliver up to `ticks` interrupts; returns how many ran.
    pub fn run(&mut self, ticks: u32) -> u32 {
        let mut ran = 0;
        for _ in 0..ticks {
            if !self.on_tick() {
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Retune `channel` to `frequency_hz` between ticks.
    ///
    /// Disarms the timebase around the increment write, as a tick must
    /// never see a half-updated tuning word, then restores the previous
    /// armed state.
    pub fn retune(&mut self, channel: Channel, frequency_hz: u32) -> Result<u32, StartupError> {
        let mut config = self.plan.config;
        match channel {
            Channel::A => config.channel_a_hz = frequency_hz,
            Channel::B => config.channel_b_hz = frequency_hz,
        }
        let increments = config.increments()?;
        let increment = increments[channel.index()];

        let was_enabled = self.timebase.is_enabled();
        self.timebase.disable()?;
        self.engine.set_increment(channel, increment);
        self.plan.config = config;
        self.plan.increments = increments;
        if was_enabled {
            self.timebase.enable()?;
        }
        Ok(increment)
    }

    /// Startup plan in effect
    pub fn plan(&self) -> &StartupPlan {
        &self.plan
    }

    /// The tick handler
    pub fn engine(&self) -> &DdsEngine<'a> {
        &self.engine
    }

    /// The outputs
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// The outputs, e.g. to adjust simulated timing
    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }

    /// The timebase driver
    pub fn timebase(&self) -> &Timebase<T> {
        &self.timebase
    }
}
