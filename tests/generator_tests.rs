//! Generator startup, enable/disable and status reporting tests

use dual_tone_dds::config::ConfigError;
use dual_tone_dds::generator::prepare;
use dual_tone_dds::hal::sim::{SimOutputs, SimTimer};
use dual_tone_dds::hal::HalError;
use dual_tone_dds::logging::LogStream;
use dual_tone_dds::timebase::{TimebaseError, TimebaseState};
use dual_tone_dds::{
    Channel, DdsConfig, DualToneGenerator, FaultState, StartupError, StatusReporter, TickDiagnostics,
    Timebase, TimerCaps, SINE,
};

const CLOCK: u32 = 16_000_000;

fn sim_timebase() -> Timebase<SimTimer> {
    Timebase::new(SimTimer::new(), TimerCaps::AVR_TIMER2)
}

#[test]
fn test_reference_startup() {
    let diag = TickDiagnostics::new();
    let fault = FaultState::new();
    let mut generator = DualToneGenerator::new(
        &DdsConfig::REFERENCE,
        sim_timebase(),
        CLOCK,
        SimOutputs::new(256),
        &SINE,
        &diag,
        &fault,
    )
    .unwrap();

    let plan = *generator.plan();
    assert_eq!(plan.increments, [48_103_300, 130_566_100]);
    assert_eq!(plan.tuning.steps_per_hz(), 68_719);
    assert_eq!(plan.timebase.prescaler, 1);
    assert_eq!(plan.timebase.period, 256);
    assert_eq!(plan.realized_millihz(Channel::A), 699_995);
    assert_eq!(plan.realized_millihz(Channel::B), 1_899_986);

    // Disarmed until enabled, accumulators at zero
    assert_eq!(generator.timebase().state(), TimebaseState::Disarmed);
    assert_eq!(generator.engine().phase(Channel::A), 0);
    assert_eq!(generator.engine().phase(Channel::B), 0);
    assert_eq!(generator.outputs().output(Channel::A), 127);

    generator.enable().unwrap();
    assert_eq!(generator.run(62_500), 62_500);
    assert_eq!(diag.ticks(), 62_500);
}

#[test]
fn test_no_ticks_while_disarmed() {
    let diag = TickDiagnostics::new();
    let fault = FaultState::new();
    let mut generator = DualToneGenerator::new(
        &DdsConfig::REFERENCE,
        sim_timebase(),
        CLOCK,
        SimOutputs::new(256),
        &SINE,
        &diag,
        &fault,
    )
    .unwrap();

    assert!(!generator.on_tick());
    assert_eq!(generator.run(100), 0);

    generator.enable().unwrap();
    assert_eq!(generator.run(10), 10);
    let held = generator.engine().phase(Channel::A);

    generator.disable().unwrap();
    assert_eq!(generator.run(10), 0);
    assert_eq!(generator.engine().phase(Channel::A), held);
    assert_eq!(generator.outputs().writes(Channel::A), 10);

    // Resumes from the held phase
    generator.enable().unwrap();
    generator.run(1);
    assert_eq!(generator.engine().phase(Channel::A), held.wrapping_add(48_103_300));
}

#[test]
fn test_invalid_config_never_touches_timer() {
    let config = DdsConfig {
        channel_b_hz: 40_000,
        ..DdsConfig::REFERENCE
    };
    let mut tb = sim_timebase();

    let err = prepare(&config, &mut tb, CLOCK).unwrap_err();
    assert_eq!(err, StartupError::Config(ConfigError::AboveNyquist(Channel::B)));
    assert_eq!(err.code(), "C03");
    assert!(tb.hal().config().is_none());
    assert!(!tb.hal().is_armed());
}

#[test]
fn test_zero_frequency_rejected() {
    let config = DdsConfig {
        channel_a_hz: 0,
        ..DdsConfig::REFERENCE
    };
    let err = prepare(&config, &mut sim_timebase(), CLOCK).unwrap_err();
    assert_eq!(err, StartupError::Config(ConfigError::ZeroFrequency(Channel::A)));
}

#[test]
fn test_inexact_tick_rate_rejected() {
    // 16 MHz / 256 cannot make 62 501 Hz
    let config = DdsConfig {
        tick_rate_hz: 62_501,
        ..DdsConfig::REFERENCE
    };
    let mut tb = sim_timebase();

    let err = prepare(&config, &mut tb, CLOCK).unwrap_err();
    assert!(matches!(
        err,
        StartupError::Timebase(TimebaseError::RateMismatch { requested_hz: 62_501, .. })
    ));
    assert!(!tb.is_enabled());
    assert!(!tb.hal().is_armed());
}

#[test]
fn test_tolerance_accepts_close_rate() {
    let config = DdsConfig {
        tick_rate_hz: 62_501,
        rate_tolerance_ppm: 20,
        ..DdsConfig::REFERENCE
    };
    let plan = prepare(&config, &mut sim_timebase(), CLOCK).unwrap();
    assert_eq!(plan.timebase.achieved_hz(), 62_500);
    // Tuning follows the nominal tick rate
    assert_eq!(plan.tuning.tick_rate_hz(), 62_501);
}

#[test]
fn test_timer_failure_is_startup_error() {
    let mut tb = sim_timebase();
    tb.hal_mut().fail_next(HalError::TimerInit);

    let err = prepare(&DdsConfig::REFERENCE, &mut tb, CLOCK).unwrap_err();
    assert_eq!(err, StartupError::Timebase(TimebaseError::Hal(HalError::TimerInit)));
    assert_eq!(err.code(), "T07");
}

#[test]
fn test_retune_keeps_phase_and_arm_state() {
    let diag = TickDiagnostics::new();
    let fault = FaultState::new();
    let mut generator = DualToneGenerator::new(
        &DdsConfig::REFERENCE,
        sim_timebase(),
        CLOCK,
        SimOutputs::new(256),
        &SINE,
        &diag,
        &fault,
    )
    .unwrap();
    generator.enable().unwrap();
    generator.run(3);
    let phase = generator.engine().phase(Channel::A);

    let increment = generator.retune(Channel::A, 1000).unwrap();
    assert_eq!(increment, 68_719_000);
    assert_eq!(generator.engine().phase(Channel::A), phase);
    assert_eq!(generator.engine().increment(Channel::B), 130_566_100);
    assert!(generator.timebase().is_enabled());
    assert_eq!(generator.timebase().hal().disable_calls(), 1);
    assert_eq!(generator.timebase().hal().enable_calls(), 2);
    assert_eq!(generator.plan().config.channel_a_hz, 1000);

    generator.run(1);
    assert_eq!(generator.engine().phase(Channel::A), phase.wrapping_add(68_719_000));
}

#[test]
fn test_retune_rejects_above_nyquist() {
    let diag = TickDiagnostics::new();
    let fault = FaultState::new();
    let mut generator = DualToneGenerator::new(
        &DdsConfig::REFERENCE,
        sim_timebase(),
        CLOCK,
        SimOutputs::new(256),
        &SINE,
        &diag,
        &fault,
    )
    .unwrap();
    generator.enable().unwrap();

    let err = generator.retune(Channel::B, 31_250).unwrap_err();
    assert_eq!(err, StartupError::Config(ConfigError::AboveNyquist(Channel::B)));
    assert_eq!(generator.engine().increment(Channel::B), 130_566_100);
    assert_eq!(generator.timebase().hal().disable_calls(), 0);
    assert!(generator.timebase().is_enabled());
}

#[test]
fn test_status_line_after_one_second() {
    let diag = TickDiagnostics::new();
    let fault = FaultState::new();
    let stream = LogStream::<8>::new();
    let mut outputs = SimOutputs::new(256);
    outputs.set_latency(3);
    outputs.set_handler_cost(38);
    let mut generator = DualToneGenerator::new(
        &DdsConfig::REFERENCE,
        sim_timebase(),
        CLOCK,
        outputs,
        &SINE,
        &diag,
        &fault,
    )
    .unwrap();
    let mut reporter = StatusReporter::new(&diag, &fault, DdsConfig::REFERENCE.report_interval_ticks);
    generator.enable().unwrap();

    generator.run(62_499);
    assert!(reporter.poll(999_984, &stream).is_none());
    assert_eq!(stream.pending(), 0);

    generator.run(1);
    let report = reporter.poll(1_000_000, &stream).unwrap();
    assert_eq!(report.ticks, 62_500);
    assert_eq!(report.new_overruns, 0);
    assert_eq!(stream.drain().unwrap().message(), "Timer tick ....  3 41");
    assert!(stream.drain().is_none());

    // Counter restarted for the next second
    assert_eq!(diag.ticks(), 0);
    generator.run(10);
    assert_eq!(diag.ticks(), 10);
}

#[test]
fn test_startup_log_lines() {
    let stream = LogStream::<8>::new();
    let plan = prepare(&DdsConfig::REFERENCE, &mut sim_timebase(), CLOCK).unwrap();

    plan.log(0, &stream);

    assert_eq!(
        stream.drain().unwrap().message(),
        "timebase 62500 Hz: clock 16000000 Hz / 1 / 256 = 62500.000 Hz"
    );
    assert_eq!(
        stream.drain().unwrap().message(),
        "tone A: 700 Hz, increment 48103300, realized 699.995 Hz"
    );
    assert_eq!(
        stream.drain().unwrap().message(),
        "tone B: 1900 Hz, increment 130566100, realized 1899.986 Hz"
    );
}
