//! Dual tone DDS generator - main entry point
//!
//! On the board:
//! 1. Bring up the log UART and print the banner
//! 2. Validate the build configuration and program the timebase (disarmed)
//! 3. Attach both PWM channels at mid-scale
//! 4. Install the tick handler, then arm the timebase
//! 5. Loop: status report, drain logs, sleep
//!
//! Two scope pins mirror the reference board: one high while the tick
//! handler runs, one high while the main loop reports and drains.
//!
//! On the host the same startup runs against simulated peripherals and a
//! few seconds of ticks are delivered directly.

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

/// Banner printed before anything else
const BANNER: &str = concat!("Dual Tone DDS generator, version ", env!("VERSION_STRING"));

#[cfg(target_os = "espidf")]
extern crate alloc;

#[cfg(target_os = "espidf")]
mod board {
    use alloc::boxed::Box;

    use esp_idf_svc::hal::gpio::OutputPin;
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys as esp_idf_sys;

    use dual_tone_dds::hal::esp::{
        pwm_timer, BoardPins, EspPwmOutputs, EspTimer, TimingPin, APB_CLOCK_HZ,
    };
    use dual_tone_dds::log_globals::{FAULT_STATE, LOG_STREAM, TICK_DIAGNOSTICS};
    use dual_tone_dds::uart_logger::{init_uart_logger, write_line, LogDrain, UartLoggerConfig};
    use dual_tone_dds::{
        dds_error, dds_info, generator, StartupError, StatusReporter, Timebase, TimerCaps,
        BUILD_CONFIG, SINE,
    };

    /// Main loop period in RTOS ticks
    const POLL_DELAY_TICKS: u32 = 10;

    fn now_us() -> i64 {
        unsafe { esp_idf_sys::esp_timer_get_time() }
    }

    /// Steps 2-4. The timebase is armed only if everything before succeeded.
    fn start(
        timer: esp_idf_svc::hal::timer::TIMER00,
        ledc: esp_idf_svc::hal::ledc::LEDC,
        pin_a: impl Peripheral<P = impl OutputPin> + 'static,
        pin_b: impl Peripheral<P = impl OutputPin> + 'static,
        isr_timing: impl OutputPin + 'static,
    ) -> Result<(), StartupError> {
        let mut timebase = Timebase::new(EspTimer::new(timer), TimerCaps::ESP32_GPTIMER);
        let plan = generator::prepare(&BUILD_CONFIG, &mut timebase, APB_CLOCK_HZ)?;
        plan.log(now_us(), &LOG_STREAM);

        // Both channels run for the life of the program, and so does their timer
        let pwm = Box::leak(Box::new(pwm_timer(ledc.timer0)?));
        let mut outputs = EspPwmOutputs::new(pwm, ledc.channel0, pin_a, ledc.channel1, pin_b)?
            .with_timing_pin(TimingPin::new(isr_timing)?);

        let mut engine = plan.engine(&SINE, &TICK_DIAGNOSTICS, &FAULT_STATE);

        // SAFETY: the handler only touches the engine, the outputs and the
        // lock-free diagnostics; the timebase is still disarmed.
        unsafe {
            timebase
                .hal_mut()
                .install_handler(move || engine.tick(&mut outputs))?;
        }
        timebase.enable()?;
        dds_info!(LOG_STREAM, now_us(), "timebase armed");

        // The timer driver must stay alive for the ISR
        Box::leak(Box::new(timebase));
        Ok(())
    }

    #[no_mangle]
    fn main() {
        esp_idf_sys::link_patches();

        let Ok(peripherals) = Peripherals::take() else {
            return;
        };
        let pins = peripherals.pins;

        #[cfg(not(feature = "esp32p4"))]
        let (tx, tone_a, tone_b, isr_timing, loop_timing) =
            (pins.gpio6, pins.gpio4, pins.gpio5, pins.gpio7, pins.gpio15);
        #[cfg(feature = "esp32p4")]
        let (tx, tone_a, tone_b, isr_timing, loop_timing) =
            (pins.gpio37, pins.gpio20, pins.gpio21, pins.gpio22, pins.gpio23);

        let mut uart = init_uart_logger(peripherals.uart1, tx, &UartLoggerConfig::default()).ok();

        dds_info!(LOG_STREAM, now_us(), "{}", super::BANNER);
        let map = BoardPins::SELECTED;
        dds_info!(
            LOG_STREAM,
            now_us(),
            "pins: tone A {}, tone B {}, ISR timing {}, loop timing {}",
            map.tone_a,
            map.tone_b,
            map.isr_timing,
            map.loop_timing
        );

        let mut loop_pin = TimingPin::new(loop_timing).ok();
        let started = start(peripherals.timer00, peripherals.ledc, tone_a, tone_b, isr_timing);
        if let Err(e) = started {
            dds_error!(LOG_STREAM, now_us(), "startup failed: {} - outputs idle", e);
        }

        let mut reporter = StatusReporter::new(
            &TICK_DIAGNOSTICS,
            &FAULT_STATE,
            BUILD_CONFIG.report_interval_ticks,
        );
        let mut drain = LogDrain::new();

        loop {
            if let Some(pin) = loop_pin.as_mut() {
                pin.high();
            }
            if started.is_ok() {
                reporter.poll(now_us(), &LOG_STREAM);
            }
            drain.drain(&LOG_STREAM, now_us(), |line| {
                if let Some(uart) = uart.as_mut() {
                    write_line(uart, line);
                }
            });
            if let Some(pin) = loop_pin.as_mut() {
                pin.low();
            }
            unsafe {
                esp_idf_sys::vTaskDelay(POLL_DELAY_TICKS);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use std::io::Write;

    use dual_tone_dds::hal::sim::{SimOutputs, SimTimer};
    use dual_tone_dds::log_globals::{FAULT_STATE, LOG_STREAM, TICK_DIAGNOSTICS};
    use dual_tone_dds::uart_logger::LogDrain;
    use dual_tone_dds::{
        dds_error, dds_info, DualToneGenerator, StatusReporter, Timebase, TimebaseConfig,
        TimerCaps, BUILD_CONFIG, SINE,
    };

    /// 16 MHz system clock of the 8-bit reference board
    const SIM_CLOCK_HZ: u32 = 16_000_000;
    /// Nominal seconds of output to simulate
    const SIM_SECONDS: u32 = 3;

    let caps = TimerCaps::AVR_TIMER2;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut drain = LogDrain::new();
    let mut flush = |now_us: i64, out: &mut std::io::StdoutLock<'_>| {
        drain.drain(&LOG_STREAM, now_us, |line| {
            let _ = out.write_all(line);
        });
    };

    dds_info!(LOG_STREAM, 0, "{}", BANNER);

    // Counter period for the simulated read-back; startup re-solves and checks it
    let period = TimebaseConfig::solve(SIM_CLOCK_HZ, BUILD_CONFIG.tick_rate_hz, &caps)
        .map(|c| c.period)
        .unwrap_or(0);

    let generator = DualToneGenerator::new(
        &BUILD_CONFIG,
        Timebase::new(SimTimer::new(), caps),
        SIM_CLOCK_HZ,
        SimOutputs::new(period),
        &SINE,
        &TICK_DIAGNOSTICS,
        &FAULT_STATE,
    );

    let mut generator = match generator {
        Ok(generator) => generator,
        Err(e) => {
            dds_error!(LOG_STREAM, 0, "startup failed: {}", e);
            flush(0, &mut out);
            std::process::exit(1);
        }
    };

    generator.plan().log(0, &LOG_STREAM);
    if let Err(e) = generator.enable() {
        dds_error!(LOG_STREAM, 0, "startup failed: {}", e);
        flush(0, &mut out);
        std::process::exit(1);
    }
    flush(0, &mut out);

    let tick_rate = u64::from(BUILD_CONFIG.tick_rate_hz);
    let interval = BUILD_CONFIG.report_interval_ticks.max(1);
    let total = u64::from(SIM_SECONDS) * tick_rate;
    let mut reporter = StatusReporter::new(&TICK_DIAGNOSTICS, &FAULT_STATE, interval);
    let mut elapsed: u64 = 0;

    while elapsed < total {
        let batch = (total - elapsed).min(u64::from(interval)) as u32;
        let ran = generator.run(batch);
        if ran == 0 {
            break;
        }
        elapsed += u64::from(ran);
        let now_us = (elapsed * 1_000_000 / tick_rate) as i64;
        reporter.poll(now_us, &LOG_STREAM);
        flush(now_us, &mut out);
    }

    let _ = generator.disable();
}
