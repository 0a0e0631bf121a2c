//! ESP32 peripherals: general purpose timer as timebase, LEDC as PWM.
//!
//! # Hardware Setup
//!
//! ```text
//! TIMER_GROUP0 / TIMER0 ──▶ tick ISR @ 62.5 kHz
//! LEDC ch0 (GPIO4) ───────▶ RC low-pass ──▶ tone A
//! LEDC ch1 (GPIO5) ───────▶ RC low-pass ──▶ tone B
//! timing pin (GPIO7) ─────▶ scope: high while the tick handler runs
//! ```
//!
//! Pins shown for the ESP32-S3; see [`BoardPins`] for the other chips.
//!
//! PWM runs at 312.5 kHz with 8-bit duty, five times the tick rate, so
//! each sample spans several PWM periods before the external filter.

use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, OutputPin, PinDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig as LedcTimerConfig;
use esp_idf_svc::hal::ledc::{LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::timer::config::Config as GpTimerConfig;
use esp_idf_svc::hal::timer::{TimerDriver, TIMER00};
use esp_idf_svc::sys;

use super::{Channel, HalError, TickOutputs, TimerHal};
use crate::timebase::TimebaseConfig;

/// APB clock feeding the general purpose timers
pub const APB_CLOCK_HZ: u32 = 80_000_000;

/// LEDC frequency: APB / 256 at 8-bit resolution
pub const PWM_FREQ_HZ: u32 = APB_CLOCK_HZ / 256;

const GROUP: sys::timer_group_t = sys::timer_group_t_TIMER_GROUP_0;
const INDEX: sys::timer_idx_t = sys::timer_idx_t_TIMER_0;

/// Timebase on TIMER_GROUP0 / TIMER0.
///
/// The prescaler is fixed when the driver is created, so the first
/// `configure_timebase` decides it; later calls may only change the period.
pub struct EspTimer {
    peripheral: Option<TIMER00>,
    driver: Option<TimerDriver<'static>>,
    divider: u32,
}

impl EspTimer {
    pub fn new(timer: TIMER00) -> Self {
        Self {
            peripheral: Some(timer),
            driver: None,
            divider: 0,
        }
    }

    /// Install the tick handler.
    ///
    /// # Safety
    ///
    /// `handler` runs in interrupt context: it must not block, allocate
    /// or log. Call with the interrupt disarmed.
    pub unsafe fn install_handler<F>(&mut self, handler: F) -> Result<(), HalError>
    where
        F: FnMut() + Send + 'static,
    {
        let driver = self.driver.as_mut().ok_or(HalError::Interrupt)?;
        driver.subscribe(handler).map_err(|_| HalError::Interrupt)
    }

    fn driver(&mut self) -> Result<&mut TimerDriver<'static>, HalError> {
        self.driver.as_mut().ok_or(HalError::TimerInit)
    }
}

impl TimerHal for EspTimer {
    fn configure_timebase(&mut self, config: &TimebaseConfig) -> Result<(), HalError> {
        if !(2..=65536).contains(&config.prescaler) {
            return Err(HalError::Unsupported);
        }

        if self.driver.is_none() {
            let timer = self.peripheral.take().ok_or(HalError::TimerInit)?;
            let timer_config = GpTimerConfig::new()
                .divider(config.prescaler)
                .auto_reload(true);
            let driver = TimerDriver::new(timer, &timer_config).map_err(|_| HalError::TimerInit)?;
            self.driver = Some(driver);
            self.divider = config.prescaler;
        } else if self.divider != config.prescaler {
            return Err(HalError::Unsupported);
        }

        let driver = self.driver()?;
        driver.set_counter(0).map_err(|_| HalError::TimerInit)?;
        driver
            .set_alarm(config.period as u64)
            .map_err(|_| HalError::TimerInit)?;
        driver.enable_alarm(true).map_err(|_| HalError::TimerInit)?;
        Ok(())
    }

    fn enable_timebase_interrupt(&mut self) -> Result<(), HalError> {
        let driver = self.driver()?;
        driver.enable_interrupt().map_err(|_| HalError::Interrupt)?;
        driver.enable(true).map_err(|_| HalError::Interrupt)
    }

    fn disable_timebase_interrupt(&mut self) -> Result<(), HalError> {
        match self.driver.as_mut() {
            // Never configured: nothing can be armed
            None => Ok(()),
            Some(driver) => driver.disable_interrupt().map_err(|_| HalError::Interrupt),
        }
    }
}

/// GPIO numbers used by the generator on the selected chip.
#[derive(Clone, Copy, Debug)]
pub struct BoardPins {
    pub tone_a: u8,
    pub tone_b: u8,
    pub log_tx: u8,
    pub isr_timing: u8,
    pub loop_timing: u8,
}

impl BoardPins {
    #[cfg(not(feature = "esp32p4"))]
    pub const SELECTED: BoardPins = BoardPins {
        tone_a: 4,
        tone_b: 5,
        log_tx: 6,
        isr_timing: 7,
        loop_timing: 15,
    };

    #[cfg(feature = "esp32p4")]
    pub const SELECTED: BoardPins = BoardPins {
        tone_a: 20,
        tone_b: 21,
        log_tx: 37,
        isr_timing: 22,
        loop_timing: 23,
    };
}

/// Scope pin driven high for the duration of some activity.
pub struct TimingPin {
    driver: PinDriver<'static, AnyOutputPin, Output>,
}

impl TimingPin {
    pub fn new(pin: impl OutputPin + 'static) -> Result<Self, HalError> {
        let mut driver = PinDriver::output(pin.downgrade_output()).map_err(|_| HalError::PwmInit)?;
        let _ = driver.set_low();
        Ok(Self { driver })
    }

    /// Raise the pin. ISR-safe.
    #[inline(always)]
    pub fn high(&mut self) {
        let _ = self.driver.set_high();
    }

    /// Lower the pin. ISR-safe.
    #[inline(always)]
    pub fn low(&mut self) {
        let _ = self.driver.set_low();
    }
}

/// LEDC timer shared by both tone channels.
pub fn pwm_timer<T: LedcTimer + 'static>(
    timer: impl Peripheral<P = T> + 'static,
) -> Result<LedcTimerDriver<'static, T>, HalError> {
    let config = LedcTimerConfig::new()
        .frequency(PWM_FREQ_HZ.Hz())
        .resolution(Resolution::Bits8);
    LedcTimerDriver::new(timer, &config).map_err(|_| HalError::PwmInit)
}

/// Two LEDC channels driven from the tick handler.
pub struct EspPwmOutputs {
    channels: [LedcDriver<'static>; 2],
    timing: Option<TimingPin>,
}

impl EspPwmOutputs {
    /// Attach channel A and B to their pins, both at mid-scale.
    pub fn new<T, CA, CB>(
        timer: &'static LedcTimerDriver<'static, T>,
        channel_a: impl Peripheral<P = CA> + 'static,
        pin_a: impl Peripheral<P = impl OutputPin> + 'static,
        channel_b: impl Peripheral<P = CB> + 'static,
        pin_b: impl Peripheral<P = impl OutputPin> + 'static,
    ) -> Result<Self, HalError>
    where
        T: LedcTimer + 'static,
        CA: LedcChannel<SpeedMode = T::SpeedMode>,
        CB: LedcChannel<SpeedMode = T::SpeedMode>,
    {
        let a = LedcDriver::new(channel_a, timer, pin_a).map_err(|_| HalError::PwmInit)?;
        let b = LedcDriver::new(channel_b, timer, pin_b).map_err(|_| HalError::PwmInit)?;
        let mut outputs = Self {
            channels: [a, b],
            timing: None,
        };
        for channel in Channel::ALL {
            outputs.set_channel_output(channel, crate::waveform::MID_SCALE);
        }
        Ok(outputs)
    }

    /// Raise `pin` for the duration of every tick.
    pub fn with_timing_pin(mut self, pin: TimingPin) -> Self {
        self.timing = Some(pin);
        self
    }
}

impl TickOutputs for EspPwmOutputs {
    #[inline(always)]
    fn set_channel_output(&mut self, channel: Channel, sample: u8) {
        // Duty update cannot fail for an in-range 8-bit value
        let _ = self.channels[channel.index()].set_duty(sample as u32);
    }

    #[inline(always)]
    fn timebase_counter(&self) -> u32 {
        // SAFETY: ISR-safe register read; the timer is initialized before
        // the handler that calls this is installed.
        unsafe { sys::timer_group_get_counter_value_in_isr(GROUP, INDEX) as u32 }
    }

    #[inline(always)]
    fn tick_begin(&mut self) {
        if let Some(pin) = self.timing.as_mut() {
            pin.high();
        }
    }

    #[inline(always)]
    fn tick_end(&mut self) {
        if let Some(pin) = self.timing.as_mut() {
            pin.low();
        }
    }
}
