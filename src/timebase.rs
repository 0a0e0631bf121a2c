//! Timebase driver: the fixed-rate tick behind the DDS engine.
//!
//! A free-running counter is clocked through a prescaler and reloads every
//! `period` counts, raising the tick interrupt:
//!
//! ```text
//! tick_rate = clock / (prescaler * period)
//! ```
//!
//! [`TimebaseConfig::solve`] picks the prescaler/period pair closest to the
//! requested rate. A timer rarely hits an arbitrary rate exactly, so the
//! achieved rate is always surfaced; every output frequency scales with it.

use crate::hal::{HalError, TimerHal};

/// Longest [`Prescalers::List`] the solver accepts.
pub const MAX_PRESCALER_TAPS: usize = 16;

/// Prescalers a timer offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prescalers {
    /// Discrete divider taps (e.g. AVR clock select bits), in any order.
    ///
    /// At most [`MAX_PRESCALER_TAPS`] entries; a longer list is rejected
    /// with [`TimebaseError::TooManyPrescalers`].
    List(&'static [u32]),
    /// Any divider in `min..=max`.
    Range { min: u32, max: u32 },
}

/// Counts per tick a timer supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    /// Counter always wraps after this many counts (e.g. 8-bit fast PWM).
    Fixed(u32),
    /// Auto-reload alarm anywhere in `min..=max`.
    Range { min: u32, max: u32 },
}

/// Timer capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerCaps {
    pub prescalers: Prescalers,
    pub period: Period,
}

impl TimerCaps {
    /// ATmega Timer2 in fast PWM mode: 8-bit counter, overflow every 256 counts.
    ///
    /// With a 16 MHz clock and prescaler 1 this is exactly 62 500 Hz.
    pub const AVR_TIMER2: TimerCaps = TimerCaps {
        prescalers: Prescalers::List(&[1, 8, 32, 64, 128, 256, 1024]),
        period: Period::Fixed(256),
    };

    /// ESP32 general purpose timer with auto-reload alarm.
    pub const ESP32_GPTIMER: TimerCaps = TimerCaps {
        prescalers: Prescalers::Range { min: 2, max: 65536 },
        period: Period::Range { min: 1, max: u32::MAX },
    };
}

/// Timebase error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimebaseError {
    /// Source clock is zero
    ZeroClock,
    /// Requested tick rate is zero
    ZeroTickRate,
    /// Requested tick rate exceeds the source clock
    TickRateAboveClock,
    /// Capability set offers no prescaler or no period
    NoPrescaler,
    /// Prescaler list longer than [`MAX_PRESCALER_TAPS`]
    TooManyPrescalers,
    /// Interrupt armed before the timebase was configured
    NotConfigured,
    /// Achieved rate outside the allowed tolerance
    RateMismatch {
        requested_hz: u32,
        achieved_millihz: u64,
        error_ppm: u32,
    },
    /// Peripheral error
    Hal(HalError),
}

impl TimebaseError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroClock => "T01",
            Self::ZeroTickRate => "T02",
            Self::TickRateAboveClock => "T03",
            Self::NoPrescaler => "T04",
            Self::NotConfigured => "T05",
            Self::RateMismatch { .. } => "T06",
            Self::Hal(_) => "T07",
            Self::TooManyPrescalers => "T08",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroClock => "zero source clock",
            Self::ZeroTickRate => "zero tick rate",
            Self::TickRateAboveClock => "tick rate above clock",
            Self::NoPrescaler => "no usable prescaler",
            Self::NotConfigured => "timebase not configured",
            Self::RateMismatch { .. } => "tick rate out of tolerance",
            Self::Hal(_) => "timer peripheral error",
            Self::TooManyPrescalers => "too many prescaler taps",
        }
    }
}

impl core::fmt::Display for TimebaseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RateMismatch { requested_hz, achieved_millihz, error_ppm } => write!(
                f,
                "{}: {} (requested {} Hz, achieved {}.{:03} Hz, {} ppm)",
                self.code(),
                self.message(),
                requested_hz,
                achieved_millihz / 1000,
                achieved_millihz % 1000,
                error_ppm
            ),
            Self::Hal(e) => write!(f, "{}: {} ({})", self.code(), self.message(), e),
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

impl From<HalError> for TimebaseError {
    fn from(e: HalError) -> Self {
        TimebaseError::Hal(e)
    }
}

/// Solved timebase settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimebaseConfig {
    /// Source clock in Hz
    pub clock_hz: u32,
    /// Tick rate that was asked for
    pub requested_hz: u32,
    /// Clock divider
    pub prescaler: u32,
    /// Counter counts per tick
    pub period: u32,
}

impl TimebaseConfig {
    /// Pick the prescaler/period pair whose tick rate is closest to
    /// `target_hz`.
    ///
    /// Ties go to the smaller prescaler, which gives the finest counter
    /// resolution for the handler timestamps. Never fails on an inexact
    /// match; check [`error_ppm`](Self::error_ppm) or call
    /// [`check_tolerance`](Self::check_tolerance).
    pub fn solve(clock_hz: u32, target_hz: u32, caps: &TimerCaps) -> Result<Self, TimebaseError> {
        if clock_hz == 0 {
            return Err(TimebaseError::ZeroClock);
        }
        if target_hz == 0 {
            return Err(TimebaseError::ZeroTickRate);
        }
        if target_hz > clock_hz {
            return Err(TimebaseError::TickRateAboveClock);
        }
        if let Prescalers::List(list) = caps.prescalers {
            if list.len() > MAX_PRESCALER_TAPS {
                return Err(TimebaseError::TooManyPrescalers);
            }
        }

        let mut best: Option<Self> = None;
        let mut consider = |prescaler: u32| {
            if prescaler == 0 {
                return;
            }
            let Some(period) = best_period(clock_hz, target_hz, prescaler, &caps.period) else {
                return;
            };
            let candidate = Self { clock_hz, requested_hz: target_hz, prescaler, period };
            if best.map_or(true, |b| candidate.is_closer_than(&b)) {
                best = Some(candidate);
            }
        };

        match caps.prescalers {
            Prescalers::List(list) => {
                let mut sorted = [0u32; MAX_PRESCALER_TAPS];
                let n = list.len();
                sorted[..n].copy_from_slice(list);
                sorted[..n].sort_unstable();
                for &p in &sorted[..n] {
                    consider(p);
                }
            }
            Prescalers::Range { min, max } => {
                // Prescalers beyond clock / target cannot reach the rate.
                let useful_max = max.min(clock_hz / target_hz);
                for p in min..=useful_max {
                    consider(p);
                }
                if min > useful_max {
                    consider(min);
                }
            }
        }

        best.ok_or(TimebaseError::NoPrescaler)
    }

    /// Total clock division per tick
    #[inline]
    fn divisor(&self) -> u64 {
        self.prescaler as u64 * self.period as u64
    }

    /// |achieved - requested| multiplied by the divisor
    #[inline]
    fn error_scaled(&self) -> u128 {
        (self.clock_hz as u128).abs_diff(self.requested_hz as u128 * self.divisor() as u128)
    }

    /// True if this rate is strictly closer to the request than `other`.
    #[inline]
    fn is_closer_than(&self, other: &Self) -> bool {
        // e1 / d1 < e2 / d2  <=>  e1 * d2 < e2 * d1
        self.error_scaled() * (other.divisor() as u128) < other.error_scaled() * (self.divisor() as u128)
    }

    /// Achieved tick rate in whole Hz (rounded down)
    #[inline]
    pub fn achieved_hz(&self) -> u32 {
        (self.clock_hz as u64 / self.divisor()) as u32
    }

    /// Achieved tick rate in millihertz (rounded down)
    #[inline]
    pub fn achieved_millihz(&self) -> u64 {
        self.clock_hz as u64 * 1000 / self.divisor()
    }

    /// True if the achieved rate equals the requested rate exactly
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.error_scaled() == 0
    }

    /// Relative error of the achieved rate in parts per million (rounded up)
    pub fn error_ppm(&self) -> u32 {
        let denom = self.requested_hz as u128 * self.divisor() as u128;
        let num = self.error_scaled() * 1_000_000;
        num.div_ceil(denom).min(u32::MAX as u128) as u32
    }

    /// Reject an achieved rate further than `tolerance_ppm` from the request.
    pub fn check_tolerance(&self, tolerance_ppm: u32) -> Result<(), TimebaseError> {
        let error_ppm = self.error_ppm();
        if error_ppm > tolerance_ppm {
            return Err(TimebaseError::RateMismatch {
                requested_hz: self.requested_hz,
                achieved_millihz: self.achieved_millihz(),
                error_ppm,
            });
        }
        Ok(())
    }
}

/// Period closest to `clock / (prescaler * target)` that `period` allows.
fn best_period(clock_hz: u32, target_hz: u32, prescaler: u32, period: &Period) -> Option<u32> {
    match *period {
        Period::Fixed(counts) => (counts > 0).then_some(counts),
        Period::Range { min, max } => {
            let min = min.max(1);
            if min > max {
                return None;
            }
            let exact = clock_hz as u64 / (prescaler as u64 * target_hz as u64);
            // Compare floor and ceil of the ideal period by rate error.
            let lo = exact.clamp(min as u64, max as u64) as u32;
            let hi = (exact + 1).clamp(min as u64, max as u64) as u32;
            let candidate = |period| TimebaseConfig {
                clock_hz,
                requested_hz: target_hz,
                prescaler,
                period,
            };
            Some(if candidate(hi).is_closer_than(&candidate(lo)) { hi } else { lo })
        }
    }
}

/// Timebase driver state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimebaseState {
    /// No configuration programmed yet
    Unconfigured,
    /// Configured, interrupt disarmed
    Disarmed,
    /// Interrupt armed, ticks running
    Armed,
}

/// Timebase driver over a [`TimerHal`].
///
/// Enforces the startup order: configure, then enable. Reconfiguring an
/// armed timebase disarms it first.
pub struct Timebase<T: TimerHal> {
    hal: T,
    caps: TimerCaps,
    config: Option<TimebaseConfig>,
    state: TimebaseState,
}

impl<T: TimerHal> Timebase<T> {
    /// Wrap a timer peripheral with the given capabilities.
    pub fn new(hal: T, caps: TimerCaps) -> Self {
        Self {
            hal,
            caps,
            config: None,
            state: TimebaseState::Unconfigured,
        }
    }

    /// Solve and program the timebase for `target_hz`.
    ///
    /// Returns the configuration actually programmed so the caller can
    /// validate the achieved rate.
    pub fn configure(&mut self, clock_hz: u32, target_hz: u32) -> Result<TimebaseConfig, TimebaseError> {
        let config = TimebaseConfig::solve(clock_hz, target_hz, &self.caps)?;

        if self.state == TimebaseState::Armed {
            self.disable()?;
        }

        self.hal.configure_timebase(&config)?;
        self.config = Some(config);
        self.state = TimebaseState::Disarmed;
        Ok(config)
    }

    /// Arm the periodic tick.
    pub fn enable(&mut self) -> Result<(), TimebaseError> {
        match self.state {
            TimebaseState::Unconfigured => Err(TimebaseError::NotConfigured),
            TimebaseState::Armed => Ok(()),
            TimebaseState::Disarmed => {
                self.hal.enable_timebase_interrupt()?;
                self.state = TimebaseState::Armed;
                Ok(())
            }
        }
    }

    /// Disarm the periodic tick. Accumulators stop advancing.
    pub fn disable(&mut self) -> Result<(), TimebaseError> {
        if self.state == TimebaseState::Armed {
            self.hal.disable_timebase_interrupt()?;
            self.state = TimebaseState::Disarmed;
        }
        Ok(())
    }

    /// Current driver state
    #[inline]
    pub fn state(&self) -> TimebaseState {
        self.state
    }

    /// True while ticks are running
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state == TimebaseState::Armed
    }

    /// Programmed configuration, if any
    #[inline]
    pub fn config(&self) -> Option<&TimebaseConfig> {
        self.config.as_ref()
    }

    /// Timer capabilities
    #[inline]
    pub fn caps(&self) -> &TimerCaps {
        &self.caps
    }

    /// Underlying peripheral
    #[inline]
    pub fn hal(&self) -> &T {
        &self.hal
    }

    /// Underlying peripheral (e.g. to install the tick handler)
    #[inline]
    pub fn hal_mut(&mut self) -> &mut T {
        &mut self.hal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avr_reference_rate_is_exact() {
        let config = TimebaseConfig::solve(16_000_000, 62_500, &TimerCaps::AVR_TIMER2).unwrap();
        assert_eq!(config.prescaler, 1);
        assert_eq!(config.period, 256);
        assert!(config.is_exact());
        assert_eq!(config.achieved_hz(), 62_500);
        assert_eq!(config.error_ppm(), 0);
    }

    #[test]
    fn test_avr_nearest_tap() {
        // 16 MHz / 256 / 8 = 7812.5 Hz is the closest tap to 8 kHz
        let config = TimebaseConfig::solve(16_000_000, 8_000, &TimerCaps::AVR_TIMER2).unwrap();
        assert_eq!(config.prescaler, 8);
        assert!(!config.is_exact());
        assert_eq!(config.achieved_millihz(), 7_812_500);
        assert!(config.check_tolerance(100).is_err());
    }

    #[test]
    fn test_esp32_reference_rate_prefers_small_prescaler() {
        let config = TimebaseConfig::solve(80_000_000, 62_500, &TimerCaps::ESP32_GPTIMER).unwrap();
        assert_eq!(config.prescaler, 2);
        assert_eq!(config.period, 640);
        assert!(config.is_exact());
    }

    #[test]
    fn test_unreachable_rate_reports_error() {
        // 80 MHz / 1280 = 62_500 Hz is the nearest reachable rate
        let config = TimebaseConfig::solve(80_000_000, 62_501, &TimerCaps::ESP32_GPTIMER).unwrap();
        assert_eq!(config.achieved_hz(), 62_500);
        assert_eq!(config.error_ppm(), 16);
        assert!(matches!(
            config.check_tolerance(10),
            Err(TimebaseError::RateMismatch { requested_hz: 62_501, error_ppm: 16, .. })
        ));
        assert!(config.check_tolerance(20).is_ok());
    }

    #[test]
    fn test_solve_rejects_bad_input() {
        let caps = TimerCaps::AVR_TIMER2;
        assert_eq!(TimebaseConfig::solve(0, 1, &caps), Err(TimebaseError::ZeroClock));
        assert_eq!(TimebaseConfig::solve(1, 0, &caps), Err(TimebaseError::ZeroTickRate));
        assert_eq!(TimebaseConfig::solve(10, 11, &caps), Err(TimebaseError::TickRateAboveClock));

        let empty = TimerCaps {
            prescalers: Prescalers::List(&[]),
            period: Period::Fixed(256),
        };
        assert_eq!(TimebaseConfig::solve(16_000_000, 62_500, &empty), Err(TimebaseError::NoPrescaler));
    }

    #[test]
    fn test_closer_rate_compares_across_divisors() {
        // 16 MHz / (1 * 255) = 62 745 Hz is 245 Hz off; 16 MHz / (8 * 32) is exact
        let coarse = TimebaseConfig { clock_hz: 16_000_000, requested_hz: 62_500, prescaler: 1, period: 255 };
        let exact = TimebaseConfig { clock_hz: 16_000_000, requested_hz: 62_500, prescaler: 8, period: 32 };
        assert!(exact.is_closer_than(&coarse));
        assert!(!coarse.is_closer_than(&exact));
        // Equal error is not closer
        assert!(!exact.is_closer_than(&exact));
    }

    #[test]
    fn test_prescaler_list_limit() {
        static TAPS: [u32; MAX_PRESCALER_TAPS + 1] = [1; MAX_PRESCALER_TAPS + 1];
        let too_many = TimerCaps {
            prescalers: Prescalers::List(&TAPS),
            period: Period::Fixed(256),
        };
        assert_eq!(
            TimebaseConfig::solve(16_000_000, 62_500, &too_many),
            Err(TimebaseError::TooManyPrescalers)
        );

        let at_limit = TimerCaps {
            prescalers: Prescalers::List(&TAPS[..MAX_PRESCALER_TAPS]),
            period: Period::Fixed(256),
        };
        let config = TimebaseConfig::solve(16_000_000, 62_500, &at_limit).unwrap();
        assert_eq!(config.prescaler, 1);
        assert_eq!(TimebaseError::TooManyPrescalers.code(), "T08");
    }
}
