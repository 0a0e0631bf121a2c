//! Phase-increment math.
//!
//! The tick handler never divides: every channel frequency is turned into
//! a 32-bit tuning word at startup.
//!
//! ```text
//! steps_per_hz = floor(2^32 / tick_rate)
//! increment    = steps_per_hz * frequency
//! f_out        = increment * tick_rate / 2^32
//! ```
//!
//! At the reference tick rate of 62 500 Hz, `steps_per_hz` is 68 719 and
//! 700 Hz becomes the tuning word 48 103 300.

/// Phase accumulator modulus (2^32)
pub const PHASE_MODULUS: u64 = 1 << 32;

/// Tuning word derivation for one tick rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tuning {
    tick_rate_hz: u32,
    steps_per_hz: u32,
}

impl Tuning {
    /// Create tuning math for `tick_rate_hz`.
    ///
    /// Returns `None` for a zero tick rate, or for a rate of 1 Hz where
    /// 2^32 steps do not fit the tuning word.
    pub const fn new(tick_rate_hz: u32) -> Option<Self> {
        if tick_rate_hz < 2 {
            return None;
        }
        Some(Self {
            tick_rate_hz,
            steps_per_hz: (PHASE_MODULUS / tick_rate_hz as u64) as u32,
        })
    }

    /// Tick rate this tuning was built for
    #[inline]
    pub const fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Phase steps per Hz of output frequency
    #[inline]
    pub const fn steps_per_hz(&self) -> u32 {
        self.steps_per_hz
    }

    /// Highest frequency the table can represent (Nyquist)
    #[inline]
    pub const fn max_frequency_hz(&self) -> u32 {
        (self.tick_rate_hz - 1) / 2
    }

    /// Tuning word for `frequency_hz`.
    ///
    /// Returns `None` at or above Nyquist, where the product would also
    /// leave no headroom below 2^31.
    #[inline]
    pub const fn increment(&self, frequency_hz: u32) -> Option<u32> {
        if frequency_hz > self.max_frequency_hz() {
            return None;
        }
        // frequency < tick_rate / 2, so the product stays below 2^31
        Some(self.steps_per_hz * frequency_hz)
    }

    /// Frequency recovered from a tuning word in whole Hz (`increment / steps_per_hz`).
    #[inline]
    pub const fn nominal_frequency_hz(&self, increment: u32) -> u32 {
        increment / self.steps_per_hz
    }

    /// Frequency actually produced by `increment`, in millihertz.
    ///
    /// Accounts for the truncation of `steps_per_hz`, so it is slightly
    /// below the requested frequency.
    #[inline]
    pub const fn realized_millihz(&self, increment: u32) -> u64 {
        (((increment as u128) * (self.tick_rate_hz as u128) * 1000) >> 32) as u64
    }
}

/// Number of complete waveform cycles after `ticks` steps of `increment`
/// starting from phase 0.
#[inline]
pub const fn cycles_after(increment: u32, ticks: u64) -> u64 {
    (((increment as u128) * (ticks as u128)) >> 32) as u64
}

/// Period, in ticks, of the phase sequence produced by `increment`
/// (`2^32 / gcd(2^32, increment)`).
///
/// A zero increment never moves and has period 1.
#[inline]
pub const fn phase_period(increment: u32) -> u64 {
    if increment == 0 {
        return 1;
    }
    // gcd with a power of two is the lowest set bit
    PHASE_MODULUS >> increment.trailing_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_steps_per_hz() {
        let tuning = Tuning::new(62_500).unwrap();
        assert_eq!(tuning.steps_per_hz(), 68_719);
        assert_eq!(tuning.increment(700), Some(48_103_300));
        assert_eq!(tuning.increment(1900), Some(130_566_100));
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        assert!(Tuning::new(0).is_none());
        assert!(Tuning::new(1).is_none());
        assert!(Tuning::new(2).is_some());
    }

    #[test]
    fn test_nyquist_limit() {
        let tuning = Tuning::new(62_500).unwrap();
        assert_eq!(tuning.max_frequency_hz(), 31_249);
        assert!(tuning.increment(31_249).is_some());
        assert!(tuning.increment(31_250).is_none());
        assert!(tuning.increment(u32::MAX).is_none());
    }

    #[test]
    fn test_phase_period() {
        assert_eq!(phase_period(0), 1);
        assert_eq!(phase_period(1), 1 << 32);
        assert_eq!(phase_period(1 << 24), 256);
        assert_eq!(phase_period(1 << 31), 2);
        // 48_103_300 = 2^2 * 12_025_825
        assert_eq!(phase_period(48_103_300), 1 << 30);
    }

    #[test]
    fn test_cycles_after() {
        assert_eq!(cycles_after(1 << 24, 256), 1);
        assert_eq!(cycles_after(1 << 24, 255), 0);
        assert_eq!(cycles_after(u32::MAX, 0), 0);
    }
}
