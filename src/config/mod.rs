//! Module: config
//!
//! Purpose: Startup parameters for DualToneDDS.
//!
//! Architecture:
//! - build.rs: exports DDS_TICK_RATE_HZ, DDS_CHANNEL_A_HZ, DDS_CHANNEL_B_HZ
//!   (defaults 62500 / 700 / 1900) as compile-time env
//! - [`BUILD_CONFIG`]: parsed in const context, no runtime cost
//! - [`DdsConfig`]: plain value passed to startup, so a board or test can
//!   build its own at runtime
//!
//! Nothing here is persisted. Values are read once at startup, before the
//! timebase is armed.

use crate::hal::Channel;
use crate::tuning::Tuning;

/// Startup parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DdsConfig {
    /// Timebase tick rate in Hz
    pub tick_rate_hz: u32,
    /// Channel A frequency in Hz
    pub channel_a_hz: u32,
    /// Channel B frequency in Hz
    pub channel_b_hz: u32,
    /// Ticks between status lines
    pub report_interval_ticks: u32,
    /// Allowed deviation of the achieved tick rate, in ppm
    pub rate_tolerance_ppm: u32,
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Tick rate too low to build a tuning word
    TickRateTooLow,
    /// C02: Channel frequency is zero
    ZeroFrequency(Channel),
    /// C03: Channel frequency at or above Nyquist
    AboveNyquist(Channel),
    /// C04: Status report interval is zero
    ZeroReportInterval,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::TickRateTooLow => "C01",
            Self::ZeroFrequency(_) => "C02",
            Self::AboveNyquist(_) => "C03",
            Self::ZeroReportInterval => "C04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::TickRateTooLow => "tick rate too low",
            Self::ZeroFrequency(_) => "zero frequency",
            Self::AboveNyquist(_) => "frequency at or above Nyquist",
            Self::ZeroReportInterval => "zero report interval",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroFrequency(ch) | Self::AboveNyquist(ch) => {
                write!(f, "{}: {} (channel {})", self.code(), self.message(), ch.as_str())
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

impl DdsConfig {
    /// Reference hardware values: 62.5 kHz tick, 700 Hz and 1900 Hz tones,
    /// one status line per nominal second, exact tick rate required.
    pub const REFERENCE: DdsConfig = DdsConfig {
        tick_rate_hz: 62_500,
        channel_a_hz: 700,
        channel_b_hz: 1900,
        report_interval_ticks: 62_500,
        rate_tolerance_ppm: 0,
    };

    /// Configuration baked in by build.rs.
    ///
    /// Reports once per nominal second of the configured tick rate.
    pub const fn from_build_env() -> Self {
        let tick_rate_hz = parse_u32(env!("DDS_TICK_RATE_HZ"));
        DdsConfig {
            tick_rate_hz,
            channel_a_hz: parse_u32(env!("DDS_CHANNEL_A_HZ")),
            channel_b_hz: parse_u32(env!("DDS_CHANNEL_B_HZ")),
            report_interval_ticks: tick_rate_hz,
            rate_tolerance_ppm: Self::REFERENCE.rate_tolerance_ppm,
        }
    }

    /// Frequency requested for `channel`
    #[inline]
    pub const fn frequency(&self, channel: Channel) -> u32 {
        match channel {
            Channel::A => self.channel_a_hz,
            Channel::B => self.channel_b_hz,
        }
    }

    /// Check every parameter and return the tuning math for the tick rate.
    pub fn validate(&self) -> Result<Tuning, ConfigError> {
        let tuning = Tuning::new(self.tick_rate_hz).ok_or(ConfigError::TickRateTooLow)?;

        for channel in Channel::ALL {
            let hz = self.frequency(channel);
            if hz == 0 {
                return Err(ConfigError::ZeroFrequency(channel));
            }
            if hz > tuning.max_frequency_hz() {
                return Err(ConfigError::AboveNyquist(channel));
            }
        }

        if self.report_interval_ticks == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }

        Ok(tuning)
    }

    /// Tuning words for channel A and B.
    pub fn increments(&self) -> Result<[u32; 2], ConfigError> {
        let tuning = self.validate()?;
        let mut increments = [0u32; 2];
        for channel in Channel::ALL {
            increments[channel.index()] = tuning
                .increment(self.frequency(channel))
                .ok_or(ConfigError::AboveNyquist(channel))?;
        }
        Ok(increments)
    }
}

impl Default for DdsConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Configuration baked in at build time.
pub static BUILD_CONFIG: DdsConfig = DdsConfig::from_build_env();

/// Parse a decimal `u32` at compile time.
const fn parse_u32(s: &str) -> u32 {
    let bytes = s.as_bytes();
    assert!(!bytes.is_empty(), "empty numeric build parameter");

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        assert!(b.is_ascii_digit(), "non-digit in numeric build parameter");
        value = match value.checked_mul(10) {
            Some(v) => v,
            None => panic!("numeric build parameter overflows u32"),
        };
        value = match value.checked_add((b - b'0') as u32) {
            Some(v) => v,
            None => panic!("numeric build parameter overflows u32"),
        };
        i += 1;
    }
    value
}
