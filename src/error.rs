//! Startup error types

use crate::config::ConfigError;
use crate::hal::HalError;
use crate::timebase::TimebaseError;

/// Error raised before the timebase is armed.
///
/// Any of these leaves the outputs idle: a wrong tick rate would shift
/// every output frequency with no other symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    /// Invalid startup parameters
    Config(ConfigError),
    /// Tick rate unreachable or out of tolerance
    Timebase(TimebaseError),
    /// Peripheral setup failed
    Hal(HalError),
}

impl StartupError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.code(),
            Self::Timebase(e) => e.code(),
            Self::Hal(e) => e.code(),
        }
    }
}

impl core::fmt::Display for StartupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Timebase(e) => write!(f, "timebase: {}", e),
            Self::Hal(e) => write!(f, "hardware: {}", e),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        StartupError::Config(e)
    }
}

impl From<TimebaseError> for StartupError {
    fn from(e: TimebaseError) -> Self {
        StartupError::Timebase(e)
    }
}

impl From<HalError> for StartupError {
    fn from(e: HalError) -> Self {
        StartupError::Hal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Channel;

    #[test]
    fn test_display_includes_code() {
        let e: StartupError = ConfigError::AboveNyquist(Channel::B).into();
        let mut buf = [0u8; 96];
        let len = crate::logging::format_to_buffer(&mut buf, format_args!("{}", e));
        assert_eq!(
            core::str::from_utf8(&buf[..len]).unwrap(),
            "config: C03: frequency at or above Nyquist (channel B)"
        );
        assert_eq!(e.code(), "C03");
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(
            StartupError::from(TimebaseError::ZeroClock),
            StartupError::Timebase(TimebaseError::ZeroClock)
        );
        assert_eq!(StartupError::from(HalError::PwmInit), StartupError::Hal(HalError::PwmInit));
    }
}
