//! Hardware Abstraction Layer for DualToneDDS.
//!
//! Thin traits around the two peripherals the generator needs.
//! Engine logic stays in core modules, HAL is just I/O.
//!
//! - [`TimerHal`]: the periodic timebase (`configure_timebase`,
//!   `enable_timebase_interrupt`, `disable_timebase_interrupt`)
//! - [`TickOutputs`]: what the tick handler touches (`set_channel_output`,
//!   `timebase_counter`)
//!
//! No register layout leaks through these traits.

use crate::timebase::TimebaseConfig;

pub mod sim;

#[cfg(target_os = "espidf")]
pub mod esp;

/// Output channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    A = 0,
    B = 1,
}

impl Channel {
    /// Both channels in handler order.
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    /// Array index for per-channel state.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::A => "A",
            Channel::B => "B",
        }
    }
}

/// HAL error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Timer peripheral could not be configured
    TimerInit,
    /// PWM peripheral could not be configured
    PwmInit,
    /// Interrupt could not be armed, disarmed or installed
    Interrupt,
    /// Requested timer configuration not supported by the peripheral
    Unsupported,
}

impl HalError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::TimerInit => "H01",
            Self::PwmInit => "H02",
            Self::Interrupt => "H03",
            Self::Unsupported => "H04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::TimerInit => "timer init failed",
            Self::PwmInit => "PWM init failed",
            Self::Interrupt => "interrupt control failed",
            Self::Unsupported => "unsupported timer configuration",
        }
    }
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Periodic timebase peripheral.
pub trait TimerHal {
    /// Program prescaler and period. Called with the interrupt disarmed.
    fn configure_timebase(&mut self, config: &TimebaseConfig) -> Result<(), HalError>;

    /// Arm the overflow interrupt.
    fn enable_timebase_interrupt(&mut self) -> Result<(), HalError>;

    /// Disarm the overflow interrupt. No tick runs after this returns.
    fn disable_timebase_interrupt(&mut self) -> Result<(), HalError>;
}

/// Peripherals touched from the tick handler.
///
/// Implementations must be constant-time: no allocation, no blocking,
/// no logging.
pub trait TickOutputs {
    /// Load the PWM duty target for `channel`.
    fn set_channel_output(&mut self, channel: Channel, sample: u8);

    /// Current timebase counter value (counts since the last reload).
    fn timebase_counter(&self) -> u32;

    /// Handler entered. A board may raise a timing pin here so the
    /// handler's run time shows on a scope.
    #[inline(always)]
    fn tick_begin(&mut self) {}

    /// Handler about to return. Lowers the timing pin raised in
    /// [`tick_begin`](Self::tick_begin).
    #[inline(always)]
    fn tick_end(&mut self) {}
}
