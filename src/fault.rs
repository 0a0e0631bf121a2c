//! Fault state management for DualToneDDS.
//!
//! A generator whose handler misses its deadline still produces a tone,
//! but every sample after a dropped tick lands late and the output
//! frequency drifts with no other symptom. Faults make that visible.
//!
//! Faults are latched by the tick handler and cleared only by the main
//! loop; the output keeps running while a fault is active.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Fault codes indicating why the generator is no longer trustworthy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// Tick handler still running when the next tick was due.
    /// Data: handler duration in timebase counts.
    DeadlineOverrun = 1,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => FaultCode::None,
            1 => FaultCode::DeadlineOverrun,
            _ => FaultCode::None,
        }
    }

    /// Short label for status output.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::DeadlineOverrun => "deadline overrun",
        }
    }
}

/// Thread-safe fault state.
///
/// Set by the tick handler on a missed deadline, checked by the main loop
/// when reporting status.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// // In the tick handler:
/// if stop < start {
///     FAULT.set(FaultCode::DeadlineOverrun, elapsed);
/// }
///
/// // In the main loop:
/// if FAULT.is_active() {
///     dds_warn!(LOG_STREAM, now_us, "fault: {}", FAULT.code().as_str());
///     FAULT.clear();
/// }
/// ```
pub struct FaultState {
    /// True if fault is active.
    active: AtomicBool,

    /// Fault code (reason for fault).
    code: AtomicU8,

    /// Additional data (e.g., handler duration in counts).
    data: AtomicU32,

    /// Total fault count since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Set fault state.
    ///
    /// Marks the fault active with the given code and data and increments
    /// the fault counter. Safe to call from the tick handler.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Check if fault is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Get fault data (meaning depends on fault code).
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Get total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear fault state (after reporting).
    ///
    /// Note: This clears the active flag but does NOT reset the counter.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Get a snapshot of the current fault state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}
