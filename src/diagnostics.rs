//! Tick diagnostics shared between the tick handler and the main loop.
//!
//! # Ownership
//!
//! ```text
//! Tick handler (writer)       TickDiagnostics        Main loop (readers)
//! ─────────────────────       ───────────────        ───────────────────
//! record() once per tick ───▶ ticks, seq,     ───▶  take_ticks()
//!                             start, stop,          timestamps()
//!                             worst, overruns       snapshot()
//! ```
//!
//! Exactly one writer. The tick counter is the only value a reader
//! modifies, and only through an atomic swap. The start/stop pair is
//! published under a sequence counter, so a reader never sees a start
//! from one tick paired with a stop from another, whatever the platform's
//! native word size.

use core::sync::atomic::{fence, AtomicU32, Ordering};

/// Handler timestamps from a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickTimestamps {
    /// Timebase counter at handler entry
    pub start: u32,
    /// Timebase counter after the outputs were written
    pub stop: u32,
}

/// Lock-free single-writer diagnostics block.
///
/// # Usage
///
/// ```ignore
/// static DIAG: TickDiagnostics = TickDiagnostics::new();
///
/// // In the tick handler:
/// DIAG.record(start, stop, elapsed, overrun);
///
/// // In the main loop:
/// if DIAG.ticks() >= interval {
///     let ticks = DIAG.take_ticks();
///     let ts = DIAG.timestamps();
/// }
/// ```
pub struct TickDiagnostics {
    /// Ticks since the last `take_ticks()`.
    ticks: AtomicU32,

    /// Sequence counter, odd while the writer updates the timestamps.
    seq: AtomicU32,

    /// Counter value at handler entry.
    start: AtomicU32,

    /// Counter value at handler exit.
    stop: AtomicU32,

    /// Longest handler duration seen, in counter counts.
    worst: AtomicU32,

    /// Ticks whose handler ran past the next reload (never cleared).
    overruns: AtomicU32,
}

impl TickDiagnostics {
    /// Create an empty diagnostics block.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            seq: AtomicU32::new(0),
            start: AtomicU32::new(0),
            stop: AtomicU32::new(0),
            worst: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Publish one tick. Tick handler only.
    ///
    /// Constant time, never blocks.
    #[inline]
    pub fn record(&self, start: u32, stop: u32, elapsed: u32, overrun: bool) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.start.store(start, Ordering::Relaxed);
        self.stop.store(stop, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);

        // Single writer: plain load/store is enough for the max.
        if elapsed > self.worst.load(Ordering::Relaxed) {
            self.worst.store(elapsed, Ordering::Relaxed);
        }
        if overrun {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks since the last [`take_ticks`](Self::take_ticks).
    #[inline]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Read and reset the tick counter in one atomic step.
    ///
    /// No tick recorded concurrently is lost.
    #[inline]
    pub fn take_ticks(&self) -> u32 {
        self.ticks.swap(0, Ordering::Relaxed)
    }

    /// Consistent start/stop pair of the latest tick.
    ///
    /// Retries while the handler is mid-update. The writer's critical
    /// section is two stores, so a retry is rare and short.
    pub fn timestamps(&self) -> TickTimestamps {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                core::hint::spin_loop();
                continue;
            }

            let start = self.start.load(Ordering::Relaxed);
            let stop = self.stop.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return TickTimestamps { start, stop };
            }
        }
    }

    /// Longest handler duration seen, in counter counts.
    ///
    /// Durations are measured modulo the timebase period, so a handler
    /// that ran longer than a full period is under-reported here; see
    /// [`DdsEngine::tick`](crate::engine::DdsEngine::tick).
    #[inline]
    pub fn worst_case(&self) -> u32 {
        self.worst.load(Ordering::Relaxed)
    }

    /// Total handler overruns since boot.
    #[inline]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all diagnostics without resetting anything.
    #[inline]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            ticks: self.ticks(),
            timestamps: self.timestamps(),
            worst_case: self.worst_case(),
            overruns: self.overruns(),
        }
    }
}

impl Default for TickDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of tick diagnostics at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticsSnapshot {
    pub ticks: u32,
    pub timestamps: TickTimestamps,
    pub worst_case: u32,
    pub overruns: u32,
}
