//! Status reporter.
//!
//! Polled from the main loop. Once the tick counter reaches the report
//! interval it takes (reads and resets) the counter, snapshots the handler
//! timestamps and emits one human-readable line:
//!
//! ```text
//! Timer tick ....  3 41
//! ```
//!
//! Read-only with respect to the engine: it never touches accumulators or
//! increments, and its only write to shared state is the atomic tick
//! counter reset.

use core::fmt;

use crate::diagnostics::{TickDiagnostics, TickTimestamps};
use crate::fault::{FaultCode, FaultState};
use crate::logging::LogStream;

/// Label printed before the handler timestamps.
pub const STATUS_LABEL: &str = "Timer tick ....  ";

/// One status report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// Ticks counted since the previous report
    pub ticks: u32,
    /// Latest handler start/stop counter values
    pub timestamps: TickTimestamps,
    /// Longest handler duration since boot, in counts
    pub worst_case: u32,
    /// Overruns since the previous report
    pub new_overruns: u32,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", STATUS_LABEL, self.timestamps.start, self.timestamps.stop)
    }
}

/// Periodic reader of [`TickDiagnostics`].
///
/// # Example
///
/// ```ignore
/// let mut reporter = StatusReporter::new(&DIAG, &FAULT, 62_500);
///
/// loop {
///     reporter.poll(now_us(), &LOG_STREAM);
///     drain_logs();
/// }
/// ```
pub struct StatusReporter<'a> {
    diag: &'a TickDiagnostics,
    fault: &'a FaultState,
    interval_ticks: u32,
    last_overruns: u32,
    reports: u32,
}

impl<'a> StatusReporter<'a> {
    /// Create a reporter emitting every `interval_ticks` ticks.
    pub fn new(diag: &'a TickDiagnostics, fault: &'a FaultState, interval_ticks: u32) -> Self {
        Self {
            diag,
            fault,
            interval_ticks: interval_ticks.max(1),
            last_overruns: diag.overruns(),
            reports: 0,
        }
    }

    /// Produce a report if the interval has elapsed.
    ///
    /// Returns `None` while fewer than `interval_ticks` ticks have run.
    pub fn sample(&mut self) -> Option<StatusReport> {
        if self.diag.ticks() < self.interval_ticks {
            return None;
        }

        let ticks = self.diag.take_ticks();
        let timestamps = self.diag.timestamps();
        let overruns = self.diag.overruns();
        let new_overruns = overruns.wrapping_sub(self.last_overruns);
        self.last_overruns = overruns;
        self.reports = self.reports.wrapping_add(1);

        Some(StatusReport {
            ticks,
            timestamps,
            worst_case: self.diag.worst_case(),
            new_overruns,
        })
    }

    /// Sample and, if a report is due, log it to `stream`.
    ///
    /// A deadline overrun since the previous report adds a warning line
    /// and clears the latched fault.
    pub fn poll<const N: usize>(&mut self, now_us: i64, stream: &LogStream<N>) -> Option<StatusReport> {
        let report = self.sample()?;

        crate::dds_info!(stream, now_us, "{}", report);

        if report.new_overruns > 0 {
            crate::dds_warn!(
                stream,
                now_us,
                "deadline overruns: {} (worst {} counts)",
                report.new_overruns,
                report.worst_case
            );
        }

        if self.fault.is_active() {
            let fault = self.fault.snapshot();
            if fault.code != FaultCode::None {
                crate::dds_warn!(
                    stream,
                    now_us,
                    "fault: {} data={} total={}",
                    fault.code.as_str(),
                    fault.data,
                    fault.count
                );
            }
            self.fault.clear();
        }

        Some(report)
    }

    /// Number of reports produced so far
    #[inline]
    pub fn reports(&self) -> u32 {
        self.reports
    }

    /// Report interval in ticks
    #[inline]
    pub fn interval_ticks(&self) -> u32 {
        self.interval_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_before_interval() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let mut reporter = StatusReporter::new(&diag, &fault, 10);

        for _ in 0..9 {
            diag.record(2, 30, 28, false);
        }
        assert!(reporter.sample().is_none());
        assert_eq!(diag.ticks(), 9);
    }

    #[test]
    fn test_report_resets_tick_counter() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let mut reporter = StatusReporter::new(&diag, &fault, 10);

        for _ in 0..12 {
            diag.record(3, 41, 38, false);
        }
        let report = reporter.sample().unwrap();
        assert_eq!(report.ticks, 12);
        assert_eq!(report.timestamps, TickTimestamps { start: 3, stop: 41 });
        assert_eq!(diag.ticks(), 0);
        assert_eq!(reporter.reports(), 1);
    }

    #[test]
    fn test_line_format() {
        let report = StatusReport {
            ticks: 62_500,
            timestamps: TickTimestamps { start: 3, stop: 41 },
            worst_case: 38,
            new_overruns: 0,
        };
        let mut buf = [0u8; 64];
        let len = crate::logging::format_to_buffer(&mut buf, format_args!("{}", report));
        assert_eq!(&buf[..len], b"Timer tick ....  3 41");
    }

    #[test]
    fn test_poll_logs_overrun_warning() {
        let diag = TickDiagnostics::new();
        let fault = FaultState::new();
        let stream = LogStream::<8>::new();
        let mut reporter = StatusReporter::new(&diag, &fault, 2);

        diag.record(630, 10, 20, true);
        fault.set(FaultCode::DeadlineOverrun, 20);
        diag.record(1, 5, 4, false);

        let report = reporter.poll(1_000, &stream).unwrap();
        assert_eq!(report.new_overruns, 1);
        assert_eq!(stream.drain().unwrap().message(), "Timer tick ....  1 5");
        assert_eq!(stream.drain().unwrap().message(), "deadline overruns: 1 (worst 20 counts)");
        assert_eq!(
            stream.drain().unwrap().message(),
            "fault: deadline overrun data=20 total=1"
        );
        assert!(!fault.is_active());
    }
}
