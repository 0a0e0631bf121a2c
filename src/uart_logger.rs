//! Log output over UART.
//!
//! Drains [`LogStream`] entries into text lines. On the board the lines go
//! out on UART1 TX; on the host the simulation hands the same lines to
//! stdout.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor @ 115200
//! ```

use crate::logging::{format_entry, format_to_buffer, LogStream};

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Interval between dropped-message reports.
pub const DROPPED_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Size of one formatted output line.
pub const LINE_BUF_LEN: usize = 160;

/// UART configuration for logging.
pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: if cfg!(feature = "esp32p4") { 37 } else { 6 },
        }
    }
}

/// Formats drained entries and reports dropped messages periodically.
#[derive(Debug, Default)]
pub struct LogDrain {
    last_dropped_report_us: i64,
}

impl LogDrain {
    pub const fn new() -> Self {
        Self { last_dropped_report_us: 0 }
    }

    /// Drain every pending entry of `stream` into `sink`, one line per call.
    ///
    /// Returns the number of entries written.
    pub fn drain<const N: usize, F>(&mut self, stream: &LogStream<N>, now_us: i64, mut sink: F) -> u32
    where
        F: FnMut(&[u8]),
    {
        let mut line = [0u8; LINE_BUF_LEN];
        let mut written = 0;

        while let Some(entry) = stream.drain() {
            let len = format_entry(&entry, &mut line);
            sink(&line[..len]);
            written += 1;
        }

        if now_us - self.last_dropped_report_us >= DROPPED_REPORT_INTERVAL_US {
            let dropped = stream.take_dropped();
            if dropped > 0 {
                let len = format_to_buffer(&mut line, format_args!("[WARN] Dropped: {}\n", dropped));
                sink(&line[..len]);
            }
            self.last_dropped_report_us = now_us;
        }

        written
    }
}

/// Initialize UART1 TX-only for logging output.
#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartLoggerConfig,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Write raw bytes to the log UART, ignoring TX errors.
#[cfg(target_os = "espidf")]
pub fn write_line(uart: &mut UartTxDriver<'_>, line: &[u8]) {
    let _ = uart.write(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_drain_formats_lines() {
        let stream = LogStream::<8>::new();
        stream.push(1_234_567, LogLevel::Info, b"Timer tick ....  3 41");
        stream.push(1_234_600, LogLevel::Warn, b"deadline overruns: 1 (worst 60 counts)");

        let mut out = Vec::new();
        let mut drain = LogDrain::new();
        let n = drain.drain(&stream, 0, |line| out.push(String::from_utf8(line.to_vec()).unwrap()));

        assert_eq!(n, 2);
        assert_eq!(out[0], "[   1234567] INFO: Timer tick ....  3 41\n");
        assert!(out[1].contains("WARN"));
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_dropped_report_is_rate_limited() {
        let stream = LogStream::<2>::new();
        for _ in 0..5 {
            stream.push(0, LogLevel::Info, b"x");
        }
        assert_eq!(stream.dropped(), 3);

        let mut drain = LogDrain::new();
        let mut lines = Vec::new();

        // Too early: entries drained, drop report held back
        drain.drain(&stream, 1_000, |l| lines.push(l.to_vec()));
        assert_eq!(lines.len(), 2);

        drain.drain(&stream, DROPPED_REPORT_INTERVAL_US, |l| lines.push(l.to_vec()));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], b"[WARN] Dropped: 3\n");
        assert_eq!(stream.dropped(), 0);
    }

    #[test]
    #[cfg(not(feature = "esp32p4"))]
    fn test_default_config_esp32s3() {
        let config = UartLoggerConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.tx_pin, 6);
    }

    #[test]
    #[cfg(feature = "esp32p4")]
    fn test_default_config_esp32p4() {
        assert_eq!(UartLoggerConfig::default().tx_pin, 37);
    }
}
