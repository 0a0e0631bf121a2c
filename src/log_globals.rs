//! Global log stream and tick state instances.

use crate::diagnostics::TickDiagnostics;
use crate::fault::FaultState;
use crate::logging::LogStream;

/// Log stream for the main loop.
///
/// Single producer (startup and status reporter), single consumer
/// (UART drain). The tick handler never writes here.
pub static LOG_STREAM: LogStream = LogStream::new();

/// Diagnostics published by the tick handler.
pub static TICK_DIAGNOSTICS: TickDiagnostics = TickDiagnostics::new();

/// Fault latched by the tick handler.
pub static FAULT_STATE: FaultState = FaultState::new();
