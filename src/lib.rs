//! # DualToneDDS
//!
//! Two-channel Direct Digital Synthesis sine generator for exercising
//! SSB receivers with two simultaneous, independently tuned tones.
//!
//! ## Architecture
//!
//! ```text
//! Timebase (62.5 kHz) ──▶ DdsEngine::tick ──▶ PWM A / PWM B
//!                               │
//!                               ▼
//!                        TickDiagnostics ──▶ StatusReporter ──▶ LogStream ──▶ UART
//! ```
//!
//! - The engine owns the phase accumulators; only the tick handler runs it
//! - The handler shares nothing but atomic counters and a sequenced
//!   timestamp pair
//! - No locks, no allocation, no division in the handler

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fault;
pub mod generator;
pub mod hal;
pub mod log_globals;
pub mod logging;
pub mod status;
pub mod timebase;
pub mod tuning;
pub mod uart_logger;
pub mod waveform;

pub use config::{DdsConfig, BUILD_CONFIG};
pub use diagnostics::TickDiagnostics;
pub use engine::{DdsEngine, PhaseAccumulator};
pub use error::StartupError;
pub use fault::{FaultCode, FaultState};
pub use generator::{DualToneGenerator, StartupPlan};
pub use hal::Channel;
pub use log_globals::LOG_STREAM;
pub use status::StatusReporter;
pub use timebase::{Timebase, TimebaseConfig, TimerCaps};
pub use tuning::Tuning;
pub use waveform::{Waveform, SINE};
