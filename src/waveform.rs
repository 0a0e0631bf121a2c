//! Sine waveform table for the DDS engine.
//!
//! 256-entry table covering one full cycle, quantized to the 8-bit PWM
//! duty range and centered on mid-scale.
//!
//! The table size is tied to the accumulator width: the top
//! [`INDEX_BITS`] bits of a 32-bit phase select the entry, so the index is
//! a single shift and always in range.

/// Number of bits of the phase accumulator used as table index
pub const INDEX_BITS: u32 = 8;

/// Shift that extracts the table index from a 32-bit phase
pub const INDEX_SHIFT: u32 = u32::BITS - INDEX_BITS;

/// Number of entries in a waveform table
pub const TABLE_SIZE: usize = 1 << INDEX_BITS;

/// Sample value representing the zero crossing
pub const MID_SCALE: u8 = 127;

/// Peak deviation from [`MID_SCALE`]
const AMPLITUDE: f64 = 127.0;

/// Table index for a 32-bit phase.
///
/// `u8` holds exactly [`TABLE_SIZE`] values, so the result can index any
/// [`Waveform`] without a bounds check.
#[inline(always)]
pub const fn table_index(phase: u32) -> u8 {
    (phase >> INDEX_SHIFT) as u8
}

/// One period of a waveform, quantized to unsigned 8-bit samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Waveform([u8; TABLE_SIZE]);

impl Waveform {
    /// Wrap a precomputed table.
    pub const fn new(samples: [u8; TABLE_SIZE]) -> Self {
        Self(samples)
    }

    /// Sample at `index`.
    #[inline(always)]
    pub fn sample(&self, index: u8) -> u8 {
        self.0[index as usize]
    }

    /// Sample selected by the top bits of `phase`.
    #[inline(always)]
    pub fn at_phase(&self, phase: u32) -> u8 {
        self.sample(table_index(phase))
    }

    /// Raw table contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Pre-computed sine table
///
/// Index 0 = 0° (127), 64 = 90° (254), 128 = 180° (127), 192 = 270° (0).
/// Built from the first quadrant so the two half-waves mirror exactly.
pub static SINE: Waveform = Waveform::new(sine_table());

const fn sine_table() -> [u8; TABLE_SIZE] {
    let mut table = [MID_SCALE; TABLE_SIZE];
    let half = TABLE_SIZE / 2;
    let quarter = TABLE_SIZE / 4;
    let mut i = 0;
    while i < TABLE_SIZE {
        // Fold into the first quadrant: sin(π - x) = sin(x), sin(x + π) = -sin(x)
        let in_half = i % half;
        let q = if in_half <= quarter { in_half } else { half - in_half };
        let angle = (q as f64) * 2.0 * core::f64::consts::PI / (TABLE_SIZE as f64);
        let step = round_positive(const_sin(angle) * AMPLITUDE) as u8;
        table[i] = if i < half { MID_SCALE + step } else { MID_SCALE - step };
        i += 1;
    }
    table
}

/// Round a non-negative value to the nearest integer
const fn round_positive(x: f64) -> u32 {
    (x + 0.5) as u32
}

/// Const-compatible sine for `x` in [0, π/2] using Taylor series
const fn const_sin(x: f64) -> f64 {
    // sin(x) = x - x³/3! + x⁵/5! - x⁷/7! + x⁹/9! - x¹¹/11!
    // Remainder at π/2 is below 4e-6, far under half an LSB at 127.
    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    let x7 = x5 * x2;
    let x9 = x7 * x2;
    let x11 = x9 * x2;

    x - x3 / 6.0 + x5 / 120.0 - x7 / 5040.0 + x9 / 362880.0 - x11 / 39916800.0
}
