//! Sine table tests

use dual_tone_dds::waveform::{table_index, MID_SCALE, TABLE_SIZE};
use dual_tone_dds::SINE;

#[test]
fn test_table_size() {
    assert_eq!(SINE.as_slice().len(), TABLE_SIZE);
    assert_eq!(TABLE_SIZE, 256);
}

#[test]
fn test_reference_entries() {
    // Values of the 8-bit reference hardware table
    let expected: [(u8, u8); 13] = [
        (0, 127),
        (1, 130),
        (2, 133),
        (7, 149),
        (32, 217),
        (64, 254),
        (96, 217),
        (128, 127),
        (129, 124),
        (160, 37),
        (192, 0),
        (224, 37),
        (255, 124),
    ];
    for (index, value) in expected {
        assert_eq!(SINE.sample(index), value, "entry {}", index);
    }
}

#[test]
fn test_extremes() {
    let max = SINE.as_slice().iter().max().copied().unwrap();
    let min = SINE.as_slice().iter().min().copied().unwrap();
    assert_eq!(max, 254);
    assert_eq!(min, 0);
    assert_eq!(SINE.sample(0), MID_SCALE);
}

#[test]
fn test_half_wave_symmetry() {
    // Second half mirrors the first around mid-scale
    for i in 1..128u8 {
        let upper = SINE.sample(i) as i16 - MID_SCALE as i16;
        let lower = SINE.sample(i + 128) as i16 - MID_SCALE as i16;
        assert_eq!(upper, -lower, "entry {}", i);
    }
}

#[test]
fn test_quarter_wave_symmetry() {
    for i in 0..64u8 {
        assert_eq!(SINE.sample(i), SINE.sample(128 - i), "entry {}", i);
    }
}

#[test]
fn test_rising_first_quadrant() {
    for i in 0..64u8 {
        assert!(SINE.sample(i) <= SINE.sample(i + 1), "entry {}", i);
    }
}

#[test]
fn test_every_phase_maps_into_table() {
    for phase in [0u32, 1, 0x00FF_FFFF, 0x0100_0000, 0x7FFF_FFFF, 0xFF00_0000, u32::MAX] {
        let index = table_index(phase);
        assert_eq!(index as u32, phase >> 24);
        assert_eq!(SINE.at_phase(phase), SINE.sample(index));
    }
}
