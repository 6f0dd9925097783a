//! Hobby-servo pulse mapping.
//!
//! Basic analog servos resolve 33 distinct positions (0..=32). At the
//! default 60 Hz refresh rate position 0 is a 516 µs pulse and each step
//! adds 64.5 µs up to 2580 µs; on the 4096-tick cycle that works out to
//! 16 ticks per step starting at tick 128, plus 8 to sit in the middle of
//! each step. The mapping is calibrated against the 60 Hz prescaler; other
//! refresh rates need a recalibrated table.

/// Highest raw servo position index.
pub const MAX_POSITION: u8 = 32;

/// Ticks added per position step (64.5 µs at 60 Hz).
pub const TICKS_PER_POSITION: u16 = 16;

/// Pulse ticks for position 0, centered within its step.
pub const BASE_TICKS: u16 = 128 + 8;

/// Pulse width in ticks for a raw position index.
///
/// Indices above [`MAX_POSITION`] are clamped.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub const fn position_ticks(index: u8) -> u16 {
    let index = if index > MAX_POSITION { MAX_POSITION } else { index };
    BASE_TICKS + index as u16 * TICKS_PER_POSITION
}

/// Quantize a travel percentage to a raw position index.
///
/// Input is clamped to [0, 100]; 100% maps to [`MAX_POSITION`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent_to_position(percent: f32) -> u8 {
    let percent = percent.clamp(0.0, 100.0);
    (percent / 100.0 * f32::from(MAX_POSITION)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_zero_is_136_ticks() {
        assert_eq!(position_ticks(0), 136);
    }

    #[test]
    fn position_max_is_648_ticks() {
        assert_eq!(position_ticks(MAX_POSITION), 648);
    }

    #[test]
    fn positions_above_max_clamp() {
        assert_eq!(position_ticks(40), position_ticks(MAX_POSITION));
        assert_eq!(position_ticks(u8::MAX), position_ticks(MAX_POSITION));
    }

    #[test]
    fn percent_endpoints_hit_first_and_last_position() {
        assert_eq!(percent_to_position(0.0), 0);
        assert_eq!(percent_to_position(100.0), MAX_POSITION);
    }

    #[test]
    fn percent_out_of_range_clamps() {
        assert_eq!(percent_to_position(-10.0), 0);
        assert_eq!(percent_to_position(150.0), MAX_POSITION);
    }

    #[test]
    fn percent_midpoint_is_position_16() {
        assert_eq!(percent_to_position(50.0), 16);
    }

    #[test]
    fn every_position_pulse_fits_the_cycle() {
        for index in 0..=MAX_POSITION {
            let ticks = position_ticks(index);
            assert!((136..=648).contains(&ticks));
        }
    }
}
