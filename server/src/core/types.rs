//! NeuralPlay Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Zero-based index of a decoded frame
pub type FrameIndex = u64;

/// Frame rate assumed when the container does not report a usable one
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Returns `reported` when it is a usable frame rate, otherwise 30 fps.
pub fn effective_frame_rate(reported: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        DEFAULT_FRAME_RATE
    }
}

/// Rounds to two decimal places, the precision used on the event wire.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_frame_rate_fallback() {
        assert_eq!(effective_frame_rate(25.0), 25.0);
        assert_eq!(effective_frame_rate(0.0), 30.0);
        assert_eq!(effective_frame_rate(-1.0), 30.0);
        assert_eq!(effective_frame_rate(f64::NAN), 30.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(2.0), 2.0);
        assert_eq!(round2(0.005), 0.01);
    }
}
