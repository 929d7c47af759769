//! Linear interpolation for variable-speed reads
//!
//! Speed changes are implemented as plain resampling: output sample `i` is
//! read at fractional source position `i × rate`. Pitch follows speed.

use crate::types::Sample;

/// Sample `source` at a fractional `position`
///
/// - Both neighbours present: blend by the fractional weight
/// - Only the lower neighbour present: return it unchanged
/// - Past the end: `None` (caller emits silence)
#[inline]
pub fn linear_at(source: &[Sample], position: f64) -> Option<Sample> {
    if position < 0.0 {
        return None;
    }
    let index = position.floor() as usize;
    let frac = (position - index as f64) as Sample;

    match (source.get(index), source.get(index + 1)) {
        (Some(&a), Some(&b)) => Some(a * (1.0 - frac) + b * frac),
        (Some(&a), None) => Some(a),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_position_returns_exact_sample() {
        let source = [0.0, 1.0, 0.5];
        assert_eq!(linear_at(&source, 0.0), Some(0.0));
        assert_eq!(linear_at(&source, 1.0), Some(1.0));
    }

    #[test]
    fn test_fractional_position_blends() {
        let source = [0.0, 1.0];
        let v = linear_at(&source, 0.25).unwrap();
        assert!((v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_last_sample_without_upper_neighbour() {
        let source = [0.2, 0.4];
        assert_eq!(linear_at(&source, 1.5), Some(0.4));
    }

    #[test]
    fn test_past_end_is_none() {
        let source = [0.2, 0.4];
        assert_eq!(linear_at(&source, 2.0), None);
        assert_eq!(linear_at(&[], 0.0), None);
    }
}
