//! Vector distance functions.

use crate::config::DistanceMetric;
use crate::error::ValidationError;

impl DistanceMetric {
    /// Distance between two vectors under this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f64, ValidationError> {
        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }
}

/// Cosine distance: `1 - (a.b) / (|a| |b|)`.
///
/// A zero-magnitude vector has similarity 0 with anything, hence distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, ValidationError> {
    check_lengths(a, b)?;

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Standard L2 distance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f64, ValidationError> {
    check_lengths(a, b)?;

    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

fn check_lengths(a: &[f32], b: &[f32]) -> Result<(), ValidationError> {
    if a.len() != b.len() {
        return Err(ValidationError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.5, 0.5];
        let d = cosine_distance(&v, &v).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let d = cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_magnitude_is_max_distance() {
        let d = cosine_distance(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_euclidean() {
        let d = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let err = cosine_distance(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, ValidationError::LengthMismatch { left: 1, right: 2 });
        assert!(euclidean_distance(&[1.0], &[1.0, 2.0]).is_err());
    }
}
