//! Fixed-width numeric tuples: positions, fitness values and constraint
//! violations.
//!
//! One [`Position`] describes the location inside a single dimension of the
//! search space. A dimension may be represented by more than one value
//! (interval- or transform-based spaces), so the width is a per-run constant
//! carried by the tuple and validated on every cross-tuple operation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};

/// Location within one dimension of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    values: Vec<f64>,
}

impl Position {
    /// Create a zeroed position of the given width.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![0.0; width.max(1)],
        }
    }

    /// Tuple width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Raw view of the values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn check_width(&self, got: usize) -> Result<()> {
        if self.values.len() != got {
            return Err(TesoroError::ShapeMismatch {
                expected: self.values.len(),
                got,
            });
        }
        Ok(())
    }

    /// Assign the same value to every element.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Assign from a slice of matching width.
    pub fn assign_slice(&mut self, buffer: &[f64]) -> Result<()> {
        self.check_width(buffer.len())?;
        self.values.copy_from_slice(buffer);
        Ok(())
    }

    /// Assign from a peer position of matching width.
    pub fn assign(&mut self, other: &Position) -> Result<()> {
        self.assign_slice(&other.values)
    }

    /// Elementwise `+= value`.
    pub fn add_scalar(&mut self, value: f64) {
        for v in &mut self.values {
            *v += value;
        }
    }

    /// Elementwise `+= other`.
    pub fn add(&mut self, other: &Position) -> Result<()> {
        self.check_width(other.width())?;
        for (v, o) in self.values.iter_mut().zip(other.values.iter()) {
            *v += o;
        }
        Ok(())
    }

    /// Elementwise `-= value`.
    pub fn sub_scalar(&mut self, value: f64) {
        for v in &mut self.values {
            *v -= value;
        }
    }

    /// Elementwise `-= other`.
    pub fn sub(&mut self, other: &Position) -> Result<()> {
        self.check_width(other.width())?;
        for (v, o) in self.values.iter_mut().zip(other.values.iter()) {
            *v -= o;
        }
        Ok(())
    }

    /// Elementwise `*= value`.
    pub fn scale(&mut self, value: f64) {
        for v in &mut self.values {
            *v *= value;
        }
    }

    /// Clamp every element to `<= max_value`.
    pub fn clamp_upper(&mut self, max_value: f64) {
        for v in &mut self.values {
            if *v > max_value {
                *v = max_value;
            }
        }
    }

    /// Clamp every element to `>= min_value`.
    pub fn clamp_lower(&mut self, min_value: f64) {
        for v in &mut self.values {
            if *v < min_value {
                *v = min_value;
            }
        }
    }

    /// First element (the whole position when the width is 1).
    #[must_use]
    pub fn first(&self) -> f64 {
        self.values[0]
    }

    /// Smallest element.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest element.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sum of all elements.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Fitness of a candidate solution. Assignment and equality only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    values: Vec<f64>,
}

impl Fitness {
    /// Create a zeroed fitness of the given width.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![0.0; width.max(1)],
        }
    }

    /// Tuple width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Raw view of the values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Assign the same value to every element.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Assign from a slice of matching width.
    pub fn assign_slice(&mut self, buffer: &[f64]) -> Result<()> {
        if self.values.len() != buffer.len() {
            return Err(TesoroError::ShapeMismatch {
                expected: self.values.len(),
                got: buffer.len(),
            });
        }
        self.values.copy_from_slice(buffer);
        Ok(())
    }

    /// First element, used whenever the fitness is scalar.
    #[must_use]
    pub fn first(&self) -> f64 {
        self.values[0]
    }
}

/// Constraint violations of a candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    values: Vec<f64>,
}

impl Violation {
    /// Create a zeroed violation record of the given width.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![0.0; width.max(1)],
        }
    }

    /// Tuple width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Raw view of the values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Assign the same value to every element.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Assign from a slice of matching width.
    pub fn assign_slice(&mut self, buffer: &[f64]) -> Result<()> {
        if self.values.len() != buffer.len() {
            return Err(TesoroError::ShapeMismatch {
                expected: self.values.len(),
                got: buffer.len(),
            });
        }
        self.values.copy_from_slice(buffer);
        Ok(())
    }

    /// First element.
    #[must_use]
    pub fn first(&self) -> f64 {
        self.values[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_arithmetic() {
        let mut a = Position::new(3);
        a.assign_slice(&[1.0, 2.0, 3.0]).unwrap();
        let mut b = Position::new(3);
        b.assign_slice(&[0.5, 0.5, 0.5]).unwrap();

        a.sub(&b).unwrap();
        assert_eq!(a.values(), &[0.5, 1.5, 2.5]);

        a.add_scalar(1.0);
        assert_eq!(a.values(), &[1.5, 2.5, 3.5]);

        a.scale(2.0);
        assert_eq!(a.values(), &[3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_position_clamping() {
        let mut p = Position::new(3);
        p.assign_slice(&[0.5, 1.5, 2.5]).unwrap();
        p.clamp_lower(1.0);
        assert_eq!(p.values(), &[1.0, 1.5, 2.5]);
        p.clamp_upper(2.0);
        assert_eq!(p.values(), &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_position_shape_mismatch() {
        let mut a = Position::new(2);
        let b = Position::new(3);
        assert!(matches!(
            a.add(&b),
            Err(TesoroError::ShapeMismatch { expected: 2, got: 3 })
        ));
        assert!(a.assign_slice(&[1.0]).is_err());
    }

    #[test]
    fn test_position_extrema_and_sum() {
        let mut p = Position::new(4);
        p.assign_slice(&[3.0, -1.0, 2.0, 0.5]).unwrap();
        assert_eq!(p.first(), 3.0);
        assert_eq!(p.lower(), -1.0);
        assert_eq!(p.upper(), 3.0);
        assert!((p.sum() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_fitness_assignment_and_equality() {
        let mut a = Fitness::new(2);
        a.assign_slice(&[1.0, 2.0]).unwrap();
        let mut b = Fitness::new(2);
        b.assign_slice(&[1.0, 2.0]).unwrap();
        assert_eq!(a, b);
        b.fill(0.0);
        assert_ne!(a, b);
        assert_eq!(a.first(), 1.0);
    }

    #[test]
    fn test_zero_width_is_promoted_to_one() {
        assert_eq!(Position::new(0).width(), 1);
        assert_eq!(Fitness::new(0).width(), 1);
        assert_eq!(Violation::new(0).width(), 1);
    }
}
