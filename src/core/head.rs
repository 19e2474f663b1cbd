//! Scalar linear head `y = w·x + b`, used both as the value head and the
//! reward head.

use crate::error::{Result, RlhfError};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearHead {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearHead {
    pub fn zeros(dim: usize) -> Self {
        Self {
            weights: vec![0.0; dim],
            bias: 0.0,
        }
    }

    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    pub fn forward(&self, x: &[f64]) -> Result<f64> {
        RlhfError::check_len("head input", self.weights.len(), x.len())?;
        Ok(dot(&self.weights, x) + self.bias)
    }

    /// `w <- w - lr * grad`.
    pub fn apply_gradient(&mut self, grad: &[f64], lr: f64) -> Result<()> {
        RlhfError::check_len("weight gradient", self.weights.len(), grad.len())?;
        for (w, g) in self.weights.iter_mut().zip(grad) {
            *w -= lr * g;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.weights.iter_mut().for_each(|w| *w = 0.0);
        self.bias = 0.0;
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_is_affine() {
        let head = LinearHead::new(vec![1.0, -2.0], 0.5);
        assert_eq!(head.forward(&[3.0, 1.0]).unwrap(), 1.5);
        assert!(head.forward(&[1.0]).is_err());
    }

    #[test]
    fn gradient_step_moves_against_gradient() {
        let mut head = LinearHead::zeros(2);
        head.apply_gradient(&[1.0, -1.0], 0.5).unwrap();
        assert_eq!(head.weights, vec![-0.5, 0.5]);
        head.reset();
        assert_eq!(head, LinearHead::zeros(2));
    }
}
