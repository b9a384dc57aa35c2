//! Numeric helpers for the trainer

use ndarray::{Array1, ArrayView1};

/// Trait for schedules (e.g., for step-size decay)
pub trait Schedule: Send + Sync {
    /// Get value at step t
    fn value(&self, t: usize) -> f64;
}

/// Exponential decay schedule
#[derive(Debug, Clone)]
pub struct ExponentialSchedule {
    /// Starting value
    pub start: f64,
    /// Minimum value
    pub min_value: f64,
    /// Decay rate
    pub decay_rate: f64,
}

impl ExponentialSchedule {
    /// Create a new exponential schedule
    pub fn new(start: f64, min_value: f64, decay_rate: f64) -> Self {
        Self {
            start,
            min_value,
            decay_rate,
        }
    }
}

impl Schedule for ExponentialSchedule {
    fn value(&self, t: usize) -> f64 {
        let value = self.start * (self.decay_rate.powf(t as f64));
        value.max(self.min_value)
    }
}

/// Clip value to range
pub fn clip(x: f64, min: f64, max: f64) -> f64 {
    x.clamp(min, max)
}

/// Scale `v` in place so its entries sum to one
pub fn l1_normalize(v: &mut Array1<f64>) {
    let z = v.sum();
    v.mapv_inplace(|x| x / z);
}

/// Cosine similarity of two vectors; 1 means identical direction
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.dot(&b) / norm(a) / norm(b)
}

/// Angle between two vectors in radians
pub fn angular_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    cosine_similarity(a, b).clamp(-1.0, 1.0).acos()
}

/// Euclidean norm
pub fn norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_exponential_schedule() {
        let schedule = ExponentialSchedule::new(0.5, 0.0, 0.99);
        assert_eq!(schedule.value(0), 0.5);
        assert_relative_eq!(schedule.value(2), 0.5 * 0.99 * 0.99, epsilon = 1e-12);
    }

    #[test]
    fn test_l1_normalize() {
        let mut v = array![1.0, 3.0];
        l1_normalize(&mut v);
        assert_eq!(v, array![0.25, 0.75]);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = array![1.0, 0.0];
        let b = array![2.0, 0.0];
        let c = array![0.0, 5.0];
        assert_relative_eq!(cosine_similarity(a.view(), b.view()), 1.0);
        assert_relative_eq!(cosine_similarity(a.view(), c.view()), 0.0);
        assert_relative_eq!(
            angular_distance(a.view(), c.view()),
            std::f64::consts::FRAC_PI_2
        );
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(5.0, -3.0, 3.0), 3.0);
        assert_eq!(clip(-0.5, -3.0, 3.0), -0.5);
    }
}
