//! Cost (objective) functions: scalar error between a label and a network's
//! output feature, plus the per-weight derivative the `Objective` operation
//! consumes directly.

/// A cost function comparing one output feature against its label across a
/// dataset of `sample_count` samples (used to scale gradients so that
/// minibatch size does not change the effective learning rate).
pub trait CostFunction: Send + Sync {
    /// Per-feature scalar error contribution, before any `1/sample_count`
    /// scaling (used for diagnostics/full evaluation, summed across features
    /// and samples).
    fn error(&self, label: f64, feature: f64) -> f64;

    /// `d(error summed over the dataset) / dw`, given this feature's total
    /// derivative `feature_deriv` with respect to `w` and the dataset's
    /// `sample_count` (the scaling that keeps gradients independent of
    /// minibatch size).
    fn derivative(&self, label: f64, feature: f64, feature_deriv: f64, sample_count: usize) -> f64;
}

/// `E = (feature - label)^2`
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl CostFunction for MeanSquaredError {
    fn error(&self, label: f64, feature: f64) -> f64 {
        let d = feature - label;
        d * d
    }

    fn derivative(&self, label: f64, feature: f64, feature_deriv: f64, sample_count: usize) -> f64 {
        let n = sample_count.max(1) as f64;
        2.0 * (feature - label) * feature_deriv / n
    }
}

/// `E = (feature - label)^2`, without the `1/n` minibatch scaling (used when
/// the caller wants the raw sum rather than an average, e.g. a single-sample
/// online update).
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl CostFunction for SquaredError {
    fn error(&self, label: f64, feature: f64) -> f64 {
        let d = feature - label;
        d * d
    }

    fn derivative(&self, label: f64, feature: f64, feature_deriv: f64, _sample_count: usize) -> f64 {
        2.0 * (feature - label) * feature_deriv
    }
}

/// Binary cross entropy: `E = -(label*ln(feature) + (1-label)*ln(1-feature))`.
/// `feature` is clamped away from `0`/`1` to keep the logarithm finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

const CROSS_ENTROPY_EPSILON: f64 = 1e-12;

impl CostFunction for CrossEntropy {
    fn error(&self, label: f64, feature: f64) -> f64 {
        let f = feature.clamp(CROSS_ENTROPY_EPSILON, 1.0 - CROSS_ENTROPY_EPSILON);
        -(label * f.ln() + (1.0 - label) * (1.0 - f).ln())
    }

    fn derivative(&self, label: f64, feature: f64, feature_deriv: f64, sample_count: usize) -> f64 {
        let n = sample_count.max(1) as f64;
        let f = feature.clamp(CROSS_ENTROPY_EPSILON, 1.0 - CROSS_ENTROPY_EPSILON);
        let d_error_d_feature = -(label / f) + (1.0 - label) / (1.0 - f);
        d_error_d_feature * feature_deriv / n
    }
}

/// `E = label * ln(label / feature)`, the label treated as a fixed reference
/// distribution weight (`feature` clamped away from zero).
#[derive(Debug, Clone, Copy, Default)]
pub struct KlDivergence;

impl CostFunction for KlDivergence {
    fn error(&self, label: f64, feature: f64) -> f64 {
        if label <= 0.0 {
            return 0.0;
        }
        let f = feature.max(CROSS_ENTROPY_EPSILON);
        label * (label / f).ln()
    }

    fn derivative(&self, label: f64, feature: f64, feature_deriv: f64, sample_count: usize) -> f64 {
        if label <= 0.0 {
            return 0.0;
        }
        let n = sample_count.max(1) as f64;
        let f = feature.max(CROSS_ENTROPY_EPSILON);
        (-label / f) * feature_deriv / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_matches_finite_difference() {
        let cost = MeanSquaredError;
        let label = 0.3;
        let feature = 0.5;
        let h = 1e-6;
        let e0 = cost.error(label, feature);
        let e1 = cost.error(label, feature + h);
        let numeric = (e1 - e0) / h;
        let analytic = cost.derivative(label, feature, 1.0, 1);
        assert!((numeric - analytic).abs() < 1e-3);
    }

    #[test]
    fn test_cross_entropy_matches_finite_difference() {
        let cost = CrossEntropy;
        let label = 1.0;
        let feature = 0.7;
        let h = 1e-6;
        let e0 = cost.error(label, feature);
        let e1 = cost.error(label, feature + h);
        let numeric = (e1 - e0) / h;
        let analytic = cost.derivative(label, feature, 1.0, 1);
        assert!((numeric - analytic).abs() < 1e-2);
    }

    #[test]
    fn test_minibatch_scaling_halves_gradient() {
        let cost = MeanSquaredError;
        let d1 = cost.derivative(0.0, 1.0, 1.0, 1);
        let d2 = cost.derivative(0.0, 1.0, 1.0, 2);
        assert!((d1 - 2.0 * d2).abs() < 1e-12);
    }
}
