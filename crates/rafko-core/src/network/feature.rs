//! Per-layer group features: value-rewriting (solution-relevant) and
//! cost-contributing (performance-relevant) post-processing steps applied
//! across a set of neurons or weights.

/// A solution-relevant or performance-relevant network feature.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkFeature {
    /// Softmax-normalize a group of neuron values.
    Softmax {
        /// Indices of the neurons this feature applies to
        neuron_indices: Vec<usize>,
    },
    /// Zero out designated neurons with probability `probability` during
    /// training; survivors are rescaled by `1 / (1 - probability)` (inverted
    /// dropout).
    Dropout {
        /// Indices of the neurons this feature applies to
        neuron_indices: Vec<usize>,
        /// Per-step drop probability
        probability: f64,
    },
    /// `Σ|w|` over the designated weights.
    L1Regularization {
        /// Weight-table indices this feature applies to
        weight_indices: Vec<usize>,
    },
    /// `Σw²` over the designated weights.
    L2Regularization {
        /// Weight-table indices this feature applies to
        weight_indices: Vec<usize>,
    },
}

impl NetworkFeature {
    /// Apply a solution-relevant feature to `values` in place (a full
    /// neuron-value array indexed by neuron index). Performance-relevant
    /// features (the regularizations) are no-ops here — use
    /// [`NetworkFeature::cost_contribution`] instead.
    pub fn apply_to_values(&self, values: &mut [f64], rng_uniform: &mut impl FnMut() -> f64) {
        match self {
            NetworkFeature::Softmax { neuron_indices } => {
                if neuron_indices.is_empty() {
                    return;
                }
                let max = neuron_indices
                    .iter()
                    .map(|&i| values[i])
                    .fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for &i in neuron_indices {
                    let e = libm::exp(values[i] - max);
                    values[i] = e;
                    sum += e;
                }
                for &i in neuron_indices {
                    values[i] /= sum;
                }
            }
            NetworkFeature::Dropout {
                neuron_indices,
                probability,
            } => {
                if *probability <= 0.0 {
                    return;
                }
                let keep_scale = 1.0 / (1.0 - probability);
                for &i in neuron_indices {
                    if rng_uniform() < *probability {
                        values[i] = 0.0;
                    } else {
                        values[i] *= keep_scale;
                    }
                }
            }
            NetworkFeature::L1Regularization { .. } | NetworkFeature::L2Regularization { .. } => {}
        }
    }

    /// Derivative of the softmax-normalized value at `output_index` with
    /// respect to weight `w`, given the pre-softmax (raw) values of the
    /// whole group, their derivatives with respect to `w`, and the already
    /// softmax-normalized values. Implements the Jacobian-vector product
    /// `softmax_i * (d_i - sum_j softmax_j * d_j)`.
    pub fn softmax_derivative(
        softmax_values: &[f64],
        raw_derivatives: &[f64],
        output_slot: usize,
    ) -> f64 {
        let weighted_sum: f64 = softmax_values
            .iter()
            .zip(raw_derivatives.iter())
            .map(|(s, d)| s * d)
            .sum();
        softmax_values[output_slot] * (raw_derivatives[output_slot] - weighted_sum)
    }

    /// Scalar cost contribution of a performance-relevant feature, and
    /// `None` for solution-relevant features.
    pub fn cost_contribution(&self, weight_table: &[f64]) -> Option<f64> {
        match self {
            NetworkFeature::L1Regularization { weight_indices } => {
                Some(weight_indices.iter().map(|&i| weight_table[i].abs()).sum())
            }
            NetworkFeature::L2Regularization { weight_indices } => Some(
                weight_indices
                    .iter()
                    .map(|&i| weight_table[i] * weight_table[i])
                    .sum(),
            ),
            NetworkFeature::Softmax { .. } | NetworkFeature::Dropout { .. } => None,
        }
    }

    /// Derivative of a performance-relevant feature's cost contribution
    /// with respect to weight index `w`; `0.0` if `w` is not targeted by
    /// this feature.
    pub fn cost_derivative(&self, weight_table: &[f64], w: usize) -> f64 {
        match self {
            NetworkFeature::L1Regularization { weight_indices } => {
                if weight_indices.contains(&w) {
                    weight_table[w].signum()
                } else {
                    0.0
                }
            }
            NetworkFeature::L2Regularization { weight_indices } => {
                if weight_indices.contains(&w) {
                    2.0 * weight_table[w]
                } else {
                    0.0
                }
            }
            NetworkFeature::Softmax { .. } | NetworkFeature::Dropout { .. } => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        // Softmax over three raw values
        let mut values = vec![1.0, 2.0, 3.0];
        let feature = NetworkFeature::Softmax {
            neuron_indices: vec![0, 1, 2],
        };
        feature.apply_to_values(&mut values, &mut || 0.0);
        let sum: f64 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(values.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_dropout_rescales_survivors() {
        let mut values = vec![1.0, 1.0];
        let feature = NetworkFeature::Dropout {
            neuron_indices: vec![0, 1],
            probability: 0.5,
        };
        // rng always "survives" (returns >= probability)
        feature.apply_to_values(&mut values, &mut || 0.9);
        assert!((values[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dropout_drops_below_threshold() {
        let mut values = vec![1.0, 1.0];
        let feature = NetworkFeature::Dropout {
            neuron_indices: vec![0, 1],
            probability: 0.5,
        };
        feature.apply_to_values(&mut values, &mut || 0.1);
        assert_eq!(values[0], 0.0);
    }

    #[test]
    fn test_l1_l2_cost_contribution() {
        let weights = vec![-2.0, 3.0];
        let l1 = NetworkFeature::L1Regularization {
            weight_indices: vec![0, 1],
        };
        assert_eq!(l1.cost_contribution(&weights), Some(5.0));
        assert_eq!(l1.cost_derivative(&weights, 0), -1.0);

        let l2 = NetworkFeature::L2Regularization {
            weight_indices: vec![0, 1],
        };
        assert_eq!(l2.cost_contribution(&weights), Some(13.0));
        assert_eq!(l2.cost_derivative(&weights, 1), 6.0);
    }
}
