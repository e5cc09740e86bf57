//! Transfer (activation) functions: identity, sigmoid, tanh, relu, elu, selu.

/// An activation function applied to a neuron's folded input sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferFunction {
    /// `f(x) = x`
    Identity,
    /// `f(x) = 1 / (1 + e^-x)`
    Sigmoid,
    /// `f(x) = tanh(x)`
    Tanh,
    /// `f(x) = max(0, x)`
    Relu,
    /// `f(x) = x if x > 0 else alpha * (e^x - 1)`
    Elu,
    /// `f(x) = lambda * (x if x > 0 else alpha * (e^x - 1))`
    Selu,
}

/// Clamp applied to the sigmoid argument before exponentiating; beyond this
/// magnitude the output has already saturated to 0.0/1.0 at `f64` precision.
const SIGMOID_CLAMP: f64 = 40.0;

impl TransferFunction {
    /// Evaluate the function at `x`.
    pub fn value(&self, x: f64, alpha: f64, lambda: f64) -> f64 {
        match self {
            TransferFunction::Identity => x,
            TransferFunction::Sigmoid => {
                let x = x.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
                1.0 / (1.0 + libm::exp(-x))
            }
            TransferFunction::Tanh => libm::tanh(x),
            TransferFunction::Relu => x.max(0.0),
            TransferFunction::Elu => {
                if x > 0.0 {
                    x
                } else {
                    alpha * (libm::exp(x) - 1.0)
                }
            }
            TransferFunction::Selu => {
                if x > 0.0 {
                    lambda * x
                } else {
                    lambda * alpha * (libm::exp(x) - 1.0)
                }
            }
        }
    }

    /// Evaluate `f'(x)`. Where the derivative is naturally expressed in
    /// terms of the already-computed value (sigmoid, tanh, elu, selu), the
    /// caller should pass that value in `value` to avoid recomputation; for
    /// `Identity`/`Relu` it is ignored.
    pub fn derivative(&self, x: f64, value: f64, alpha: f64, lambda: f64) -> f64 {
        match self {
            TransferFunction::Identity => 1.0,
            TransferFunction::Sigmoid => value * (1.0 - value),
            TransferFunction::Tanh => 1.0 - value * value,
            TransferFunction::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            TransferFunction::Elu => {
                if x > 0.0 {
                    1.0
                } else {
                    value + alpha
                }
            }
            TransferFunction::Selu => {
                if x > 0.0 {
                    lambda
                } else {
                    value + lambda * alpha
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(TransferFunction::Identity.value(3.5, 1.0, 1.0), 3.5);
        assert_eq!(TransferFunction::Identity.derivative(3.5, 3.5, 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_sigmoid_bounds() {
        let v = TransferFunction::Sigmoid.value(0.0, 1.0, 1.0);
        assert!((v - 0.5).abs() < 1e-12);
        let d = TransferFunction::Sigmoid.derivative(0.0, v, 1.0, 1.0);
        assert!((d - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_does_not_overflow() {
        let v = TransferFunction::Sigmoid.value(1000.0, 1.0, 1.0);
        assert!(v.is_finite());
        assert!((v - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relu() {
        assert_eq!(TransferFunction::Relu.value(-2.0, 1.0, 1.0), 0.0);
        assert_eq!(TransferFunction::Relu.value(2.0, 1.0, 1.0), 2.0);
        assert_eq!(TransferFunction::Relu.derivative(-2.0, 0.0, 1.0, 1.0), 0.0);
        assert_eq!(TransferFunction::Relu.derivative(2.0, 2.0, 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_tanh() {
        let v = TransferFunction::Tanh.value(0.0, 1.0, 1.0);
        assert!(v.abs() < 1e-12);
        let d = TransferFunction::Tanh.derivative(0.0, v, 1.0, 1.0);
        assert!((d - 1.0).abs() < 1e-12);
    }
}
