//! Input (merge) functions used to fold a neuron's weighted inputs and bias
//! terms together pairwise.

/// A binary merge function combining two partial sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFunction {
    /// `a + b`
    Add,
    /// `a * b`
    Multiply,
}

impl InputFunction {
    /// Combine two values.
    pub fn value(&self, a: f64, b: f64) -> f64 {
        match self {
            InputFunction::Add => a + b,
            InputFunction::Multiply => a * b,
        }
    }

    /// Partial derivative of `value(a, b)` with respect to `a`, evaluated at
    /// the already-computed `a`, `b`.
    pub fn d_a(&self, a: f64, b: f64) -> f64 {
        match self {
            InputFunction::Add => {
                let _ = (a, b);
                1.0
            }
            InputFunction::Multiply => b,
        }
    }

    /// Partial derivative of `value(a, b)` with respect to `b`.
    pub fn d_b(&self, a: f64, b: f64) -> f64 {
        match self {
            InputFunction::Add => {
                let _ = (a, b);
                1.0
            }
            InputFunction::Multiply => a,
        }
    }

    /// Chain-rule combination: given `a`, `b` and their total derivatives
    /// `da`, `db` with respect to some weight `w`, returns
    /// `d(value(a,b))/dw`.
    pub fn combine_derivative(&self, a: f64, b: f64, da: f64, db: f64) -> f64 {
        self.d_a(a, b) * da + self.d_b(a, b) * db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(InputFunction::Add.value(2.0, 3.0), 5.0);
        assert_eq!(InputFunction::Add.combine_derivative(2.0, 3.0, 1.0, 1.0), 2.0);
    }

    #[test]
    fn test_multiply() {
        assert_eq!(InputFunction::Multiply.value(2.0, 3.0), 6.0);
        // d/dw (a*b) with da/dw=1, db/dw=0 -> b
        assert_eq!(InputFunction::Multiply.combine_derivative(2.0, 3.0, 1.0, 0.0), 3.0);
        assert_eq!(InputFunction::Multiply.combine_derivative(2.0, 3.0, 0.0, 1.0), 2.0);
    }
}
