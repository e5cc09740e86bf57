//! Runtime-tunable settings shared by the network, autodiff optimizer and
//! weight updaters.

/// A single learning-rate decay step: once `iteration_threshold` is reached,
/// the base learning rate is multiplied by `multiplier`. The list is kept
/// sorted by `iteration_threshold` ascending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayStep {
    /// Iteration at which this multiplier takes effect
    pub iteration_threshold: usize,
    /// Multiplier applied to the base learning rate from this point on
    pub multiplier: f64,
}

/// Bitset of training strategies, kept as plain flags rather than a crate
/// dependency since only three bits are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrainingStrategies {
    /// Stop once the training error reaches exactly zero
    pub stop_if_training_error_zero: bool,
    /// Stop once the training error drops below the learning rate
    pub stop_if_training_error_below_learning_rate: bool,
    /// Stop using an early-stopping criterion (best-so-far with patience)
    pub early_stopping: bool,
}

/// Every tunable named in the external-interfaces settings table.
#[derive(Debug, Clone, PartialEq)]
pub struct RafkoSettings {
    /// Size of the sequence-parallel solve pool
    pub max_solve_threads: usize,
    /// Size of the inner data-parallel processing pool
    pub max_processing_threads: usize,
    /// Base learning rate
    pub learning_rate: f64,
    /// Sorted multiplicative decay schedule
    pub learning_rate_decay: Vec<DecayStep>,
    /// Samples drawn per stochastic evaluation
    pub minibatch_size: usize,
    /// Per-sequence backprop window; `None` means "use the full sequence"
    pub memory_truncation: Option<usize>,
    /// Per-neuron dropout probability during training
    pub dropout_probability: f64,
    /// Training stop/early-stop strategy bits
    pub training_strategies: TrainingStrategies,
    /// ELU/SELU alpha
    pub alpha: f64,
    /// Adam/AMSGrad beta (first moment decay)
    pub beta: f64,
    /// Adam/AMSGrad beta2 (second moment decay)
    pub beta2: f64,
    /// Momentum/Nesterov gamma
    pub gamma: f64,
    /// Reserved scaling constant (delta)
    pub delta: f64,
    /// Numerical stability epsilon
    pub epsilon: f64,
    /// Reserved scaling constant (zeta)
    pub zeta: f64,
    /// SELU lambda
    pub lambda: f64,
}

impl Default for RafkoSettings {
    fn default() -> Self {
        Self {
            max_solve_threads: 4,
            max_processing_threads: 4,
            learning_rate: 1e-2,
            learning_rate_decay: Vec::new(),
            minibatch_size: 32,
            memory_truncation: None,
            dropout_probability: 0.0,
            training_strategies: TrainingStrategies::default(),
            alpha: 1.0,
            beta: 0.9,
            beta2: 0.999,
            gamma: 0.9,
            delta: 0.0,
            epsilon: 1e-8,
            zeta: 0.0,
            lambda: 1.0507009873554805,
        }
    }
}

impl RafkoSettings {
    /// Set the base learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Install a sorted learning-rate decay schedule
    pub fn with_learning_rate_decay(mut self, mut decay: Vec<DecayStep>) -> Self {
        decay.sort_by_key(|d| d.iteration_threshold);
        self.learning_rate_decay = decay;
        self
    }

    /// Set the stochastic-evaluation minibatch size
    pub fn with_minibatch_size(mut self, minibatch_size: usize) -> Self {
        self.minibatch_size = minibatch_size;
        self
    }

    /// Set the per-sequence backprop truncation window
    pub fn with_memory_truncation(mut self, memory_truncation: usize) -> Self {
        self.memory_truncation = Some(memory_truncation);
        self
    }

    /// Set the per-neuron dropout probability
    pub fn with_dropout_probability(mut self, dropout_probability: f64) -> Self {
        self.dropout_probability = dropout_probability;
        self
    }

    /// Set the solve/processing thread pool sizes
    pub fn with_thread_pools(mut self, max_solve_threads: usize, max_processing_threads: usize) -> Self {
        self.max_solve_threads = max_solve_threads;
        self.max_processing_threads = max_processing_threads;
        self
    }

    /// The learning rate in effect at a given training iteration, after
    /// applying every decay step whose threshold has been reached.
    pub fn effective_learning_rate(&self, iteration: usize) -> f64 {
        let mut rate = self.learning_rate;
        for step in &self.learning_rate_decay {
            if iteration >= step.iteration_threshold {
                rate *= step.multiplier;
            }
        }
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RafkoSettings::default();
        assert_eq!(settings.learning_rate, 1e-2);
        assert!(settings.memory_truncation.is_none());
    }

    #[test]
    fn test_effective_learning_rate_decay() {
        let settings = RafkoSettings::default().with_learning_rate(1.0).with_learning_rate_decay(vec![
            DecayStep { iteration_threshold: 10, multiplier: 0.5 },
            DecayStep { iteration_threshold: 20, multiplier: 0.5 },
        ]);
        assert_eq!(settings.effective_learning_rate(0), 1.0);
        assert_eq!(settings.effective_learning_rate(10), 0.5);
        assert_eq!(settings.effective_learning_rate(20), 0.25);
    }
}
