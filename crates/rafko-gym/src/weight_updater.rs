//! Weight-update strategies: plain gradient descent, momentum, Nesterov,
//! Adam and AMSGrad. Every strategy keeps its own per-weight velocity (and,
//! for Adam/AMSGrad, first/second moment) state and is driven through the
//! same `start`/`iterate`/`is_finished` micro-iteration protocol so the
//! optimizer does not need to know which one it is talking to.

use rafko_core::RafkoSettings;

/// A weight-update strategy. `iterate` is called once per micro-iteration
/// with the current averaged gradient vector; most strategies need exactly
/// one micro-iteration per training step, but Nesterov needs two (the first
/// probes the weight at a lookahead point, the second commits the real
/// update).
pub trait WeightUpdater: Send + Sync {
    /// Begin a new update step: reset the micro-iteration counter.
    fn start(&mut self);

    /// Consume one micro-iteration's gradient vector (one entry per weight,
    /// same order as the weight table) and advance internal state.
    fn iterate(&mut self, gradients: &[f64]);

    /// `true` once this strategy's required number of micro-iterations since
    /// the last `start()` have been consumed.
    fn is_finished(&self) -> bool;

    /// The new value weight `i` should take, given this step's gradients.
    fn new_weight(&self, i: usize, weight: f64, gradients: &[f64]) -> f64;

    /// The velocity term `new_weight` subtracted from the old weight, kept
    /// separately so callers (and tests) can inspect it directly.
    fn new_velocity(&self, i: usize, gradients: &[f64]) -> f64;

    /// The weight value the optimizer should actually run this
    /// micro-iteration's forward+backward sweep at, rather than `weight`
    /// itself. Every strategy but Nesterov probes at the real weight;
    /// Nesterov's first micro-iteration probes at the lookahead point
    /// `w - gamma*v_{t-1}` so the gradient it measures already accounts for
    /// where momentum is about to carry the weight.
    fn probe_weight(&self, _i: usize, weight: f64) -> f64 {
        weight
    }
}

/// Plain gradient descent: `velocity = grad * lr`, one micro-iteration.
#[derive(Debug, Clone)]
pub struct PlainUpdater {
    learning_rate: f64,
    done: bool,
}

impl PlainUpdater {
    /// Build a plain updater using `settings.learning_rate`.
    pub fn new(settings: &RafkoSettings) -> Self {
        Self {
            learning_rate: settings.learning_rate,
            done: false,
        }
    }
}

impl WeightUpdater for PlainUpdater {
    fn start(&mut self) {
        self.done = false;
    }

    fn iterate(&mut self, _gradients: &[f64]) {
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn new_weight(&self, i: usize, weight: f64, gradients: &[f64]) -> f64 {
        weight - self.new_velocity(i, gradients)
    }

    fn new_velocity(&self, i: usize, gradients: &[f64]) -> f64 {
        gradients[i] * self.learning_rate
    }
}

/// `velocity_t = gamma * velocity_{t-1} + grad * lr`, one micro-iteration.
#[derive(Debug, Clone)]
pub struct MomentumUpdater {
    learning_rate: f64,
    gamma: f64,
    velocity: Vec<f64>,
    done: bool,
}

impl MomentumUpdater {
    /// Build a momentum updater for `weight_count` weights.
    pub fn new(settings: &RafkoSettings, weight_count: usize) -> Self {
        Self {
            learning_rate: settings.learning_rate,
            gamma: settings.gamma,
            velocity: vec![0.0; weight_count],
            done: false,
        }
    }
}

impl WeightUpdater for MomentumUpdater {
    fn start(&mut self) {
        self.done = false;
    }

    fn iterate(&mut self, gradients: &[f64]) {
        for (v, &g) in self.velocity.iter_mut().zip(gradients.iter()) {
            *v = self.gamma * *v + g * self.learning_rate;
        }
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn new_weight(&self, i: usize, weight: f64, _gradients: &[f64]) -> f64 {
        weight - self.velocity[i]
    }

    fn new_velocity(&self, i: usize, _gradients: &[f64]) -> f64 {
        self.velocity[i]
    }
}

/// As momentum, but the first of its two micro-iterations probes the weight
/// at a lookahead point `w - gamma * velocity_{t-1}` so the gradient the
/// second micro-iteration receives already reflects where momentum is about
/// to carry the weight.
#[derive(Debug, Clone)]
pub struct NesterovUpdater {
    learning_rate: f64,
    gamma: f64,
    velocity: Vec<f64>,
    micro_iteration: usize,
}

impl NesterovUpdater {
    /// Build a Nesterov updater for `weight_count` weights.
    pub fn new(settings: &RafkoSettings, weight_count: usize) -> Self {
        Self {
            learning_rate: settings.learning_rate,
            gamma: settings.gamma,
            velocity: vec![0.0; weight_count],
            micro_iteration: 0,
        }
    }

    /// The lookahead weight a caller should probe the network at before the
    /// first micro-iteration's gradient is computed.
    pub fn lookahead_weight(&self, i: usize, weight: f64) -> f64 {
        weight - self.gamma * self.velocity[i]
    }
}

impl WeightUpdater for NesterovUpdater {
    fn start(&mut self) {
        self.micro_iteration = 0;
    }

    fn iterate(&mut self, gradients: &[f64]) {
        if self.micro_iteration == 0 {
            // The gradient here was measured at the lookahead-probed point
            // (see probe_weight), so this is the real velocity update;
            // the second micro-iteration is a confirmation pass at the
            // committed weight and does not touch velocity again.
            for (v, &g) in self.velocity.iter_mut().zip(gradients.iter()) {
                *v = self.gamma * *v + g * self.learning_rate;
            }
        }
        self.micro_iteration += 1;
    }

    fn is_finished(&self) -> bool {
        self.micro_iteration >= 2
    }

    fn new_weight(&self, i: usize, weight: f64, _gradients: &[f64]) -> f64 {
        weight - self.velocity[i]
    }

    fn new_velocity(&self, i: usize, _gradients: &[f64]) -> f64 {
        self.velocity[i]
    }

    fn probe_weight(&self, i: usize, weight: f64) -> f64 {
        if self.micro_iteration == 0 {
            self.lookahead_weight(i, weight)
        } else {
            weight
        }
    }
}

/// Adam: exponential moving averages of the gradient (`m`) and its square
/// (`r`), bias-corrected by the number of steps taken so far.
#[derive(Debug, Clone)]
pub struct AdamUpdater {
    learning_rate: f64,
    beta: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    r: Vec<f64>,
    step: u32,
    done: bool,
}

impl AdamUpdater {
    /// Build an Adam updater for `weight_count` weights.
    pub fn new(settings: &RafkoSettings, weight_count: usize) -> Self {
        Self {
            learning_rate: settings.learning_rate,
            beta: settings.beta,
            beta2: settings.beta2,
            epsilon: settings.epsilon,
            m: vec![0.0; weight_count],
            r: vec![0.0; weight_count],
            step: 0,
            done: false,
        }
    }

    fn velocity_for(&self, i: usize, g: f64, m_new: f64, r_new: f64) -> f64 {
        let _ = (i, g);
        let t = self.step as i32;
        let m_hat = m_new / (1.0 - self.beta.powi(t));
        let r_hat = r_new / (1.0 - self.beta2.powi(t));
        self.learning_rate * m_hat / (libm::sqrt(r_hat) + self.epsilon)
    }
}

impl WeightUpdater for AdamUpdater {
    fn start(&mut self) {
        self.done = false;
    }

    fn iterate(&mut self, gradients: &[f64]) {
        self.step += 1;
        for ((m, r), &g) in self.m.iter_mut().zip(self.r.iter_mut()).zip(gradients.iter()) {
            *m = self.beta * *m + (1.0 - self.beta) * g;
            *r = self.beta2 * *r + (1.0 - self.beta2) * g * g;
        }
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn new_weight(&self, i: usize, weight: f64, gradients: &[f64]) -> f64 {
        weight - self.new_velocity(i, gradients)
    }

    fn new_velocity(&self, i: usize, gradients: &[f64]) -> f64 {
        self.velocity_for(i, gradients[i], self.m[i], self.r[i])
    }
}

/// As Adam, but keeps the running maximum of the second-moment estimate
/// (`r_max`) and uses it in place of the current step's `r`, guaranteeing a
/// monotonically non-increasing effective step size per weight.
#[derive(Debug, Clone)]
pub struct AmsGradUpdater {
    learning_rate: f64,
    beta: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    r_max: Vec<f64>,
    step: u32,
    done: bool,
}

impl AmsGradUpdater {
    /// Build an AMSGrad updater for `weight_count` weights.
    pub fn new(settings: &RafkoSettings, weight_count: usize) -> Self {
        Self {
            learning_rate: settings.learning_rate,
            beta: settings.beta,
            beta2: settings.beta2,
            epsilon: settings.epsilon,
            m: vec![0.0; weight_count],
            r_max: vec![0.0; weight_count],
            step: 0,
            done: false,
        }
    }
}

impl WeightUpdater for AmsGradUpdater {
    fn start(&mut self) {
        self.done = false;
    }

    fn iterate(&mut self, gradients: &[f64]) {
        self.step += 1;
        for ((m, r_max), &g) in self.m.iter_mut().zip(self.r_max.iter_mut()).zip(gradients.iter()) {
            *m = self.beta * *m + (1.0 - self.beta) * g;
            let r = self.beta2 * *r_max + (1.0 - self.beta2) * g * g;
            *r_max = r_max.max(r);
        }
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn new_weight(&self, i: usize, weight: f64, gradients: &[f64]) -> f64 {
        weight - self.new_velocity(i, gradients)
    }

    fn new_velocity(&self, i: usize, _gradients: &[f64]) -> f64 {
        let t = self.step as i32;
        let m_hat = self.m[i] / (1.0 - self.beta.powi(t));
        let r_hat = self.r_max[i] / (1.0 - self.beta2.powi(t));
        self.learning_rate * m_hat / (libm::sqrt(r_hat) + self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_updater_exact_formula() {
        let settings = RafkoSettings::default().with_learning_rate(0.1);
        let mut updater = PlainUpdater::new(&settings);
        updater.start();
        let gradients = [2.0];
        updater.iterate(&gradients);
        assert!(updater.is_finished());
        assert_eq!(updater.new_velocity(0, &gradients), 0.2);
        assert_eq!(updater.new_weight(0, 1.0, &gradients), 0.8);
    }

    #[test]
    fn test_momentum_accumulates_across_steps() {
        let settings = RafkoSettings::default().with_learning_rate(1.0);
        let mut updater = MomentumUpdater::new(&settings, 1);
        updater.start();
        updater.iterate(&[1.0]);
        let v1 = updater.new_velocity(0, &[1.0]);
        assert_eq!(v1, 1.0);
        updater.start();
        updater.iterate(&[1.0]);
        let v2 = updater.new_velocity(0, &[1.0]);
        // v2 = gamma * v1 + grad*lr
        assert!((v2 - (settings.gamma * v1 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_nesterov_requires_two_micro_iterations() {
        let settings = RafkoSettings::default();
        let mut updater = NesterovUpdater::new(&settings, 1);
        updater.start();
        assert!(!updater.is_finished());
        updater.iterate(&[1.0]);
        assert!(!updater.is_finished());
        updater.iterate(&[1.0]);
        assert!(updater.is_finished());
    }

    #[test]
    fn test_nesterov_lookahead_uses_prior_velocity() {
        let settings = RafkoSettings::default().with_learning_rate(1.0);
        let mut updater = NesterovUpdater::new(&settings, 1);
        updater.start();
        updater.iterate(&[1.0]);
        updater.iterate(&[1.0]);
        updater.start();
        // velocity after the first step = gamma*0 + 1*1 = 1
        let lookahead = updater.probe_weight(0, 5.0);
        assert_eq!(lookahead, 5.0 - settings.gamma * 1.0);
    }

    #[test]
    fn test_adam_bias_correction_shrinks_with_steps() {
        let settings = RafkoSettings::default().with_learning_rate(1.0);
        let mut updater = AdamUpdater::new(&settings, 1);
        updater.start();
        updater.iterate(&[1.0]);
        let v1 = updater.new_velocity(0, &[1.0]);
        assert!(v1.is_finite() && v1 > 0.0);
    }

    #[test]
    fn test_amsgrad_r_max_never_decreases_effective_step() {
        let settings = RafkoSettings::default().with_learning_rate(1.0);
        let mut updater = AmsGradUpdater::new(&settings, 1);
        updater.start();
        updater.iterate(&[2.0]);
        let v1 = updater.new_velocity(0, &[2.0]);
        updater.start();
        updater.iterate(&[0.01]);
        let v2 = updater.new_velocity(0, &[0.01]);
        // r_max retains the large gradient's contribution, so v2 should not
        // blow back up the way plain Adam's r would after a tiny gradient.
        assert!(v2 < v1);
    }
}
