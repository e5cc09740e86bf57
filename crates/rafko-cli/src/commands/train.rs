//! Drive a training run over a network file's dataset.

use clap::Args;
use log::info;
use std::path::PathBuf;

use rafko_gym::cost::{CrossEntropy, KlDivergence, MeanSquaredError, SquaredError};
use rafko_gym::weight_updater::{AdamUpdater, AmsGradUpdater, MomentumUpdater, NesterovUpdater, PlainUpdater};
use rafko_gym::{CostFunction, IterationOutcome, TrainingContext, WeightUpdater};

use crate::error::{CliError, CliResult};
use crate::netfile::NetworkFile;

/// Train a network against the dataset in a network file.
#[derive(Args, Debug)]
pub struct TrainCommand {
    /// Path to a network file with a `[dataset]` section
    pub path: PathBuf,

    /// Number of passes over every sequence in the dataset
    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    /// Report full-dataset fitness every this many epochs
    #[arg(long, default_value_t = 1)]
    pub report_every: usize,
}

impl TrainCommand {
    /// Run the configured number of epochs, reporting fitness as it goes.
    pub fn execute(self) -> CliResult<()> {
        let text = std::fs::read_to_string(&self.path)?;
        let file = NetworkFile::parse(&text)?;
        let network = file.build_network()?;
        let dataset = file.build_dataset()?;
        let sequence_count = dataset.number_of_sequences();
        let settings = file.build_settings();
        let weight_count = network.weight_table().len();

        let cost_fn = select_cost_function(file.settings.cost_function.as_deref());
        let weight_updater = select_weight_updater(file.settings.weight_updater.as_deref(), &settings, weight_count);

        let mut ctx = TrainingContext::new(network, Box::new(dataset), cost_fn, weight_updater, settings)?;

        info!("starting training: {} epochs over {} sequences", self.epochs, sequence_count);
        for epoch in 0..self.epochs {
            for seq in 0..sequence_count {
                match ctx.train_sequence(seq)? {
                    IterationOutcome::Completed => {}
                    IterationOutcome::NumericalFailure { operation_index, step } => {
                        return Err(CliError::config(format!(
                            "numerical failure at operation {operation_index}, step {step} (epoch {epoch}, sequence {seq})"
                        )));
                    }
                }
            }
            if self.report_every > 0 && (epoch + 1) % self.report_every == 0 {
                info!("epoch {}: fitness = {:.6}", epoch + 1, ctx.full_evaluation());
            }
        }
        println!("final fitness: {:.6}", ctx.full_evaluation());
        Ok(())
    }
}

fn select_cost_function(name: Option<&str>) -> Box<dyn CostFunction> {
    match name {
        Some("mse") => Box::new(MeanSquaredError),
        Some("cross_entropy") => Box::new(CrossEntropy),
        Some("kl_divergence") => Box::new(KlDivergence),
        _ => Box::new(SquaredError),
    }
}

fn select_weight_updater(
    name: Option<&str>,
    settings: &rafko_core::RafkoSettings,
    weight_count: usize,
) -> Box<dyn WeightUpdater> {
    match name {
        Some("momentum") => Box::new(MomentumUpdater::new(settings, weight_count)),
        Some("nesterov") => Box::new(NesterovUpdater::new(settings, weight_count)),
        Some("adam") => Box::new(AdamUpdater::new(settings, weight_count)),
        Some("amsgrad") => Box::new(AmsGradUpdater::new(settings, weight_count)),
        _ => Box::new(PlainUpdater::new(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY_REGRESSION: &str = r#"
[network]
input_data_size = 1
output_neuron_count = 1

[[network.neurons]]
transfer_function = "identity"
input_function = "add"
spike_function = "none"
weights = [0.0, 0.0, 1.0]
bias_count = 1
input_synapses = [[-1, 1, 0]]

[dataset]
feature_size = 1
sequence_size = 1
inputs = [[3.0]]
labels = [[5.0]]

[settings]
learning_rate = 0.1
"#;

    #[test]
    fn test_train_reduces_error_over_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.toml");
        std::fs::write(&path, IDENTITY_REGRESSION).unwrap();

        let cmd = TrainCommand { path, epochs: 5, report_every: 0 };
        assert!(cmd.execute().is_ok());
    }
}
