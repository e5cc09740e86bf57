//! Write a starter network/dataset file.

use clap::Args;
use log::info;
use std::path::PathBuf;

use crate::error::CliResult;

/// A small two-input regression network with a labeled sequence, the same
/// shape as the autodiff engine's own worked example.
const TEMPLATE: &str = r#"[network]
input_data_size = 2
memory_size = 0
output_neuron_count = 2

[[network.neurons]]
transfer_function = "identity"
input_function = "add"
spike_function = "none"
weights = [0.0, 0.0, 1.0, 1.0]
bias_count = 1
input_synapses = [[-1, 1, 0], [-2, 1, 0]]

[[network.neurons]]
transfer_function = "identity"
input_function = "add"
spike_function = "none"
weights = [0.0, 0.0, 1.0]
bias_count = 1
input_synapses = [[0, 1, 0]]

[[network.neurons]]
transfer_function = "identity"
input_function = "add"
spike_function = "none"
weights = [0.0, 0.0, 1.0]
bias_count = 1
input_synapses = [[0, 1, 0]]

[dataset]
feature_size = 2
sequence_size = 1
prefill_size = 0
inputs = [[1.0, 1.0]]
labels = [[5.0, 5.0]]

[settings]
learning_rate = 0.05
weight_updater = "plain"
cost_function = "squared"
"#;

/// Write a template network/dataset TOML file.
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Path to write the template to
    #[arg(default_value = "rafko.toml")]
    pub path: PathBuf,
}

impl InitCommand {
    /// Write the template, refusing to overwrite an existing file.
    pub fn execute(self) -> CliResult<()> {
        if self.path.exists() {
            return Err(crate::error::CliError::config(format!(
                "{} already exists",
                self.path.display()
            )));
        }
        std::fs::write(&self.path, TEMPLATE)?;
        info!("wrote template network file to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_parseable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.toml");
        InitCommand { path: path.clone() }.execute().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let file = crate::netfile::NetworkFile::parse(&text).unwrap();
        assert!(file.build_network().is_ok());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.toml");
        std::fs::write(&path, "existing").unwrap();
        let result = InitCommand { path }.execute();
        assert!(result.is_err());
    }
}
