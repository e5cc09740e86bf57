//! Report a network file's structure, or run one forward solve through it.

use clap::Args;
use std::path::PathBuf;

use rafko_gym::GraphBuilder;

use crate::error::CliResult;
use crate::netfile::NetworkFile;

/// Load a network file and either print a structural summary or solve one
/// input through it.
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Path to a network file
    pub path: PathBuf,

    /// Solve this input vector through the network instead of summarizing it
    #[arg(long, value_delimiter = ',')]
    pub solve: Option<Vec<f64>>,

    /// Reset neuron memory before solving (only meaningful with `--solve`)
    #[arg(long)]
    pub reset: bool,
}

impl InspectCommand {
    /// Print a structural summary, or solve `--solve` through the network.
    pub fn execute(self) -> CliResult<()> {
        let text = std::fs::read_to_string(&self.path)?;
        let file = NetworkFile::parse(&text)?;
        let network = file.build_network()?;
        let graph = GraphBuilder::new(&network).build()?;

        if let Some(input) = self.solve {
            let mut solver = rafko_gym::Solver::new(&network, &graph, network.memory_size() + 1);
            let output = solver.solve(&input, self.reset);
            println!("{:?}", output);
            return Ok(());
        }

        println!("neurons:           {}", network.neurons().len());
        println!("weights:           {}", network.weight_table().len());
        println!("input_data_size:   {}", network.input_data_size());
        println!("memory_size:       {}", network.memory_size());
        println!("output_neurons:    {:?}", network.output_range());
        println!("operations:        {}", graph.operations().len());
        println!("weight_relevant_ops: {}", graph.weight_relevant_operation_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str = r#"
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
"#;

    #[test]
    fn test_inspect_summary_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.toml");
        std::fs::write(&path, IDENTITY).unwrap();
        assert!(InspectCommand { path, solve: None, reset: false }.execute().is_ok());
    }

    #[test]
    fn test_inspect_solve_matches_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.toml");
        std::fs::write(&path, IDENTITY).unwrap();
        assert!(InspectCommand { path, solve: Some(vec![4.0]), reset: true }.execute().is_ok());
    }
}
