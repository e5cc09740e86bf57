use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn init_writes_a_parseable_network_file() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("net.toml");

    let mut init = Command::cargo_bin("rafko")?;
    init.args(["init", path.to_str().unwrap()]);
    init.assert().success();
    assert!(path.exists());

    let mut inspect = Command::cargo_bin("rafko")?;
    inspect.args(["inspect", path.to_str().unwrap()]);
    inspect.assert().success().stdout(predicate::str::contains("neurons:"));

    Ok(())
}

#[test]
fn train_reports_final_fitness() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("net.toml");

    Command::cargo_bin("rafko")?.args(["init", path.to_str().unwrap()]).assert().success();

    let mut train = Command::cargo_bin("rafko")?;
    train.args(["train", path.to_str().unwrap(), "--epochs", "3"]);
    train.assert().success().stdout(predicate::str::contains("final fitness"));

    Ok(())
}

#[test]
fn inspect_solve_prints_output_vector() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("net.toml");

    Command::cargo_bin("rafko")?.args(["init", path.to_str().unwrap()]).assert().success();

    let mut inspect = Command::cargo_bin("rafko")?;
    inspect.args(["inspect", path.to_str().unwrap(), "--solve", "1.0,2.0", "--reset"]);
    inspect.assert().success();

    Ok(())
}
