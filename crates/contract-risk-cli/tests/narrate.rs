use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("contract-risk").unwrap();
    for key in [
        "CONTRACT_RISK_PROVIDER",
        "CONTRACT_RISK_API_KEY",
        "CONTRACT_RISK_ENDPOINT",
        "CONTRACT_RISK_MODEL",
        "CONTRACT_RISK_TIMEOUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn noop_provider_uses_fallback_narrative() {
    cli()
        .env("CONTRACT_RISK_PROVIDER", "noop")
        .arg("narrate")
        .write_stdin("1. The Client may terminate this agreement at any time.")
        .assert()
        .success()
        .stdout(predicate::str::contains("Note: live analysis unavailable"))
        .stdout(predicate::str::contains("Contract Type: Service Agreement"))
        .stdout(predicate::str::contains("Renegotiation Suggestions:"));
}

#[test]
fn missing_api_key_degrades_instead_of_failing() {
    cli()
        .args(["narrate", "--json"])
        .write_stdin("1. The Client may terminate this agreement at any time.")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"fallback\""))
        .stdout(predicate::str::contains("CONTRACT_RISK_API_KEY"));
}

#[test]
fn provider_from_config_file() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(file.path(), "[llm]\nprovider = \"noop\"\nmodel = \"config-model\"\n").unwrap();

    cli()
        .args(["--config", file.path().to_str().unwrap(), "narrate"])
        .write_stdin("1. Payment is due within thirty days of invoice.")
        .assert()
        .success()
        .stdout(predicate::str::contains("does not issue requests"));
}

#[test]
fn unknown_provider_is_rejected() {
    cli()
        .env("CONTRACT_RISK_PROVIDER", "carrier-pigeon")
        .arg("narrate")
        .write_stdin("1. Payment is due within thirty days of invoice.")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported narrative provider"));
}

#[test]
fn blank_input_skips_request() {
    cli()
        .env("CONTRACT_RISK_PROVIDER", "noop")
        .arg("narrate")
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No contract text found"));
}
