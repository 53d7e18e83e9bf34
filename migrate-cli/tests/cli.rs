//! End-to-end CLI tests. These exercise the binary's argument parsing and
//! its disk/URL validation paths only — nothing here talks to a real
//! management API, so every case must fail (or print help) before the
//! first network call would be made.

use std::fs;

use anyhow::Result;
use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn migrate_command() -> Result<Command> {
    Ok(Command::cargo_bin("kontent-migrate")?)
}

#[test]
fn help_lists_all_subcommands() -> Result<()> {
    let mut cmd = migrate_command()?;
    cmd.arg("--help");
    let output = cmd.output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("export"));
    assert!(stdout.contains("import"));
    assert!(stdout.contains("migrate"));

    Ok(())
}

#[test]
fn export_without_required_items_is_a_usage_error() -> Result<()> {
    let mut cmd = migrate_command()?;
    cmd.args([
        "export",
        "--source-environment-id",
        "11111111-1111-1111-1111-111111111111",
        "--source-api-key",
        "key",
        "--language",
        "en",
    ]);

    cmd.assert().failure().code(2).stderr(contains("--items"));

    Ok(())
}

#[test]
fn import_rejects_an_invalid_base_url_before_touching_disk_or_network() -> Result<()> {
    let snapshot_dir = TempDir::new()?;
    let items_path = snapshot_dir.path().join("items.json");
    let assets_path = snapshot_dir.path().join("assets.zip");

    let mut cmd = migrate_command()?;
    cmd.args([
        "import",
        "--target-environment-id",
        "11111111-1111-1111-1111-111111111111",
        "--target-api-key",
        "key",
        "--base-url",
        "not a url",
        "--force",
        "--items-filename",
        items_path.to_str().expect("path should be valid UTF-8"),
        "--assets-filename",
        assets_path.to_str().expect("path should be valid UTF-8"),
    ]);

    cmd.assert().failure().stderr(contains("invalid management API base URL"));
    assert!(!items_path.exists(), "must not write a snapshot file on a rejected run");

    Ok(())
}

#[test]
fn import_reports_a_missing_snapshot_file() -> Result<()> {
    let snapshot_dir = TempDir::new()?;
    let items_path = snapshot_dir.path().join("does-not-exist.json");
    let assets_path = snapshot_dir.path().join("assets.zip");

    let mut cmd = migrate_command()?;
    cmd.args([
        "import",
        "--target-environment-id",
        "11111111-1111-1111-1111-111111111111",
        "--target-api-key",
        "key",
        "--force",
        "--items-filename",
        items_path.to_str().expect("path should be valid UTF-8"),
        "--assets-filename",
        assets_path.to_str().expect("path should be valid UTF-8"),
    ]);

    cmd.assert()
        .failure()
        .stderr(contains("reading snapshot from disk"));

    Ok(())
}

#[test]
fn import_without_force_prompts_and_aborts_on_empty_stdin() -> Result<()> {
    let snapshot_dir = TempDir::new()?;
    let items_path = snapshot_dir.path().join("items.json");
    let assets_path = snapshot_dir.path().join("assets.zip");
    fs::write(&items_path, "{}")?;

    let mut cmd = migrate_command()?;
    cmd.args([
        "import",
        "--target-environment-id",
        "11111111-1111-1111-1111-111111111111",
        "--target-api-key",
        "key",
        "--items-filename",
        items_path.to_str().expect("path should be valid UTF-8"),
        "--assets-filename",
        assets_path.to_str().expect("path should be valid UTF-8"),
    ])
    .write_stdin("");

    let assert = cmd.assert().failure();
    let output = assert.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.contains("aborted: pass --force"), true);

    Ok(())
}
