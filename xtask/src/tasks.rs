// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use std::process::Command;

/// Features enabled for host-side runs.
const HOST_FEATURES: &str = "sim";

fn cargo(args: &[&str]) -> Result<()> {
    println!("$ cargo {}", args.join(" "));

    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("cargo {} failed: {}", args.join(" "), status);
    }
    Ok(())
}

/// Check formatting without rewriting files
pub fn fmt_check() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])
}

/// Clippy over the driver with the simulator compiled in
pub fn clippy() -> Result<()> {
    cargo(&[
        "clippy",
        "-p",
        "avr-twi-ddk",
        "--features",
        HOST_FEATURES,
        "--",
        "-D",
        "warnings",
    ])
}

/// Unit, property and functional tests against the simulated peripheral
pub fn test() -> Result<()> {
    cargo(&["test", "-p", "avr-twi-ddk", "--features", HOST_FEATURES])
}

/// Build the API documentation
pub fn docs() -> Result<()> {
    cargo(&[
        "doc",
        "-p",
        "avr-twi-ddk",
        "--no-deps",
        "--features",
        HOST_FEATURES,
    ])
}

/// Everything a change must pass before merging
pub fn ci() -> Result<()> {
    fmt_check()?;
    clippy()?;
    test()?;
    docs()?;
    println!("✅ All checks passed");
    Ok(())
}
