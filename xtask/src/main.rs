// Licensed under the Apache-2.0 license

mod tasks;

use anyhow::Result;

const USAGE: &str = "\
Usage: cargo xtask <task>

Tasks:
  ci        fmt check, clippy, tests and docs
  fmt       check formatting
  clippy    lint the driver
  test      run host tests against the simulated peripheral
  docs      build API documentation";

fn main() -> Result<()> {
    let task = std::env::args().nth(1);

    match task.as_deref() {
        Some("ci") => tasks::ci(),
        Some("fmt") => tasks::fmt_check(),
        Some("clippy") => tasks::clippy(),
        Some("test") => tasks::test(),
        Some("docs") => tasks::docs(),
        Some(other) => {
            eprintln!("{USAGE}");
            anyhow::bail!("unknown task: {other}")
        }
        None => {
            println!("{USAGE}");
            Ok(())
        }
    }
}
