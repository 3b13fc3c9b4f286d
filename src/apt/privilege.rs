use std::process::Command;

use crate::error::{Error, Result};
use crate::types::CommandResult;

pub(crate) fn run_privileged_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    let output = Command::new("pkexec")
        .arg(program)
        .args(args)
        .output()
        .map_err(|source| Error::Launch {
            program: "pkexec".to_string(),
            source,
        })?;

    Ok(CommandResult {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
