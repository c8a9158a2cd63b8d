//! Synchronous subprocess invocation: spawn, wait, report the exit status.
//!
//! The update itself shells out to nothing. These are for post-publish hooks
//! such as mirroring `var/<version>` to another host.

use crate::error::CommandError;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Run `program` with `args` (stdout and stderr inherited) and wait for it to exit.
pub fn run_status(program: &str, args: &[&str]) -> Result<ExitStatus, CommandError> {
    debug!(program, ?args, "spawning command");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })
}

/// Like [`run_status`], but a non-zero exit is an error naming the command line.
pub fn run_checked(program: &str, args: &[&str]) -> Result<(), CommandError> {
    let status = run_status(program, args)?;
    if status.success() {
        return Ok(());
    }
    Err(CommandError::Failed {
        command: command_line(program, args),
        status,
    })
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(|a| format!("{a:?}"))
        .collect::<Vec<_>>()
        .join(" ")
}
