//! Container engine integration
//!
//! The orchestrator talks to the local container engine through the
//! `ContainerEngine` trait; `DockerCli` drives a docker-compatible binary.
//! Layer caching stays inside the engine — this module only invokes it and
//! surfaces the per-instruction fresh/cached signal from its output.

mod docker;
pub mod observer;
mod runtime;

pub use docker::DockerCli;
pub use runtime::ContainerEngine;

#[cfg(test)]
pub(crate) mod fake;

use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of build output for error diagnostics.
///
/// Returns the last `BUILD_ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn build_error_output(lines: &[String]) -> String {
    let total = lines.len();
    let start = total.saturating_sub(BUILD_ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Lines reach the callback as they are produced, not after the process
/// exits, so callers can classify partial output while a build is running.
/// Returns all collected output lines for error reporting. This is a
/// standalone async function (not behind `async_trait`) to avoid lifetime
/// issues with the `dyn Fn` callback.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
) -> Vec<String> {
    let stderr = child.stderr.take().expect("stderr piped");
    let stdout = child.stdout.take().expect("stdout piped");

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    all_output
}
