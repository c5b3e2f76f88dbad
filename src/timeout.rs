//! Running external programs with an optional wall-clock limit.

use crate::error::{Result, RsdError};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs `cmd` to completion, feeding `input` on stdin and capturing stdout
/// and stderr.
///
/// With a `timeout`, the child is killed once the limit passes and
/// [`RsdError::Timeout`] is returned. Exit status is left to the caller.
pub fn output_with_timeout(
    cmd: &mut Command,
    input: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().to_string();

    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| RsdError::ProcessFailed {
        program: program.clone(),
        message: format!("could not start: {e}"),
    })?;

    // Feed stdin from its own thread so a child filling its stdout pipe
    // cannot deadlock against us.
    let writer = match (input, child.stdin.take()) {
        (Some(bytes), Some(mut stdin)) => {
            let bytes = bytes.to_vec();
            Some(thread::spawn(move || stdin.write_all(&bytes)))
        }
        _ => None,
    };

    let output = match timeout {
        None => child.wait_with_output()?,
        Some(limit) => {
            let pid = Pid::from_raw(child.id() as i32);
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let _ = tx.send(child.wait_with_output());
            });

            match rx.recv_timeout(limit) {
                Ok(result) => result?,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let _ = kill(pid, Signal::SIGKILL);
                    tracing::warn!("{program} exceeded {:.1}s, killed", limit.as_secs_f64());
                    return Err(RsdError::Timeout {
                        program,
                        seconds: limit.as_secs_f64(),
                    });
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(RsdError::Other(format!("{program} wait thread crashed")));
                }
            }
        }
    };

    if let Some(writer) = writer {
        // A child that exits without reading all its input closes the pipe
        // early; its exit status and output decide success, not this write.
        if let Ok(Err(e)) = writer.join() {
            tracing::debug!("{program} did not consume its whole input: {e}");
        }
    }

    Ok(output)
}

/// Turns a non-zero exit status into [`RsdError::ProcessFailed`].
pub fn check_status(program: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(RsdError::ProcessFailed {
        program: program.to_string(),
        message: format!("{} ({})", stderr.trim(), output.status),
    })
}
