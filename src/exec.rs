//! Subprocess invocation with a per-call timeout and an accepted
//! exit-code set. Every external `git`/`diff` call goes through here.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Captured result of a finished process.
#[derive(Debug)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args...` inside `dir`.
///
/// `timeout_secs == 0` waits forever. The call fails with [`Error::Vcs`]
/// when the exit code is not in `allowed_codes` (or the process died from
/// a signal), and with [`Error::Timeout`] after killing a process that
/// exceeded its budget.
pub fn run(
    dir: &Path,
    program: &str,
    args: &[String],
    timeout_secs: u64,
    allowed_codes: &[i32],
) -> Result<ExecOutput> {
    debug!(program, ?args, dir = %dir.display(), "exec");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                Error::Prerequisite(format!("'{program}' executable not found in PATH"))
            }
            _ => Error::Io(e),
        })?;

    // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait(&mut child, timeout_secs)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            warn!(program, ?args, timeout_secs, "process timed out");
            return Err(Error::Timeout {
                args: args.to_vec(),
                secs: timeout_secs,
            });
        }
    };

    let stdout = join(stdout)?;
    let stderr = join(stderr)?;

    match status.code() {
        Some(code) if allowed_codes.contains(&code) => Ok(ExecOutput {
            code,
            stdout,
            stderr,
        }),
        code => Err(Error::Vcs {
            args: args.to_vec(),
            code,
            stderr: stderr.trim().to_string(),
        }),
    }
}

/// Wait for the child; `None` means the deadline passed first.
fn wait(child: &mut Child, timeout_secs: u64) -> Result<Option<ExitStatus>> {
    if timeout_secs == 0 {
        return Ok(Some(child.wait()?));
    }
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<String> {
    let bytes = handle
        .join()
        .map_err(|_| Error::TaskFailure("pipe reader thread panicked".to_string()))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod tests;
