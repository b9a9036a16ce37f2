//! External command execution.
//!
//! Builder-based API for running a compiler process with its source piped
//! on stdin. Unlike a build tool, a non-zero exit is not an error here: the
//! caller inspects the status itself, since that is how compilers report
//! diagnostics.
//!
//! With [`Cmd::timeout`] the child is killed and reaped once the limit
//! passes, and `output` fails with [`io::ErrorKind::TimedOut`].
//!
//! # Example
//!
//! ```ignore
//! let output = Cmd::new("sass")
//!     .args(["--stdin", "--no-source-map"])
//!     .stdin(source)
//!     .output()?;
//! ```

use std::{
    ffi::{OsStr, OsString},
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    sync::LazyLock,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use regex::Regex;

static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"));

/// How often a child with a deadline is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin_data: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument, exactly as given (empty strings included).
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Kill the process if it has not exited after `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Run to completion and collect stdout/stderr, whatever the exit status.
    ///
    /// Fails when the process cannot be spawned or waited on, or outlives
    /// its timeout.
    pub fn output(self) -> io::Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        // Feed stdin from a separate thread so a child filling its stdout
        // pipe cannot deadlock against us
        let writer = match (child.stdin.take(), self.stdin_data) {
            (Some(mut stdin), Some(data)) => Some(std::thread::spawn(move || {
                // A compiler exiting early closes the pipe; its status says why
                let _ = stdin.write_all(&data);
            })),
            _ => None,
        };

        let output = match self.timeout {
            Some(limit) => wait_with_deadline(child, limit)?,
            None => child.wait_with_output()?,
        };
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        Ok(output)
    }
}

/// Like `Child::wait_with_output`, but kills the child after `limit`.
fn wait_with_deadline(mut child: Child, limit: Duration) -> io::Result<Output> {
    let stdout = child.stdout.take().map(read_in_background);
    let stderr = child.stderr.take().map(read_in_background);

    let deadline = Instant::now() + limit;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            child.wait()?;
            // Readers finish on their own once every pipe writer is gone
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("killed after {}ms", limit.as_millis()),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn read_in_background<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Strip ANSI color codes (compilers color their diagnostics on a TTY).
pub fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}
