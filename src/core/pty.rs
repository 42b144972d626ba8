use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::ProbeError;

/// Terminal geometry and time budget for one interactive run.
#[derive(Debug, Clone)]
pub struct PtyOptions {
    pub rows: u16,
    pub cols: u16,
    pub timeout: Duration,
}

impl Default for PtyOptions {
    fn default() -> Self {
        // Wide enough that status bars are not wrapped mid-line.
        Self {
            rows: 60,
            cols: 200,
            timeout: Duration::from_secs(12),
        }
    }
}

/// Everything the child wrote to the terminal, ANSI codes included.
/// Stripping is the caller's job.
#[derive(Debug, Clone)]
pub struct PtyCapture {
    pub text: String,
    /// The overall time budget elapsed before the child went quiet on its
    /// own. Partial output was still captured.
    pub timed_out: bool,
}

/// Capability seam for running an interactive CLI, so provider parsers can be
/// exercised against captured fixture text without spawning real processes.
pub trait CommandRunner: Send + Sync {
    fn run(&self, binary: &str, send: &str, options: &PtyOptions)
        -> Result<PtyCapture, ProbeError>;
}

/// Runs a CLI attached to a real pseudo-terminal. The target tools only
/// activate their interactive/colored status output when they see a TTY.
pub struct TtyCommandRunner {
    /// Idle-output interval used to infer the tool finished responding.
    quiescence: Duration,
}

impl TtyCommandRunner {
    pub fn new() -> Self {
        Self {
            quiescence: Duration::from_millis(1200),
        }
    }

    pub fn with_quiescence(quiescence: Duration) -> Self {
        Self { quiescence }
    }
}

impl Default for TtyCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a binary exists in PATH. Returns the full path if found.
pub fn which(binary: &str) -> Option<PathBuf> {
    if binary.contains('/') {
        let path = Path::new(binary);
        return path.is_file().then(|| path.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(binary))
            .find(|p| p.is_file())
    })
}

impl CommandRunner for TtyCommandRunner {
    fn run(
        &self,
        binary: &str,
        send: &str,
        options: &PtyOptions,
    ) -> Result<PtyCapture, ProbeError> {
        // The PTY spawn path reports a missing binary as a child exec failure,
        // which is indistinguishable from ordinary output. Resolve up front so
        // "CLI not installed" surfaces as SpawnFailed, not Timeout.
        if which(binary).is_none() {
            return Err(ProbeError::SpawnFailed {
                binary: binary.to_string(),
                reason: "not found in PATH".to_string(),
            });
        }

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: options.rows,
                cols: options.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ProbeError::SpawnFailed {
                binary: binary.to_string(),
                reason: format!("openpty failed: {e}"),
            })?;

        let mut cmd = CommandBuilder::new(binary);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ProbeError::SpawnFailed {
                binary: binary.to_string(),
                reason: e.to_string(),
            })?;
        // Close our copy of the slave so reader EOF tracks the child exit.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ProbeError::SpawnFailed {
                binary: binary.to_string(),
                reason: format!("failed to open PTY reader: {e}"),
            })?;
        let writer = pair.master.take_writer().map_err(|e| ProbeError::SpawnFailed {
            binary: binary.to_string(),
            reason: format!("failed to open PTY writer: {e}"),
        })?;

        // Dedicated reader thread keeps the kernel buffer drained so the
        // child never blocks on a full terminal while we are waiting.
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let result = run_session(writer, &rx, send, options, self.quiescence, binary);

        // Release the child and descriptors on every exit path.
        let _ = child.kill();
        let _ = child.wait();
        drop(pair.master);
        let _ = reader_thread.join();

        result
    }
}

fn run_session(
    mut writer: Box<dyn Write + Send>,
    rx: &mpsc::Receiver<Vec<u8>>,
    send: &str,
    options: &PtyOptions,
    quiescence: Duration,
    binary: &str,
) -> Result<PtyCapture, ProbeError> {
    writer.write_all(send.as_bytes())?;
    writer.flush()?;

    let deadline = Instant::now() + options.timeout;
    let mut text = String::new();
    let mut timed_out = false;

    loop {
        let now = Instant::now();
        if now >= deadline {
            timed_out = true;
            break;
        }
        let wait = quiescence.min(deadline - now);

        match rx.recv_timeout(wait) {
            Ok(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
            Err(RecvTimeoutError::Disconnected) => break, // child closed its end
            Err(RecvTimeoutError::Timeout) => {
                if Instant::now() >= deadline {
                    timed_out = true;
                    break;
                }
                // Quiet after producing output: the interactive response
                // is complete. Quiet with nothing yet: keep waiting.
                if !text.is_empty() {
                    break;
                }
            }
        }
    }

    if timed_out && text.is_empty() {
        return Err(ProbeError::Timeout {
            binary: binary.to_string(),
            seconds: options.timeout.as_secs(),
        });
    }

    Ok(PtyCapture { text, timed_out })
}
