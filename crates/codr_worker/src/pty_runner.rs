//! PTY runner (C3): allocates a pseudo-terminal, spawns the wrapped argv
//! attached to it, and pumps output/input until the program exits or the
//! wall-clock deadline is hit. Runs on a dedicated OS thread — this is
//! the blocking tier of the cross-domain concurrency split described in
//! the worker loop; everything crossing into/out of it goes through the
//! explicit queues in `worker.rs`, never a shared structure.

use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use codr_protocol::{defaults, ExecutionResult, SandboxLimits};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::pty::openpty;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::cancel::CancellationToken;
use crate::sandbox::Sandbox;

/// Invoked on every chunk read from the PTY master, from the runner's OS
/// thread. The caller is responsible for bridging this back to the async
/// scheduler (§4.8 point 4 — "thread-safe coroutine submission").
pub type OnOutput<'a> = dyn FnMut(&[u8]) + 'a;

pub fn run(
    argv: &[String],
    workdir: &Path,
    limits: SandboxLimits,
    sandbox: &dyn Sandbox,
    mut on_output: impl FnMut(&[u8]),
    input_source: Receiver<Vec<u8>>,
    cancel: CancellationToken,
) -> ExecutionResult {
    match run_inner(
        argv,
        workdir,
        limits,
        sandbox,
        &mut on_output,
        input_source,
        cancel,
    ) {
        Ok(result) => result,
        Err(message) => ExecutionResult::new(-1, 0.0, String::new(), format!("Execution error: {message}")),
    }
}

fn run_inner(
    argv: &[String],
    workdir: &Path,
    limits: SandboxLimits,
    sandbox: &dyn Sandbox,
    on_output: &mut dyn FnMut(&[u8]),
    input_source: Receiver<Vec<u8>>,
    cancel: CancellationToken,
) -> Result<ExecutionResult, String> {
    let started = Instant::now();

    let pty = openpty(None, None).map_err(|e| format!("openpty failed: {e}"))?;
    set_window_size(&pty.slave)?;

    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "empty argv".to_string())?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::from(dup_fd(&pty.slave)?))
        .stdout(Stdio::from(dup_fd(&pty.slave)?))
        .stderr(Stdio::from(dup_fd(&pty.slave)?));
    sandbox.prepare(&mut command, limits);

    let mut child = command.spawn().map_err(|e| format!("spawn failed: {e}"))?;
    drop(pty.slave);

    let master_fd = pty.master.as_raw_fd();
    set_nonblocking(master_fd)?;

    let mut master_file = std::fs::File::from(pty.master);
    let mut accumulated = Vec::new();
    let mut exit_code: Option<i32> = None;
    let deadline = Duration::from_secs(limits.wall_seconds);
    let mut buf = [0u8; defaults::PTY_READ_CHUNK_BYTES];

    loop {
        if cancel.is_cancelled() {
            kill_process_group(child.id());
            break;
        }

        if started.elapsed() >= deadline {
            kill_process_group(child.id());
            break;
        }

        if let Some(code) = try_wait(&mut child) {
            drain_remaining(&mut master_file, &mut accumulated, on_output);
            exit_code = Some(code);
            break;
        }

        std::thread::sleep(Duration::from_millis(defaults::PTY_SELECT_POLL_MILLIS));

        match master_file.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                accumulated.extend_from_slice(&buf[..n]);
                on_output(&buf[..n]);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        while let Ok(bytes) = input_source.try_recv() {
            let _ = master_file.write_all(&bytes);
        }
    }

    if exit_code.is_none() {
        exit_code = Some(reap_with_grace(&mut child));
    }

    let execution_time = started.elapsed().as_secs_f64();
    let exit_code = exit_code.unwrap_or(-1);
    Ok(ExecutionResult::new(
        exit_code,
        execution_time,
        String::from_utf8_lossy(&accumulated).to_string(),
        String::new(),
    ))
}

fn dup_fd(fd: &OwnedFd) -> Result<std::fs::File, String> {
    fd.try_clone()
        .map(std::fs::File::from)
        .map_err(|e| format!("failed to duplicate pty slave: {e}"))
}

fn set_window_size(slave: &OwnedFd) -> Result<(), String> {
    let winsize = libc::winsize {
        ws_row: defaults::PTY_WINDOW_ROWS,
        ws_col: defaults::PTY_WINDOW_COLS,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let ret = unsafe { libc::ioctl(slave.as_raw_fd(), libc::TIOCSWINSZ, &winsize) };
    if ret != 0 {
        return Err(format!(
            "TIOCSWINSZ failed: {}",
            std::io::Error::last_os_error()
        ));
    }
    Ok(())
}

fn set_nonblocking(fd: RawFd) -> Result<(), String> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| e.to_string())?;
    let mut flags = OFlag::from_bits_truncate(flags);
    flags.insert(OFlag::O_NONBLOCK);
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| e.to_string())?;
    Ok(())
}

fn try_wait(child: &mut Child) -> Option<i32> {
    match child.try_wait() {
        Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
        _ => None,
    }
}

fn drain_remaining(stdout: &mut std::fs::File, accumulated: &mut Vec<u8>, on_output: &mut dyn FnMut(&[u8])) {
    let mut buf = [0u8; defaults::PTY_READ_CHUNK_BYTES];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                accumulated.extend_from_slice(&buf[..n]);
                on_output(&buf[..n]);
            }
            Err(_) => break,
        }
    }
}

fn kill_process_group(pid: u32) {
    let _ = kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL);
}

fn reap_with_grace(child: &mut Child) -> i32 {
    let pid = Pid::from_raw(child.id() as i32);
    let grace_deadline = Instant::now() + Duration::from_millis(defaults::REAP_GRACE_MILLIS);
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, signal, _)) => return 128 + signal as i32,
            _ => {
                if Instant::now() >= grace_deadline {
                    kill_process_group(child.id());
                    let _ = child.wait();
                    return -1;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::NullSandbox;
    use std::sync::mpsc;

    #[test]
    fn runs_a_trivial_program_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let limits = SandboxLimits {
            cpu_seconds: 5,
            wall_seconds: 5,
            address_space_bytes: None,
            max_fsize_bytes: 1024 * 1024,
        };
        let (_tx, rx) = mpsc::channel();
        let mut output = Vec::new();
        let result = run(
            &["/bin/echo".to_string(), "hello".to_string()],
            dir.path(),
            limits,
            &NullSandbox,
            |bytes| output.extend_from_slice(bytes),
            rx,
            CancellationToken::new(),
        );
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
    }
}
