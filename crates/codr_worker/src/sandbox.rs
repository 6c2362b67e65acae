//! Sandbox abstraction (§9 "Sandbox abstraction"). The native isolation
//! technology is consumed through this trait; swap in a real launcher
//! (firejail, nsjail, gVisor) without touching the PTY runner.

use codr_protocol::SandboxLimits;
use nix::sys::resource::{setrlimit, Resource};
use nix::unistd::setsid;
use std::os::unix::process::CommandExt;
use std::process::Command;

pub trait Sandbox: Send + Sync {
    /// Wrap `argv` for sandboxed execution, or annotate the spawned
    /// `Command` with rlimits/session isolation. Returning a modified argv
    /// mirrors the external-launcher contract (`Sandbox.wrap`); applying
    /// limits in `prepare` covers the in-process rlimit approach.
    fn wrap(&self, argv: &[String]) -> Vec<String>;

    /// Apply pre-exec isolation directly to `command` (new session, rlimits).
    fn prepare(&self, command: &mut Command, limits: SandboxLimits);
}

/// No-op sandbox for CI/unit tests. Any test asserting real containment
/// must be skipped or run against `RlimitSandbox`.
pub struct NullSandbox;

impl Sandbox for NullSandbox {
    fn wrap(&self, argv: &[String]) -> Vec<String> {
        argv.to_vec()
    }

    fn prepare(&self, _command: &mut Command, _limits: SandboxLimits) {}
}

/// Applies CPU/address-space/file-size rlimits and a fresh session via a
/// pre-exec hook. Network and IPC isolation are not attempted here — the
/// real deployment wraps `argv` with an external namespacing launcher
/// (e.g. `--net=none --nodbus`); this sandbox only covers what rlimits and
/// `setsid` can express in-process.
pub struct RlimitSandbox;

impl Sandbox for RlimitSandbox {
    fn wrap(&self, argv: &[String]) -> Vec<String> {
        argv.to_vec()
    }

    fn prepare(&self, command: &mut Command, limits: SandboxLimits) {
        unsafe {
            command.pre_exec(move || {
                setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

                setrlimit(Resource::RLIMIT_CPU, limits.cpu_seconds, limits.cpu_seconds)
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                setrlimit(
                    Resource::RLIMIT_FSIZE,
                    limits.max_fsize_bytes,
                    limits.max_fsize_bytes,
                )
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                if let Some(address_space_bytes) = limits.address_space_bytes {
                    setrlimit(Resource::RLIMIT_AS, address_space_bytes, address_space_bytes)
                        .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                }
                Ok(())
            });
        }
    }
}
