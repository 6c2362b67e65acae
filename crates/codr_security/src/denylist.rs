//! Per-language denylist data, kept separate from the walkers that apply
//! it so the rules can be extended or tested without touching traversal
//! code.

/// Python builtins whose direct call is always rejected.
pub const PYTHON_BLOCKED_CALLS: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "open",
    "file",
    "__import__",
    "globals",
    "locals",
    "vars",
    "dir",
    "getattr",
    "setattr",
    "hasattr",
    "delattr",
];

/// Top-level packages that may not be imported.
pub const PYTHON_BLOCKED_MODULES: &[&str] = &[
    "os",
    "sys",
    "io",
    "pathlib",
    "glob",
    "shutil",
    "tempfile",
    "subprocess",
    "multiprocessing",
    "threading",
    "asyncio",
    "socket",
    "urllib",
    "http",
    "ftplib",
    "smtplib",
    "ssl",
    "requests",
    "importlib",
    "imp",
    "code",
    "codeop",
    "runpy",
    "ctypes",
    "pty",
    "pwd",
    "grp",
    "resource",
    "signal",
    "platform",
    "sysconfig",
    "pickle",
    "shelve",
    "marshal",
    "dill",
];

/// Dunder attribute names that remain accessible even on otherwise-banned
/// objects; everything else starting and ending with `__` is rejected.
pub const PYTHON_SAFE_DUNDERS: &[&str] = &["__str__", "__repr__", "__len__", "__init__"];

pub const JAVASCRIPT_BLOCKED_CALLS: &[&str] = &["eval", "Function", "require"];

pub const JAVASCRIPT_BLOCKED_MODULES: &[&str] = &[
    "fs",
    "child_process",
    "net",
    "dgram",
    "tls",
    "cluster",
    "vm",
    "module",
    "process",
    "os",
    "worker_threads",
];

/// Member-expression patterns rejected wherever they appear in source text.
pub const JAVASCRIPT_DANGEROUS_PATTERNS: &[&str] = &[
    "process.binding",
    "process.mainModule",
    "global.process",
    "globalThis.",
    "module.constructor",
    "this.constructor",
];

pub const C_CPP_BLOCKED_CALLS: &[&str] = &[
    "system",
    "execl", "execlp", "execle", "execv", "execvp", "execvpe",
    "popen",
    "fork",
    "vfork",
    "fopen",
    "open",
    "dlopen",
    "dlsym",
    "socket",
    "bind",
    "listen",
    "accept",
    "connect",
];

/// Include paths whose presence is enough to reject a translation unit.
pub const C_CPP_BLOCKED_INCLUDE_FRAGMENTS: &[&str] = &[
    "sys/",
    "unistd.h",
    "fcntl.h",
    "dlfcn.h",
    "netinet/",
    "arpa/",
    "netdb.h",
];

/// `use` path prefixes rejected anywhere in a Rust submission.
pub const RUST_BLOCKED_USE_PREFIXES: &[&str] = &[
    "std::fs",
    "std::io::Read",
    "std::io::Write",
    "std::path",
    "std::net",
    "std::process",
    "std::os",
    "std::env",
];

/// Attribute fragments that mark an `extern`/FFI boundary as rejected.
pub const RUST_BLOCKED_ATTRIBUTE_FRAGMENTS: &[&str] = &["no_mangle", "link"];
