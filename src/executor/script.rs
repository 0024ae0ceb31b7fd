//! Wrapper-script generation for file-output processes.
//!
//! The generated script redirects the child's stdout and stderr to its log
//! file in append mode, so the supervisor never has to hold pipes and the
//! running child always owns the live log file.

use crate::config::ProcessKey;
use crate::executor::ExecutionRequest;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory, sibling of the log files, holding the generated wrappers.
pub const WRAPPER_DIR: &str = ".procvd";

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        const SCRIPT_EXTENSION: &str = "cmd";
    } else {
        const SCRIPT_EXTENSION: &str = "sh";
    }
}

/// Replaces characters the host filesystem rejects in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_invalid_in_file_name(c) { '_' } else { c })
        .collect()
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn is_invalid_in_file_name(c: char) -> bool {
            matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
        }
    } else {
        fn is_invalid_in_file_name(c: char) -> bool {
            matches!(c, '/' | '\0')
        }
    }
}

/// Deterministic wrapper location for one process:
/// `<log dir>/.procvd/<group>.<process>.<sh|cmd>`.
pub fn wrapper_script_path(log_path: &Path, key: &ProcessKey) -> PathBuf {
    let dir = log_path.parent().unwrap_or(Path::new(".")).join(WRAPPER_DIR);
    dir.join(format!(
        "{}.{}.{SCRIPT_EXTENSION}",
        sanitize_file_name(key.group()),
        sanitize_file_name(key.process()),
    ))
}

/// Renders and writes the wrapper, marking it executable where that matters.
pub fn write_wrapper_script(request: &ExecutionRequest, log_path: &Path) -> io::Result<PathBuf> {
    let path = wrapper_script_path(log_path, &request.key);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render_script(request, log_path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Best effort; spawning fails loudly if this did not stick.
        let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o755));
    }
    Ok(path)
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn render_script(request: &ExecutionRequest, log_path: &Path) -> String {
            let log = cmd_quote(&log_path.display().to_string());
            match &request.shell_command {
                Some(command) => format!("@echo off\r\n{command} >>{log} 2>&1\r\n"),
                None => format!(
                    "@echo off\r\n{} %* >>{log} 2>&1\r\n",
                    cmd_quote(&request.program.display().to_string()),
                ),
            }
        }
    } else {
        fn render_script(request: &ExecutionRequest, log_path: &Path) -> String {
            let log = posix_quote(&log_path.display().to_string());
            match &request.shell_command {
                // The command is already a shell line; it runs verbatim with
                // the redirection in place.
                Some(command) => format!("#!/bin/sh\nexec >>{log} 2>&1\n{command}\n"),
                // exec keeps the wrapper from lingering between the
                // supervisor and the real child; "$@" forwards the
                // runtime-supplied arguments.
                None => format!(
                    "#!/bin/sh\nexec >>{log} 2>&1\nexec {} \"$@\"\n",
                    posix_quote(&request.program.display().to_string()),
                ),
            }
        }
    }
}

/// Single-quote escaping: embedded quotes become `'"'"'`.
fn posix_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

/// cmd.exe double-quote literal with `""` doubling.
#[cfg_attr(not(windows), allow(dead_code))]
fn cmd_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
