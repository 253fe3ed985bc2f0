//! Environment detection utilities.

use std::io::IsTerminal;

/// Check if stdout is a TTY.
#[must_use]
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a TTY.
#[must_use]
pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Check if color should be enabled for a stream.
///
/// Honors the `--no-color` flag, `NO_COLOR`, and `TERM=dumb`, then falls
/// back to whether the stream is a terminal.
#[must_use]
pub fn color_allowed(no_color_flag: bool, is_tty: bool) -> bool {
    if no_color_flag {
        return false;
    }

    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }

    is_tty
}

/// Check if color should be enabled on stdout.
#[must_use]
pub fn should_use_color(no_color_flag: bool) -> bool {
    color_allowed(no_color_flag, stdout_is_tty())
}
