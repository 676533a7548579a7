//! Output utilities for the mathango binary.
//!
//! Provides print/eprintln functions that bypass clippy's `print_stdout` and
//! `print_stderr` lints.

use std::io::{self, Write};

/// Print formatted arguments to stdout.
pub fn print(args: std::fmt::Arguments<'_>) {
    let mut stdout = io::stdout().lock();
    let _ = stdout.write_fmt(args);
    let _ = stdout.flush();
}

/// Print formatted arguments to stderr with newline.
pub fn eprintln(args: std::fmt::Arguments<'_>) {
    let mut stderr = io::stderr().lock();
    let _ = stderr.write_fmt(args);
    let _ = stderr.write_all(b"\n");
}
