//! Plain prefixed console output for messages outside an interactive session

use colored::Colorize;
use std::fmt::Display;

const PREFIX: &str = "scaffold";
const SEP: &str = "·";

fn prefix() -> String {
    format!("{} {}", PREFIX.dimmed(), SEP.dimmed())
}

/// Non-fatal problem on stderr
pub fn warn(message: impl Display) {
    eprintln!();
    eprintln!("  {} {}", prefix(), message.to_string().yellow());
    eprintln!();
}

/// Print an error and exit with status 1
pub fn fatal(message: impl Display) -> ! {
    eprintln!();
    eprintln!("  {} {}", prefix(), message.to_string().red());
    eprintln!();
    std::process::exit(1);
}

/// Indent every line of a multi-line message by three spaces
pub fn indent(message: &str) -> String {
    message
        .lines()
        .map(|line| format!("   {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
