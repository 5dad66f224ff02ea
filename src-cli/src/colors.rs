//! Terminal color support for CLI output.
//!
//! Colors are used only when the stream is a terminal, so piped output
//! stays plain.

use castkit_common::CapabilityFlags;
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Pad a string to a minimum width (left-aligned), then apply a color function.
/// Padding happens before colorizing so ANSI escapes don't skew alignment.
pub fn pad_left<F>(msg: &str, width: usize, color_fn: F) -> String
where
    F: FnOnce(&str) -> String,
{
    let padded = format!("{:<width$}", msg);
    color_fn(&padded)
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal()
}

pub fn is_stderr_interactive() -> bool {
    std::io::stderr().is_terminal()
}

pub fn error(msg: &str) -> String {
    if is_stderr_interactive() {
        format!("{} {}", "error:".red().bold(), msg)
    } else {
        format!("error: {}", msg)
    }
}

pub fn warning(msg: &str) -> String {
    if is_interactive() {
        format!("{} {}", "warning:".yellow().bold(), msg)
    } else {
        format!("warning: {}", msg)
    }
}

pub fn success(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.green())
    } else {
        msg.to_string()
    }
}

pub fn dim(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.dimmed())
    } else {
        msg.to_string()
    }
}

pub fn bold(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.bold())
    } else {
        msg.to_string()
    }
}

pub fn header(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.bold().blue())
    } else {
        msg.to_string()
    }
}

pub fn path(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.underline())
    } else {
        msg.to_string()
    }
}

/// Style for numeric identifiers.
pub fn number(msg: &str) -> String {
    if is_interactive() {
        format!("{}", msg.cyan())
    } else {
        msg.to_string()
    }
}

/// Comma-separated tags for the set flags, with caution tags in yellow.
pub fn flags(flags: CapabilityFlags) -> String {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |set: bool, tag: &str, caution: bool| {
        if !set {
            return;
        }
        if caution && is_interactive() {
            tags.push(format!("{}", tag.yellow()));
        } else {
            tags.push(tag.to_string());
        }
    };
    push(flags.widely_supported, "widely-supported", false);
    push(flags.supports_video, "video", false);
    push(flags.audio_only_capable, "audio-only", false);
    push(flags.limited_support, "limited", true);
    push(flags.legacy, "legacy", true);
    push(flags.requires_elevated_permission, "elevated", true);

    if tags.is_empty() {
        dim("-")
    } else {
        tags.join(", ")
    }
}
