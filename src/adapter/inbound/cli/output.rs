//! Terminal output helpers shared by CLI handlers.
//!
//! Symbols and labels are colored only when stdout supports it, so piped
//! output stays plain.

use std::fmt::Display;

use owo_colors::{OwoColorize, Stream::Stdout};

/// Print a section header.
pub fn section(title: &str) {
    println!();
    println!("{}", title.if_supports_color(Stdout, |t| t.bold()));
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    println!(
        "  {:<22} {}",
        label.if_supports_color(Stdout, |l| l.dimmed()),
        value
    );
}

pub fn success(message: &str) {
    println!("  {} {message}", "✓".if_supports_color(Stdout, |s| s.green()));
}

pub fn warning(message: &str) {
    println!("  {} {message}", "⚠".if_supports_color(Stdout, |s| s.yellow()));
}

pub fn note(message: &str) {
    println!("  {}", message.if_supports_color(Stdout, |m| m.dimmed()));
}

/// Print pre-rendered multi-line content, indented to match fields.
pub fn lines(content: &str) {
    for line in content.lines() {
        println!("  {line}");
    }
}
