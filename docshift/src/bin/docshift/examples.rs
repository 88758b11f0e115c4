use std::fmt::Write;

use clap::builder::styling::{AnsiColor, Style};

use crate::commands::{counter, resolve, status};

pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

const HEADING: Style = AnsiColor::Cyan.on_default().bold();
const TITLE: Style = AnsiColor::BrightBlue.on_default().bold();
const COMMAND: Style = AnsiColor::Magenta.on_default();

/// Subcommand name and the examples appended to its `--help`.
pub fn command_examples() -> [(&'static str, &'static [ExampleGroup]); 3] {
    [
        ("resolve", resolve::EXAMPLES),
        ("status", status::EXAMPLES),
        ("counter", counter::EXAMPLES),
    ]
}

/// Clap strips the styling when colour is off.
pub fn render(groups: &[ExampleGroup]) -> String {
    let mut out = format!("{HEADING}Examples:{HEADING:#}\n");
    for group in groups {
        let _ = writeln!(out, "  {TITLE}{}{TITLE:#}", group.title);
        for command in group.commands {
            let _ = writeln!(out, "    {COMMAND}{command}{COMMAND:#}");
        }
    }
    out
}
