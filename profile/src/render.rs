//! Render a session as a script for the host shell to `eval`

use crate::session::SessionState;
use envboot_config::ShellKind;
use std::fmt::Write;

pub fn render(session: &SessionState, shell: ShellKind) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "# envboot session ({shell})");

    for name in session.unset_names() {
        let _ = match shell {
            ShellKind::Fish => writeln!(out, "set -e {name}"),
            _ => writeln!(out, "unset {name}"),
        };
    }

    for var in session.variables() {
        let _ = if shell.is_posix() {
            if var.exported {
                writeln!(out, "export {}={}", var.name, posix_quote(&var.value))
            } else {
                writeln!(out, "{}={}", var.name, posix_quote(&var.value))
            }
        } else {
            let scope = if var.exported { "-gx" } else { "-g" };
            writeln!(out, "set {scope} {} {}", var.name, fish_value(&var.name, &var.value))
        };
    }

    for alias in session.aliases() {
        let _ = if shell.is_posix() {
            writeln!(out, "alias {}={}", alias.name, posix_quote(&alias.expansion))
        } else {
            writeln!(out, "alias {} {}", alias.name, fish_quote(&alias.expansion))
        };
    }

    out
}

/// Single-quote for POSIX shells: `it's` -> `'it'\''s'`
pub fn posix_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Single-quote for fish, where `\` and `'` are escaped inside the quotes.
pub fn fish_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
}

/// fish keeps `*PATH` variables as lists, one element per directory.
fn fish_value(name: &str, value: &str) -> String {
    if name.ends_with("PATH") && value.contains(':') {
        value
            .split(':')
            .map(fish_quote)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        fish_quote(value)
    }
}
