//! The fixed alias table and environment every session receives

use crate::expansion::expand_str;
use crate::session::SessionState;

/// Interactive aliases, in the order they are registered.
pub const ALIASES: [(&str, &str); 11] = [
    (
        "lt",
        "exa -la --icons --color-scale --sort=modified --group --git --octal-permissions",
    ),
    ("eg", "env | grep -i"),
    ("pyb", "python3 setup.py sdist bdist_wheel"),
    ("reconf", "autoreconf -vfi"),
    ("pit", "patch -p1 -F2 --no-backup-if-mismatch"),
    ("pk", "pkill -9"),
    ("pkterm", "pkill -15"),
    ("py", "python3"),
    ("sf", "sudo -s"),
    ("sfs", "sudo -Ei"),
    ("lddt", "lddtree"),
];

/// Raw profile output for instrumented binaries: `%p` is the pid, `%m` the module hash.
pub const LLVM_PROFILE_FILE: &str = "/tmp/llvm-profile/%p-%m.profraw";

/// Executable search path. Replaces any inherited `PATH`.
pub const SEARCH_PATH: &str =
    "${HOME}/.local/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin";

/// Exported variables, in the order they are set.
pub const ENVIRONMENT: [(&str, &str); 2] = [
    ("LLVM_PROFILE_FILE", LLVM_PROFILE_FILE),
    ("PATH", SEARCH_PATH),
];

/// Register the fixed aliases and environment, overwriting earlier values.
///
/// Each entry is removed and appended again, so the fixed block always ends
/// the tables in listing order whatever the profiles did before.
pub fn register(session: &mut SessionState) {
    for (name, expansion) in ALIASES {
        session.remove_alias(name);
        session.set_alias(name, expansion);
    }
    for (name, template) in ENVIRONMENT {
        let value = expand_str(template, session);
        session.remove_var(name);
        session.set_var(name, &value, true);
    }
    tracing::debug!(
        aliases = ALIASES.len(),
        variables = ENVIRONMENT.len(),
        "Registered session defaults"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alias_names_are_unique() {
        let names: HashSet<_> = ALIASES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), ALIASES.len());
    }

    #[test]
    fn fixed_block_moves_to_the_end() {
        let mut session = SessionState::new();
        register(&mut session);
        session.remove_alias("lt");
        session.set_alias("ll", "ls -l");
        session.set_var("PATH", "/bin", false);
        session.set_var("EDITOR", "vi", true);

        register(&mut session);

        let names: Vec<_> = session.aliases().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names[0], "ll");
        assert_eq!(names[1..], ALIASES.map(|(name, _)| name));
        let vars: Vec<_> = session.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vars, ["EDITOR", "LLVM_PROFILE_FILE", "PATH"]);
    }

    #[test]
    fn llvm_template_keeps_placeholders() {
        let mut session = SessionState::with_inherited([("HOME", "/root")]);
        register(&mut session);
        assert_eq!(session.lookup("LLVM_PROFILE_FILE"), Some(LLVM_PROFILE_FILE));
        assert_eq!(
            session.lookup("PATH"),
            Some("/root/.local/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin")
        );
    }
}
