//! Session state: the alias table and variable block a profile builds
//!
//! Replaces the host shell's ambient tables with an explicit value owned by
//! whoever initializes the session.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub name: String,
    pub expansion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub exported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    aliases: Vec<AliasEntry>,
    variables: Vec<Variable>,
    /// Inherited names unset during the session
    unset: BTreeSet<String>,
    /// Environment the session started from; read only, used for lookups
    #[serde(skip)]
    inherited: HashMap<String, String>,
}

impl SessionState {
    /// An empty session with no inherited environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inherited<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inherited: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// A session seeded from the current process environment.
    pub fn from_process_env() -> Self {
        // Entries that are not valid UTF-8 are not visible to profiles.
        Self::with_inherited(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.expansion.as_str())
    }

    /// Define an alias; a redefinition replaces the old one in place.
    pub fn set_alias(&mut self, name: &str, expansion: &str) {
        match self.aliases.iter_mut().find(|a| a.name == name) {
            Some(entry) => entry.expansion = expansion.to_string(),
            None => self.aliases.push(AliasEntry {
                name: name.to_string(),
                expansion: expansion.to_string(),
            }),
        }
    }

    pub fn remove_alias(&mut self, name: &str) -> bool {
        let before = self.aliases.len();
        self.aliases.retain(|a| a.name != name);
        self.aliases.len() != before
    }

    pub fn clear_aliases(&mut self) {
        self.aliases.clear();
    }

    /// Variables set during this session, in first-assignment order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Inherited variables unset during this session.
    pub fn unset_names(&self) -> impl Iterator<Item = &str> {
        self.unset.iter().map(String::as_str)
    }

    /// Assign a variable. Assigning never clears an existing export flag.
    pub fn set_var(&mut self, name: &str, value: &str, exported: bool) {
        self.unset.remove(name);
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(var) => {
                var.value = value.to_string();
                var.exported |= exported;
            }
            None => self.variables.push(Variable {
                name: name.to_string(),
                value: value.to_string(),
                exported,
            }),
        }
    }

    /// `export NAME` with no value. Returns false if the name is unknown.
    pub fn export(&mut self, name: &str) -> bool {
        if let Some(var) = self.variables.iter_mut().find(|v| v.name == name) {
            var.exported = true;
            return true;
        }
        if self.unset.contains(name) {
            return false;
        }
        match self.inherited.get(name).cloned() {
            Some(value) => {
                self.set_var(name, &value, true);
                true
            }
            None => false,
        }
    }

    /// Forget a session variable without shadowing the inherited one.
    pub fn remove_var(&mut self, name: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| v.name != name);
        self.variables.len() != before
    }

    pub fn unset_var(&mut self, name: &str) {
        self.variables.retain(|v| v.name != name);
        if self.inherited.contains_key(name) {
            self.unset.insert(name.to_string());
        }
    }

    /// Current value of a variable: session first, then the inherited environment.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(var) = self.variable(name) {
            return Some(&var.value);
        }
        if self.unset.contains(name) {
            return None;
        }
        self.inherited.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_redefinition_keeps_position() {
        let mut session = SessionState::new();
        session.set_alias("a", "one");
        session.set_alias("b", "two");
        session.set_alias("a", "three");
        let names: Vec<_> = session.aliases().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(session.alias("a"), Some("three"));
        assert!(session.remove_alias("a"));
        assert!(!session.remove_alias("a"));
    }

    #[test]
    fn test_variable_operations() {
        let mut session = SessionState::with_inherited([("HOME", "/home/me")]);
        assert_eq!(session.lookup("HOME"), Some("/home/me"));
        assert!(session.variables().is_empty());

        session.set_var("FOO", "bar", false);
        assert_eq!(session.lookup("FOO"), Some("bar"));
        assert!(!session.variable("FOO").unwrap().exported);

        assert!(session.export("FOO"));
        session.set_var("FOO", "baz", false);
        let foo = session.variable("FOO").unwrap();
        assert_eq!(foo.value, "baz");
        assert!(foo.exported);
    }

    #[test]
    fn test_export_inherited_and_unknown() {
        let mut session = SessionState::with_inherited([("EDITOR", "vi")]);
        assert!(session.export("EDITOR"));
        assert_eq!(session.variable("EDITOR").unwrap().value, "vi");
        assert!(!session.export("NOPE"));
    }

    #[test]
    fn test_unset_shadows_inherited() {
        let mut session = SessionState::with_inherited([("MAIL", "/var/mail/me")]);
        session.unset_var("MAIL");
        assert_eq!(session.lookup("MAIL"), None);
        assert_eq!(session.unset_names().collect::<Vec<_>>(), ["MAIL"]);

        session.set_var("MAIL", "/tmp/mail", true);
        assert_eq!(session.lookup("MAIL"), Some("/tmp/mail"));
        assert_eq!(session.unset_names().count(), 0);
    }
}
