//! Abstract Syntax Tree for shell profiles
//!
//! Only the constructs a profile loader cares about are modelled in detail.
//! Loops, functions, `case` and subshells are kept as opaque statements.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// One or more assignments with no command: `A=1 B=2`
    Assignment(Vec<Assignment>),
    /// Simple command: `[prefix assignments] name args... [redirections]`
    Command(Command),
    /// `first && second || third ...`
    List(CommandList),
    /// `if ...; then ...; [elif ...;] [else ...;] fi`
    If(IfStatement),
    /// Parsed but never evaluated
    Opaque(OpaqueKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub prefix: Vec<Assignment>,
    pub name: Word,
    pub args: Vec<Word>,
    pub redirections: Vec<Redirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redirection {
    pub op: String,
    pub target: Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandList {
    pub first: Box<Statement>,
    pub rest: Vec<(ListOp, Statement)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Box<Statement>,
    pub then_body: Vec<Statement>,
    pub elif_clauses: Vec<ElifClause>,
    pub else_body: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElifClause {
    pub condition: Statement,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpaqueKind {
    Loop,
    /// An `if` whose body could not be parsed statement by statement
    Conditional,
    Case,
    Subshell,
    BraceGroup,
    Function(String),
    Pipeline,
    Background,
}

impl fmt::Display for OpaqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loop => write!(f, "loop"),
            Self::Conditional => write!(f, "if block"),
            Self::Case => write!(f, "case"),
            Self::Subshell => write!(f, "subshell"),
            Self::BraceGroup => write!(f, "brace group"),
            Self::Function(name) => write!(f, "function {name}"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::Background => write!(f, "background job"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordPart {
    Literal(String),
    SingleQuoted(String),
    DoubleQuoted(String),
}

impl Word {
    pub fn literal(s: &str) -> Self {
        Word {
            parts: vec![WordPart::Literal(s.to_string())],
        }
    }

    pub fn empty() -> Self {
        Word { parts: vec![] }
    }

    /// The word's text if it contains nothing that expansion would change.
    pub fn static_text(&self) -> Option<String> {
        let mut text = String::new();
        for part in &self.parts {
            match part {
                WordPart::SingleQuoted(s) => text.push_str(s),
                WordPart::Literal(s) | WordPart::DoubleQuoted(s) => {
                    if s.contains('$') || s.contains('`') {
                        return None;
                    }
                    text.push_str(s);
                }
            }
        }
        Some(text)
    }

    /// True if expanding this word would run a command (`$(...)` or backticks).
    pub fn has_command_substitution(&self) -> bool {
        self.parts.iter().any(|part| match part {
            WordPart::SingleQuoted(_) => false,
            WordPart::Literal(s) | WordPart::DoubleQuoted(s) => {
                s.contains("$(") || s.contains('`')
            }
        })
    }

    /// Split `NAME=value` into an assignment, if the word has that shape.
    pub fn split_assignment(&self) -> Option<Assignment> {
        self.split_definition(is_valid_name)
    }

    /// Split an `alias` argument `name=value`. Alias names are looser than
    /// variable names: `..` and `l.` are accepted.
    pub fn split_alias(&self) -> Option<Assignment> {
        self.split_definition(is_valid_alias_name)
    }

    fn split_definition(&self, valid: fn(&str) -> bool) -> Option<Assignment> {
        let (first, rest) = self.parts.split_first()?;
        let WordPart::Literal(head) = first else {
            return None;
        };
        let (name, value_head) = head.split_once('=')?;
        if !valid(name) {
            return None;
        }

        let mut parts = Vec::with_capacity(self.parts.len());
        if !value_head.is_empty() {
            parts.push(WordPart::Literal(value_head.to_string()));
        }
        parts.extend(rest.iter().cloned());

        Some(Assignment {
            name: name.to_string(),
            value: Word { parts },
        })
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                WordPart::Literal(s) => write!(f, "{s}")?,
                WordPart::SingleQuoted(s) => write!(f, "'{s}'")?,
                WordPart::DoubleQuoted(s) => write!(f, "\"{s}\"")?,
            }
        }
        Ok(())
    }
}

/// Shell variable / alias name: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Alias name: anything but blanks, `/`, quotes, `$`, `=` and backslash.
pub fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '$' | '=' | '\'' | '"' | '`' | '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_assignment_with_quoted_value() {
        let word = Word {
            parts: vec![
                WordPart::Literal("lt=".to_string()),
                WordPart::SingleQuoted("exa -la".to_string()),
            ],
        };
        let assignment = word.split_assignment().unwrap();
        assert_eq!(assignment.name, "lt");
        assert_eq!(
            assignment.value.parts,
            vec![WordPart::SingleQuoted("exa -la".to_string())]
        );
    }

    #[test]
    fn split_assignment_rejects_non_names() {
        assert!(Word::literal("--sort=modified").split_assignment().is_none());
        assert!(Word::literal("plain").split_assignment().is_none());
        let empty = Word::literal("EMPTY=").split_assignment().unwrap();
        assert_eq!(empty.value, Word::empty());
    }

    #[test]
    fn alias_names_are_looser_than_variable_names() {
        let word = Word {
            parts: vec![
                WordPart::Literal("..=".to_string()),
                WordPart::SingleQuoted("cd ..".to_string()),
            ],
        };
        assert!(word.split_assignment().is_none());
        assert_eq!(word.split_alias().unwrap().name, "..");
        assert_eq!(Word::literal("l.=ls").split_alias().unwrap().name, "l.");
        assert!(Word::literal("a/b=x").split_alias().is_none());
        assert!(Word::literal("=x").split_alias().is_none());
    }

    #[test]
    fn static_text_stops_at_expansions() {
        assert_eq!(Word::literal("-f").static_text().as_deref(), Some("-f"));
        assert_eq!(Word::literal("$HOME").static_text(), None);
        let quoted = Word {
            parts: vec![WordPart::SingleQuoted("$HOME".to_string())],
        };
        assert_eq!(quoted.static_text().as_deref(), Some("$HOME"));
    }

    #[test]
    fn command_substitution_detection() {
        assert!(Word::literal("$(uname)").has_command_substitution());
        assert!(!Word::literal("${HOME}").has_command_substitution());
    }
}
