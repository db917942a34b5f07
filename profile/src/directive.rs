//! Directives: the effects of a profile, lowered from its AST
//!
//! Sourcing a profile in a real shell mutates the shell's own alias and
//! variable tables. Here the file is reduced to an ordered list of
//! directives which [`crate::ProfileLoader`] applies to a [`SessionState`].

use crate::ast::*;
use crate::expansion::expand_word;
use crate::session::SessionState;
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Directive {
    Alias { name: String, expansion: Word },
    Unalias { name: String },
    UnaliasAll,
    Assign { name: String, value: Word, exported: bool },
    /// `export NAME` with no value
    Export { name: String },
    Unset { name: String },
    Source { path: Word },
    /// Words expanded only for their side effects: `: ${EDITOR:=vi}`
    Expand(Vec<Word>),
    Conditional {
        test: Test,
        then: Vec<Directive>,
        otherwise: Vec<Directive>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileTest {
    /// -e
    Exists,
    /// -f
    Regular,
    /// -d
    Directory,
    /// -r
    Readable,
    /// -s
    NonEmpty,
}

impl FileTest {
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-e" | "-a" => Some(Self::Exists),
            "-f" => Some(Self::Regular),
            "-d" => Some(Self::Directory),
            "-r" => Some(Self::Readable),
            "-s" => Some(Self::NonEmpty),
            _ => None,
        }
    }

    pub fn check(self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        match self {
            Self::Exists => true,
            Self::Regular => meta.is_file(),
            Self::Directory => meta.is_dir(),
            Self::NonEmpty => meta.len() > 0,
            Self::Readable => {
                if meta.is_dir() {
                    std::fs::read_dir(path).is_ok()
                } else {
                    std::fs::File::open(path).is_ok()
                }
            }
        }
    }
}

/// Conditions a profile may branch on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Test {
    File { kind: FileTest, path: Word },
    NonEmpty(Word),
    Empty(Word),
    Equal(Word, Word),
    NotEqual(Word, Word),
    Not(Box<Test>),
    /// `true` / `false` / `:`
    Constant(bool),
}

impl Test {
    pub fn evaluate(&self, session: &mut SessionState) -> bool {
        match self {
            Test::File { kind, path } => {
                let path = expand_word(path, session);
                kind.check(Path::new(&path))
            }
            Test::NonEmpty(word) => !expand_word(word, session).is_empty(),
            Test::Empty(word) => expand_word(word, session).is_empty(),
            Test::Equal(a, b) => expand_word(a, session) == expand_word(b, session),
            Test::NotEqual(a, b) => expand_word(a, session) != expand_word(b, session),
            Test::Not(inner) => !inner.evaluate(session),
            Test::Constant(value) => *value,
        }
    }
}

/// Directives from one profile, plus how many statements had no directive form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedDirectives {
    pub directives: Vec<Directive>,
    pub skipped: usize,
}

/// Parse profile text into directives.
pub fn parse_directives(input: &str) -> Result<ParsedDirectives, String> {
    let script = crate::parser::parse(input).map_err(|errs| {
        errs.into_iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    })?;
    Ok(lower(&script))
}

/// Lower a parsed script into directives.
pub fn lower(script: &Script) -> ParsedDirectives {
    let mut lowerer = Lowerer::default();
    let directives = lowerer.statements(&script.statements);
    ParsedDirectives {
        directives,
        skipped: lowerer.skipped,
    }
}

/// What one element of an and-or list contributes.
enum Element {
    Test(Test),
    Effects(Vec<Directive>),
}

#[derive(Default)]
struct Lowerer {
    skipped: usize,
}

impl Lowerer {
    fn statements(&mut self, statements: &[Statement]) -> Vec<Directive> {
        statements
            .iter()
            .flat_map(|stmt| self.statement(stmt))
            .collect()
    }

    fn statement(&mut self, stmt: &Statement) -> Vec<Directive> {
        match stmt {
            Statement::Assignment(assignments) => self.assignments(assignments),
            Statement::Command(cmd) => match self.command(cmd) {
                Some(directives) => directives,
                None => self.skip(stmt),
            },
            Statement::List(list) => self.list(list).unwrap_or_else(|| self.skip(stmt)),
            Statement::If(if_stmt) => self.if_statement(if_stmt).unwrap_or_else(|| self.skip(stmt)),
            Statement::Opaque(_) => self.skip(stmt),
        }
    }

    fn skip(&mut self, stmt: &Statement) -> Vec<Directive> {
        self.skipped += 1;
        match stmt {
            Statement::Command(cmd) => tracing::debug!(command = %cmd.name, "Skipping unsupported command"),
            Statement::Opaque(kind) => tracing::debug!(%kind, "Skipping compound command"),
            _ => tracing::debug!("Skipping statement with unsupported condition"),
        }
        Vec::new()
    }

    fn assignments(&mut self, assignments: &[Assignment]) -> Vec<Directive> {
        let mut out = Vec::with_capacity(assignments.len());
        for a in assignments {
            if a.value.has_command_substitution() {
                tracing::debug!(name = %a.name, "Skipping assignment with command substitution");
                self.skipped += 1;
                continue;
            }
            out.push(Directive::Assign {
                name: a.name.clone(),
                value: a.value.clone(),
                exported: false,
            });
        }
        out
    }

    /// Directives for a simple command, or `None` if it has no directive form.
    fn command(&mut self, cmd: &Command) -> Option<Vec<Directive>> {
        if !cmd.prefix.is_empty() {
            return None;
        }
        let name = cmd.name.static_text()?;
        let args = &cmd.args;

        let directives = match name.as_str() {
            "alias" => args
                .iter()
                .filter_map(Word::split_alias)
                .map(|a| Directive::Alias {
                    name: a.name,
                    expansion: a.value,
                })
                .collect(),
            "unalias" => {
                let names = static_args(args)?;
                if names.iter().any(|n| n == "-a") {
                    vec![Directive::UnaliasAll]
                } else {
                    names
                        .into_iter()
                        .map(|name| Directive::Unalias { name })
                        .collect()
                }
            }
            "export" | "readonly" => {
                let exported = name == "export";
                let mut out = Vec::new();
                for arg in args {
                    if let Some(a) = arg.split_assignment() {
                        if a.value.has_command_substitution() {
                            self.skipped += 1;
                            continue;
                        }
                        out.push(Directive::Assign {
                            name: a.name,
                            value: a.value,
                            exported,
                        });
                    } else {
                        let flag_or_name = arg.static_text()?;
                        match flag_or_name.strip_prefix('-') {
                            // `export -n` removes the export attribute
                            Some(flags) if flags.contains('n') => return None,
                            Some(_) => {}
                            // `readonly NAME` only locks the current value
                            None if !exported => {}
                            None => out.push(Directive::Export {
                                name: flag_or_name,
                            }),
                        }
                    }
                }
                out
            }
            "unset" => {
                let names = static_args(args)?;
                if names.iter().any(|n| n == "-f") {
                    return None;
                }
                names
                    .into_iter()
                    .filter(|n| !n.starts_with('-'))
                    .map(|name| Directive::Unset { name })
                    .collect()
            }
            "." | "source" => vec![Directive::Source {
                path: args.first()?.clone(),
            }],
            ":" if args.iter().any(|a| a.static_text().is_none()) => {
                if args.iter().any(Word::has_command_substitution) {
                    return None;
                }
                vec![Directive::Expand(args.clone())]
            }
            ":" | "true" | "false" => Vec::new(),
            _ => return None,
        };
        Some(directives)
    }

    fn element(&mut self, stmt: &Statement) -> Option<Element> {
        if let Some(test) = condition(stmt) {
            return Some(Element::Test(test));
        }
        match stmt {
            Statement::Assignment(assignments) => Some(Element::Effects(self.assignments(assignments))),
            Statement::Command(cmd) => self.command(cmd).map(Element::Effects),
            Statement::If(if_stmt) => self.if_statement(if_stmt).map(Element::Effects),
            _ => None,
        }
    }

    fn list(&mut self, list: &CommandList) -> Option<Vec<Directive>> {
        let mut elements = Vec::with_capacity(list.rest.len() + 1);
        elements.push((ListOp::And, self.element(&list.first)?));
        for (op, stmt) in &list.rest {
            elements.push((*op, self.element(stmt)?));
        }
        Some(lower_chain(true, &elements))
    }

    fn if_statement(&mut self, stmt: &IfStatement) -> Option<Vec<Directive>> {
        let test = condition(&stmt.condition)?;
        let then = self.statements(&stmt.then_body);

        let mut otherwise = stmt
            .else_body
            .as_ref()
            .map(|body| self.statements(body))
            .unwrap_or_default();
        for clause in stmt.elif_clauses.iter().rev() {
            let test = condition(&clause.condition)?;
            otherwise = vec![Directive::Conditional {
                test,
                then: self.statements(&clause.body),
                otherwise,
            }];
        }

        Some(vec![Directive::Conditional {
            test,
            then,
            otherwise,
        }])
    }
}

/// Lower the remainder of an and-or list given the status of what ran before.
/// Effects are assumed to succeed; only tests branch.
fn lower_chain(status: bool, rest: &[(ListOp, Element)]) -> Vec<Directive> {
    let Some(((op, element), tail)) = rest.split_first() else {
        return Vec::new();
    };
    let runs = match op {
        ListOp::And => status,
        ListOp::Or => !status,
    };
    if !runs {
        return lower_chain(status, tail);
    }

    match element {
        Element::Test(test) => vec![Directive::Conditional {
            test: test.clone(),
            then: lower_chain(true, tail),
            otherwise: lower_chain(false, tail),
        }],
        Element::Effects(directives) => {
            let mut out = directives.clone();
            out.extend(lower_chain(true, tail));
            out
        }
    }
}

fn static_args(args: &[Word]) -> Option<Vec<String>> {
    args.iter().map(Word::static_text).collect()
}

/// A statement usable as an `if` / `&&` condition.
fn condition(stmt: &Statement) -> Option<Test> {
    let Statement::Command(cmd) = stmt else {
        return None;
    };
    if !cmd.prefix.is_empty() || !cmd.redirections.is_empty() {
        return None;
    }
    match cmd.name.static_text()?.as_str() {
        "true" | ":" => Some(Test::Constant(true)),
        "false" => Some(Test::Constant(false)),
        "test" => test_expr(&cmd.args),
        "[" => {
            let (last, args) = cmd.args.split_last()?;
            if last.static_text().as_deref() != Some("]") {
                return None;
            }
            test_expr(args)
        }
        _ => None,
    }
}

fn test_expr(args: &[Word]) -> Option<Test> {
    let ops: Vec<Option<String>> = args.iter().map(Word::static_text).collect();
    match (args, ops.as_slice()) {
        ([_, rest @ ..], [Some(bang), ..]) if bang == "!" && !rest.is_empty() => {
            test_expr(rest).map(|t| Test::Not(Box::new(t)))
        }
        ([_, operand], [Some(flag), _]) => match flag.as_str() {
            "-n" => Some(Test::NonEmpty(operand.clone())),
            "-z" => Some(Test::Empty(operand.clone())),
            flag => FileTest::from_flag(flag).map(|kind| Test::File {
                kind,
                path: operand.clone(),
            }),
        },
        ([a, _, b], [_, Some(op), _]) => match op.as_str() {
            "=" | "==" => Some(Test::Equal(a.clone(), b.clone())),
            "!=" => Some(Test::NotEqual(a.clone(), b.clone())),
            _ => None,
        },
        ([word], _) => Some(Test::NonEmpty(word.clone())),
        ([], _) => Some(Test::Constant(false)),
        _ => None,
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Alias { name, expansion } => write!(f, "alias {name}={expansion}"),
            Directive::Unalias { name } => write!(f, "unalias {name}"),
            Directive::UnaliasAll => write!(f, "unalias -a"),
            Directive::Assign {
                name,
                value,
                exported,
            } => {
                if *exported {
                    write!(f, "export ")?;
                }
                write!(f, "{name}={value}")
            }
            Directive::Export { name } => write!(f, "export {name}"),
            Directive::Unset { name } => write!(f, "unset {name}"),
            Directive::Source { path } => write!(f, "source {path}"),
            Directive::Expand(words) => {
                write!(f, ":")?;
                for w in words {
                    write!(f, " {w}")?;
                }
                Ok(())
            }
            Directive::Conditional {
                test,
                then,
                otherwise,
            } => write!(
                f,
                "if {test} ({} then, {} else)",
                then.len(),
                otherwise.len()
            ),
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::File { kind, path } => {
                let flag = match kind {
                    FileTest::Exists => "-e",
                    FileTest::Regular => "-f",
                    FileTest::Directory => "-d",
                    FileTest::Readable => "-r",
                    FileTest::NonEmpty => "-s",
                };
                write!(f, "[ {flag} {path} ]")
            }
            Test::NonEmpty(w) => write!(f, "[ -n {w} ]"),
            Test::Empty(w) => write!(f, "[ -z {w} ]"),
            Test::Equal(a, b) => write!(f, "[ {a} = {b} ]"),
            Test::NotEqual(a, b) => write!(f, "[ {a} != {b} ]"),
            Test::Not(inner) => write!(f, "! {inner}"),
            Test::Constant(v) => write!(f, "{v}"),
        }
    }
}
