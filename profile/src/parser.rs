//! Parser for shell profiles
//!
//! Parses a token stream into an AST.

use crate::ast::*;
use crate::lexer::{Quote, Token};
use chumsky::prelude::*;

/// Parse a token stream into a Script AST
pub fn parser() -> impl Parser<Token, Script, Error = Simple<Token>> {
    separators()
        .ignore_then(statement().then_ignore(separators()).repeated())
        .map(|statements| Script { statements })
        .then_ignore(end())
}

/// Statement separators (semicolon or newline)
fn separators() -> impl Parser<Token, (), Error = Simple<Token>> + Clone {
    filter(|t| matches!(t, Token::Semicolon | Token::Newline))
        .repeated()
        .ignored()
}

fn newlines() -> impl Parser<Token, (), Error = Simple<Token>> + Clone {
    just(Token::Newline).repeated().ignored()
}

/// Parse a single statement: an and-or list, optionally backgrounded
fn statement() -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    recursive(|stmt| {
        let element = choice((
            if_statement(stmt),
            function_def(),
            balanced_block().map(Statement::Opaque),
            simple_command(),
        ));

        let pipeline = element
            .separated_by(just(Token::Pipe).then_ignore(newlines()))
            .at_least(1)
            .map(|mut elements: Vec<Statement>| {
                if elements.len() == 1 {
                    elements.remove(0)
                } else {
                    Statement::Opaque(OpaqueKind::Pipeline)
                }
            });

        let list = pipeline
            .clone()
            .then(
                choice((
                    just(Token::AndAnd).to(ListOp::And),
                    just(Token::OrOr).to(ListOp::Or),
                ))
                .then_ignore(newlines())
                .then(pipeline)
                .repeated(),
            )
            .map(|(first, rest)| {
                if rest.is_empty() {
                    first
                } else {
                    Statement::List(CommandList {
                        first: Box::new(first),
                        rest,
                    })
                }
            });

        list.then(just(Token::Ampersand).or_not())
            .map(|(stmt, background)| {
                if background.is_some() {
                    Statement::Opaque(OpaqueKind::Background)
                } else {
                    stmt
                }
            })
    })
}

/// Parse an if statement
fn if_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    let body = separators().ignore_then(stmt.clone().then_ignore(separators()).repeated());

    // if condition; then body; elif condition; then body; else body; fi
    just(Token::If)
        .ignore_then(stmt.clone())
        .then_ignore(separators())
        .then_ignore(just(Token::Then))
        .then(body.clone())
        .then(
            just(Token::Elif)
                .ignore_then(stmt)
                .then_ignore(separators())
                .then_ignore(just(Token::Then))
                .then(body.clone())
                .map(|(condition, body)| ElifClause { condition, body })
                .repeated(),
        )
        .then(just(Token::Else).ignore_then(body).or_not())
        .then_ignore(just(Token::Fi))
        .map(|(((condition, then_body), elif_clauses), else_body)| {
            Statement::If(IfStatement {
                condition: Box::new(condition),
                then_body,
                elif_clauses,
                else_body,
            })
        })
}

/// Parse a function definition; the body is never evaluated
fn function_def() -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    // name() { body } or function name { body }
    let paren_style = name()
        .then_ignore(just(Token::LeftParen))
        .then_ignore(just(Token::RightParen));

    let function_keyword = just(Token::Function).ignore_then(name()).then_ignore(
        just(Token::LeftParen)
            .then(just(Token::RightParen))
            .or_not(),
    );

    paren_style
        .or(function_keyword)
        .then_ignore(newlines())
        .then_ignore(balanced_block())
        .map(|name| Statement::Opaque(OpaqueKind::Function(name)))
}

fn is_block_opener(t: &Token) -> bool {
    matches!(
        t,
        Token::For
            | Token::While
            | Token::Until
            | Token::Case
            | Token::If
            | Token::LeftParen
            | Token::LeftBrace
    )
}

fn is_block_delimiter(t: &Token) -> bool {
    is_block_opener(t)
        || matches!(
            t,
            Token::Done | Token::Esac | Token::Fi | Token::RightParen | Token::RightBrace
        )
}

/// Consume a compound command by balancing its delimiters
fn balanced_block() -> impl Parser<Token, OpaqueKind, Error = Simple<Token>> + Clone {
    recursive(|block| {
        let inner = block
            .clone()
            .ignored()
            .or(filter(|t: &Token| !is_block_delimiter(t)).ignored())
            .repeated();

        // `pattern)` lines inside case use a bare closing paren
        let case_inner = block
            .clone()
            .ignored()
            .or(filter(|t: &Token| !is_block_opener(t) && *t != Token::Esac).ignored())
            .repeated();

        choice((
            choice((just(Token::For), just(Token::While), just(Token::Until)))
                .then(inner.clone())
                .then(just(Token::Done))
                .to(OpaqueKind::Loop),
            just(Token::Case)
                .then(case_inner)
                .then(just(Token::Esac))
                .to(OpaqueKind::Case),
            just(Token::If)
                .then(inner.clone())
                .then(just(Token::Fi))
                .to(OpaqueKind::Conditional),
            just(Token::LeftParen)
                .then(inner.clone())
                .then(just(Token::RightParen))
                .to(OpaqueKind::Subshell),
            just(Token::LeftBrace)
                .then(inner)
                .then(just(Token::RightBrace))
                .to(OpaqueKind::BraceGroup),
        ))
    })
}

enum Item {
    Word(Word),
    Redirect(Redirection),
}

/// Parse a simple command, splitting off leading `NAME=value` words
fn simple_command() -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    let redirection = filter_map(|span, tok| match tok {
        Token::Redirect(op) => Ok(op),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    })
    .then(arg_word())
    .map(|(op, target)| Redirection { op, target });

    // The body never reaches the parser; only the delimiter is kept.
    let heredoc = filter_map(|span, tok| match tok {
        Token::Heredoc(delimiter) => Ok(Redirection {
            op: "<<".to_string(),
            target: Word::literal(&delimiter),
        }),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    });

    let item = redirection
        .or(heredoc)
        .map(Item::Redirect)
        .or(arg_word().map(Item::Word));

    word().then(item.repeated()).map(|(name, items)| {
        let mut words = vec![name];
        let mut redirections = Vec::new();
        for item in items {
            match item {
                Item::Word(w) => words.push(w),
                Item::Redirect(r) => redirections.push(r),
            }
        }

        let prefix_len = words
            .iter()
            .take_while(|w| w.split_assignment().is_some())
            .count();
        let mut words = words.into_iter();
        let prefix: Vec<Assignment> = words
            .by_ref()
            .take(prefix_len)
            .filter_map(|w| w.split_assignment())
            .collect();

        match words.next() {
            None if redirections.is_empty() => Statement::Assignment(prefix),
            None => Statement::Command(Command {
                prefix,
                name: Word::empty(),
                args: Vec::new(),
                redirections,
            }),
            Some(name) => Statement::Command(Command {
                prefix,
                name,
                args: words.collect(),
                redirections,
            }),
        }
    })
}

fn name() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    filter_map(|span, tok| match tok {
        Token::Word(s) if is_valid_name(&s) || s.contains(['-', '.', ':']) => Ok(s),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    })
}

fn word() -> impl Parser<Token, Word, Error = Simple<Token>> + Clone {
    filter_map(|span, tok| match tok {
        Token::Word(s) => Ok(Word {
            parts: vec![WordPart::Literal(s)],
        }),
        Token::CompoundWord(segments) => Ok(Word {
            parts: segments
                .into_iter()
                .map(|(quote, s)| match quote {
                    Quote::Bare => WordPart::Literal(s),
                    Quote::Single => WordPart::SingleQuoted(s),
                    Quote::Double => WordPart::DoubleQuoted(s),
                })
                .collect(),
        }),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    })
}

/// A word in argument position, where reserved words are plain text
fn arg_word() -> impl Parser<Token, Word, Error = Simple<Token>> + Clone {
    word().or(filter_map(|span, tok: Token| match tok.keyword_text() {
        Some(kw) => Ok(Word::literal(kw)),
        None => Err(Simple::expected_input_found(span, None, Some(tok))),
    }))
}

/// Parse input string directly to AST
pub fn parse(input: &str) -> Result<Script, Vec<Simple<Token>>> {
    use crate::lexer::lexer;

    // First, lex the input
    let tokens = lexer().parse(input).map_err(|errs| {
        errs.into_iter()
            .map(|e| Simple::custom(0..0, e.to_string()))
            .collect::<Vec<_>>()
    })?;

    // Then parse the tokens
    parser().parse(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Vec<Statement> {
        parse(input).unwrap().statements
    }

    #[test]
    fn test_simple_command() {
        let stmts = parse_ok("echo hello");
        assert_eq!(stmts.len(), 1);
        let Statement::Command(cmd) = &stmts[0] else {
            panic!("Expected command");
        };
        assert_eq!(cmd.name, Word::literal("echo"));
        assert_eq!(cmd.args, vec![Word::literal("hello")]);
    }

    #[test]
    fn test_assignments_without_command() {
        let stmts = parse_ok("A=1 B=two");
        let Statement::Assignment(assignments) = &stmts[0] else {
            panic!("Expected assignment");
        };
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[1].name, "B");
        assert_eq!(assignments[1].value, Word::literal("two"));
    }

    #[test]
    fn test_prefix_assignment_is_command() {
        let stmts = parse_ok("LANG=C sort file");
        let Statement::Command(cmd) = &stmts[0] else {
            panic!("Expected command");
        };
        assert_eq!(cmd.prefix.len(), 1);
        assert_eq!(cmd.name, Word::literal("sort"));
    }

    #[test]
    fn test_blank_and_comment_only_input() {
        assert!(parse_ok("\n# nothing here\n\n;\n").is_empty());
        assert!(parse_ok("").is_empty());
    }

    #[test]
    fn test_and_or_list() {
        let stmts = parse_ok("[ -f ~/.aliases ] && . ~/.aliases || true");
        let Statement::List(list) = &stmts[0] else {
            panic!("Expected list");
        };
        assert_eq!(list.rest.len(), 2);
        assert_eq!(list.rest[0].0, ListOp::And);
        assert_eq!(list.rest[1].0, ListOp::Or);
    }

    #[test]
    fn test_if_elif_else() {
        let src = "if [ -f /a ]; then\n  . /a\nelif [ -d /b ]\nthen\n  X=1\nelse\n  Y=2\nfi\n";
        let stmts = parse_ok(src);
        assert_eq!(stmts.len(), 1);
        let Statement::If(stmt) = &stmts[0] else {
            panic!("Expected if");
        };
        assert_eq!(stmt.then_body.len(), 1);
        assert_eq!(stmt.elif_clauses.len(), 1);
        assert_eq!(stmt.else_body.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_opaque_constructs() {
        let src = "for i in /etc/profile.d/*.sh; do\n  . \"$i\"\ndone\n\
                   case $- in *i*) PS1='> ' ;; esac\n\
                   greet() { echo hi; }\n\
                   ls | wc -l\n\
                   sleep 1 &\n";
        let kinds: Vec<_> = parse_ok(src)
            .into_iter()
            .map(|s| match s {
                Statement::Opaque(kind) => kind,
                other => panic!("Expected opaque, got {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                OpaqueKind::Loop,
                OpaqueKind::Case,
                OpaqueKind::Function("greet".to_string()),
                OpaqueKind::Pipeline,
                OpaqueKind::Background,
            ]
        );
    }

    #[test]
    fn test_keywords_as_arguments() {
        let stmts = parse_ok("echo done if");
        let Statement::Command(cmd) = &stmts[0] else {
            panic!("Expected command");
        };
        assert_eq!(cmd.args, vec![Word::literal("done"), Word::literal("if")]);
    }

    #[test]
    fn test_unbalanced_input_fails() {
        assert!(parse("if [ -f x ]; then").is_err());
        assert!(parse("alias x='unterminated").is_err());
    }
}
