//! Lexer for POSIX shell profiles
//!
//! Tokenizes profile text into words and operators. Quoting is preserved per
//! segment so that expansion can later tell `'$HOME'` from `"$HOME"`.

use chumsky::prelude::*;
use serde::{Deserialize, Serialize};

/// How a word segment was quoted in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quote {
    Bare,
    Single,
    Double,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A single unquoted segment
    Word(String),
    /// Adjacent bare/quoted segments with no whitespace between them
    CompoundWord(Vec<(Quote, String)>),

    // Operators
    Pipe,      // |
    Semicolon, // ;
    Newline,   // \n
    Ampersand, // &
    AndAnd,    // &&
    OrOr,      // ||

    /// Any redirection operator, with its fd prefix: `>`, `2>>`, `>&`, `&>`
    Redirect(String),
    /// `<<WORD` / `<<-WORD`; the body and the rest of its line are consumed
    Heredoc(String),

    // Brackets
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }

    // Keywords
    If,
    Then,
    Elif,
    Else,
    Fi,
    For,
    While,
    Until,
    Do,
    Done,
    Case,
    Esac,
    Function,
}

impl Token {
    /// Keyword tokens may still appear as plain arguments (`echo done`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::If => "if",
            Token::Then => "then",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::Fi => "fi",
            Token::For => "for",
            Token::While => "while",
            Token::Until => "until",
            Token::Do => "do",
            Token::Done => "done",
            Token::Case => "case",
            Token::Esac => "esac",
            Token::Function => "function",
            _ => return None,
        };
        Some(text)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(kw) = self.keyword_text() {
            return write!(f, "{kw}");
        }
        match self {
            Token::Word(s) => write!(f, "{s}"),
            Token::CompoundWord(segments) => {
                for (quote, s) in segments {
                    match quote {
                        Quote::Bare => write!(f, "{s}")?,
                        Quote::Single => write!(f, "'{s}'")?,
                        Quote::Double => write!(f, "\"{s}\"")?,
                    }
                }
                Ok(())
            }
            Token::Pipe => write!(f, "|"),
            Token::Semicolon => write!(f, ";"),
            Token::Newline => write!(f, "\\n"),
            Token::Ampersand => write!(f, "&"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Redirect(op) => write!(f, "{op}"),
            Token::Heredoc(delimiter) => write!(f, "<<{delimiter}"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            _ => Ok(()),
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '|' | '&' | '(' | ')' | '<' | '>')
}

/// A reserved word only when it stands alone: `do-build` is a plain word.
fn keyword(word: &'static str, token: Token) -> impl Parser<char, Token, Error = Simple<char>> + Clone {
    text::keyword(word)
        .then_ignore(filter(|c: &char| is_delimiter(*c)).ignored().or(end()).rewind())
        .to(token)
}

/// `<<[-]WORD` followed by the rest of the line, the body and the closing
/// delimiter line. A missing delimiter runs to end of input.
fn heredoc() -> impl Parser<char, Token, Error = Simple<char>> + Clone {
    let delimiter = filter(|c: &char| !is_delimiter(*c))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|raw| raw.chars().filter(|c| !matches!(c, '\'' | '"' | '\\')).collect::<String>());

    just("<<")
        .ignore_then(just('-').or_not().map(|dash| dash.is_some()))
        .then_ignore(filter(|c: &char| *c == ' ' || *c == '\t').repeated())
        .then(delimiter)
        .then_with(|(strip_tabs, delimiter): (bool, String)| {
            let line = filter(|c: &char| *c != '\n').repeated().collect::<String>();
            let body_line = just('\n').ignore_then(line.clone());
            let terminator = delimiter.clone();
            let is_end = move |line: &str| {
                let line = if strip_tabs { line.trim_start_matches('\t') } else { line };
                line == terminator
            };
            let is_body = is_end.clone();

            line.ignore_then(
                body_line
                    .clone()
                    .try_map(move |l, span| {
                        if is_body(l.as_str()) {
                            Err(Simple::custom(span, "heredoc delimiter"))
                        } else {
                            Ok(())
                        }
                    })
                    .repeated(),
            )
            .then_ignore(
                body_line
                    .try_map(move |l, span| {
                        if is_end(l.as_str()) {
                            Ok(())
                        } else {
                            Err(Simple::custom(span, "expected heredoc delimiter"))
                        }
                    })
                    .or(end()),
            )
            .to(Token::Heredoc(delimiter))
        })
}

pub fn lexer() -> impl Parser<char, Vec<Token>, Error = Simple<char>> {
    let comment = just('#').then(filter(|c| *c != '\n').repeated()).ignored();

    // Blanks (not newlines) and backslash line continuations
    let blank = filter(|c: &char| *c == ' ' || *c == '\t' || *c == '\r')
        .ignored()
        .or(just("\\\n").ignored());
    let skip = blank.or(comment).repeated();

    let sq_seg = just('\'')
        .ignore_then(filter(|c| *c != '\'').repeated())
        .then_ignore(just('\''))
        .collect::<String>()
        .map(|s| (Quote::Single, s));

    // `\$` stays escaped so expansion can tell it from a parameter.
    let dq_seg = just('"')
        .ignore_then(
            just('\\')
                .ignore_then(any())
                .map(|c: char| match c {
                    '"' | '\\' | '`' => c.to_string(),
                    '$' => "\\$".to_string(),
                    '\n' => String::new(),
                    _ => format!("\\{c}"),
                })
                .or(filter(|c: &char| *c != '"' && *c != '\\').map(|c: char| c.to_string()))
                .repeated(),
        )
        .then_ignore(just('"'))
        .map(|parts: Vec<String>| (Quote::Double, parts.concat()));

    let keywords = choice((
        keyword("if", Token::If),
        keyword("then", Token::Then),
        keyword("elif", Token::Elif),
        keyword("else", Token::Else),
        keyword("fi", Token::Fi),
        keyword("for", Token::For),
        keyword("while", Token::While),
        keyword("until", Token::Until),
        keyword("do", Token::Do),
        keyword("done", Token::Done),
        keyword("case", Token::Case),
        keyword("esac", Token::Esac),
        keyword("function", Token::Function),
    ));

    let both_redirect = just("&>>")
        .or(just("&>"))
        .map(|op: &str| Token::Redirect(op.to_string()));

    let fd_redirect = filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .collect::<String>()
        .then(choice((
            just(">>"),
            just(">&"),
            just("<<"),
            just("<&"),
            just(">"),
            just("<"),
        )))
        .map(|(fd, op)| Token::Redirect(format!("{fd}{op}")));

    let op = choice((
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
        just('|').to(Token::Pipe),
        just(';').to(Token::Semicolon),
        just('&').to(Token::Ampersand),
        just('(').to(Token::LeftParen),
        just(')').to(Token::RightParen),
        just('{').to(Token::LeftBrace),
        just('}').to(Token::RightBrace),
        just('\n').to(Token::Newline),
    ));

    let word_char = filter(|c: &char| {
        !c.is_whitespace()
            && !matches!(
                c,
                '|' | '&' | ';' | '<' | '>' | '(' | ')' | '{' | '}' | '"' | '\'' | '\\' | '`'
            )
    });

    // Backslash-escape outside quotes: \X -> literal X, \<newline> -> nothing
    let escaped_char = just('\\').ignore_then(any()).map(|c: char| match c {
        '\n' => String::new(),
        '$' => "\\$".to_string(),
        _ => c.to_string(),
    });

    // ${ ... } kept verbatim, nested ${ ... } balanced
    let braced_param = recursive(|braced| {
        just("${")
            .ignore_then(
                braced
                    .or(filter(|c: &char| *c != '}').map(|c: char| c.to_string()))
                    .repeated()
                    .map(|parts: Vec<String>| parts.concat()),
            )
            .then_ignore(just('}'))
            .map(|inner: String| format!("${{{inner}}}"))
    });

    // $( ... ) and $(( ... )) kept verbatim, parentheses balanced
    let parens = recursive(|inner| {
        just('(')
            .ignore_then(
                inner
                    .or(filter(|c: &char| *c != '(' && *c != ')').map(|c: char| c.to_string()))
                    .repeated()
                    .map(|parts: Vec<String>| parts.concat()),
            )
            .then_ignore(just(')'))
            .map(|body| format!("({body})"))
    });
    let command_sub = just('$').ignore_then(parens).map(|body| format!("${body}"));

    let backtick = just('`')
        .ignore_then(filter(|c| *c != '`').repeated().collect::<String>())
        .then_ignore(just('`'))
        .map(|cmd| format!("`{cmd}`"));

    let bare_seg = choice((
        braced_param,
        command_sub,
        backtick,
        escaped_char,
        word_char.map(|c: char| c.to_string()),
    ))
    .repeated()
    .at_least(1)
    .map(|parts: Vec<String>| (Quote::Bare, parts.concat()));

    let compound_word = choice((bare_seg, sq_seg, dq_seg))
        .repeated()
        .at_least(1)
        .map(|segments: Vec<(Quote, String)>| match segments.as_slice() {
            [(Quote::Bare, s)] => Token::Word(s.clone()),
            _ => Token::CompoundWord(segments),
        });

    let token = choice((heredoc(), both_redirect, fd_redirect, op, keywords, compound_word));

    skip.clone()
        .ignore_then(token)
        .repeated()
        .then_ignore(skip)
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        lexer().parse(input).unwrap()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(lex("echo hello"), vec![word("echo"), word("hello")]);
    }

    #[test]
    fn test_alias_with_single_quotes() {
        assert_eq!(
            lex("alias py='python3'"),
            vec![
                word("alias"),
                Token::CompoundWord(vec![
                    (Quote::Bare, "py=".to_string()),
                    (Quote::Single, "python3".to_string()),
                ]),
            ]
        );
    }

    #[test]
    fn test_double_quoted_keeps_escaped_dollar() {
        assert_eq!(
            lex(r#"X="a \$b""#),
            vec![Token::CompoundWord(vec![
                (Quote::Bare, "X=".to_string()),
                (Quote::Double, "a \\$b".to_string()),
            ])]
        );
    }

    #[test]
    fn test_parameter_forms_stay_in_word() {
        assert_eq!(
            lex("PATH=${HOME}/bin:$PATH"),
            vec![word("PATH=${HOME}/bin:$PATH")]
        );
        assert_eq!(lex("X=$(uname -r)"), vec![word("X=$(uname -r)")]);
    }

    #[test]
    fn test_and_or_list() {
        assert_eq!(
            lex("[ -f x ] && . x || true"),
            vec![
                word("["),
                word("-f"),
                word("x"),
                word("]"),
                Token::AndAnd,
                word("."),
                word("x"),
                Token::OrOr,
                word("true"),
            ]
        );
    }

    #[test]
    fn test_redirections() {
        assert_eq!(
            lex("cmd >/dev/null 2>&1"),
            vec![
                word("cmd"),
                Token::Redirect(">".to_string()),
                word("/dev/null"),
                Token::Redirect("2>&".to_string()),
                word("1"),
            ]
        );
    }

    #[test]
    fn test_if_statement() {
        assert_eq!(
            lex("if true; then echo yes; fi"),
            vec![
                Token::If,
                word("true"),
                Token::Semicolon,
                Token::Then,
                word("echo"),
                word("yes"),
                Token::Semicolon,
                Token::Fi,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("# header\necho hello # trailing\necho a#b # end"),
            vec![
                Token::Newline,
                word("echo"),
                word("hello"),
                Token::Newline,
                word("echo"),
                word("a#b"),
            ]
        );
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(lex("export A=1 \\\n  B=2"), vec![word("export"), word("A=1"), word("B=2")]);
    }

    #[test]
    fn test_nested_braced_parameter() {
        assert_eq!(
            lex("X=${XDG_CONFIG_HOME:-${HOME}/.config} y"),
            vec![word("X=${XDG_CONFIG_HOME:-${HOME}/.config}"), word("y")]
        );
    }

    #[test]
    fn test_keyword_followed_by_word_chars() {
        assert_eq!(
            lex("alias do-build=make done;"),
            vec![
                word("alias"),
                word("do-build=make"),
                Token::Done,
                Token::Semicolon,
            ]
        );
        assert_eq!(lex("fi.sh"), vec![word("fi.sh")]);
    }

    #[test]
    fn test_heredoc_body_is_one_token() {
        assert_eq!(
            lex("cat <<EOF >/dev/null\nalias evil=rm\nEOF\necho after"),
            vec![
                word("cat"),
                Token::Heredoc("EOF".to_string()),
                Token::Newline,
                word("echo"),
                word("after"),
            ]
        );
        assert_eq!(
            lex("cat <<-'END'\n\tX=1\n\tEND\n"),
            vec![word("cat"), Token::Heredoc("END".to_string()), Token::Newline]
        );
        assert_eq!(
            lex("cat <<EOF\nnever closed\n"),
            vec![word("cat"), Token::Heredoc("EOF".to_string())]
        );
    }

    #[test]
    fn test_keyword_prefix_is_a_word() {
        assert_eq!(lex("fish_indent done"), vec![word("fish_indent"), Token::Done]);
    }
}
