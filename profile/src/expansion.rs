//! Parameter and tilde expansion against a session
//!
//! Only literal substitution is performed: `$NAME`, `${NAME}`, the
//! `${NAME:-word}` family and `~`. Command substitution never reaches here.

use crate::ast::{Word, WordPart};
use crate::session::SessionState;

/// Expand a word in argument position.
pub fn expand_word(word: &Word, session: &mut SessionState) -> String {
    expand(word, session, false)
}

/// Expand the right-hand side of `NAME=value`, where `~` is also
/// recognised after each `:`.
pub fn expand_assignment(word: &Word, session: &mut SessionState) -> String {
    expand(word, session, true)
}

/// Expand parameters in a plain string, as if it were double-quoted.
pub fn expand_str(s: &str, session: &mut SessionState) -> String {
    expand_parameters(s, session)
}

fn expand(word: &Word, session: &mut SessionState, assignment: bool) -> String {
    let mut result = String::new();

    for (i, part) in word.parts.iter().enumerate() {
        match part {
            WordPart::Literal(s) => {
                let s = if i == 0 || assignment {
                    expand_tilde(s, session, i == 0, assignment)
                } else {
                    s.clone()
                };
                result.push_str(&expand_parameters(&s, session));
            }
            WordPart::SingleQuoted(s) => result.push_str(s),
            WordPart::DoubleQuoted(s) => result.push_str(&expand_parameters(s, session)),
        }
    }

    result
}

fn expand_tilde(s: &str, session: &SessionState, at_start: bool, assignment: bool) -> String {
    let home = session.lookup("HOME").unwrap_or_default().to_string();
    let replace = |segment: &str| -> String {
        if segment == "~" {
            home.clone()
        } else if let Some(rest) = segment.strip_prefix("~/") {
            format!("{home}/{rest}")
        } else {
            segment.to_string()
        }
    };

    if assignment {
        s.split(':')
            .enumerate()
            .map(|(i, seg)| if i > 0 || at_start { replace(seg) } else { seg.to_string() })
            .collect::<Vec<_>>()
            .join(":")
    } else {
        replace(s)
    }
}

fn expand_parameters(s: &str, session: &mut SessionState) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'$') => {
                chars.next();
                result.push('$');
            }
            '$' => match chars.peek().copied() {
                Some('{') => {
                    chars.next();
                    let mut content = String::new();
                    let mut depth = 1;
                    for c in chars.by_ref() {
                        if c == '{' {
                            depth += 1;
                        } else if c == '}' {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        content.push(c);
                    }
                    result.push_str(&expand_braced_param(&content, session));
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    result.push_str(session.lookup(&name).unwrap_or_default());
                }
                // Special and positional parameters have no value in a profile.
                Some(c) if c.is_ascii_digit() || matches!(c, '$' | '?' | '!' | '-' | '#' | '@' | '*') => {
                    chars.next();
                }
                _ => result.push('$'),
            },
            _ => result.push(c),
        }
    }

    result
}

fn expand_braced_param(content: &str, session: &mut SessionState) -> String {
    // ${#var} - string length
    if let Some(name) = content.strip_prefix('#') {
        if !name.is_empty() {
            return session.lookup(name).unwrap_or_default().chars().count().to_string();
        }
    }

    let name_len = content
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(content.len(), |(i, _)| i);
    let (name, rest) = content.split_at(name_len);

    let value = session.lookup(name).map(str::to_string);
    let is_set = value.is_some();
    let value = value.unwrap_or_default();

    let Some((op, operand)) = [":-", ":=", ":+", "-", "=", "+", "##", "#", "%%", "%"]
        .iter()
        .find_map(|op| rest.strip_prefix(op).map(|operand| (*op, operand)))
    else {
        return value;
    };

    match op {
        // ${var:-word} / ${var-word}: default when empty / unset
        ":-" if value.is_empty() => expand_parameters(operand, session),
        "-" if !is_set => expand_parameters(operand, session),
        // ${var:=word} / ${var=word}: as above, and assign
        ":=" | "=" if value.is_empty() && (op == ":=" || !is_set) => {
            let default = expand_parameters(operand, session);
            session.set_var(name, &default, false);
            default
        }
        // ${var:+word} / ${var+word}: alternate value when set
        ":+" if !value.is_empty() => expand_parameters(operand, session),
        "+" if is_set => expand_parameters(operand, session),
        ":+" | "+" => String::new(),
        "##" | "#" => {
            let pattern = expand_parameters(operand, session);
            remove_prefix(&value, &pattern, op == "##")
        }
        "%%" | "%" => {
            let pattern = expand_parameters(operand, session);
            remove_suffix(&value, &pattern, op == "%%")
        }
        _ => value,
    }
}

fn boundaries(value: &str) -> Vec<usize> {
    value
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(value.len()))
        .collect()
}

/// `${var#pat}` / `${var##pat}`: shortest or longest matching prefix.
fn remove_prefix(value: &str, pattern: &str, longest: bool) -> String {
    let mut cuts = boundaries(value);
    if longest {
        cuts.reverse();
    }
    cuts.into_iter()
        .find(|&i| glob_match(pattern, &value[..i]))
        .map_or_else(|| value.to_string(), |i| value[i..].to_string())
}

/// `${var%pat}` / `${var%%pat}`: shortest or longest matching suffix.
fn remove_suffix(value: &str, pattern: &str, longest: bool) -> String {
    let mut cuts = boundaries(value);
    if !longest {
        cuts.reverse();
    }
    cuts.into_iter()
        .find(|&i| glob_match(pattern, &value[i..]))
        .map_or_else(|| value.to_string(), |i| value[..i].to_string())
}

/// Shell pattern match supporting `*`, `?` and `[...]` (with `!`/`^`).
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(pattern: &[char], text: &[char]) -> bool {
    let Some((&p, rest)) = pattern.split_first() else {
        return text.is_empty();
    };
    match p {
        '*' => (0..=text.len()).any(|skip| match_from(rest, &text[skip..])),
        '?' => !text.is_empty() && match_from(rest, &text[1..]),
        '[' => match (text.first(), bracket_class(rest)) {
            (Some(&c), Some((matches, after))) => matches(c) && match_from(after, &text[1..]),
            (Some(&c), None) => c == '[' && match_from(rest, &text[1..]),
            (None, _) => false,
        },
        '\\' if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && match_from(&rest[1..], &text[1..])
        }
        _ => text.first() == Some(&p) && match_from(rest, &text[1..]),
    }
}

/// Parse the body of `[...]` (after the `[`). Returns a matcher and the
/// pattern after the closing `]`, or `None` if the class is unterminated.
fn bracket_class(pattern: &[char]) -> Option<(impl Fn(char) -> bool + '_, &[char])> {
    let negated = matches!(pattern.first(), Some('!' | '^'));
    let start = usize::from(negated);
    // A `]` right after the opening bracket is a literal member.
    let close = pattern
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|&(_, &c)| c == ']')
        .map(|(i, _)| i)?;
    let members = &pattern[start..close];

    let matcher = move |c: char| {
        let mut found = false;
        let mut i = 0;
        while i < members.len() {
            if i + 2 < members.len() && members[i + 1] == '-' {
                found |= (members[i]..=members[i + 2]).contains(&c);
                i += 3;
            } else {
                found |= members[i] == c;
                i += 1;
            }
        }
        found != negated
    };
    Some((matcher, &pattern[close + 1..]))
}
