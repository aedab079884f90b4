//! `name=value` assignment lists, as found in `defaultproperties` and struct literals.
//!
//! Values may be parenthesized structs with nested `=`, so assignments are
//! split by a small state machine rather than on `=`.
use common::tokenizer::Piece;

/// Input of the state machine. Literals are copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Unit {
    Char(char),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Name,
    Value,
}

/// Units of a block, with quoted text rendered as `'text'`.
pub(crate) fn block_units(pieces: &[Piece], quote: impl Fn(&Piece) -> Option<String>) -> Vec<Unit> {
    let mut res = vec![];

    for piece in pieces {
        match piece {
            Piece::Text(text) => res.extend(text.chars().map(Unit::Char)),
            other => {
                if let Some(text) = quote(other) {
                    res.push(Unit::Literal(format!("'{text}'")));
                }
            }
        }
    }

    res
}

/// Units of a rendered value. `'...'` and `"..."` become literals.
fn text_units(text: &str) -> Vec<Unit> {
    let mut res = vec![];
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            let mut literal = String::from(c);

            for next in chars.by_ref() {
                literal.push(next);

                if next == c {
                    break;
                }
            }

            res.push(Unit::Literal(literal));
        } else {
            res.push(Unit::Char(c));
        }
    }

    res
}

/// Splits units into lowercase `(name, value)` pairs.
///
/// Whitespace inside parentheses is dropped, so `(X=1, Y=2)` reads as `(x=1,y=2)`.
/// A value ends at whitespace or `is_separator` outside parentheses. `Key=` at a line end is empty.
pub(crate) fn parse_assignments(
    units: impl IntoIterator<Item = Unit>,
    is_separator: impl Fn(char) -> bool,
) -> Vec<(String, String)> {
    let mut res = vec![];
    let mut state = State::Name;
    let mut name = String::new();
    let mut name_done = false;
    let mut value = String::new();
    let mut depth = 0usize;

    for unit in units {
        let c = match unit {
            Unit::Literal(text) => {
                match state {
                    State::Name => name.push_str(&text),
                    State::Value => value.push_str(&text),
                }

                continue;
            }
            Unit::Char(c) => c,
        };

        match state {
            State::Name => match c {
                '=' if depth == 0 => {
                    state = State::Value;
                    name_done = false;
                }
                '(' | '[' => {
                    depth += 1;
                    name.push(c);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    name.push(c);
                }
                _ if c.is_whitespace() || is_separator(c) => {
                    name_done = depth == 0 && !name.is_empty();
                }
                _ => {
                    // a word that was not followed by `=`
                    if name_done {
                        name.clear();
                        name_done = false;
                    }

                    name.extend(c.to_lowercase());
                }
            },
            State::Value => match c {
                _ if depth == 0 && (c.is_whitespace() || is_separator(c)) => {
                    // spaces before the value are skipped, a line end closes it even when empty
                    if !value.is_empty() || c == '\n' || is_separator(c) {
                        res.push((std::mem::take(&mut name), std::mem::take(&mut value)));
                        state = State::Name;
                    }
                }
                '(' => {
                    depth += 1;
                    value.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    value.push(c);
                }
                _ if c.is_whitespace() => {}
                _ => value.extend(c.to_lowercase()),
            },
        }
    }

    if state == State::Value && !name.is_empty() {
        res.push((name, value));
    }

    res
}

/// Fields of a struct literal such as `(x=1,y=2,w=(a=1))`, nested values left as text.
pub fn split_struct_value(value: &str) -> Option<Vec<(String, String)>> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;

    Some(parse_assignments(text_units(inner), |c| c == ','))
}
