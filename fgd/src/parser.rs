use common::{
    parse_value,
    tokenizer::{check_depth, find_closing, find_word, get_token, strip_line_comments, Lexed, Token},
};
use log::warn;

use crate::{
    error::FgdError,
    types::{
        flags_default_value, Choice, ClassType, Component, DefaultValue, EntityClass, Flag,
        InputOutput, IoKind, Property, PropertyKind,
    },
};

const SYMBOLS: &str = "{}[]():=,+";

/// Parses every class of one `.fgd` file. Inheritance is left unresolved.
pub fn parse_fgd(text: &str) -> Result<Vec<EntityClass>, FgdError> {
    let text = strip_line_comments(text, &['"']);
    let mut lexed = Lexed::new(&text, &['"'])?;
    let tokens = lexed.tokens(SYMBOLS, true);

    check_depth(&tokens, "{", "}", 0, 0)?;
    check_depth(&tokens, "(", ")", 0, 1)?;
    check_depth(&tokens, "[", "]", 0, 2)?;

    let tokens = merge_concatenations(&mut lexed, tokens)?;

    Parser {
        lexed: &lexed,
        tokens: &tokens,
    }
    .classes()
}

/// Joins `"a" + "b"` into a single literal `"a b"`. Newlines around `+` are skipped.
fn merge_concatenations(lexed: &mut Lexed, tokens: Vec<Token>) -> Result<Vec<Token>, FgdError> {
    let mut res = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];

        if token.is("+") {
            return FgdError::DanglingConcatenation { index }.to_result();
        }

        let Some(first) = token.quote() else {
            res.push(token.clone());
            index += 1;
            continue;
        };

        let mut parts = vec![first];
        let mut last = index;

        while let Some((plus, _)) = get_token(&tokens, last, 1).filter(|(_, t)| t.is("+")) {
            let Some((next, id)) =
                get_token(&tokens, plus, 1).and_then(|(i, t)| t.quote().map(|id| (i, id)))
            else {
                return FgdError::DanglingConcatenation { index: plus }.to_result();
            };

            parts.push(id);
            last = next;
        }

        if parts.len() == 1 {
            res.push(token.clone());
        } else {
            let merged = parts
                .iter()
                .filter_map(|id| lexed.quote(*id))
                .collect::<Vec<_>>()
                .join(" ");

            res.push(Token::Quote(lexed.push_quote(merged)));
        }

        index = last + 1;
    }

    Ok(res)
}

struct Parser<'a> {
    lexed: &'a Lexed,
    tokens: &'a [Token],
}

/// One `value : field : field` line inside a choices or flags list.
struct ListEntry<'a> {
    value: &'a str,
    fields: Vec<Option<&'a str>>,
}

impl<'a> ListEntry<'a> {
    fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied().flatten()
    }
}

impl<'a> Parser<'a> {
    fn text(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).and_then(|token| self.lexed.text(token))
    }

    /// Text of the token `offset` away from `base`, skipping newlines.
    fn text_at(&self, base: usize, offset: isize) -> Option<(usize, &'a str)> {
        let (index, token) = get_token(self.tokens, base, offset)?;

        self.lexed.text(token).map(|text| (index, text))
    }

    fn is_at(&self, base: usize, offset: isize, word: &str) -> bool {
        get_token(self.tokens, base, offset).is_some_and(|(_, token)| token.is(word))
    }

    fn expect(&self, base: usize, offset: isize, word: &'static str, context: &str) -> Result<(), FgdError> {
        if self.is_at(base, offset, word) {
            return Ok(());
        }

        FgdError::ExpectedToken {
            expected: word,
            context: context.to_string(),
            index: base,
        }
        .to_result()
    }

    fn classes(&self) -> Result<Vec<EntityClass>, FgdError> {
        let mut res = vec![];
        let mut index = 0;

        while index < self.tokens.len() {
            match self.tokens[index].word().and_then(ClassType::from_token) {
                Some(class_type) => {
                    let (class, end) = self.class(index, class_type)?;
                    res.push(class);
                    index = end + 1;
                }
                None => index += 1,
            }
        }

        Ok(res)
    }

    /// Parses the class starting at `start`, returning it with the index of its closing `]`.
    fn class(&self, start: usize, class_type: ClassType) -> Result<(EntityClass, usize), FgdError> {
        let missing = |expected: &'static str| FgdError::ExpectedToken {
            expected,
            context: format!("{} header", class_type.as_str()),
            index: start,
        };

        let equal = find_word(self.tokens, start, "=").ok_or_else(|| missing("="))?;
        let open = find_word(self.tokens, start, "[").ok_or_else(|| missing("["))?;

        if open < equal {
            return missing("=").to_result();
        }

        let close = find_closing(self.tokens, open, "[", "]").ok_or_else(|| missing("]"))?;

        let (_, classname) = self
            .text_at(equal, 1)
            .ok_or_else(|| missing("class name"))?;
        let classname = classname.to_lowercase();

        let description = if self.is_at(equal, 2, ":") {
            self.text_at(equal, 3)
                .map(|(_, text)| text.to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let components = self.components(start + 1, equal);

        let parents = components
            .iter()
            .filter(|component| component.name == "base")
            .flat_map(|component| component.args.iter())
            .map(|parent| parent.to_lowercase())
            .collect();

        let mut class = EntityClass {
            class_type,
            classname,
            description,
            components,
            properties: vec![],
            io: vec![],
            parents,
            class_hierarchy: vec![],
            inheritance_chain: vec![],
            all_properties: vec![],
            all_io: vec![],
        };

        self.body(&mut class, open, close)?;

        Ok((class, close))
    }

    fn components(&self, from: usize, to: usize) -> Vec<Component> {
        let mut res = vec![];
        let mut current: Option<Component> = None;
        let mut depth = 0usize;

        for token in &self.tokens[from..to] {
            if token.is_newline() || token.is(",") {
                continue;
            }

            if token.is("(") {
                depth += 1;
                continue;
            }

            if token.is(")") {
                depth = depth.saturating_sub(1);
                res.extend(current.take());
                continue;
            }

            let Some(text) = self.lexed.text(token) else {
                continue;
            };

            if depth > 0 {
                if let Some(component) = current.as_mut() {
                    component.args.push(text.to_string());
                }
            } else {
                // components without arguments, e.g. `halfgridsnap`
                res.extend(current.take());
                current = Some(Component {
                    name: text.to_lowercase(),
                    args: vec![],
                });
            }
        }

        res.extend(current);
        res
    }

    fn body(&self, class: &mut EntityClass, open: usize, close: usize) -> Result<(), FgdError> {
        let mut index = open + 1;

        while index < close {
            let is_property = self.text(index).is_some()
                && self.is_at(index, 1, "(")
                && self.is_at(index, 3, ")");

            if is_property {
                let (property, next) = self.property(&class.classname, index, close)?;

                if let Some(existing) = class
                    .properties
                    .iter_mut()
                    .find(|p| p.name.eq_ignore_ascii_case(&property.name))
                {
                    warn!(
                        "Class `{}` declares property `{}` more than once",
                        class.classname, property.name
                    );
                    *existing = property;
                } else {
                    class.properties.push(property);
                }

                index = next;
                continue;
            }

            if let Some(kind) = self.tokens[index].word().and_then(IoKind::from_token) {
                if self.is_at(index, 2, "(") {
                    let (io, next) = self.io(&class.classname, kind, index)?;

                    if let Some(existing) = class
                        .io
                        .iter_mut()
                        .find(|other| other.kind == io.kind && other.name == io.name)
                    {
                        warn!(
                            "Class `{}` declares io `{}` more than once",
                            class.classname, io.name
                        );
                        *existing = io;
                    } else {
                        class.io.push(io);
                    }

                    index = next;
                    continue;
                }
            }

            index += 1;
        }

        Ok(())
    }

    /// `input Name(type) : "description"`
    fn io(&self, classname: &str, kind: IoKind, index: usize) -> Result<(InputOutput, usize), FgdError> {
        let context = format!("io of class `{classname}`");

        let (_, name) = self.text_at(index, 1).ok_or_else(|| FgdError::ExpectedToken {
            expected: "io name",
            context: context.clone(),
            index,
        })?;
        let (_, argument_type) = self.text_at(index, 3).ok_or_else(|| FgdError::ExpectedToken {
            expected: "io type",
            context: context.clone(),
            index,
        })?;
        self.expect(index, 4, ")", &context)?;

        let (description, last) = if self.is_at(index, 5, ":") {
            match self.text_at(index, 6) {
                Some((last, text)) => (Some(text.to_string()), last),
                None => (None, index + 5),
            }
        } else {
            let (last, _) = get_token(self.tokens, index, 4).ok_or_else(|| FgdError::ExpectedToken {
                expected: ")",
                context: context.clone(),
                index,
            })?;

            (None, last)
        };

        let io = InputOutput {
            kind,
            name: name.to_string(),
            argument_type: argument_type.to_lowercase(),
            description,
        };

        Ok((io, last + 1))
    }

    /// `name(type) : "short" : default : "long"`, then `= [ ... ]` for choices and flags.
    fn property(&self, classname: &str, index: usize, close: usize) -> Result<(Property, usize), FgdError> {
        let name = self.text(index).unwrap_or_default().to_string();
        let type_name = self
            .text_at(index, 2)
            .map(|(_, text)| text.to_lowercase())
            .unwrap_or_default();

        // fields end at the line break, or at `=` for choices and flags
        let stop = (index..close)
            .find(|&i| self.tokens[i].is_newline() || self.tokens[i].is("="))
            .unwrap_or(close);

        let colons: Vec<usize> = (index..stop).filter(|&i| self.tokens[i].is(":")).collect();

        let field = |n: usize| -> Option<usize> {
            let colon = *colons.get(n)?;
            let next = colon + 1;

            (next < stop && !self.tokens[next].is(":")).then_some(next)
        };

        let short_description = field(0).and_then(|i| self.text(i)).map(str::to_string);
        let default_index = field(1);
        let raw_default = default_index.and_then(|i| self.text(i)).map(str::to_string);
        let default_quoted = default_index.is_some_and(|i| self.tokens[i].quote().is_some());
        let long_description = field(2).and_then(|i| self.text(i)).map(str::to_string);

        let (kind, default, next) = match type_name.as_str() {
            "choices" | "flags" => {
                let context = format!("property `{name}` of class `{classname}`");
                let missing = |expected: &'static str| FgdError::ExpectedToken {
                    expected,
                    context: context.clone(),
                    index,
                };

                let equal = find_word(self.tokens, index, "=")
                    .filter(|&equal| equal < close)
                    .ok_or_else(|| missing("="))?;
                let (list_open, _) = get_token(self.tokens, equal, 1)
                    .filter(|(_, token)| token.is("["))
                    .ok_or_else(|| missing("["))?;
                let list_close =
                    find_closing(self.tokens, list_open, "[", "]").ok_or_else(|| missing("]"))?;

                let entries = self.list_entries(list_open, list_close, &context)?;

                if type_name == "choices" {
                    let choices: Vec<Choice> = entries
                        .iter()
                        .map(|entry| Choice {
                            value: entry.value.to_string(),
                            description: entry.field(0).unwrap_or_default().to_string(),
                        })
                        .collect();

                    let default = match raw_default.as_deref() {
                        Some(raw) => {
                            resolve_choice_default(classname, &name, &choices, raw, default_quoted)?
                        }
                        None => DefaultValue::None,
                    };

                    (PropertyKind::Choices(choices), default, list_close + 1)
                } else {
                    let flags = entries
                        .iter()
                        .map(|entry| -> Result<Flag, FgdError> {
                            let default = match entry.field(1) {
                                Some(value) => parse_value::<i64>(value, "flag default")? == 1,
                                None => false,
                            };

                            Ok(Flag {
                                bit: parse_value(entry.value, "flag bit")?,
                                description: entry.field(0).unwrap_or_default().to_string(),
                                default,
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    let default = DefaultValue::FlagsMask(flags_default_value(&flags));

                    (PropertyKind::Flags(flags), default, list_close + 1)
                }
            }
            _ => {
                let default = raw_default
                    .clone()
                    .map(DefaultValue::Text)
                    .unwrap_or(DefaultValue::None);

                (PropertyKind::Builtin(type_name), default, stop + 1)
            }
        };

        let property = Property {
            name,
            kind,
            short_description,
            long_description,
            raw_default,
            default,
        };

        Ok((property, next))
    }

    fn list_entries(&self, open: usize, close: usize, context: &str) -> Result<Vec<ListEntry<'a>>, FgdError> {
        let mut res = vec![];
        let mut index = open + 1;

        while index < close {
            if self.tokens[index].is_newline() {
                index += 1;
                continue;
            }

            let line_end = (index..close)
                .find(|&i| self.tokens[i].is_newline())
                .unwrap_or(close);

            let value = match &self.tokens[index] {
                Token::Word(word) if word == ":" || word == "[" || word == "]" => None,
                token => self.lexed.text(token),
            }
            .ok_or_else(|| FgdError::ExpectedToken {
                expected: "list value",
                context: context.to_string(),
                index,
            })?;

            let fields = (index..line_end)
                .filter(|&i| self.tokens[i].is(":"))
                .map(|colon| {
                    let next = colon + 1;

                    if next < line_end && !self.tokens[next].is(":") {
                        self.text(next)
                    } else {
                        None
                    }
                })
                .collect();

            res.push(ListEntry { value, fields });
            index = line_end;
        }

        Ok(res)
    }
}

/// Resolves a choices default to an index.
///
/// A default matching one choice's value or description picks that choice. An
/// unquoted default matching nothing is read as an index.
fn resolve_choice_default(
    classname: &str,
    property: &str,
    choices: &[Choice],
    raw: &str,
    quoted: bool,
) -> Result<DefaultValue, FgdError> {
    if choices.is_empty() {
        return Ok(DefaultValue::Text(raw.to_string()));
    }

    let matches: Vec<usize> = choices
        .iter()
        .enumerate()
        .filter(|(_, choice)| choice.value == raw || choice.description == raw)
        .map(|(index, _)| index)
        .collect();

    match matches.as_slice() {
        [index] => Ok(DefaultValue::ChoiceIndex(*index)),
        [] if !quoted => match raw.parse::<usize>() {
            Ok(index) if index < choices.len() => Ok(DefaultValue::ChoiceIndex(index)),
            Ok(index) => FgdError::ChoiceIndexOutOfRange {
                classname: classname.to_string(),
                property: property.to_string(),
                index,
                count: choices.len(),
            }
            .to_result(),
            Err(_) => FgdError::UnknownChoiceDefault {
                classname: classname.to_string(),
                property: property.to_string(),
                default: raw.to_string(),
            }
            .to_result(),
        },
        [] => FgdError::UnknownChoiceDefault {
            classname: classname.to_string(),
            property: property.to_string(),
            default: raw.to_string(),
        }
        .to_result(),
        _ => FgdError::AmbiguousChoiceDefault {
            classname: classname.to_string(),
            property: property.to_string(),
            default: raw.to_string(),
        }
        .to_result(),
    }
}
