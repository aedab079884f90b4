//! Untyped `name { "key" "value" child { ... } }` tree.
use common::{quoted_text, tokenizer::strip_line_comments, IResult, KeyValues};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::multispace0,
    combinator::{all_consuming, map},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use serde::Serialize;

use crate::error::VmfError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    /// Lowercase.
    pub name: String,
    /// Duplicate keys are kept, as in `connections`.
    pub keyvalues: KeyValues,
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyvalues.get_ignore_case(key)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child called `name`.
    pub fn child(&self, name: &str) -> Option<&Block> {
        self.children.iter().find(|child| child.name == name)
    }
}

fn ws<'a, T>(f: impl FnMut(&'a str) -> IResult<'a, T>) -> impl FnMut(&'a str) -> IResult<'a, T> {
    preceded(multispace0, f)
}

fn block_name(i: &str) -> IResult<&str> {
    ws(take_while1(|c: char| c.is_alphanumeric() || c == '_'))(i)
}

enum Item<'a> {
    KeyValue(&'a str, &'a str),
    Child(Block),
}

fn item(i: &str) -> IResult<Item> {
    alt((
        map(pair(ws(quoted_text), ws(quoted_text)), |(key, value)| {
            Item::KeyValue(key, value)
        }),
        map(block, Item::Child),
    ))(i)
}

fn block(i: &str) -> IResult<Block> {
    map(
        tuple((
            block_name,
            delimited(
                ws(tag("{")),
                fold_many0(
                    item,
                    || (KeyValues::new(), vec![]),
                    |(mut keyvalues, mut children), item| {
                        match item {
                            Item::KeyValue(key, value) => keyvalues.push(key, value),
                            Item::Child(child) => children.push(child),
                        }

                        (keyvalues, children)
                    },
                ),
                ws(tag("}")),
            ),
        )),
        |(name, (keyvalues, children))| Block {
            name: name.to_lowercase(),
            keyvalues,
            children,
        },
    )(i)
}

fn syntax_error(text: &str, remaining: &str) -> VmfError {
    let remaining = remaining.trim_start();
    let offset = text.len() - remaining.len();

    VmfError::Syntax {
        line: text[..offset].matches('\n').count() + 1,
        near: remaining.lines().next().unwrap_or_default().to_string(),
    }
}

/// Top level blocks of a `.vmf`, in file order.
pub fn parse_blocks(text: &str) -> Result<Vec<Block>, VmfError> {
    let text = strip_line_comments(text, &['"']);

    let res = all_consuming(terminated(many0(block), multispace0))(&text);

    match res {
        Ok((_, blocks)) => Ok(blocks),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(syntax_error(&text, err.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(&text, "")),
    }
}
