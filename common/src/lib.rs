use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{multispace0, space0},
    combinator::map,
    multi::many0,
    number::complete::double as _double,
    sequence::{preceded, terminated, tuple},
    IResult as _IResult,
};

pub mod error;
pub mod files;
pub mod geometry;
pub mod image;
pub mod keyvalues;
pub mod metadata;
pub mod path;
pub mod scene;
pub mod tokenizer;
pub mod unreal;
pub mod writer;

pub use error::CommonError;
pub use keyvalues::KeyValues;

pub type IResult<'a, T> = _IResult<&'a str, T>;

/// Float after optional whitespace on the same line.
pub fn double(i: &str) -> IResult<f64> {
    preceded(space0, _double)(i)
}

/// Float after any whitespace, newlines included.
pub fn double_ws(i: &str) -> IResult<f64> {
    preceded(multispace0, _double)(i)
}

pub fn quoted_text(i: &str) -> IResult<&str> {
    terminated(preceded(tag("\""), take_till(|c| c == '"')), tag("\""))(i)
}

fn take_comment_line(i: &str) -> IResult<&str> {
    terminated(
        preceded(tuple((space0, tag("//"))), take_till(|c| c == '\n')),
        multispace0,
    )(i)
}

/// Skips whitespace and any number of `//` comment lines.
pub fn discard_comment_lines(i: &str) -> IResult<()> {
    preceded(multispace0, map(many0(take_comment_line), |_| ()))(i)
}

/// Parses a token as `T`, naming the expected kind on failure.
pub fn parse_value<T: std::str::FromStr>(
    value: &str,
    expected: &'static str,
) -> Result<T, CommonError> {
    value.parse().map_err(|_| CommonError::ParseValue {
        value: value.to_string(),
        expected,
    })
}
