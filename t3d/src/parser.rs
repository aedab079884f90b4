//! Line based reader. `Begin`/`End` keywords and keys are case insensitive.
use common::{double, IResult};
use glam::DVec3;
use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1, take_while1},
    character::complete::{char, space0, space1},
    combinator::{all_consuming, map, rest},
    multi::many0,
    sequence::{preceded, separated_pair, terminated, tuple},
};

use crate::{
    error::T3dError,
    types::{Actor, T3dBrush, T3dMap, T3dPolygon},
};

fn attribute(i: &str) -> IResult<(&str, &str)> {
    separated_pair(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        char('='),
        take_till1(|c: char| c.is_whitespace()),
    )(i)
}

/// `Begin <kind> Key=Value ...`
fn begin_line(i: &str) -> IResult<(&str, Vec<(&str, &str)>)> {
    all_consuming(terminated(
        preceded(
            tuple((tag_no_case("begin"), space1)),
            tuple((
                take_while1(|c: char| c.is_alphanumeric() || c == '_'),
                many0(preceded(space1, attribute)),
            )),
        ),
        space0,
    ))(i)
}

fn is_end(line: &str, kind: &str) -> bool {
    let mut words = line.split_whitespace();

    matches!(
        (words.next(), words.next(), words.next()),
        (Some(end), Some(found), None)
            if end.eq_ignore_ascii_case("end") && found.eq_ignore_ascii_case(kind)
    )
}

fn is_any_end(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("end"))
}

/// `Key=Value` actor property, the value runs to the end of the line.
fn property(i: &str) -> IResult<(&str, &str)> {
    all_consuming(separated_pair(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '(' || c == ')'),
        char('='),
        rest,
    ))(i)
}

fn comma_vector(i: &str) -> IResult<DVec3> {
    map(
        tuple((
            double,
            preceded(tuple((space0, char(','))), double),
            preceded(tuple((space0, char(','))), double),
        )),
        |(x, y, z)| DVec3::new(x, y, z),
    )(i)
}

enum PolygonLine {
    Origin(DVec3),
    Normal(DVec3),
    TextureU(DVec3),
    TextureV(DVec3),
    Pan(f64, f64),
    Vertex(DVec3),
}

fn labelled_vector<'a>(
    label: &'static str,
    f: fn(DVec3) -> PolygonLine,
) -> impl FnMut(&'a str) -> IResult<'a, PolygonLine> {
    map(preceded(tag_no_case(label), comma_vector), f)
}

fn polygon_line(i: &str) -> IResult<PolygonLine> {
    all_consuming(terminated(
        alt((
            labelled_vector("origin", PolygonLine::Origin),
            labelled_vector("normal", PolygonLine::Normal),
            labelled_vector("textureu", PolygonLine::TextureU),
            labelled_vector("texturev", PolygonLine::TextureV),
            labelled_vector("vertex", PolygonLine::Vertex),
            map(
                preceded(
                    tag_no_case("pan"),
                    tuple((
                        preceded(tuple((space0, tag_no_case("u"), space0, tag("="))), double),
                        preceded(tuple((space0, tag_no_case("v"), space0, tag("="))), double),
                    )),
                ),
                |(u, v)| PolygonLine::Pan(u, v),
            ),
        )),
        space0,
    ))(i)
}

fn canonical_attribute(key: &str) -> &str {
    match key.to_lowercase().as_str() {
        "texture" => "Texture",
        "item" => "Item",
        "flags" => "Flags",
        "link" => "Link",
        _ => key,
    }
}

/// Trimmed non empty lines with their 1 based line number.
struct Lines<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text
                .lines()
                .enumerate()
                .map(|(index, line)| (index + 1, line.trim()))
                .filter(|(_, line)| !line.is_empty())
                .collect(),
            pos: 0,
        }
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let res = self.lines.get(self.pos).copied();
        self.pos += 1;
        res
    }

    fn unclosed(block: &str, line: usize) -> T3dError {
        T3dError::Unclosed {
            block: block.to_string(),
            line,
        }
    }

    /// Skips to the `End` closing a block whose `Begin` was just read.
    fn skip_block(&mut self, kind: &str, start: usize) -> Result<(), T3dError> {
        debug!("Skipping `Begin {kind}` at line {start}");

        let mut depth = 1;

        while let Some((_, line)) = self.next() {
            if begin_line(line).is_ok() {
                depth += 1;
            } else if is_any_end(line) {
                depth -= 1;

                if depth == 0 {
                    return Ok(());
                }
            }
        }

        Err(Self::unclosed(kind, start))
    }

    fn polygon(&mut self, attributes: Vec<(&str, &str)>, start: usize) -> Result<T3dPolygon, T3dError> {
        let mut res = T3dPolygon {
            attributes: attributes
                .into_iter()
                .map(|(key, value)| (canonical_attribute(key), value))
                .collect(),
            ..Default::default()
        };

        while let Some((number, line)) = self.next() {
            if is_end(line, "polygon") {
                return Ok(res);
            }

            let Ok((_, parsed)) = polygon_line(line) else {
                return T3dError::Syntax {
                    line: number,
                    text: line.to_string(),
                }
                .to_result();
            };

            match parsed {
                PolygonLine::Origin(origin) => res.origin = origin,
                PolygonLine::Normal(normal) => res.normal = normal,
                PolygonLine::TextureU(u) => res.texture_u = u,
                PolygonLine::TextureV(v) => res.texture_v = v,
                PolygonLine::Pan(u, v) => {
                    res.pan_u = u.trunc() as i64;
                    res.pan_v = v.trunc() as i64;
                }
                PolygonLine::Vertex(vertex) => res.vertices.push(vertex),
            }
        }

        Err(Self::unclosed("Polygon", start))
    }

    fn poly_list(&mut self, start: usize) -> Result<Vec<T3dPolygon>, T3dError> {
        let mut res = vec![];

        while let Some((number, line)) = self.next() {
            if is_end(line, "polylist") {
                return Ok(res);
            }

            match begin_line(line) {
                Ok((_, (kind, attributes))) if kind.eq_ignore_ascii_case("polygon") => {
                    res.push(self.polygon(attributes, number)?)
                }
                Ok((_, (kind, _))) => self.skip_block(kind, number)?,
                Err(_) => debug!("Ignoring line {number} in poly list: `{line}`"),
            }
        }

        Err(Self::unclosed("PolyList", start))
    }

    fn brush(&mut self, attributes: Vec<(&str, &str)>, start: usize) -> Result<T3dBrush, T3dError> {
        let mut res = T3dBrush {
            name: attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("name"))
                .map(|(_, name)| name.to_string())
                .unwrap_or_default(),
            polygons: vec![],
        };

        while let Some((number, line)) = self.next() {
            if is_end(line, "brush") {
                return Ok(res);
            }

            match begin_line(line) {
                Ok((_, (kind, _))) if kind.eq_ignore_ascii_case("polylist") => {
                    res.polygons.extend(self.poly_list(number)?)
                }
                Ok((_, (kind, _))) => self.skip_block(kind, number)?,
                Err(_) => debug!("Ignoring line {number} in brush: `{line}`"),
            }
        }

        Err(Self::unclosed("Brush", start))
    }

    fn actor(&mut self, attributes: Vec<(&str, &str)>, start: usize) -> Result<Actor, T3dError> {
        let mut res = Actor::default();

        for (key, value) in attributes {
            match key.to_lowercase().as_str() {
                "class" => res.class = value.to_string(),
                "name" => res.name = value.to_string(),
                key => res.keyvalues.push(key, value),
            }
        }

        while let Some((number, line)) = self.next() {
            if is_end(line, "actor") {
                return Ok(res);
            }

            if let Ok((_, (kind, attributes))) = begin_line(line) {
                if kind.eq_ignore_ascii_case("brush") {
                    res.brushes.push(self.brush(attributes, number)?);
                } else {
                    self.skip_block(kind, number)?;
                }

                continue;
            }

            let Ok((_, (key, value))) = property(line) else {
                return T3dError::Syntax {
                    line: number,
                    text: line.to_string(),
                }
                .to_result();
            };

            let key = key.to_lowercase();

            // written back from the brush name
            if key == "brush" && !res.brushes.is_empty() {
                continue;
            }

            res.keyvalues.push(key, value);
        }

        Err(Self::unclosed("Actor", start))
    }
}

/// Reads a whole `Begin Map` ... `End Map` document.
pub fn parse_t3d(text: &str) -> Result<T3dMap, T3dError> {
    let mut lines = Lines::new(text);

    match lines.lines.first() {
        Some((_, line)) if line.to_lowercase().starts_with("begin map") => {}
        _ => return T3dError::MissingBeginMap.to_result(),
    }

    match lines.lines.last() {
        Some((_, line)) if is_end(line, "map") => {}
        _ => return T3dError::MissingEndMap.to_result(),
    }

    let last = lines.lines.len() - 1;
    lines.lines.truncate(last);
    lines.pos = 1;

    let mut actors = vec![];

    while let Some((number, line)) = lines.next() {
        match begin_line(line) {
            Ok((_, (kind, attributes))) if kind.eq_ignore_ascii_case("actor") => {
                actors.push(lines.actor(attributes, number)?)
            }
            Ok((_, (kind, _))) => lines.skip_block(kind, number)?,
            Err(_) => debug!("Ignoring line {number}: `{line}`"),
        }
    }

    Ok(T3dMap { actors })
}
