use common::{double_ws, quoted_text, scene::PatchVertex, tokenizer::strip_line_comments, IResult};
use glam::{DVec2, DVec3};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1},
    character::complete::{digit1, multispace0, u32 as _u32},
    combinator::{all_consuming, map, verify},
    multi::{count, fold_many0, many0},
    sequence::{delimited, preceded, terminated, tuple},
};

use crate::{
    error::MapError,
    types::{Brush, BrushPlane, Map, MapEntity, MapPrimitive, PatchDef},
};

fn ws<'a, T>(f: impl FnMut(&'a str) -> IResult<'a, T>) -> impl FnMut(&'a str) -> IResult<'a, T> {
    preceded(multispace0, f)
}

fn symbol<'a>(s: &'static str) -> impl FnMut(&'a str) -> IResult<'a, &'a str> {
    ws(tag(s))
}

fn parenthesized<'a, T>(
    f: impl FnMut(&'a str) -> IResult<'a, T>,
) -> impl FnMut(&'a str) -> IResult<'a, T> {
    delimited(symbol("("), f, symbol(")"))
}

fn vec3(i: &str) -> IResult<DVec3> {
    map(tuple((double_ws, double_ws, double_ws)), |(x, y, z)| {
        DVec3::new(x, y, z)
    })(i)
}

// Quoted, or a bare word in older files.
fn material(i: &str) -> IResult<String> {
    map(
        ws(alt((
            quoted_text,
            take_till1(|c: char| c.is_whitespace() || c == '"'),
        ))),
        str::to_string,
    )(i)
}

// ( nx ny nz d ) ( ( a b c ) ( d e f ) ) "material" 0 0 0
fn brush_plane(i: &str) -> IResult<BrushPlane> {
    map(
        tuple((
            parenthesized(tuple((vec3, double_ws))),
            parenthesized(tuple((parenthesized(vec3), parenthesized(vec3)))),
            material,
            double_ws,
            double_ws,
            double_ws,
        )),
        |((normal, distance), (row0, row1), material, _, _, _)| BrushPlane {
            normal,
            distance,
            uv_rows: [row0, row1],
            material,
        },
    )(i)
}

fn brush(i: &str) -> IResult<Brush> {
    map(
        preceded(
            ws(tag_no_case("brushDef3")),
            delimited(symbol("{"), many0(brush_plane), symbol("}")),
        ),
        |planes| Brush { planes },
    )(i)
}

// ( x y z u v )
fn patch_vertex(i: &str) -> IResult<PatchVertex> {
    map(
        parenthesized(tuple((vec3, double_ws, double_ws))),
        |(position, u, v)| PatchVertex {
            position,
            uv: DVec2::new(u, v),
        },
    )(i)
}

fn patch_size(i: &str) -> IResult<u32> {
    ws(verify(_u32, |size: &u32| *size > 0))(i)
}

fn patch(i: &str) -> IResult<PatchDef> {
    let (i, is_patchdef3) = ws(alt((
        map(tag_no_case("patchDef2"), |_| false),
        map(tag_no_case("patchDef3"), |_| true),
    )))(i)?;

    let (i, _) = symbol("{")(i)?;
    let (i, material) = material(i)?;
    let (i, _) = symbol("(")(i)?;
    let (i, (width, height)) = tuple((patch_size, patch_size))(i)?;

    let (i, subdivisions) = if is_patchdef3 {
        map(tuple((ws(_u32), ws(_u32))), Some)(i)?
    } else {
        (i, None)
    };

    let (i, _) = tuple((double_ws, double_ws, double_ws, symbol(")")))(i)?;

    // size is known before any vertex is read
    let (width, height) = (width as usize, height as usize);

    let (i, rows) = parenthesized(count(
        parenthesized(count(patch_vertex, height)),
        width,
    ))(i)?;

    let (i, _) = symbol("}")(i)?;

    Ok((
        i,
        PatchDef {
            material,
            width,
            height,
            subdivisions,
            vertices: rows.into_iter().flatten().collect(),
        },
    ))
}

fn primitive(i: &str) -> IResult<MapPrimitive> {
    delimited(
        symbol("{"),
        alt((map(brush, MapPrimitive::Brush), map(patch, MapPrimitive::Patch))),
        symbol("}"),
    )(i)
}

enum EntityItem<'a> {
    KeyValue(&'a str, &'a str),
    Primitive(MapPrimitive),
}

fn entity_item(i: &str) -> IResult<EntityItem> {
    alt((
        map(tuple((ws(quoted_text), ws(quoted_text))), |(key, value)| {
            EntityItem::KeyValue(key, value)
        }),
        map(primitive, EntityItem::Primitive),
    ))(i)
}

fn entity(i: &str) -> IResult<MapEntity> {
    delimited(
        symbol("{"),
        fold_many0(entity_item, MapEntity::default, |mut entity, item| {
            match item {
                EntityItem::KeyValue(key, value) => {
                    entity.keyvalues.insert(key.to_lowercase(), value)
                }
                EntityItem::Primitive(primitive) => entity.primitives.push(primitive),
            }

            entity
        }),
        symbol("}"),
    )(i)
}

fn version(i: &str) -> IResult<&str> {
    preceded(
        ws(tag_no_case("Version")),
        ws(verify(digit1, |version: &str| version == "2")),
    )(i)
}

fn syntax_error(text: &str, remaining: &str) -> MapError {
    let remaining = remaining.trim_start();
    let offset = text.len() - remaining.len();

    MapError::Syntax {
        line: text[..offset].matches('\n').count() + 1,
        near: remaining.lines().next().unwrap_or_default().to_string(),
    }
}

/// Entities of an idTech4 `.map`, in file order.
pub fn parse_map(text: &str) -> Result<Map, MapError> {
    let text = strip_line_comments(text, &['"']);

    let Ok((rest, _)) = version(&text) else {
        return MapError::MissingVersion.to_result();
    };

    let res = all_consuming(terminated(many0(entity), multispace0))(rest);

    match res {
        Ok((_, entities)) => Ok(Map { entities }),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(syntax_error(&text, err.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(&text, "")),
    }
}
