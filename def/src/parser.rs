use common::tokenizer::{
    check_depth, find_closing, strip_block_comments, strip_line_comments, Lexed, Token,
};
use log::debug;

use crate::{error::DefError, types::EntityDef};

const EDITOR_PREFIX: &str = "editor_";

fn is_bracket(token: &Token) -> bool {
    token.is("{") || token.is("}")
}

/// Parses every `entityDef NAME { key value ... }` of a file. Other declarations are skipped.
pub fn parse_def(text: &str) -> Result<Vec<EntityDef>, DefError> {
    let text = strip_line_comments(text, &['"']);
    let text = strip_block_comments(&text);

    let lexed = Lexed::new(&text, &['"'])?;
    let tokens = lexed.tokens("{}", false);

    check_depth(&tokens, "{", "}", 0, i64::MAX)?;

    let mut res = vec![];
    let mut index = 0;

    while index < tokens.len() {
        if !tokens[index].is_ignore_case("entitydef") {
            index += 1;
            continue;
        }

        let name = tokens
            .get(index + 1)
            .filter(|token| !is_bracket(token))
            .and_then(|token| lexed.text(token))
            .ok_or(DefError::ExpectedToken {
                expected: "name",
                index: index + 1,
            })?;

        if !tokens.get(index + 2).is_some_and(|token| token.is("{")) {
            return DefError::ExpectedToken {
                expected: "`{`",
                index: index + 2,
            }
            .to_result();
        }

        let close = find_closing(&tokens, index + 2, "{", "}").ok_or(DefError::ExpectedToken {
            expected: "`}`",
            index: index + 2,
        })?;

        res.push(entity_def(&lexed, name, &tokens[index + 3..close], index + 3)?);

        index = close + 1;
    }

    Ok(res)
}

fn entity_def(lexed: &Lexed, name: &str, body: &[Token], start: usize) -> Result<EntityDef, DefError> {
    let mut res = EntityDef {
        name: name.to_string(),
        ..Default::default()
    };

    if body.len() % 2 != 0 {
        return DefError::UnpairedKeyValue {
            name: name.to_string(),
        }
        .to_result();
    }

    for (pair_index, pair) in body.chunks(2).enumerate() {
        let text = |offset: usize| {
            Some(&pair[offset])
                .filter(|token| !is_bracket(token))
                .and_then(|token| lexed.text(token))
                .ok_or(DefError::ExpectedToken {
                    expected: "key or value",
                    index: start + pair_index * 2 + offset,
                })
        };

        let key = text(0)?.to_lowercase();
        let value = text(1)?.to_string();

        if !key.starts_with(EDITOR_PREFIX) {
            res.property_mut(&key).value = Some(value);
            continue;
        }

        match key.split_whitespace().collect::<Vec<_>>().as_slice() {
            [tag] => res.editor_tags.insert(*tag, value),
            [tag, key] => {
                let property = res.property_mut(key);

                property.editor_tag = Some(tag.to_string());
                property.editor_description = Some(value);
            }
            [_, _, _] => debug!("Ignoring `{key}` of entityDef `{name}`"),
            _ => {
                return DefError::UnsupportedEditorKey {
                    name: name.to_string(),
                    key: key.clone(),
                }
                .to_result()
            }
        }
    }

    Ok(res)
}
