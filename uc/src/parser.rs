use std::path::Path;

use common::{
    parse_value,
    tokenizer::{strip_block_comments, strip_line_comments, Lexed, Piece, Token},
    KeyValues,
};
use glam::DVec3;
use log::debug;

use crate::{
    defaults::{block_units, parse_assignments},
    error::UcError,
    types::{StaticMesh, UnrealClass, UnrealEnum, UnrealStruct, UnrealVar},
};

const QUOTES: [char; 2] = ['"', '\''];
const SYMBOLS: &str = "{}[]();,?<>";

/// Byte rotator units to degrees.
const TO_DEGREES: f64 = 180. / 128.;

const VARIABLE_SPECIFIERS: [&str; 14] = [
    "const",
    "editconst",
    "input",
    "transient",
    "native",
    "private",
    "protected",
    "travel",
    "skip",
    "export",
    "local",
    "config",
    "localized",
    "globalconfig",
];

/// Words that cannot start a list of variable names.
const KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "do", "until", "while", "switch", "case", "default",
    "continue", "goto", "break", "return", "true", "false", "class", "extends", "expands",
    "struct", "enum", "replication", "unreliable", "defaultproperties", "abstract", "native",
    "noexport", "var", "void", "bool", "byte", "int", "float", "string", "name", "object",
    "texture", "mesh", "model", "sound", "music", "iterator", "const", "editconst", "input",
    "transient", "private", "protected", "travel", "skip", "export", "local", "config",
    "localized", "globalconfig", "function", "event", "delegate", "operator", "preoperator",
    "postoperator", "state", "out", "optional",
];

/// Package and lowercase class name from `PACKAGE/Classes/CLASS.uc`.
pub fn class_location(path: &Path) -> Result<(String, String), UcError> {
    let missing = || UcError::MissingPackage {
        path: path.to_path_buf(),
    };

    let classname = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(missing)?
        .to_lowercase();

    let classes = path.parent().ok_or_else(missing)?;

    let is_classes = classes
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case("classes"));

    if !is_classes {
        return missing().to_result();
    }

    let package = classes
        .parent()
        .and_then(|package| package.file_name())
        .and_then(|name| name.to_str())
        .ok_or_else(missing)?
        .to_lowercase();

    Ok((package, classname))
}

/// Removes `#` directive lines, returning them split into lowercase tokens.
fn split_preprocessor(text: &str) -> (String, Vec<Vec<String>>) {
    let mut res = String::with_capacity(text.len());
    let mut directives = vec![];

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if !trimmed.starts_with('#') {
            res.push_str(line);
            continue;
        }

        let mut tokens = vec![];
        let mut token = String::new();
        let mut in_quote = false;

        for c in trimmed.chars() {
            if c.is_whitespace() && !in_quote {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token).to_lowercase());
                }
            } else {
                if c == '"' {
                    in_quote = !in_quote;
                }

                token.push(c);
            }
        }

        if !token.is_empty() {
            tokens.push(token.to_lowercase());
        }

        directives.push(tokens);
        res.push('\n');
    }

    (res, directives)
}

/// Splits on `;`, lowercasing words. Empty statements are kept.
fn statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut res = vec![vec![]];

    for token in tokens {
        if token.is(";") {
            res.push(vec![]);
            continue;
        }

        let token = match token {
            Token::Word(word) => Token::Word(word.to_lowercase()),
            other => other,
        };

        if let Some(statement) = res.last_mut() {
            statement.push(token);
        }
    }

    res
}

fn position(tokens: &[Token], word: &str) -> Option<usize> {
    tokens.iter().position(|token| token.is(word))
}

fn contains(tokens: &[Token], word: &str) -> bool {
    position(tokens, word).is_some()
}

struct VarAttributes {
    editor_visible: bool,
    editor_category: Option<String>,
    editconst: bool,
}

struct Parser<'a> {
    lexed: &'a Lexed,
}

impl Parser<'_> {
    fn statement_text(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|token| match token {
                Token::Block(_) => "{...}",
                other => self.lexed.text(other).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn expected(&self, expected: &'static str, tokens: &[Token]) -> UcError {
        UcError::ExpectedToken {
            expected,
            statement: self.statement_text(tokens),
        }
    }

    /// `class NAME extends PARENT ...`
    fn class_header(&self, tokens: &[Token]) -> Result<(String, Option<String>), UcError> {
        let class = position(tokens, "class").ok_or(UcError::MissingClassDeclaration)?;

        let classname = tokens
            .get(class + 1)
            .and_then(Token::word)
            .ok_or_else(|| self.expected("class name", tokens))?
            .to_string();

        let parent = ["extends", "expands"]
            .into_iter()
            .find_map(|keyword| position(tokens, keyword))
            .map(|index| {
                tokens
                    .get(index + 1)
                    .and_then(Token::word)
                    .map(str::to_string)
                    .ok_or_else(|| self.expected("parent class", tokens))
            })
            .transpose()?;

        Ok((classname, parent))
    }

    fn var_attributes(&self, tokens: &[Token]) -> VarAttributes {
        let open = position(tokens, "(");
        let close = position(tokens, ")");

        let (editor_visible, editor_category) = match (open, close) {
            (Some(open), Some(close)) => {
                let category = (close > open + 1)
                    .then(|| tokens.get(open + 1))
                    .flatten()
                    .and_then(|token| self.lexed.text(token))
                    .map(str::to_lowercase);

                (true, category)
            }
            _ => (false, None),
        };

        VarAttributes {
            editor_visible,
            editor_category,
            editconst: contains(tokens, "editconst"),
        }
    }

    /// `var(CATEGORY) SPECIFIERS TYPE NAME[N], NAME, ...`
    fn var(&self, tokens: &[Token]) -> Result<Vec<UnrealVar>, UcError> {
        let attributes = self.var_attributes(tokens);

        let last_specifier = tokens.iter().rposition(|token| {
            token
                .word()
                .is_some_and(|word| VARIABLE_SPECIFIERS.contains(&word))
        });

        let type_index = match (last_specifier, position(tokens, ")"), position(tokens, "var")) {
            (Some(specifier), _, _) => specifier + 1,
            (None, Some(close), _) if attributes.editor_visible => close + 1,
            (None, _, Some(var)) => var + 1,
            _ => return self.expected("var", tokens).to_result(),
        };

        let mut type_name = tokens
            .get(type_index)
            .and_then(Token::word)
            .ok_or_else(|| self.expected("variable type", tokens))?
            .to_string();
        let mut names_start = type_index + 1;

        // class<actor>, array<class<actor>>
        let is_parametrized = (type_name == "class" || type_name == "array")
            && tokens.get(type_index + 1).is_some_and(|token| token.is("<"));

        if is_parametrized {
            let mut depth = 0usize;

            for token in &tokens[type_index + 1..] {
                let word = token.word().unwrap_or_default();

                type_name.push_str(word);
                names_start += 1;

                if word == "<" {
                    depth += 1;
                } else if word == ">" {
                    depth -= 1;

                    if depth == 0 {
                        break;
                    }
                }
            }

            if depth != 0 {
                return UcError::UnclosedTypeBracket {
                    statement: self.statement_text(tokens),
                }
                .to_result();
            }
        }

        self.var_names(&tokens[names_start.min(tokens.len())..], &type_name, &attributes)
    }

    /// `NAME[N], NAME, ...` declared with `type_name`.
    fn var_names(
        &self,
        tokens: &[Token],
        type_name: &str,
        attributes: &VarAttributes,
    ) -> Result<Vec<UnrealVar>, UcError> {
        let mut res = vec![];

        for group in tokens.split(|token| token.is(",")) {
            let Some(name) = group.first().and_then(Token::word) else {
                continue;
            };

            let length = match position(group, "[") {
                Some(open) => {
                    let length = group
                        .get(open + 1)
                        .and_then(Token::word)
                        .ok_or_else(|| self.expected("array length", tokens))?;

                    Some(parse_value(length, "array length")?)
                }
                None => None,
            };

            res.push(UnrealVar {
                name: name.to_string(),
                type_name: type_name.to_lowercase(),
                length,
                editor_visible: attributes.editor_visible,
                editor_category: attributes.editor_category.clone(),
                editconst: attributes.editconst,
            });
        }

        Ok(res)
    }

    /// Variables declared after a struct or enum body, e.g. `} Color, Other;`.
    fn trailing_vars(
        &self,
        next: Option<&Vec<Token>>,
        type_name: &str,
        attributes: &VarAttributes,
    ) -> Result<Vec<UnrealVar>, UcError> {
        let Some(next) = next.filter(|next| !next.is_empty()) else {
            return Ok(vec![]);
        };

        let has_keyword = next
            .iter()
            .any(|token| token.word().is_some_and(|word| KEYWORDS.contains(&word)));

        if has_keyword {
            return Ok(vec![]);
        }

        self.var_names(next, type_name, attributes)
    }

    /// `struct NAME { var TYPE NAME; ... } VARS`, with `tokens` starting at `struct`.
    fn structure(
        &self,
        tokens: &[Token],
        next: Option<&Vec<Token>>,
        attributes: &VarAttributes,
    ) -> Result<(UnrealStruct, Vec<UnrealVar>), UcError> {
        let name = tokens
            .get(1)
            .and_then(Token::word)
            .ok_or_else(|| self.expected("struct name", tokens))?
            .to_string();

        let mut variables: Vec<UnrealVar> = vec![];

        if let Some(block) = tokens.iter().find_map(Token::block) {
            for statement in statements(self.lexed.block_tokens(block, SYMBOLS, false)) {
                if contains(&statement, "enum") || contains(&statement, "struct") {
                    debug!("Skipping type declared inside struct `{name}`");
                    continue;
                }

                if !contains(&statement, "var") {
                    continue;
                }

                for var in self.var(&statement)? {
                    match variables.iter_mut().find(|other| other.name == var.name) {
                        Some(existing) => *existing = var,
                        None => variables.push(var),
                    }
                }
            }
        }

        let vars = self.trailing_vars(next, &name, attributes)?;

        Ok((UnrealStruct { name, variables }, vars))
    }

    /// `enum NAME { A, B, ... } VARS`, with `tokens` starting at `enum`.
    fn enumeration(
        &self,
        tokens: &[Token],
        next: Option<&Vec<Token>>,
        attributes: &VarAttributes,
    ) -> Result<(UnrealEnum, Vec<UnrealVar>), UcError> {
        let name = tokens
            .get(1)
            .and_then(Token::word)
            .ok_or_else(|| self.expected("enum name", tokens))?
            .to_string();

        let values = tokens
            .iter()
            .find_map(Token::block)
            .map(|block| {
                self.lexed
                    .block_tokens(block, SYMBOLS, false)
                    .iter()
                    .filter_map(Token::word)
                    .filter(|word| *word != ",")
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default();

        let vars = self.trailing_vars(next, &name, attributes)?;

        Ok((UnrealEnum { name, values }, vars))
    }

    fn default_properties(&self, tokens: &[Token]) -> KeyValues {
        let mut res = KeyValues::new();

        let Some(pieces) = tokens
            .iter()
            .find_map(Token::block)
            .and_then(|block| self.lexed.block(block))
        else {
            return res;
        };

        let units = block_units(pieces, |piece| match piece {
            Piece::Quote(id) => self.lexed.quote(*id).map(str::to_string),
            _ => None,
        });

        for (name, value) in parse_assignments(units, |c| c == ';') {
            res.insert(name, value);
        }

        res
    }
}

fn add_vars(variables: &mut Vec<UnrealVar>, vars: Vec<UnrealVar>) {
    for var in vars {
        match variables.iter_mut().find(|other| other.name == var.name) {
            Some(existing) => *existing = var,
            None => variables.push(var),
        }
    }
}

/// Parses one `.uc` file stored as `PACKAGE/Classes/CLASS.uc`.
///
/// Inheritance is left unresolved.
pub fn parse_uc(text: &str, path: impl AsRef<Path>) -> Result<UnrealClass, UcError> {
    let (package, file_classname) = class_location(path.as_ref())?;

    let text = strip_line_comments(text, &QUOTES);
    let (text, preprocessor) = split_preprocessor(&text);
    let text = strip_block_comments(&text);

    let mut lexed = Lexed::new(&text, &QUOTES)?;
    lexed.extract_blocks(";")?;

    let statements = statements(lexed.tokens(SYMBOLS, false));
    let parser = Parser { lexed: &lexed };

    let mut header = None;
    let mut variables = vec![];
    let mut structs: Vec<UnrealStruct> = vec![];
    let mut enums: Vec<UnrealEnum> = vec![];
    let mut default_properties = KeyValues::new();

    for (index, statement) in statements.iter().enumerate() {
        if statement.is_empty() {
            continue;
        }

        if header.is_none() {
            let (classname, parent) = parser.class_header(statement)?;

            if classname != file_classname {
                return UcError::ClassNameMismatch {
                    file_classname,
                    classname,
                }
                .to_result();
            }

            header = Some(parent);
            continue;
        }

        let next = statements.get(index + 1);
        let struct_index = position(statement, "struct");
        let enum_index = position(statement, "enum");

        if contains(statement, "var") || struct_index.is_some() || enum_index.is_some() {
            let attributes = parser.var_attributes(statement);

            if let Some(start) = struct_index {
                let (declared, vars) = parser.structure(&statement[start..], next, &attributes)?;

                structs.retain(|other| other.name != declared.name);
                structs.push(declared);
                add_vars(&mut variables, vars);
            } else if let Some(start) = enum_index {
                let (declared, vars) = parser.enumeration(&statement[start..], next, &attributes)?;

                enums.retain(|other| other.name != declared.name);
                enums.push(declared);
                add_vars(&mut variables, vars);
            } else {
                add_vars(&mut variables, parser.var(statement)?);
            }
        } else if contains(statement, "defaultproperties") {
            for (name, value) in parser.default_properties(statement).0 {
                default_properties.insert(name, value);
            }
        }
    }

    let Some(parent) = header else {
        return UcError::MissingClassDeclaration.to_result();
    };

    let mut class = UnrealClass {
        package,
        classname: file_classname,
        parent,
        variables,
        structs,
        enums,
        default_properties,
        preprocessor,
        static_mesh: None,
        inheritance_chain: vec![],
        all_variables: vec![],
        all_default_properties: KeyValues::new(),
    };

    class.static_mesh = static_mesh(&class)?;

    Ok(class)
}

/// Mesh from `#exec mesh import`, placed by `#exec mesh origin` and `#exec meshmap scale`.
fn static_mesh(class: &UnrealClass) -> Result<Option<StaticMesh>, UcError> {
    let import = class.exec("mesh", "import");
    let origin = class.exec("mesh", "origin");
    let scale = class.exec("meshmap", "scale");

    let mut names: Vec<String> = vec![];

    for name in [
        import.as_ref().and_then(|kv| kv.get("mesh")),
        origin.as_ref().and_then(|kv| kv.get("mesh")),
        scale.as_ref().and_then(|kv| kv.get("meshmap")),
    ]
    .into_iter()
    .flatten()
    {
        if !names.iter().any(|other| other == name) {
            names.push(name.to_string());
        }
    }

    if names.len() > 1 {
        return UcError::MeshNameConflict {
            classname: class.classname.clone(),
            names,
        }
        .to_result();
    }

    let Some(name) = import.as_ref().and_then(|kv| kv.get("mesh")) else {
        return Ok(None);
    };

    let number = |kv: &Option<KeyValues>, key: &str, default: f64| -> Result<f64, UcError> {
        match kv.as_ref().and_then(|kv| kv.get(key)) {
            Some(value) => Ok(parse_value(value, "number")?),
            None => Ok(default),
        }
    };

    let rotation = DVec3::new(
        number(&origin, "roll", 0.)?,
        number(&origin, "pitch", 0.)?,
        number(&origin, "yaw", 0.)?,
    );

    Ok(Some(StaticMesh {
        unreal_path: format!("{}.{}", class.unreal_path(), name),
        name: name.to_string(),
        origin: DVec3::new(
            number(&origin, "x", 0.)?,
            number(&origin, "y", 0.)?,
            number(&origin, "z", 0.)?,
        ),
        rotation,
        rotation_degrees: rotation * TO_DEGREES,
        scale: DVec3::new(
            number(&scale, "x", 1.)?,
            number(&scale, "y", 1.)?,
            number(&scale, "z", 1.)?,
        ),
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    const PATH: &str = "UnrealShare/Classes/Flag.uc";

    const FLAG: &str = r#"//=============================================================================
// Flag.
//=============================================================================
class Flag extends Decoration
	native;

#exec MESH IMPORT MESH=Flag1M ANIVFILE=MODELS\flag1_a.3d DATAFILE=MODELS\flag1_d.3d X=0 Y=0 Z=0
#exec MESH ORIGIN MESH=Flag1M X=0 Y=100 Z=-120 YAW=64 PITCH=0 ROLL=-64
#exec MESHMAP SCALE MESHMAP=Flag1M X=0.1 Y=0.1 Z=0.2

/* an enum with
   a multiline comment */
var(Display) enum EWaveStyle
{
	WAVE_Calm,
	WAVE_Storm, // windy
} WaveStyle;

struct FlagColor
{
	var() byte R, G, B;
	var int Weights[4];
};

var(Flag) float Health, Armor;
var(Flag) editconst string Owner;
var int Hidden;
var() class<Actor> SpawnClass;
var FlagColor Colors[2];

function Tick(float DeltaTime)
{
	local int i;
	if (i > 0) { Health = 1; }
}

defaultproperties
{
	Health=100.000000
	WaveStyle=WAVE_Storm
	Colors(0)=(R=255, G=0, B=0)
	Owner="Nobody // at all"
	Texture=Texture'UnrealShare.Flag1'
}
"#;

    #[test]
    fn class_header_and_vars() {
        let class = parse_uc(FLAG, PATH).unwrap();

        assert_eq!(class.package, "unrealshare");
        assert_eq!(class.classname, "flag");
        assert_eq!(class.unreal_path(), "unrealshare.flag");
        assert_eq!(class.parent.as_deref(), Some("decoration"));

        let names: Vec<&str> = class.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["wavestyle", "health", "armor", "owner", "hidden", "spawnclass", "colors"]
        );

        let health = class.variable("Health").unwrap();
        assert_eq!(health.type_name, "float");
        assert!(health.is_editable());
        assert_eq!(health.editor_category.as_deref(), Some("flag"));

        let owner = class.variable("owner").unwrap();
        assert!(owner.editor_visible);
        assert!(!owner.is_editable());

        assert!(!class.variable("hidden").unwrap().editor_visible);

        let spawn = class.variable("spawnclass").unwrap();
        assert_eq!(spawn.type_name, "class<actor>");
        assert!(spawn.editor_visible);
        assert_eq!(spawn.editor_category, None);

        let colors = class.variable("colors").unwrap();
        assert_eq!(colors.type_name, "flagcolor");
        assert_eq!(colors.length, Some(2));

        let wave = class.variable("wavestyle").unwrap();
        assert_eq!(wave.type_name, "ewavestyle");
        assert!(wave.editor_visible);
    }

    #[test]
    fn structs_and_enums() {
        let class = parse_uc(FLAG, PATH).unwrap();

        assert_eq!(class.enums.len(), 1);
        assert_eq!(class.enums[0].name, "ewavestyle");
        assert_eq!(class.enums[0].values, vec!["wave_calm", "wave_storm"]);
        assert_eq!(class.enums[0].index_of("WAVE_Storm"), Some(1));

        assert_eq!(class.structs.len(), 1);

        let color = &class.structs[0];
        assert_eq!(color.name, "flagcolor");
        assert_eq!(
            color.variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            vec!["r", "g", "b", "weights"]
        );
        assert_eq!(color.variables[3].length, Some(4));
    }

    #[test]
    fn default_properties_block() {
        let class = parse_uc(FLAG, PATH).unwrap();
        let defaults = &class.default_properties;

        assert_eq!(defaults.get("health"), Some("100.000000"));
        assert_eq!(defaults.get("wavestyle"), Some("wave_storm"));
        assert_eq!(defaults.get("colors(0)"), Some("(r=255,g=0,b=0)"));
        assert_eq!(defaults.get("owner"), Some("'Nobody // at all'"));
        assert_eq!(defaults.get("texture"), Some("texture'UnrealShare.Flag1'"));
    }

    #[test]
    fn mesh_directives() {
        let class = parse_uc(FLAG, PATH).unwrap();
        let mesh = class.static_mesh.unwrap();

        assert_eq!(mesh.name, "flag1m");
        assert_eq!(mesh.unreal_path, "unrealshare.flag.flag1m");
        assert_eq!(mesh.origin, DVec3::new(0., 100., -120.));
        assert_eq!(mesh.rotation, DVec3::new(-64., 0., 64.));
        assert_eq!(mesh.rotation_degrees, DVec3::new(-90., 0., 90.));
        assert_eq!(mesh.scale, DVec3::new(0.1, 0.1, 0.2));
    }

    #[test]
    fn mesh_name_conflict() {
        let text = "#exec mesh import mesh=a\n#exec meshmap scale meshmap=b x=1\nclass Thing extends Actor;";

        assert!(matches!(
            parse_uc(text, "Pkg/Classes/Thing.uc"),
            Err(UcError::MeshNameConflict { .. })
        ));
    }

    #[test]
    fn location_errors() {
        assert!(matches!(
            parse_uc("class Thing;", "Pkg/Thing.uc"),
            Err(UcError::MissingPackage { .. })
        ));
        assert!(matches!(
            parse_uc("class Other extends Actor;", "Pkg/Classes/Thing.uc"),
            Err(UcError::ClassNameMismatch { .. })
        ));
        assert!(matches!(
            parse_uc("var int x;", "Pkg/Classes/Thing.uc"),
            Err(UcError::MissingClassDeclaration)
        ));
        assert!(parse_uc("class Thing; var class<Actor Broken;", "Pkg/Classes/Thing.uc").is_err());
    }

    #[test]
    fn class_without_parent() {
        let class = parse_uc("class Object\n\tnative;\nvar native int ObjectIndex;", "Core/classes/Object.uc")
            .unwrap();

        assert_eq!(class.package, "core");
        assert_eq!(class.parent, None);
        assert_eq!(class.variables[0].name, "objectindex");
        assert!(class.static_mesh.is_none());
    }
}
