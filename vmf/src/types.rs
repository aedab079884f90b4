use common::{geometry::plane_from_points, scene::Connection, KeyValues};
use glam::DVec3;
use log::debug;
use serde::Serialize;

use crate::{block::Block, error::VmfError};

pub const WORLDSPAWN: &str = "worldspawn";

/// Texture `u` or `v` axis: `[x y z offset] scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextureAxis {
    pub axis: DVec3,
    /// Pixels.
    pub offset: f64,
    /// World units per pixel.
    pub scale: f64,
}

/// Numbers of a value, ignoring the `()` and `[]` around groups.
pub(crate) fn numbers(key: &str, value: &str) -> Result<Vec<f64>, VmfError> {
    value
        .split(|c: char| c.is_whitespace() || "()[]".contains(c))
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse().map_err(|_| VmfError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn exact_numbers<const N: usize>(key: &str, value: &str) -> Result<[f64; N], VmfError> {
    numbers(key, value)?
        .try_into()
        .map_err(|_| VmfError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn required<'a>(block: &'a Block, name: &'static str, key: &'static str) -> Result<&'a str, VmfError> {
    match block.get(key) {
        Some(value) => Ok(value),
        None => VmfError::MissingKey { block: name, key }.to_result(),
    }
}

fn optional<T: std::str::FromStr>(block: &Block, key: &str, default: T) -> Result<T, VmfError> {
    match block.get(key) {
        Some(value) => value.trim().parse().map_err(|_| VmfError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
        None => Ok(default),
    }
}

impl TextureAxis {
    fn parse(key: &str, value: &str) -> Result<Self, VmfError> {
        let [x, y, z, offset, scale] = exact_numbers(key, value)?;

        Ok(Self {
            axis: DVec3::new(x, y, z),
            offset,
            scale,
        })
    }
}

/// Row layout of the dispinfo grids for one power.
///
/// Power 3 stores `power²` rows where 2 and 4 store `power² + 1`. Compilers
/// read rows positionally, so this is kept as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispDimensions {
    pub normal_rows: usize,
    /// Floats per row, three per vertex.
    pub normal_columns: usize,
    pub distance_rows: usize,
    pub distance_columns: usize,
    pub triangle_tag_rows: usize,
    pub triangle_tag_columns: usize,
}

impl DispDimensions {
    pub fn for_power(power: u32) -> Option<Self> {
        let square = (power * power) as usize;
        let triangle_tag_columns = 2 * 2usize.pow(power);

        match power {
            2 | 4 => Some(Self {
                normal_rows: square + 1,
                normal_columns: (square + 1) * 3,
                distance_rows: square + 1,
                distance_columns: square + 1,
                triangle_tag_rows: square,
                triangle_tag_columns,
            }),
            3 => Some(Self {
                normal_rows: square,
                normal_columns: square * 3,
                distance_rows: square,
                distance_columns: square,
                triangle_tag_rows: square - 1,
                triangle_tag_columns,
            }),
            _ => None,
        }
    }

    pub fn normal_count(&self) -> usize {
        self.normal_rows * self.normal_columns
    }

    pub fn distance_count(&self) -> usize {
        self.distance_rows * self.distance_columns
    }

    pub fn triangle_tag_count(&self) -> usize {
        self.triangle_tag_rows * self.triangle_tag_columns
    }
}

pub const ALLOWED_VERTS_COUNT: usize = 10;
/// No slope, walkable.
pub const DEFAULT_TRIANGLE_TAG: i64 = 9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispInfo {
    pub power: u32,
    pub start_position: DVec3,
    pub flags: i64,
    pub elevation: f64,
    pub subdiv: i64,
    /// Flat rows, see [`DispDimensions`].
    pub normals: Vec<f64>,
    pub distances: Vec<f64>,
    pub offsets: Vec<f64>,
    pub offset_normals: Vec<f64>,
    pub alphas: Vec<f64>,
    pub triangle_tags: Vec<i64>,
    pub allowed_verts: Vec<i64>,
}

impl DispInfo {
    /// Flat displacement with every grid sized for `power`.
    pub fn new(power: u32) -> Result<Self, VmfError> {
        let Some(dimensions) = DispDimensions::for_power(power) else {
            return VmfError::InvalidPower { power }.to_result();
        };

        let normal_count = dimensions.normal_count();
        let distance_count = dimensions.distance_count();

        Ok(Self {
            power,
            start_position: DVec3::ZERO,
            flags: 0,
            elevation: 0.,
            subdiv: 0,
            normals: vec![0.; normal_count],
            distances: vec![0.; distance_count],
            offsets: vec![0.; normal_count],
            offset_normals: [0., 0., 1.].repeat(normal_count / 3),
            alphas: vec![0.; distance_count],
            triangle_tags: vec![DEFAULT_TRIANGLE_TAG; dimensions.triangle_tag_count()],
            allowed_verts: vec![-1; ALLOWED_VERTS_COUNT],
        })
    }

    pub fn dimensions(&self) -> Option<DispDimensions> {
        DispDimensions::for_power(self.power)
    }

    fn from_block(block: &Block) -> Result<Self, VmfError> {
        let power = optional(block, "power", 0u32)?;
        let mut res = Self::new(power)?;

        let Some(dimensions) = res.dimensions() else {
            return VmfError::InvalidPower { power }.to_result();
        };

        let [x, y, z] = exact_numbers("startposition", required(block, "dispinfo", "startposition")?)?;

        res.start_position = DVec3::new(x, y, z);
        res.flags = optional(block, "flags", 0)?;
        res.elevation = optional(block, "elevation", 0.)?;
        res.subdiv = optional(block, "subdiv", 0)?;

        let normal_grid = (dimensions.normal_rows, dimensions.normal_columns);
        let distance_grid = (dimensions.distance_rows, dimensions.distance_columns);

        for (field, grid, values) in [
            ("normals", normal_grid, &mut res.normals),
            ("distances", distance_grid, &mut res.distances),
            ("offsets", normal_grid, &mut res.offsets),
            ("offset_normals", normal_grid, &mut res.offset_normals),
            ("alphas", distance_grid, &mut res.alphas),
        ] {
            if let Some(rows) = read_rows(block, field, grid)? {
                *values = rows;
            }
        }

        let tag_grid = (dimensions.triangle_tag_rows, dimensions.triangle_tag_columns);

        if let Some(rows) = read_rows(block, "triangle_tags", tag_grid)? {
            res.triangle_tags = rows.into_iter().map(|tag| tag as i64).collect();
        }

        if let Some(allowed) = block.child("allowed_verts").and_then(|child| child.get("10")) {
            res.allowed_verts = numbers("10", allowed)?
                .into_iter()
                .map(|vert| vert as i64)
                .collect();
        }

        Ok(res)
    }
}

/// Rows of a grid child from `row0` up, concatenated. They must fill the grid exactly.
fn read_rows(
    block: &Block,
    field: &'static str,
    (rows, columns): (usize, usize),
) -> Result<Option<Vec<f64>>, VmfError> {
    let Some(child) = block.child(field) else {
        debug!("Displacement has no `{field}`, using defaults");
        return Ok(None);
    };

    let mut res = Vec::with_capacity(rows * columns);

    for row in 0.. {
        let key = format!("row{row}");

        match child.get(&key) {
            Some(value) => res.extend(numbers(&key, value)?),
            None => break,
        }
    }

    if res.len() != rows * columns {
        return VmfError::DisplacementSize {
            field,
            expected: rows * columns,
            found: res.len(),
        }
        .to_result();
    }

    Ok(Some(res))
}

pub const DEFAULT_LIGHTMAP_SCALE: i64 = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Side {
    /// Three points on the plane, clockwise seen from outside the solid.
    pub plane: [DVec3; 3],
    pub material: String,
    pub u_axis: TextureAxis,
    pub v_axis: TextureAxis,
    pub rotation: f64,
    pub lightmap_scale: i64,
    pub smoothing_groups: i64,
    pub dispinfo: Option<DispInfo>,
}

impl Side {
    /// Outward unit normal and distance with `normal . p == distance`.
    pub fn plane_equation(&self) -> Option<(DVec3, f64)> {
        let [a, b, c] = self.plane;

        plane_from_points(a, b, c)
    }

    fn from_block(block: &Block) -> Result<Self, VmfError> {
        let [ax, ay, az, bx, by, bz, cx, cy, cz] =
            exact_numbers("plane", required(block, "side", "plane")?)?;

        Ok(Self {
            plane: [
                DVec3::new(ax, ay, az),
                DVec3::new(bx, by, bz),
                DVec3::new(cx, cy, cz),
            ],
            material: required(block, "side", "material")?.to_string(),
            u_axis: TextureAxis::parse("uaxis", required(block, "side", "uaxis")?)?,
            v_axis: TextureAxis::parse("vaxis", required(block, "side", "vaxis")?)?,
            rotation: optional(block, "rotation", 0.)?,
            lightmap_scale: optional(block, "lightmapscale", DEFAULT_LIGHTMAP_SCALE)?,
            smoothing_groups: optional(block, "smoothing_groups", 0)?,
            dispinfo: block
                .child("dispinfo")
                .map(DispInfo::from_block)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Solid {
    pub sides: Vec<Side>,
}

impl Solid {
    fn from_block(block: &Block) -> Result<Self, VmfError> {
        Ok(Self {
            sides: block
                .children_named("side")
                .map(Side::from_block)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Solids of a world or entity block, including those under `hidden`.
fn solids(block: &Block) -> Result<Vec<Solid>, VmfError> {
    block
        .children
        .iter()
        .flat_map(|child| match child.name.as_str() {
            "hidden" => child.children_named("solid").collect(),
            "solid" => vec![child],
            _ => vec![],
        })
        .map(Solid::from_block)
        .collect()
}

/// Keyvalues without the ids the writer assigns.
fn keyvalues(block: &Block, skip: &[&str]) -> KeyValues {
    block
        .keyvalues
        .iter()
        .filter(|(key, _)| !skip.iter().any(|skip| key.eq_ignore_ascii_case(skip)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct World {
    pub keyvalues: KeyValues,
    pub solids: Vec<Solid>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            keyvalues: [
                ("classname", WORLDSPAWN),
                ("detailmaterial", "detail/detailsprites"),
                ("detailvbsp", "detail.vbsp"),
                ("maxpropscreenwidth", "-1"),
                ("skyname", "sky_day01_01"),
            ]
            .into_iter()
            .collect(),
            solids: vec![],
        }
    }
}

impl World {
    fn from_block(block: &Block) -> Result<Self, VmfError> {
        Ok(Self {
            keyvalues: keyvalues(block, &["id", "mapversion"]),
            solids: solids(block)?,
        })
    }
}

/// `target,input,parameter,delay,fire_once`, separated by commas or by ESC in newer files.
fn parse_connection(output: &str, value: &str) -> Result<Connection, VmfError> {
    let separator = if value.contains('\u{1b}') { '\u{1b}' } else { ',' };
    let fields: Vec<&str> = value.split(separator).collect();

    let [target, input, parameter, delay, fire_once] = fields.as_slice() else {
        return VmfError::InvalidConnection {
            output: output.to_string(),
            value: value.to_string(),
        }
        .to_result();
    };

    Ok(Connection {
        output: output.to_string(),
        target: target.to_string(),
        input: input.to_string(),
        parameter: parameter.to_string(),
        delay: delay.to_string(),
        fire_once: fire_once.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entity {
    pub keyvalues: KeyValues,
    pub connections: Vec<Connection>,
    pub solids: Vec<Solid>,
}

impl Entity {
    fn from_block(block: &Block) -> Result<Self, VmfError> {
        let connections = match block.child("connections") {
            Some(child) => child
                .keyvalues
                .iter()
                .map(|(output, value)| parse_connection(output, value))
                .collect::<Result<_, _>>()?,
            None => vec![],
        };

        Ok(Self {
            keyvalues: keyvalues(block, &["id"]),
            connections,
            solids: solids(block)?,
        })
    }

    pub fn classname(&self) -> Option<&str> {
        self.keyvalues.get_ignore_case("classname")
    }

    pub fn is_point_entity(&self) -> bool {
        self.solids.is_empty()
    }

    pub fn origin(&self) -> Option<DVec3> {
        let value = self.keyvalues.get_ignore_case("origin")?;
        let [x, y, z] = exact_numbers("origin", value).ok()?;

        Some(DVec3::new(x, y, z))
    }

    /// `angles` as pitch, yaw and roll.
    pub fn angles(&self) -> Option<DVec3> {
        let value = self.keyvalues.get_ignore_case("angles")?;
        let [pitch, yaw, roll] = exact_numbers("angles", value).ok()?;

        Some(DVec3::new(pitch, yaw, roll))
    }

    /// `angles` as euler degrees about x, y and z.
    pub fn rotation(&self) -> Option<DVec3> {
        self.angles()
            .map(|angles| DVec3::new(angles.z, angles.x, angles.y))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vmf {
    pub world: World,
    pub entities: Vec<Entity>,
}

impl Vmf {
    /// Typed view of parsed blocks. Blocks other than `world` and `entity` are skipped.
    pub fn from_blocks(blocks: &[Block]) -> Result<Self, VmfError> {
        let mut world = None;
        let mut entities = vec![];

        let top_level = blocks.iter().flat_map(|block| match block.name.as_str() {
            "hidden" => block.children.iter().collect(),
            _ => vec![block],
        });

        for block in top_level {
            match block.name.as_str() {
                "world" => {
                    if world.is_some() {
                        return VmfError::MultipleWorlds.to_result();
                    }

                    world = Some(World::from_block(block)?);
                }
                "entity" => entities.push(Entity::from_block(block)?),
                name => debug!("Skipping `{name}` block"),
            }
        }

        let world = world.unwrap_or_else(|| {
            debug!("No world block, using default worldspawn");
            World::default()
        });

        Ok(Self { world, entities })
    }

    pub fn point_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|entity| entity.is_point_entity())
    }

    pub fn brush_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|entity| !entity.is_point_entity())
    }
}
