//! In-memory level description consumed by the exporters.
//!
//! A scene is authored for one target engine: class names, key values,
//! materials and rotations are already in that engine's terms.
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::keyvalues::KeyValues;

/// Class name that marks an entity as disabled.
pub const PMT_NONE: &str = "pmt_none";

/// Group a primitive was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoType {
    Bsp,
    BspDetail,
    BspEntity,
    BspNonSolid,
    BspSubtract,
    BspTerrain,
    BspTerrainDetail,
    BspTerrainSubtract,
    BspTerrainNonSolid,
    Displacement,
    PatchDef2,
    PatchDef3,
}

impl GeoType {
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::Bsp => "pmt_bsp",
            Self::BspDetail => "pmt_bspdetail",
            Self::BspEntity => "pmt_bspentity",
            Self::BspNonSolid => "pmt_bspnonsolid",
            Self::BspSubtract => "pmt_bspsubtract",
            Self::BspTerrain => "pmt_bspterrain",
            Self::BspTerrainDetail => "pmt_bspterraindetail",
            Self::BspTerrainSubtract => "pmt_bspterrainsubtract",
            Self::BspTerrainNonSolid => "pmt_bspterrainnonsolid",
            Self::Displacement => "pmt_displacement",
            Self::PatchDef2 => "pmt_patchdef2",
            Self::PatchDef3 => "pmt_patchdef3",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        [
            Self::Bsp,
            Self::BspDetail,
            Self::BspEntity,
            Self::BspNonSolid,
            Self::BspSubtract,
            Self::BspTerrain,
            Self::BspTerrainDetail,
            Self::BspTerrainSubtract,
            Self::BspTerrainNonSolid,
            Self::Displacement,
            Self::PatchDef2,
            Self::PatchDef3,
        ]
        .into_iter()
        .find(|geotype| geotype.group_name() == name)
    }
}

/// Texture axes with scale and pixel offset.
///
/// Scale 2 doubles the size a texture covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisUv {
    pub u_axis: DVec3,
    pub v_axis: DVec3,
    pub scale: DVec2,
    pub offset: DVec2,
}

/// Texture scale, pixel offset and rotation. Axes come from the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixUv {
    pub scale: DVec2,
    pub offset: DVec2,
    pub rotation_degrees: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvData {
    pub vmf: AxisUv,
    pub t3d: AxisUv,
    pub map: MatrixUv,
}

/// Displacement samples. Values are copied over the power's zeroed grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Displacement {
    pub power: u32,
    pub start_position: DVec3,
    /// Flat xyz triples.
    pub normals: Vec<f64>,
    pub distances: Vec<f64>,
    pub offsets: Vec<f64>,
    pub offset_normals: Vec<f64>,
    pub alphas: Vec<f64>,
}

/// Entity output wired to another entity's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub output: String,
    pub target: String,
    pub input: String,
    #[serde(default)]
    pub parameter: String,
    #[serde(default)]
    pub delay: String,
    #[serde(default = "default_fire_once")]
    pub fire_once: String,
}

fn default_fire_once() -> String {
    "-1".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityInfo {
    pub classname: String,
    pub keyvalues: KeyValues,
    pub connections: Vec<Connection>,
}

impl EntityInfo {
    /// Whether the class name is set and not [`PMT_NONE`].
    pub fn is_enabled(&self) -> bool {
        !self.classname.is_empty() && self.classname != PMT_NONE
    }
}

/// One planar face. Faces sharing a `bsp_island` in a row form a convex brush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub geotype: GeoType,
    pub bsp_island: i64,
    #[serde(default)]
    pub entity_island: i64,
    pub normal: DVec3,
    pub vertices: Vec<DVec3>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub texture_size: Option<DVec2>,
    #[serde(default)]
    pub uv: Option<UvData>,
    #[serde(default)]
    pub entity: Option<EntityInfo>,
    #[serde(default)]
    pub displacement: Option<Displacement>,
    #[serde(default)]
    pub brush_order: Option<i64>,
    #[serde(default)]
    pub polyflags: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchVertex {
    pub position: DVec3,
    pub uv: DVec2,
}

/// Bezier patch grid, `width` rows of `height` vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub geotype: GeoType,
    pub width: usize,
    pub height: usize,
    pub vertices: Vec<PatchVertex>,
    #[serde(default)]
    pub material: Option<String>,
    /// Fixed subdivisions, only written for `patchDef3`.
    #[serde(default)]
    pub subdivisions: Option<(u32, u32)>,
    #[serde(default)]
    pub entity: Option<EntityInfo>,
    #[serde(default)]
    pub entity_island: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Polygon(Polygon),
    Patch(Patch),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEntity {
    pub position: DVec3,
    pub entity: EntityInfo,
    /// Euler degrees about x, y and z.
    #[serde(default)]
    pub rotation: Option<DVec3>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelProperties {
    pub classname: String,
    pub keyvalues: KeyValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub primitives: Vec<Primitive>,
    pub point_entities: Vec<PointEntity>,
    pub level: Option<LevelProperties>,
}

impl Scene {
    /// Polygons with their primitive index.
    pub fn polygons(&self) -> impl Iterator<Item = (usize, &Polygon)> {
        self.primitives
            .iter()
            .enumerate()
            .filter_map(|(index, primitive)| match primitive {
                Primitive::Polygon(polygon) => Some((index, polygon)),
                Primitive::Patch(_) => None,
            })
    }

    pub fn patches(&self) -> impl Iterator<Item = (usize, &Patch)> {
        self.primitives
            .iter()
            .enumerate()
            .filter_map(|(index, primitive)| match primitive {
                Primitive::Patch(patch) => Some((index, patch)),
                Primitive::Polygon(_) => None,
            })
    }
}

/// Runs of consecutive items sharing the same key.
pub fn split_runs<T, K: PartialEq>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<Vec<T>> {
    let mut res: Vec<Vec<T>> = vec![];

    for item in items {
        let same = res
            .last()
            .and_then(|run| run.last())
            .is_some_and(|last| key(last) == key(&item));

        if same {
            if let Some(run) = res.last_mut() {
                run.push(item);
            }
        } else {
            res.push(vec![item]);
        }
    }

    res
}
