//! Builds a [`T3dMap`] from a [`Scene`] authored for Unreal.
use common::{
    geometry::plane_space,
    scene::{split_runs, EntityInfo, GeoType, Polygon, Scene},
    KeyValues,
};
use glam::DVec3;
use log::debug;

use crate::{
    error::T3dError,
    types::{location_value, Actor, Rotator, T3dBrush, T3dMap, T3dPolygon},
};

pub const DEFAULT_MATERIAL: &str = "Detail.Marble";

const DETAIL_FLAGS: i64 = 32;
const NONSOLID_FLAGS: i64 = 8;

/// Keys the exporter writes itself.
const RESTRICTED_KEYS: [&str; 4] = ["class", "name", "location", "rotation"];

/// Editor state written when the scene has no level properties.
const LEVEL_INFO: [(&str, &str); 5] = [
    ("TimeSeconds", "241.013458"),
    ("Summary", "LevelSummary'MyLevel.LevelSummary'"),
    ("VisibleGroups", "\"\""),
    ("AIProfile(0)", "5831"),
    ("AmbientBrightness", "11"),
];

const CUBE_SCALE: f64 = 0.061266;

/// Builder brush faces: normal, TextureU, TextureV and corners as signs of 1024.
#[rustfmt::skip]
const CUBE_FACES: [([f64; 3], [f64; 3], [f64; 3], [[f64; 3]; 4]); 6] = [
    ([-1., 0., 0.], [0., 1., 0.], [0., 0., -1.],
        [[-1., -1., -1.], [-1., -1., 1.], [-1., 1., 1.], [-1., 1., -1.]]),
    ([0., 1., 0.], [1., 0., 0.], [0., 0., -1.],
        [[-1., 1., -1.], [-1., 1., 1.], [1., 1., 1.], [1., 1., -1.]]),
    ([1., 0., 0.], [0., -1., 0.], [0., 0., -1.],
        [[1., 1., -1.], [1., 1., 1.], [1., -1., 1.], [1., -1., -1.]]),
    ([0., -1., 0.], [-1., -0., -0.], [0., 0., -1.],
        [[1., -1., -1.], [1., -1., 1.], [-1., -1., 1.], [-1., -1., -1.]]),
    ([0., 0., 1.], [1., 0., 0.], [0., 1., 0.],
        [[-1., 1., 1.], [-1., -1., 1.], [1., -1., 1.], [1., 1., 1.]]),
    ([0., 0., -1.], [1., 0., 0.], [0., -1., 0.],
        [[-1., -1., -1.], [-1., 1., -1.], [1., 1., -1.], [1., -1., -1.]]),
];

/// The 2048 unit cube the editor keeps as its first brush.
pub fn builder_brush() -> Actor {
    let polygons = CUBE_FACES
        .iter()
        .map(|(normal, u, v, corners)| {
            let vertices: Vec<DVec3> = corners
                .iter()
                .map(|corner| DVec3::from_array(*corner) * 1024.)
                .collect();

            T3dPolygon {
                attributes: KeyValues::new(),
                origin: vertices[0],
                normal: DVec3::from_array(*normal),
                texture_u: DVec3::from_array(*u) * CUBE_SCALE,
                texture_v: DVec3::from_array(*v) * CUBE_SCALE,
                pan_u: 0,
                pan_v: 0,
                vertices,
            }
        })
        .collect();

    Actor {
        keyvalues: [("Group", "\"Cube\"")].into_iter().collect(),
        brushes: vec![T3dBrush {
            name: "Brush".to_string(),
            polygons,
        }],
        ..Actor::new("Brush", "Brush0")
    }
}

#[derive(Debug, Clone, Copy)]
struct BrushKind {
    additive: bool,
    terrain: bool,
    detail: bool,
    nonsolid: bool,
    /// Lower orders are written first.
    order: i64,
}

impl BrushKind {
    fn of(geotype: GeoType) -> Option<Self> {
        let kind = |additive, terrain, detail, nonsolid, order| {
            Some(Self {
                additive,
                terrain,
                detail,
                nonsolid,
                order,
            })
        };

        match geotype {
            GeoType::BspSubtract => kind(false, false, false, false, -120),
            GeoType::BspTerrainSubtract => kind(false, true, false, false, -110),
            GeoType::Bsp => kind(true, false, false, false, -100),
            GeoType::BspDetail => kind(true, false, true, false, -90),
            GeoType::BspNonSolid => kind(true, false, false, true, -90),
            GeoType::BspTerrain => kind(true, true, false, false, -80),
            GeoType::BspTerrainDetail => kind(true, true, true, false, -70),
            GeoType::BspTerrainNonSolid => kind(true, true, false, true, -60),
            GeoType::BspEntity => kind(true, false, false, false, 0),
            _ => None,
        }
    }

    fn flags(&self) -> i64 {
        if self.detail {
            DETAIL_FLAGS
        } else if self.nonsolid {
            NONSOLID_FLAGS
        } else {
            0
        }
    }
}

/// Consecutive polygons sharing a bsp island.
struct PolyList<'a> {
    kind: BrushKind,
    order: i64,
    /// Entity island of a mover.
    mover: Option<i64>,
    polygons: Vec<(usize, &'a Polygon)>,
}

/// Actor, model and link numbering.
struct Names {
    actor: u32,
    model: u32,
    link: i64,
}

impl Names {
    fn new() -> Self {
        Self {
            actor: 1,
            model: 10,
            link: 0,
        }
    }

    fn actor(&mut self, class: &str) -> String {
        let res = format!("{class}{}", self.actor);
        self.actor += 1;
        res
    }

    fn model(&mut self) -> String {
        let res = format!("Model{}", self.model);
        self.model += 1;
        res
    }

    fn link(&mut self) -> i64 {
        let res = self.link;
        self.link += 1;
        res
    }
}

fn polygon(
    primitive: usize,
    polygon: &Polygon,
    kind: BrushKind,
    link: Option<i64>,
) -> Result<T3dPolygon, T3dError> {
    let island = polygon.bsp_island;

    let Some((u, v)) = plane_space(polygon.normal) else {
        return T3dError::ZeroNormal { primitive, island }.to_result();
    };

    if polygon.vertices.len() < 3 {
        return T3dError::TooFewVertices {
            primitive,
            island,
            found: polygon.vertices.len(),
        }
        .to_result();
    }

    let (texture_u, texture_v, pan_u, pan_v) = match &polygon.uv {
        Some(uv) => {
            if polygon.texture_size.is_none() {
                return T3dError::MissingTextureSize { primitive, island }.to_result();
            }

            let t3d = &uv.t3d;

            if t3d.scale.x == 0. || t3d.scale.y == 0. {
                return T3dError::InvalidUvScale { primitive, island }.to_result();
            }

            (
                t3d.u_axis / t3d.scale.x,
                t3d.v_axis / t3d.scale.y,
                t3d.offset.x.trunc() as i64,
                t3d.offset.y.trunc() as i64,
            )
        }
        None => (u, v, 0, 0),
    };

    let material = polygon.material.as_deref().unwrap_or(DEFAULT_MATERIAL);

    let mut attributes = KeyValues::new();

    if kind.terrain {
        attributes.push("Item", "ground");
        attributes.push("Texture", material);
    } else {
        attributes.push("Texture", material);

        if kind.nonsolid {
            attributes.push("Item", "Sheets");
        }
    }

    let flags = kind.flags() + polygon.polyflags;

    if flags != 0 {
        attributes.push("Flags", flags.to_string());
    }

    if let Some(link) = link {
        attributes.push("Link", link.to_string());
    }

    let vertices: Vec<DVec3> = polygon.vertices.iter().rev().copied().collect();

    Ok(T3dPolygon {
        attributes,
        origin: vertices[0],
        normal: polygon.normal.normalize(),
        texture_u,
        texture_v,
        pan_u,
        pan_v,
        vertices,
    })
}

fn poly_lists(scene: &Scene) -> Vec<PolyList<'_>> {
    let polygons: Vec<(usize, &Polygon, BrushKind)> = scene
        .polygons()
        .filter_map(|(index, polygon)| {
            BrushKind::of(polygon.geotype).map(|kind| (index, polygon, kind))
        })
        .collect();

    split_runs(polygons, |(_, polygon, _)| polygon.bsp_island)
        .into_iter()
        .map(|run| {
            let (_, first, kind) = run[0];

            PolyList {
                kind,
                order: first.brush_order.unwrap_or(kind.order),
                mover: (first.geotype == GeoType::BspEntity).then_some(first.entity_island),
                polygons: run
                    .into_iter()
                    .map(|(index, polygon, _)| (index, polygon))
                    .collect(),
            }
        })
        .collect()
}

fn checked_keyvalues(entity: &EntityInfo) -> Result<KeyValues, T3dError> {
    let mut res = KeyValues::new();

    for (key, value) in &entity.keyvalues {
        if RESTRICTED_KEYS.contains(&key.to_lowercase().as_str()) {
            return T3dError::RestrictedKey {
                class: entity.classname.clone(),
                key: key.clone(),
            }
            .to_result();
        }

        res.insert(key.as_str(), value.as_str());
    }

    Ok(res)
}

/// `csgoper`, `polyflags` and terrain sheer keys follow the entity's own keys.
fn brush_actor(
    names: &mut Names,
    class: &str,
    mut keyvalues: KeyValues,
    kind: BrushKind,
    polygons: Vec<T3dPolygon>,
) -> Actor {
    let name = names.actor(class);

    keyvalues.insert(
        "csgoper",
        if kind.additive { "CSG_Add" } else { "CSG_Subtract" },
    );

    match kind.flags() {
        0 => {}
        flags => keyvalues.insert("polyflags", flags.to_string()),
    }

    if kind.terrain {
        keyvalues.insert("mainscale", "(SheerAxis=SHEER_ZX)");
        keyvalues.insert("postscale", "(SheerAxis=SHEER_ZX)");
    }

    Actor {
        class: class.to_string(),
        name,
        keyvalues,
        brushes: vec![T3dBrush {
            name: names.model(),
            polygons,
        }],
    }
}

fn level_actor(scene: &Scene) -> Actor {
    match &scene.level {
        Some(level) => Actor {
            keyvalues: level.keyvalues.clone(),
            ..Actor::new(level.classname.as_str(), format!("{}0", level.classname))
        },
        None => Actor {
            keyvalues: LEVEL_INFO.into_iter().collect(),
            ..Actor::new("LevelInfo", "LevelInfo0")
        },
    }
}

/// Level actor and builder brush, then static brushes by brush order, movers
/// and point entities.
pub fn scene_to_t3d(scene: &Scene) -> Result<T3dMap, T3dError> {
    let mut names = Names::new();

    // point entities are numbered before any brush
    let mut points = vec![];

    for point in &scene.point_entities {
        let entity = &point.entity;

        if !entity.is_enabled() {
            continue;
        }

        let mut keyvalues = checked_keyvalues(entity)?;
        keyvalues.insert("location", location_value(point.position));

        if let Some(rotation) = point.rotation {
            keyvalues.insert(
                "rotation",
                Rotator::from_euler_degrees(rotation).to_value(),
            );
        }

        points.push(Actor {
            class: entity.classname.clone(),
            name: names.actor(&entity.classname),
            keyvalues,
            brushes: vec![],
        });
    }

    let mut statics = vec![];
    let mut movers = vec![];

    // a mover may span several bsp islands
    for group in split_runs(poly_lists(scene), |poly_list| poly_list.mover) {
        if group[0].mover.is_some() {
            movers.push(group);
        } else {
            statics.extend(group);
        }
    }

    statics.sort_by_key(|poly_list| poly_list.order);

    let mut actors = vec![level_actor(scene), builder_brush()];

    for poly_list in statics {
        let polygons = poly_list
            .polygons
            .iter()
            .map(|(index, source)| polygon(*index, source, poly_list.kind, None))
            .collect::<Result<_, _>>()?;

        actors.push(brush_actor(
            &mut names,
            "brush",
            KeyValues::new(),
            poly_list.kind,
            polygons,
        ));
    }

    for group in movers {
        let (first_index, first) = group[0].polygons[0];

        let entity = match &first.entity {
            Some(entity) if entity.is_enabled() => entity,
            _ => {
                debug!("Brush entity primitive {first_index} has no class, skipped");
                continue;
            }
        };

        let kind = group[0].kind;
        let mut polygons = vec![];

        for poly_list in &group {
            for (index, source) in &poly_list.polygons {
                polygons.push(polygon(*index, source, kind, Some(names.link()))?);
            }
        }

        actors.push(brush_actor(
            &mut names,
            &entity.classname,
            checked_keyvalues(entity)?,
            kind,
            polygons,
        ));
    }

    actors.extend(points);

    Ok(T3dMap { actors })
}
