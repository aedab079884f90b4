//! Builds a [`Map`] from a [`Scene`] authored for idTech4.
use common::{
    geometry::{centroid, euler_rotation_rows},
    scene::{split_runs, EntityInfo, GeoType, MatrixUv, Patch, Polygon, Scene},
    writer::{fixed16, truncated},
    KeyValues,
};
use glam::{DVec2, DVec3};
use log::debug;

use crate::{
    error::MapError,
    types::{Brush, BrushPlane, Map, MapEntity, MapPrimitive, PatchDef, WORLDSPAWN},
};

pub const DEFAULT_MATERIAL: &str = "textures/common/clip";

/// Detail brushes become this entity.
const DETAIL_CLASS: &str = "func_static";

const DEFAULT_TEXTURE_SIZE: DVec2 = DVec2::splat(128.);
const DEFAULT_UV_SCALE: DVec2 = DVec2::splat(1. / 128.);
const TEXTURE_SIZE_EPSILON: f64 = 1.;

/// Keys the exporter writes itself on point entities.
const RESTRICTED_KEYS: [&str; 4] = ["classname", "name", "origin", "rotation"];

/// 2x3 texture matrix from a uv scaled in world units per pixel and offset in pixels.
pub fn texture_matrix(uv: &MatrixUv, texture_size: DVec2) -> [DVec3; 2] {
    let scale = DVec2::ONE / uv.scale / texture_size;
    let offset = uv.offset / texture_size;
    let (sin, cos) = uv.rotation_degrees.to_radians().sin_cos();

    [
        DVec3::new(scale.x * cos, -scale.y * sin, offset.x),
        DVec3::new(scale.x * sin, scale.y * cos, offset.y),
    ]
}

struct Side {
    primitive: usize,
    normal: DVec3,
    vertices: Vec<DVec3>,
    plane: BrushPlane,
}

struct SceneBrush {
    island: i64,
    entity: Option<(i64, EntityInfo)>,
    sides: Vec<Side>,
}

impl SceneBrush {
    fn into_brush(self, origin: DVec3) -> Brush {
        Brush {
            planes: self
                .sides
                .into_iter()
                .map(|side| BrushPlane {
                    distance: -side.normal.dot(side.vertices[0] - origin),
                    ..side.plane
                })
                .collect(),
        }
    }
}

fn side(primitive: usize, polygon: &Polygon) -> Result<Side, MapError> {
    let island = polygon.bsp_island;

    let Some(normal) = polygon.normal.try_normalize() else {
        return MapError::ZeroNormal { primitive, island }.to_result();
    };

    if polygon.vertices.is_empty() {
        return MapError::NoVertices { primitive, island }.to_result();
    }

    let material = polygon
        .material
        .clone()
        .unwrap_or_else(|| DEFAULT_MATERIAL.to_string());

    let texture_size = polygon.texture_size.unwrap_or(DEFAULT_TEXTURE_SIZE);

    let uv = polygon.uv.map(|uv| uv.map).unwrap_or(MatrixUv {
        scale: DEFAULT_UV_SCALE,
        offset: DVec2::ZERO,
        rotation_degrees: 0.,
    });

    if uv.scale.x == 0. || uv.scale.y == 0. {
        return MapError::InvalidUvScale { primitive, island }.to_result();
    }

    if texture_size.x < TEXTURE_SIZE_EPSILON || texture_size.y < TEXTURE_SIZE_EPSILON {
        return MapError::InvalidTextureSize {
            material,
            width: texture_size.x,
            height: texture_size.y,
            primitive,
            island,
        }
        .to_result();
    }

    Ok(Side {
        primitive,
        normal,
        vertices: polygon.vertices.clone(),
        plane: BrushPlane {
            normal,
            distance: -normal.dot(polygon.vertices[0]),
            uv_rows: texture_matrix(&uv, texture_size),
            material,
        },
    })
}

/// Consecutive brush polygons sharing a bsp island, in scene order.
fn scene_brushes(scene: &Scene) -> Result<Vec<SceneBrush>, MapError> {
    let polygons: Vec<(usize, &Polygon)> = scene
        .polygons()
        .filter(|(index, polygon)| {
            let keep = matches!(
                polygon.geotype,
                GeoType::Bsp | GeoType::BspDetail | GeoType::BspEntity
            );

            if !keep {
                debug!("Skipping primitive {index} of {:?}", polygon.geotype);
            }

            keep
        })
        .collect();

    let mut res = vec![];

    for run in split_runs(polygons, |(_, polygon)| polygon.bsp_island) {
        let (first_index, first) = run[0];

        let entity = match first.geotype {
            GeoType::BspDetail => Some((
                first.entity_island,
                EntityInfo {
                    classname: DETAIL_CLASS.to_string(),
                    ..Default::default()
                },
            )),
            GeoType::BspEntity => match &first.entity {
                Some(entity) if entity.is_enabled() => Some((first.entity_island, entity.clone())),
                _ => {
                    debug!("Brush entity primitive {first_index} has no class, exported as world");
                    None
                }
            },
            _ => None,
        };

        let sides = run
            .into_iter()
            .map(|(index, polygon)| side(index, polygon))
            .collect::<Result<Vec<_>, _>>()?;

        res.push(SceneBrush {
            island: first.bsp_island,
            entity,
            sides,
        });
    }

    Ok(res)
}

fn origin_value(origin: DVec3) -> String {
    format!("{} {} {}", fixed16(origin.x), fixed16(origin.y), fixed16(origin.z))
}

fn entity_keyvalues(entity: &EntityInfo) -> KeyValues {
    let mut res = KeyValues::new();
    res.insert("classname", entity.classname.as_str());

    for (key, value) in &entity.keyvalues {
        if key != "classname" {
            res.insert(key.as_str(), value.as_str());
        }
    }

    res
}

/// Brushes of one entity island, moved so that the origin is their vertex centroid.
fn brush_entity(brushes: Vec<SceneBrush>) -> MapEntity {
    let center = centroid(
        brushes
            .iter()
            .flat_map(|brush| &brush.sides)
            .flat_map(|side| &side.vertices),
    )
    .unwrap_or_default();

    let mut keyvalues = brushes
        .first()
        .and_then(|brush| brush.entity.as_ref())
        .map(|(_, entity)| entity_keyvalues(entity))
        .unwrap_or_default();

    keyvalues.insert("origin", origin_value(center));

    MapEntity {
        keyvalues,
        primitives: brushes
            .into_iter()
            .map(|brush| MapPrimitive::Brush(brush.into_brush(center)))
            .collect(),
    }
}

fn patch_def(primitive: usize, patch: &Patch) -> Result<PatchDef, MapError> {
    if patch.vertices.len() != patch.width * patch.height {
        return MapError::PatchSize {
            primitive,
            width: patch.width,
            height: patch.height,
            found: patch.vertices.len(),
        }
        .to_result();
    }

    let subdivisions = match patch.geotype {
        GeoType::PatchDef3 => patch.subdivisions,
        _ => None,
    };

    Ok(PatchDef {
        material: patch
            .material
            .clone()
            .unwrap_or_else(|| DEFAULT_MATERIAL.to_string()),
        width: patch.width,
        height: patch.height,
        subdivisions,
        vertices: patch.vertices.clone(),
    })
}

fn point_entity(
    position: DVec3,
    entity: &EntityInfo,
    rotation: Option<DVec3>,
) -> Result<MapEntity, MapError> {
    let mut keyvalues = KeyValues::new();

    keyvalues.insert("classname", entity.classname.as_str());
    keyvalues.insert(
        "origin",
        format!(
            "{} {} {}",
            truncated(position.x),
            truncated(position.y),
            truncated(position.z)
        ),
    );

    if let Some(rotation) = rotation {
        let matrix: Vec<String> = euler_rotation_rows(rotation)
            .into_iter()
            .map(fixed16)
            .collect();

        keyvalues.insert("rotation", matrix.join(" "));
    }

    for (key, value) in &entity.keyvalues {
        if RESTRICTED_KEYS.contains(&key.to_lowercase().as_str()) {
            return MapError::RestrictedKey {
                classname: entity.classname.clone(),
                key: key.clone(),
            }
            .to_result();
        }

        keyvalues.insert(key.as_str(), value.as_str());
    }

    Ok(MapEntity {
        keyvalues,
        primitives: vec![],
    })
}

fn worldspawn(scene: &Scene) -> MapEntity {
    let mut keyvalues = KeyValues::new();

    match &scene.level {
        Some(level) => {
            keyvalues.insert("classname", level.classname.as_str());

            for (key, value) in &level.keyvalues {
                keyvalues.insert(key.as_str(), value.as_str());
            }
        }
        None => {
            keyvalues.insert("classname", WORLDSPAWN);
            keyvalues.insert("editor_drLastCameraPos", "-300 0 0");
            keyvalues.insert("editor_drLastCameraAngle", "0 0 0");
        }
    }

    MapEntity {
        keyvalues,
        primitives: vec![],
    }
}

/// World brushes and patches, then brush entities, patch entities and point entities.
pub fn scene_to_map(scene: &Scene) -> Result<Map, MapError> {
    let mut world = worldspawn(scene);

    let (entity_brushes, world_brushes): (Vec<_>, Vec<_>) = scene_brushes(scene)?
        .into_iter()
        .partition(|brush| brush.entity.is_some());

    for brush in world_brushes {
        debug!("World brush island {}", brush.island);
        world
            .primitives
            .push(MapPrimitive::Brush(brush.into_brush(DVec3::ZERO)));
    }

    let mut patch_entities = vec![];

    for (index, patch) in scene.patches() {
        if !matches!(patch.geotype, GeoType::PatchDef2 | GeoType::PatchDef3) {
            debug!("Skipping patch primitive {index} of {:?}", patch.geotype);
            continue;
        }

        let patch_def = patch_def(index, patch)?;

        match &patch.entity {
            Some(entity) if entity.is_enabled() => {
                let center = centroid(patch.vertices.iter().map(|vertex| &vertex.position))
                    .unwrap_or_default();

                let mut keyvalues = entity_keyvalues(entity);
                keyvalues.insert("origin", origin_value(center));

                patch_entities.push(MapEntity {
                    keyvalues,
                    primitives: vec![MapPrimitive::Patch(patch_def)],
                });
            }
            _ => world.primitives.push(MapPrimitive::Patch(patch_def)),
        }
    }

    let mut entities = vec![world];

    let islands = split_runs(entity_brushes, |brush| {
        brush.entity.as_ref().map(|(island, _)| *island)
    });

    entities.extend(islands.into_iter().map(brush_entity));
    entities.extend(patch_entities);

    for point in &scene.point_entities {
        if !point.entity.is_enabled() {
            continue;
        }

        entities.push(point_entity(point.position, &point.entity, point.rotation)?);
    }

    Ok(Map { entities })
}

#[cfg(test)]
mod test {
    use common::scene::{AxisUv, PatchVertex, PointEntity, Primitive, UvData};

    use super::*;

    fn quad(geotype: GeoType, island: i64, normal: DVec3, offset: f64) -> Primitive {
        let vertices = vec![
            DVec3::new(offset, 0., 0.),
            DVec3::new(offset, 16., 0.),
            DVec3::new(offset, 16., 16.),
        ];

        Primitive::Polygon(Polygon {
            geotype,
            bsp_island: island,
            entity_island: 0,
            normal,
            vertices,
            material: None,
            texture_size: None,
            uv: None,
            entity: None,
            displacement: None,
            brush_order: None,
            polyflags: 0,
        })
    }

    #[test]
    fn world_and_detail_brushes() {
        let scene = Scene {
            primitives: vec![
                quad(GeoType::Bsp, 0, DVec3::X, 32.),
                quad(GeoType::Bsp, 0, DVec3::NEG_X, -32.),
                quad(GeoType::BspDetail, 1, DVec3::X, 10.),
                quad(GeoType::BspDetail, 1, DVec3::NEG_X, 2.),
                quad(GeoType::Displacement, 2, DVec3::X, 0.),
            ],
            ..Default::default()
        };

        let map = scene_to_map(&scene).unwrap();

        assert_eq!(map.entities.len(), 2);

        let world = &map.entities[0];
        assert_eq!(world.classname(), Some("worldspawn"));
        assert_eq!(
            world.keyvalues.get("editor_drLastCameraPos"),
            Some("-300 0 0")
        );

        let brush = world.brushes().next().unwrap();
        assert_eq!(brush.planes.len(), 2);
        assert_eq!(brush.planes[0].distance, -32.);
        assert_eq!(brush.planes[1].distance, -32.);
        assert_eq!(brush.planes[0].material, DEFAULT_MATERIAL);
        assert_eq!(
            brush.planes[0].uv_rows,
            [DVec3::new(1., 0., 0.), DVec3::new(0., 1., 0.)]
        );

        let detail = &map.entities[1];
        assert_eq!(detail.classname(), Some("func_static"));

        let origin = detail.origin().unwrap();
        assert!((origin - DVec3::new(6., 32. / 3., 16. / 3.)).length() < 1e-9);

        // planes are relative to the entity origin
        let planes = &detail.brushes().next().unwrap().planes;
        assert!((planes[0].distance + 4.).abs() < 1e-9);
        assert!((planes[1].distance + 4.).abs() < 1e-9);
    }

    #[test]
    fn matrix_from_uv() {
        let rows = texture_matrix(
            &MatrixUv {
                scale: DVec2::new(0.5, 0.25),
                offset: DVec2::new(64., 32.),
                rotation_degrees: 90.,
            },
            DVec2::new(128., 64.),
        );

        assert!((rows[0] - DVec3::new(0., -0.0625, 0.5)).length() < 1e-12);
        assert!((rows[1] - DVec3::new(1. / 64., 0., 0.5)).length() < 1e-12);
    }

    #[test]
    fn invalid_sides_name_the_primitive() {
        let mut zero = quad(GeoType::Bsp, 7, DVec3::ZERO, 0.);

        let scene = Scene {
            primitives: vec![quad(GeoType::Bsp, 7, DVec3::X, 0.), zero.clone()],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_map(&scene),
            Err(MapError::ZeroNormal {
                primitive: 1,
                island: 7
            })
        ));

        if let Primitive::Polygon(polygon) = &mut zero {
            polygon.normal = DVec3::Z;
            polygon.texture_size = Some(DVec2::new(0.5, 64.));
            polygon.uv = Some(UvData {
                vmf: AxisUv {
                    u_axis: DVec3::X,
                    v_axis: DVec3::Y,
                    scale: DVec2::ONE,
                    offset: DVec2::ZERO,
                },
                t3d: AxisUv {
                    u_axis: DVec3::X,
                    v_axis: DVec3::Y,
                    scale: DVec2::ONE,
                    offset: DVec2::ZERO,
                },
                map: MatrixUv {
                    scale: DVec2::ONE,
                    offset: DVec2::ZERO,
                    rotation_degrees: 0.,
                },
            });
        }

        let scene = Scene {
            primitives: vec![zero.clone()],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_map(&scene),
            Err(MapError::InvalidTextureSize { primitive: 0, .. })
        ));
    }

    #[test]
    fn entities_in_order() {
        let door: EntityInfo = EntityInfo {
            classname: "func_door".to_string(),
            keyvalues: [("speed", "100")].into_iter().collect(),
            connections: vec![],
        };

        let mut door_brush = quad(GeoType::BspEntity, 3, DVec3::X, 8.);
        if let Primitive::Polygon(polygon) = &mut door_brush {
            polygon.entity = Some(door);
        }

        let patch = Primitive::Patch(Patch {
            geotype: GeoType::PatchDef3,
            width: 1,
            height: 2,
            vertices: vec![
                PatchVertex {
                    position: DVec3::ZERO,
                    uv: DVec2::ZERO,
                },
                PatchVertex {
                    position: DVec3::new(0., 0., 8.),
                    uv: DVec2::ONE,
                },
            ],
            material: Some("textures/a".to_string()),
            subdivisions: Some((3, 3)),
            entity: None,
            entity_island: 0,
        });

        let scene = Scene {
            primitives: vec![door_brush, patch],
            point_entities: vec![PointEntity {
                position: DVec3::new(1.9, -2.5, 3.),
                entity: EntityInfo {
                    classname: "light".to_string(),
                    keyvalues: [("light_radius", "64 64 64")].into_iter().collect(),
                    connections: vec![],
                },
                rotation: Some(DVec3::ZERO),
            }],
            level: None,
        };

        let map = scene_to_map(&scene).unwrap();

        let classes: Vec<_> = map.entities.iter().filter_map(MapEntity::classname).collect();
        assert_eq!(classes, vec!["worldspawn", "func_door", "light"]);

        let world_patch = map.entities[0].patches().next().unwrap();
        assert_eq!(world_patch.subdivisions, Some((3, 3)));

        assert_eq!(map.entities[1].keyvalues.get("speed"), Some("100"));

        let light = &map.entities[2];
        assert_eq!(light.keyvalues.get("origin"), Some("1 -2 3"));
        assert_eq!(
            light.keyvalues.get("rotation"),
            Some("1.0000000000000000 0.0000000000000000 0.0000000000000000 0.0000000000000000 1.0000000000000000 0.0000000000000000 0.0000000000000000 0.0000000000000000 1.0000000000000000")
        );

        let mut restricted = scene.clone();
        restricted.point_entities[0]
            .entity
            .keyvalues
            .insert("Name", "lamp");

        assert!(matches!(
            scene_to_map(&restricted),
            Err(MapError::RestrictedKey { .. })
        ));
    }
}
