//! Builds a [`Vmf`] from a [`Scene`] authored for Source.
use common::{
    geometry::plane_space,
    scene::{split_runs, Displacement, EntityInfo, GeoType, Polygon, Scene},
    writer::fixed6,
    KeyValues,
};
use glam::DVec3;
use log::debug;

use crate::{
    error::VmfError,
    types::{DispInfo, Entity, Side, Solid, TextureAxis, Vmf, World},
};

pub const DEFAULT_MATERIAL: &str = "DEV/DEV_MEASUREICE01";
pub const DETAIL_CLASS: &str = "func_detail";

const DEFAULT_UV_SCALE: f64 = 0.25;
/// World units per luxel. Low values make vrad crash on large maps.
const LIGHTMAP_SCALE: i64 = 64;

/// Keys the exporter writes itself.
const RESTRICTED_KEYS: [&str; 4] = ["id", "classname", "origin", "angles"];

/// `light_spot` and `light_dynamic` read their pitch from a separate key.
const PITCH_CLASSES: [&str; 2] = ["light_spot", "light_dynamic"];

/// Copies scene samples over the zeroed grid of the power.
fn dispinfo(primitive: usize, displacement: &Displacement) -> Result<DispInfo, VmfError> {
    let mut res = DispInfo::new(displacement.power)?;

    res.start_position = displacement.start_position;

    for (field, target, source) in [
        ("normals", &mut res.normals, &displacement.normals),
        ("distances", &mut res.distances, &displacement.distances),
        ("offsets", &mut res.offsets, &displacement.offsets),
        ("offset_normals", &mut res.offset_normals, &displacement.offset_normals),
        ("alphas", &mut res.alphas, &displacement.alphas),
    ] {
        if source.len() > target.len() {
            return VmfError::DisplacementSize {
                field,
                expected: target.len(),
                found: source.len(),
            }
            .to_result();
        }

        if source.len() < target.len() {
            debug!(
                "Displacement of primitive {primitive} has {} of {} `{field}`",
                source.len(),
                target.len()
            );
        }

        target[..source.len()].copy_from_slice(source);
    }

    Ok(res)
}

fn side(primitive: usize, polygon: &Polygon) -> Result<Side, VmfError> {
    let island = polygon.bsp_island;

    let Some((u, v)) = plane_space(polygon.normal) else {
        return VmfError::ZeroNormal { primitive, island }.to_result();
    };

    let [a, b, c, ..] = polygon.vertices.as_slice() else {
        return VmfError::TooFewVertices {
            primitive,
            island,
            found: polygon.vertices.len(),
        }
        .to_result();
    };

    let (u_axis, v_axis) = match &polygon.uv {
        Some(uv) => (
            TextureAxis {
                axis: uv.vmf.u_axis,
                offset: uv.vmf.offset.x,
                scale: uv.vmf.scale.x,
            },
            TextureAxis {
                axis: uv.vmf.v_axis,
                offset: uv.vmf.offset.y,
                scale: uv.vmf.scale.y,
            },
        ),
        None => (
            TextureAxis {
                axis: u,
                offset: 0.,
                scale: DEFAULT_UV_SCALE,
            },
            TextureAxis {
                axis: v,
                offset: 0.,
                scale: DEFAULT_UV_SCALE,
            },
        ),
    };

    let dispinfo = match (polygon.geotype, &polygon.displacement) {
        (GeoType::Displacement, Some(displacement)) => Some(dispinfo(primitive, displacement)?),
        (GeoType::Displacement, None) => {
            debug!("Displacement primitive {primitive} has no samples, exported as a plain side");
            None
        }
        _ => None,
    };

    Ok(Side {
        plane: [*a, *b, *c],
        material: polygon
            .material
            .clone()
            .unwrap_or_else(|| DEFAULT_MATERIAL.to_string()),
        u_axis,
        v_axis,
        rotation: 0.,
        lightmap_scale: LIGHTMAP_SCALE,
        smoothing_groups: 0,
        dispinfo,
    })
}

enum Owner {
    World,
    Entity(i64, EntityInfo),
    /// Brush entity without a class.
    Dropped,
}

/// Solids from consecutive polygons sharing a bsp island, with their owner.
fn solids(scene: &Scene) -> Result<Vec<(Owner, Solid)>, VmfError> {
    let polygons: Vec<(usize, &Polygon)> = scene
        .polygons()
        .filter(|(_, polygon)| {
            matches!(
                polygon.geotype,
                GeoType::Bsp | GeoType::BspDetail | GeoType::BspEntity | GeoType::Displacement
            )
        })
        .collect();

    let mut res = vec![];

    for run in split_runs(polygons, |(_, polygon)| polygon.bsp_island) {
        let (first_index, first) = run[0];

        let owner = match first.geotype {
            GeoType::BspDetail => Owner::Entity(
                first.entity_island,
                EntityInfo {
                    classname: DETAIL_CLASS.to_string(),
                    ..Default::default()
                },
            ),
            GeoType::BspEntity => match &first.entity {
                Some(entity) if entity.is_enabled() => {
                    Owner::Entity(first.entity_island, entity.clone())
                }
                _ => {
                    debug!("Brush entity primitive {first_index} has no class, skipped");
                    Owner::Dropped
                }
            },
            _ => Owner::World,
        };

        let solid = Solid {
            sides: run
                .into_iter()
                .map(|(index, polygon)| side(index, polygon))
                .collect::<Result<_, _>>()?,
        };

        res.push((owner, solid));
    }

    Ok(res)
}

fn checked_keyvalues(entity: &EntityInfo) -> Result<KeyValues, VmfError> {
    let mut res = KeyValues::new();
    res.insert("classname", entity.classname.as_str());

    for (key, value) in &entity.keyvalues {
        if RESTRICTED_KEYS.contains(&key.to_lowercase().as_str()) {
            return VmfError::RestrictedKey {
                classname: entity.classname.clone(),
                key: key.clone(),
            }
            .to_result();
        }

        res.insert(key.as_str(), value.as_str());
    }

    Ok(res)
}

fn brush_entity(entity: &EntityInfo, solids: Vec<Solid>) -> Result<Entity, VmfError> {
    Ok(Entity {
        keyvalues: checked_keyvalues(entity)?,
        connections: entity.connections.clone(),
        solids,
    })
}

/// `origin` always, `angles` as pitch yaw roll when rotated.
fn point_entity(
    position: DVec3,
    entity: &EntityInfo,
    rotation: Option<DVec3>,
) -> Result<Entity, VmfError> {
    let mut keyvalues = checked_keyvalues(entity)?;

    keyvalues.insert(
        "origin",
        format!("{} {} {}", fixed6(position.x), fixed6(position.y), fixed6(position.z)),
    );

    if let Some(rotation) = rotation {
        let (pitch, yaw, roll) = (rotation.y, rotation.z, rotation.x);

        keyvalues.insert(
            "angles",
            format!("{} {} {}", fixed6(pitch), fixed6(yaw), fixed6(roll)),
        );

        if PITCH_CLASSES.contains(&entity.classname.to_lowercase().as_str()) {
            keyvalues.insert("pitch", fixed6(pitch));
        }
    }

    Ok(Entity {
        keyvalues,
        connections: entity.connections.clone(),
        solids: vec![],
    })
}

/// World solids, then `func_detail` entities, brush entities and point entities.
pub fn scene_to_vmf(scene: &Scene) -> Result<Vmf, VmfError> {
    let mut world = match &scene.level {
        Some(level) => World {
            keyvalues: std::iter::once(("classname", level.classname.as_str()))
                .chain(level.keyvalues.iter())
                .collect(),
            solids: vec![],
        },
        None => World::default(),
    };

    let mut entity_solids = vec![];

    for (owner, solid) in solids(scene)? {
        match owner {
            Owner::World => world.solids.push(solid),
            Owner::Entity(island, entity) => entity_solids.push((island, entity, solid)),
            Owner::Dropped => {}
        }
    }

    let mut details = vec![];
    let mut brush_entities = vec![];

    for group in split_runs(entity_solids, |(island, _, _)| *island) {
        let entity = group[0].1.clone();
        let solids = group.into_iter().map(|(_, _, solid)| solid).collect();
        let entity = brush_entity(&entity, solids)?;

        if entity.classname() == Some(DETAIL_CLASS) {
            details.push(entity);
        } else {
            brush_entities.push(entity);
        }
    }

    let mut entities = details;
    entities.extend(brush_entities);

    for point in &scene.point_entities {
        if !point.entity.is_enabled() {
            continue;
        }

        entities.push(point_entity(point.position, &point.entity, point.rotation)?);
    }

    Ok(Vmf { world, entities })
}

#[cfg(test)]
mod test {
    use common::scene::{AxisUv, Connection, LevelProperties, MatrixUv, PointEntity, Primitive, UvData};
    use glam::DVec2;

    use super::*;

    fn polygon(geotype: GeoType, bsp_island: i64, entity_island: i64) -> Polygon {
        Polygon {
            geotype,
            bsp_island,
            entity_island,
            normal: DVec3::Z,
            vertices: vec![
                DVec3::new(0., 0., 8.),
                DVec3::new(0., 16., 8.),
                DVec3::new(16., 16., 8.),
                DVec3::new(16., 0., 8.),
            ],
            material: None,
            texture_size: None,
            uv: None,
            entity: None,
            displacement: None,
            brush_order: None,
            polyflags: 0,
        }
    }

    fn door() -> EntityInfo {
        EntityInfo {
            classname: "func_door".to_string(),
            keyvalues: [("speed", "200")].into_iter().collect(),
            connections: vec![Connection {
                output: "OnFullyOpen".to_string(),
                target: "relay".to_string(),
                input: "Trigger".to_string(),
                parameter: String::new(),
                delay: "0".to_string(),
                fire_once: "-1".to_string(),
            }],
        }
    }

    #[test]
    fn brushes_grouped_by_owner() {
        let mut door_a = polygon(GeoType::BspEntity, 3, 1);
        door_a.entity = Some(door());
        let mut door_b = polygon(GeoType::BspEntity, 4, 1);
        door_b.entity = Some(door());
        let mut unnamed = polygon(GeoType::BspEntity, 5, 2);
        unnamed.entity = Some(EntityInfo {
            classname: "pmt_none".to_string(),
            ..Default::default()
        });

        let scene = Scene {
            primitives: [
                door_a,
                polygon(GeoType::Bsp, 0, 0),
                polygon(GeoType::Bsp, 0, 0),
                polygon(GeoType::BspDetail, 1, 5),
                door_b,
                unnamed,
                polygon(GeoType::BspNonSolid, 6, 0),
            ]
            .into_iter()
            .map(Primitive::Polygon)
            .collect(),
            ..Default::default()
        };

        let vmf = scene_to_vmf(&scene).unwrap();

        assert_eq!(vmf.world.keyvalues.get("skyname"), Some("sky_day01_01"));
        assert_eq!(vmf.world.solids.len(), 1);
        assert_eq!(vmf.world.solids[0].sides.len(), 2);

        let classes: Vec<_> = vmf.entities.iter().filter_map(Entity::classname).collect();
        assert_eq!(classes, vec!["func_detail", "func_door", "func_door"]);

        // door brushes are not adjacent, so they form two entities
        assert_eq!(vmf.entities[1].solids.len(), 1);
        assert_eq!(vmf.entities[1].keyvalues.get("speed"), Some("200"));
        assert_eq!(vmf.entities[1].connections.len(), 1);

        let side = &vmf.world.solids[0].sides[0];
        assert_eq!(side.material, DEFAULT_MATERIAL);
        assert_eq!(side.plane[2], DVec3::new(16., 16., 8.));
        assert_eq!(side.u_axis.axis, DVec3::new(0., -1., 0.));
        assert_eq!(side.v_axis.axis, DVec3::new(1., 0., 0.));
        assert_eq!(side.u_axis.scale, 0.25);
        assert_eq!(side.lightmap_scale, 64);
    }

    #[test]
    fn explicit_uv_and_level() {
        let mut face = polygon(GeoType::Bsp, 0, 0);
        face.material = Some("BRICK/BRICKWALL001".to_string());
        face.uv = Some(UvData {
            vmf: AxisUv {
                u_axis: DVec3::X,
                v_axis: DVec3::NEG_Y,
                scale: DVec2::new(0.5, 0.125),
                offset: DVec2::new(32., 64.),
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

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face)],
            point_entities: vec![],
            level: Some(LevelProperties {
                classname: "worldspawn".to_string(),
                keyvalues: [("skyname", "sky_wasteland02")].into_iter().collect(),
            }),
        };

        let vmf = scene_to_vmf(&scene).unwrap();

        assert_eq!(
            vmf.world.keyvalues,
            [("classname", "worldspawn"), ("skyname", "sky_wasteland02")]
                .into_iter()
                .collect::<KeyValues>()
        );

        let side = &vmf.world.solids[0].sides[0];
        assert_eq!(side.material, "BRICK/BRICKWALL001");
        assert_eq!(side.u_axis.offset, 32.);
        assert_eq!(side.v_axis.scale, 0.125);
        assert_eq!(side.v_axis.axis, DVec3::NEG_Y);
    }

    #[test]
    fn displacement_samples() {
        let mut face = polygon(GeoType::Displacement, 0, 0);
        face.displacement = Some(Displacement {
            power: 2,
            start_position: DVec3::new(0., 0., 8.),
            normals: vec![0., 0., 1.],
            distances: vec![4.; 25],
            ..Default::default()
        });

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face.clone())],
            ..Default::default()
        };

        let vmf = scene_to_vmf(&scene).unwrap();
        let dispinfo = vmf.world.solids[0].sides[0].dispinfo.as_ref().unwrap();

        assert_eq!(dispinfo.normals.len(), 75);
        assert_eq!(&dispinfo.normals[..4], &[0., 0., 1., 0.]);
        assert_eq!(dispinfo.distances, vec![4.; 25]);
        assert_eq!(&dispinfo.offset_normals[..3], &[0., 0., 1.]);

        if let Some(displacement) = &mut face.displacement {
            displacement.alphas = vec![0.; 26];
        }

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face.clone())],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_vmf(&scene),
            Err(VmfError::DisplacementSize {
                field: "alphas",
                expected: 25,
                found: 26
            })
        ));

        if let Some(displacement) = &mut face.displacement {
            displacement.power = 5;
        }

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face)],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_vmf(&scene),
            Err(VmfError::InvalidPower { power: 5 })
        ));
    }

    #[test]
    fn point_entities() {
        let light = EntityInfo {
            classname: "light_spot".to_string(),
            keyvalues: [("_light", "255 255 255 200")].into_iter().collect(),
            connections: vec![],
        };

        let mut scene = Scene {
            point_entities: vec![
                PointEntity {
                    position: DVec3::new(1.5, -2., 3.),
                    entity: light.clone(),
                    rotation: Some(DVec3::new(10., -45., 90.)),
                },
                PointEntity {
                    position: DVec3::ZERO,
                    entity: EntityInfo {
                        classname: "pmt_none".to_string(),
                        ..Default::default()
                    },
                    rotation: None,
                },
            ],
            ..Default::default()
        };

        let vmf = scene_to_vmf(&scene).unwrap();

        assert_eq!(vmf.entities.len(), 1);

        let entity = &vmf.entities[0];
        assert_eq!(
            entity.keyvalues.get("origin"),
            Some("1.500000 -2.000000 3.000000")
        );
        assert_eq!(
            entity.keyvalues.get("angles"),
            Some("-45.000000 90.000000 10.000000")
        );
        assert_eq!(entity.keyvalues.get("pitch"), Some("-45.000000"));
        assert_eq!(entity.rotation(), Some(DVec3::new(10., -45., 90.)));

        scene.point_entities[0].entity.keyvalues.insert("Origin", "0 0 0");

        assert!(matches!(
            scene_to_vmf(&scene),
            Err(VmfError::RestrictedKey { .. })
        ));
    }

    #[test]
    fn invalid_faces() {
        let mut face = polygon(GeoType::Bsp, 2, 0);
        face.normal = DVec3::ZERO;

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face.clone())],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_vmf(&scene),
            Err(VmfError::ZeroNormal {
                primitive: 0,
                island: 2
            })
        ));

        face.normal = DVec3::Z;
        face.vertices.truncate(2);

        let scene = Scene {
            primitives: vec![Primitive::Polygon(face)],
            ..Default::default()
        };

        assert!(matches!(
            scene_to_vmf(&scene),
            Err(VmfError::TooFewVertices { found: 2, .. })
        ));
    }
}
