use common::{scene::PatchVertex, KeyValues};
use glam::DVec3;
use serde::Serialize;

pub const WORLDSPAWN: &str = "worldspawn";

/// One `brushDef3` side: `( nx ny nz d ) ( ( row0 ) ( row1 ) ) "material" 0 0 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrushPlane {
    pub normal: DVec3,
    /// Fourth plane token. Points `p` on the plane satisfy `normal . p + distance == 0`.
    pub distance: f64,
    /// 2x3 texture matrix.
    pub uv_rows: [DVec3; 2],
    pub material: String,
}

impl BrushPlane {
    /// Point on the plane closest to the origin.
    pub fn point(&self) -> DVec3 {
        self.normal * -self.distance
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Brush {
    pub planes: Vec<BrushPlane>,
}

/// `patchDef2`, or `patchDef3` when subdivisions are set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchDef {
    pub material: String,
    pub width: usize,
    pub height: usize,
    /// Fixed `(width, height)` subdivisions.
    pub subdivisions: Option<(u32, u32)>,
    /// `width` rows of `height` vertices.
    pub vertices: Vec<PatchVertex>,
}

impl PatchDef {
    pub fn is_patchdef3(&self) -> bool {
        self.subdivisions.is_some()
    }

    pub fn row(&self, index: usize) -> &[PatchVertex] {
        &self.vertices[index * self.height..(index + 1) * self.height]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MapPrimitive {
    Brush(Brush),
    Patch(PatchDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapEntity {
    /// Keys are lowercase.
    pub keyvalues: KeyValues,
    pub primitives: Vec<MapPrimitive>,
}

impl MapEntity {
    pub fn classname(&self) -> Option<&str> {
        self.keyvalues.get("classname")
    }

    pub fn is_worldspawn(&self) -> bool {
        self.classname() == Some(WORLDSPAWN)
    }

    /// Not worldspawn and without primitives.
    pub fn is_point_entity(&self) -> bool {
        !self.is_worldspawn() && self.primitives.is_empty()
    }

    /// `origin` as three floats.
    pub fn origin(&self) -> Option<DVec3> {
        let values: Vec<f64> = self
            .keyvalues
            .get("origin")?
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;

        match values.as_slice() {
            [x, y, z] => Some(DVec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn brushes(&self) -> impl Iterator<Item = &Brush> {
        self.primitives.iter().filter_map(|primitive| match primitive {
            MapPrimitive::Brush(brush) => Some(brush),
            MapPrimitive::Patch(_) => None,
        })
    }

    pub fn patches(&self) -> impl Iterator<Item = &PatchDef> {
        self.primitives.iter().filter_map(|primitive| match primitive {
            MapPrimitive::Patch(patch) => Some(patch),
            MapPrimitive::Brush(_) => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Map {
    pub entities: Vec<MapEntity>,
}

impl Map {
    pub fn worldspawn(&self) -> Option<&MapEntity> {
        self.entities.iter().find(|entity| entity.is_worldspawn())
    }

    pub fn point_entities(&self) -> impl Iterator<Item = &MapEntity> {
        self.entities.iter().filter(|entity| entity.is_point_entity())
    }
}
