use std::io::{self, Write};

use common::{
    writer::{fixed16, LineWriter},
    KeyValues,
};
use glam::DVec3;

use crate::types::{Brush, Map, MapEntity, MapPrimitive, PatchDef};

const FUNC_STATIC: &str = "func_static";

fn plane_line(normal: DVec3, distance: f64, rows: &[DVec3; 2], material: &str) -> String {
    let row = |row: &DVec3| format!("( {} {} {} )", fixed16(row.x), fixed16(row.y), fixed16(row.z));

    format!(
        "({} {} {} {}) ( {} {} ) \"{}\" 0 0 0",
        fixed16(normal.x),
        fixed16(normal.y),
        fixed16(normal.z),
        fixed16(distance),
        row(&rows[0]),
        row(&rows[1]),
        material
    )
}

/// Writes `.map` text. Entities are numbered in write order from 0, primitives
/// across the whole file.
pub struct MapWriter<W: Write> {
    out: LineWriter<W>,
    entity_id: usize,
    primitive_id: usize,
}

impl<W: Write> MapWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: LineWriter::new(inner),
            entity_id: 0,
            primitive_id: 0,
        }
    }

    pub fn write_map(&mut self, map: &Map) -> io::Result<()> {
        self.out.line(0, "Version 2")?;

        for entity in &map.entities {
            self.write_entity(entity)?;
        }

        self.out.flush()
    }

    /// Entities other than worldspawn get a `name`, and `func_static` a `model`, when missing.
    pub fn write_entity(&mut self, entity: &MapEntity) -> io::Result<()> {
        let id = self.entity_id;
        self.entity_id += 1;

        let mut keyvalues: KeyValues = entity.keyvalues.clone();

        if !entity.is_worldspawn() {
            let classname = entity.classname().unwrap_or_default().to_string();

            if !keyvalues.contains_key("name") {
                keyvalues.insert("name", format!("{classname}_{id}"));
            }

            if classname == FUNC_STATIC && !keyvalues.contains_key("model") {
                let name = keyvalues.get("name").unwrap_or_default().to_string();
                keyvalues.insert("model", name);
            }
        }

        self.out.line(0, &format!("// entity {id}"))?;
        self.out.line(0, "{")?;

        for (key, value) in &keyvalues {
            self.out.keyvalue(0, key, value)?;
        }

        for primitive in &entity.primitives {
            match primitive {
                MapPrimitive::Brush(brush) => self.write_brush(brush)?,
                MapPrimitive::Patch(patch) => self.write_patch(patch)?,
            }
        }

        self.out.line(0, "}")
    }

    fn next_primitive(&mut self) -> io::Result<()> {
        let id = self.primitive_id;
        self.primitive_id += 1;

        self.out.line(0, &format!("// primitive {id}"))
    }

    pub fn write_brush(&mut self, brush: &Brush) -> io::Result<()> {
        self.next_primitive()?;
        self.out.line(0, "{")?;
        self.out.line(0, "brushDef3")?;
        self.out.line(0, "{")?;

        for plane in &brush.planes {
            self.out.line(
                0,
                &plane_line(plane.normal, plane.distance, &plane.uv_rows, &plane.material),
            )?;
        }

        self.out.line(0, "}")?;
        self.out.line(0, "}")
    }

    pub fn write_patch(&mut self, patch: &PatchDef) -> io::Result<()> {
        self.next_primitive()?;
        self.out.line(0, "{")?;
        self.out
            .line(0, if patch.is_patchdef3() { "patchDef3" } else { "patchDef2" })?;
        self.out.line(0, "{")?;
        self.out.line(0, &format!("\"{}\"", patch.material))?;

        let size = match patch.subdivisions {
            Some((width, height)) => format!(
                "( {} {} {width} {height} 0 0 0 )",
                patch.width, patch.height
            ),
            None => format!("( {} {} 0 0 0 )", patch.width, patch.height),
        };

        self.out.line(0, &size)?;
        self.out.line(0, "(")?;

        for row_index in 0..patch.width {
            let row: String = patch
                .row(row_index)
                .iter()
                .map(|vertex| {
                    format!(
                        "( {} {} {} {} {} )",
                        fixed16(vertex.position.x),
                        fixed16(vertex.position.y),
                        fixed16(vertex.position.z),
                        fixed16(vertex.uv.x),
                        fixed16(vertex.uv.y)
                    )
                })
                .collect();

            self.out.line(0, &format!("( {row})"))?;
        }

        self.out.line(0, ")")?;
        self.out.line(0, "}")?;
        self.out.line(0, "}")
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[cfg(test)]
mod test {
    use common::scene::PatchVertex;
    use glam::DVec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::BrushPlane;

    fn render(map: &Map) -> String {
        let mut writer = MapWriter::new(vec![]);
        writer.write_map(map).unwrap();

        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn brush_layout() {
        let world = MapEntity {
            keyvalues: [("classname", "worldspawn")].into_iter().collect(),
            primitives: vec![MapPrimitive::Brush(Brush {
                planes: vec![BrushPlane {
                    normal: DVec3::Z,
                    distance: -64.,
                    uv_rows: [DVec3::new(1., 0., 0.), DVec3::new(0., 1., 0.5)],
                    material: "textures/common/clip".to_string(),
                }],
            })],
        };
        let static_mesh = MapEntity {
            keyvalues: [("classname", "func_static")].into_iter().collect(),
            primitives: vec![],
        };
        let named = MapEntity {
            keyvalues: [("classname", "light"), ("name", "lamp")].into_iter().collect(),
            primitives: vec![],
        };

        let out = render(&Map {
            entities: vec![world, static_mesh, named],
        });

        assert_eq!(
            out,
            "Version 2
// entity 0
{
\"classname\" \"worldspawn\"
// primitive 0
{
brushDef3
{
(0.0000000000000000 0.0000000000000000 1.0000000000000000 -64.0000000000000000) ( ( 1.0000000000000000 0.0000000000000000 0.0000000000000000 ) ( 0.0000000000000000 1.0000000000000000 0.5000000000000000 ) ) \"textures/common/clip\" 0 0 0
}
}
}
// entity 1
{
\"classname\" \"func_static\"
\"name\" \"func_static_1\"
\"model\" \"func_static_1\"
}
// entity 2
{
\"classname\" \"light\"
\"name\" \"lamp\"
}
"
        );
    }

    #[test]
    fn patch_layout() {
        let patch = PatchDef {
            material: "textures/a".to_string(),
            width: 2,
            height: 1,
            subdivisions: Some((4, 4)),
            vertices: vec![
                PatchVertex {
                    position: DVec3::new(1., 2., 3.),
                    uv: DVec2::new(0., 1.),
                },
                PatchVertex {
                    position: DVec3::new(4., 5., 6.),
                    uv: DVec2::new(1., 1.),
                },
            ],
        };

        let mut writer = MapWriter::new(vec![]);
        writer.write_patch(&patch).unwrap();
        writer.write_patch(&PatchDef { subdivisions: None, ..patch }).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "// primitive 0");
        assert_eq!(lines[2], "patchDef3");
        assert_eq!(lines[5], "( 2 1 4 4 0 0 0 )");
        assert_eq!(
            lines[7],
            "( ( 1.0000000000000000 2.0000000000000000 3.0000000000000000 0.0000000000000000 1.0000000000000000 ))"
        );
        assert_eq!(lines[12], "// primitive 1");
        assert_eq!(lines[14], "patchDef2");
        assert_eq!(lines[17], "( 2 1 0 0 0 )");
    }
}
