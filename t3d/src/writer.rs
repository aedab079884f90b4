use std::io::{self, Write};

use common::writer::{signed_fixed, LineWriter};
use glam::DVec3;

use crate::types::{Actor, T3dBrush, T3dMap, T3dPolygon};

fn comma_vector(vector: DVec3) -> String {
    format!(
        "{},{},{}",
        signed_fixed(vector.x),
        signed_fixed(vector.y),
        signed_fixed(vector.z)
    )
}

pub struct T3dWriter<W: Write> {
    out: LineWriter<W>,
}

impl<W: Write> T3dWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: LineWriter::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    pub fn write_t3d(&mut self, map: &T3dMap) -> io::Result<()> {
        self.out.line(0, "Begin Map")?;

        for actor in &map.actors {
            self.write_actor(actor)?;
        }

        self.out.line(0, "End Map")?;
        self.out.flush()
    }

    /// Properties, then each brush followed by its `Brush=` reference.
    pub fn write_actor(&mut self, actor: &Actor) -> io::Result<()> {
        self.out.line(
            0,
            &format!("Begin Actor Class={} Name={}", actor.class, actor.name),
        )?;

        for (key, value) in actor.keyvalues.iter() {
            self.out.line(1, &format!("{key}={value}"))?;
        }

        for brush in &actor.brushes {
            self.out.line(0, "")?;
            self.write_brush(brush)?;
            self.out
                .line(1, &format!("Brush=Model'MyLevel.{}'", brush.name))?;
        }

        self.out.line(0, "End Actor")
    }

    fn write_brush(&mut self, brush: &T3dBrush) -> io::Result<()> {
        self.out.line(1, &format!("Begin Brush Name={}", brush.name))?;
        self.out.line(2, "Begin PolyList")?;

        for polygon in &brush.polygons {
            self.write_polygon(polygon)?;
        }

        self.out.line(2, "End PolyList")?;
        self.out.line(1, "End Brush")
    }

    fn write_polygon(&mut self, polygon: &T3dPolygon) -> io::Result<()> {
        let mut begin = "Begin Polygon".to_string();

        for (key, value) in polygon.attributes.iter() {
            begin.push_str(&format!(" {key}={value}"));
        }

        self.out.line(3, &begin)?;

        self.out
            .line(4, &format!("Origin   {}", comma_vector(polygon.origin)))?;
        self.out
            .line(4, &format!("Normal   {}", comma_vector(polygon.normal)))?;
        self.out
            .line(4, &format!("TextureU {}", comma_vector(polygon.texture_u)))?;
        self.out
            .line(4, &format!("TextureV {}", comma_vector(polygon.texture_v)))?;
        self.out.line(
            4,
            &format!("Pan      U={} V={}", polygon.pan_u, polygon.pan_v),
        )?;

        for vertex in &polygon.vertices {
            self.out
                .line(4, &format!("Vertex   {}", comma_vector(*vertex)))?;
        }

        self.out.line(3, "End Polygon")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn actor_layout() {
        let mut actor = Actor::new("Mover", "Mover1");
        actor.keyvalues.insert("CsgOper", "CSG_Add");
        actor.brushes.push(T3dBrush {
            name: "Model10".to_string(),
            polygons: vec![T3dPolygon {
                attributes: [("Texture", "Detail.Marble"), ("Flags", "0"), ("Link", "0")]
                    .into_iter()
                    .collect(),
                origin: DVec3::new(0., 0., 64.),
                normal: DVec3::Z,
                texture_u: DVec3::new(0.5, 0., 0.),
                texture_v: DVec3::new(0., -0.5, 0.),
                pan_u: 16,
                pan_v: -8,
                vertices: vec![DVec3::new(0., 0., 64.), DVec3::new(1024.5, 0., 64.)],
            }],
        });

        let mut writer = T3dWriter::new(vec![]);
        writer
            .write_t3d(&T3dMap {
                actors: vec![actor],
            })
            .unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(
            out,
            "Begin Map
Begin Actor Class=Mover Name=Mover1
\tCsgOper=CSG_Add

\tBegin Brush Name=Model10
\t\tBegin PolyList
\t\t\tBegin Polygon Texture=Detail.Marble Flags=0 Link=0
\t\t\t\tOrigin   +00000.000000,+00000.000000,+00064.000000
\t\t\t\tNormal   +00000.000000,+00000.000000,+00001.000000
\t\t\t\tTextureU +00000.500000,+00000.000000,+00000.000000
\t\t\t\tTextureV +00000.000000,-00000.500000,+00000.000000
\t\t\t\tPan      U=16 V=-8
\t\t\t\tVertex   +00000.000000,+00000.000000,+00064.000000
\t\t\t\tVertex   +01024.500000,+00000.000000,+00064.000000
\t\t\tEnd Polygon
\t\tEnd PolyList
\tEnd Brush
\tBrush=Model'MyLevel.Model10'
End Actor
End Map
"
        );
    }
}
