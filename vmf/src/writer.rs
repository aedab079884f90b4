use std::io::{self, Write};

use common::{
    scene::Connection,
    writer::{fixed6, truncated, LineWriter},
    KeyValues,
};
use glam::DVec3;

use crate::types::{DispInfo, Entity, Side, Solid, TextureAxis, Vmf, World};

const MAP_VERSION: &str = "172";
const WORLD_ID: u32 = 1;

fn point(p: DVec3) -> String {
    format!("({} {} {})", fixed6(p.x), fixed6(p.y), fixed6(p.z))
}

fn texture_axis(axis: &TextureAxis) -> String {
    format!(
        "[{} {} {} {}] {}",
        fixed6(axis.axis.x),
        fixed6(axis.axis.y),
        fixed6(axis.axis.z),
        fixed6(axis.offset),
        fixed6(axis.scale)
    )
}

fn join<T>(values: &[T], f: impl Fn(&T) -> String) -> String {
    values.iter().map(f).collect::<Vec<_>>().join(" ")
}

/// Writes `.vmf` text. The world is id 1, solids and entities share a
/// counter from 2 and sides count from 1.
pub struct VmfWriter<W: Write> {
    out: LineWriter<W>,
    solid_id: u32,
    side_id: u32,
}

impl<W: Write> VmfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: LineWriter::new(inner),
            solid_id: WORLD_ID + 1,
            side_id: 1,
        }
    }

    fn next_solid_id(&mut self) -> String {
        let id = self.solid_id;
        self.solid_id += 1;

        id.to_string()
    }

    fn next_side_id(&mut self) -> String {
        let id = self.side_id;
        self.side_id += 1;

        id.to_string()
    }

    pub fn write_vmf(&mut self, vmf: &Vmf) -> io::Result<()> {
        self.write_header()?;
        self.write_world(&vmf.world)?;

        for entity in &vmf.entities {
            self.write_entity(entity)?;
        }

        self.write_footer()?;
        self.out.flush()
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.out.line(0, "versioninfo")?;
        self.out.line(0, "{")?;
        self.out.keyvalue(1, "editorversion", "400")?;
        self.out.keyvalue(1, "editorbuild", "6157")?;
        self.out.keyvalue(1, "mapversion", MAP_VERSION)?;
        self.out.keyvalue(1, "formatversion", "100")?;
        self.out.keyvalue(1, "prefab", "0")?;
        self.out.line(0, "}")?;
        self.out.line(0, "visgroups")?;
        self.out.line(0, "{")?;
        self.out.line(0, "}")?;
        self.out.line(0, "viewsettings")?;
        self.out.line(0, "{")?;
        self.out.keyvalue(1, "bSnapToGrid", "0")?;
        self.out.keyvalue(1, "bShowGrid", "1")?;
        self.out.keyvalue(1, "bShowLogicalGrid", "0")?;
        self.out.keyvalue(1, "nGridSpacing", "64")?;
        self.out.keyvalue(1, "bShow3DGrid", "0")?;
        self.out.line(0, "}")
    }

    fn write_footer(&mut self) -> io::Result<()> {
        self.out.line(0, "cameras")?;
        self.out.line(0, "{")?;
        self.out.keyvalue(1, "activecamera", "-1")?;
        self.out.line(0, "}")?;
        self.out.line(0, "cordon")?;
        self.out.line(0, "{")?;
        self.out.keyvalue(1, "mins", "(-1024 -1024 -1024)")?;
        self.out.keyvalue(1, "maxs", "(1024 1024 1024)")?;
        self.out.keyvalue(1, "active", "0")?;
        self.out.line(0, "}")
    }

    fn write_keyvalues(&mut self, tabs: usize, keyvalues: &KeyValues) -> io::Result<()> {
        for (key, value) in keyvalues {
            self.out.keyvalue(tabs, key, value)?;
        }

        Ok(())
    }

    pub fn write_world(&mut self, world: &World) -> io::Result<()> {
        self.out.line(0, "world")?;
        self.out.line(0, "{")?;
        self.out.keyvalue(1, "id", &WORLD_ID.to_string())?;
        self.out.keyvalue(1, "mapversion", MAP_VERSION)?;
        self.write_keyvalues(1, &world.keyvalues)?;

        for solid in &world.solids {
            self.write_solid(solid)?;
        }

        self.out.line(0, "}")
    }

    pub fn write_entity(&mut self, entity: &Entity) -> io::Result<()> {
        self.out.line(0, "entity")?;
        self.out.line(0, "{")?;

        let id = self.next_solid_id();
        self.out.keyvalue(1, "id", &id)?;
        self.write_keyvalues(1, &entity.keyvalues)?;

        if !entity.connections.is_empty() {
            self.write_connections(&entity.connections)?;
        }

        for solid in &entity.solids {
            self.write_solid(solid)?;
        }

        self.out.line(0, "}")
    }

    fn write_connections(&mut self, connections: &[Connection]) -> io::Result<()> {
        self.out.line(1, "connections")?;
        self.out.line(1, "{")?;

        for connection in connections {
            self.out.keyvalue(
                2,
                &connection.output,
                &format!(
                    "{},{},{},{},{}",
                    connection.target,
                    connection.input,
                    connection.parameter,
                    connection.delay,
                    connection.fire_once
                ),
            )?;
        }

        self.out.line(1, "}")
    }

    pub fn write_solid(&mut self, solid: &Solid) -> io::Result<()> {
        self.out.line(1, "solid")?;
        self.out.line(1, "{")?;

        let id = self.next_solid_id();
        self.out.keyvalue(2, "id", &id)?;

        for side in &solid.sides {
            self.write_side(side)?;
        }

        self.out.line(1, "}")
    }

    fn write_side(&mut self, side: &Side) -> io::Result<()> {
        let [a, b, c] = side.plane;

        self.out.line(2, "side")?;
        self.out.line(2, "{")?;

        let id = self.next_side_id();
        self.out.keyvalue(3, "id", &id)?;
        self.out
            .keyvalue(3, "plane", &format!("{} {} {}", point(a), point(b), point(c)))?;
        self.out.keyvalue(3, "material", &side.material)?;
        self.out.keyvalue(3, "uaxis", &texture_axis(&side.u_axis))?;
        self.out.keyvalue(3, "vaxis", &texture_axis(&side.v_axis))?;
        self.out.keyvalue(3, "rotation", &side.rotation.to_string())?;
        self.out
            .keyvalue(3, "lightmapscale", &side.lightmap_scale.to_string())?;
        self.out
            .keyvalue(3, "smoothing_groups", &side.smoothing_groups.to_string())?;

        if let Some(dispinfo) = &side.dispinfo {
            self.write_dispinfo(dispinfo)?;
        }

        self.out.line(2, "}")
    }

    fn write_rows<T>(
        &mut self,
        name: &str,
        values: &[T],
        (rows, columns): (usize, usize),
        f: impl Fn(&T) -> String + Copy,
    ) -> io::Result<()> {
        self.out.line(4, name)?;
        self.out.line(4, "{")?;

        for (index, row) in values.chunks(columns.max(1)).take(rows).enumerate() {
            self.out.keyvalue(5, &format!("row{index}"), &join(row, f))?;
        }

        self.out.line(4, "}")
    }

    /// Row counts come from the power, see [`crate::DispDimensions`].
    fn write_dispinfo(&mut self, dispinfo: &DispInfo) -> io::Result<()> {
        let Some(dimensions) = dispinfo.dimensions() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("displacement power {} is not 2, 3 or 4", dispinfo.power),
            ));
        };

        let start = dispinfo.start_position;
        let normal_grid = (dimensions.normal_rows, dimensions.normal_columns);
        let distance_grid = (dimensions.distance_rows, dimensions.distance_columns);
        let float = |value: &f64| fixed6(*value);

        self.out.line(3, "dispinfo")?;
        self.out.line(3, "{")?;
        self.out.keyvalue(4, "power", &dispinfo.power.to_string())?;
        self.out.keyvalue(
            4,
            "startposition",
            &format!(
                "[{} {} {}]",
                truncated(start.x),
                truncated(start.y),
                truncated(start.z)
            ),
        )?;
        self.out.keyvalue(4, "flags", &dispinfo.flags.to_string())?;
        self.out
            .keyvalue(4, "elevation", &dispinfo.elevation.to_string())?;
        self.out.keyvalue(4, "subdiv", &dispinfo.subdiv.to_string())?;

        self.write_rows("normals", &dispinfo.normals, normal_grid, float)?;
        self.write_rows("distances", &dispinfo.distances, distance_grid, float)?;
        self.write_rows("offsets", &dispinfo.offsets, normal_grid, float)?;
        self.write_rows("offset_normals", &dispinfo.offset_normals, normal_grid, float)?;
        self.write_rows("alphas", &dispinfo.alphas, distance_grid, float)?;
        self.write_rows(
            "triangle_tags",
            &dispinfo.triangle_tags,
            (dimensions.triangle_tag_rows, dimensions.triangle_tag_columns),
            |tag: &i64| tag.to_string(),
        )?;

        self.out.line(4, "allowed_verts")?;
        self.out.line(4, "{")?;
        self.out
            .keyvalue(5, "10", &join(&dispinfo.allowed_verts, |vert| vert.to_string()))?;
        self.out.line(4, "}")?;
        self.out.line(3, "}")
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn side(dispinfo: Option<DispInfo>) -> Side {
        Side {
            plane: [
                DVec3::new(-64., 64., 64.),
                DVec3::new(64., 64., 64.),
                DVec3::new(64., -64., 64.),
            ],
            material: "DEV/DEV_MEASUREICE01".to_string(),
            u_axis: TextureAxis {
                axis: DVec3::X,
                offset: 0.,
                scale: 0.25,
            },
            v_axis: TextureAxis {
                axis: DVec3::NEG_Y,
                offset: 0.,
                scale: 0.25,
            },
            rotation: 0.,
            lightmap_scale: 64,
            smoothing_groups: 0,
            dispinfo,
        }
    }

    fn render(vmf: &Vmf) -> String {
        let mut writer = VmfWriter::new(vec![]);
        writer.write_vmf(vmf).unwrap();

        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn full_layout() {
        let vmf = Vmf {
            world: World {
                keyvalues: [("classname", "worldspawn")].into_iter().collect(),
                solids: vec![Solid {
                    sides: vec![side(None)],
                }],
            },
            entities: vec![Entity {
                keyvalues: [("classname", "logic_relay"), ("origin", "0.000000 0.000000 8.000000")]
                    .into_iter()
                    .collect(),
                connections: vec![Connection {
                    output: "OnTrigger".to_string(),
                    target: "door".to_string(),
                    input: "Open".to_string(),
                    parameter: String::new(),
                    delay: "0".to_string(),
                    fire_once: "-1".to_string(),
                }],
                solids: vec![],
            }],
        };

        assert_eq!(
            render(&vmf),
            r#"versioninfo
{
	"editorversion" "400"
	"editorbuild" "6157"
	"mapversion" "172"
	"formatversion" "100"
	"prefab" "0"
}
visgroups
{
}
viewsettings
{
	"bSnapToGrid" "0"
	"bShowGrid" "1"
	"bShowLogicalGrid" "0"
	"nGridSpacing" "64"
	"bShow3DGrid" "0"
}
world
{
	"id" "1"
	"mapversion" "172"
	"classname" "worldspawn"
	solid
	{
		"id" "2"
		side
		{
			"id" "1"
			"plane" "(-64.000000 64.000000 64.000000) (64.000000 64.000000 64.000000) (64.000000 -64.000000 64.000000)"
			"material" "DEV/DEV_MEASUREICE01"
			"uaxis" "[1.000000 0.000000 0.000000 0.000000] 0.250000"
			"vaxis" "[0.000000 -1.000000 0.000000 0.000000] 0.250000"
			"rotation" "0"
			"lightmapscale" "64"
			"smoothing_groups" "0"
		}
	}
}
entity
{
	"id" "3"
	"classname" "logic_relay"
	"origin" "0.000000 0.000000 8.000000"
	connections
	{
		"OnTrigger" "door,Open,,0,-1"
	}
}
cameras
{
	"activecamera" "-1"
}
cordon
{
	"mins" "(-1024 -1024 -1024)"
	"maxs" "(1024 1024 1024)"
	"active" "0"
}
"#
        );
    }

    fn section<'a>(lines: &'a [&'a str], name: &str) -> Vec<&'a str> {
        let start = lines
            .iter()
            .position(|line| line.trim() == name)
            .unwrap();

        lines[start + 2..]
            .iter()
            .take_while(|line| line.trim() != "}")
            .copied()
            .collect()
    }

    #[test]
    fn dispinfo_rows_follow_power() {
        for (power, normal_rows, distance_rows, tag_rows) in [(2, 5, 5, 4), (3, 9, 9, 8), (4, 17, 17, 16)] {
            let mut dispinfo = DispInfo::new(power).unwrap();
            dispinfo.start_position = DVec3::new(-64.7, 64., 64.);

            let mut writer = VmfWriter::new(vec![]);
            writer.write_solid(&Solid {
                sides: vec![side(Some(dispinfo))],
            })
            .unwrap();

            let out = String::from_utf8(writer.into_inner()).unwrap();
            let lines: Vec<&str> = out.lines().collect();

            assert!(out.contains("\"startposition\" \"[-64 64 64]\""));

            let normals = section(&lines, "normals");
            assert_eq!(normals.len(), normal_rows);
            assert_eq!(normals[0].matches(' ').count(), normal_rows * 3);

            let distances = section(&lines, "distances");
            assert_eq!(distances.len(), distance_rows);

            let alphas = section(&lines, "alphas");
            assert_eq!(alphas.len(), distance_rows);

            let offset_normals = section(&lines, "offset_normals");
            assert!(offset_normals[0].contains("\"row0\" \"0.000000 0.000000 1.000000 0.000000"));

            let tags = section(&lines, "triangle_tags");
            assert_eq!(tags.len(), tag_rows);
            assert!(tags[0].ends_with(" 9 9\""));

            assert_eq!(
                section(&lines, "allowed_verts"),
                vec!["\t\t\t\t\t\"10\" \"-1 -1 -1 -1 -1 -1 -1 -1 -1 -1\""]
            );
        }
    }
}
