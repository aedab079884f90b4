use common::{writer::fixed6, KeyValues};
use glam::DVec3;
use serde::Serialize;

/// Rotator units in a full turn.
pub const ROTATOR_UNITS: f64 = 65536.;

/// Actor rotation in rotator units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rotator {
    pub pitch: i32,
    pub yaw: i32,
    pub roll: i32,
}

impl Rotator {
    /// From degrees about x, y and z. Pitch and roll turn the other way in Unreal.
    pub fn from_euler_degrees(degrees: DVec3) -> Self {
        let units = |value: f64| (value * ROTATOR_UNITS / 360.).trunc() as i32;

        Self {
            pitch: units(-degrees.y),
            yaw: units(degrees.z),
            roll: units(-degrees.x),
        }
    }

    pub fn to_euler_degrees(self) -> DVec3 {
        let degrees = |units: i32| units as f64 * 360. / ROTATOR_UNITS;

        DVec3::new(-degrees(self.roll), -degrees(self.pitch), degrees(self.yaw))
    }

    /// `(Pitch=..,Yaw=..,Roll=..)`, missing members are zero.
    pub fn parse(value: &str) -> Option<Self> {
        let mut res = Self::default();

        for (key, value) in struct_members(value)? {
            let value = value.parse::<f64>().ok()?.trunc() as i32;

            match key.to_lowercase().as_str() {
                "pitch" => res.pitch = value,
                "yaw" => res.yaw = value,
                "roll" => res.roll = value,
                _ => return None,
            }
        }

        Some(res)
    }

    pub fn to_value(self) -> String {
        format!(
            "(Pitch={},Yaw={},Roll={})",
            self.pitch, self.yaw, self.roll
        )
    }
}

/// Members of `(A=1,B=2)`.
fn struct_members(value: &str) -> Option<Vec<(&str, &str)>> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;

    inner
        .split(',')
        .filter(|member| !member.trim().is_empty())
        .map(|member| {
            member
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
        })
        .collect()
}

/// `(X=..,Y=..,Z=..)`, missing members are zero.
pub fn parse_location(value: &str) -> Option<DVec3> {
    let mut res = DVec3::ZERO;

    for (key, value) in struct_members(value)? {
        let value = value.parse().ok()?;

        match key.to_lowercase().as_str() {
            "x" => res.x = value,
            "y" => res.y = value,
            "z" => res.z = value,
            _ => return None,
        }
    }

    Some(res)
}

pub fn location_value(location: DVec3) -> String {
    format!(
        "(X={},Y={},Z={})",
        fixed6(location.x),
        fixed6(location.y),
        fixed6(location.z)
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct T3dPolygon {
    /// Header attributes such as `Texture`, `Item`, `Flags` and `Link`, in file order.
    pub attributes: KeyValues,
    pub origin: DVec3,
    pub normal: DVec3,
    pub texture_u: DVec3,
    pub texture_v: DVec3,
    pub pan_u: i64,
    pub pan_v: i64,
    pub vertices: Vec<DVec3>,
}

impl T3dPolygon {
    pub fn texture(&self) -> Option<&str> {
        self.attributes.get_ignore_case("texture")
    }

    pub fn item(&self) -> Option<&str> {
        self.attributes.get_ignore_case("item")
    }

    pub fn flags(&self) -> i64 {
        self.attributes
            .get_ignore_case("flags")
            .and_then(|flags| flags.parse().ok())
            .unwrap_or(0)
    }

    pub fn link(&self) -> Option<i64> {
        self.attributes
            .get_ignore_case("link")
            .and_then(|link| link.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct T3dBrush {
    /// Model name, also written as the actor's `Brush=Model'MyLevel.<name>'`.
    pub name: String,
    pub polygons: Vec<T3dPolygon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Actor {
    pub class: String,
    pub name: String,
    /// Lowercase keys when parsed. Values are kept verbatim, quotes included.
    pub keyvalues: KeyValues,
    pub brushes: Vec<T3dBrush>,
}

impl Actor {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyvalues.get_ignore_case(key)
    }

    /// Value with one pair of surrounding double quotes removed.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(|value| {
            value
                .strip_prefix('"')
                .and_then(|value| value.strip_suffix('"'))
                .unwrap_or(value)
        })
    }

    pub fn location(&self) -> Option<DVec3> {
        self.get("location").and_then(parse_location)
    }

    pub fn rotator(&self) -> Option<Rotator> {
        self.get("rotation").and_then(Rotator::parse)
    }

    pub fn rotation_degrees(&self) -> Option<DVec3> {
        self.rotator().map(Rotator::to_euler_degrees)
    }

    pub fn is_brush(&self) -> bool {
        self.class.eq_ignore_ascii_case("brush")
    }

    pub fn polygons(&self) -> impl Iterator<Item = &T3dPolygon> {
        self.brushes.iter().flat_map(|brush| brush.polygons.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct T3dMap {
    pub actors: Vec<Actor>,
}

impl T3dMap {
    /// The editor's builder brush, the first `Brush` actor.
    pub fn builder_brush(&self) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.is_brush())
    }

    /// Everything except the builder brush.
    pub fn level_actors(&self) -> impl Iterator<Item = &Actor> {
        let builder = self.actors.iter().position(Actor::is_brush);

        self.actors
            .iter()
            .enumerate()
            .filter(move |(index, _)| Some(*index) != builder)
            .map(|(_, actor)| actor)
    }

    /// Level actors that carry brush geometry.
    pub fn brush_actors(&self) -> impl Iterator<Item = &Actor> {
        self.level_actors().filter(|actor| !actor.brushes.is_empty())
    }

    pub fn point_actors(&self) -> impl Iterator<Item = &Actor> {
        self.level_actors().filter(|actor| actor.brushes.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotator_units() {
        let rotator = Rotator::from_euler_degrees(DVec3::new(0., 90., 180.));

        assert_eq!(
            rotator,
            Rotator {
                pitch: -16384,
                yaw: 32768,
                roll: 0
            }
        );
        assert_eq!(rotator.to_euler_degrees(), DVec3::new(0., 90., 180.));
        assert_eq!(rotator.to_value(), "(Pitch=-16384,Yaw=32768,Roll=0)");

        assert_eq!(
            Rotator::parse("(Yaw=16384)"),
            Some(Rotator {
                pitch: 0,
                yaw: 16384,
                roll: 0
            })
        );
        assert_eq!(Rotator::parse("(Spin=1)"), None);
        assert_eq!(Rotator::parse("Yaw=1"), None);
    }

    #[test]
    fn locations() {
        assert_eq!(
            parse_location("(X=1.5,Z=-8)"),
            Some(DVec3::new(1.5, 0., -8.))
        );
        assert_eq!(parse_location("(X=a)"), None);
        assert_eq!(
            location_value(DVec3::new(1., -2., 0.5)),
            "(X=1.000000,Y=-2.000000,Z=0.500000)"
        );
    }

    #[test]
    fn builder_brush_is_first_brush() {
        let map = T3dMap {
            actors: vec![
                Actor::new("LevelInfo", "LevelInfo0"),
                Actor::new("Brush", "Brush0"),
                Actor {
                    brushes: vec![T3dBrush::default()],
                    ..Actor::new("Brush", "Brush1")
                },
                Actor::new("Light", "Light0"),
            ],
        };

        assert_eq!(map.builder_brush().unwrap().name, "Brush0");

        let names = |actors: Vec<&Actor>| -> Vec<String> {
            actors.into_iter().map(|actor| actor.name.clone()).collect()
        };

        assert_eq!(
            names(map.level_actors().collect()),
            vec!["LevelInfo0", "Brush1", "Light0"]
        );
        assert_eq!(names(map.brush_actors().collect()), vec!["Brush1"]);
        assert_eq!(
            names(map.point_actors().collect()),
            vec!["LevelInfo0", "Light0"]
        );
    }
}
