use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::tuple::Tuple4D;
use crate::color::Color;
use crate::light::{ Light, Material };
use crate::builder::{ WorldBuilder, ShapeTemplate, PolygonTemplate,
    SphereTemplate, Placement, Transform };
use crate::world::World;
use crate::camera::Camera;
use crate::error::SceneError;

/// A world and the camera to render it with.
#[derive(Debug)]
pub struct Scene {
    pub world: World,
    pub camera: Camera,
}

impl Scene {
    /// Reads and builds a scene from a JSON file.
    pub fn load(path: &Path) -> Result<Scene, SceneError> {
        let text = fs::read_to_string(path)?;
        let scene = Scene::from_json(&text)?;

        info!("Loaded {}: {} lights, {} root surfaces, {}x{} pixels",
            path.display(),
            scene.world.lights.len(),
            scene.world.surfaces.len(),
            scene.camera.width(),
            scene.camera.height());

        Ok(scene)
    }

    pub fn from_json(text: &str) -> Result<Scene, SceneError> {
        let scene_json: SceneJson = serde_json::from_str(text)?;
        Scene::try_from(scene_json)
    }
}

impl TryFrom<SceneJson> for Scene {
    type Error = SceneError;

    fn try_from(scene_json: SceneJson) -> Result<Scene, SceneError> {
        let c = scene_json.camera;
        let camera = Camera::new(
            Tuple4D::from(c.look_at).xyz(),
            Tuple4D::from(c.up).xyz(),
            Tuple4D::from(c.focal_point),
            c.focal_length,
            (c.u[0], c.u[1]),
            (c.v[0], c.v[1]),
        );

        let mut builder = WorldBuilder::new();

        for m in scene_json.materials {
            builder.material(m.into());
        }

        for l in scene_json.lights {
            builder.light(l.into());
        }

        for s in scene_json.shapes {
            builder.shape(s.into());
        }

        for o in scene_json.objects {
            builder.place(Placement::try_from(o)?);
        }

        Ok(Scene { world: builder.build()?, camera })
    }
}

#[derive(Deserialize)]
pub struct SceneJson {
    camera: CameraJson,

    #[serde(default)]
    materials: Vec<MaterialJson>,
    #[serde(default)]
    lights: Vec<LightJson>,
    #[serde(default)]
    shapes: Vec<ShapeJson>,
    #[serde(default)]
    objects: Vec<ObjectJson>,
}

#[derive(Clone, Deserialize)]
struct CameraJson {
    look_at: [f64; 3],
    up: [f64; 3],
    focal_point: [f64; 3],
    focal_length: f64,

    /// Inclusive pixel bounds, `[min, max]`.
    u: [i64; 2],
    v: [i64; 2],
}

#[derive(Clone, Deserialize)]
struct MaterialJson {
    name: String,
    diffuse: [f64; 3],
    specular: SpecularJson,

    #[serde(default)]
    translucence: TranslucenceJson,
}

#[derive(Clone, Deserialize)]
struct SpecularJson {
    ks: f64,
    alpha: f64,
}

#[derive(Clone, Deserialize)]
struct TranslucenceJson {
    kt: f64,
    density: f64,
}

impl Default for TranslucenceJson {
    fn default() -> TranslucenceJson {
        TranslucenceJson { kt: 0.0, density: 1.0 }
    }
}

impl From<MaterialJson> for Material {
    fn from(m: MaterialJson) -> Material {
        Material {
            name: m.name,
            diffuse: Color::from(m.diffuse),
            ks: m.specular.ks,
            alpha: m.specular.alpha,
            kt: m.translucence.kt,
            density: m.translucence.density,
        }
    }
}

#[derive(Clone, Deserialize)]
struct LightJson {
    illumination: [f64; 3],

    /// Homogeneous; `w == 0` makes a directional light.
    position: [f64; 4],
}

impl From<LightJson> for Light {
    fn from(l: LightJson) -> Light {
        Light {
            illumination: Color::from(l.illumination),
            position: Tuple4D::from(l.position),
        }
    }
}

#[derive(Clone, Deserialize)]
struct ShapeJson {
    name: String,

    #[serde(default)]
    polygons: Vec<PolygonJson>,
    #[serde(default)]
    spheres: Vec<SphereJson>,
}

#[derive(Clone, Deserialize)]
struct PolygonJson {
    vertices: Vec<[f64; 3]>,
}

#[derive(Clone, Deserialize)]
struct SphereJson {
    center: [f64; 3],
    radius: f64,
}

impl From<ShapeJson> for ShapeTemplate {
    fn from(s: ShapeJson) -> ShapeTemplate {
        ShapeTemplate {
            name: s.name,
            polygons: s.polygons.into_iter()
                .map(|p| PolygonTemplate::new(
                    p.vertices.into_iter().map(Tuple4D::from).collect()
                ))
                .collect(),
            spheres: s.spheres.into_iter()
                .map(|s| SphereTemplate {
                    center: Tuple4D::from(s.center),
                    radius: s.radius,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Deserialize)]
struct ObjectJson {
    shape: String,
    material: String,

    #[serde(default)]
    transforms: Vec<TransformJson>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TransformJson {
    /// One factor for every axis, or one per axis.
    Scale(Vec<f64>),
    Translate([f64; 3]),
    Rotate { look_at: [f64; 3], up: [f64; 3] },
}

impl TryFrom<TransformJson> for Transform {
    type Error = SceneError;

    fn try_from(t: TransformJson) -> Result<Transform, SceneError> {
        Ok(match t {
            TransformJson::Scale(factors) => match factors.as_slice() {
                &[s] => Transform::uniform(s),
                &[x, y, z] => Transform::Scale(x, y, z),
                _ => return Err(SceneError::ScaleArity(factors.len())),
            },
            TransformJson::Translate([x, y, z]) => Transform::Translate(x, y, z),
            TransformJson::Rotate { look_at, up } => Transform::Rotate {
                look_at: Tuple4D::from(look_at).xyz(),
                up: Tuple4D::from(up).xyz(),
            },
        })
    }
}

impl TryFrom<ObjectJson> for Placement {
    type Error = SceneError;

    fn try_from(o: ObjectJson) -> Result<Placement, SceneError> {
        let transforms = o.transforms.into_iter()
            .map(Transform::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Placement { shape: o.shape, material: o.material, transforms })
    }
}

#[cfg(test)]
const LIT_BALL: &str = r#"{
    "camera": { "look_at": [0, 1, 0], "up": [0, 0, 1], "focal_point": [0, 40, 0],
                "focal_length": 20, "u": [-10, 10], "v": [-10, 10] },
    "materials": [ { "name": "grey", "diffuse": [0.5, 0.5, 0.5],
                     "specular": { "ks": 0.0, "alpha": 1.0 } } ],
    "lights": [ { "illumination": [255, 255, 255], "position": [0, 100, 0, 1] } ],
    "shapes": [ { "name": "ball", "spheres": [ { "center": [0, 0, 0], "radius": 4 } ] } ],
    "objects": [ { "shape": "ball", "material": "grey", "transforms": [ { "scale": [2] } ] } ]
}"#;

#[test]
fn parse_scene() {
    let scene = Scene::from_json(LIT_BALL).unwrap();

    assert_eq!(scene.camera.vrp, Tuple4D::point(0.0, 20.0, 0.0));
    assert_eq!(scene.camera.width(), 21);
    assert_eq!(scene.world.lights.len(), 1);
    assert!(!scene.world.lights[0].is_directional());

    let grey = scene.world.material("grey").unwrap();
    assert_eq!(grey.diffuse, Color::rgb(0.5, 0.5, 0.5));
    assert_eq!(grey.density, 1.0);

    assert_eq!(scene.world.surfaces.len(), 1);
    assert_eq!(scene.world.surfaces[0].radius(), 8.0);
}

#[test]
fn parse_transforms() {
    let json = r#"[ { "scale": [1, 2, 3] }, { "translate": [4, 5, 6] },
                    { "rotate": { "look_at": [0, 0, 1], "up": [0, 1, 0] } } ]"#;
    let parsed: Vec<TransformJson> = serde_json::from_str(json).unwrap();
    let transforms: Vec<Transform> = parsed.into_iter()
        .map(|t| Transform::try_from(t).unwrap())
        .collect();

    assert_eq!(transforms[0], Transform::Scale(1.0, 2.0, 3.0));
    assert_eq!(transforms[1], Transform::Translate(4.0, 5.0, 6.0));
    assert!(matches!(transforms[2], Transform::Rotate { .. }));
}

#[test]
fn scale_needs_one_or_three_factors() {
    let parsed: TransformJson = serde_json::from_str(r#"{ "scale": [1, 2] }"#).unwrap();

    assert!(matches!(Transform::try_from(parsed), Err(SceneError::ScaleArity(2))));
}

#[test]
fn unknown_material_is_an_error() {
    let json = LIT_BALL.replace(r#""material": "grey""#, r#""material": "gold""#);

    match Scene::from_json(&json) {
        Err(SceneError::UnknownMaterial { material, .. }) => assert_eq!(material, "gold"),
        other => panic!("expected unknown material, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn missing_camera_is_an_error() {
    let result = Scene::from_json(r#"{ "lights": [] }"#);

    assert!(matches!(result, Err(SceneError::Parse(_))));
}
